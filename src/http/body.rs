//! Response length capability.

use axum::body::HttpBody;

/// A body that may know its exact length up front.
///
/// `None` means the length is not known until the body is drained, which is
/// a normal case (streamed or echoed bodies), not an error.
pub trait KnownLength {
    fn byte_len(&self) -> Option<u64>;
}

impl<B: HttpBody> KnownLength for B {
    fn byte_len(&self) -> Option<u64> {
        self.size_hint().exact()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn full_body_has_length() {
        let body = Body::from(vec![0u8; 42]);
        assert_eq!(body.byte_len(), Some(42));
    }

    #[test]
    fn empty_body_has_zero_length() {
        assert_eq!(Body::empty().byte_len(), Some(0));
    }

    #[test]
    fn streamed_body_has_no_length() {
        let chunk = bytes::Bytes::from_static(b"ab");
        let stream = futures_util::stream::iter(vec![Ok::<_, std::io::Error>(chunk)]);
        let body = Body::from_stream(stream);
        assert_eq!(body.byte_len(), None);
    }
}
