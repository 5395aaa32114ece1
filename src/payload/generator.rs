//! Deterministic byte generator.
//!
//! Park–Miller "minimal standard" generator with the 48271 multiplier.
//! Each output byte is the low byte of the next state.

use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::Stream;

/// Largest payload the synthetic endpoint will produce (1 GiB).
pub const MAX_PAYLOAD_LEN: u64 = 1 << 30;

const MODULUS: u64 = 2_147_483_647;
const MULTIPLIER: u64 = 48_271;
const SEED: u64 = 1;

/// Chunk size used when streaming a payload.
const CHUNK_LEN: usize = 64 * 1024;

/// Lehmer random number generator.
#[derive(Debug, Clone)]
pub struct LehmerGenerator {
    state: u64,
}

impl LehmerGenerator {
    /// Create a generator at the fixed global seed.
    pub fn new() -> Self {
        Self { state: SEED }
    }

    /// Advance once and return the low-order byte of the new state.
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        self.state = self.state * MULTIPLIER % MODULUS;
        self.state as u8
    }

    /// Fill `buf` with the next `buf.len()` bytes of the sequence.
    pub fn fill(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.next_byte();
        }
    }
}

impl Default for LehmerGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for LehmerGenerator {
    type Item = u8;

    fn next(&mut self) -> Option<u8> {
        Some(self.next_byte())
    }
}

/// Produce exactly `len` bytes of the synthetic sequence.
pub fn generate(len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; len];
    LehmerGenerator::new().fill(&mut buf);
    buf
}

/// Streams `len` synthetic bytes in bounded chunks.
///
/// Yields the same bytes as [`generate`] for the same length.
#[derive(Debug)]
pub struct PayloadStream {
    generator: LehmerGenerator,
    remaining: u64,
}

impl PayloadStream {
    pub fn new(len: u64) -> Self {
        Self {
            generator: LehmerGenerator::new(),
            remaining: len,
        }
    }

    /// Bytes not yet yielded.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Stream for PayloadStream {
    type Item = Result<Bytes, Infallible>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.remaining == 0 {
            return Poll::Ready(None);
        }

        let n = this.remaining.min(CHUNK_LEN as u64) as usize;
        let mut chunk = vec![0u8; n];
        this.generator.fill(&mut chunk);
        this.remaining -= n as u64;

        Poll::Ready(Some(Ok(Bytes::from(chunk))))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let chunks = self.remaining.div_ceil(CHUNK_LEN as u64) as usize;
        (chunks, Some(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[test]
    fn first_byte_matches_one_step() {
        let data = generate(1);
        assert_eq!(data[0], ((1u64 * 48_271) % 2_147_483_647) as u8);
        assert_eq!(data[0], 0x8f);
    }

    #[test]
    fn exact_length() {
        for len in [1usize, 2, 255, 4096, 65_537] {
            assert_eq!(generate(len).len(), len);
        }
    }

    #[test]
    fn deterministic_for_same_length() {
        assert_eq!(generate(10_000), generate(10_000));
    }

    #[test]
    fn shorter_is_prefix_of_longer() {
        let short = generate(1_000);
        let long = generate(5_000);
        assert_eq!(&long[..1_000], &short[..]);
    }

    #[test]
    fn state_follows_recurrence() {
        let mut generator = LehmerGenerator::new();
        let mut state = 1u64;
        for _ in 0..1_000 {
            state = state * 48_271 % 2_147_483_647;
            assert_eq!(generator.next_byte(), state as u8);
        }
    }

    #[test]
    fn iterator_matches_fill() {
        let from_iter: Vec<u8> = LehmerGenerator::new().take(333).collect();
        assert_eq!(from_iter, generate(333));
    }

    #[tokio::test]
    async fn stream_matches_generate() {
        let len = 3 * CHUNK_LEN + 17;
        let mut stream = PayloadStream::new(len as u64);
        assert_eq!(stream.size_hint(), (4, Some(4)));

        let mut collected = Vec::with_capacity(len);
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();
            assert!(chunk.len() <= CHUNK_LEN);
            collected.extend_from_slice(&chunk);
        }
        assert_eq!(collected, generate(len));
        assert_eq!(stream.remaining(), 0);
    }
}
