//! HTTP/3 request bridge.
//!
//! Turns one h3 request stream into a call on the shared axum router and
//! writes the response back. Request and response bodies are streamed in
//! both directions.

use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response},
    Router,
};
use bytes::{Buf, Bytes};
use futures_util::{Stream, StreamExt};
use h3::server::RequestStream;
use thiserror::Error;
use tower::ServiceExt;

use crate::http::body::KnownLength;
use crate::qlog::{ConnectionTracer, TraceEvent};

type QuinnBidi = h3_quinn::BidiStream<Bytes>;
type QuinnRecv = h3_quinn::RecvStream;

/// Failure while answering one request. Only the stream is affected.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("failed to send response headers: {0}")]
    SendResponse(String),

    #[error("failed to send response body: {0}")]
    SendData(String),

    #[error("response body failed: {0}")]
    Body(#[from] axum::Error),

    #[error("failed to finish stream: {0}")]
    Finish(String),
}

/// Serve a single resolved request on `router`.
///
/// `request_seq` numbers requests within the connection for the trace.
pub async fn serve_request(
    request: Request<()>,
    stream: RequestStream<QuinnBidi, Bytes>,
    router: Router,
    tracer: Option<ConnectionTracer>,
    request_seq: u64,
) -> Result<(), BridgeError> {
    let (mut send, recv) = stream.split();
    let (parts, ()) = request.into_parts();

    if let Some(tracer) = &tracer {
        tracer.record(TraceEvent::RequestReceived {
            request: request_seq,
            method: parts.method.to_string(),
            path: parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_default(),
        });
    }

    let request = Request::from_parts(parts, Body::from_stream(request_body(recv)));
    let response = match router.oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let (mut parts, body) = response.into_parts();
    if !parts.headers.contains_key(header::CONTENT_LENGTH) {
        if let Some(len) = body.byte_len() {
            parts.headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
        }
    }
    let status = parts.status;

    send.send_response(Response::from_parts(parts, ()))
        .await
        .map_err(|e| BridgeError::SendResponse(e.to_string()))?;

    let mut body_bytes: u64 = 0;
    let mut data = body.into_data_stream();
    while let Some(chunk) = data.next().await {
        let chunk = chunk?;
        body_bytes += chunk.len() as u64;
        send.send_data(chunk)
            .await
            .map_err(|e| BridgeError::SendData(e.to_string()))?;
    }

    send.finish()
        .await
        .map_err(|e| BridgeError::Finish(e.to_string()))?;

    if let Some(tracer) = &tracer {
        tracer.record(TraceEvent::ResponseSent {
            request: request_seq,
            status: status.as_u16(),
            body_bytes,
        });
    }

    Ok(())
}

/// Adapt the receive half of a request stream into a body stream.
fn request_body(
    recv: RequestStream<QuinnRecv, Bytes>,
) -> impl Stream<Item = Result<Bytes, std::io::Error>> + Send + 'static {
    futures_util::stream::unfold(Some(recv), |state| async move {
        let mut recv = state?;
        match recv.recv_data().await {
            Ok(Some(mut chunk)) => {
                let bytes = chunk.copy_to_bytes(chunk.remaining());
                Some((Ok(bytes), Some(recv)))
            }
            Ok(None) => None,
            // End the stream after the first error.
            Err(e) => Some((Err(std::io::Error::other(e.to_string())), None)),
        }
    })
}
