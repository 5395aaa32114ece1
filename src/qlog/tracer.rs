//! Per-connection trace recorder.
//!
//! A [`ConnectionTracer`] is a cheap cloneable handle. The connection task and
//! each of its request tasks hold one. Events go over an unbounded channel to
//! a single writer task that owns the sink, so records land in the order they
//! were issued. The writer closes the sink once every handle is gone.
//!
//! The writer is an ordinary async task. Only the file I/O itself runs on the
//! blocking pool, one short job per batch of queued events, so an idle
//! connection holds no blocking thread.

use std::io;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::net::connection::{ConnectionId, Perspective};
use crate::qlog::event::{write_event, write_record, QlogHeader, TraceEvent};
use crate::qlog::writer::WriteCloser;

/// Upper bound on events written per blocking job.
const BATCH_LIMIT: usize = 256;

#[derive(Debug)]
struct Record {
    at: Instant,
    event: TraceEvent,
}

/// Handle for recording events on one connection.
#[derive(Debug, Clone)]
pub struct ConnectionTracer {
    id: ConnectionId,
    tx: mpsc::UnboundedSender<Record>,
}

impl ConnectionTracer {
    /// Start the writer for `sink` and return the recording handle.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(
        sink: Box<dyn WriteCloser>,
        perspective: Perspective,
        id: ConnectionId,
    ) -> (Self, TraceWriterHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let reference_time_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64() * 1000.0)
            .unwrap_or_default();
        let header = QlogHeader::new(perspective, &id, reference_time_ms);

        let task = tokio::spawn(run_writer(sink, header, started, rx));

        (Self { id, tx }, TraceWriterHandle { task })
    }

    /// Queue an event. Events after the writer stopped are dropped.
    pub fn record(&self, event: TraceEvent) {
        let record = Record {
            at: Instant::now(),
            event,
        };
        if self.tx.send(record).is_err() {
            tracing::trace!(connection_id = %self.id, "Trace writer gone, event dropped");
        }
    }
}

/// Completion handle of a connection's trace writer.
#[derive(Debug)]
pub struct TraceWriterHandle {
    task: JoinHandle<io::Result<()>>,
}

impl TraceWriterHandle {
    /// Wait until the sink has been flushed and closed.
    ///
    /// Resolves once all [`ConnectionTracer`] clones are dropped. Returns the
    /// first write, flush or close error.
    pub async fn finished(self) -> io::Result<()> {
        match self.task.await {
            Ok(result) => result,
            Err(e) => Err(io::Error::other(e)),
        }
    }
}

type Sink = Box<dyn WriteCloser>;

/// Run `op` against the sink on the blocking pool and hand the sink back.
///
/// If the job panics the sink is dropped there, which closes it.
async fn on_blocking<F>(sink: Sink, op: F) -> io::Result<(Sink, io::Result<()>)>
where
    F: FnOnce(&mut dyn WriteCloser) -> io::Result<()> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut sink = sink;
        let result = op(&mut *sink);
        (sink, result)
    })
    .await
    .map_err(io::Error::other)
}

async fn run_writer(
    sink: Sink,
    header: QlogHeader,
    started: Instant,
    mut rx: mpsc::UnboundedReceiver<Record>,
) -> io::Result<()> {
    let (mut sink, written) = on_blocking(sink, move |sink| write_record(sink, &header)).await?;
    let mut first_error = written.err();

    let mut batch = Vec::with_capacity(BATCH_LIMIT);
    while rx.recv_many(&mut batch, BATCH_LIMIT).await > 0 {
        if first_error.is_some() {
            // Keep draining so senders never see a dead sink.
            batch.clear();
            continue;
        }
        let records = std::mem::take(&mut batch);
        let (returned, written) = on_blocking(sink, move |sink| {
            for record in &records {
                let time_ms = record.at.saturating_duration_since(started).as_secs_f64() * 1000.0;
                write_event(&mut *sink, time_ms, &record.event)?;
            }
            Ok(())
        })
        .await?;
        sink = returned;
        first_error = written.err();
    }

    let (_, closed) = on_blocking(sink, |sink| sink.close()).await?;
    match first_error {
        Some(e) => Err(e),
        None => closed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MemorySink {
        data: Arc<Mutex<Vec<u8>>>,
        closes: Arc<AtomicUsize>,
        fail_after: Option<usize>,
        writes: Arc<AtomicUsize>,
    }

    impl Write for MemorySink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            let n = self.writes.fetch_add(1, Ordering::SeqCst);
            if self.fail_after.is_some_and(|limit| n >= limit) {
                return Err(io::Error::other("write failed"));
            }
            self.data.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl WriteCloser for MemorySink {
        fn close(&mut self) -> io::Result<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn records(data: &[u8]) -> Vec<serde_json::Value> {
        data.split(|b| *b == 0x1e)
            .filter(|chunk| !chunk.is_empty())
            .map(|chunk| serde_json::from_slice(chunk).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn events_written_in_order_then_closed() {
        let sink = MemorySink::default();
        let id = ConnectionId::from_bytes([9; 8]);
        let (tracer, writer) =
            ConnectionTracer::spawn(Box::new(sink.clone()), Perspective::Server, id);

        let clone = tracer.clone();
        tracer.record(TraceEvent::RequestReceived {
            request: 0,
            method: "GET".into(),
            path: "/1".into(),
        });
        clone.record(TraceEvent::ResponseSent {
            request: 0,
            status: 200,
            body_bytes: 1,
        });
        drop(tracer);
        drop(clone);

        writer.finished().await.unwrap();
        assert_eq!(sink.closes.load(Ordering::SeqCst), 1);

        let records = records(&sink.data.lock().unwrap());
        assert_eq!(records.len(), 3);
        assert_eq!(records[0]["trace"]["common_fields"]["ODCID"], "0909090909090909");
        assert_eq!(records[1]["name"], "http:request_received");
        assert_eq!(records[2]["name"], "http:response_sent");
    }

    #[tokio::test]
    async fn write_failure_still_closes_once() {
        let sink = MemorySink {
            fail_after: Some(2),
            ..MemorySink::default()
        };
        let (tracer, writer) = ConnectionTracer::spawn(
            Box::new(sink.clone()),
            Perspective::Server,
            ConnectionId::new(),
        );

        for request in 0..5 {
            tracer.record(TraceEvent::RequestReceived {
                request,
                method: "GET".into(),
                path: "/".into(),
            });
        }
        drop(tracer);

        let err = writer.finished().await.unwrap_err();
        assert_eq!(err.to_string(), "write failed");
        assert_eq!(sink.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn open_connection_does_not_hold_back_finished_one() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .max_blocking_threads(1)
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let long_lived = MemorySink::default();
            let (tracer_a, _writer_a) = ConnectionTracer::spawn(
                Box::new(long_lived),
                Perspective::Server,
                ConnectionId::new(),
            );
            tracer_a.record(TraceEvent::handshake_complete(Some("h3".into())));

            let short_lived = MemorySink::default();
            let (tracer_b, writer_b) = ConnectionTracer::spawn(
                Box::new(short_lived.clone()),
                Perspective::Server,
                ConnectionId::new(),
            );
            tracer_b.record(TraceEvent::RequestReceived {
                request: 0,
                method: "GET".into(),
                path: "/1".into(),
            });
            drop(tracer_b);

            tokio::time::timeout(std::time::Duration::from_secs(2), writer_b.finished())
                .await
                .expect("trace of a finished connection must close while another stays open")
                .unwrap();
            assert_eq!(short_lived.closes.load(Ordering::SeqCst), 1);
            assert_eq!(records(&short_lived.data.lock().unwrap()).len(), 2);

            drop(tracer_a);
        });
    }
}
