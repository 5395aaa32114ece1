//! qlog record types.
//!
//! Serialized as JSON-SEQ: every record is prefixed with the ASCII record
//! separator and terminated by a newline.

use std::io::{self, Write};

use serde::Serialize;

use crate::net::connection::{ConnectionId, Perspective};

pub const QLOG_VERSION: &str = "0.3";
pub const QLOG_FORMAT: &str = "JSON-SEQ";

/// Record separator preceding each JSON-SEQ record.
const RECORD_SEPARATOR: u8 = 0x1e;

#[derive(Debug, Serialize)]
pub struct QlogHeader {
    pub qlog_version: &'static str,
    pub qlog_format: &'static str,
    pub title: String,
    pub trace: TraceHeader,
}

#[derive(Debug, Serialize)]
pub struct TraceHeader {
    pub vantage_point: VantagePoint,
    pub common_fields: CommonFields,
}

#[derive(Debug, Serialize)]
pub struct VantagePoint {
    #[serde(rename = "type")]
    pub kind: &'static str,
}

#[derive(Debug, Serialize)]
pub struct CommonFields {
    #[serde(rename = "ODCID")]
    pub odcid: String,
    pub time_format: &'static str,
    /// Milliseconds since the Unix epoch.
    pub reference_time: f64,
}

impl QlogHeader {
    pub fn new(perspective: Perspective, id: &ConnectionId, reference_time_ms: f64) -> Self {
        Self {
            qlog_version: QLOG_VERSION,
            qlog_format: QLOG_FORMAT,
            title: format!("h3-testbed {} trace", perspective),
            trace: TraceHeader {
                vantage_point: VantagePoint {
                    kind: perspective.as_str(),
                },
                common_fields: CommonFields {
                    odcid: id.to_string(),
                    time_format: "relative",
                    reference_time: reference_time_ms,
                },
            },
        }
    }
}

/// Transport statistics captured when a connection ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CloseStats {
    pub rtt_ms: f64,
    pub congestion_window: u64,
    pub sent_packets: u64,
    pub lost_packets: u64,
    pub lost_bytes: u64,
    pub congestion_events: u64,
    pub udp_tx_bytes: u64,
    pub udp_rx_bytes: u64,
}

/// Event payloads. The qlog event name comes from [`TraceEvent::name`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TraceEvent {
    ConnectionStarted {
        listener: String,
        src_ip: String,
        src_port: u16,
    },
    HandshakeComplete {
        new: &'static str,
        alpn: Option<String>,
    },
    RequestReceived {
        request: u64,
        method: String,
        path: String,
    },
    ResponseSent {
        request: u64,
        status: u16,
        body_bytes: u64,
    },
    ConnectionClosed {
        reason: String,
        stats: CloseStats,
    },
}

impl TraceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            TraceEvent::ConnectionStarted { .. } => "connectivity:connection_started",
            TraceEvent::HandshakeComplete { .. } => "connectivity:connection_state_updated",
            TraceEvent::RequestReceived { .. } => "http:request_received",
            TraceEvent::ResponseSent { .. } => "http:response_sent",
            TraceEvent::ConnectionClosed { .. } => "connectivity:connection_closed",
        }
    }

    pub fn handshake_complete(alpn: Option<String>) -> Self {
        TraceEvent::HandshakeComplete {
            new: "handshake_complete",
            alpn,
        }
    }
}

#[derive(Debug, Serialize)]
struct EventRecord<'a> {
    /// Milliseconds since the trace's reference time.
    time: f64,
    name: &'static str,
    data: &'a TraceEvent,
}

/// Write one JSON-SEQ record.
pub fn write_record<W: Write + ?Sized, T: Serialize>(out: &mut W, record: &T) -> io::Result<()> {
    out.write_all(&[RECORD_SEPARATOR])?;
    serde_json::to_writer(&mut *out, record)?;
    out.write_all(b"\n")
}

/// Write an event record at `time_ms`.
pub fn write_event<W: Write + ?Sized>(
    out: &mut W,
    time_ms: f64,
    event: &TraceEvent,
) -> io::Result<()> {
    let record = EventRecord {
        time: time_ms,
        name: event.name(),
        data: event,
    };
    write_record(out, &record)
}
