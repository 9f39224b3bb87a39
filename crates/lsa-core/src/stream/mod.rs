//! Action stream encoding and transport.
//!
//! Analysis stages talk to an abstract [`ActionSink`]; the wire format
//! lives entirely behind it. The concrete [`StreamEncoder`] serializes
//! actions as newline-delimited JSON (one action per line, terminated by
//! an empty trailing segment), optionally gzip-compressed, and flushes
//! per action when the flush fix is enabled so clients observe true
//! incremental delivery.

pub mod http;

use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use lsa_common::{Error, Result};

use crate::actions::Action;

/// Where analysis stages send their output.
///
/// `emit` and `close` can fail (the peer may be gone); `fail` is
/// best-effort by construction and must never be called for
/// cancellation, which terminates streams silently.
pub trait ActionSink {
    /// Append one action to the stream.
    fn emit(&mut self, action: &Action) -> Result<()>;

    /// Finish the stream cleanly.
    fn close(&mut self) -> Result<()>;

    /// Emit a terminal `error` action and close. Secondary failures are
    /// swallowed: there is nobody left to report them to.
    fn fail(&mut self, error: &Error) {
        let _ = self.emit(&Action::Error(error.to_string()));
        let _ = self.close();
    }
}

enum Body<W: Write> {
    Plain(W),
    Gzip(GzEncoder<W>),
    Closed,
}

/// Newline-delimited JSON encoder over any byte sink.
pub struct StreamEncoder<W: Write> {
    body: Body<W>,
    flush_fix: bool,
}

impl<W: Write> StreamEncoder<W> {
    pub fn new(writer: W, compress: bool, flush_fix: bool) -> Self {
        let body = if compress {
            Body::Gzip(GzEncoder::new(writer, Compression::default()))
        } else {
            Body::Plain(writer)
        };
        Self { body, flush_fix }
    }

    /// Transport-level content-encoding indicator, when compression is
    /// active.
    pub fn content_encoding(&self) -> Option<&'static str> {
        match self.body {
            Body::Gzip(_) => Some("gzip"),
            _ => None,
        }
    }

    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        match &mut self.body {
            Body::Plain(w) => {
                w.write_all(line)?;
                w.write_all(b"\n")?;
                if self.flush_fix {
                    w.flush()?;
                }
            }
            Body::Gzip(w) => {
                w.write_all(line)?;
                w.write_all(b"\n")?;
                if self.flush_fix {
                    w.flush()?;
                }
            }
            Body::Closed => return Err(Error::StreamClosed),
        }
        Ok(())
    }
}

impl<W: Write> ActionSink for StreamEncoder<W> {
    fn emit(&mut self, action: &Action) -> Result<()> {
        let line =
            serde_json::to_vec(action).map_err(|e| Error::Serialization(e.to_string()))?;
        self.write_line(&line)
    }

    fn close(&mut self) -> Result<()> {
        match std::mem::replace(&mut self.body, Body::Closed) {
            Body::Plain(mut w) => {
                w.flush()?;
            }
            Body::Gzip(gz) => {
                let mut w = gz.finish()?;
                w.flush()?;
            }
            Body::Closed => {}
        }
        Ok(())
    }
}

/// Sink that collects actions in memory. Used by tests and by embedders
/// that want structured results without the wire format.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub actions: Vec<Action>,
    pub closed: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ActionSink for MemorySink {
    fn emit(&mut self, action: &Action) -> Result<()> {
        if self.closed {
            return Err(Error::StreamClosed);
        }
        self.actions.push(action.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Decode a complete (non-compressed) newline-delimited action stream.
///
/// The final segment after the last newline must be empty.
pub fn decode_ndjson(bytes: &[u8]) -> Result<Vec<Action>> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| Error::Serialization(format!("stream is not UTF-8: {e}")))?;
    let mut segments: Vec<&str> = text.split('\n').collect();
    match segments.pop() {
        Some("") => {}
        _ => {
            return Err(Error::Serialization(
                "stream does not end with an empty segment".into(),
            ))
        }
    }
    segments
        .into_iter()
        .map(|line| serde_json::from_str(line).map_err(Error::from))
        .collect()
}

/// Decode a gzip-compressed action stream.
pub fn decode_gzip_ndjson(bytes: &[u8]) -> Result<Vec<Action>> {
    let mut decoder = flate2::read::GzDecoder::new(bytes);
    let mut plain = Vec::new();
    decoder.read_to_end(&mut plain)?;
    decode_ndjson(&plain)
}
