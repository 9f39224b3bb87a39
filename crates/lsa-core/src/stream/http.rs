//! HTTP delivery for the action stream.
//!
//! A lightweight `tiny_http` server exposes `POST /analyze`. The
//! analysis runs on a worker thread writing into an in-process byte
//! pipe; the request thread streams the pipe to the client with chunked
//! transfer encoding. When the client disconnects, the pipe breaks and
//! the engine observes it as cancellation at its next write.

use std::io::{Read, Write};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tiny_http::{Header, Response, Server, StatusCode};
use tracing::{debug, error, info, warn};

use lsa_common::{Error, Result, StructuredError};

use crate::config::AnalysisConfig;
use crate::engine::AnalysisEngine;
use crate::executor::QueryExecutor;
use crate::request::AnalysisRequest;
use crate::stream::StreamEncoder;

/// Bytes buffered before the legacy (non-flush-fix) path pushes a chunk.
const LEGACY_COALESCE_BYTES: usize = 8192;

/// Configuration for the HTTP serving layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    /// Bind address (default: 127.0.0.1).
    pub bind: String,
    /// Port (default: 3580).
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 3580,
        }
    }
}

/// Writer half of the in-process byte pipe.
///
/// Bytes accumulate in a local buffer; `flush` (or exceeding the
/// coalesce limit) hands the buffer to the reader side as one chunk.
/// Writing after the reader is gone fails with `BrokenPipe`, which the
/// engine treats as client disconnect.
pub struct ChannelWriter {
    tx: mpsc::Sender<Vec<u8>>,
    buf: Vec<u8>,
    coalesce_limit: usize,
}

impl ChannelWriter {
    fn send_buf(&mut self) -> std::io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let chunk = std::mem::take(&mut self.buf);
        self.tx
            .send(chunk)
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::BrokenPipe))
    }
}

impl Write for ChannelWriter {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.buf.extend_from_slice(data);
        if self.buf.len() >= self.coalesce_limit {
            self.send_buf()?;
        }
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.send_buf()
    }
}

impl Drop for ChannelWriter {
    fn drop(&mut self) {
        let _ = self.send_buf();
    }
}

/// Reader half of the in-process byte pipe.
pub struct ChannelReader {
    rx: mpsc::Receiver<Vec<u8>>,
    pending: Vec<u8>,
    pos: usize,
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize> {
        if self.pos >= self.pending.len() {
            match self.rx.recv() {
                Ok(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                // Writer gone: clean end of stream.
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.pending.len() - self.pos);
        out[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

/// Create a connected byte pipe with the given coalesce limit.
pub fn byte_pipe(coalesce_limit: usize) -> (ChannelWriter, ChannelReader) {
    let (tx, rx) = mpsc::channel();
    (
        ChannelWriter {
            tx,
            buf: Vec::new(),
            coalesce_limit,
        },
        ChannelReader {
            rx,
            pending: Vec::new(),
            pos: 0,
        },
    )
}

/// Run the analysis HTTP server until the process exits.
pub fn serve(
    config: &ServeConfig,
    executor: Arc<dyn QueryExecutor>,
    analysis: AnalysisConfig,
) -> Result<()> {
    let addr = format!("{}:{}", config.bind, config.port);
    let server = Server::http(&addr)
        .map_err(|e| Error::Io(std::io::Error::other(format!("bind {addr}: {e}"))))?;
    info!(%addr, "analysis server listening");

    for mut request in server.incoming_requests() {
        if request.url() != "/analyze" {
            let _ = request.respond(Response::empty(StatusCode(404)));
            continue;
        }
        if request.method() != &tiny_http::Method::Post {
            let _ = request.respond(Response::empty(StatusCode(405)));
            continue;
        }

        let mut body = String::new();
        if request.as_reader().read_to_string(&mut body).is_err() {
            let _ = request.respond(Response::empty(StatusCode(400)));
            continue;
        }

        let analysis_request: AnalysisRequest = match serde_json::from_str(&body) {
            Ok(req) => req,
            Err(e) => {
                respond_invalid(request, &Error::InvalidRequest(e.to_string()));
                continue;
            }
        };
        // A request rejected here never opens a stream body. Preflight
        // covers validation plus candidate resolution, so an empty
        // candidate set gets a plain 400 rather than a chunked stream.
        let engine = AnalysisEngine::new(executor.as_ref(), analysis);
        if let Err(e) = engine.preflight(&analysis_request) {
            respond_invalid(request, &e);
            continue;
        }

        stream_analysis(request, analysis_request, Arc::clone(&executor), analysis);
    }
    Ok(())
}

fn respond_invalid(request: tiny_http::Request, error: &Error) {
    warn!(%error, "rejecting invalid request");
    let payload = StructuredError::from(error).to_json();
    let response = Response::from_string(payload)
        .with_status_code(StatusCode(400))
        .with_header(json_header());
    let _ = request.respond(response);
}

fn stream_analysis(
    request: tiny_http::Request,
    analysis_request: AnalysisRequest,
    executor: Arc<dyn QueryExecutor>,
    analysis: AnalysisConfig,
) {
    // With the flush fix on, the encoder flushes per action and the
    // limit only backstops oversized single actions; with it off, the
    // limit is what batches output into chunks.
    let (writer, reader) = byte_pipe(LEGACY_COALESCE_BYTES);

    let compress = analysis_request.compress_response;
    let flush_fix = analysis_request.flush_fix;
    let worker = thread::spawn(move || {
        let mut sink = StreamEncoder::new(writer, compress, flush_fix);
        let engine = AnalysisEngine::new(executor.as_ref(), analysis);
        match engine.run(&analysis_request, &mut sink) {
            Ok(summary) => {
                debug!(session = %summary.session_id, state = %summary.state, "session finished")
            }
            Err(e) if e.is_cancellation() => {
                debug!("session cancelled by client disconnect")
            }
            Err(e) => error!(%e, "session failed"),
        }
    });

    let mut response = Response::new(StatusCode(200), Vec::new(), reader, None, None)
        .with_header(ndjson_header());
    if compress {
        response.add_header(gzip_header());
    }
    // Blocks until the engine closes the pipe or the client goes away.
    let _ = request.respond(response);
    let _ = worker.join();
}

fn ndjson_header() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/x-ndjson"[..])
        .expect("static header is valid")
}

fn json_header() -> Header {
    Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
        .expect("static header is valid")
}

fn gzip_header() -> Header {
    Header::from_bytes(&b"Content-Encoding"[..], &b"gzip"[..]).expect("static header is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipe_delivers_flushed_chunks() {
        let (mut writer, mut reader) = byte_pipe(LEGACY_COALESCE_BYTES);
        writer.write_all(b"hello").unwrap();
        writer.flush().unwrap();

        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_pipe_coalesces_until_limit() {
        let (mut writer, mut reader) = byte_pipe(4);
        // Below the limit: nothing sent yet.
        writer.write_all(b"ab").unwrap();
        // Crossing the limit pushes the accumulated buffer.
        writer.write_all(b"cdef").unwrap();

        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"abcdef");
    }

    #[test]
    fn test_pipe_broken_on_reader_drop() {
        let (mut writer, reader) = byte_pipe(8);
        drop(reader);
        writer.write_all(b"0123456789").unwrap_err();
    }

    #[test]
    fn test_pipe_end_of_stream_on_writer_drop() {
        let (mut writer, mut reader) = byte_pipe(1024);
        writer.write_all(b"tail").unwrap();
        drop(writer); // Drop sends the remaining buffer.

        let mut collected = Vec::new();
        reader.read_to_end(&mut collected).unwrap();
        assert_eq!(collected, b"tail");
    }

    #[test]
    fn test_default_serve_config() {
        let cfg = ServeConfig::default();
        assert_eq!(cfg.bind, "127.0.0.1");
        assert_eq!(cfg.port, 3580);
    }
}
