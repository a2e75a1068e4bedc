//! Per-stream reader tasks.
//!
//! A reader pulls newline-terminated chunks from one child stream,
//! decodes them and pushes [`LineRecord`]s onto the shared channel.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::channel::OutputChannel;
use super::record::{LineRecord, StreamKind};
use crate::output::{trim_line_terminator, ByteDecoder};

/// Default buffer size for reading child output.
pub const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Reader for one child process stream.
pub struct StreamReader<R: AsyncRead + Unpin + Send + 'static> {
    reader: R,
    kind: StreamKind,
    channel: Arc<OutputChannel>,
    cancel: CancellationToken,
    echo: bool,
    buffer_size: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> StreamReader<R> {
    /// Create a new StreamReader.
    ///
    /// # Arguments
    ///
    /// * `reader` - The child stream.
    /// * `kind` - Which stream `reader` is; records are tagged with it.
    /// * `channel` - Destination for records.
    /// * `cancel` - Run cancellation token.
    ///
    /// Stderr readers always echo lines to the log; stdout readers only
    /// when [`StreamReader::with_echo`] is set.
    pub fn new(
        reader: R,
        kind: StreamKind,
        channel: Arc<OutputChannel>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            reader,
            kind,
            channel,
            cancel,
            echo: kind == StreamKind::Stderr,
            buffer_size: READ_BUFFER_SIZE,
        }
    }

    /// Also echo stdout lines to the log (live tailing).
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo || self.kind == StreamKind::Stderr;
        self
    }

    /// Create with custom buffer size.
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Read until end-of-stream, cancellation, or a read error.
    ///
    /// Returns the number of records forwarded.
    pub async fn run(self) -> usize {
        let kind = self.kind;
        let mut reader = BufReader::with_capacity(self.buffer_size, self.reader);
        let mut buf = Vec::new();
        let mut forwarded = 0;

        loop {
            buf.clear();

            let read = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!(stream = %kind, "reader: cancelled");
                    break;
                }
                read = reader.read_until(b'\n', &mut buf) => read,
            };

            match read {
                Ok(0) => {
                    debug!(stream = %kind, "reader: EOF");
                    break;
                }
                Ok(n) => {
                    trace!(stream = %kind, "reader: read {} bytes", n);
                    if let Some(record) = Self::to_record(kind, &buf) {
                        if self.echo {
                            match kind {
                                StreamKind::Stderr => warn!(stream = %kind, "{}", record.text()),
                                StreamKind::Stdout => info!(stream = %kind, "{}", record.text()),
                            }
                        }
                        self.channel.put(record);
                        forwarded += 1;
                    }
                }
                Err(e) => {
                    error!(stream = %kind, "reader fault, treating as EOF: {}", e);
                    break;
                }
            }
        }

        forwarded
    }

    /// Build a record from one raw line, or `None` for blank lines.
    fn to_record(kind: StreamKind, raw: &[u8]) -> Option<LineRecord> {
        let decoded = ByteDecoder::decode(trim_line_terminator(raw));
        if decoded.lossy {
            debug!(stream = %kind, "reader: lossy decode");
        }
        if decoded.text.trim().is_empty() {
            return None;
        }
        Some(LineRecord::new(kind, decoded.into_string()))
    }
}
