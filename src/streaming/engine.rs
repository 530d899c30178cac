//! Chunked range delivery with adaptive sizing, an inactivity timeout and
//! retry of transient read errors.

use std::io::{self, SeekFrom};
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt};
use vidshelf_common::Error;

use super::adaptive::CongestionWindow;
use super::range::ByteRange;
use super::StreamOptions;

/// Lifecycle of one streamed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Init,
    RangeValidated,
    Streaming,
    Complete,
    Timeout,
    Aborted,
}

impl StreamPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Timeout | Self::Aborted)
    }
}

/// Read errors worth retrying on the same chunk.
pub fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::Interrupted
            | io::ErrorKind::TimedOut
            | io::ErrorKind::WouldBlock
    )
}

/// Pull-driven reader of one byte range.
///
/// The reader must already be positioned at the start of the range. Dropping
/// the stream (for example when the client disconnects) closes the reader.
pub struct RangeStream<R> {
    reader: R,
    offset: u64,
    end: u64,
    window: CongestionWindow,
    options: StreamOptions,
    phase: StreamPhase,
    pause: Duration,
    mark: Instant,
    last_delivered: Instant,
    label: String,
}

impl<R> RangeStream<R>
where
    R: AsyncRead + AsyncSeek + Unpin + Send + 'static,
{
    pub fn new(
        reader: R,
        range: ByteRange,
        file_size: u64,
        options: StreamOptions,
        label: impl Into<String>,
    ) -> Self {
        Self {
            reader,
            offset: range.start,
            end: range.end,
            window: CongestionWindow::for_file(file_size),
            options,
            phase: StreamPhase::RangeValidated,
            pause: Duration::ZERO,
            mark: Instant::now(),
            last_delivered: Instant::now(),
            label: label.into(),
        }
    }

    pub fn phase(&self) -> StreamPhase {
        self.phase
    }

    pub fn window(&self) -> &CongestionWindow {
        &self.window
    }

    /// Produce the next chunk, or `None` once the range is delivered or the
    /// stream has failed.
    pub async fn next_chunk(&mut self) -> Option<io::Result<Bytes>> {
        if self.phase.is_terminal() {
            return None;
        }
        if self.offset > self.end {
            self.set_phase(StreamPhase::Complete);
            return None;
        }
        if self.phase == StreamPhase::RangeValidated {
            self.set_phase(StreamPhase::Streaming);
        }

        if !self.pause.is_zero() {
            tokio::time::sleep(self.pause).await;
            self.mark = Instant::now();
        }

        let remaining = self.end - self.offset + 1;
        let want = (self.window.size() as u64).min(remaining) as usize;

        match self.read_with_retry(want).await {
            Ok(chunk) if chunk.is_empty() => {
                // EOF before the range end: the file shrank.
                tracing::debug!(file = %self.label, offset = self.offset, "Reached end of file early");
                self.set_phase(StreamPhase::Complete);
                None
            }
            Ok(chunk) => {
                self.offset += chunk.len() as u64;
                let (_, pause) = self.window.record(chunk.len(), self.mark.elapsed());
                self.pause = pause;
                self.mark = Instant::now();
                self.last_delivered = self.mark;
                Some(Ok(chunk))
            }
            Err(e) => Some(Err(e)),
        }
    }

    /// Read one chunk, retrying transient errors. The inactivity window runs
    /// from the last delivered chunk, so retries share what is left of it.
    async fn read_with_retry(&mut self, want: usize) -> io::Result<Bytes> {
        let mut retries = 0;
        loop {
            let left = self
                .options
                .inactivity_timeout
                .saturating_sub(self.last_delivered.elapsed());
            if left.is_zero() {
                return Err(self.inactive());
            }

            let mut buf = vec![0u8; want];
            let read = tokio::time::timeout(left, self.reader.read(&mut buf)).await;

            match read {
                Err(_) => return Err(self.inactive()),
                Ok(Ok(n)) => {
                    buf.truncate(n);
                    return Ok(Bytes::from(buf));
                }
                Ok(Err(e)) if is_transient(&e) && retries < self.options.max_retries => {
                    retries += 1;
                    tracing::warn!(
                        file = %self.label,
                        offset = self.offset,
                        attempt = retries,
                        error = %e,
                        "Transient read error, retrying chunk"
                    );
                    tokio::time::sleep(self.options.retry_delay).await;
                    if let Err(e) = self.reader.seek(SeekFrom::Start(self.offset)).await {
                        self.set_phase(StreamPhase::Aborted);
                        return Err(e);
                    }
                }
                Ok(Err(e)) => {
                    tracing::warn!(file = %self.label, offset = self.offset, error = %e, "Read failed, aborting stream");
                    self.set_phase(StreamPhase::Aborted);
                    return Err(e);
                }
            }
        }
    }

    fn inactive(&mut self) -> io::Error {
        tracing::warn!(
            file = %self.label,
            offset = self.offset,
            timeout_secs = self.options.inactivity_timeout.as_secs(),
            "Stream inactive, aborting"
        );
        self.set_phase(StreamPhase::Timeout);
        io::Error::new(
            io::ErrorKind::TimedOut,
            Error::timeout(format!(
                "no data delivered within {:?}",
                self.options.inactivity_timeout
            )),
        )
    }

    fn set_phase(&mut self, phase: StreamPhase) {
        tracing::trace!(file = %self.label, from = ?self.phase, to = ?phase, "Stream phase");
        self.phase = phase;
    }

    /// Turn the stream into a response body.
    pub fn into_body(self) -> Body {
        let stream = futures::stream::unfold(self, |mut state| async move {
            state.next_chunk().await.map(|chunk| (chunk, state))
        });
        Body::from_stream(stream)
    }
}

impl<R> Drop for RangeStream<R> {
    fn drop(&mut self) {
        if !self.phase.is_terminal() && self.phase != StreamPhase::RangeValidated {
            tracing::debug!(
                file = %self.label,
                delivered_to = self.offset,
                "Client disconnected, stream dropped"
            );
        }
    }
}
