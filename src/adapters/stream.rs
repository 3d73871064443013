//! Line-terminated adapter over any blocking byte stream.

use super::Adapter;
use crate::error::{ScpiError, ScpiResult};
use crate::instrument::binary_block;
use crate::limits::{MAX_BLOCK_SIZE, MAX_RESPONSE_SIZE};
use std::io::{self, BufRead, BufReader, ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, trace};

/// [`Adapter`] over a blocking `Read + Write` stream.
///
/// The stream's own timeouts bound every read; `TimedOut` and `WouldBlock`
/// surface as [`ScpiError::Timeout`].
pub struct StreamAdapter<S: Read + Write + Send> {
    stream: Option<BufReader<S>>,
    label: String,
    timeout: Duration,
    write_termination: String,
    read_termination: String,
}

impl<S: Read + Write + Send> StreamAdapter<S> {
    /// Wrap `stream`. `label` identifies the connection in logs.
    pub fn new(stream: S, label: impl Into<String>, timeout: Duration) -> Self {
        Self {
            stream: Some(BufReader::new(stream)),
            label: label.into(),
            timeout,
            write_termination: "\n".to_string(),
            read_termination: "\n".to_string(),
        }
    }

    /// Set the terminators appended to commands and expected after replies.
    #[must_use]
    pub fn with_termination(mut self, write: &str, read: &str) -> Self {
        self.write_termination = write.to_string();
        self.read_termination = read.to_string();
        self
    }

    /// Connection label used in log fields.
    pub fn label(&self) -> &str {
        &self.label
    }

    fn stream(&mut self) -> ScpiResult<&mut BufReader<S>> {
        self.stream.as_mut().ok_or_else(|| {
            ScpiError::Io(io::Error::new(
                ErrorKind::NotConnected,
                "adapter has been closed",
            ))
        })
    }

    fn map_io(&self, err: io::Error) -> ScpiError {
        match err.kind() {
            ErrorKind::TimedOut | ErrorKind::WouldBlock => ScpiError::Timeout(self.timeout),
            _ => ScpiError::Io(err),
        }
    }

    /// Read until `terminator` (or any data when empty), up to `limit` bytes.
    fn read_until_terminator(&mut self, limit: usize) -> ScpiResult<Vec<u8>> {
        let terminator = self.read_termination.clone().into_bytes();
        let timeout = self.timeout;
        let stream = self.stream()?;
        let mut buf = Vec::new();

        loop {
            let chunk = match stream.fill_buf() {
                Ok([]) if buf.is_empty() => {
                    return Err(ScpiError::Io(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        "connection closed by instrument",
                    )))
                }
                Ok([]) => return Ok(buf),
                Ok(chunk) => chunk,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    return Err(match e.kind() {
                        ErrorKind::TimedOut | ErrorKind::WouldBlock => ScpiError::Timeout(timeout),
                        _ => ScpiError::Io(e),
                    })
                }
            };

            let (consumed, done) = match terminator.last() {
                None => {
                    buf.extend_from_slice(chunk);
                    (chunk.len(), true)
                }
                Some(&last) => match chunk.iter().position(|&b| b == last) {
                    Some(i) => {
                        buf.extend_from_slice(&chunk[..=i]);
                        (i + 1, buf.ends_with(&terminator))
                    }
                    None => {
                        buf.extend_from_slice(chunk);
                        (chunk.len(), false)
                    }
                },
            };
            stream.consume(consumed);

            if buf.len() > limit {
                return Err(ScpiError::ResponseTooLarge { max_bytes: limit });
            }
            if done {
                return Ok(buf);
            }
        }
    }
}

impl<S: Read + Write + Send> Adapter for StreamAdapter<S> {
    fn write(&mut self, command: &str) -> ScpiResult<()> {
        debug!(adapter = %self.label, command, "write");
        let payload = format!("{}{}", command, self.write_termination);
        let stream = self.stream()?.get_mut();
        let result = stream.write_all(payload.as_bytes()).and_then(|_| stream.flush());
        result.map_err(|e| self.map_io(e))
    }

    fn read(&mut self) -> ScpiResult<String> {
        let raw = self.read_until_terminator(MAX_RESPONSE_SIZE)?;
        let mut reply = String::from_utf8_lossy(&raw).into_owned();
        if !self.read_termination.is_empty() && reply.ends_with(&self.read_termination) {
            reply.truncate(reply.len() - self.read_termination.len());
        }
        debug!(adapter = %self.label, reply = %reply, "read");
        Ok(reply)
    }

    fn read_bytes(
        &mut self,
        count: Option<usize>,
        break_on_termchar: bool,
    ) -> ScpiResult<Vec<u8>> {
        let terminator = self.read_termination.clone().into_bytes();
        let timeout = self.timeout;
        let limit = count.unwrap_or(MAX_BLOCK_SIZE).min(MAX_BLOCK_SIZE);
        let stream = self.stream()?;
        let mut buf: Vec<u8> = Vec::new();
        let mut chunk = [0u8; 4096];

        loop {
            if count.is_some_and(|n| buf.len() >= n) {
                break;
            }
            let want = count.map_or(chunk.len(), |n| (n - buf.len()).min(chunk.len()));
            match stream.read(&mut chunk[..want]) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    // A stream that simply ran dry ends an unbounded read.
                    if count.is_none() && !buf.is_empty() && !break_on_termchar {
                        break;
                    }
                    return Err(ScpiError::Timeout(timeout));
                }
                Err(e) => return Err(ScpiError::Io(e)),
            }
            if buf.len() > limit {
                return Err(ScpiError::ResponseTooLarge { max_bytes: limit });
            }
            if break_on_termchar && !terminator.is_empty() && buf.ends_with(&terminator) {
                // Terminator bytes inside a definite-length block are payload.
                match binary_block::expected_len(&buf) {
                    Some(total) if buf.len() < total => continue,
                    _ => break,
                }
            }
        }

        trace!(adapter = %self.label, bytes = buf.len(), "read_bytes");
        if buf.is_empty() && count != Some(0) {
            return Err(ScpiError::Timeout(timeout));
        }
        Ok(buf)
    }

    fn close(&mut self) -> ScpiResult<()> {
        if self.stream.take().is_some() {
            debug!(adapter = %self.label, "closed");
        }
        Ok(())
    }
}
