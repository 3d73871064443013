//! Scripted adapter for testing drivers without hardware.
//!
//! The script is an ordered list of `(command, reply)` exchanges:
//! - `(Some(cmd), Some(reply))`: expect `cmd` to be written, then serve `reply`
//! - `(Some(cmd), None)`: expect `cmd` to be written, no reply
//! - `(None, Some(reply))`: serve `reply` on the next read without a write
//!
//! A write that does not match the next scripted command fails with
//! `InvalidData`; a read with nothing to serve times out.

use super::Adapter;
use crate::error::{ScpiError, ScpiResult};
use std::collections::VecDeque;
use std::io::{self, ErrorKind};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<(Option<String>, Option<Vec<u8>>)>,
    pending: VecDeque<Vec<u8>>,
    written: Vec<String>,
    closed: bool,
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Mock adapter replaying a scripted exchange.
///
/// # Example
///
/// ```
/// use daq_scpi::adapters::{Adapter, MockAdapter};
///
/// let mut adapter = MockAdapter::new([(Some("VOLT?"), Some("12.5"))]);
/// let handle = adapter.handle();
/// assert_eq!(adapter.ask("VOLT?").unwrap(), "12.5");
/// handle.assert_finished();
/// ```
#[derive(Debug)]
pub struct MockAdapter {
    state: Arc<Mutex<MockState>>,
}

/// Inspection handle that stays valid after the adapter moved into an
/// instrument.
#[derive(Debug, Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockAdapter {
    /// Create a mock from text exchanges.
    pub fn new<I, C, R>(exchanges: I) -> Self
    where
        I: IntoIterator<Item = (Option<C>, Option<R>)>,
        C: Into<String>,
        R: Into<String>,
    {
        let script = exchanges
            .into_iter()
            .map(|(cmd, reply)| (cmd.map(Into::into), reply.map(|r| r.into().into_bytes())))
            .collect();
        Self {
            state: Arc::new(Mutex::new(MockState {
                script,
                ..MockState::default()
            })),
        }
    }

    /// Append an exchange whose reply is raw bytes.
    #[must_use]
    pub fn with_binary_reply(self, command: Option<&str>, reply: &[u8]) -> Self {
        lock(&self.state)
            .script
            .push_back((command.map(str::to_string), Some(reply.to_vec())));
        self
    }

    /// Handle for assertions after the adapter has been boxed.
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            state: Arc::clone(&self.state),
        }
    }

    /// Box the adapter for an instrument.
    pub fn boxed(self) -> Box<dyn Adapter> {
        Box::new(self)
    }

    fn next_reply(&mut self) -> ScpiResult<Vec<u8>> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(closed());
        }
        if let Some(reply) = state.pending.pop_front() {
            return Ok(reply);
        }
        if matches!(state.script.front(), Some((None, _))) {
            if let Some((_, Some(reply))) = state.script.pop_front() {
                return Ok(reply);
            }
        }
        Err(ScpiError::Timeout(Duration::ZERO))
    }
}

fn closed() -> ScpiError {
    ScpiError::Io(io::Error::new(ErrorKind::NotConnected, "adapter has been closed"))
}

impl Adapter for MockAdapter {
    fn write(&mut self, command: &str) -> ScpiResult<()> {
        let mut state = lock(&self.state);
        if state.closed {
            return Err(closed());
        }
        state.written.push(command.to_string());
        match state.script.pop_front() {
            Some((Some(expected), reply)) if expected == command => {
                if let Some(reply) = reply {
                    state.pending.push_back(reply);
                }
                Ok(())
            }
            other => Err(ScpiError::Io(io::Error::new(
                ErrorKind::InvalidData,
                format!(
                    "unexpected write '{}', script expected {:?}",
                    command,
                    other.map(|(cmd, _)| cmd)
                ),
            ))),
        }
    }

    fn read(&mut self) -> ScpiResult<String> {
        let reply = self.next_reply()?;
        Ok(String::from_utf8_lossy(&reply).into_owned())
    }

    fn read_bytes(
        &mut self,
        count: Option<usize>,
        _break_on_termchar: bool,
    ) -> ScpiResult<Vec<u8>> {
        let mut reply = self.next_reply()?;
        if let Some(n) = count {
            if n < reply.len() {
                let rest = reply.split_off(n);
                lock(&self.state).pending.push_front(rest);
            }
        }
        Ok(reply)
    }

    fn close(&mut self) -> ScpiResult<()> {
        lock(&self.state).closed = true;
        Ok(())
    }
}

impl MockHandle {
    /// Commands written so far, in order.
    pub fn written(&self) -> Vec<String> {
        lock(&self.state).written.clone()
    }

    /// True once the adapter has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.state).closed
    }

    /// True when every scripted exchange has been consumed.
    pub fn is_finished(&self) -> bool {
        let state = lock(&self.state);
        state.script.is_empty() && state.pending.is_empty()
    }

    /// Panic unless every scripted exchange has been consumed.
    #[allow(clippy::panic)]
    pub fn assert_finished(&self) {
        let state = lock(&self.state);
        if !(state.script.is_empty() && state.pending.is_empty()) {
            panic!(
                "mock script not finished: {} exchanges and {} replies left, written so far: {:?}",
                state.script.len(),
                state.pending.len(),
                state.written
            );
        }
    }
}
