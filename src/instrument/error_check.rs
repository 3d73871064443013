//! Hooks run after a property read or write to collect device errors.

use crate::adapters::Adapter;
use crate::error::{ScpiError, ScpiResult};
use crate::limits::MAX_ERROR_QUEUE_DEPTH;
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static ERROR_REPLY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*([+-]?\d+)\s*,\s*"?(.*?)"?\s*$"#).expect("Invalid error reply regex")
});

/// Error polling invoked after properties that ask for it.
///
/// A non-empty list fails the property access with
/// [`ScpiError::Instrument`].
pub trait ErrorCheck: Send {
    /// Called after a read of a property with `check_get_errors`.
    fn check_get_errors(&mut self, adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>>;

    /// Called after a write of a property with `check_set_errors`.
    fn check_set_errors(&mut self, adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
        self.check_get_errors(adapter)
    }
}

/// Never reports errors and sends nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoErrorCheck;

impl ErrorCheck for NoErrorCheck {
    fn check_get_errors(&mut self, _adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
        Ok(Vec::new())
    }
}

/// One decoded `SYST:ERR?` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedError {
    /// Numeric code, 0 means the queue is empty
    pub code: i32,
    /// Message text without quotes
    pub message: String,
}

impl QueuedError {
    /// Parse `-113,"Undefined header"`.
    pub fn parse(reply: &str) -> ScpiResult<Self> {
        let caps = ERROR_REPLY_REGEX
            .captures(reply)
            .ok_or_else(|| ScpiError::Parse(format!("unexpected error reply '{}'", reply.trim())))?;
        let code = caps[1]
            .parse()
            .map_err(|_| ScpiError::Parse(format!("error code '{}' out of range", &caps[1])))?;
        Ok(Self {
            code,
            message: caps[2].to_string(),
        })
    }

    /// True for the `0,"No error"` sentinel.
    pub fn is_empty(&self) -> bool {
        self.code == 0
    }
}

/// Drain the SCPI error queue, at most [`MAX_ERROR_QUEUE_DEPTH`] entries.
pub fn drain_error_queue(adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
    let mut errors = Vec::new();
    for _ in 0..MAX_ERROR_QUEUE_DEPTH {
        let reply = adapter.ask("SYST:ERR?")?;
        let entry = QueuedError::parse(&reply)?;
        if entry.is_empty() {
            return Ok(errors);
        }
        warn!(code = entry.code, message = %entry.message, "instrument error");
        errors.push(format!("{}, {}", entry.code, entry.message));
    }
    warn!(
        depth = MAX_ERROR_QUEUE_DEPTH,
        "error queue did not empty, giving up"
    );
    Ok(errors)
}

/// Standard SCPI hook: drain `SYST:ERR?`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScpiErrorQueue;

impl ErrorCheck for ScpiErrorQueue {
    fn check_get_errors(&mut self, adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
        drain_error_queue(adapter)
    }
}

/// Hook for instruments that echo a prompt line (`=>`, `?>`) after every
/// command: consume and log it, report nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PromptLine;

impl ErrorCheck for PromptLine {
    fn check_get_errors(&mut self, adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
        debug!("check_get_errors");
        let prompt = adapter.read().inspect_err(|e| {
            warn!(error = %e, "getting a property failed");
        })?;
        debug!(prompt = %prompt.trim(), "prompt");
        Ok(Vec::new())
    }

    fn check_set_errors(&mut self, adapter: &mut dyn Adapter) -> ScpiResult<Vec<String>> {
        debug!("check_set_errors");
        let prompt = adapter.read().inspect_err(|e| {
            warn!(error = %e, "setting a property failed");
        })?;
        debug!(prompt = %prompt.trim(), "prompt");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[test]
    fn parses_error_replies() {
        let e = QueuedError::parse("-113,\"Undefined header\"\n").unwrap();
        assert_eq!(e.code, -113);
        assert_eq!(e.message, "Undefined header");
        assert!(QueuedError::parse("+0,\"No error\"").unwrap().is_empty());
        assert!(QueuedError::parse("garbage").is_err());
    }

    #[test]
    fn drains_until_no_error() {
        let mut mock = MockAdapter::new([
            (Some("SYST:ERR?"), Some("-113,\"Undefined header\"")),
            (Some("SYST:ERR?"), Some("-222,\"Data out of range\"")),
            (Some("SYST:ERR?"), Some("0,\"No error\"")),
        ]);
        let handle = mock.handle();
        let errors = ScpiErrorQueue.check_set_errors(&mut mock).unwrap();
        assert_eq!(errors, vec!["-113, Undefined header", "-222, Data out of range"]);
        handle.assert_finished();
    }

    #[test]
    fn queue_drain_is_bounded() {
        let script = (0..MAX_ERROR_QUEUE_DEPTH).map(|_| (Some("SYST:ERR?"), Some("-100,\"Command error\"")));
        let mut mock = MockAdapter::new(script);
        let errors = drain_error_queue(&mut mock).unwrap();
        assert_eq!(errors.len(), MAX_ERROR_QUEUE_DEPTH);
    }

    #[test]
    fn prompt_hook_consumes_one_line() {
        let mut mock = MockAdapter::new([(None::<&str>, Some("=>"))]);
        let handle = mock.handle();
        assert!(PromptLine.check_get_errors(&mut mock).unwrap().is_empty());
        handle.assert_finished();
    }
}
