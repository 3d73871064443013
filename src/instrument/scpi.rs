//! IEEE 488.2 / SCPI common commands, composed into every driver.

use super::error_check::{drain_error_queue, QueuedError};
use super::Instrument;
use crate::error::ScpiResult;
use crate::property::{Cast, Property};

/// `*IDN?`, returned whole.
pub fn idn() -> Property {
    Property::measurement("id", "*IDN?").cast(Cast::Str).no_split()
}

/// Access to the instrument a driver owns.
pub trait Driver {
    /// The owned instrument.
    fn instrument(&mut self) -> &mut Instrument;
}

impl Driver for Instrument {
    fn instrument(&mut self) -> &mut Instrument {
        self
    }
}

/// Identification, status and error-queue commands.
///
/// Every method has a default; drivers override the ones their device
/// handles differently.
pub trait Scpi: Driver {
    /// Identification string.
    fn id(&mut self) -> ScpiResult<String> {
        self.instrument().get_as(&idn())
    }

    /// Clear status (`*CLS`).
    fn clear(&mut self) -> ScpiResult<()> {
        self.instrument().write("*CLS")
    }

    /// Reset to defaults (`*RST`).
    fn reset(&mut self) -> ScpiResult<()> {
        self.instrument().write("*RST")
    }

    /// Status byte (`*STB?`).
    fn status(&mut self) -> ScpiResult<i64> {
        self.instrument()
            .get_as(&Property::measurement("status", "*STB?").cast(Cast::Int))
    }

    /// Installed options (`*OPT?`).
    fn options(&mut self) -> ScpiResult<Vec<String>> {
        let reply = self.instrument().ask("*OPT?")?;
        Ok(reply
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }

    /// True once pending operations are complete (`*OPC?`).
    fn complete(&mut self) -> ScpiResult<bool> {
        let done: i64 = self
            .instrument()
            .get_as(&Property::measurement("complete", "*OPC?").cast(Cast::Int))?;
        Ok(done == 1)
    }

    /// Pop one entry from the error queue, `None` when it is empty.
    fn next_error(&mut self) -> ScpiResult<Option<QueuedError>> {
        let entry = QueuedError::parse(&self.instrument().ask("SYST:ERR?")?)?;
        Ok((!entry.is_empty()).then_some(entry))
    }

    /// Drain the error queue.
    fn check_errors(&mut self) -> ScpiResult<Vec<String>> {
        drain_error_queue(self.instrument().adapter_mut())
    }
}

impl Scpi for Instrument {}
