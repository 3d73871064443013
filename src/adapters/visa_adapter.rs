//! VISA adapter for GPIB / USBTMC / VXI-11 instruments.
//!
//! Supports resource strings like:
//! - "GPIB0::1::INSTR"
//! - "USB0::0x1AB1::0x0515::DHO8A0001::INSTR"
//! - "TCPIP0::192.168.1.100::INSTR"

use super::{ConnectionSettings, StreamAdapter};
use crate::error::{ScpiError, ScpiResult};
use std::ffi::CString;
use std::io::{self, Read, Write};
use visa_rs::prelude::*;

/// An open VISA session together with the resource manager that owns it.
///
/// Field order matters: the session is closed before the manager.
pub struct VisaSession {
    instr: visa_rs::Instrument,
    _rm: DefaultRM,
}

impl Read for VisaSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.instr.read(buf)
    }
}

impl Write for VisaSession {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.instr.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.instr.flush()
    }
}

/// VISA adapter.
pub type VisaAdapter = StreamAdapter<VisaSession>;

fn visa_err(err: impl std::fmt::Display) -> ScpiError {
    ScpiError::Visa(err.to_string())
}

/// Open `resource` through the system VISA library.
///
/// `settings.timeout` bounds opening the session; reads use the VISA
/// session timeout.
pub fn open_visa(resource: &str, settings: &ConnectionSettings) -> ScpiResult<VisaAdapter> {
    let rm = DefaultRM::new().map_err(visa_err)?;
    let name = CString::new(resource)
        .map_err(|_| ScpiError::Configuration(format!("resource '{}' contains NUL", resource)))?;
    let instr = rm
        .open(&name.into(), AccessMode::NO_LOCK, settings.timeout)
        .map_err(visa_err)?;

    let session = VisaSession { instr, _rm: rm };
    Ok(StreamAdapter::new(session, resource, settings.timeout)
        .with_termination(&settings.write_termination, &settings.read_termination))
}
