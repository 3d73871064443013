//! Rigol DG1022U function generator. Only the common SCPI commands.

use super::registry::{DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::ScpiResult;

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Rigol DG1022U";

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::RigolDg1022u,
        channels: &[],
        properties: vec![idn()],
        channel_properties: Vec::new(),
    }
}

/// Rigol DG1022U driver.
#[derive(Debug)]
pub struct RigolDg1022u {
    inst: Instrument,
}

impl RigolDg1022u {
    /// Wrap an opened adapter.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self {
            inst: Instrument::new(DEFAULT_NAME, adapter),
        }
    }

    /// Open `resource` with the default connection settings.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &ConnectionSettings::default())?))
    }
}

impl Driver for RigolDg1022u {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for RigolDg1022u {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;

    #[test]
    fn identifies_and_resets() {
        let mock = MockAdapter::new([
            (Some("*IDN?"), Some("RIGOL TECHNOLOGIES,DG1022U,DG1D0001,00.03.00.09.00.02.11")),
            (Some("*RST"), None),
        ]);
        let handle = mock.handle();
        let mut fgen = RigolDg1022u::new(mock.boxed());
        assert!(fgen.id().unwrap().contains("DG1022U"));
        fgen.reset().unwrap();
        handle.assert_finished();
    }
}
