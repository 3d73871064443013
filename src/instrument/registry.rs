//! Registry of the supported drivers.
//!
//! [`DriverKind`] names a driver in configuration files and on the command
//! line. Its [`DriverSchema`] lists the declared properties so generic code
//! (the CLI) can look them up by name.

use super::error_check::{ErrorCheck, PromptLine, ScpiErrorQueue};
use super::{
    etm_l303sp, fluke_8808a, itech_it6322a, rigol_dg1022u, rigol_dho800, rigol_dm3068,
    rigol_dp900, rigol_ds1054z, victor_8045m, Instrument,
};
use crate::adapters::{open_resource, ConnectionSettings};
use crate::error::{ScpiError, ScpiResult};
use crate::property::Property;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported instrument models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum DriverKind {
    /// eTM L303SP single output power supply
    EtmL303sp,
    /// Rigol DP900 triple output power supply
    RigolDp900,
    /// ITECH IT6322A triple output power supply
    ItechIt6322a,
    /// Rigol DM3068 bench multimeter
    RigolDm3068,
    /// Victor 8045M bench multimeter
    Victor8045m,
    /// Fluke 8808A bench multimeter
    Fluke8808a,
    /// Rigol DS1054Z oscilloscope
    RigolDs1054z,
    /// Rigol DHO800 oscilloscope
    RigolDho800,
    /// Rigol DG1022U function generator
    RigolDg1022u,
}

impl DriverKind {
    /// Every supported driver.
    pub const ALL: [DriverKind; 9] = [
        DriverKind::EtmL303sp,
        DriverKind::RigolDp900,
        DriverKind::ItechIt6322a,
        DriverKind::RigolDm3068,
        DriverKind::Victor8045m,
        DriverKind::Fluke8808a,
        DriverKind::RigolDs1054z,
        DriverKind::RigolDho800,
        DriverKind::RigolDg1022u,
    ];

    /// Declared properties.
    pub fn schema(self) -> DriverSchema {
        match self {
            DriverKind::EtmL303sp => etm_l303sp::schema(),
            DriverKind::RigolDp900 => rigol_dp900::schema(),
            DriverKind::ItechIt6322a => itech_it6322a::schema(),
            DriverKind::RigolDm3068 => rigol_dm3068::schema(),
            DriverKind::Victor8045m => victor_8045m::schema(),
            DriverKind::Fluke8808a => fluke_8808a::schema(),
            DriverKind::RigolDs1054z => rigol_ds1054z::schema(),
            DriverKind::RigolDho800 => rigol_dho800::schema(),
            DriverKind::RigolDg1022u => rigol_dg1022u::schema(),
        }
    }

    /// Default transport settings.
    pub fn connection(self) -> ConnectionSettings {
        match self {
            DriverKind::EtmL303sp => etm_l303sp::connection(),
            DriverKind::Victor8045m => victor_8045m::connection(),
            DriverKind::Fluke8808a => fluke_8808a::connection(),
            _ => ConnectionSettings::default(),
        }
    }

    /// Name used in logs when the configuration gives none.
    pub fn default_name(self) -> &'static str {
        match self {
            DriverKind::EtmL303sp => etm_l303sp::DEFAULT_NAME,
            DriverKind::RigolDp900 => rigol_dp900::DEFAULT_NAME,
            DriverKind::ItechIt6322a => itech_it6322a::DEFAULT_NAME,
            DriverKind::RigolDm3068 => rigol_dm3068::DEFAULT_NAME,
            DriverKind::Victor8045m => victor_8045m::DEFAULT_NAME,
            DriverKind::Fluke8808a => fluke_8808a::DEFAULT_NAME,
            DriverKind::RigolDs1054z => rigol_ds1054z::DEFAULT_NAME,
            DriverKind::RigolDho800 => rigol_dho800::DEFAULT_NAME,
            DriverKind::RigolDg1022u => rigol_dg1022u::DEFAULT_NAME,
        }
    }

    /// Error-check hook the device expects.
    pub fn error_check(self) -> Box<dyn ErrorCheck> {
        match self {
            DriverKind::Fluke8808a => Box::new(PromptLine),
            _ => Box::new(ScpiErrorQueue),
        }
    }

    /// Open `resource` and wrap it in a generic [`Instrument`].
    pub fn open(
        self,
        name: Option<&str>,
        resource: &str,
        settings: &ConnectionSettings,
    ) -> ScpiResult<Instrument> {
        let adapter = open_resource(resource, settings)?;
        Ok(
            Instrument::new(name.unwrap_or(self.default_name()), adapter)
                .with_boxed_error_check(self.error_check()),
        )
    }
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_name())
    }
}

/// Properties declared by one driver.
#[derive(Debug, Clone)]
pub struct DriverSchema {
    /// Driver this schema belongs to
    pub kind: DriverKind,
    /// Valid channel ids, empty for single-channel instruments
    pub channels: &'static [&'static str],
    /// Instrument-level properties
    pub properties: Vec<Property>,
    /// Properties available on every channel
    pub channel_properties: Vec<Property>,
}

impl DriverSchema {
    /// Instrument-level property by name.
    pub fn property(&self, name: &str) -> ScpiResult<&Property> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ScpiError::UnknownProperty(name.to_string()))
    }

    /// Channel property by name, after checking the channel id.
    pub fn channel_property(&self, channel: &str, name: &str) -> ScpiResult<&Property> {
        require_channel(self.channels, channel)?;
        self.channel_properties
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| ScpiError::UnknownProperty(format!("ch{}.{}", channel, name)))
    }
}

/// Fail with [`ScpiError::UnknownChannel`] unless `id` is one of `channels`.
pub(crate) fn require_channel(channels: &[&str], id: &str) -> ScpiResult<()> {
    if channels.contains(&id) {
        Ok(())
    } else {
        Err(ScpiError::UnknownChannel(id.to_string()))
    }
}
