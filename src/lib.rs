//! # daq-scpi
//!
//! Declarative property engine and drivers for SCPI bench instruments.
//!
//! Instrument attributes are described once as [`property::Property`]
//! descriptors (command templates, validation, value maps, reply parsing).
//! An [`instrument::Instrument`] runs those descriptors over a blocking
//! [`adapters::Adapter`], so every driver is mostly a table of properties
//! plus a few typed accessors.
//!
//! ## Crate Structure
//!
//! - **`adapters`**: Transports (serial, raw TCP socket, VISA) and a scripted
//!   mock for tests.
//! - **`config`**: Figment-based settings naming the driver and resource.
//! - **`error`**: The crate-wide [`error::ScpiError`].
//! - **`instrument`**: The `Instrument` root object, channel scopes, the
//!   common SCPI commands and the drivers:
//!   ETM L303SP, Rigol DP900, ITECH IT6322A (power supplies),
//!   Rigol DM3068, Victor 8045M, Fluke 8808A (multimeters),
//!   Rigol DS1054Z, Rigol DHO800 (oscilloscopes), Rigol DG1022U.
//! - **`limits`**: Reply size limits and default timeouts.
//! - **`logging`**: `tracing-subscriber` setup for binaries.
//! - **`property`**: Property descriptors, validators, value maps and the
//!   printf-style command formatter.
//!
//! ## Example
//!
//! ```
//! use daq_scpi::adapters::MockAdapter;
//! use daq_scpi::instrument::rigol_dp900::RigolDp900;
//!
//! let mock = MockAdapter::new([(Some("SOUR2:VOLT 5"), None::<&str>)]);
//! let handle = mock.handle();
//! let mut psu = RigolDp900::new(mock.boxed());
//! psu.channel("2")?.set_voltage_setpoint(5.0)?;
//! handle.assert_finished();
//! # Ok::<(), daq_scpi::error::ScpiError>(())
//! ```

pub mod adapters;
pub mod config;
pub mod error;
pub mod instrument;
pub mod limits;
pub mod logging;
pub mod property;
