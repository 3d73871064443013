//! Transport layer: the byte channel every instrument talks through.
//!
//! [`Adapter`] is the blocking write/read contract the property engine uses.
//! Concrete transports are built on [`StreamAdapter`], which handles line
//! terminators and size limits over any `Read + Write` stream:
//!
//! - serial ports (`instrument_serial`, on by default)
//! - raw TCP sockets (`TCPIP::host::port::SOCKET`)
//! - VISA sessions (`instrument_visa`)
//!
//! [`MockAdapter`] replays a scripted command/reply exchange for tests.

use crate::error::{ScpiError, ScpiResult};
use crate::limits::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub mod mock_adapter;
#[cfg(feature = "instrument_serial")]
pub mod serial_adapter;
pub mod stream;
pub mod tcp_adapter;
#[cfg(feature = "instrument_visa")]
pub mod visa_adapter;

pub use mock_adapter::{MockAdapter, MockHandle};
pub use stream::StreamAdapter;

/// Blocking request/response transport owned by one instrument.
pub trait Adapter: Send {
    /// Send `command` followed by the write terminator.
    fn write(&mut self, command: &str) -> ScpiResult<()>;

    /// Read one reply with the read terminator stripped.
    fn read(&mut self) -> ScpiResult<String>;

    /// Read raw bytes.
    ///
    /// `count = None` reads until the read terminator (when
    /// `break_on_termchar`) or until the stream runs dry.
    fn read_bytes(&mut self, count: Option<usize>, break_on_termchar: bool)
        -> ScpiResult<Vec<u8>>;

    /// Release the underlying connection. Further I/O fails.
    fn close(&mut self) -> ScpiResult<()>;

    /// Write `command` and read the reply.
    fn ask(&mut self, command: &str) -> ScpiResult<String> {
        self.write(command)?;
        self.read()
    }
}

/// Serial parity, accepted by name or by VISA code (0 = none .. 4 = space).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "SerialCode")]
pub enum Parity {
    /// No parity bit
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
    /// Parity bit always 1
    Mark,
    /// Parity bit always 0
    Space,
}

/// Stop bits, accepted by name or by VISA code (10, 15, 20).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", try_from = "SerialCode")]
pub enum StopBits {
    /// One stop bit (VISA 10)
    One,
    /// One and a half stop bits (VISA 15)
    OnePointFive,
    /// Two stop bits (VISA 20)
    Two,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SerialCode {
    Code(u16),
    Name(String),
}

impl TryFrom<SerialCode> for Parity {
    type Error = String;

    fn try_from(code: SerialCode) -> Result<Self, Self::Error> {
        match code {
            SerialCode::Code(0) => Ok(Parity::None),
            SerialCode::Code(1) => Ok(Parity::Odd),
            SerialCode::Code(2) => Ok(Parity::Even),
            SerialCode::Code(3) => Ok(Parity::Mark),
            SerialCode::Code(4) => Ok(Parity::Space),
            SerialCode::Name(name) => match name.to_ascii_lowercase().as_str() {
                "none" | "n" => Ok(Parity::None),
                "odd" | "o" => Ok(Parity::Odd),
                "even" | "e" => Ok(Parity::Even),
                "mark" | "m" => Ok(Parity::Mark),
                "space" | "s" => Ok(Parity::Space),
                other => Err(format!("unknown parity '{}'", other)),
            },
            SerialCode::Code(other) => Err(format!("unknown parity code {}", other)),
        }
    }
}

impl TryFrom<SerialCode> for StopBits {
    type Error = String;

    fn try_from(code: SerialCode) -> Result<Self, Self::Error> {
        match code {
            SerialCode::Code(1 | 10) => Ok(StopBits::One),
            SerialCode::Code(15) => Ok(StopBits::OnePointFive),
            SerialCode::Code(2 | 20) => Ok(StopBits::Two),
            SerialCode::Name(name) => match name.to_ascii_lowercase().as_str() {
                "one" | "1" => Ok(StopBits::One),
                "one_point_five" | "1.5" => Ok(StopBits::OnePointFive),
                "two" | "2" => Ok(StopBits::Two),
                other => Err(format!("unknown stop bits '{}'", other)),
            },
            SerialCode::Code(other) => Err(format!("unknown stop bits code {}", other)),
        }
    }
}

/// Line and framing parameters for opening a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Serial data bits (5..=8)
    pub data_bits: u8,
    /// Serial parity
    pub parity: Parity,
    /// Serial stop bits
    pub stop_bits: StopBits,
    /// Read/write timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Appended to every command
    pub write_termination: String,
    /// Marks the end of every reply
    pub read_termination: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: 8,
            parity: Parity::None,
            stop_bits: StopBits::One,
            timeout: DEFAULT_TIMEOUT,
            write_termination: "\n".to_string(),
            read_termination: "\n".to_string(),
        }
    }
}

impl ConnectionSettings {
    /// Set the baud rate.
    #[must_use]
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set the stop bits.
    #[must_use]
    pub fn with_stop_bits(mut self, stop_bits: StopBits) -> Self {
        self.stop_bits = stop_bits;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set both line terminators.
    #[must_use]
    pub fn with_termination(mut self, termination: &str) -> Self {
        self.write_termination = termination.to_string();
        self.read_termination = termination.to_string();
        self
    }
}

/// Parsed resource string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// Serial port path (`/dev/ttyUSB0`, `COM3`)
    Serial(String),
    /// Raw socket
    Tcp {
        /// Host name or address
        host: String,
        /// TCP port
        port: u16,
    },
    /// Any other VISA resource
    Visa(String),
}

impl FromStr for Resource {
    type Err = ScpiError;

    fn from_str(resource: &str) -> ScpiResult<Self> {
        let resource = resource.trim();
        let upper = resource.to_ascii_uppercase();
        let parts: Vec<&str> = resource.split("::").collect();

        if upper.starts_with("ASRL") && upper.ends_with("::INSTR") && parts.len() == 2 {
            let board = &parts[0][4..];
            let port = if board.chars().all(|c| c.is_ascii_digit()) && !board.is_empty() {
                if cfg!(windows) {
                    format!("COM{}", board)
                } else {
                    format!("/dev/ttyS{}", board)
                }
            } else {
                board.to_string()
            };
            return Ok(Resource::Serial(port));
        }
        if resource.starts_with("/dev/") || is_com_port(&upper) {
            return Ok(Resource::Serial(resource.to_string()));
        }
        if upper.starts_with("TCPIP") && upper.ends_with("::SOCKET") && parts.len() == 4 {
            let port = parts[2].parse::<u16>().map_err(|_| {
                ScpiError::Configuration(format!(
                    "invalid port '{}' in resource '{}'",
                    parts[2], resource
                ))
            })?;
            return Ok(Resource::Tcp {
                host: parts[1].to_string(),
                port,
            });
        }
        if upper.ends_with("::INSTR") {
            return Ok(Resource::Visa(resource.to_string()));
        }
        Err(ScpiError::Configuration(format!(
            "unrecognised resource string '{}'",
            resource
        )))
    }
}

fn is_com_port(upper: &str) -> bool {
    upper
        .strip_prefix("COM")
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Serial(port) => write!(f, "serial {}", port),
            Resource::Tcp { host, port } => write!(f, "tcp {}:{}", host, port),
            Resource::Visa(name) => write!(f, "visa {}", name),
        }
    }
}

/// Open the transport named by `resource`.
pub fn open_resource(resource: &str, settings: &ConnectionSettings) -> ScpiResult<Box<dyn Adapter>> {
    let parsed: Resource = resource.parse()?;
    tracing::info!(resource = %parsed, baud_rate = settings.baud_rate, "opening adapter");
    match parsed {
        Resource::Serial(port) => open_serial(&port, settings),
        Resource::Tcp { host, port } => Ok(Box::new(tcp_adapter::open_tcp(&host, port, settings)?)),
        Resource::Visa(name) => open_visa(&name, settings),
    }
}

#[cfg(feature = "instrument_serial")]
fn open_serial(port: &str, settings: &ConnectionSettings) -> ScpiResult<Box<dyn Adapter>> {
    Ok(Box::new(serial_adapter::open_serial(port, settings)?))
}

#[cfg(not(feature = "instrument_serial"))]
fn open_serial(_port: &str, _settings: &ConnectionSettings) -> ScpiResult<Box<dyn Adapter>> {
    Err(ScpiError::FeatureNotEnabled("instrument_serial".to_string()))
}

#[cfg(feature = "instrument_visa")]
fn open_visa(resource: &str, settings: &ConnectionSettings) -> ScpiResult<Box<dyn Adapter>> {
    Ok(Box::new(visa_adapter::open_visa(resource, settings)?))
}

#[cfg(not(feature = "instrument_visa"))]
fn open_visa(_resource: &str, _settings: &ConnectionSettings) -> ScpiResult<Box<dyn Adapter>> {
    Err(ScpiError::FeatureNotEnabled("instrument_visa".to_string()))
}
