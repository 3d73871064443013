//! Serial adapter for RS-232 / USB-CDC instruments.
//!
//! Supports the bench supplies and meters that only expose a serial port
//! (L303SP, Fluke 8808A, Victor 8045M). Framing follows the driver's
//! [`ConnectionSettings`], including two stop bits where the vendor asks for
//! them.

use super::{ConnectionSettings, Parity, StopBits, StreamAdapter};
use crate::error::{ScpiError, ScpiResult};
use serialport::SerialPort;

/// Serial port adapter.
pub type SerialAdapter = StreamAdapter<Box<dyn SerialPort>>;

fn data_bits(bits: u8) -> ScpiResult<serialport::DataBits> {
    match bits {
        5 => Ok(serialport::DataBits::Five),
        6 => Ok(serialport::DataBits::Six),
        7 => Ok(serialport::DataBits::Seven),
        8 => Ok(serialport::DataBits::Eight),
        other => Err(ScpiError::Configuration(format!(
            "serial ports support 5 to 8 data bits, got {}",
            other
        ))),
    }
}

fn parity(parity: Parity) -> ScpiResult<serialport::Parity> {
    match parity {
        Parity::None => Ok(serialport::Parity::None),
        Parity::Odd => Ok(serialport::Parity::Odd),
        Parity::Even => Ok(serialport::Parity::Even),
        other => Err(ScpiError::Configuration(format!(
            "{:?} parity is not supported on serial ports",
            other
        ))),
    }
}

fn stop_bits(stop_bits: StopBits) -> ScpiResult<serialport::StopBits> {
    match stop_bits {
        StopBits::One => Ok(serialport::StopBits::One),
        StopBits::Two => Ok(serialport::StopBits::Two),
        StopBits::OnePointFive => Err(ScpiError::Configuration(
            "1.5 stop bits are not supported on serial ports".to_string(),
        )),
    }
}

/// Open `port` with the framing in `settings`.
pub fn open_serial(port: &str, settings: &ConnectionSettings) -> ScpiResult<SerialAdapter> {
    let handle = serialport::new(port, settings.baud_rate)
        .data_bits(data_bits(settings.data_bits)?)
        .parity(parity(settings.parity)?)
        .stop_bits(stop_bits(settings.stop_bits)?)
        .timeout(settings.timeout)
        .open()?;

    // Drop anything left over from a previous session.
    if let Err(e) = handle.clear(serialport::ClearBuffer::All) {
        tracing::warn!(port, error = %e, "could not clear serial buffers");
    }

    Ok(StreamAdapter::new(handle, port, settings.timeout)
        .with_termination(&settings.write_termination, &settings.read_termination))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn framing_conversion() {
        assert!(matches!(data_bits(8), Ok(serialport::DataBits::Eight)));
        assert!(data_bits(9).is_err());
        assert!(matches!(parity(Parity::None), Ok(serialport::Parity::None)));
        assert!(parity(Parity::Mark).is_err());
        assert!(matches!(stop_bits(StopBits::Two), Ok(serialport::StopBits::Two)));
        assert!(stop_bits(StopBits::OnePointFive).is_err());
    }

    #[test]
    fn missing_port_is_a_serial_error() {
        let err = open_serial("/dev/does-not-exist-scpi", &ConnectionSettings::default()).err();
        assert!(matches!(err, Some(ScpiError::Serial(_))));
    }
}
