//! Raw socket adapter (`TCPIP::host::port::SOCKET`).

use super::{ConnectionSettings, StreamAdapter};
use crate::error::{ScpiError, ScpiResult};
use std::net::{TcpStream, ToSocketAddrs};

/// TCP socket adapter.
pub type TcpAdapter = StreamAdapter<TcpStream>;

/// Connect to `host:port`, bounding connect, read and write by the timeout.
pub fn open_tcp(host: &str, port: u16, settings: &ConnectionSettings) -> ScpiResult<TcpAdapter> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| ScpiError::Configuration(format!("cannot resolve host '{}'", host)))?;

    let stream = TcpStream::connect_timeout(&addr, settings.timeout)?;
    stream.set_read_timeout(Some(settings.timeout))?;
    stream.set_write_timeout(Some(settings.timeout))?;
    stream.set_nodelay(true)?;

    Ok(StreamAdapter::new(stream, format!("{}:{}", host, port), settings.timeout)
        .with_termination(&settings.write_termination, &settings.read_termination))
}
