//! Serial port transport for desktop hosts using the serialport crate

use crate::transport::ReaderTransport;
use crate::types::PurError;
use std::time::Duration;

pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Opens `port_name` at `baud_rate` (PUR readers ship at 9600).
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self, PurError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_secs(1))
            .open()
            .map_err(|e| PurError::PortUnavailable(format!("{}: {}", port_name, e)))?;
        std::thread::sleep(Duration::from_millis(500));
        port.clear(serialport::ClearBuffer::Input)
            .map_err(|e| PurError::PortUnavailable(format!("{}: {}", port_name, e)))?;

        Ok(Self { port })
    }
}

impl ReaderTransport for SerialTransport {
    type Error = std::io::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        std::io::Write::write(&mut self.port, data)
    }

    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error> {
        self.port
            .set_timeout(Duration::from_millis(timeout_ms as u64))
            .map_err(|e| std::io::Error::other(e))?;
        match std::io::Read::read(&mut self.port, buf) {
            // An expired timeout is "no bytes yet", not a link failure
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(0),
            result => result,
        }
    }

    fn clear_input(&mut self) -> Result<(), Self::Error> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| std::io::Error::other(e))
    }
}
