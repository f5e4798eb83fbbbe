//! Error types for reader operations

use thiserror::Error;

/// Errors that can occur while talking to a PUR reader
#[derive(Debug, Error)]
pub enum PurError {
    /// The serial port could not be opened
    #[error("port unavailable: {0}")]
    PortUnavailable(String),
    /// Transport layer failure (serial, UART bridge, etc.). The session is
    /// latched disconnected after this and must be recreated.
    #[error("transport error: {0}")]
    Transport(String),
    /// Operation attempted after a transport failure disconnected the session
    #[error("session disconnected after transport failure")]
    Disconnected,
    /// No matching response arrived within the reply timeout
    #[error("timed out waiting for reader response")]
    Timeout,
    /// Caller-supplied configuration value outside the legal domain.
    /// Rejected before any bytes are written to the transport.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The firmware answered with a non-zero status code
    #[error("reader rejected command: {0}")]
    RejectedByDevice(String),
    /// Inventory response payload is structurally inconsistent
    #[error("malformed inventory response: {0}")]
    MalformedInventoryResponse(String),
    /// Response frame did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// Command payload does not fit in a single frame
    #[error("payload of {0} bytes exceeds the 255 byte frame limit")]
    FrameTooLarge(usize),
}
