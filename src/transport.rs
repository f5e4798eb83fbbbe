/// Byte transport connecting the host to a PUR reader.
/// Implement this trait for the link in use (serial port, UART bridge,
/// a scripted mock in tests).
pub trait ReaderTransport {
    /// Error type for transport operations
    type Error: std::fmt::Debug;

    /// Write `data` to the reader, returning the number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;

    /// Read into `buf`, waiting at most `timeout_ms`. A return of zero
    /// means nothing arrived before the timeout, not end of stream.
    fn read(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<usize, Self::Error>;

    /// Drop anything already buffered on the receive side
    fn clear_input(&mut self) -> Result<(), Self::Error>;
}
