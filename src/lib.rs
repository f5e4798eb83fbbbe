//! Host-side driver for RFE PUR UHF RFID readers.
//!
//! Speaks the RFE reader-host protocol over a byte transport: frames are
//! encoded and decoded locally, responses are correlated to the command
//! they answer, and inventory rounds are reassembled from however many
//! frames the reader spreads them across. The decoder tolerates serial
//! noise and arbitrary read chunking.
//!
//! # Features
//!
//! - `serial` - Serial port transport for desktop hosts using the serialport crate
//!
//! # Example
//!
//! ```ignore
//! use pur_rfid::{PurReader, SerialTransport};
//!
//! let transport = SerialTransport::new("/dev/ttyUSB0", 9600)?;
//! let mut reader = PurReader::new(transport);
//!
//! reader.set_frequencies_khz(&[865_700, 866_300, 866_900, 867_500])?;
//! reader.set_session(2)?;
//!
//! for tag in reader.single_inventory()? {
//!     println!("{} ({} dBm)", tag.epc_hex(), tag.rssi);
//! }
//! ```

mod command;
mod frame;
mod inventory;
mod reader;
mod settings;
mod transport;
mod types;

#[cfg(feature = "serial")]
mod serial;

// Re-exports
pub use command::CommandId;
pub use frame::{Frame, FrameDecoder, MAX_PAYLOAD};
pub use inventory::{InventoryReport, Tag};
pub use reader::PurReader;
pub use settings::{
    DEFAULT_HOP_SET_KHZ, ETSI_BAND_KHZ, LinkFrequency, Settings, TagEncoding,
};
pub use transport::ReaderTransport;
pub use types::PurError;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;
