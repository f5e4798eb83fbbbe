//! Reader configuration values and their domain validation

use std::ops::RangeInclusive;

use crate::types::PurError;

/// Band the reader may be tuned to, in kHz (ETSI EN 302 208).
pub const ETSI_BAND_KHZ: RangeInclusive<u32> = 865_600..=867_600;

/// Power-on hop set of the reader: the four ETSI channels, in kHz.
pub const DEFAULT_HOP_SET_KHZ: [u32; 4] = [865_700, 866_300, 866_900, 867_500];

/// Tag backscatter link frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFrequency {
    Khz40 = 0x00,
    Khz80 = 0x01,
    Khz160 = 0x02,
    Khz213 = 0x03,
    Khz256 = 0x04,
    Khz320 = 0x05,
}

impl LinkFrequency {
    /// Frequency in kHz.
    pub fn khz(self) -> u32 {
        match self {
            LinkFrequency::Khz40 => 40,
            LinkFrequency::Khz80 => 80,
            LinkFrequency::Khz160 => 160,
            LinkFrequency::Khz213 => 213,
            LinkFrequency::Khz256 => 256,
            LinkFrequency::Khz320 => 320,
        }
    }

    /// Variant for a frequency in kHz, if the reader supports it.
    pub fn from_khz(khz: u32) -> Option<Self> {
        match khz {
            40 => Some(LinkFrequency::Khz40),
            80 => Some(LinkFrequency::Khz80),
            160 => Some(LinkFrequency::Khz160),
            213 => Some(LinkFrequency::Khz213),
            256 => Some(LinkFrequency::Khz256),
            320 => Some(LinkFrequency::Khz320),
            _ => None,
        }
    }

    /// Variant for a wire key from a parameter response.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            0x00 => Some(LinkFrequency::Khz40),
            0x01 => Some(LinkFrequency::Khz80),
            0x02 => Some(LinkFrequency::Khz160),
            0x03 => Some(LinkFrequency::Khz213),
            0x04 => Some(LinkFrequency::Khz256),
            0x05 => Some(LinkFrequency::Khz320),
            _ => None,
        }
    }

    pub(crate) fn key(self) -> u8 {
        self as u8
    }
}

/// Tag backscatter encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagEncoding {
    Fm0 = 0x00,
    M2 = 0x01,
    M4 = 0x02,
    M8 = 0x03,
}

impl TagEncoding {
    /// Variant for a wire key from a parameter response.
    pub fn from_key(key: u8) -> Option<Self> {
        match key {
            0x00 => Some(TagEncoding::Fm0),
            0x01 => Some(TagEncoding::M2),
            0x02 => Some(TagEncoding::M4),
            0x03 => Some(TagEncoding::M8),
            _ => None,
        }
    }

    pub(crate) fn key(self) -> u8 {
        self as u8
    }
}

/// Host-side cache of the reader configuration.
///
/// Created with the power-on defaults at session start and updated only
/// when the reader acknowledges a set operation. The reader falls back to
/// its defaults on power loss, which the host cannot observe, so a new
/// session starts from defaults again instead of trusting earlier values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Transmit frequency table in kHz. One entry means static operation,
    /// more mean random hopping across them.
    pub frequencies_khz: Vec<u32>,
    /// Tag backscatter link frequency
    pub link_frequency: LinkFrequency,
    /// Tag backscatter encoding
    pub encoding: TagEncoding,
    /// Inventory session, 0 to 3
    pub session: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            frequencies_khz: DEFAULT_HOP_SET_KHZ.to_vec(),
            link_frequency: LinkFrequency::Khz160,
            encoding: TagEncoding::M2,
            session: 1,
        }
    }
}

/// Checks a frequency table before it is sent to the reader. The order of
/// entries is the caller's and is preserved on the wire.
pub fn validate_frequencies(frequencies_khz: &[u32]) -> Result<(), PurError> {
    if frequencies_khz.is_empty() {
        return Err(PurError::InvalidConfig(
            "frequency list must not be empty".into(),
        ));
    }
    for &khz in frequencies_khz {
        if !ETSI_BAND_KHZ.contains(&khz) {
            return Err(PurError::InvalidConfig(format!(
                "frequency {} kHz is outside the ETSI band {}..={} kHz",
                khz,
                ETSI_BAND_KHZ.start(),
                ETSI_BAND_KHZ.end()
            )));
        }
    }
    Ok(())
}

/// Maps a backscatter link frequency in kHz to its wire variant.
pub fn validate_link_frequency(khz: u32) -> Result<LinkFrequency, PurError> {
    LinkFrequency::from_khz(khz).ok_or_else(|| {
        PurError::InvalidConfig(format!(
            "invalid backscatter link frequency {} kHz, supported: 40, 80, 160, 213, 256, 320",
            khz
        ))
    })
}

/// Checks an inventory session number.
pub fn validate_session(session: u8) -> Result<(), PurError> {
    if session > 3 {
        return Err(PurError::InvalidConfig(format!(
            "session {} is out of range 0..=3",
            session
        )));
    }
    Ok(())
}
