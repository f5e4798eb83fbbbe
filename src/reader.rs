use log::{debug, error, warn};
use std::time::{Duration, Instant};

use crate::command::{self, CommandId};
use crate::frame::{self, Frame, FrameDecoder};
use crate::inventory::{self, Tag};
use crate::settings::{self, Settings, TagEncoding};
use crate::transport::ReaderTransport;
use crate::types::PurError;

/// Default wait for the reply to one command.
const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(500);
/// Default overall budget for one inventory round. A round can return many
/// tag report frames, so this is much longer than a single reply.
const DEFAULT_SCAN_TIMEOUT: Duration = Duration::from_secs(3);
/// How long one transport read may block inside a wait loop.
const READ_SLICE_MS: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkState {
    Idle,
    Down,
}

/// Session with one PUR reader over one transport.
///
/// The protocol is request/response over a single physical link, so the
/// session is strictly sequential: every operation takes `&mut self` and
/// blocks until its exchange completes or times out. There is no way to
/// issue a second command while one is in flight, and sharing one physical
/// transport between two sessions is not supported.
///
/// On construction the reader is assumed to be at the supplied settings
/// without any traffic; the cache is updated only when the reader
/// acknowledges a set operation. Any transport failure latches the session
/// into a disconnected state. Recovery means building a new session: the
/// reader forgets its configuration on a power cycle the host cannot
/// observe, so a stale cache must not be carried over.
pub struct PurReader<T: ReaderTransport> {
    transport: T,
    settings: Settings,
    decoder: FrameDecoder,
    state: LinkState,
    reply_timeout: Duration,
    scan_timeout: Duration,
    rssi_reporting: bool,
}

impl<T: ReaderTransport> PurReader<T> {
    /// Opens a session assuming the reader is at its power-on defaults.
    pub fn new(transport: T) -> Self {
        Self::with_defaults(transport, Settings::default())
    }

    /// Opens a session with an explicit assumption about the current
    /// device configuration. No traffic is exchanged; `defaults` is
    /// cached as given.
    pub fn with_defaults(transport: T, defaults: Settings) -> Self {
        Self {
            transport,
            settings: defaults,
            decoder: FrameDecoder::new(),
            state: LinkState::Idle,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            scan_timeout: DEFAULT_SCAN_TIMEOUT,
            rssi_reporting: false,
        }
    }

    /// Last configuration the reader acknowledged, or the assumed
    /// defaults if nothing was set yet.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Frames dropped so far because of checksum or structure errors.
    /// A handful per session is normal serial noise; a steadily climbing
    /// count points at a baud rate or wiring problem.
    pub fn corrupt_frames(&self) -> u64 {
        self.decoder.corrupt_frames()
    }

    /// Changes how long a single command waits for its reply.
    pub fn set_reply_timeout(&mut self, timeout: Duration) {
        self.reply_timeout = timeout;
    }

    /// Changes the overall budget for one inventory round.
    pub fn set_scan_timeout(&mut self, timeout: Duration) {
        self.scan_timeout = timeout;
    }

    /// Firmware revision string reported by the reader.
    pub fn software_revision(&mut self) -> Result<String, PurError> {
        let payload = self.request(command::GET_SOFTWARE_REVISION, &[])?;
        Ok(String::from_utf8_lossy(&payload)
            .trim_end_matches('\0')
            .to_string())
    }

    /// Number of antenna ports on the reader.
    pub fn antenna_count(&mut self) -> Result<u8, PurError> {
        let payload = self.request(command::GET_ANTENNA_COUNT, &[])?;
        payload
            .first()
            .copied()
            .ok_or_else(|| PurError::InvalidResponse("empty antenna count response".into()))
    }

    /// Switches the antenna output on or off.
    pub fn set_antenna_power(&mut self, enabled: bool) -> Result<(), PurError> {
        self.request(command::SET_ANTENNA_POWER, &[enabled as u8])
            .map(|_| ())
    }

    /// Reads the frequency table currently active on the reader.
    pub fn frequencies_khz(&mut self) -> Result<Vec<u32>, PurError> {
        let payload = self.request(command::GET_FREQUENCY, &[])?;
        // mode, maximum entry count, current entry count, then 3 bytes
        // per entry, big endian kHz
        if payload.len() < 3 {
            return Err(PurError::InvalidResponse(
                "frequency response too short".into(),
            ));
        }
        let count = payload[2] as usize;
        let entries = &payload[3..];
        if entries.len() < count * 3 {
            return Err(PurError::InvalidResponse(format!(
                "frequency response claims {} entries but carries {} bytes",
                count,
                entries.len()
            )));
        }
        Ok(entries
            .chunks_exact(3)
            .take(count)
            .map(|e| u32::from_be_bytes([0, e[0], e[1], e[2]]))
            .collect())
    }

    /// Configures the frequency table. A single entry selects static
    /// operation, more entries select random hopping across them. Entries
    /// are sent in the caller's order; the reader never sees a reordered
    /// list.
    pub fn set_frequencies_khz(&mut self, frequencies_khz: &[u32]) -> Result<(), PurError> {
        settings::validate_frequencies(frequencies_khz)?;

        let hopping = frequencies_khz.len() > 1;
        let mut payload = Vec::with_capacity(2 + frequencies_khz.len() * 3);
        payload.push(hopping as u8);
        payload.push(frequencies_khz.len() as u8);
        for &khz in frequencies_khz {
            payload.extend_from_slice(&khz.to_be_bytes()[1..]);
        }

        self.request(command::SET_FREQUENCY, &payload)?;
        self.settings.frequencies_khz = frequencies_khz.to_vec();
        Ok(())
    }

    /// Reads the tag backscatter link frequency in kHz.
    pub fn link_frequency_khz(&mut self) -> Result<u32, PurError> {
        let value = self.get_param(command::PARAM_LINK_FREQUENCY)?;
        let key = value.first().copied().ok_or_else(|| {
            PurError::InvalidResponse("empty link frequency parameter".into())
        })?;
        settings::LinkFrequency::from_key(key)
            .map(settings::LinkFrequency::khz)
            .ok_or_else(|| {
                PurError::InvalidResponse(format!("unknown link frequency key 0x{:02X}", key))
            })
    }

    /// Sets the tag backscatter link frequency.
    /// Accepts 40, 80, 160, 213, 256 or 320 kHz.
    pub fn set_link_frequency_khz(&mut self, khz: u32) -> Result<(), PurError> {
        let blf = settings::validate_link_frequency(khz)?;
        self.set_param(command::PARAM_LINK_FREQUENCY, &[blf.key()])?;
        self.settings.link_frequency = blf;
        Ok(())
    }

    /// Reads the tag backscatter encoding.
    pub fn encoding(&mut self) -> Result<TagEncoding, PurError> {
        let value = self.get_param(command::PARAM_ENCODING)?;
        let key = value
            .first()
            .copied()
            .ok_or_else(|| PurError::InvalidResponse("empty encoding parameter".into()))?;
        TagEncoding::from_key(key)
            .ok_or_else(|| PurError::InvalidResponse(format!("unknown encoding key 0x{:02X}", key)))
    }

    /// Sets the tag backscatter encoding.
    pub fn set_encoding(&mut self, encoding: TagEncoding) -> Result<(), PurError> {
        self.set_param(command::PARAM_ENCODING, &[encoding.key()])?;
        self.settings.encoding = encoding;
        Ok(())
    }

    /// Reads the inventory session number.
    pub fn session(&mut self) -> Result<u8, PurError> {
        let value = self.get_param(command::PARAM_SESSION)?;
        value
            .first()
            .copied()
            .ok_or_else(|| PurError::InvalidResponse("empty session parameter".into()))
    }

    /// Sets the inventory session number, 0 to 3.
    pub fn set_session(&mut self, session: u8) -> Result<(), PurError> {
        settings::validate_session(session)?;
        self.set_param(command::PARAM_SESSION, &[session])?;
        self.settings.session = session;
        Ok(())
    }

    /// Runs one inventory round and returns every tag read, in report
    /// order.
    ///
    /// A large tag population arrives split across several response
    /// frames; the round is complete once the total the reader declared is
    /// reached. A round that sees no tags returns an empty list, and an
    /// expired scan timeout also returns whatever arrived so far rather
    /// than an error, since "no tags" and "slow tags" are ordinary field
    /// conditions. The same physical tag can appear several times per
    /// round.
    pub fn single_inventory(&mut self) -> Result<Vec<Tag>, PurError> {
        // Tag reports only carry signal strength once RSSI reporting is on
        if !self.rssi_reporting {
            self.set_param(command::PARAM_REPORT_RSSI, &[0x01])?;
            self.rssi_reporting = true;
        }

        self.send_command(command::INVENTORY_SINGLE, &[])?;

        let deadline = Instant::now() + self.scan_timeout;
        let mut tags: Vec<Tag> = Vec::new();
        let mut expected: Option<usize> = None;

        while expected.is_none_or(|total| tags.len() < total) {
            let Some(response) = self.read_matching(command::INVENTORY_SINGLE, deadline)? else {
                debug!("Scan timeout with {} tags collected", tags.len());
                break;
            };
            match check_status(&response.payload) {
                Ok(body) => match inventory::parse_report(body) {
                    Ok(report) => {
                        expected = Some(report.total as usize);
                        tags.extend(report.tags);
                    }
                    Err(e) => warn!("Dropping inventory frame: {}", e),
                },
                // The reader refused the round itself
                Err(e) => return Err(e),
            }
        }

        debug!("Inventory round finished with {} tags", tags.len());
        Ok(tags)
    }

    /// Sends one command and returns its response payload with the leading
    /// status byte checked and removed.
    fn request(&mut self, command: CommandId, payload: &[u8]) -> Result<Vec<u8>, PurError> {
        self.send_command(command, payload)?;
        let deadline = Instant::now() + self.reply_timeout;
        match self.read_matching(command, deadline)? {
            Some(response) => check_status(&response.payload).map(<[u8]>::to_vec),
            None => {
                warn!("No response to command {} within {:?}", command, self.reply_timeout);
                Err(PurError::Timeout)
            }
        }
    }

    /// Writes a device parameter through the generic set-param command.
    fn set_param(&mut self, addr: u16, value: &[u8]) -> Result<(), PurError> {
        let mut payload = Vec::with_capacity(3 + value.len());
        payload.extend_from_slice(&addr.to_be_bytes());
        payload.push(value.len() as u8);
        payload.extend_from_slice(value);
        self.request(command::SET_PARAM, &payload).map(|_| ())
    }

    /// Reads a device parameter through the generic get-param command.
    fn get_param(&mut self, addr: u16) -> Result<Vec<u8>, PurError> {
        let payload = self.request(command::GET_PARAM, &addr.to_be_bytes())?;
        let Some((&size, rest)) = payload.split_first() else {
            return Err(PurError::InvalidResponse("empty parameter response".into()));
        };
        let size = size as usize;
        if rest.len() < size {
            return Err(PurError::InvalidResponse(format!(
                "parameter response claims {} bytes but carries {}",
                size,
                rest.len()
            )));
        }
        Ok(rest[..size].to_vec())
    }

    /// Encodes and writes one command frame, with the receive side reset
    /// so nothing stale can correlate against the new exchange.
    fn send_command(&mut self, command: CommandId, payload: &[u8]) -> Result<(), PurError> {
        self.ensure_link()?;
        let bytes = frame::encode(command, payload)?;
        self.decoder.clear();
        self.transport
            .clear_input()
            .map_err(|e| self.link_failed(e))?;
        debug!("Sending command {}: {:02X?}", command, bytes);
        self.transport.write(&bytes).map_err(|e| self.link_failed(e))?;
        Ok(())
    }

    /// Reads until a frame answering `command` arrives or `deadline`
    /// passes. Frames for other commands are dropped with a warning.
    fn read_matching(
        &mut self,
        command: CommandId,
        deadline: Instant,
    ) -> Result<Option<Frame>, PurError> {
        loop {
            let mut chunk = [0u8; 256];
            let read = self
                .transport
                .read(&mut chunk, READ_SLICE_MS)
                .map_err(|e| self.link_failed(e))?;
            for response in self.decoder.feed(&chunk[..read]) {
                if response.command == command {
                    debug!(
                        "Received response to {}: {} payload bytes",
                        command,
                        response.payload.len()
                    );
                    return Ok(Some(response));
                }
                warn!(
                    "Dropping frame for command {} while waiting for {}",
                    response.command, command
                );
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn ensure_link(&self) -> Result<(), PurError> {
        match self.state {
            LinkState::Idle => Ok(()),
            LinkState::Down => Err(PurError::Disconnected),
        }
    }

    fn link_failed<E: std::fmt::Debug>(&mut self, err: E) -> PurError {
        error!("Transport failure, session disconnected: {:?}", err);
        self.state = LinkState::Down;
        PurError::Transport(format!("{:?}", err))
    }
}

/// Splits the status byte off a response payload, mapping a non-zero
/// status to the firmware's stated reason.
fn check_status(payload: &[u8]) -> Result<&[u8], PurError> {
    match payload.split_first() {
        Some((&command::STATUS_OK, rest)) => Ok(rest),
        Some((&code, _)) => Err(PurError::RejectedByDevice(format!(
            "0x{:02X}: {}",
            code,
            command::status_description(code)
        ))),
        None => Err(PurError::InvalidResponse("empty response payload".into())),
    }
}
