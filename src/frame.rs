//! Wire frame encoding and decoding for the RFE reader-host protocol
//!
//! Frame layout:
//!
//! ```text
//! "RFE" 0x01 cmd1 cmd2 0x02 len [0x03 payload...] 0x04 checksum
//! ```
//!
//! The checksum is the XOR of every preceding byte, so a well-formed frame
//! XORs to zero when the checksum byte is included. The `0x03` payload
//! section is absent entirely when `len` is zero.

use log::warn;

use crate::command::CommandId;
use crate::types::PurError;

pub(crate) const START: [u8; 3] = *b"RFE";
const CMD_MARKER: u8 = 0x01;
const LEN_MARKER: u8 = 0x02;
const PAYLOAD_MARKER: u8 = 0x03;
const CHECKSUM_MARKER: u8 = 0x04;

/// Largest payload a single frame can carry (one length byte).
pub const MAX_PAYLOAD: usize = 255;

/// Size of a frame with an empty payload; with payload it is `11 + len`.
const MIN_FRAME: usize = 10;

/// One complete, checksum-verified protocol frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: CommandId,
    pub payload: Vec<u8>,
}

/// XOR fold over `bytes`.
pub(crate) fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Encode a command and its payload into a complete wire frame.
pub fn encode(command: CommandId, payload: &[u8]) -> Result<Vec<u8>, PurError> {
    if payload.len() > MAX_PAYLOAD {
        return Err(PurError::FrameTooLarge(payload.len()));
    }

    let mut frame = Vec::with_capacity(MIN_FRAME + 1 + payload.len());
    frame.extend_from_slice(&START);
    frame.push(CMD_MARKER);
    frame.push(command.0);
    frame.push(command.1);
    frame.push(LEN_MARKER);
    frame.push(payload.len() as u8);
    if !payload.is_empty() {
        frame.push(PAYLOAD_MARKER);
        frame.extend_from_slice(payload);
    }
    frame.push(CHECKSUM_MARKER);
    frame.push(checksum(&frame));
    Ok(frame)
}

enum Parse {
    Complete(Frame, usize),
    Incomplete,
    Corrupt,
}

/// Streaming frame decoder.
///
/// Bytes arrive in whatever chunk sizes the transport delivers; complete
/// frames come out in arrival order and an incomplete tail is retained for
/// the next [`feed`](Self::feed). A frame that fails its structure or
/// checksum check is dropped and counted, and decoding resynchronizes on
/// the next occurrence of the start marker, so line noise never
/// desynchronizes the stream permanently.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
    corrupt_frames: u64,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of frames dropped so far because of checksum or structure
    /// errors. Expected to stay at zero on a clean line.
    pub fn corrupt_frames(&self) -> u64 {
        self.corrupt_frames
    }

    /// Discard any partially accumulated bytes.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Append `bytes` and drain every complete frame now available.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<Frame> {
        self.buf.extend_from_slice(bytes);
        let mut frames = Vec::new();

        loop {
            match find_start(&self.buf) {
                Some(0) => {}
                Some(pos) => {
                    self.buf.drain(..pos);
                }
                None => {
                    // Keep a possible partial start marker split across chunks
                    let keep = partial_start_len(&self.buf);
                    self.buf.drain(..self.buf.len() - keep);
                    return frames;
                }
            }

            match self.parse_front() {
                Parse::Complete(frame, consumed) => {
                    self.buf.drain(..consumed);
                    frames.push(frame);
                }
                Parse::Incomplete => return frames,
                Parse::Corrupt => {
                    self.corrupt_frames += 1;
                    warn!(
                        "Dropping corrupt frame ({} dropped so far)",
                        self.corrupt_frames
                    );
                    // Skip this start marker and hunt for the next one
                    self.buf.drain(..START.len());
                }
            }
        }
    }

    /// Tries to parse one frame at the front of the buffer, which is known
    /// to begin with the start marker.
    fn parse_front(&self) -> Parse {
        let buf = &self.buf;
        if buf.len() < 8 {
            return Parse::Incomplete;
        }
        if buf[3] != CMD_MARKER || buf[6] != LEN_MARKER {
            return Parse::Corrupt;
        }

        let len = buf[7] as usize;
        let total = if len == 0 { MIN_FRAME } else { MIN_FRAME + 1 + len };
        if buf.len() < total {
            return Parse::Incomplete;
        }

        let frame = &buf[..total];
        let payload = if len == 0 {
            if frame[8] != CHECKSUM_MARKER {
                return Parse::Corrupt;
            }
            &[][..]
        } else {
            if frame[8] != PAYLOAD_MARKER || frame[9 + len] != CHECKSUM_MARKER {
                return Parse::Corrupt;
            }
            &frame[9..9 + len]
        };

        if checksum(frame) != 0 {
            return Parse::Corrupt;
        }

        Parse::Complete(
            Frame {
                command: CommandId(frame[4], frame[5]),
                payload: payload.to_vec(),
            },
            total,
        )
    }
}

fn find_start(buf: &[u8]) -> Option<usize> {
    buf.windows(START.len()).position(|window| window == START)
}

/// Length of the longest proper prefix of the start marker sitting at the
/// end of `buf`.
fn partial_start_len(buf: &[u8]) -> usize {
    for keep in (1..START.len()).rev() {
        if buf.len() >= keep && buf[buf.len() - keep..] == START[..keep] {
            return keep;
        }
    }
    0
}
