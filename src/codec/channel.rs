// Marine channel codec
//
// Channel state is split across three regions: a 1-bit-per-channel
// enabled bitfield (MSB first within each byte), a 4-byte flag record
// per channel, and an optional 16-byte name record.
//
// Flag record layout:
//   [0]  numeric base id
//   [1]  bit 7 DSC enabled, bits 0-1 suffix (00 none, 01 A, 10 B)
//   [2]  prefix digit; 0x7F and 0x00 both mean no prefix
//   [3]  scrambler: bit 7 present, bit 6 code space (0 = 4, 1 = 32),
//        bits 0-4 code

use super::{CodecError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;

pub const FLAG_RECORD_SIZE: usize = 4;
pub const NAME_LEN: usize = 15;

const NO_PREFIX: u8 = 0x7F;

/// A/B working-channel suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Suffix {
    A,
    B,
}

/// Composite channel identity: base id, optional prefix digit, optional
/// suffix. This is the join key for edits addressed by channel id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId {
    pub base: u8,
    pub prefix: Option<u8>,
    pub suffix: Option<Suffix>,
}

lazy_static! {
    // Accepted forms: "16", "088A", "1078"
    static ref CHANNEL_ID: Regex =
        Regex::new(r"^(?:(\d{2})|(\d{3})([AB])|(\d)(\d{3}))$").unwrap();
}

impl ChannelId {
    pub fn plain(base: u8) -> Self {
        Self {
            base,
            prefix: None,
            suffix: None,
        }
    }

    /// Parse a textual channel id
    ///
    /// Two digits are a bare base id, three digits need an A/B suffix,
    /// four digits are a prefix digit followed by a three-digit base.
    /// Anything else is ambiguous and rejected.
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || CodecError::BadRecord(format!("Bad channel id {:?}", text));
        let caps = CHANNEL_ID.captures(text).ok_or_else(bad)?;

        if let Some(base) = caps.get(1) {
            return Ok(Self::plain(base.as_str().parse().map_err(|_| bad())?));
        }
        if let Some(base) = caps.get(2) {
            let base: u8 = base.as_str().parse().map_err(|_| bad())?;
            let suffix = match caps.get(3).map(|m| m.as_str()) {
                Some("A") => Suffix::A,
                Some("B") => Suffix::B,
                _ => return Err(bad()),
            };
            return Ok(Self {
                base,
                prefix: None,
                suffix: Some(suffix),
            });
        }
        let prefix: u8 = caps[4].parse().map_err(|_| bad())?;
        let base: u8 = caps[5].parse().map_err(|_| bad())?;
        Ok(Self {
            base,
            prefix: Some(prefix),
            suffix: None,
        })
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.prefix, self.suffix) {
            (Some(prefix), _) => write!(f, "{}{:03}", prefix, self.base),
            (None, Some(Suffix::A)) => write!(f, "{:03}A", self.base),
            (None, Some(Suffix::B)) => write!(f, "{:03}B", self.base),
            (None, None) => write!(f, "{:02}", self.base),
        }
    }
}

/// Voice scrambler setting; `type32` selects the 32-code space
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrambler {
    pub type32: bool,
    pub code: u8,
}

impl Scrambler {
    pub fn code_space(&self) -> u8 {
        if self.type32 {
            32
        } else {
            4
        }
    }

    fn validate(&self) -> Result<()> {
        if self.code >= self.code_space() {
            return Err(CodecError::OutOfRange {
                what: "scrambler code",
                value: self.code as i64,
                min: 0,
                max: self.code_space() as i64 - 1,
            });
        }
        Ok(())
    }
}

/// One channel's 4-byte flag record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelFlags {
    pub id: ChannelId,
    pub dsc: bool,
    pub scrambler: Option<Scrambler>,
}

/// Decode one flag record
pub fn decode_flags(bytes: &[u8]) -> Result<ChannelFlags> {
    if bytes.len() != FLAG_RECORD_SIZE {
        return Err(CodecError::BadRecord(format!(
            "Channel flag record is {} bytes, expected {}",
            bytes.len(),
            FLAG_RECORD_SIZE
        )));
    }
    let suffix = match bytes[1] & 0x03 {
        0b00 => None,
        0b01 => Some(Suffix::A),
        0b10 => Some(Suffix::B),
        _ => {
            return Err(CodecError::BadRecord(format!(
                "Bad suffix bits in {:#04X}",
                bytes[1]
            )))
        }
    };
    let prefix = match bytes[2] {
        NO_PREFIX | 0x00 => None,
        digit => Some(digit),
    };
    let scrambler = if bytes[3] & 0x80 != 0 {
        let scrambler = Scrambler {
            type32: bytes[3] & 0x40 != 0,
            code: bytes[3] & 0x1F,
        };
        scrambler.validate()?;
        Some(scrambler)
    } else {
        None
    };
    Ok(ChannelFlags {
        id: ChannelId {
            base: bytes[0],
            prefix,
            suffix,
        },
        dsc: bytes[1] & 0x80 != 0,
        scrambler,
    })
}

/// Encode one flag record
pub fn encode_flags(flags: &ChannelFlags) -> Result<Vec<u8>> {
    let mut out = vec![0u8; FLAG_RECORD_SIZE];
    out[0] = flags.id.base;
    out[1] = match flags.id.suffix {
        None => 0b00,
        Some(Suffix::A) => 0b01,
        Some(Suffix::B) => 0b10,
    };
    if flags.dsc {
        out[1] |= 0x80;
    }
    out[2] = match flags.id.prefix {
        Some(digit) => digit,
        None => NO_PREFIX,
    };
    if let Some(scrambler) = flags.scrambler {
        scrambler.validate()?;
        out[3] = 0x80 | ((scrambler.type32 as u8) << 6) | scrambler.code;
    }
    Ok(out)
}

/// Read one channel's bit from the enabled bitfield, MSB first
pub fn is_enabled(bitfield: &[u8], index: usize) -> bool {
    bitfield
        .get(index / 8)
        .map(|byte| byte >> (7 - index % 8) & 1 == 1)
        .unwrap_or(false)
}

/// Set one channel's bit in the enabled bitfield
pub fn set_enabled(bitfield: &mut [u8], index: usize, enabled: bool) {
    let mask = 1u8 << (7 - index % 8);
    if enabled {
        bitfield[index / 8] |= mask;
    } else {
        bitfield[index / 8] &= !mask;
    }
}
