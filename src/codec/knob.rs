// Preference knob codec
//
// Each knob owns a single device byte. The value shape comes from the
// memory map's KnobKind; encoding the auto-individual-reply knob needs
// the previous on-device byte because it only controls two bits.

use super::{CodecError, Result};
use crate::memmap::{KnobKind, KnobSpec};
use std::fmt;
use tracing::warn;

/// Soft-key vocabulary in byte-code order; models with a smaller
/// vocabulary understand only a prefix of this list.
pub const SOFT_KEYS: &[&str] = &[
    "none",
    "tx_power",
    "wx_or_ch",
    "scan",
    "dual_watch",
    "mark",
    "compass",
    "waypoint",
    "mob",
    "backlight",
    "scrambler",
    "noise_cancel",
];

/// Bits controlled by the auto-individual-reply knob
const AUTO_REPLY_BITS: u8 = 0b0001_0001;

/// A decoded knob setting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnobValue {
    Number(u8),
    Choice(&'static str),
    Boolean(bool),
    SoftKey(&'static str),
    AutoReply(bool),
}

impl fmt::Display for KnobValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnobValue::Number(n) => write!(f, "{}", n),
            KnobValue::Choice(s) | KnobValue::SoftKey(s) => f.write_str(s),
            KnobValue::Boolean(b) | KnobValue::AutoReply(b) => {
                f.write_str(if *b { "on" } else { "off" })
            }
        }
    }
}

fn parse_switch(spec: &KnobSpec, text: &str) -> Result<bool> {
    match text {
        "on" | "true" => Ok(true),
        "off" | "false" => Ok(false),
        _ => Err(CodecError::BadRecord(format!(
            "{}: expected on/off, got {:?}",
            spec.name, text
        ))),
    }
}

/// Decode a knob's device byte
pub fn read(spec: &KnobSpec, byte: u8, vocab: usize) -> Result<KnobValue> {
    let bad = || {
        CodecError::BadRecord(format!(
            "{}: unexpected device byte {:#04X}",
            spec.name, byte
        ))
    };
    match spec.kind {
        KnobKind::Number { min, max } => {
            if !(min..=max).contains(&byte) {
                return Err(CodecError::OutOfRange {
                    what: spec.name,
                    value: byte as i64,
                    min: min as i64,
                    max: max as i64,
                });
            }
            Ok(KnobValue::Number(byte))
        }
        KnobKind::Enum { values, base } => {
            let index = byte.checked_sub(base).ok_or_else(bad)? as usize;
            Ok(KnobValue::Choice(*values.get(index).ok_or_else(bad)?))
        }
        KnobKind::Boolean => match byte {
            0x00 => Ok(KnobValue::Boolean(false)),
            0x01 => Ok(KnobValue::Boolean(true)),
            _ => Err(bad()),
        },
        KnobKind::SoftKey => {
            let index = byte as usize;
            if index >= vocab {
                return Err(bad());
            }
            Ok(KnobValue::SoftKey(*SOFT_KEYS.get(index).ok_or_else(bad)?))
        }
        KnobKind::AutoIndividualReply => Ok(KnobValue::AutoReply(byte & AUTO_REPLY_BITS != 0)),
    }
}

/// Parse a knob setting from its textual form
pub fn parse(spec: &KnobSpec, text: &str) -> Result<KnobValue> {
    match spec.kind {
        KnobKind::Number { min, max } => {
            let value: u8 = text.parse().map_err(|_| {
                CodecError::BadRecord(format!("{}: expected a number, got {:?}", spec.name, text))
            })?;
            if !(min..=max).contains(&value) {
                return Err(CodecError::OutOfRange {
                    what: spec.name,
                    value: value as i64,
                    min: min as i64,
                    max: max as i64,
                });
            }
            Ok(KnobValue::Number(value))
        }
        KnobKind::Enum { values, .. } => values
            .iter()
            .find(|&&v| v == text)
            .map(|&v| KnobValue::Choice(v))
            .ok_or_else(|| {
                CodecError::BadRecord(format!(
                    "{}: expected one of {:?}, got {:?}",
                    spec.name, values, text
                ))
            }),
        KnobKind::Boolean => Ok(KnobValue::Boolean(parse_switch(spec, text)?)),
        KnobKind::SoftKey => SOFT_KEYS
            .iter()
            .find(|&&k| k == text)
            .map(|&k| KnobValue::SoftKey(k))
            .ok_or_else(|| {
                CodecError::BadRecord(format!("{}: unknown soft key {:?}", spec.name, text))
            }),
        KnobKind::AutoIndividualReply => Ok(KnobValue::AutoReply(parse_switch(spec, text)?)),
    }
}

/// Encode a knob setting into its device byte
///
/// Soft keys the model's firmware does not know fall back to "none".
/// `previous` is the current on-device byte; auto-individual-reply
/// refuses to encode without it.
pub fn encode(
    spec: &KnobSpec,
    value: &KnobValue,
    previous: Option<u8>,
    vocab: usize,
) -> Result<u8> {
    let mismatch = || {
        CodecError::BadRecord(format!(
            "{}: value {} does not fit this setting",
            spec.name, value
        ))
    };
    match (spec.kind, value) {
        (KnobKind::Number { min, max }, KnobValue::Number(n)) => {
            if !(min..=max).contains(n) {
                return Err(CodecError::OutOfRange {
                    what: spec.name,
                    value: *n as i64,
                    min: min as i64,
                    max: max as i64,
                });
            }
            Ok(*n)
        }
        (KnobKind::Enum { values, base }, KnobValue::Choice(choice)) => {
            let index = values.iter().position(|v| v == choice).ok_or_else(mismatch)?;
            Ok(base + index as u8)
        }
        (KnobKind::Boolean, KnobValue::Boolean(b)) => Ok(*b as u8),
        (KnobKind::SoftKey, KnobValue::SoftKey(key)) => {
            let index = SOFT_KEYS.iter().position(|k| k == key).ok_or_else(mismatch)?;
            if index >= vocab {
                warn!(knob = spec.name, key, "soft key not supported on this model");
                return Ok(0);
            }
            Ok(index as u8)
        }
        (KnobKind::AutoIndividualReply, KnobValue::AutoReply(enabled)) => {
            let previous = previous.ok_or(CodecError::MissingBaseline)?;
            Ok(if *enabled {
                previous | AUTO_REPLY_BITS
            } else {
                previous & !AUTO_REPLY_BITS
            })
        }
        _ => Err(mismatch()),
    }
}
