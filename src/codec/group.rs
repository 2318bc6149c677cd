// Channel group record codec
//
// 16-byte layout:
//   [0]       enabled flag
//   [1]       DSC flag
//   [2]       ATIS flag
//   [3..8)    group name, up to 4 chars, 0xFF padded
//   [8..16)   model name, up to 6 chars, 0xFF padded

use super::{pack_name, unpack_name, CodecError, Result, PAD};

pub const RECORD_SIZE: usize = 16;
pub const NAME_LEN: usize = 4;
pub const MODEL_NAME_LEN: usize = 6;

/// One channel group: a bank of marine channels switchable as a unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelGroup {
    pub name: String,
    pub enabled: bool,
    pub dsc: bool,
    pub atis: bool,
    pub model_name: String,
}

fn decode_flag(byte: u8) -> Result<bool> {
    match byte {
        0x00 => Ok(false),
        0x01 => Ok(true),
        other => Err(CodecError::BadRecord(format!(
            "Bad group flag byte {:#04X}",
            other
        ))),
    }
}

/// Decode one 16-byte group record; an all-0xFF record is an unused slot
pub fn decode(bytes: &[u8]) -> Result<Option<ChannelGroup>> {
    if bytes.len() != RECORD_SIZE {
        return Err(CodecError::BadRecord(format!(
            "Group record is {} bytes, expected {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }
    if bytes.iter().all(|&b| b == PAD) {
        return Ok(None);
    }
    Ok(Some(ChannelGroup {
        enabled: decode_flag(bytes[0])?,
        dsc: decode_flag(bytes[1])?,
        atis: decode_flag(bytes[2])?,
        name: unpack_name(&bytes[3..8]),
        model_name: unpack_name(&bytes[8..16]),
    }))
}

/// Encode one group into its 16-byte record
pub fn encode(group: &ChannelGroup) -> Result<Vec<u8>> {
    if group.name.len() > NAME_LEN {
        return Err(CodecError::NameTooLong {
            name: group.name.clone(),
            max: NAME_LEN,
        });
    }
    if group.model_name.len() > MODEL_NAME_LEN {
        return Err(CodecError::NameTooLong {
            name: group.model_name.clone(),
            max: MODEL_NAME_LEN,
        });
    }

    let mut out = vec![PAD; RECORD_SIZE];
    out[0] = group.enabled as u8;
    out[1] = group.dsc as u8;
    out[2] = group.atis as u8;
    out[3..8].copy_from_slice(&pack_name(&group.name, 5)?);
    out[8..16].copy_from_slice(&pack_name(&group.model_name, 8)?);
    Ok(out)
}
