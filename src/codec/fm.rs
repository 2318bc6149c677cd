// FM broadcast preset codec
//
// 16-byte layout:
//   [0]       active flag
//   [1..4)    frequency as six packed decimal digits of MHz x 100
//   [4..16)   name, up to 12 chars, 0xFF padded

use super::{pack_digits, pack_name, unpack_digits, unpack_name, CodecError, Result, PAD};

pub const RECORD_SIZE: usize = 16;
pub const NAME_LEN: usize = 12;

/// Frequency bounds in tenths of a MHz
pub const FREQ_MIN_DHZ: u16 = 650;
pub const FREQ_MAX_DHZ: u16 = 1089;

/// One FM preset; frequency held in tenths of a MHz (88.5 MHz = 885)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FmPreset {
    pub name: String,
    pub freq_dhz: u16,
    pub active: bool,
}

impl FmPreset {
    /// Render the frequency as "88.5"
    pub fn freq_text(&self) -> String {
        format!("{}.{}", self.freq_dhz / 10, self.freq_dhz % 10)
    }

    /// Parse "88.5" or "101" back into tenths of a MHz
    pub fn parse_freq(text: &str) -> Result<u16> {
        let bad = || CodecError::BadRecord(format!("Bad FM frequency {:?}", text));
        let dhz = match text.split_once('.') {
            Some((whole, tenth)) => {
                if tenth.len() != 1 {
                    return Err(bad());
                }
                let whole: u16 = whole.parse().map_err(|_| bad())?;
                let tenth: u16 = tenth.parse().map_err(|_| bad())?;
                whole * 10 + tenth
            }
            None => text.parse::<u16>().map_err(|_| bad())? * 10,
        };
        check_freq(dhz)?;
        Ok(dhz)
    }
}

fn check_freq(dhz: u16) -> Result<()> {
    if !(FREQ_MIN_DHZ..=FREQ_MAX_DHZ).contains(&dhz) {
        return Err(CodecError::OutOfRange {
            what: "FM frequency (0.1 MHz)",
            value: dhz as i64,
            min: FREQ_MIN_DHZ as i64,
            max: FREQ_MAX_DHZ as i64,
        });
    }
    Ok(())
}

/// Decode one 16-byte preset record; empty name means an unused slot
pub fn decode(bytes: &[u8]) -> Result<Option<FmPreset>> {
    if bytes.len() != RECORD_SIZE {
        return Err(CodecError::BadRecord(format!(
            "FM preset record is {} bytes, expected {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }
    let name = unpack_name(&bytes[4..16]);
    if name.is_empty() {
        return Ok(None);
    }

    let centi = unpack_digits(&bytes[1..4])?;
    if centi % 10 != 0 {
        return Err(CodecError::BadRecord(format!(
            "FM frequency {} is not a 0.1 MHz multiple",
            centi
        )));
    }
    let freq_dhz = (centi / 10) as u16;
    check_freq(freq_dhz)?;

    Ok(Some(FmPreset {
        name,
        freq_dhz,
        active: bytes[0] == 0x01,
    }))
}

/// Encode one preset into its 16-byte record
pub fn encode(preset: &FmPreset) -> Result<Vec<u8>> {
    check_freq(preset.freq_dhz)?;
    let mut out = vec![PAD; RECORD_SIZE];
    out[0] = preset.active as u8;
    out[1..4].copy_from_slice(&pack_digits(preset.freq_dhz as u64 * 10, 6)?);
    out[4..16].copy_from_slice(&pack_name(&preset.name, NAME_LEN)?);
    Ok(out)
}

/// An erased preset slot
pub fn empty_record() -> Vec<u8> {
    vec![PAD; RECORD_SIZE]
}
