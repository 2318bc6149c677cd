// Per-record binary codecs
// Bit-exact translation between device memory layouts and domain values.

pub mod channel;
pub mod fm;
pub mod group;
pub mod knob;
pub mod mmsi;
pub mod route;
pub mod waypoint;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid packed digit in {0:02X?}")]
    InvalidDigit(Vec<u8>),

    #[error("Name {name:?} exceeds {max} characters")]
    NameTooLong { name: String, max: usize },

    #[error("Name {0:?} contains non-printable characters")]
    NameNotPrintable(String),

    #[error("{what} {value} out of range [{min}, {max}]")]
    OutOfRange {
        what: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Malformed record: {0}")]
    BadRecord(String),

    #[error("Duplicate MMSI number {0}")]
    DuplicateNumber(String),

    #[error("No previous value to preserve unrelated bits from")]
    MissingBaseline,
}

pub type Result<T> = std::result::Result<T, CodecError>;

/// Padding byte for unused name/list bytes
pub const PAD: u8 = 0xFF;

/// Pack a name left-justified into `len` bytes, padded with 0xFF
pub fn pack_name(name: &str, len: usize) -> Result<Vec<u8>> {
    if name.len() > len {
        return Err(CodecError::NameTooLong {
            name: name.to_string(),
            max: len,
        });
    }
    if !name.bytes().all(|b| (0x20..0x7F).contains(&b)) {
        return Err(CodecError::NameNotPrintable(name.to_string()));
    }
    let mut out = vec![PAD; len];
    out[..name.len()].copy_from_slice(name.as_bytes());
    Ok(out)
}

/// Unpack an 0xFF-padded name field
pub fn unpack_name(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take_while(|&&b| b != PAD && b != 0x00)
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                b as char
            } else {
                ' '
            }
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Pack a decimal number as packed digits, two per byte, big-endian
///
/// `ndigits` must be even; the value is left-padded with zero digits.
pub fn pack_digits(value: u64, ndigits: usize) -> Result<Vec<u8>> {
    debug_assert!(ndigits % 2 == 0);
    let max = 10u64.pow(ndigits as u32);
    if value >= max {
        return Err(CodecError::OutOfRange {
            what: "packed decimal",
            value: value as i64,
            min: 0,
            max: max as i64 - 1,
        });
    }
    let mut out = vec![0u8; ndigits / 2];
    let mut rest = value;
    for byte in out.iter_mut().rev() {
        let two = (rest % 100) as u8;
        rest /= 100;
        *byte = ((two / 10) << 4) | (two % 10);
    }
    Ok(out)
}

/// Unpack big-endian packed decimal digits into a number
pub fn unpack_digits(bytes: &[u8]) -> Result<u64> {
    let mut value: u64 = 0;
    for &byte in bytes {
        let hi = byte >> 4;
        let lo = byte & 0x0F;
        if hi > 9 || lo > 9 {
            return Err(CodecError::InvalidDigit(bytes.to_vec()));
        }
        value = value * 100 + (hi * 10 + lo) as u64;
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_name() {
        assert_eq!(pack_name("USA", 5).unwrap(), vec![0x55, 0x53, 0x41, 0xFF, 0xFF]);
        assert_eq!(pack_name("", 2).unwrap(), vec![0xFF, 0xFF]);
        assert!(pack_name("TOOLONG", 4).is_err());
        assert!(pack_name("BAD\u{7}", 8).is_err());
    }

    #[test]
    fn test_unpack_name() {
        assert_eq!(unpack_name(&[0x55, 0x53, 0x41, 0xFF, 0xFF]), "USA");
        assert_eq!(unpack_name(&[0xFF; 4]), "");
        // NUL also terminates
        assert_eq!(unpack_name(&[0x41, 0x00, 0x42]), "A");
    }

    #[test]
    fn test_digit_packing() {
        assert_eq!(pack_digits(47_388_000, 8).unwrap(), vec![0x47, 0x38, 0x80, 0x00]);
        assert_eq!(unpack_digits(&[0x47, 0x38, 0x80, 0x00]).unwrap(), 47_388_000);

        // Left zero padding
        assert_eq!(pack_digits(42, 6).unwrap(), vec![0x00, 0x00, 0x42]);

        assert!(pack_digits(100, 2).is_err());
        assert!(unpack_digits(&[0xAB]).is_err());
    }
}
