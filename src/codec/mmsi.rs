// MMSI directory codec
//
// A directory is two parallel arrays. Names are 16-byte 0xFF-padded
// records. Numbers are packed one decimal digit per nibble, nine digits
// plus a zero filler nibble in five bytes, and every third number is
// followed by one 0xFF filler byte so the stream stays byte aligned:
//
//   offset(index) = index * 5 + index / 3

use super::{pack_name, unpack_name, CodecError, Result, PAD};
use crate::memmap::MmsiRegion;

pub const NAME_LEN: usize = 15;
const NAME_FIELD: usize = 16;
const NUMBER_FIELD: usize = 5;

/// One directory entry: station name plus nine-digit MMSI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MmsiEntry {
    pub name: String,
    pub mmsi: String,
}

/// Byte offset of entry `index` within the numbers array
pub fn number_offset(index: usize) -> usize {
    index * 5 + index / 3
}

fn validate_number(mmsi: &str) -> Result<()> {
    if mmsi.len() != 9 || !mmsi.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CodecError::BadRecord(format!(
            "MMSI {:?} is not nine decimal digits",
            mmsi
        )));
    }
    Ok(())
}

fn decode_number(bytes: &[u8]) -> Result<Option<String>> {
    if bytes.iter().all(|&b| b == PAD) {
        return Ok(None);
    }
    let mut digits = String::with_capacity(9);
    for &byte in bytes {
        for nibble in [byte >> 4, byte & 0x0F] {
            if digits.len() == 9 {
                break;
            }
            if nibble > 9 {
                return Err(CodecError::InvalidDigit(bytes.to_vec()));
            }
            digits.push((b'0' + nibble) as char);
        }
    }
    Ok(Some(digits))
}

fn encode_number(mmsi: &str) -> Result<[u8; NUMBER_FIELD]> {
    validate_number(mmsi)?;
    let mut nibbles = [0u8; 10];
    for (i, b) in mmsi.bytes().enumerate() {
        nibbles[i] = b - b'0';
    }
    let mut out = [0u8; NUMBER_FIELD];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = (nibbles[2 * i] << 4) | nibbles[2 * i + 1];
    }
    Ok(out)
}

/// Decode a whole directory from its two raw regions
///
/// Empty name slots are skipped; entries come back in slot order.
pub fn decode_directory(names: &[u8], numbers: &[u8], region: &MmsiRegion) -> Result<Vec<MmsiEntry>> {
    if names.len() < region.names_len() || numbers.len() < region.numbers_len() {
        return Err(CodecError::BadRecord(format!(
            "Directory regions are {}/{} bytes, expected {}/{}",
            names.len(),
            numbers.len(),
            region.names_len(),
            region.numbers_len()
        )));
    }

    let mut entries = Vec::new();
    for index in 0..region.count {
        let name = unpack_name(&names[index * NAME_FIELD..(index + 1) * NAME_FIELD]);
        if name.is_empty() {
            continue;
        }
        let offset = number_offset(index);
        match decode_number(&numbers[offset..offset + NUMBER_FIELD])? {
            Some(mmsi) => entries.push(MmsiEntry { name, mmsi }),
            None => {
                return Err(CodecError::BadRecord(format!(
                    "Entry {:?} has a name but no number",
                    name
                )))
            }
        }
    }
    Ok(entries)
}

/// Encode a directory into its two raw regions
///
/// Entries are laid out sorted by name; a repeated number is a hard error.
pub fn encode_directory(
    entries: &[MmsiEntry],
    region: &MmsiRegion,
) -> Result<(Vec<u8>, Vec<u8>)> {
    if entries.len() > region.count {
        return Err(CodecError::OutOfRange {
            what: "directory entries",
            value: entries.len() as i64,
            min: 0,
            max: region.count as i64,
        });
    }
    for (i, entry) in entries.iter().enumerate() {
        if entries[..i].iter().any(|prev| prev.mmsi == entry.mmsi) {
            return Err(CodecError::DuplicateNumber(entry.mmsi.clone()));
        }
    }

    let mut sorted: Vec<&MmsiEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut names = vec![PAD; region.names_len()];
    let mut numbers = vec![PAD; region.numbers_len()];
    for (index, entry) in sorted.iter().enumerate() {
        let packed_name = pack_name(&entry.name, NAME_LEN)?;
        names[index * NAME_FIELD..index * NAME_FIELD + NAME_LEN].copy_from_slice(&packed_name);
        names[index * NAME_FIELD + NAME_LEN] = PAD;

        let offset = number_offset(index);
        numbers[offset..offset + NUMBER_FIELD].copy_from_slice(&encode_number(&entry.mmsi)?);
    }
    Ok((names, numbers))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> MmsiRegion {
        MmsiRegion::new(0, 0, 6)
    }

    fn sample() -> Vec<MmsiEntry> {
        vec![
            MmsiEntry {
                name: "Alpha".to_string(),
                mmsi: "123456789".to_string(),
            },
            MmsiEntry {
                name: "Bravo".to_string(),
                mmsi: "987654321".to_string(),
            },
            MmsiEntry {
                name: "Charlie".to_string(),
                mmsi: "888888888".to_string(),
            },
        ]
    }

    #[test]
    fn test_number_offsets() {
        assert_eq!(number_offset(0), 0);
        assert_eq!(number_offset(1), 5);
        assert_eq!(number_offset(2), 10);
        // Filler byte after the third number
        assert_eq!(number_offset(3), 16);
        assert_eq!(number_offset(6), 32);
    }

    #[test]
    fn test_packed_layout() {
        let (names, numbers) = encode_directory(&sample(), &region()).unwrap();

        assert_eq!(&names[0..7], &[0x41, 0x6C, 0x70, 0x68, 0x61, 0xFF, 0xFF]);
        // Nine digits plus a trailing zero filler nibble
        assert_eq!(&numbers[0..5], &[0x12, 0x34, 0x56, 0x78, 0x90]);
        assert_eq!(&numbers[5..10], &[0x98, 0x76, 0x54, 0x32, 0x10]);
        assert_eq!(&numbers[10..15], &[0x88, 0x88, 0x88, 0x88, 0x80]);
        // The filler byte after the third slot stays 0xFF
        assert_eq!(numbers[15], 0xFF);
    }

    #[test]
    fn test_roundtrip_sorted() {
        let mut entries = sample();
        entries.swap(0, 2);
        let (names, numbers) = encode_directory(&entries, &region()).unwrap();
        let decoded = decode_directory(&names, &numbers, &region()).unwrap();
        assert_eq!(decoded, sample());
    }

    #[test]
    fn test_duplicate_number_rejected() {
        let mut entries = sample();
        entries[2].mmsi = entries[0].mmsi.clone();
        let err = encode_directory(&entries, &region()).unwrap_err();
        assert_eq!(err, CodecError::DuplicateNumber("123456789".to_string()));
    }

    #[test]
    fn test_bad_number_rejected() {
        let entries = vec![MmsiEntry {
            name: "Short".to_string(),
            mmsi: "12345".to_string(),
        }];
        assert!(encode_directory(&entries, &region()).is_err());

        let entries = vec![MmsiEntry {
            name: "Alpha".to_string(),
            mmsi: "12345678X".to_string(),
        }];
        assert!(encode_directory(&entries, &region()).is_err());
    }

    #[test]
    fn test_empty_directory() {
        let (names, numbers) = encode_directory(&[], &region()).unwrap();
        assert!(names.iter().all(|&b| b == 0xFF));
        assert!(numbers.iter().all(|&b| b == 0xFF));
        assert!(decode_directory(&names, &numbers, &region())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_name_without_number_rejected() {
        let (mut names, numbers) = encode_directory(&sample(), &region()).unwrap();
        names[3 * 16] = b'D';
        assert!(decode_directory(&names, &numbers, &region()).is_err());
    }

    #[test]
    fn test_capacity_enforced() {
        let tight = MmsiRegion::new(0, 0, 2);
        assert!(encode_directory(&sample(), &tight).is_err());
    }
}
