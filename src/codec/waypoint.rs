// Waypoint record codec
//
// 32-byte layout:
//   [0..5)    origin tag, opaque, default FF FF FF FF F0
//   [5..9)    latitude as 8 packed digits: DDMMMMMM (minutes x10000)
//   [9]       latitude hemisphere letter ('N'/'S')
//   [10..15)  longitude as 10 packed digits: 0DDDMMMMMM
//   [15]      longitude hemisphere letter ('E'/'W')
//   [16..31)  name, 15 bytes, 0xFF padded
//   [31]      waypoint id, 255 = empty slot

use super::{pack_digits, pack_name, unpack_digits, unpack_name, CodecError, Result};
use std::fmt;

pub const RECORD_SIZE: usize = 32;

/// Slot sentinel: no waypoint stored here
pub const EMPTY_ID: u8 = 0xFF;

/// Highest assignable waypoint id
pub const MAX_ID: u8 = 254;

/// Maximum name length
pub const NAME_LEN: usize = 15;

/// Origin tag written for waypoints that never came off a device
pub const ORIGIN_DEFAULT: [u8; 5] = [0xFF, 0xFF, 0xFF, 0xFF, 0xF0];

/// One geographic coordinate: degrees plus decimal minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Coordinate {
    pub degrees: u16,
    /// Minutes scaled by 10,000
    pub minutes_e4: u32,
    pub hemisphere: char,
}

impl Coordinate {
    pub fn new(degrees: u16, minutes_e4: u32, hemisphere: char) -> Result<Self> {
        let coord = Self {
            degrees,
            minutes_e4,
            hemisphere,
        };
        coord.validate()?;
        Ok(coord)
    }

    fn is_latitude(&self) -> bool {
        matches!(self.hemisphere, 'N' | 'S')
    }

    fn validate(&self) -> Result<()> {
        let max_degrees = match self.hemisphere {
            'N' | 'S' => 90,
            'E' | 'W' => 180,
            _ => {
                return Err(CodecError::BadRecord(format!(
                    "Bad hemisphere letter {:?}",
                    self.hemisphere
                )))
            }
        };
        if self.degrees > max_degrees {
            return Err(CodecError::OutOfRange {
                what: "degrees",
                value: self.degrees as i64,
                min: 0,
                max: max_degrees as i64,
            });
        }
        if self.minutes_e4 >= 600_000 {
            return Err(CodecError::OutOfRange {
                what: "minutes",
                value: self.minutes_e4 as i64,
                min: 0,
                max: 599_999,
            });
        }
        Ok(())
    }

    /// Parse the textual form, e.g. "47 38.8000 N"
    pub fn parse(text: &str) -> Result<Self> {
        let bad = || CodecError::BadRecord(format!("Bad coordinate {:?}", text));
        let mut parts = text.split_whitespace();
        let degrees: u16 = parts.next().and_then(|p| p.parse().ok()).ok_or_else(bad)?;
        let minutes = parts.next().ok_or_else(bad)?;
        let hemisphere = parts
            .next()
            .filter(|p| p.len() == 1)
            .and_then(|p| p.chars().next())
            .ok_or_else(bad)?;
        if parts.next().is_some() {
            return Err(bad());
        }

        let (whole, frac) = minutes.split_once('.').ok_or_else(bad)?;
        if frac.len() != 4 {
            return Err(bad());
        }
        let whole: u32 = whole.parse().map_err(|_| bad())?;
        let frac: u32 = frac.parse().map_err(|_| bad())?;
        Self::new(degrees, whole * 10_000 + frac, hemisphere)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = if self.is_latitude() { 2 } else { 3 };
        write!(
            f,
            "{:0w$} {:02}.{:04} {}",
            self.degrees,
            self.minutes_e4 / 10_000,
            self.minutes_e4 % 10_000,
            self.hemisphere,
            w = width
        )
    }
}

/// One stored waypoint
#[derive(Debug, Clone, PartialEq)]
pub struct Waypoint {
    /// Stable identifier in [1, 254]
    pub id: u8,
    pub name: String,
    pub lat: Coordinate,
    pub lon: Coordinate,
    /// Opaque origin tag copied forward from a previous read
    pub origin: Option<[u8; 5]>,
    /// Absolute record address, used only when diffing against a snapshot
    pub address: Option<u16>,
}

/// Decode one 32-byte record; id 255 means an empty slot
pub fn decode(bytes: &[u8], address: Option<u16>) -> Result<Option<Waypoint>> {
    if bytes.len() != RECORD_SIZE {
        return Err(CodecError::BadRecord(format!(
            "Waypoint record is {} bytes, expected {}",
            bytes.len(),
            RECORD_SIZE
        )));
    }
    let id = bytes[31];
    if id == EMPTY_ID {
        return Ok(None);
    }

    let mut origin = [0u8; 5];
    origin.copy_from_slice(&bytes[0..5]);

    let lat_digits = unpack_digits(&bytes[5..9])?;
    let lat = Coordinate::new(
        (lat_digits / 1_000_000) as u16,
        (lat_digits % 1_000_000) as u32,
        bytes[9] as char,
    )?;

    let lon_digits = unpack_digits(&bytes[10..15])?;
    let lon = Coordinate::new(
        (lon_digits / 1_000_000) as u16,
        (lon_digits % 1_000_000) as u32,
        bytes[15] as char,
    )?;

    Ok(Some(Waypoint {
        id,
        name: unpack_name(&bytes[16..31]),
        lat,
        lon,
        origin: Some(origin),
        address,
    }))
}

/// Encode one waypoint into its 32-byte record
pub fn encode(waypoint: &Waypoint) -> Result<Vec<u8>> {
    if waypoint.id == EMPTY_ID {
        return Err(CodecError::OutOfRange {
            what: "waypoint id",
            value: waypoint.id as i64,
            min: 0,
            max: MAX_ID as i64,
        });
    }
    waypoint.lat.validate()?;
    waypoint.lon.validate()?;
    if !waypoint.lat.is_latitude() || waypoint.lon.is_latitude() {
        return Err(CodecError::BadRecord(format!(
            "Hemisphere letters swapped: {} / {}",
            waypoint.lat.hemisphere, waypoint.lon.hemisphere
        )));
    }

    let mut out = vec![0u8; RECORD_SIZE];
    out[0..5].copy_from_slice(&waypoint.origin.unwrap_or(ORIGIN_DEFAULT));

    let lat_digits = waypoint.lat.degrees as u64 * 1_000_000 + waypoint.lat.minutes_e4 as u64;
    out[5..9].copy_from_slice(&pack_digits(lat_digits, 8)?);
    out[9] = waypoint.lat.hemisphere as u8;

    let lon_digits = waypoint.lon.degrees as u64 * 1_000_000 + waypoint.lon.minutes_e4 as u64;
    out[10..15].copy_from_slice(&pack_digits(lon_digits, 10)?);
    out[15] = waypoint.lon.hemisphere as u8;

    out[16..31].copy_from_slice(&pack_name(&waypoint.name, NAME_LEN)?);
    out[31] = waypoint.id;
    Ok(out)
}

/// An erased (empty) waypoint slot
pub fn empty_record() -> Vec<u8> {
    vec![0xFF; RECORD_SIZE]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Waypoint {
        Waypoint {
            id: 7,
            name: "SHILSHOLE".to_string(),
            lat: Coordinate::new(47, 388_000, 'N').unwrap(),
            lon: Coordinate::new(122, 244_517, 'W').unwrap(),
            origin: None,
            address: None,
        }
    }

    #[test]
    fn test_roundtrip() {
        let wp = sample();
        let bytes = encode(&wp).unwrap();
        assert_eq!(bytes.len(), RECORD_SIZE);

        let decoded = decode(&bytes, None).unwrap().unwrap();
        // origin is defaulted on encode and preserved on decode
        assert_eq!(decoded.origin, Some(ORIGIN_DEFAULT));
        assert_eq!(
            Waypoint {
                origin: None,
                ..decoded
            },
            wp
        );
    }

    #[test]
    fn test_packed_coordinate_bytes() {
        let wp = sample();
        let bytes = encode(&wp).unwrap();
        // 47° 38.8000' -> digits 47388000, two per byte
        assert_eq!(&bytes[5..9], &[0x47, 0x38, 0x80, 0x00]);
        assert_eq!(bytes[9], b'N');
        // 122° 24.4517' -> digits 0122244517 with leading filler zero
        assert_eq!(&bytes[10..15], &[0x01, 0x22, 0x24, 0x45, 0x17]);
        assert_eq!(bytes[15], b'W');
        assert_eq!(bytes[31], 7);
    }

    #[test]
    fn test_empty_slot() {
        assert_eq!(decode(&empty_record(), None).unwrap(), None);
    }

    #[test]
    fn test_origin_preserved_byte_for_byte() {
        let mut wp = sample();
        wp.origin = Some([0x12, 0x34, 0x56, 0x78, 0x90]);
        let bytes = encode(&wp).unwrap();
        assert_eq!(&bytes[0..5], &[0x12, 0x34, 0x56, 0x78, 0x90]);

        let decoded = decode(&bytes, None).unwrap().unwrap();
        assert_eq!(decoded.origin, wp.origin);
    }

    #[test]
    fn test_name_padding() {
        let bytes = encode(&sample()).unwrap();
        assert_eq!(&bytes[16..25], b"SHILSHOLE");
        assert!(bytes[25..31].iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_validation() {
        let mut wp = sample();
        wp.lat = Coordinate {
            degrees: 91,
            minutes_e4: 0,
            hemisphere: 'N',
        };
        assert!(encode(&wp).is_err());

        let mut wp = sample();
        wp.name = "THIS NAME IS TOO LONG".to_string();
        assert!(encode(&wp).is_err());

        // Swapped hemispheres
        let mut wp = sample();
        wp.lat.hemisphere = 'E';
        assert!(encode(&wp).is_err());
    }

    #[test]
    fn test_coordinate_text_roundtrip() {
        let lat = Coordinate::new(47, 388_000, 'N').unwrap();
        assert_eq!(lat.to_string(), "47 38.8000 N");
        assert_eq!(Coordinate::parse("47 38.8000 N").unwrap(), lat);

        let lon = Coordinate::new(6, 93, 'E').unwrap();
        assert_eq!(lon.to_string(), "006 00.0093 E");
        assert_eq!(Coordinate::parse("006 00.0093 E").unwrap(), lon);

        assert!(Coordinate::parse("47 38.8 N").is_err());
        assert!(Coordinate::parse("47 38.8000 X").is_err());
        assert!(Coordinate::parse("91 00.0000 N").is_err());
    }

    #[test]
    fn test_decode_rejects_garbage_digits() {
        let mut bytes = encode(&sample()).unwrap();
        bytes[5] = 0xAB;
        assert!(decode(&bytes, None).is_err());
    }
}
