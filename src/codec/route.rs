// Route record codec
//
// Layout (record size per model, 64 bytes here):
//   [0..16)          name, 0xFF padded
//   [16..16+cap)     waypoint ids, 0xFF padded after the last real id
//   remainder        0xFF
//
// The device stores the list right-rotated by one: slot 0 holds the leg
// that comes immediately after the currently-active one. Decode rotates
// left, encode rotates right.

use super::{pack_name, unpack_name, CodecError, Result, PAD};

pub const NAME_LEN: usize = 15;
const NAME_FIELD: usize = 16;

/// One stored route: a name plus an ordered list of waypoint ids
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub name: String,
    pub points: Vec<u8>,
}

/// Rotate a waypoint list left by one (device order -> logical order)
pub fn rotate_left(ids: &[u8]) -> Vec<u8> {
    let mut out = ids.to_vec();
    if out.len() > 1 {
        out.rotate_left(1);
    }
    out
}

/// Rotate a waypoint list right by one (logical order -> device order)
pub fn rotate_right(ids: &[u8]) -> Vec<u8> {
    let mut out = ids.to_vec();
    if out.len() > 1 {
        out.rotate_right(1);
    }
    out
}

/// Decode one route record; empty name or all-0xFF id list means no route
pub fn decode(bytes: &[u8], capacity: usize) -> Result<Option<Route>> {
    if bytes.len() < NAME_FIELD + capacity {
        return Err(CodecError::BadRecord(format!(
            "Route record is {} bytes, expected at least {}",
            bytes.len(),
            NAME_FIELD + capacity
        )));
    }
    let name = unpack_name(&bytes[0..NAME_FIELD]);
    let ids = &bytes[NAME_FIELD..NAME_FIELD + capacity];

    // Last real id scanning backward
    let used = match ids.iter().rposition(|&b| b != PAD) {
        Some(last) => last + 1,
        None => 0,
    };
    if name.is_empty() || used == 0 {
        return Ok(None);
    }

    Ok(Some(Route {
        name,
        points: rotate_left(&ids[..used]),
    }))
}

/// Encode one route into a record of `size` bytes
pub fn encode(route: &Route, size: usize, capacity: usize) -> Result<Vec<u8>> {
    if route.points.len() > capacity {
        return Err(CodecError::OutOfRange {
            what: "route length",
            value: route.points.len() as i64,
            min: 0,
            max: capacity as i64,
        });
    }
    if route.points.iter().any(|&id| id == PAD) {
        return Err(CodecError::BadRecord(format!(
            "Route {:?} contains the empty-slot id",
            route.name
        )));
    }

    let mut out = vec![PAD; size];
    out[0..NAME_LEN].copy_from_slice(&pack_name(&route.name, NAME_LEN)?);
    let rotated = rotate_right(&route.points);
    out[NAME_FIELD..NAME_FIELD + rotated.len()].copy_from_slice(&rotated);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_inverse() {
        let ids = vec![1, 2, 3, 4, 5];
        assert_eq!(rotate_left(&rotate_right(&ids)), ids);
        assert_eq!(rotate_right(&rotate_left(&ids)), ids);

        // Degenerate lengths
        assert_eq!(rotate_left(&[]), Vec::<u8>::new());
        assert_eq!(rotate_right(&[9]), vec![9]);
    }

    #[test]
    fn test_rotation_direction() {
        assert_eq!(rotate_right(&[1, 2, 3]), vec![3, 1, 2]);
        assert_eq!(rotate_left(&[3, 1, 2]), vec![1, 2, 3]);
    }

    #[test]
    fn test_roundtrip() {
        let route = Route {
            name: "HARBOR LOOP".to_string(),
            points: vec![4, 9, 2],
        };
        let bytes = encode(&route, 64, 16).unwrap();
        assert_eq!(bytes.len(), 64);
        // Stored right-rotated: last logical leg first
        assert_eq!(&bytes[16..19], &[2, 4, 9]);
        assert_eq!(bytes[19], PAD);

        let decoded = decode(&bytes, 16).unwrap().unwrap();
        assert_eq!(decoded, route);
    }

    #[test]
    fn test_empty_record() {
        assert_eq!(decode(&vec![PAD; 64], 16).unwrap(), None);

        // Name but no ids is still no route
        let mut bytes = vec![PAD; 64];
        bytes[0..4].copy_from_slice(b"NAME");
        assert_eq!(decode(&bytes, 16).unwrap(), None);
    }

    #[test]
    fn test_capacity_enforced() {
        let route = Route {
            name: "LONG".to_string(),
            points: (1..=17).collect(),
        };
        assert!(encode(&route, 64, 16).is_err());
    }

    #[test]
    fn test_sentinel_id_rejected() {
        let route = Route {
            name: "BAD".to_string(),
            points: vec![1, PAD],
        };
        assert!(encode(&route, 64, 16).is_err());
    }
}
