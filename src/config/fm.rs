// FM preset section (models with a broadcast receiver only)

use super::{take, Config, RangeId, Result};
use crate::codec::fm::{self, FmPreset};
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::DeviceMemoryMap;
use std::collections::HashMap;

const RANGE: &str = "fm_presets";

pub(super) fn register(map: &DeviceMemoryMap, reader: &mut BatchReader) {
    if let Some(region) = map.fm_presets {
        reader.request(RANGE, region.addr, region.len());
    }
}

pub(super) fn decode(
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    let Some(region) = map.fm_presets else {
        return Ok(());
    };
    let bytes = take(ranges, RANGE)?;
    config.fm_presets.clear();
    for slot in 0..region.count {
        let record = &bytes[slot * region.size..(slot + 1) * region.size];
        if let Some(preset) = fm::decode(record)? {
            config.fm_presets.push(preset);
        }
    }
    Ok(())
}

pub(super) fn emit(config: &Config) -> Node {
    Node::sequence(
        config
            .fm_presets
            .iter()
            .map(|preset| {
                let mut entry = Node::mapping(vec![
                    ("name", Node::str(&preset.name)),
                    ("mhz", Node::str(preset.freq_text())),
                ]);
                if preset.active {
                    entry.push_entry("active", Node::bool(true));
                }
                entry.with_flow()
            })
            .collect(),
    )
}

pub(super) fn parse(
    map: &DeviceMemoryMap,
    node: &Node,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let capacity = map.fm_presets.map(|r| r.count).unwrap_or(0);
    let items = node.as_sequence()?;
    if items.len() > capacity {
        return Err(DocError::invalid(
            format!("{} presets exceed the device capacity of {}", items.len(), capacity),
            node.span(),
        ));
    }

    let mut presets = Vec::with_capacity(items.len());
    for item in items {
        let name_node = item
            .get("name")
            .ok_or_else(|| DocError::invalid("preset needs a name", item.span()))?;
        let name = name_node.as_str()?.to_string();
        if name.is_empty() || name.len() > fm::NAME_LEN {
            return Err(DocError::invalid(
                format!("preset name {:?} must be 1 to {} characters", name, fm::NAME_LEN),
                name_node.span(),
            ));
        }

        let freq_node = item
            .get("mhz")
            .ok_or_else(|| DocError::invalid("preset needs mhz", item.span()))?;
        let freq_dhz = FmPreset::parse_freq(&freq_node.scalar_text()?)
            .map_err(|err| DocError::invalid(err.to_string(), freq_node.span()))?;

        let active = match item.get("active") {
            Some(flag) => flag.as_bool()?,
            None => false,
        };
        presets.push(FmPreset {
            name,
            freq_dhz,
            active,
        });
    }
    draft.fm_presets = presets;
    Ok(())
}

pub(super) fn queue(
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    let Some(region) = map.fm_presets else {
        return Ok(());
    };
    // Presets are stored alphabetically
    let mut sorted: Vec<&FmPreset> = draft.fm_presets.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    let mut bytes = Vec::with_capacity(region.len());
    for preset in sorted {
        bytes.extend_from_slice(&fm::encode(preset)?);
    }
    bytes.resize(region.len(), 0xFF);
    writer.request(RANGE, region.addr, bytes);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::{memory_map_for, DeviceModel};

    fn preset(name: &str, freq_dhz: u16) -> FmPreset {
        FmPreset {
            name: name.to_string(),
            freq_dhz,
            active: false,
        }
    }

    #[test]
    fn test_queue_sorts_by_name() {
        let map = memory_map_for(DeviceModel::Hx890);
        let draft = Config {
            fm_presets: vec![preset("ZULU", 885), preset("ALPHA", 903)],
            ..Config::default()
        };
        let mut writer = BatchWriter::new();
        queue(map, &draft, &mut writer).unwrap();
        // First record on the wire is ALPHA
        assert_eq!(writer.pending_bytes(), map.fm_presets.unwrap().len());
    }

    #[test]
    fn test_decode_emit() {
        let map = memory_map_for(DeviceModel::Hx890);
        let region = map.fm_presets.unwrap();
        let mut bytes = vec![0xFF; region.len()];
        bytes[0..16].copy_from_slice(&fm::encode(&preset("KEXP", 903)).unwrap());

        let mut ranges = HashMap::new();
        ranges.insert(RANGE.to_string(), bytes);
        let mut config = Config::default();
        decode(map, &ranges, &mut config).unwrap();
        assert_eq!(config.fm_presets, vec![preset("KEXP", 903)]);

        let node = emit(&config);
        let item = &node.as_sequence().unwrap()[0];
        assert_eq!(item.get("mhz").unwrap().as_str().unwrap(), "90.3");
        assert!(item.get("active").is_none());
    }

    #[test]
    fn test_parse_accepts_float_and_string_frequencies() {
        let map = memory_map_for(DeviceModel::Hx890);
        let node = Node::sequence(vec![
            Node::mapping(vec![
                ("name", Node::str("A")),
                ("mhz", Node::float(88.5)),
            ]),
            Node::mapping(vec![
                ("name", Node::str("B")),
                ("mhz", Node::str("101")),
                ("active", Node::bool(true)),
            ]),
        ]);
        let mut draft = Config::default();
        parse(map, &node, &mut draft).unwrap();
        assert_eq!(draft.fm_presets[0].freq_dhz, 885);
        assert_eq!(draft.fm_presets[1].freq_dhz, 1010);
        assert!(draft.fm_presets[1].active);
    }

    #[test]
    fn test_parse_rejects_off_grid_frequency() {
        let map = memory_map_for(DeviceModel::Hx890);
        let node = Node::sequence(vec![Node::mapping(vec![
            ("name", Node::str("X")),
            ("mhz", Node::str("88.55")),
        ])]);
        let mut draft = Config::default();
        assert!(parse(map, &node, &mut draft).is_err());
    }
}
