// DSC directory sections (individual and group)
//
// Both directories share one shape; only the region and the document
// key differ.

use super::{take, Config, RangeId, Result};
use crate::codec::mmsi::{self, MmsiEntry};
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::{DeviceMemoryMap, MmsiRegion};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Kind {
    Individual,
    Group,
}

impl Kind {
    fn region(self, map: &DeviceMemoryMap) -> MmsiRegion {
        match self {
            Kind::Individual => map.individual_mmsi,
            Kind::Group => map.group_mmsi,
        }
    }

    fn names_range(self) -> &'static str {
        match self {
            Kind::Individual => "individual_names",
            Kind::Group => "group_names",
        }
    }

    fn numbers_range(self) -> &'static str {
        match self {
            Kind::Individual => "individual_numbers",
            Kind::Group => "group_numbers",
        }
    }

    fn entries(self, config: &Config) -> &Vec<MmsiEntry> {
        match self {
            Kind::Individual => &config.individual_directory,
            Kind::Group => &config.group_directory,
        }
    }

    fn entries_mut(self, config: &mut Config) -> &mut Vec<MmsiEntry> {
        match self {
            Kind::Individual => &mut config.individual_directory,
            Kind::Group => &mut config.group_directory,
        }
    }
}

pub(super) fn register(kind: Kind, map: &DeviceMemoryMap, reader: &mut BatchReader) {
    let region = kind.region(map);
    reader.request(kind.names_range(), region.names_addr, region.names_len());
    reader.request(kind.numbers_range(), region.numbers_addr, region.numbers_len());
}

pub(super) fn decode(
    kind: Kind,
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    let region = kind.region(map);
    let names = take(ranges, kind.names_range())?;
    let numbers = take(ranges, kind.numbers_range())?;
    *kind.entries_mut(config) = mmsi::decode_directory(names, numbers, &region)?;
    Ok(())
}

pub(super) fn emit(kind: Kind, config: &Config) -> Node {
    Node::sequence(
        kind.entries(config)
            .iter()
            .map(|entry| {
                Node::mapping(vec![
                    ("name", Node::str(&entry.name)),
                    ("mmsi", Node::str(&entry.mmsi)),
                ])
                .with_flow()
            })
            .collect(),
    )
}

pub(super) fn parse(
    kind: Kind,
    map: &DeviceMemoryMap,
    node: &Node,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let region = kind.region(map);
    let items = node.as_sequence()?;
    if items.len() > region.count {
        return Err(DocError::invalid(
            format!(
                "{} entries exceed the directory capacity of {}",
                items.len(),
                region.count
            ),
            node.span(),
        ));
    }

    let mut entries: Vec<MmsiEntry> = Vec::with_capacity(items.len());
    for item in items {
        let name_node = item
            .get("name")
            .ok_or_else(|| DocError::invalid("directory entry needs a name", item.span()))?;
        let name = name_node.as_str()?.to_string();
        if name.len() > mmsi::NAME_LEN {
            return Err(DocError::invalid(
                format!(
                    "Name {:?} is longer than {} characters",
                    name,
                    mmsi::NAME_LEN
                ),
                name_node.span(),
            ));
        }
        let number_node = item
            .get("mmsi")
            .ok_or_else(|| DocError::invalid("directory entry needs an mmsi", item.span()))?;
        // An unquoted number drops its leading zero upstream; restore it
        let mmsi_text = number_node.scalar_text()?;
        let mmsi = match number_node.as_str() {
            Ok(text) => text.to_string(),
            Err(_) => format!("{:0>9}", mmsi_text),
        };
        if mmsi.len() != 9 || !mmsi.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DocError::invalid(
                format!("MMSI {:?} is not nine decimal digits", mmsi_text),
                number_node.span(),
            ));
        }
        if entries.iter().any(|prev| prev.mmsi == mmsi) {
            return Err(DocError::Duplicate {
                what: "MMSI number",
                value: mmsi,
                span: number_node.span(),
            });
        }
        entries.push(MmsiEntry { name, mmsi });
    }
    *kind.entries_mut(draft) = entries;
    Ok(())
}

pub(super) fn queue(
    kind: Kind,
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    let region = kind.region(map);
    let (names, numbers) = mmsi::encode_directory(kind.entries(draft), &region)?;
    writer.request(kind.names_range(), region.names_addr, names);
    writer.request(kind.numbers_range(), region.numbers_addr, numbers);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::{memory_map_for, DeviceModel};

    fn entries() -> Vec<MmsiEntry> {
        vec![
            MmsiEntry {
                name: "Alpha".to_string(),
                mmsi: "123456789".to_string(),
            },
            MmsiEntry {
                name: "Bravo".to_string(),
                mmsi: "987654321".to_string(),
            },
        ]
    }

    #[test]
    fn test_register_both_arrays() {
        let map = memory_map_for(DeviceModel::Hx890);
        let mut reader = BatchReader::new();
        register(Kind::Individual, map, &mut reader);
        assert!(!reader.is_empty());
    }

    #[test]
    fn test_decode_and_emit() {
        let map = memory_map_for(DeviceModel::Hx890);
        let region = map.individual_mmsi;
        let (names, numbers) = mmsi::encode_directory(&entries(), &region).unwrap();

        let mut ranges = HashMap::new();
        ranges.insert("individual_names".to_string(), names);
        ranges.insert("individual_numbers".to_string(), numbers);

        let mut config = Config::default();
        decode(Kind::Individual, map, &ranges, &mut config).unwrap();
        assert_eq!(config.individual_directory, entries());
        assert!(config.group_directory.is_empty());

        let node = emit(Kind::Individual, &config);
        let items = node.as_sequence().unwrap();
        assert_eq!(items[1].get("mmsi").unwrap().as_str().unwrap(), "987654321");
    }

    #[test]
    fn test_parse_keeps_leading_zeros() {
        let map = memory_map_for(DeviceModel::Hx890);
        // An unquoted number loses its leading zero upstream
        let node = Node::sequence(vec![Node::mapping(vec![
            ("name", Node::str("Dinghy")),
            ("mmsi", Node::int(36612345)),
        ])]);
        let mut draft = Config::default();
        parse(Kind::Group, map, &node, &mut draft).unwrap();
        assert_eq!(draft.group_directory[0].mmsi, "036612345");
    }

    #[test]
    fn test_parse_rejects_long_name() {
        let map = memory_map_for(DeviceModel::Hx890);
        // 18 characters, two past the record's name field
        let node = Node::sequence(vec![Node::mapping(vec![
            ("name", Node::str("COASTGUARD STATION")),
            ("mmsi", Node::str("003669999")),
        ])]);
        let mut draft = Config::default();
        let err = parse(Kind::Individual, map, &node, &mut draft).unwrap_err();
        assert!(matches!(err, DocError::Invalid { .. }));
        assert!(draft.individual_directory.is_empty());
    }

    #[test]
    fn test_parse_duplicate_number() {
        let map = memory_map_for(DeviceModel::Hx890);
        let node = Node::sequence(vec![
            Node::mapping(vec![
                ("name", Node::str("A")),
                ("mmsi", Node::str("123456789")),
            ]),
            Node::mapping(vec![
                ("name", Node::str("B")),
                ("mmsi", Node::str("123456789")),
            ]),
        ]);
        let mut draft = Config::default();
        let err = parse(Kind::Individual, map, &node, &mut draft).unwrap_err();
        assert!(matches!(err, DocError::Duplicate { .. }));
    }

    #[test]
    fn test_parse_rejects_overflow() {
        let map = memory_map_for(DeviceModel::Hx870);
        let many: Vec<Node> = (0..=map.group_mmsi.count)
            .map(|i| {
                Node::mapping(vec![
                    ("name", Node::str(format!("S{}", i))),
                    ("mmsi", Node::str(format!("{:09}", i))),
                ])
            })
            .collect();
        let mut draft = Config::default();
        assert!(parse(Kind::Group, map, &Node::sequence(many), &mut draft).is_err());
    }
}
