// Marine channel section
//
// The channel list is a read-mostly join of three regions: the enabled
// bitfield, the per-channel flag records and the name records. Edits
// are addressed by channel id; slots never move.

use super::{take, Config, RangeId, Result};
use crate::codec::channel::{self, ChannelFlags, ChannelId, Scrambler};
use crate::codec::{pack_name, unpack_name, PAD};
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::DeviceMemoryMap;
use std::collections::HashMap;
use tracing::warn;

const ENABLED: &str = "channel_enabled";
const FLAGS: &str = "channel_flags";
const NAMES: &str = "channel_names";

/// One channel slot as the user sees it
#[derive(Debug, Clone, PartialEq)]
pub struct MarineChannel {
    /// Slot index shared by all three regions
    pub index: usize,
    pub flags: ChannelFlags,
    pub name: String,
    pub enabled: bool,
}

fn bitfield_len(map: &DeviceMemoryMap) -> usize {
    (map.channel_flags.count + 7) / 8
}

pub(super) fn register(map: &DeviceMemoryMap, reader: &mut BatchReader) {
    reader.request(ENABLED, map.channel_enabled_addr, bitfield_len(map));
    reader.request(FLAGS, map.channel_flags.addr, map.channel_flags.len());
    reader.request(NAMES, map.channel_names.addr, map.channel_names.len());
}

pub(super) fn decode(
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    let enabled = take(ranges, ENABLED)?;
    let flags = take(ranges, FLAGS)?;
    let names = take(ranges, NAMES)?;

    config.channels.clear();
    let region = map.channel_flags;
    for slot in 0..region.count {
        let record = &flags[slot * region.size..(slot + 1) * region.size];
        if record.iter().all(|&b| b == PAD) {
            continue;
        }
        let name_size = map.channel_names.size;
        config.channels.push(MarineChannel {
            index: slot,
            flags: channel::decode_flags(record)?,
            name: unpack_name(&names[slot * name_size..(slot + 1) * name_size]),
            enabled: channel::is_enabled(enabled, slot),
        });
    }
    Ok(())
}

pub(super) fn emit(map: &DeviceMemoryMap, config: &Config) -> Node {
    Node::sequence(
        config
            .channels
            .iter()
            .map(|ch| {
                let mut entry = Node::mapping(vec![
                    ("id", Node::str(ch.flags.id.to_string())),
                    ("name", Node::str(&ch.name)),
                    ("enabled", Node::bool(ch.enabled)),
                    ("dsc", Node::bool(ch.flags.dsc)),
                ]);
                if map.has_scrambler {
                    if let Some(s) = ch.flags.scrambler {
                        entry.push_entry(
                            "scrambler",
                            Node::mapping(vec![
                                ("type", Node::int(s.code_space() as i64)),
                                ("code", Node::int(s.code as i64)),
                            ])
                            .with_flow(),
                        );
                    }
                }
                entry.with_flow()
            })
            .collect(),
    )
}

fn parse_id(node: &Node) -> std::result::Result<ChannelId, DocError> {
    let text = match node.as_int() {
        // Unquoted two-digit ids arrive as integers
        Ok(n) if (0..100).contains(&n) => format!("{:02}", n),
        Ok(n) => n.to_string(),
        Err(_) => node.scalar_text()?,
    };
    ChannelId::parse(&text).map_err(|err| DocError::invalid(err.to_string(), node.span()))
}

fn parse_scrambler(node: &Node) -> std::result::Result<Scrambler, DocError> {
    let type_node = node
        .get("type")
        .ok_or_else(|| DocError::invalid("scrambler needs a type", node.span()))?;
    let type32 = match type_node.as_int()? {
        4 => false,
        32 => true,
        other => {
            return Err(DocError::invalid(
                format!("scrambler type must be 4 or 32, got {}", other),
                type_node.span(),
            ))
        }
    };
    let code_node = node
        .get("code")
        .ok_or_else(|| DocError::invalid("scrambler needs a code", node.span()))?;
    let code = code_node.as_int()?;
    let scrambler = Scrambler {
        type32,
        code: u8::try_from(code)
            .map_err(|_| DocError::invalid("scrambler code out of range", code_node.span()))?,
    };
    if scrambler.code >= scrambler.code_space() {
        return Err(DocError::invalid(
            format!(
                "scrambler code {} out of range for type {}",
                scrambler.code,
                scrambler.code_space()
            ),
            code_node.span(),
        ));
    }
    Ok(scrambler)
}

pub(super) fn parse(
    map: &DeviceMemoryMap,
    node: &Node,
    previous: &Config,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    // Start from the device's channel table; the document edits it
    let mut channels = previous.channels.clone();

    for item in node.as_sequence()? {
        let id_node = item
            .get("id")
            .ok_or_else(|| DocError::invalid("channel entry needs an id", item.span()))?;
        let id = parse_id(id_node)?;

        let Some(ch) = channels.iter_mut().find(|ch| ch.flags.id == id) else {
            // Unknown channel: drop the edit, keep going
            warn!(%id, "no such channel on this device, skipping");
            continue;
        };

        if let Some(name) = item.get("name") {
            let name = name.as_str()?;
            if name.len() > channel::NAME_LEN {
                return Err(DocError::invalid(
                    format!("channel name {:?} exceeds {} characters", name, channel::NAME_LEN),
                    item.get("name").unwrap().span(),
                ));
            }
            ch.name = name.to_string();
        }
        if let Some(enabled) = item.get("enabled") {
            ch.enabled = enabled.as_bool()?;
        }
        if let Some(dsc) = item.get("dsc") {
            ch.flags.dsc = dsc.as_bool()?;
        }
        if let Some(scrambler) = item.get("scrambler") {
            if !map.has_scrambler {
                warn!(%id, "this model has no scrambler, ignoring");
            } else if scrambler.is_scalar() {
                ch.flags.scrambler = None;
            } else {
                ch.flags.scrambler = Some(parse_scrambler(scrambler)?);
            }
        }
    }

    draft.channels = channels;
    Ok(())
}

pub(super) fn queue(
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    let mut enabled = vec![0u8; bitfield_len(map)];
    let mut flags = vec![PAD; map.channel_flags.len()];
    let mut names = vec![PAD; map.channel_names.len()];

    let flag_size = map.channel_flags.size;
    let name_size = map.channel_names.size;
    for ch in &draft.channels {
        channel::set_enabled(&mut enabled, ch.index, ch.enabled);
        flags[ch.index * flag_size..(ch.index + 1) * flag_size]
            .copy_from_slice(&channel::encode_flags(&ch.flags)?);
        let packed = pack_name(&ch.name, channel::NAME_LEN)?;
        names[ch.index * name_size..ch.index * name_size + packed.len()]
            .copy_from_slice(&packed);
    }

    writer.request(ENABLED, map.channel_enabled_addr, enabled);
    writer.request(FLAGS, map.channel_flags.addr, flags);
    writer.request(NAMES, map.channel_names.addr, names);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::{memory_map_for, DeviceModel};

    fn ch16(enabled: bool) -> MarineChannel {
        MarineChannel {
            index: 0,
            flags: ChannelFlags {
                id: ChannelId::plain(16),
                dsc: true,
                scrambler: None,
            },
            name: "DISTRESS".to_string(),
            enabled,
        }
    }

    /// Regions exactly as queue() lays them out
    fn device_ranges(map: &DeviceMemoryMap, channels: &[MarineChannel]) -> HashMap<RangeId, Vec<u8>> {
        let mut ranges = HashMap::new();
        let mut enabled = vec![0u8; bitfield_len(map)];
        let mut flags = vec![PAD; map.channel_flags.len()];
        let mut names = vec![PAD; map.channel_names.len()];
        for ch in channels {
            channel::set_enabled(&mut enabled, ch.index, ch.enabled);
            flags[ch.index * 4..(ch.index + 1) * 4]
                .copy_from_slice(&channel::encode_flags(&ch.flags).unwrap());
            let packed = pack_name(&ch.name, channel::NAME_LEN).unwrap();
            names[ch.index * 16..ch.index * 16 + 15].copy_from_slice(&packed);
        }
        ranges.insert(ENABLED.to_string(), enabled);
        ranges.insert(FLAGS.to_string(), flags);
        ranges.insert(NAMES.to_string(), names);
        ranges
    }

    #[test]
    fn test_decode_joins_three_regions() {
        let map = memory_map_for(DeviceModel::Hx890);
        let ranges = device_ranges(map, &[ch16(true)]);
        let mut config = Config::default();
        decode(map, &ranges, &mut config).unwrap();
        assert_eq!(config.channels, vec![ch16(true)]);
    }

    #[test]
    fn test_parse_edits_by_id() {
        let map = memory_map_for(DeviceModel::Hx890);
        let previous = Config {
            channels: vec![ch16(true)],
            ..Config::default()
        };
        let node = Node::sequence(vec![Node::mapping(vec![
            ("id", Node::str("16")),
            ("enabled", Node::bool(false)),
            ("name", Node::str("CALLING")),
        ])]);
        let mut draft = Config::default();
        parse(map, &node, &previous, &mut draft).unwrap();
        assert!(!draft.channels[0].enabled);
        assert_eq!(draft.channels[0].name, "CALLING");
        // Untouched fields survive
        assert!(draft.channels[0].flags.dsc);
    }

    #[test]
    fn test_parse_skips_unknown_id() {
        let map = memory_map_for(DeviceModel::Hx890);
        let previous = Config {
            channels: vec![ch16(true)],
            ..Config::default()
        };
        let node = Node::sequence(vec![Node::mapping(vec![
            ("id", Node::str("88")),
            ("enabled", Node::bool(false)),
        ])]);
        let mut draft = Config::default();
        parse(map, &node, &previous, &mut draft).unwrap();
        assert_eq!(draft.channels, previous.channels);
    }

    #[test]
    fn test_parse_unquoted_integer_id() {
        let node = Node::int(16);
        assert_eq!(parse_id(&node).unwrap(), ChannelId::plain(16));
        // Four digits keep their prefix meaning
        assert_eq!(
            parse_id(&Node::int(1078)).unwrap(),
            ChannelId::parse("1078").unwrap()
        );
    }

    #[test]
    fn test_parse_scrambler_constraints() {
        let good = Node::mapping(vec![("type", Node::int(4)), ("code", Node::int(3))]);
        assert_eq!(
            parse_scrambler(&good).unwrap(),
            Scrambler {
                type32: false,
                code: 3
            }
        );

        let bad_code = Node::mapping(vec![("type", Node::int(4)), ("code", Node::int(4))]);
        assert!(parse_scrambler(&bad_code).is_err());
        let bad_type = Node::mapping(vec![("type", Node::int(8)), ("code", Node::int(0))]);
        assert!(parse_scrambler(&bad_type).is_err());
    }

    #[test]
    fn test_scrambler_ignored_without_hardware() {
        let map = memory_map_for(DeviceModel::Hx870);
        let previous = Config {
            channels: vec![ch16(true)],
            ..Config::default()
        };
        let node = Node::sequence(vec![Node::mapping(vec![
            ("id", Node::str("16")),
            (
                "scrambler",
                Node::mapping(vec![("type", Node::int(4)), ("code", Node::int(1))]),
            ),
        ])]);
        let mut draft = Config::default();
        parse(map, &node, &previous, &mut draft).unwrap();
        assert_eq!(draft.channels[0].flags.scrambler, None);
    }
}
