// Preferences section
//
// Knobs live in one contiguous byte run; it is read whole and kept as
// the raw baseline so partial-bit knobs can preserve what they do not
// control.

use super::{take, Config, RangeId, Result};
use crate::codec::knob::{self, KnobValue};
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::{DeviceMemoryMap, KnobSpec};
use std::collections::HashMap;

const RANGE: &str = "preferences";

fn knob_run(map: &DeviceMemoryMap) -> (u16, usize) {
    let first = map.knobs.iter().map(|k| k.addr).min().unwrap_or(0);
    let last = map.knobs.iter().map(|k| k.addr).max().unwrap_or(0);
    (first, (last - first) as usize + 1)
}

fn spec_for<'a>(map: &'a DeviceMemoryMap, name: &str) -> Option<&'a KnobSpec> {
    map.knobs.iter().find(|k| k.name == name)
}

pub(super) fn register(map: &DeviceMemoryMap, reader: &mut BatchReader) {
    let (addr, len) = knob_run(map);
    reader.request(RANGE, addr, len);
}

pub(super) fn decode(
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    let bytes = take(ranges, RANGE)?;
    let (base, _) = knob_run(map);

    config.prefs.clear();
    config.knob_bytes.clear();
    for spec in &map.knobs {
        let byte = bytes[(spec.addr - base) as usize];
        config.knob_bytes.insert(spec.addr, byte);
        // Unprogrammed memory reads back 0xFF; leave those knobs out
        if byte == 0xFF {
            continue;
        }
        config
            .prefs
            .push((spec.name, knob::read(spec, byte, map.soft_key_vocab)?));
    }
    Ok(())
}

pub(super) fn emit(config: &Config) -> Node {
    let mut section = Node::mapping(vec![]);
    for (name, value) in &config.prefs {
        let node = match value {
            KnobValue::Number(n) => Node::int(*n as i64),
            KnobValue::Choice(s) | KnobValue::SoftKey(s) => Node::str(*s),
            KnobValue::Boolean(b) | KnobValue::AutoReply(b) => Node::bool(*b),
        };
        section.push_entry(name, node);
    }
    section
}

pub(super) fn parse(
    map: &DeviceMemoryMap,
    node: &Node,
    previous: &Config,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let mut prefs = Vec::new();
    for entry in node.as_mapping()? {
        let Some(spec) = spec_for(map, &entry.key) else {
            return Err(DocError::UnknownKey {
                key: entry.key.clone(),
                span: entry.key_span,
            });
        };
        let value = knob::parse(spec, &entry.value.scalar_text()?)
            .map_err(|err| DocError::invalid(err.to_string(), entry.value.span()))?;
        prefs.push((spec.name, value));
    }
    draft.prefs = prefs;
    // Raw bytes from the last read stay the write baseline
    draft.knob_bytes = previous.knob_bytes.clone();
    Ok(())
}

pub(super) fn queue(
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    for (name, value) in &draft.prefs {
        let Some(spec) = spec_for(map, name) else {
            continue;
        };
        let previous = draft.knob_bytes.get(&spec.addr).copied();
        let byte = knob::encode(spec, value, previous, map.soft_key_vocab)?;
        writer.request(*name, spec.addr, vec![byte]);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use crate::config::ConfigError;
    use crate::memmap::{memory_map_for, DeviceModel};

    fn read_config(map: &DeviceMemoryMap, bytes: Vec<u8>) -> Config {
        let mut ranges = HashMap::new();
        ranges.insert(RANGE.to_string(), bytes);
        let mut config = Config::default();
        decode(map, &ranges, &mut config).unwrap();
        config
    }

    fn plausible_bytes(map: &DeviceMemoryMap) -> Vec<u8> {
        let (base, len) = knob_run(map);
        let mut bytes = vec![0u8; len];
        for spec in &map.knobs {
            // Zero is valid for every knob kind except where min > 0
            if let crate::memmap::KnobKind::Number { min, .. } = spec.kind {
                bytes[(spec.addr - base) as usize] = min;
            }
        }
        bytes
    }

    #[test]
    fn test_decode_covers_every_knob() {
        let map = memory_map_for(DeviceModel::Hx890);
        let config = read_config(map, plausible_bytes(map));
        assert_eq!(config.prefs.len(), map.knobs.len());
        assert_eq!(config.knob_bytes.len(), map.knobs.len());
    }

    #[test]
    fn test_parse_and_queue() {
        let map = memory_map_for(DeviceModel::Hx890);
        let previous = read_config(map, plausible_bytes(map));

        let node = Node::mapping(vec![
            ("contrast", Node::int(15)),
            ("weather_alert", Node::bool(true)),
            ("soft_key_1", Node::str("compass")),
            ("auto_individual_reply", Node::bool(true)),
        ]);
        let mut draft = Config::default();
        parse(map, &node, &previous, &mut draft).unwrap();
        assert_eq!(draft.prefs.len(), 4);

        let mut writer = BatchWriter::new();
        queue(map, &draft, &mut writer).unwrap();
        // One byte per edited knob
        assert_eq!(writer.pending_bytes(), 4);
    }

    #[test]
    fn test_parse_rejects_unknown_knob() {
        let map = memory_map_for(DeviceModel::Hx890);
        let node = Node::mapping(vec![("warp_factor", Node::int(9))]);
        let mut draft = Config::default();
        let err = parse(map, &node, &Config::default(), &mut draft).unwrap_err();
        assert!(matches!(err, DocError::UnknownKey { ref key, .. } if key == "warp_factor"));
    }

    #[test]
    fn test_auto_reply_needs_baseline() {
        let map = memory_map_for(DeviceModel::Hx890);
        let node = Node::mapping(vec![("auto_individual_reply", Node::bool(true))]);

        // No prior read, so no raw byte to preserve bits from
        let mut draft = Config::default();
        parse(map, &node, &Config::default(), &mut draft).unwrap();
        let mut writer = BatchWriter::new();
        let err = queue(map, &draft, &mut writer).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Codec(CodecError::MissingBaseline)
        ));
    }

    #[test]
    fn test_out_of_range_value_carries_span() {
        let map = memory_map_for(DeviceModel::Hx890);
        let bad = Node::int(99).with_span(crate::doc::Span::new(7, 9));
        let node = Node::mapping(vec![("contrast", bad)]);
        let mut draft = Config::default();
        let err = parse(map, &node, &Config::default(), &mut draft).unwrap_err();
        assert_eq!(err.span(), crate::doc::Span::new(7, 9));
    }
}
