// Channel group section

use super::{take, Config, RangeId, Result};
use crate::codec::group::{self, ChannelGroup};
use crate::codec::PAD;
use crate::device::{BatchReader, BatchWriter};
use crate::doc::{DocError, Node};
use crate::memmap::DeviceMemoryMap;
use std::collections::HashMap;

const RANGE: &str = "channel_groups";

pub(super) fn register(map: &DeviceMemoryMap, reader: &mut BatchReader) {
    let region = map.channel_groups;
    reader.request(RANGE, region.addr, region.len());
}

pub(super) fn decode(
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
    config: &mut Config,
) -> Result<()> {
    let bytes = take(ranges, RANGE)?;
    let region = map.channel_groups;
    config.groups.clear();
    for slot in 0..region.count {
        let record = &bytes[slot * region.size..(slot + 1) * region.size];
        if let Some(group) = group::decode(record)? {
            config.groups.push(group);
        }
    }
    Ok(())
}

pub(super) fn emit(config: &Config) -> Node {
    Node::sequence(
        config
            .groups
            .iter()
            .map(|g| {
                Node::mapping(vec![
                    ("name", Node::str(&g.name)),
                    ("enabled", Node::bool(g.enabled)),
                    ("dsc", Node::bool(g.dsc)),
                    ("atis", Node::bool(g.atis)),
                    ("model", Node::str(&g.model_name)),
                ])
            })
            .collect(),
    )
}

pub(super) fn parse(
    node: &Node,
    previous: &Config,
    draft: &mut Config,
) -> std::result::Result<(), DocError> {
    let mut groups = Vec::new();
    for (index, item) in node.as_sequence()?.iter().enumerate() {
        let name_node = item
            .get("name")
            .ok_or_else(|| DocError::invalid("group needs a name", item.span()))?;
        let name = name_node.as_str()?.to_string();
        if name.len() > group::NAME_LEN {
            return Err(DocError::invalid(
                format!(
                    "Group name {:?} is longer than {} characters",
                    name,
                    group::NAME_LEN
                ),
                name_node.span(),
            ));
        }

        let model_name = match item.get("model") {
            Some(model) => {
                let text = model.as_str()?;
                if text.len() > group::MODEL_NAME_LEN {
                    return Err(DocError::invalid(
                        format!(
                            "Model name {:?} is longer than {} characters",
                            text,
                            group::MODEL_NAME_LEN
                        ),
                        model.span(),
                    ));
                }
                text.to_string()
            }
            // Omitted model keeps what the device had
            None => previous
                .groups
                .iter()
                .find(|g| g.name == name)
                .or_else(|| previous.groups.get(index))
                .map(|g| g.model_name.clone())
                .unwrap_or_default(),
        };

        let flag = |key: &str| -> std::result::Result<bool, DocError> {
            item.get(key).map(|n| n.as_bool()).transpose().map(|b| b.unwrap_or(false))
        };
        groups.push(ChannelGroup {
            name,
            enabled: flag("enabled")?,
            dsc: flag("dsc")?,
            atis: flag("atis")?,
            model_name,
        });
    }
    draft.groups = groups;
    Ok(())
}

pub(super) fn queue(
    map: &DeviceMemoryMap,
    draft: &Config,
    writer: &mut BatchWriter,
) -> Result<()> {
    let region = map.channel_groups;
    if draft.groups.len() > region.count {
        return Err(crate::codec::CodecError::OutOfRange {
            what: "channel groups",
            value: draft.groups.len() as i64,
            min: 0,
            max: region.count as i64,
        }
        .into());
    }
    let mut bytes = vec![PAD; region.len()];
    for (slot, group) in draft.groups.iter().enumerate() {
        bytes[slot * region.size..(slot + 1) * region.size]
            .copy_from_slice(&group::encode(group)?);
    }
    writer.request(RANGE, region.addr, bytes);
    Ok(())
}
