// Config-module layer
//
// Each top-level document section maps to one module. Every module
// implements the same four operations: register the device ranges it
// needs, decode those ranges into the config snapshot, emit its section
// of the document tree, and parse an edited section back, queueing the
// resulting writes. Dispatch is a plain match over the closed Module
// enum.

mod channels;
mod directory;
mod fm;
mod groups;
mod nav;
mod prefs;

pub use channels::MarineChannel;

use crate::codec::knob::KnobValue;
use crate::codec::mmsi::MmsiEntry;
use crate::codec::route::Route;
use crate::codec::waypoint::Waypoint;
use crate::codec::CodecError;
use crate::codec::{fm::FmPreset, group::ChannelGroup};
use crate::device::{BatchReader, BatchWriter, RangeId};
use crate::doc::{DocError, Node};
use crate::memmap::DeviceMemoryMap;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Document error: {0}")]
    Doc(#[from] DocError),

    #[error("Range {0:?} missing from read results")]
    MissingRange(RangeId),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Everything read off the device, replaced wholesale per read cycle
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub groups: Vec<ChannelGroup>,
    pub channels: Vec<MarineChannel>,
    pub individual_directory: Vec<MmsiEntry>,
    pub group_directory: Vec<MmsiEntry>,
    pub waypoints: Vec<Waypoint>,
    pub routes: Vec<Route>,
    pub fm_presets: Vec<FmPreset>,
    /// Knob values in memory-map order
    pub prefs: Vec<(&'static str, KnobValue)>,
    /// Raw knob bytes by address, the baseline for partial-bit writes
    pub knob_bytes: HashMap<u16, u8>,
}

/// The closed set of config modules, one per document section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Module {
    ChannelGroups,
    Channels,
    IndividualDirectory,
    GroupDirectory,
    Waypoints,
    Routes,
    FmPresets,
    Preferences,
}

impl Module {
    /// All modules in processing order; waypoints come before routes so
    /// route legs can resolve against the freshly parsed waypoint list.
    pub const ALL: &'static [Module] = &[
        Module::ChannelGroups,
        Module::Channels,
        Module::IndividualDirectory,
        Module::GroupDirectory,
        Module::Waypoints,
        Module::Routes,
        Module::FmPresets,
        Module::Preferences,
    ];

    /// Navigation data only
    pub const NAV: &'static [Module] = &[Module::Waypoints, Module::Routes];

    /// DSC directories only
    pub const MMSI: &'static [Module] = &[Module::IndividualDirectory, Module::GroupDirectory];

    /// Top-level document key for this module's section
    pub fn key(&self) -> &'static str {
        match self {
            Module::ChannelGroups => "channel_groups",
            Module::Channels => "channels",
            Module::IndividualDirectory => "individual_directory",
            Module::GroupDirectory => "group_directory",
            Module::Waypoints => "waypoints",
            Module::Routes => "routes",
            Module::FmPresets => "fm_presets",
            Module::Preferences => "preferences",
        }
    }

    pub fn from_key(key: &str) -> Option<Module> {
        Module::ALL.iter().copied().find(|m| m.key() == key)
    }

    /// True when the model behind `map` has this module's hardware
    pub fn supported(&self, map: &DeviceMemoryMap) -> bool {
        match self {
            Module::FmPresets => map.fm_presets.is_some(),
            _ => true,
        }
    }

    /// Queue the device reads this module needs
    pub fn register_ranges(&self, map: &DeviceMemoryMap, reader: &mut BatchReader) {
        match self {
            Module::ChannelGroups => groups::register(map, reader),
            Module::Channels => channels::register(map, reader),
            Module::IndividualDirectory | Module::GroupDirectory => {
                directory::register(self.directory_kind(), map, reader)
            }
            Module::Waypoints | Module::Routes => nav::register(*self, map, reader),
            Module::FmPresets => fm::register(map, reader),
            Module::Preferences => prefs::register(map, reader),
        }
    }

    /// Decode this module's ranges into the snapshot
    pub fn decode(
        &self,
        map: &DeviceMemoryMap,
        ranges: &HashMap<RangeId, Vec<u8>>,
        config: &mut Config,
    ) -> Result<()> {
        match self {
            Module::ChannelGroups => groups::decode(map, ranges, config),
            Module::Channels => channels::decode(map, ranges, config),
            Module::IndividualDirectory | Module::GroupDirectory => {
                directory::decode(self.directory_kind(), map, ranges, config)
            }
            Module::Waypoints | Module::Routes => nav::decode(*self, map, ranges, config),
            Module::FmPresets => fm::decode(map, ranges, config),
            Module::Preferences => prefs::decode(map, ranges, config),
        }
    }

    /// Emit this module's document section; None when the model lacks it
    pub fn emit(&self, map: &DeviceMemoryMap, config: &Config) -> Option<Node> {
        if !self.supported(map) {
            return None;
        }
        Some(match self {
            Module::ChannelGroups => groups::emit(config),
            Module::Channels => channels::emit(map, config),
            Module::IndividualDirectory | Module::GroupDirectory => {
                directory::emit(self.directory_kind(), config)
            }
            Module::Waypoints | Module::Routes => nav::emit(*self, config),
            Module::FmPresets => fm::emit(config),
            Module::Preferences => prefs::emit(config),
        })
    }

    /// Parse this module's edited section into the draft snapshot
    ///
    /// `previous` is the last-read snapshot, consulted for identifier
    /// stability and for values the document omits.
    pub fn parse(
        &self,
        map: &DeviceMemoryMap,
        node: &Node,
        previous: &Config,
        draft: &mut Config,
    ) -> std::result::Result<(), DocError> {
        if !self.supported(map) {
            return Err(DocError::Unsupported {
                feature: self.key().to_string(),
                span: node.span(),
            });
        }
        match self {
            Module::ChannelGroups => groups::parse(node, previous, draft),
            Module::Channels => channels::parse(map, node, previous, draft),
            Module::IndividualDirectory | Module::GroupDirectory => {
                directory::parse(self.directory_kind(), map, node, draft)
            }
            Module::Waypoints | Module::Routes => nav::parse(*self, map, node, previous, draft),
            Module::FmPresets => fm::parse(map, node, draft),
            Module::Preferences => prefs::parse(map, node, previous, draft),
        }
    }

    /// Queue the writes that push this module's draft to the device
    pub fn queue_writes(
        &self,
        map: &DeviceMemoryMap,
        draft: &Config,
        writer: &mut BatchWriter,
    ) -> Result<()> {
        match self {
            Module::ChannelGroups => groups::queue(map, draft, writer),
            Module::Channels => channels::queue(map, draft, writer),
            Module::IndividualDirectory | Module::GroupDirectory => {
                directory::queue(self.directory_kind(), map, draft, writer)
            }
            Module::Waypoints | Module::Routes => nav::queue(*self, map, draft, writer),
            Module::FmPresets => fm::queue(map, draft, writer),
            Module::Preferences => prefs::queue(map, draft, writer),
        }
    }

    fn directory_kind(&self) -> directory::Kind {
        match self {
            Module::IndividualDirectory => directory::Kind::Individual,
            Module::GroupDirectory => directory::Kind::Group,
            _ => unreachable!("not a directory module"),
        }
    }
}

/// Fetch one named range out of batch-read results
pub(crate) fn take<'a>(ranges: &'a HashMap<RangeId, Vec<u8>>, id: &str) -> Result<&'a [u8]> {
    ranges
        .get(id)
        .map(Vec::as_slice)
        .ok_or_else(|| ConfigError::MissingRange(id.to_string()))
}

/// Decode batch-read results for `modules` into a fresh snapshot
pub fn decode_modules(
    modules: &[Module],
    map: &DeviceMemoryMap,
    ranges: &HashMap<RangeId, Vec<u8>>,
) -> Result<Config> {
    let mut config = Config::default();
    for module in modules {
        if module.supported(map) {
            module.decode(map, ranges, &mut config)?;
        }
    }
    Ok(config)
}

/// Emit a full document for `modules`, in their canonical order
pub fn emit_document(modules: &[Module], map: &DeviceMemoryMap, config: &Config) -> Node {
    let mut doc = Node::mapping(vec![]);
    for module in modules {
        if let Some(mut section) = module.emit(map, config) {
            section.blank_line_before = true;
            doc.push_entry(module.key(), section);
        }
    }
    doc
}

/// Parse a full edited document against the previous snapshot
///
/// Validation problems across all sections are collected, not
/// short-circuited, so an editor can highlight every offending span.
pub fn parse_document(
    modules: &[Module],
    map: &DeviceMemoryMap,
    doc: &Node,
    previous: &Config,
) -> std::result::Result<Config, Vec<DocError>> {
    // Sections absent from the document keep the last-read state, so a
    // save rewrites them unchanged instead of erasing them
    let mut draft = previous.clone();
    let mut errors = Vec::new();

    let entries = match doc.as_mapping() {
        Ok(entries) => entries,
        Err(err) => return Err(vec![err]),
    };
    for entry in entries {
        match Module::from_key(&entry.key) {
            Some(module) if modules.contains(&module) => {}
            Some(_) | None => {
                errors.push(DocError::UnknownKey {
                    key: entry.key.clone(),
                    span: entry.key_span,
                });
            }
        }
    }

    // Canonical order, not document order: waypoints before routes
    for module in modules {
        let Some(section) = doc.get(module.key()) else {
            continue;
        };
        if let Err(err) = module.parse(map, section, previous, &mut draft) {
            errors.push(err);
        }
    }

    if errors.is_empty() {
        Ok(draft)
    } else {
        Err(errors)
    }
}
