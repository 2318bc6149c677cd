// Per-model device memory maps
// Fixed addresses, counts and record sizes for every feature area.
// Tables are built once at startup and never mutated.

use lazy_static::lazy_static;
use std::fmt;

/// Supported device models
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceModel {
    Hx870,
    Hx890,
}

impl DeviceModel {
    pub const ALL: &'static [DeviceModel] = &[DeviceModel::Hx870, DeviceModel::Hx890];

    pub fn name(&self) -> &'static str {
        match self {
            DeviceModel::Hx870 => "HX870",
            DeviceModel::Hx890 => "HX890",
        }
    }
}

impl fmt::Display for DeviceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One array-of-records region: base address, slot count, bytes per slot
#[derive(Debug, Clone, Copy)]
pub struct RegionSpec {
    pub addr: u16,
    pub count: usize,
    pub size: usize,
}

impl RegionSpec {
    pub const fn new(addr: u16, count: usize, size: usize) -> Self {
        Self { addr, count, size }
    }

    /// Total bytes covered by the region
    pub fn len(&self) -> usize {
        self.count * self.size
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Absolute address of slot `index`
    pub fn slot(&self, index: usize) -> u16 {
        self.addr + (index * self.size) as u16
    }
}

/// An MMSI directory: parallel name and number arrays
///
/// Numbers are variable-density packed (5 bytes each plus one filler byte
/// after every third record), so the number region length is derived.
#[derive(Debug, Clone, Copy)]
pub struct MmsiRegion {
    pub names_addr: u16,
    pub numbers_addr: u16,
    pub count: usize,
}

impl MmsiRegion {
    pub const fn new(names_addr: u16, numbers_addr: u16, count: usize) -> Self {
        Self {
            names_addr,
            numbers_addr,
            count,
        }
    }

    pub fn names_len(&self) -> usize {
        self.count * 16
    }

    pub fn numbers_len(&self) -> usize {
        self.count * 5 + self.count / 3
    }
}

/// Value shape of one preference knob
#[derive(Debug, Clone, Copy)]
pub enum KnobKind {
    /// Plain integer in [min, max]
    Number { min: u8, max: u8 },
    /// Closed vocabulary; byte code = base + index
    Enum {
        values: &'static [&'static str],
        base: u8,
    },
    /// 0x00 / 0x01
    Boolean,
    /// One soft-key slot; key name mapped through the soft-key vocabulary
    SoftKey,
    /// Two controlled bits; unrelated bits preserved from the previous byte
    AutoIndividualReply,
}

/// One preference knob: a named single device byte
#[derive(Debug, Clone, Copy)]
pub struct KnobSpec {
    pub name: &'static str,
    pub addr: u16,
    pub kind: KnobKind,
}

impl KnobSpec {
    pub const fn new(name: &'static str, addr: u16, kind: KnobKind) -> Self {
        Self { name, addr, kind }
    }
}

const MULTI_WATCH: &[&str] = &["off", "dual", "triple"];
const SCAN_TYPE: &[&str] = &["memory", "priority"];
const BACKLIGHT_TIMER: &[&str] = &["off", "3s", "5s", "10s", "continuous"];
const SOFT_KEY_TIMER: &[&str] = &["3s", "5s", "7s", "10s", "15s"];

/// Everything the codecs and the session need to know about one model
#[derive(Debug, Clone)]
pub struct DeviceMemoryMap {
    pub model: DeviceModel,
    pub total_size: usize,
    pub magic: [u8; 2],
    /// Maximum transfer payload per protocol message
    pub chunk_size: usize,

    pub channel_groups: RegionSpec,
    pub channel_enabled_addr: u16,
    pub channel_flags: RegionSpec,
    pub channel_names: RegionSpec,
    /// None on models without a voice scrambler
    pub has_scrambler: bool,

    pub individual_mmsi: MmsiRegion,
    pub group_mmsi: MmsiRegion,

    /// None on models without an FM broadcast receiver
    pub fm_presets: Option<RegionSpec>,

    pub waypoints: RegionSpec,
    pub routes: RegionSpec,
    /// Waypoints per route
    pub route_capacity: usize,

    pub knobs: Vec<KnobSpec>,
    /// Number of soft-key codes this model's firmware understands
    pub soft_key_vocab: usize,
}

fn common_knobs(base: u16) -> Vec<KnobSpec> {
    vec![
        KnobSpec::new(
            "backlight_timer",
            base,
            KnobKind::Enum {
                values: BACKLIGHT_TIMER,
                base: 0,
            },
        ),
        KnobSpec::new("contrast", base + 1, KnobKind::Number { min: 0, max: 30 }),
        KnobSpec::new("key_beep", base + 2, KnobKind::Number { min: 0, max: 5 }),
        KnobSpec::new(
            "multi_watch",
            base + 3,
            KnobKind::Enum {
                values: MULTI_WATCH,
                base: 0,
            },
        ),
        KnobSpec::new(
            "scan_type",
            base + 4,
            KnobKind::Enum {
                values: SCAN_TYPE,
                base: 0,
            },
        ),
        KnobSpec::new("scan_resume", base + 5, KnobKind::Number { min: 1, max: 5 }),
        KnobSpec::new("weather_alert", base + 6, KnobKind::Boolean),
        KnobSpec::new(
            "soft_key_timer",
            base + 7,
            KnobKind::Enum {
                values: SOFT_KEY_TIMER,
                base: 0,
            },
        ),
        KnobSpec::new("soft_key_1", base + 8, KnobKind::SoftKey),
        KnobSpec::new("soft_key_2", base + 9, KnobKind::SoftKey),
        KnobSpec::new("soft_key_3", base + 10, KnobKind::SoftKey),
        KnobSpec::new("soft_key_4", base + 11, KnobKind::SoftKey),
        KnobSpec::new("soft_key_5", base + 12, KnobKind::SoftKey),
        KnobSpec::new("soft_key_6", base + 13, KnobKind::SoftKey),
        KnobSpec::new(
            "auto_individual_reply",
            base + 14,
            KnobKind::AutoIndividualReply,
        ),
    ]
}

lazy_static! {
    static ref HX870_MAP: DeviceMemoryMap = DeviceMemoryMap {
        model: DeviceModel::Hx870,
        total_size: 0x8000,
        magic: [0x03, 0x67],
        chunk_size: 0x20,
        channel_groups: RegionSpec::new(0x0040, 3, 16),
        channel_enabled_addr: 0x0120,
        channel_flags: RegionSpec::new(0x0600, 72, 4),
        channel_names: RegionSpec::new(0x0BA0, 72, 16),
        has_scrambler: false,
        individual_mmsi: MmsiRegion::new(0x2000, 0x2400, 60),
        group_mmsi: MmsiRegion::new(0x2600, 0x2800, 30),
        fm_presets: None,
        waypoints: RegionSpec::new(0x4300, 200, 32),
        routes: RegionSpec::new(0x5C00, 20, 64),
        route_capacity: 16,
        knobs: common_knobs(0x0010),
        soft_key_vocab: 10,
    };
    static ref HX890_MAP: DeviceMemoryMap = DeviceMemoryMap {
        model: DeviceModel::Hx890,
        total_size: 0x10000,
        magic: [0x01, 0x74],
        chunk_size: 0x20,
        channel_groups: RegionSpec::new(0x0040, 3, 16),
        channel_enabled_addr: 0x0120,
        channel_flags: RegionSpec::new(0x0700, 96, 4),
        channel_names: RegionSpec::new(0x1000, 96, 16),
        has_scrambler: true,
        individual_mmsi: MmsiRegion::new(0x4500, 0x4C00, 100),
        group_mmsi: MmsiRegion::new(0x5000, 0x5400, 50),
        fm_presets: Some(RegionSpec::new(0x0900, 20, 16)),
        waypoints: RegionSpec::new(0xD700, 250, 32),
        routes: RegionSpec::new(0xF680, 20, 64),
        route_capacity: 30,
        knobs: common_knobs(0x0010),
        soft_key_vocab: 12,
    };
}

/// Look up the immutable memory map for a model
pub fn memory_map_for(model: DeviceModel) -> &'static DeviceMemoryMap {
    match model {
        DeviceModel::Hx870 => &HX870_MAP,
        DeviceModel::Hx890 => &HX890_MAP,
    }
}
