// Device memory maps and flat memory images

pub mod image;
pub mod map;

pub use image::{ImageError, MemoryImage};
pub use map::{memory_map_for, DeviceMemoryMap, DeviceModel, KnobKind, KnobSpec, MmsiRegion, RegionSpec};
