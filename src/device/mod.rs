// Device memory access: live protocol, image backend, batch transfers

pub mod access;
pub mod batch;
pub mod image;
pub mod live;

pub use access::{DeviceAccess, DeviceError, ProgressFn, READY_TIMEOUT};
pub use batch::{BatchReader, BatchWriter, RangeId};
pub use image::ImageDevice;
pub use live::LiveDevice;
