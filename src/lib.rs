// HXSYNC: configuration memory sync for Standard Horizon HX-series
// handheld marine radios (HX870/HX890), over CP-mode serial or against
// a captured DAT memory image.

pub mod codec;
pub mod config;
pub mod device;
pub mod doc;
pub mod memmap;
pub mod proto;
pub mod serial;
pub mod session;

// Re-export commonly used types
pub use config::{Config, Module};
pub use device::{BatchReader, BatchWriter, DeviceAccess, ImageDevice, LiveDevice, ProgressFn};
pub use memmap::{memory_map_for, DeviceModel, MemoryImage};
pub use serial::{list_ports, SerialConfig, SerialPort};
pub use session::{Session, SessionError, SessionState};

/// HXSYNC version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
