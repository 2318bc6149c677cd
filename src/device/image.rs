// Image-backed device: operates directly on a captured memory image
// Synchronous under the hood; the readiness/messaging contract does not
// apply and calling into it is a programming error.

use super::access::{DeviceAccess, DeviceError, ProgressFn, Result};
use crate::memmap::{memory_map_for, DeviceMemoryMap, MemoryImage};
use std::time::Duration;

/// A "device" that is just a flat memory image
pub struct ImageDevice {
    image: MemoryImage,
}

impl ImageDevice {
    pub fn new(image: MemoryImage) -> Self {
        Self { image }
    }

    /// Borrow the backing image
    pub fn image(&self) -> &MemoryImage {
        &self.image
    }

    /// Take the backing image back, e.g. to save it to a file
    pub fn into_image(self) -> MemoryImage {
        self.image
    }
}

impl DeviceAccess for ImageDevice {
    fn memory_map(&self) -> &'static DeviceMemoryMap {
        memory_map_for(self.image.model())
    }

    async fn read_memory(
        &mut self,
        addr: u16,
        len: usize,
        progress: Option<&ProgressFn>,
    ) -> Result<Vec<u8>> {
        let bytes = self.image.get(addr as usize, len)?.to_vec();
        if let Some(cb) = progress {
            cb(len, len);
        }
        Ok(bytes)
    }

    async fn write_memory(
        &mut self,
        addr: u16,
        bytes: &[u8],
        progress: Option<&ProgressFn>,
    ) -> Result<()> {
        self.image.set(addr as usize, bytes)?;
        if let Some(cb) = progress {
            cb(bytes.len(), bytes.len());
        }
        Ok(())
    }

    async fn wait_ready(&mut self, _timeout: Duration) -> Result<()> {
        Err(DeviceError::Unsupported("wait_ready on image backend"))
    }

    async fn read_gps_log(&mut self, _progress: Option<&ProgressFn>) -> Result<Vec<u8>> {
        Err(DeviceError::Unsupported("read_gps_log on image backend"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memmap::DeviceModel;

    #[tokio::test]
    async fn test_image_read_write() {
        let mut dev = ImageDevice::new(MemoryImage::blank(DeviceModel::Hx870));

        dev.write_memory(0x4300, &[1, 2, 3, 4], None).await.unwrap();
        let data = dev.read_memory(0x4300, 4, None).await.unwrap();
        assert_eq!(data, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_out_of_bounds_read() {
        let mut dev = ImageDevice::new(MemoryImage::blank(DeviceModel::Hx870));
        let err = dev.read_memory(0x7FFF, 16, None).await.unwrap_err();
        assert!(matches!(err, DeviceError::Image(_)));
    }

    #[tokio::test]
    async fn test_protocol_calls_are_errors() {
        let mut dev = ImageDevice::new(MemoryImage::blank(DeviceModel::Hx890));
        assert!(matches!(
            dev.wait_ready(Duration::from_secs(1)).await,
            Err(DeviceError::Unsupported(_))
        ));
        assert!(matches!(
            dev.read_gps_log(None).await,
            Err(DeviceError::Unsupported(_))
        ));
    }
}
