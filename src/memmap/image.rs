// Flat binary memory image of a radio ("DAT image")
// Every feature address in the device maps is an absolute offset here.

use super::map::{memory_map_for, DeviceModel};
use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Range out of bounds: {start:#06X}+{len} exceeds {size:#06X}")]
    OutOfBounds {
        start: usize,
        len: usize,
        size: usize,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unrecognized image: {0}")]
    UnknownModel(String),
}

pub type Result<T> = std::result::Result<T, ImageError>;

/// A full memory image for one device model
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryImage {
    model: DeviceModel,
    data: Vec<u8>,
}

impl MemoryImage {
    /// Wrap an existing byte vector, verifying magic and length
    pub fn new(model: DeviceModel, data: Vec<u8>) -> Result<Self> {
        let map = memory_map_for(model);
        if data.len() != map.total_size {
            return Err(ImageError::UnknownModel(format!(
                "{} bytes, expected {} for {}",
                data.len(),
                map.total_size,
                model
            )));
        }
        if data[0..2] != map.magic {
            return Err(ImageError::UnknownModel(format!(
                "magic {:02X} {:02X} does not match {}",
                data[0], data[1], model
            )));
        }
        Ok(Self { model, data })
    }

    /// Create a blank (0xFF-filled) image with the model's magic installed
    pub fn blank(model: DeviceModel) -> Self {
        let map = memory_map_for(model);
        let mut data = vec![0xFFu8; map.total_size];
        data[0..2].copy_from_slice(&map.magic);
        Self { model, data }
    }

    /// Detect the device model from magic signature and total length
    pub fn detect(data: Vec<u8>) -> Result<Self> {
        for model in DeviceModel::ALL {
            let map = memory_map_for(*model);
            if data.len() == map.total_size && data.get(0..2) == Some(&map.magic[..]) {
                return Ok(Self {
                    model: *model,
                    data,
                });
            }
        }
        Err(ImageError::UnknownModel(format!(
            "{} bytes, magic {:02X?}",
            data.len(),
            data.get(0..2).unwrap_or_default()
        )))
    }

    /// Load a .dat image file, detecting the model
    pub fn load_dat(path: impl AsRef<Path>) -> Result<Self> {
        let mut data = Vec::new();
        File::open(path)?.read_to_end(&mut data)?;
        Self::detect(data)
    }

    /// Save the image to a .dat file
    pub fn save_dat(&self, path: impl AsRef<Path>) -> Result<()> {
        File::create(path)?.write_all(&self.data)?;
        Ok(())
    }

    pub fn model(&self) -> DeviceModel {
        self.model
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a slice of the image
    pub fn get(&self, start: usize, len: usize) -> Result<&[u8]> {
        let end = start.checked_add(len).filter(|&e| e <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[start..end]),
            None => Err(ImageError::OutOfBounds {
                start,
                len,
                size: self.data.len(),
            }),
        }
    }

    /// Overwrite a slice of the image
    pub fn set(&mut self, start: usize, bytes: &[u8]) -> Result<()> {
        let end = start
            .checked_add(bytes.len())
            .filter(|&e| e <= self.data.len());
        match end {
            Some(end) => {
                self.data[start..end].copy_from_slice(bytes);
                Ok(())
            }
            None => Err(ImageError::OutOfBounds {
                start,
                len: bytes.len(),
                size: self.data.len(),
            }),
        }
    }

    /// The whole image as raw bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Printable hex dump of a region, for diagnostics
    pub fn printable(&self, start: usize, end: usize) -> String {
        hexdump(&self.data[start..end.min(self.data.len())])
    }
}

impl fmt::Display for MemoryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MemoryImage({}, {} bytes)", self.model, self.data.len())
    }
}

/// Hex dump in the hexdump -C layout, 16 bytes per row
fn hexdump(data: &[u8]) -> String {
    data.chunks(16)
        .enumerate()
        .map(|(row, chunk)| {
            let mut hex = String::with_capacity(49);
            let mut ascii = String::with_capacity(16);
            for (i, &byte) in chunk.iter().enumerate() {
                if i == 8 {
                    hex.push(' ');
                }
                hex.push_str(&format!("{:02x} ", byte));
                ascii.push(if (0x20..0x7f).contains(&byte) {
                    byte as char
                } else {
                    '.'
                });
            }
            format!("{:08x}  {:<49} |{}|\n", row * 16, hex, ascii)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_blank_image_has_magic() {
        let image = MemoryImage::blank(DeviceModel::Hx890);
        let map = memory_map_for(DeviceModel::Hx890);
        assert_eq!(image.len(), map.total_size);
        assert_eq!(image.get(0, 2).unwrap(), &map.magic);
    }

    #[test]
    fn test_detect_by_magic_and_length() {
        for model in DeviceModel::ALL {
            let blank = MemoryImage::blank(*model);
            let detected = MemoryImage::detect(blank.as_bytes().to_vec()).unwrap();
            assert_eq!(detected.model(), *model);
        }

        assert!(MemoryImage::detect(vec![0u8; 100]).is_err());
    }

    #[test]
    fn test_wrong_magic_rejected() {
        let map = memory_map_for(DeviceModel::Hx870);
        let data = vec![0u8; map.total_size];
        assert!(MemoryImage::new(DeviceModel::Hx870, data).is_err());
    }

    #[test]
    fn test_get_set_bounds() {
        let mut image = MemoryImage::blank(DeviceModel::Hx870);

        image.set(0x4300, &[1, 2, 3]).unwrap();
        assert_eq!(image.get(0x4300, 3).unwrap(), &[1, 2, 3]);

        let size = image.len();
        assert!(image.get(size, 1).is_err());
        assert!(image.set(size - 1, &[0, 0]).is_err());
        assert!(image.get(usize::MAX, 2).is_err());
    }

    #[test]
    fn test_dat_roundtrip() {
        let mut image = MemoryImage::blank(DeviceModel::Hx890);
        image.set(0xD700, b"waypoint bytes").unwrap();

        let file = NamedTempFile::new().unwrap();
        image.save_dat(file.path()).unwrap();

        let loaded = MemoryImage::load_dat(file.path()).unwrap();
        assert_eq!(loaded, image);
    }

    #[test]
    fn test_hexdump() {
        let image = MemoryImage::blank(DeviceModel::Hx870);
        let dump = image.printable(0, 16);
        assert!(dump.contains("ff ff"));
        assert!(dump.contains("|"));
    }
}
