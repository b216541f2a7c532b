//! Image codec collaborator.
//!
//! The cache treats payloads as opaque encoded bytes. The origin tier uses a
//! codec only to validate fetched bytes and to downscale oversized images.

use std::io::Cursor;

use bytes::Bytes;
use image::imageops::FilterType;
use image::ImageFormat;

use crate::error::{CacheError, Result};

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn longer_axis(&self) -> u32 {
        self.width.max(self.height)
    }
}

/// Decode/downscale operations needed by the origin tier.
pub trait ImageCodec: Send + Sync {
    /// Decodes `data` far enough to validate it and report its size.
    fn dimensions(&self, data: &[u8]) -> Result<Dimensions>;

    /// Returns an encoded copy whose longer axis is at most `max_dimension`,
    /// preserving aspect ratio.
    fn downscale(&self, data: &[u8], max_dimension: u32) -> Result<Bytes>;

    /// MIME type of the encoded bytes, if recognised.
    fn mime_type(&self, data: &[u8]) -> Option<&'static str>;
}

// == Standard Codec ==
/// Codec backed by the `image` crate. Downscaled output is PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl ImageCodec for StandardCodec {
    fn dimensions(&self, data: &[u8]) -> Result<Dimensions> {
        let img = image::load_from_memory(data)
            .map_err(|e| CacheError::InvalidPayload(format!("image decode error: {}", e)))?;
        Ok(Dimensions {
            width: img.width(),
            height: img.height(),
        })
    }

    fn downscale(&self, data: &[u8], max_dimension: u32) -> Result<Bytes> {
        let img = image::load_from_memory(data)
            .map_err(|e| CacheError::InvalidPayload(format!("image decode error: {}", e)))?;
        let scaled = img.resize(max_dimension, max_dimension, FilterType::Triangle);

        let mut cursor = Cursor::new(Vec::new());
        scaled
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|e| CacheError::Unknown(format!("image encode error: {}", e)))?;
        Ok(Bytes::from(cursor.into_inner()))
    }

    fn mime_type(&self, data: &[u8]) -> Option<&'static str> {
        image::guess_format(data).ok().map(|f| f.to_mime_type())
    }
}

/// Encodes a solid test image as PNG.
#[cfg(test)]
pub(crate) fn png_fixture(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 255]));
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png).unwrap();
    cursor.into_inner()
}
