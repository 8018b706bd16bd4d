//! Local image preparation: decode, downscale, and re-encode as base64 JPEG.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::cost::Resolution;
use crate::error::CaptionError;

/// JPEG quality for uploaded images.
pub const JPEG_QUALITY: u8 = 95;

/// A base64 payload ready to embed in a chat request.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type of the encoded bytes
    pub media_type: &'static str,
    /// Width after resizing
    pub width: u32,
    /// Height after resizing
    pub height: u32,
}

impl EncodedImage {
    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// Downscales local images to a longest-edge bound and encodes them as JPEG.
#[derive(Debug, Clone, Copy)]
pub struct ImageEncoder {
    bound: u32,
}

impl ImageEncoder {
    pub fn new(resolution: Resolution) -> Self {
        Self {
            bound: resolution.pixels(),
        }
    }

    /// Encode a file on the blocking pool.
    pub async fn encode(&self, path: &Path) -> Result<EncodedImage, CaptionError> {
        let encoder = *self;
        let path_owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || encoder.encode_file(&path_owned))
            .await
            .map_err(|e| processing_error(path, format!("Task join error: {e}")))?
    }

    /// Synchronous decode + resize + encode.
    pub fn encode_file(&self, path: &Path) -> Result<EncodedImage, CaptionError> {
        let image = image::ImageReader::open(path)
            .map_err(|e| processing_error(path, e))?
            .with_guessed_format()
            .map_err(|e| processing_error(path, format!("Cannot detect image format: {e}")))?
            .decode()
            .map_err(|e| processing_error(path, e))?;
        self.encode_image(image, path)
    }

    /// Resize and encode an already-decoded image. `path` is only used for errors.
    pub fn encode_image(
        &self,
        image: DynamicImage,
        path: &Path,
    ) -> Result<EncodedImage, CaptionError> {
        let image = to_jpeg_compatible(image);
        let (width, height) = image.dimensions();
        let (new_width, new_height) = target_dimensions(width, height, self.bound);
        let image = if (new_width, new_height) != (width, height) {
            tracing::debug!(
                "Resizing {:?} from {}x{} to {}x{}",
                path,
                width,
                height,
                new_width,
                new_height
            );
            image.resize_exact(new_width, new_height, FilterType::Lanczos3)
        } else {
            image
        };

        let mut buffer = Cursor::new(Vec::new());
        let encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
        image
            .write_with_encoder(encoder)
            .map_err(|e| processing_error(path, e))?;

        Ok(EncodedImage {
            data: BASE64.encode(buffer.into_inner()),
            media_type: "image/jpeg",
            width: new_width,
            height: new_height,
        })
    }
}

/// Size after fitting the longest edge into `bound`. Never upscales.
pub fn target_dimensions(width: u32, height: u32, bound: u32) -> (u32, u32) {
    let longest = width.max(height);
    if longest <= bound || longest == 0 {
        return (width, height);
    }
    // v * (bound / longest), truncated, in integer arithmetic
    let scaled = |v: u32| (u64::from(v) * u64::from(bound) / u64::from(longest)) as u32;
    (scaled(width).max(1), scaled(height).max(1))
}

/// JPEG holds 8-bit gray or RGB; everything else is converted to RGB.
fn to_jpeg_compatible(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => image,
        other => DynamicImage::ImageRgb8(other.to_rgb8()),
    }
}

fn processing_error(path: &Path, cause: impl std::fmt::Display) -> CaptionError {
    CaptionError::ImageProcessing {
        path: PathBuf::from(path),
        message: cause.to_string(),
    }
}
