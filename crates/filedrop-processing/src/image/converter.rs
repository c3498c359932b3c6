use std::io::Cursor;

use filedrop_core::Transform;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader};

#[derive(Debug, thiserror::Error)]
pub enum ConversionError {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Expected {expected:?} content, found {found}")]
    UnexpectedFormat {
        expected: ImageFormat,
        found: String,
    },

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Opaque image conversion: input bytes in, converted bytes out
pub trait ImageConverter: Send + Sync {
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError>;

    /// Extension of the converted output, without the dot
    fn output_extension(&self) -> &'static str;
}

/// Re-encodes PNG images as baseline JPEG.
///
/// Alpha and palette images are flattened to 8-bit RGB first; the alpha channel
/// is discarded.
#[derive(Debug, Clone, Copy)]
pub struct PngToJpegConverter {
    quality: u8,
}

impl PngToJpegConverter {
    pub fn new(quality: u8) -> Self {
        Self {
            quality: quality.clamp(1, 100),
        }
    }

    pub fn quality(&self) -> u8 {
        self.quality
    }
}

impl ImageConverter for PngToJpegConverter {
    fn convert(&self, input: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let reader = ImageReader::new(Cursor::new(input))
            .with_guessed_format()
            .map_err(|e| ConversionError::Decode(e.to_string()))?;

        match reader.format() {
            Some(ImageFormat::Png) => {}
            other => {
                return Err(ConversionError::UnexpectedFormat {
                    expected: ImageFormat::Png,
                    found: other
                        .map(|f| format!("{:?}", f))
                        .unwrap_or_else(|| "unknown".to_string()),
                })
            }
        }

        let decoded = reader
            .decode()
            .map_err(|e| ConversionError::Decode(e.to_string()))?;
        let rgb = decoded.to_rgb8();

        let mut output = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut output, self.quality);
        encoder
            .encode_image(&rgb)
            .map_err(|e| ConversionError::Encode(e.to_string()))?;

        tracing::debug!(
            width = rgb.width(),
            height = rgb.height(),
            input_bytes = input.len(),
            output_bytes = output.len(),
            "Converted PNG to JPEG"
        );

        Ok(output)
    }

    fn output_extension(&self) -> &'static str {
        "jpg"
    }
}

/// Converter implementing a transform.
pub fn converter_for(transform: Transform, jpeg_quality: u8) -> Box<dyn ImageConverter> {
    match transform {
        Transform::PngToJpeg => Box::new(PngToJpegConverter::new(jpeg_quality)),
    }
}
