//! DICOM to raster conversion.

use std::io::Cursor;

use dicom_pixeldata::PixelDecoder;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

/// Offset of the `DICM` magic in a Part-10 file (after the 128-byte preamble).
const PREAMBLE_LEN: usize = 128;
const MAGIC: &[u8; 4] = b"DICM";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("not a DICOM Part-10 file")]
    NotDicom,

    #[error("unreadable DICOM data: {0}")]
    Read(String),

    #[error("failed to decode pixel data: {0}")]
    Decode(String),

    #[error("failed to encode image: {0}")]
    Encode(#[from] image::ImageError),
}

/// Pure conversion from a medical image format to an encoded raster image.
pub trait FormatConverter: Send + Sync {
    /// Extension of the produced raster, without the dot.
    fn output_extension(&self) -> &'static str;

    fn convert(&self, source: &[u8]) -> Result<Vec<u8>, ConversionError>;
}

/// Decodes the first frame of a DICOM file and re-encodes it as JPEG.
#[derive(Debug, Clone, Copy, Default)]
pub struct DicomConverter;

impl FormatConverter for DicomConverter {
    fn output_extension(&self) -> &'static str {
        "jpg"
    }

    fn convert(&self, source: &[u8]) -> Result<Vec<u8>, ConversionError> {
        let body = strip_preamble(source)?;
        let object =
            dicom_object::from_reader(body).map_err(|e| ConversionError::Read(e.to_string()))?;

        let pixels = object
            .decode_pixel_data()
            .map_err(|e| ConversionError::Decode(e.to_string()))?;
        let frame = pixels
            .to_dynamic_image(0)
            .map_err(|e| ConversionError::Decode(e.to_string()))?;

        encode_jpeg(&frame)
    }
}

/// Return the bytes starting at the `DICM` magic. Files without a preamble are accepted.
fn strip_preamble(source: &[u8]) -> Result<&[u8], ConversionError> {
    if source.len() >= PREAMBLE_LEN + MAGIC.len()
        && &source[PREAMBLE_LEN..PREAMBLE_LEN + MAGIC.len()] == MAGIC
    {
        return Ok(&source[PREAMBLE_LEN..]);
    }
    if source.starts_with(MAGIC) {
        return Ok(source);
    }
    Err(ConversionError::NotDicom)
}

/// JPEG has no 16-bit or alpha support, so frames are flattened to 8-bit RGB first.
pub(crate) fn encode_jpeg(frame: &DynamicImage) -> Result<Vec<u8>, ConversionError> {
    let rgb = DynamicImage::ImageRgb8(frame.to_rgb8());
    let mut buffer = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Jpeg)?;
    Ok(buffer)
}
