use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;

/// Why encoded image bytes could not be turned into pixels.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("image data is empty")]
    Empty,

    #[error("image has zero width or height")]
    ZeroSize,

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// Tightly packed RGBA8 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Turns encoded image bytes (PNG, JPEG, ...) into RGBA8 pixels.
pub trait ImageDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError>;
}

/// Decoder backed by the `image` crate; the format is sniffed from the bytes.
#[derive(Debug, Copy, Clone, Default)]
pub struct ImageCrateDecoder;

impl ImageDecoder for ImageCrateDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<DecodedImage, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::Empty);
        }

        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return Err(DecodeError::ZeroSize);
        }

        Ok(DecodedImage {
            width,
            height,
            rgba: rgba.into_raw(),
        })
    }
}

/// Encoded image bytes awaiting their first draw.
#[derive(Clone)]
pub struct EncodedImage {
    pub key: String,
    pub bytes: Arc<[u8]>,
    pub decoder: Rc<dyn ImageDecoder>,
}

impl EncodedImage {
    /// Uses [`ImageCrateDecoder`].
    pub fn new(key: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self::with_decoder(key, bytes, Rc::new(ImageCrateDecoder))
    }

    pub fn with_decoder(
        key: impl Into<String>,
        bytes: impl Into<Arc<[u8]>>,
        decoder: Rc<dyn ImageDecoder>,
    ) -> Self {
        Self {
            key: key.into(),
            bytes: bytes.into(),
            decoder,
        }
    }
}

impl fmt::Debug for EncodedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedImage")
            .field("key", &self.key)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([10, 20, 30, 40]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn decodes_png_to_rgba() {
        let decoded = ImageCrateDecoder.decode(&png(2, 3)).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(decoded.rgba.len(), 2 * 3 * 4);
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 40]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(ImageCrateDecoder.decode(&[]), Err(DecodeError::Empty)));
        assert!(matches!(
            ImageCrateDecoder.decode(b"definitely not an image"),
            Err(DecodeError::Image(_))
        ));
    }
}
