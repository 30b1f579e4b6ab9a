use image::{ImageFormat, RgbaImage};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("The selected file is empty")]
    EmptyFile,

    #[error("Unrecognized image format")]
    UnknownFormat,

    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Image has no pixels ({width}x{height})")]
    ZeroSized { width: u32, height: u32 },
}

/// A decoded upload. Replaced wholesale on re-upload, never edited in place.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pixels: RgbaImage,
    mime_type: String,
    file_name: Option<String>,
}

impl SourceImage {
    /// Decodes an uploaded file. The format is sniffed from the bytes, not the
    /// file name.
    pub fn decode(bytes: &[u8], file_name: Option<&str>) -> Result<Self, DecodeError> {
        if bytes.is_empty() {
            return Err(DecodeError::EmptyFile);
        }

        let format = image::guess_format(bytes).map_err(|_| DecodeError::UnknownFormat)?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        if decoded.width() == 0 || decoded.height() == 0 {
            return Err(DecodeError::ZeroSized {
                width: decoded.width(),
                height: decoded.height(),
            });
        }

        log::debug!(
            "🖼 Decoded {} ({}x{}, {})",
            file_name.unwrap_or("<unnamed>"),
            decoded.width(),
            decoded.height(),
            mime_for_format(format)
        );

        Ok(Self {
            pixels: decoded.to_rgba8(),
            mime_type: mime_for_format(format).to_string(),
            file_name: file_name.map(str::to_string),
        })
    }

    pub fn from_rgba(pixels: RgbaImage, mime_type: impl Into<String>) -> Self {
        Self {
            pixels,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// File name without its last extension.
    pub fn file_stem(&self) -> Option<&str> {
        self.file_name
            .as_deref()
            .and_then(|name| Path::new(name).file_stem())
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
    }
}

pub fn mime_for_format(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Gif => "image/gif",
        ImageFormat::Bmp => "image/bmp",
        _ => "application/octet-stream",
    }
}
