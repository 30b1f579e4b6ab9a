//! Data-URI serialization of composited canvases.

use crate::compositor::CompositedCanvas;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{DynamicImage, ImageOutputFormat};
use std::io::Cursor;
use thiserror::Error;

/// Quality browsers use for `image/jpeg` canvas exports.
const JPEG_QUALITY: u8 = 92;

#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("No encoder available for mime type '{0}'")]
    UnsupportedMimeType(String),

    #[error("Image encode error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Malformed data URI: {0}")]
    MalformedDataUri(String),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A parsed `data:<mime>;base64,<payload>` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

fn output_format(mime_type: &str) -> Option<ImageOutputFormat> {
    match mime_type {
        "image/png" => Some(ImageOutputFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageOutputFormat::Jpeg(JPEG_QUALITY)),
        "image/bmp" => Some(ImageOutputFormat::Bmp),
        _ => None,
    }
}

/// Mime type the canvas is sent as: the upload's own type when it can be
/// encoded, PNG otherwise.
pub fn transport_mime_for(source_mime: &str) -> &str {
    if output_format(source_mime).is_some() {
        source_mime
    } else {
        "image/png"
    }
}

pub fn to_data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Serializes the canvas as a base64 data URI of the requested mime type.
pub fn encode(canvas: &CompositedCanvas, mime_type: &str) -> Result<String, EncodeError> {
    let format = output_format(mime_type)
        .ok_or_else(|| EncodeError::UnsupportedMimeType(mime_type.to_string()))?;

    let image = DynamicImage::ImageRgba8(canvas.pixels().clone());
    // JPEG has no alpha channel
    let image = match format {
        ImageOutputFormat::Jpeg(_) => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    let mut bytes = Vec::new();
    image.write_to(&mut Cursor::new(&mut bytes), format)?;

    log::debug!("📦 Encoded canvas as {} ({} bytes)", mime_type, bytes.len());
    Ok(to_data_uri(mime_type, &bytes))
}

/// Raw payload of a data URI: everything after the first comma, or the whole
/// input when there is no header.
pub fn strip_data_uri_header(uri: &str) -> &str {
    match uri.split_once(',') {
        Some((_, payload)) => payload,
        None => uri,
    }
}

pub fn parse_data_uri(uri: &str) -> Result<DataUri, EncodeError> {
    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| EncodeError::MalformedDataUri("missing 'data:' prefix".to_string()))?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| EncodeError::MalformedDataUri("missing ',' separator".to_string()))?;
    let mime_type = header
        .strip_suffix(";base64")
        .ok_or_else(|| EncodeError::MalformedDataUri("only base64 payloads are supported".to_string()))?;

    Ok(DataUri {
        mime_type: mime_type.to_string(),
        bytes: STANDARD.decode(payload.trim())?,
    })
}

/// File extension for a result mime type.
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        _ => "png",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::{compose, CanvasDimensions};
    use crate::source_image::SourceImage;
    use image::{Rgba, RgbaImage};

    fn canvas() -> CompositedCanvas {
        let source = SourceImage::from_rgba(
            RgbaImage::from_pixel(20, 10, Rgba([30, 160, 220, 255])),
            "image/png",
        );
        compose(&source, CanvasDimensions { width: 20, height: 20 }).unwrap()
    }

    #[test]
    fn test_png_data_uri_decodes_to_canvas_pixels() {
        let canvas = canvas();
        let uri = encode(&canvas, "image/png").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));

        let parsed = parse_data_uri(&uri).unwrap();
        assert_eq!(parsed.mime_type, "image/png");
        let decoded = image::load_from_memory(&parsed.bytes).unwrap().to_rgba8();
        assert_eq!(&decoded, canvas.pixels());
    }

    #[test]
    fn test_encode_is_deterministic() {
        let canvas = canvas();
        assert_eq!(
            encode(&canvas, "image/png").unwrap(),
            encode(&canvas, "image/png").unwrap()
        );
    }

    #[test]
    fn test_jpeg_drops_alpha() {
        let uri = encode(&canvas(), "image/jpeg").unwrap();
        let parsed = parse_data_uri(&uri).unwrap();
        let decoded = image::load_from_memory(&parsed.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (20, 20));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn test_unknown_mime_is_rejected_by_encoder() {
        let err = encode(&canvas(), "image/x-nonsense").unwrap_err();
        assert!(matches!(err, EncodeError::UnsupportedMimeType(ref m) if m == "image/x-nonsense"));
        assert_eq!(transport_mime_for("image/webp"), "image/png");
        assert_eq!(transport_mime_for("image/jpeg"), "image/jpeg");
    }

    #[test]
    fn test_strip_header() {
        assert_eq!(strip_data_uri_header("data:image/png;base64,QUJD"), "QUJD");
        assert_eq!(strip_data_uri_header("QUJD"), "QUJD");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            parse_data_uri("image/png;base64,QUJD"),
            Err(EncodeError::MalformedDataUri(_))
        ));
        assert!(matches!(
            parse_data_uri("data:image/png,QUJD"),
            Err(EncodeError::MalformedDataUri(_))
        ));
        assert!(matches!(
            parse_data_uri("data:image/png;base64,@@@"),
            Err(EncodeError::Base64(_))
        ));
    }
}
