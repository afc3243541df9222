use anyhow::{anyhow, Context, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageReader, Limits};
use std::io::Cursor;
use std::path::Path;
use tracing::{debug, warn};

/// Tallest photo produced after scaling to the target width.
pub const MAX_OUTPUT_HEIGHT: u32 = 4000;
const MAX_DECODE_ALLOC: u64 = 256 * 1024 * 1024;

/// Scales the image to exactly `max_width` pixels wide (height keeps the
/// aspect ratio) and re-encodes it as JPEG at `quality`. Fails when the
/// scaled height would exceed [`MAX_OUTPUT_HEIGHT`].
pub fn downscale_jpeg(bytes: &[u8], max_width: u32, quality: u8) -> Result<Vec<u8>> {
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("Unrecognized image data")?;
    let mut limits = Limits::default();
    limits.max_alloc = Some(MAX_DECODE_ALLOC);
    reader.limits(limits);
    let img = reader.decode().context("Unrecognized image data")?;

    let scale = max_width as f64 / img.width().max(1) as f64;
    let scaled = (img.height() as f64 * scale).round();
    if scaled > MAX_OUTPUT_HEIGHT as f64 {
        return Err(anyhow!(
            "Photo is too tall: {}x{} would scale to {} px high",
            img.width(),
            img.height(),
            scaled
        ));
    }
    let height = (scaled as u32).max(1);

    let rgb = img
        .resize_exact(max_width, height, FilterType::Triangle)
        .to_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .context("Failed to encode JPEG")?;
    debug!(
        from = bytes.len(),
        to = out.len(),
        width = max_width,
        height,
        "downscaled photo"
    );
    Ok(out)
}

/// Builds the inline data URL stored in `photo_url`. Images that cannot be
/// decoded are embedded as-is.
pub fn photo_data_url(bytes: &[u8], filename: &str, max_width: u32, quality: u8) -> String {
    match downscale_jpeg(bytes, max_width, quality) {
        Ok(jpeg) => format!("data:image/jpeg;base64,{}", STANDARD.encode(jpeg)),
        Err(e) => {
            warn!("Keeping original photo bytes: {:#}", e);
            format!("data:{};base64,{}", mime_for(filename), STANDARD.encode(bytes))
        }
    }
}

pub fn load_photo(path: &Path, max_width: u32, quality: u8) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read photo: {}", path.display()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(photo_data_url(&bytes, &name, max_width, quality))
}

fn mime_for(filename: &str) -> &'static str {
    let ext = filename
        .rsplit('.')
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_downscale_keeps_aspect_ratio() {
        let jpeg = downscale_jpeg(&png(1200, 800), 300, 70).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 300);
        assert_eq!(decoded.height(), 200);
        assert_eq!(image::guess_format(&jpeg).unwrap(), ImageFormat::Jpeg);
    }

    #[test]
    fn test_data_url_is_jpeg_when_decodable() {
        let url = photo_data_url(&png(600, 600), "me.png", 300, 70);
        let encoded = url.strip_prefix("data:image/jpeg;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().width(), 300);
    }

    #[test]
    fn test_tall_narrow_image_is_not_scaled() {
        // 2 px wide: scaling to 300 wide would make it 6,000,000 px high.
        let raw = png(2, 40_000);
        let err = downscale_jpeg(&raw, 300, 70).unwrap_err();
        assert!(format!("{:#}", err).contains("too tall"));

        let url = photo_data_url(&raw, "strip.png", 300, 70);
        assert_eq!(url, format!("data:image/png;base64,{}", STANDARD.encode(&raw)));
    }

    #[test]
    fn test_small_image_is_scaled_up_within_bounds() {
        let jpeg = downscale_jpeg(&png(100, 1000), 300, 70).unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (300, 3000));
    }

    #[test]
    fn test_undecodable_bytes_are_embedded_unchanged() {
        let raw = b"definitely not an image";
        let url = photo_data_url(raw, "scan.png", 300, 70);
        assert_eq!(url, format!("data:image/png;base64,{}", STANDARD.encode(raw)));
    }
}
