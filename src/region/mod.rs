//! Region selection over a displayed image and cropping of the source.
//!
//! The selector works in container pixel space: the image is drawn inside a
//! container with `object-fit: contain`, so it may be letterboxed. Drags are
//! clamped to the displayed image box and normalized against it, which makes
//! the committed [`SelectionRegion`] independent of display size.

mod selector;

pub use selector::{ImageBox, MIN_SELECTION_PX, RegionSelector, region_from_drag};

use std::io::Cursor;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::{GenericImageView, ImageFormat};
use sitecraft_common::SelectionRegion;

use crate::errors::RegionError;

/// Pixel rectangle inside the source image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Map a fractional region onto an image of `img_w` x `img_h` pixels.
///
/// Width and height are at least one pixel and the rectangle never leaves
/// the image.
pub fn pixel_rect(region: &SelectionRegion, img_w: u32, img_h: u32) -> PixelRect {
    let x = scaled(region.x, img_w).min(img_w.saturating_sub(1));
    let y = scaled(region.y, img_h).min(img_h.saturating_sub(1));
    let width = scaled(region.width, img_w).max(1).min(img_w - x);
    let height = scaled(region.height, img_h).max(1).min(img_h - y);
    PixelRect {
        x,
        y,
        width,
        height,
    }
}

fn scaled(fraction: f64, dim: u32) -> u32 {
    // Normalized fractions can land just under an integer (0.2499999...).
    (fraction * f64::from(dim) + 1e-9).floor().max(0.0) as u32
}

/// Crop `image_bytes` to `region` and return the crop encoded as PNG.
pub fn crop_region(image_bytes: &[u8], region: &SelectionRegion) -> Result<Vec<u8>, RegionError> {
    let region = region.validated()?;
    let img = image::load_from_memory(image_bytes).map_err(RegionError::Decode)?;
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 {
        return Err(RegionError::Degenerate {
            width: f64::from(w),
            height: f64::from(h),
        });
    }
    let rect = pixel_rect(&region, w, h);
    tracing::debug!(?rect, source_w = w, source_h = h, "cropping region");

    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);
    let mut out = Cursor::new(Vec::new());
    cropped
        .write_to(&mut out, ImageFormat::Png)
        .map_err(RegionError::Encode)?;
    Ok(out.into_inner())
}

/// Whether `source` is a `data:` or http(s) URL.
pub fn is_remote_source(source: &str) -> bool {
    source.starts_with("data:") || source.starts_with("http://") || source.starts_with("https://")
}

/// Load an image from a `data:` URL or an http(s) URL.
///
/// Anything else is refused; filesystem access is reserved for
/// [`load_image_file_or_url`].
pub async fn load_image_bytes(source: &str) -> Result<Vec<u8>, RegionError> {
    let fetch_err = |message: String| RegionError::Fetch {
        url: truncate_for_log(source),
        message,
    };

    if let Some(rest) = source.strip_prefix("data:") {
        let (meta, payload) = rest
            .split_once(',')
            .ok_or_else(|| fetch_err("data URL has no payload".to_string()))?;
        if !meta.ends_with(";base64") {
            return Err(fetch_err("only base64 data URLs are supported".to_string()));
        }
        return BASE64
            .decode(payload.trim())
            .map_err(|e| fetch_err(e.to_string()));
    }

    if source.starts_with("http://") || source.starts_with("https://") {
        let response = reqwest::get(source)
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status)));
        }
        let bytes = response.bytes().await.map_err(|e| fetch_err(e.to_string()))?;
        return Ok(bytes.to_vec());
    }

    Err(fetch_err("only data: and http(s) URLs are accepted".to_string()))
}

/// Like [`load_image_bytes`], but a plain string is read as a local path.
pub async fn load_image_file_or_url(source: &str) -> Result<Vec<u8>, RegionError> {
    if is_remote_source(source) {
        return load_image_bytes(source).await;
    }
    tokio::fs::read(source).await.map_err(|e| RegionError::Fetch {
        url: truncate_for_log(source),
        message: e.to_string(),
    })
}

/// Region for a drag made over the image drawn `object-fit: contain` in a
/// `view_w` x `view_h` container. Points are container pixels.
pub fn region_for_view_drag(
    image_bytes: &[u8],
    (view_w, view_h): (f64, f64),
    start: (f64, f64),
    end: (f64, f64),
) -> Result<SelectionRegion, RegionError> {
    let img = image::load_from_memory(image_bytes).map_err(RegionError::Decode)?;
    let (w, h) = img.dimensions();
    let mut selector = RegionSelector::new(ImageBox::contain(
        view_w,
        view_h,
        f64::from(w),
        f64::from(h),
    ));
    selector.pointer_down(start.0, start.1);
    selector.pointer_move(end.0, end.1);
    let committed = selector.pointer_up(end.0, end.1);
    committed.ok_or(RegionError::Degenerate {
        width: (end.0 - start.0).abs(),
        height: (end.1 - start.1).abs(),
    })
}

/// Load the image at `source` (`data:` or http(s)) and crop it to `region`.
pub async fn fetch_and_crop(source: &str, region: &SelectionRegion) -> Result<Vec<u8>, RegionError> {
    let bytes = load_image_bytes(source).await?;
    crop_region(&bytes, region)
}

/// Encode PNG bytes as a `data:image/png;base64,...` URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", BASE64.encode(png))
}

fn truncate_for_log(source: &str) -> String {
    if source.len() <= 80 {
        return source.to_string();
    }
    let mut end = 80;
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &source[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn crop_of_quarter_region_has_expected_size() {
        let region = SelectionRegion::new(0.025, 0.05, 0.25, 0.25).unwrap();
        let bytes = crop_region(&png(200, 100), &region).unwrap();
        let crop = image::load_from_memory(&bytes).unwrap();
        assert_eq!(crop.dimensions(), (50, 25));
        // Top-left pixel of the crop is source pixel (5, 5)
        let px = crop.to_rgba8().get_pixel(0, 0).0;
        assert_eq!(&px[..2], &[5, 5]);
    }

    #[test]
    fn tiny_region_still_yields_one_pixel() {
        let region = SelectionRegion::new(0.999, 0.999, 0.0005, 0.0005).unwrap();
        let rect = pixel_rect(&region, 10, 10);
        assert_eq!(rect, PixelRect { x: 9, y: 9, width: 1, height: 1 });
        let bytes = crop_region(&png(10, 10), &region).unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (1, 1));
    }

    #[test]
    fn invalid_bytes_are_a_decode_error() {
        let region = SelectionRegion::new(0.0, 0.0, 0.5, 0.5).unwrap();
        assert!(matches!(
            crop_region(b"not an image", &region),
            Err(RegionError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn data_urls_are_decoded_inline() {
        let url = png_data_url(&png(4, 4));
        let region = SelectionRegion::new(0.0, 0.0, 0.5, 1.0).unwrap();
        let bytes = fetch_and_crop(&url, &region).await.unwrap();
        assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (2, 4));
    }

    #[tokio::test]
    async fn files_are_read_only_when_allowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("source.png");
        std::fs::write(&path, png(8, 8)).unwrap();
        let path = path.to_str().unwrap();

        let bytes = load_image_file_or_url(path).await.unwrap();
        assert_eq!(bytes, png(8, 8));

        let refused = load_image_bytes(path).await.unwrap_err();
        assert!(refused.to_string().contains("only data: and http(s) URLs"));
        let region = SelectionRegion::new(0.0, 0.0, 0.5, 0.5).unwrap();
        assert!(fetch_and_crop(path, &region).await.is_err());

        let missing = dir.path().join("missing.png");
        assert!(matches!(
            load_image_file_or_url(missing.to_str().unwrap()).await,
            Err(RegionError::Fetch { .. })
        ));
    }

    #[test]
    fn remote_sources() {
        assert!(is_remote_source("https://img/x.png"));
        assert!(is_remote_source("data:image/png;base64,AAAA"));
        assert!(!is_remote_source("/etc/hostname"));
        assert!(!is_remote_source("file:///etc/hostname"));
    }

    #[test]
    fn view_drag_is_normalized_against_letterboxed_image() {
        // 200x100 image shown in a 400x400 view: drawn 400x200 at top 100
        let bytes = png(200, 100);
        let region =
            region_for_view_drag(&bytes, (400.0, 400.0), (10.0, 110.0), (110.0, 160.0)).unwrap();
        assert!((region.x - 0.025).abs() < 1e-9);
        assert!((region.y - 0.05).abs() < 1e-9);
        assert!((region.width - 0.25).abs() < 1e-9);
        assert!((region.height - 0.25).abs() < 1e-9);

        let crop = crop_region(&bytes, &region).unwrap();
        assert_eq!(image::load_from_memory(&crop).unwrap().dimensions(), (50, 25));

        assert!(matches!(
            region_for_view_drag(&bytes, (400.0, 400.0), (10.0, 110.0), (12.0, 112.0)),
            Err(RegionError::Degenerate { .. })
        ));
    }

    #[tokio::test]
    async fn non_base64_data_url_is_rejected() {
        let err = load_image_bytes("data:text/plain,hello").await.unwrap_err();
        assert!(err.to_string().contains("base64"));
    }
}
