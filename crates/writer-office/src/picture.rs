//! Image extents for `insert-image`.

use std::path::Path;

use crate::error::{OfficeError, Result};
use crate::office::ImageSize;

/// 1/100 mm per inch.
const HMM_PER_INCH: u64 = 2540;
/// Pixel density assumed for bitmaps without a usable resolution.
const DPI: u64 = 96;

/// Pixel dimensions read from the file header.
pub fn pixel_size(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path).map_err(|e| {
        OfficeError::invalid(format!("cannot read image {}: {e}", path.display()))
    })
}

fn px_to_hmm(px: u32) -> u32 {
    (u64::from(px) * HMM_PER_INCH / DPI) as u32
}

/// Resolve the requested extent. A single given side keeps the aspect ratio
/// of `pixels`; no side at all means the natural size at 96 dpi.
pub fn extent(
    pixels: Option<(u32, u32)>,
    width: Option<u32>,
    height: Option<u32>,
) -> Result<ImageSize> {
    if width == Some(0) || height == Some(0) {
        return Err(OfficeError::invalid("image width and height must be positive"));
    }
    if let (Some(width), Some(height)) = (width, height) {
        return Ok(ImageSize { width, height });
    }
    let (px_w, px_h) = match pixels {
        Some((w, h)) if w > 0 && h > 0 => (u64::from(w), u64::from(h)),
        _ => return Err(OfficeError::invalid("image dimensions are unknown; give both width and height")),
    };
    Ok(match (width, height) {
        (Some(width), None) => ImageSize {
            width,
            height: (u64::from(width) * px_h / px_w).max(1) as u32,
        },
        (None, Some(height)) => ImageSize {
            width: (u64::from(height) * px_w / px_h).max(1) as u32,
            height,
        },
        _ => ImageSize {
            width: px_to_hmm(px_w as u32),
            height: px_to_hmm(px_h as u32),
        },
    })
}

/// Read the image header only when the request leaves a side open.
pub fn size_for(path: &Path, width: Option<u32>, height: Option<u32>) -> Result<ImageSize> {
    let pixels = match (width, height) {
        (Some(_), Some(_)) => None,
        _ => Some(pixel_size(path)?),
    };
    extent(pixels, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn natural_size_is_96_dpi() {
        let size = extent(Some((96, 192)), None, None).unwrap();
        assert_eq!(size, ImageSize { width: 2540, height: 5080 });
    }

    #[test]
    fn one_side_keeps_the_aspect_ratio() {
        assert_eq!(
            extent(Some((400, 200)), Some(10_000), None).unwrap(),
            ImageSize { width: 10_000, height: 5_000 }
        );
        assert_eq!(
            extent(Some((400, 200)), None, Some(1_000)).unwrap(),
            ImageSize { width: 2_000, height: 1_000 }
        );
    }

    #[test]
    fn both_sides_need_no_pixels() {
        assert_eq!(
            extent(None, Some(3), Some(4)).unwrap(),
            ImageSize { width: 3, height: 4 }
        );
        assert!(extent(None, Some(3), None).is_err());
        assert!(extent(Some((1, 1)), Some(0), None).is_err());
    }

    #[test]
    fn unreadable_files_are_invalid_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"plain text").unwrap();
        let err = size_for(&path, None, None).unwrap_err();
        assert_eq!(err.kind(), writer_protocol::ErrorKind::InvalidArgument);
        assert!(size_for(&path, Some(1), Some(1)).is_ok());
    }
}
