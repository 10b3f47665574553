//! Gradient lookup table.
//!
//! Built once from the gradient image and shared read-only with every kernel
//! worker. Channels are widened to `u32` so the presenter can sum samples
//! without overflow.

use crate::error::{ViewerError, ViewerResult};
use image::RgbImage;
use std::path::Path;

pub(crate) type Rgb = [u32; 3];

#[derive(Clone, Debug)]
pub(crate) struct ColorTable {
    colors: Vec<Rgb>,
}

impl ColorTable {
    pub(crate) fn load(path: &Path) -> ViewerResult<Self> {
        let img = image::open(path)
            .map_err(|source| ViewerError::AssetLoad {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgb8();
        Self::from_image(&img)
    }

    /// Samples `max(width, height) - 1` entries along the longer axis
    /// (row 0 for a horizontal gradient, column 0 for a vertical one).
    pub(crate) fn from_image(img: &RgbImage) -> ViewerResult<Self> {
        let (w, h) = img.dimensions();
        let n = w.max(h).saturating_sub(1);
        if n == 0 {
            return Err(ViewerError::DegenerateGradient {
                width: w,
                height: h,
            });
        }

        let horizontal = w >= h;
        let colors = (0..n)
            .map(|i| {
                let p = if horizontal {
                    img.get_pixel(i, 0)
                } else {
                    img.get_pixel(0, i)
                };
                let [r, g, b] = p.0;
                [r as u32, g as u32, b as u32]
            })
            .collect();
        Ok(Self { colors })
    }

    pub(crate) fn len(&self) -> usize {
        self.colors.len()
    }

    /// Out-of-range indices clamp to the last entry.
    pub(crate) fn lookup(&self, index: usize) -> Rgb {
        debug_assert!(!self.colors.is_empty());
        self.colors[index.min(self.colors.len() - 1)]
    }
}

#[cfg(test)]
pub(crate) fn ramp(n: u32) -> ColorTable {
    // n + 1 pixels wide so the table ends up with exactly n entries
    let img = RgbImage::from_fn(n + 1, 1, |x, _| image::Rgb([x as u8, 0, 255 - x as u8]));
    ColorTable::from_image(&img).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb as Px;

    #[test]
    fn horizontal_gradient_samples_row_zero() {
        let img = RgbImage::from_fn(5, 2, |x, y| Px([x as u8 * 10, y as u8, 7]));
        let table = ColorTable::from_image(&img).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.lookup(0), [0, 0, 7]);
        assert_eq!(table.lookup(3), [30, 0, 7]);
    }

    #[test]
    fn vertical_gradient_samples_column_zero() {
        let img = RgbImage::from_fn(2, 4, |x, y| Px([x as u8, y as u8 * 50, 0]));
        let table = ColorTable::from_image(&img).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup(2), [0, 100, 0]);
    }

    #[test]
    fn lookup_clamps_past_end() {
        let table = ramp(16);
        assert_eq!(table.lookup(16), table.lookup(15));
        assert_eq!(table.lookup(usize::MAX), [15, 0, 240]);
    }

    #[test]
    fn single_pixel_image_is_rejected() {
        let img = RgbImage::new(1, 1);
        assert!(matches!(
            ColorTable::from_image(&img),
            Err(ViewerError::DegenerateGradient { width: 1, height: 1 })
        ));
    }

    #[test]
    fn missing_file_is_asset_error() {
        let err = ColorTable::load(Path::new("no/such/gradient.png")).unwrap_err();
        assert!(matches!(err, ViewerError::AssetLoad { .. }));
    }

    #[test]
    fn shipped_gradient_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("assets/gradient.ppm");
        let table = ColorTable::load(&path).unwrap();
        assert_eq!(table.len(), 511);
        assert_eq!(table.lookup(0), [0, 7, 100]);
    }
}
