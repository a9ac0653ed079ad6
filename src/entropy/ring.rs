//! Ring artifact removal
//!
//! Rings are concentric about the rotation center of the reconstruction.
//! The mean intensity is computed for every integer radius, the profile is
//! smoothed with a running median and the residual, the ring artifact, is
//! subtracted from the pixels at that radius.

use serde::{Deserialize, Serialize};

use super::EntropyError;
use crate::Image;

/// Ring removal filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RingFilter {
    /// pixel values are clamped to `[thresh_min, thresh_max]` when estimating the rings
    pub thresh_min: f64,
    pub thresh_max: f64,
    /// width of the running median along the radius [pixel]
    pub rwidth: usize,
}
impl Default for RingFilter {
    fn default() -> Self {
        Self {
            thresh_min: -100.,
            thresh_max: 300.,
            rwidth: 30,
        }
    }
}

fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    Some(if n % 2 == 0 {
        0.5 * (values[n / 2 - 1] + values[n / 2])
    } else {
        values[n / 2]
    })
}

impl RingFilter {
    /// Returns a copy of `image` without the ring artifacts
    ///
    /// `center` is the `(x, y)`, i.e. `(column, row)`, rotation center; it defaults
    /// to the image center. The center must be finite and no further than one
    /// image diagonal outside the image.
    pub fn apply(
        &self,
        image: &Image,
        center: (Option<f64>, Option<f64>),
    ) -> Result<Image, EntropyError> {
        let (rows, cols) = image.shape();
        if rows == 0 || cols == 0 {
            return Ok(image.clone());
        }
        let cx = center.0.unwrap_or((cols as f64 - 1.) / 2.);
        let cy = center.1.unwrap_or((rows as f64 - 1.) / 2.);
        let diagonal = (rows as f64).hypot(cols as f64);
        let inside =
            |c: f64, n: usize| c.is_finite() && (-diagonal..=n as f64 + diagonal).contains(&c);
        if !(inside(cx, cols) && inside(cy, rows)) {
            return Err(EntropyError::Center(cx, cy));
        }
        let radius = |i: usize, j: usize| (j as f64 - cx).hypot(i as f64 - cy).round() as usize;

        let n_radius = [(0, 0), (0, cols - 1), (rows - 1, 0), (rows - 1, cols - 1)]
            .into_iter()
            .map(|(i, j)| radius(i, j))
            .max()
            .unwrap_or_default()
            + 1;

        let mut sum = vec![0f64; n_radius];
        let mut count = vec![0usize; n_radius];
        for j in 0..cols {
            for i in 0..rows {
                let value = image[(i, j)];
                if value.is_finite() {
                    let r = radius(i, j);
                    sum[r] += value.clamp(self.thresh_min, self.thresh_max);
                    count[r] += 1;
                }
            }
        }
        let profile: Vec<Option<f64>> = sum
            .iter()
            .zip(&count)
            .map(|(&s, &c)| (c > 0).then(|| s / c as f64))
            .collect();

        let half = self.rwidth / 2;
        let artifact: Vec<f64> = (0..n_radius)
            .map(|r| {
                let Some(mean) = profile[r] else {
                    return 0.;
                };
                let lo = r.saturating_sub(half);
                let hi = (r + half + 1).min(n_radius);
                let mut window: Vec<f64> = profile[lo..hi].iter().flatten().cloned().collect();
                median(&mut window).map_or(0., |smooth| mean - smooth)
            })
            .collect();
        log::debug!(
            "ring removal about ({cx:.2},{cy:.2}): max artifact {:.3e}",
            artifact.iter().fold(0f64, |m, a| m.max(a.abs()))
        );

        Ok(Image::from_fn(rows, cols, |i, j| {
            let value = image[(i, j)];
            if value.is_finite() {
                value - artifact[radius(i, j)]
            } else {
                value
            }
        }))
    }
}

/// Removes the ring artifacts of `image` with the default [`RingFilter`]
pub fn remove_ring(
    image: &Image,
    center_x: Option<f64>,
    center_y: Option<f64>,
) -> Result<Image, EntropyError> {
    RingFilter::default().apply(image, (center_x, center_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ringed(n: usize, ring_radius: f64, amplitude: f64) -> Image {
        let c = (n as f64 - 1.) / 2.;
        Image::from_fn(n, n, |i, j| {
            let r = (i as f64 - c).hypot(j as f64 - c).round();
            if r == ring_radius {
                1. + amplitude
            } else {
                1.
            }
        })
    }

    #[test]
    fn constant_image_unchanged() -> Result<(), EntropyError> {
        let image = Image::from_element(32, 48, 0.5);
        let filtered = remove_ring(&image, None, None)?;
        assert!(filtered.iter().all(|&x| (x - 0.5).abs() < 1e-12));
        Ok(())
    }

    #[test]
    fn flattens_ring() -> Result<(), EntropyError> {
        let image = ringed(65, 12., 0.8);
        let filtered = remove_ring(&image, None, None)?;
        let spread = |im: &Image| {
            let (lo, hi) = im
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &x| (lo.min(x), hi.max(x)));
            hi - lo
        };
        assert!(spread(&image) > 0.7);
        assert!(spread(&filtered) < 1e-9, "{}", spread(&filtered));
        Ok(())
    }

    #[test]
    fn explicit_center() -> Result<(), EntropyError> {
        let image = ringed(65, 12., 0.8);
        let centered = remove_ring(&image, Some(32.), Some(32.))?;
        let shifted = remove_ring(&image, Some(20.), Some(40.))?;
        assert_eq!(centered, remove_ring(&image, None, None)?);
        assert_ne!(centered, shifted);
        Ok(())
    }

    #[test]
    fn far_center_rejected() -> Result<(), EntropyError> {
        let image = ringed(33, 8., 0.5);
        assert!(matches!(
            remove_ring(&image, Some(1e13), Some(16.)),
            Err(EntropyError::Center(..))
        ));
        assert!(matches!(
            remove_ring(&image, Some(16.), Some(f64::NEG_INFINITY)),
            Err(EntropyError::Center(..))
        ));
        // one diagonal outside the image is still accepted
        let filtered = remove_ring(&image, Some(-40.), Some(70.))?;
        assert!(filtered.iter().all(|x| x.is_finite()));
        Ok(())
    }

    #[test]
    fn keeps_non_finite() -> Result<(), EntropyError> {
        let mut image = Image::from_element(8, 8, 1.);
        image[(3, 4)] = f64::NAN;
        image[(0, 0)] = f64::INFINITY;
        let filtered = remove_ring(&image, None, None)?;
        assert!(filtered[(3, 4)].is_nan());
        assert!(filtered[(0, 0)].is_infinite());
        assert!(filtered[(5, 5)].is_finite());
        Ok(())
    }

    #[test]
    fn median_even_odd() {
        assert_eq!(median(&mut [3., 1., 2.]), Some(2.));
        assert_eq!(median(&mut [4., 1., 2., 3.]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }
}
