//! Focus metric
//!
//! The entropy of the intensity histogram of a reconstructed slice is used as an
//! inverse sharpness measure: the better the rotation center, the lower the entropy.

use serde::{Deserialize, Serialize};

use crate::Image;

mod histogram;
mod mask;
mod ring;
pub use histogram::{Histogram, EPSILON, N_BIN};
pub use mask::make_mask;
pub use ring::{remove_ring, RingFilter};

#[derive(Debug, thiserror::Error)]
pub enum EntropyError {
    #[error("invalid histogram range [{0},{1}], expected finite bounds with min<max")]
    Range(f64, f64),
    #[error("mask ratio {0} is out of the (0,1] interval")]
    MaskRatio(f64),
    #[error("window {window:?} doesn't fit in a {rows}x{cols} image")]
    Window {
        window: Window,
        rows: usize,
        cols: usize,
    },
    #[error("no pixel left after windowing and masking")]
    EmptyImage,
    #[error("ring removal center ({0},{1}) is not finite or too far from the image")]
    Center(f64, f64),
}
type Result<T> = std::result::Result<T, EntropyError>;

/// Rectangular crop `[start.0..end.0, start.1..end.1]` in (row, column) coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub start: (usize, usize),
    pub end: (usize, usize),
}
impl Window {
    pub fn new(start: (usize, usize), end: (usize, usize)) -> Self {
        Self { start, end }
    }
    /// Number of (rows, columns) in the window
    pub fn shape(&self) -> (usize, usize) {
        (
            self.end.0.saturating_sub(self.start.0),
            self.end.1.saturating_sub(self.start.1),
        )
    }
    fn check(&self, rows: usize, cols: usize) -> Result<()> {
        let (n_row, n_col) = self.shape();
        if n_row == 0 || n_col == 0 || self.end.0 > rows || self.end.1 > cols {
            Err(EntropyError::Window {
                window: *self,
                rows,
                cols,
            })
        } else {
            Ok(())
        }
    }
    /// Crops `image` to the window
    pub fn crop(&self, image: &Image) -> Result<Image> {
        let (rows, cols) = image.shape();
        self.check(rows, cols)?;
        Ok(image.view(self.start, self.shape()).into_owned())
    }
}

/// Entropy computation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntropyConfig {
    /// histogram `(min,max)` range, values outside are left out of the histogram
    pub range: (f64, f64),
    /// ratio of the circular mask radius to half the smallest image dimension
    pub mask_ratio: Option<f64>,
    pub window: Option<Window>,
    pub ring_removal: bool,
    /// ring removal center column
    pub center_x: Option<f64>,
    /// ring removal center row
    pub center_y: Option<f64>,
}
impl Default for EntropyConfig {
    fn default() -> Self {
        Self {
            range: (0., 0.002),
            mask_ratio: Some(0.9),
            window: None,
            ring_removal: true,
            center_x: None,
            center_y: None,
        }
    }
}
impl EntropyConfig {
    pub fn range(self, min: f64, max: f64) -> Self {
        Self {
            range: (min, max),
            ..self
        }
    }
    pub fn mask_ratio(self, mask_ratio: Option<f64>) -> Self {
        Self { mask_ratio, ..self }
    }
    pub fn window(self, window: Option<Window>) -> Self {
        Self { window, ..self }
    }
    pub fn ring_removal(self, ring_removal: bool) -> Self {
        Self {
            ring_removal,
            ..self
        }
    }
    /// Sets the ring removal center `(x,y)`
    pub fn center(self, center_x: Option<f64>, center_y: Option<f64>) -> Self {
        Self {
            center_x,
            center_y,
            ..self
        }
    }
    /// Checks the histogram range, the ring removal center and the mask ratio
    pub fn validate(&self) -> Result<()> {
        let (lo, hi) = self.range;
        if !(lo.is_finite() && hi.is_finite() && lo < hi) {
            return Err(EntropyError::Range(lo, hi));
        }
        let (x, y) = (self.center_x.unwrap_or(0.), self.center_y.unwrap_or(0.));
        if !(x.is_finite() && y.is_finite()) {
            return Err(EntropyError::Center(x, y));
        }
        match self.mask_ratio {
            Some(ratio) if !(ratio > 0. && ratio <= 1.) => Err(EntropyError::MaskRatio(ratio)),
            _ => Ok(()),
        }
    }
}

/// Returns the Shannon entropy of the intensity histogram of `image`
///
/// The image is cropped to the window, cleaned of ring artifacts and masked,
/// according to `config`, before the histogram is computed.
/// Non-finite pixel values are counted as 0.
pub fn entropy(image: &Image, config: &EntropyConfig) -> Result<f64> {
    config.validate()?;
    let mut temp = match &config.window {
        Some(window) => window.crop(image)?,
        None => image.clone(),
    };
    if config.ring_removal {
        temp = remove_ring(&temp, config.center_x, config.center_y)?;
    }
    let (rows, cols) = temp.shape();
    let pixels: Vec<f64> = match config.mask_ratio {
        Some(ratio) => {
            let mask = make_mask(rows, cols, ratio);
            temp.iter()
                .zip(mask.iter())
                .filter_map(|(&x, &m)| m.then_some(x))
                .collect()
        }
        None => temp.iter().cloned().collect(),
    };
    if pixels.is_empty() {
        return Err(EntropyError::EmptyImage);
    }
    let mut hist = Histogram::new(config.range);
    hist.extend(
        pixels
            .into_iter()
            .map(|x| if x.is_finite() { x } else { 0. }),
    );
    Ok(hist.shannon_entropy())
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

    use super::*;

    fn config() -> EntropyConfig {
        EntropyConfig::default()
            .range(0., 1.)
            .mask_ratio(None)
            .ring_removal(false)
    }

    fn noisy(rows: usize, cols: usize, seed: u64) -> Image {
        let mut rng = StdRng::seed_from_u64(seed);
        Image::from_fn(rows, cols, |_, _| rng.gen::<f64>())
    }

    #[test]
    fn uniform_lower_than_noise() -> std::result::Result<(), EntropyError> {
        let uniform = Image::from_element(64, 64, 0.5);
        let noise = noisy(64, 64, 7);
        let (e_uniform, e_noise) = (entropy(&uniform, &config())?, entropy(&noise, &config())?);
        assert!(e_uniform < 1e-6);
        assert!(e_uniform < e_noise);
        assert!(e_noise > 9.);
        Ok(())
    }

    #[test]
    fn permutation_invariant() -> std::result::Result<(), EntropyError> {
        let image = noisy(32, 32, 3);
        let mut values: Vec<f64> = image.iter().cloned().collect();
        values.shuffle(&mut StdRng::seed_from_u64(11));
        let shuffled = Image::from_vec(32, 32, values);
        let (e, e_shuffled) = (entropy(&image, &config())?, entropy(&shuffled, &config())?);
        assert!((e - e_shuffled).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn caller_image_untouched() -> std::result::Result<(), EntropyError> {
        let mut image = noisy(16, 16, 5);
        image[(2, 2)] = f64::NAN;
        let copy = image.clone();
        entropy(&image, &EntropyConfig::default().range(0., 1.))?;
        assert!(image[(2, 2)].is_nan());
        assert_eq!(image.remove_row(2), copy.remove_row(2));
        Ok(())
    }

    #[test]
    fn non_finite_stays_finite() -> std::result::Result<(), EntropyError> {
        let mut image = noisy(32, 32, 1);
        image[(4, 4)] = f64::INFINITY;
        image[(5, 5)] = f64::NEG_INFINITY;
        image[(6, 6)] = f64::NAN;
        let e = entropy(&image, &config())?;
        assert!(e.is_finite() && e >= 0.);
        let e = entropy(&image, &EntropyConfig::default().range(0., 1.))?;
        assert!(e.is_finite() && e >= 0.);
        Ok(())
    }

    #[test]
    fn full_mask_finite() -> std::result::Result<(), EntropyError> {
        let image = noisy(32, 32, 9);
        let e = entropy(&image, &config().mask_ratio(Some(1.)))?;
        assert!(e.is_finite() && e > 0.);
        Ok(())
    }

    #[test]
    fn crop_noisy_border() -> std::result::Result<(), EntropyError> {
        let noise = noisy(64, 64, 21);
        let image = Image::from_fn(64, 64, |i, j| {
            if (8..56).contains(&i) && (8..56).contains(&j) {
                0.5
            } else {
                noise[(i, j)]
            }
        });
        let full = entropy(&image, &config())?;
        let cropped = entropy(
            &image,
            &config().window(Some(Window::new((8, 8), (56, 56)))),
        )?;
        assert!(cropped < full);
        assert!(cropped < 1e-6);
        Ok(())
    }

    #[test]
    fn mask_excludes_corners() -> std::result::Result<(), EntropyError> {
        let noise = noisy(64, 64, 13);
        let mask = make_mask(64, 64, 0.9);
        let image = Image::from_fn(64, 64, |i, j| if mask[(i, j)] { 0.25 } else { noise[(i, j)] });
        let masked = entropy(&image, &config().mask_ratio(Some(0.9)))?;
        let unmasked = entropy(&image, &config())?;
        assert!(masked < 1e-6);
        assert!(masked < unmasked);
        Ok(())
    }

    #[test]
    fn ring_removal_default_config() -> std::result::Result<(), EntropyError> {
        let image = Image::from_element(48, 48, 0.0011);
        let e = entropy(&image, &EntropyConfig::default())?;
        assert!(e.is_finite() && e < 1e-6);
        Ok(())
    }

    #[test]
    fn invalid_inputs() {
        let image = Image::from_element(16, 16, 0.5);
        assert!(matches!(
            entropy(&image, &config().mask_ratio(Some(0.))),
            Err(EntropyError::MaskRatio(_))
        ));
        assert!(matches!(
            entropy(&image, &config().mask_ratio(Some(1.5))),
            Err(EntropyError::MaskRatio(_))
        ));
        assert!(matches!(
            entropy(&image, &config().range(1., 0.)),
            Err(EntropyError::Range(..))
        ));
        assert!(matches!(
            entropy(&image, &config().range(0., f64::NAN)),
            Err(EntropyError::Range(..))
        ));
        assert!(matches!(
            entropy(&image, &config().window(Some(Window::new((4, 4), (4, 10))))),
            Err(EntropyError::Window { .. })
        ));
        assert!(matches!(
            entropy(&image, &config().window(Some(Window::new((0, 0), (17, 10))))),
            Err(EntropyError::Window { .. })
        ));
        assert!(matches!(
            entropy(&Image::zeros(0, 0), &config()),
            Err(EntropyError::EmptyImage)
        ));
    }

    #[test]
    fn ring_center_out_of_reach() {
        let image = noisy(16, 16, 17);
        let ringed = config().ring_removal(true);
        for (x, y) in [
            (Some(f64::INFINITY), None),
            (None, Some(f64::NAN)),
            (Some(1e13), Some(0.)),
            (Some(8.), Some(-1e9)),
        ] {
            assert!(
                matches!(
                    entropy(&image, &ringed.clone().center(x, y)),
                    Err(EntropyError::Center(..))
                ),
                "center ({x:?},{y:?})"
            );
        }
        assert!(entropy(&image, &ringed.center(Some(-10.), Some(30.))).is_ok());
    }
}
