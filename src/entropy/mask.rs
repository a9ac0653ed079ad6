use nalgebra::DMatrix;

/// Centered circular mask
///
/// The mask radius is `ratio` times half the smallest image dimension, the
/// pixel coordinates are taken at the pixel centers.
pub fn make_mask(rows: usize, cols: usize, ratio: f64) -> DMatrix<bool> {
    let (rad_r, rad_c) = (rows as f64 / 2., cols as f64 / 2.);
    let r = rad_r.min(rad_c);
    let r2 = ratio * ratio * r * r;
    DMatrix::from_fn(rows, cols, |i, j| {
        let y = i as f64 + 0.5 - rad_r;
        let x = j as f64 + 0.5 - rad_c;
        x * x + y * y < r2
    })
}
