//! Rotation center sweep
//!
//! A sweep reconstructs a few sinogram slices for a series of rotation centers
//! and writes each reconstruction as `center/<slice>/<center>.tiff`.
//! The reconstructions themselves are done by an external library, this module
//! only decides which slices and which centers to reconstruct, where the
//! reconstructions go, and how to read the chosen center back.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

/// Distance from the detector edges of the first and last slices of a multi-slice sweep
pub const SLICE_MARGIN: i64 = 200;
/// Half width of the default rotation center range [pixel]
pub const CENTER_HALF_RANGE: i64 = 30;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SweepError {
    #[error("the number of slices must be positive, found {0}")]
    SliceCount(i64),
    #[error("no slice between {start} and {end}")]
    NoSlice { start: i64, end: i64 },
    #[error("invalid center range [{0},{1}[ with step {2}")]
    CenterRange(f64, f64, f64),
    #[error("{0:?} is not a center reconstruction file")]
    CenterFile(PathBuf),
}
type Result<T> = std::result::Result<T, SweepError>;

/// Shape of a projection dataset: `[# of projections, # of sinograms, # of columns]`
pub type DatasetShape = [usize; 3];

/// Sweep request
///
/// `slice_start = -1` requests `n_slice` slices evenly spread over the detector,
/// otherwise the single slice `slice_start` is used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CenterSweep {
    pub rot_start: i64,
    pub rot_end: i64,
    pub rot_step: i64,
    pub slice_start: i64,
    pub n_slice: i64,
    /// downsampling level, the center range is divided by `2^level`
    pub level: u32,
    /// sinogram padding [pixel]
    pub pad_length: usize,
}
impl Default for CenterSweep {
    fn default() -> Self {
        Self {
            rot_start: -1,
            rot_end: -1,
            rot_step: 1,
            slice_start: -1,
            n_slice: 1,
            level: 0,
            pad_length: 1000,
        }
    }
}

/// Slices and rotation centers of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPlan {
    /// sinogram slice range `start..end` with `step`
    pub slices: (i64, i64, i64),
    /// rotation center range at full resolution: start, end, step
    pub rotation: (i64, i64, i64),
    /// rotation center range at the downsampled resolution: start, end, step
    pub center_range: (f64, f64, f64),
    pub pad_length: usize,
}

impl CenterSweep {
    /// Computes the sweep plan for a dataset of the given shape
    ///
    /// Out of range rotation centers fall back to the detector center ± [`CENTER_HALF_RANGE`],
    /// an out of range single slice falls back to the detector middle slice.
    pub fn plan(&self, shape: DatasetShape) -> Result<SweepPlan> {
        let n_sino = shape[1] as i64;
        let n_col = shape[2] as i64;

        let (mut sino_start, mut sino_end, sino_step) = if self.slice_start == -1 {
            if self.n_slice <= 0 {
                return Err(SweepError::SliceCount(self.n_slice));
            }
            let (start, end) = (SLICE_MARGIN, n_sino - SLICE_MARGIN);
            (start, end, (end - start) / self.n_slice + 1)
        } else {
            (self.slice_start, self.slice_start + 1, 1)
        };

        let (mut rot_start, mut rot_end) = (self.rot_start, self.rot_end);
        if rot_start < 0 || rot_end > n_col {
            let rot_center = n_col / 2;
            log::warn!(
                "rotation range [{},{}] out of the detector, using {}±{}",
                rot_start,
                rot_end,
                rot_center,
                CENTER_HALF_RANGE
            );
            rot_start = rot_center - CENTER_HALF_RANGE;
            rot_end = rot_center + CENTER_HALF_RANGE;
        }
        let rot_step = if self.rot_step <= 0 || self.rot_step > rot_end - rot_start {
            1
        } else {
            self.rot_step
        };

        if sino_start < 0 || sino_start > n_sino {
            log::warn!("slice {} out of the detector, using the middle slice", sino_start);
            sino_start = n_sino / 2;
            if self.slice_start != -1 {
                sino_end = sino_start + 1;
            }
        }
        if sino_end <= sino_start {
            return Err(SweepError::NoSlice {
                start: sino_start,
                end: sino_end,
            });
        }

        let scale = 2f64.powi(self.level as i32);
        let center_range = (
            rot_start as f64 / scale,
            rot_end as f64 / scale,
            rot_step as f64 / scale,
        );
        let plan = SweepPlan {
            slices: (sino_start, sino_end, sino_step),
            rotation: (rot_start, rot_end, rot_step),
            center_range,
            pad_length: self.pad_length,
        };
        if plan.centers().is_empty() {
            return Err(SweepError::CenterRange(
                center_range.0,
                center_range.1,
                center_range.2,
            ));
        }
        Ok(plan)
    }
}

impl SweepPlan {
    /// Sinogram slice indices
    pub fn slices(&self) -> Vec<usize> {
        let (start, end, step) = self.slices;
        (start..end)
            .step_by(step.max(1) as usize)
            .map(|i| i as usize)
            .collect()
    }
    /// Candidate rotation centers `start, start+step, ... < end`
    pub fn centers(&self) -> Vec<f64> {
        let (start, end, step) = self.center_range;
        if !(step > 0.) || !(end > start) {
            return vec![];
        }
        let n = ((end - start) / step).ceil() as usize;
        (0..n).map(|i| start + i as f64 * step).collect()
    }
    /// Folder with the reconstructions of a given slice: `<root>/center/<slice>`
    pub fn slice_dir<P: AsRef<Path>>(root: P, slice: usize) -> PathBuf {
        root.as_ref().join("center").join(slice.to_string())
    }
}

impl fmt::Display for SweepPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "slices: {:?}", self.slices())?;
        writeln!(f, "rotation range: {:?}", self.rotation)?;
        writeln!(
            f,
            "center range: {:?} ({} centers)",
            self.center_range,
            self.centers().len()
        )?;
        writeln!(f, "sinogram padding: {} pixels", self.pad_length)
    }
}

/// Reconstruction file of a rotation center: `<dir>/<center:.2>.tiff`
pub fn center_file<P: AsRef<Path>>(dir: P, center: f64) -> PathBuf {
    dir.as_ref().join(format!("{:.2}.tiff", center))
}

/// Reads the rotation center back from a reconstruction file name
pub fn center_from_path<P: AsRef<Path>>(path: P) -> Result<f64> {
    let path = path.as_ref();
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .and_then(|stem| stem.parse::<f64>().ok())
        .filter(|center| center.is_finite())
        .ok_or_else(|| SweepError::CenterFile(path.to_path_buf()))
}

/// Returns the values with the largest number of neighbors closer than `radius`
pub fn most_neighbor_clustering(data: &[f64], radius: f64) -> Vec<f64> {
    let counter: Vec<usize> = data
        .iter()
        .map(|&i| {
            data.iter()
                .filter(|&&j| j != i && (j - i).abs() < radius)
                .count()
        })
        .collect();
    let Some(&max) = counter.iter().max() else {
        return vec![];
    };
    data.iter()
        .zip(&counter)
        .filter_map(|(&x, &c)| (c == max).then_some(x))
        .collect()
}
