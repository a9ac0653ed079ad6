//! HDF5 tomography datasets
//!
//! The projections, flat and dark fields and angles are stored in the `exchange` group.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use hdf5::File;
use serde::Serialize;

use crate::sweep::DatasetShape;

pub const TOMO: &str = "exchange/data";
pub const FLAT: &str = "exchange/data_white";
pub const DARK: &str = "exchange/data_dark";
pub const THETA: &str = "exchange/theta";
pub const THETA_FLAT: &str = "exchange/theta_white";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to open HDF5 file {0:?}")]
    Open(#[source] hdf5::Error, PathBuf),
    #[error("{path:?} has no {dataset:?} dataset")]
    Missing { path: PathBuf, dataset: String },
    #[error("expected a 3D projection dataset, found shape {0:?}")]
    Shape(Vec<usize>),
}
type Result<T> = std::result::Result<T, DatasetError>;

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| DatasetError::Open(e, path.to_path_buf()))
}

/// Returns the dimensions of `dataset` or `None` if the dataset does not exist
pub fn h5group_dims<P: AsRef<Path>>(path: P, dataset: &str) -> Result<Option<Vec<usize>>> {
    let file = open(path.as_ref())?;
    Ok(file.dataset(dataset).ok().map(|d| d.shape()))
}

/// Dimensions of the `exchange` datasets
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DatasetInfo {
    pub tomo: Option<Vec<usize>>,
    pub flat: Option<Vec<usize>>,
    pub dark: Option<Vec<usize>>,
    pub theta: Option<Vec<usize>>,
    pub theta_flat: Option<Vec<usize>>,
}
impl DatasetInfo {
    /// Shape of the projection dataset
    pub fn shape(&self, path: &Path) -> Result<DatasetShape> {
        let tomo = self.tomo.as_ref().ok_or_else(|| DatasetError::Missing {
            path: path.to_path_buf(),
            dataset: TOMO.to_string(),
        })?;
        match tomo[..] {
            [n_proj, n_sino, n_col] => Ok([n_proj, n_sino, n_col]),
            _ => Err(DatasetError::Shape(tomo.clone())),
        }
    }
}
impl fmt::Display for DatasetInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, dims) in [
            ("tomo", &self.tomo),
            ("flat", &self.flat),
            ("dark", &self.dark),
            ("theta", &self.theta),
            ("theta_flat", &self.theta_flat),
        ] {
            match dims {
                Some(dims) => writeln!(f, " - {:<10}: {:?}", name, dims)?,
                None => writeln!(f, " - {:<10}: missing", name)?,
            }
        }
        Ok(())
    }
}

/// Reads the dimensions of the projections, flat and dark fields, and angles
pub fn dataset_info<P: AsRef<Path>>(path: P) -> Result<DatasetInfo> {
    let path = path.as_ref();
    let file = open(path)?;
    let dims = |name: &str| file.dataset(name).ok().map(|d| d.shape());
    let info = DatasetInfo {
        tomo: dims(TOMO),
        flat: dims(FLAT),
        dark: dims(DARK),
        theta: dims(THETA),
        theta_flat: dims(THETA_FLAT),
    };
    log::info!("{:?}:\n{}", path, info);
    Ok(info)
}

/// Returns the projection dataset shape `[# of projections, # of sinograms, # of columns]`
pub fn dataset_shape<P: AsRef<Path>>(path: P) -> Result<DatasetShape> {
    let path = path.as_ref();
    dataset_info(path)?.shape(path)
}
