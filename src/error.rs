#[cfg(feature = "hdf5")]
use crate::dataset::DatasetError;
use crate::{
    entropy::EntropyError, folder::FolderError, image::ImageError, selector::SelectorError,
    sweep::SweepError,
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `image` module")]
    Image(#[from] ImageError),
    #[error("Error in the `entropy` module")]
    Entropy(#[from] EntropyError),
    #[error("Error in the `selector` module")]
    Selector(#[from] SelectorError),
    #[error("Error in the `sweep` module")]
    Sweep(#[from] SweepError),
    #[error("Error in the `folder` module")]
    Folder(#[from] FolderError),
    #[cfg(feature = "hdf5")]
    #[error("Error in the `dataset` module")]
    Dataset(#[from] DatasetError),
}
