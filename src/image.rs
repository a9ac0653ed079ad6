//! Reconstructed slice I/O
//!
//! Slices are held as [`Image`], a dense `f64` matrix with one row per image line.
//! TIFF (`.tif`, `.tiff`) and NumPy (`.npy`) files are supported.

use std::{
    fs::{self, File},
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr,
};

use nalgebra::DMatrix;
use npyz::{NpyFile, Order};
use tiff::{
    decoder::{Decoder, DecodingResult},
    encoder::{colortype, TiffEncoder},
    ColorType,
};

/// A 2D image: rows × columns of real-valued intensities
pub type Image = DMatrix<f64>;

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to open {0:?}")]
    Io(#[source] std::io::Error, PathBuf),
    #[error("failed to decode TIFF file")]
    Tiff(#[from] tiff::TiffError),
    #[error("failed to decode NPY file")]
    Npy(#[source] std::io::Error),
    #[error("unsupported image file extension: {0:?}")]
    Format(PathBuf),
    #[error("expected a single channel gray image, found {0:?}")]
    Color(ColorType),
    #[error("expected a 2D array, found shape {0:?}")]
    Shape(Vec<u64>),
    #[error("unsupported sample type")]
    SampleType,
    #[error("image buffer holds {found} samples, expected {expected}")]
    Size { expected: usize, found: usize },
}
type Result<T> = std::result::Result<T, ImageError>;

/// Image file formats recognized from the file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ImageFormat {
    #[strum(serialize = "tiff", serialize = "tif")]
    Tiff,
    #[strum(serialize = "npy")]
    Npy,
}
impl ImageFormat {
    /// Guesses the format from the extension of `path`
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ImageFormat::from_str(ext).ok())
    }
}

/// Loads an image, the format is inferred from the file extension
pub fn read_image<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    match ImageFormat::from_path(path) {
        Some(ImageFormat::Tiff) => read_tiff(path),
        Some(ImageFormat::Npy) => read_npy(path),
        None => Err(ImageError::Format(path.to_path_buf())),
    }
}

fn to_f64<T: Copy + Into<f64>>(buf: Vec<T>) -> Vec<f64> {
    buf.into_iter().map(|x| x.into()).collect()
}

/// Loads a single channel TIFF image
///
/// Samples are converted to `f64` as they are, integer data is not rescaled.
pub fn read_tiff<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| ImageError::Io(e, path.to_path_buf()))?;
    let mut decoder = Decoder::new(BufReader::new(file))?;
    let (width, height) = decoder.dimensions()?;
    let color_type = decoder.colortype()?;
    if !matches!(color_type, ColorType::Gray(_)) {
        return Err(ImageError::Color(color_type));
    }
    let data: Vec<f64> = match decoder.read_image()? {
        DecodingResult::U8(buf) => to_f64(buf),
        DecodingResult::U16(buf) => to_f64(buf),
        DecodingResult::U32(buf) => to_f64(buf),
        DecodingResult::U64(buf) => buf.into_iter().map(|x| x as f64).collect(),
        DecodingResult::I8(buf) => to_f64(buf),
        DecodingResult::I16(buf) => to_f64(buf),
        DecodingResult::I32(buf) => to_f64(buf),
        DecodingResult::I64(buf) => buf.into_iter().map(|x| x as f64).collect(),
        DecodingResult::F32(buf) => to_f64(buf),
        DecodingResult::F64(buf) => buf,
        #[allow(unreachable_patterns)]
        _ => return Err(ImageError::SampleType),
    };
    let (rows, cols) = (height as usize, width as usize);
    if data.len() != rows * cols {
        return Err(ImageError::Size {
            expected: rows * cols,
            found: data.len(),
        });
    }
    log::debug!("{:?}: {}x{} TIFF", path, rows, cols);
    Ok(Image::from_row_slice(rows, cols, &data))
}

/// Loads a 2D `f64` or `f32` NumPy array
pub fn read_npy<P: AsRef<Path>>(path: P) -> Result<Image> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| ImageError::Io(e, path.to_path_buf()))?;
    let npy = NpyFile::new(&bytes[..]).map_err(ImageError::Npy)?;
    let shape = npy.shape().to_vec();
    let order = npy.order();
    let [rows, cols] = shape[..] else {
        return Err(ImageError::Shape(shape));
    };
    let (rows, cols) = (rows as usize, cols as usize);
    let data = match npy.into_vec::<f64>() {
        Ok(data) => data,
        Err(_) => NpyFile::new(&bytes[..])
            .and_then(|npy| npy.into_vec::<f32>())
            .map(to_f64)
            .map_err(ImageError::Npy)?,
    };
    if data.len() != rows * cols {
        return Err(ImageError::Size {
            expected: rows * cols,
            found: data.len(),
        });
    }
    log::debug!("{:?}: {}x{} NPY", path, rows, cols);
    Ok(match order {
        Order::C => Image::from_row_slice(rows, cols, &data),
        Order::Fortran => Image::from_column_slice(rows, cols, &data),
    })
}

/// Writes an image as a 32 bits float gray TIFF file
pub fn write_tiff<P: AsRef<Path>>(path: P, image: &Image) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| ImageError::Io(e, path.to_path_buf()))?;
    let mut encoder = TiffEncoder::new(file)?;
    // row major samples
    let data: Vec<f32> = image.transpose().iter().map(|&x| x as f32).collect();
    encoder.write_image::<colortype::Gray32Float>(
        image.ncols() as u32,
        image.nrows() as u32,
        &data,
    )?;
    Ok(())
}
