//! Folder and file helpers

use std::{
    fs::{self, OpenOptions},
    io::{self, Write},
    path::{Path, PathBuf, MAIN_SEPARATOR},
    time::SystemTime,
};

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, thiserror::Error)]
pub enum FolderError {
    #[error("failed to create folder {0:?}")]
    Create(#[source] io::Error, PathBuf),
    #[error("failed to access {0:?}")]
    Io(#[source] io::Error, PathBuf),
    #[error("invalid character filter")]
    Regex(#[from] regex::Error),
}
type Result<T> = std::result::Result<T, FolderError>;

fn clean(entry: &str, allowed: &str) -> Result<String> {
    let re = Regex::new(&format!("[^{}]", allowed))?;
    let ascii: String = entry.nfkd().filter(char::is_ascii).collect();
    Ok(re.replace_all(&ascii, "").into_owned())
}

/// Removes the characters that are not compatible with a folder name
///
/// Accented letters are replaced by their base letter, only ASCII letters,
/// digits, `-` and `_` are kept.
pub fn clean_entry(entry: &str) -> Result<String> {
    clean(entry, r"\-_A-Za-z0-9")
}

/// Removes the characters that are not compatible with a folder path
///
/// Same as [`clean_entry`] but the path separator is kept.
pub fn clean_folder_name(directory: &str) -> Result<String> {
    clean(
        directory,
        &format!(r"\-_A-Za-z0-9{}", regex::escape(&MAIN_SEPARATOR.to_string())),
    )
}

/// Checks that `directory` exists, creating it if `create` is set
///
/// Returns `false` if the folder does not exist and was not created.
pub fn try_folder<P: AsRef<Path>>(directory: P, create: bool) -> Result<bool> {
    let directory = directory.as_ref();
    if directory.is_dir() {
        return Ok(true);
    }
    if !create {
        log::warn!("{:?} does not exist", directory);
        return Ok(false);
    }
    fs::create_dir_all(directory).map_err(|e| FolderError::Create(e, directory.to_path_buf()))?;
    log::info!("created {:?}", directory);
    Ok(true)
}

/// Creates an empty file or updates its modification time
pub fn touch<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e| FolderError::Io(e, path.to_path_buf());
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.set_modified(SystemTime::now()).map_err(io_err)?;
    Ok(())
}

/// Appends `text` to the file at `path`, creating the file if needed
pub fn append<P: AsRef<Path>>(path: P, text: &str) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e| FolderError::Io(e, path.to_path_buf());
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    file.write_all(text.as_bytes()).map_err(io_err)
}
