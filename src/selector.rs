//! Minimum entropy selection
//!
//! Reconstructions of a slice for a series of rotation centers are saved in a
//! folder; the candidate with the lowest [entropy](crate::entropy::entropy) is
//! the best focused one.

use std::{
    fmt,
    path::{Path, PathBuf},
    time::Instant,
};

use glob::{glob, Pattern};
use itertools::Itertools;
use serde::Serialize;

use crate::{
    entropy::{entropy, EntropyConfig, EntropyError},
    image::{read_image, ImageError},
};

#[derive(Debug, thiserror::Error)]
pub enum SelectorError {
    #[error("invalid file pattern")]
    Pattern(#[from] glob::PatternError),
    #[error("failed to list the candidate files")]
    Glob(#[from] glob::GlobError),
    #[error("no candidates found in {folder:?} matching {pattern:?}")]
    NoCandidates { folder: PathBuf, pattern: String },
    #[error("failed to load candidate {0:?}")]
    Image(PathBuf, #[source] ImageError),
    #[error("failed to compute entropy of candidate {0:?}")]
    Entropy(PathBuf, #[source] EntropyError),
    #[error("failed to write the entropy report")]
    Report(#[from] csv::Error),
}
type Result<T> = std::result::Result<T, SelectorError>;

/// A candidate file and its entropy
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateEntropy {
    pub path: PathBuf,
    pub entropy: f64,
}
impl CandidateEntropy {
    /// Loads the image at `path` and computes its entropy
    pub fn evaluate<P: AsRef<Path>>(path: P, config: &EntropyConfig) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let image = read_image(&path).map_err(|e| SelectorError::Image(path.clone(), e))?;
        let entropy =
            entropy(&image, config).map_err(|e| SelectorError::Entropy(path.clone(), e))?;
        log::debug!("{:?}: {:.6}", path, entropy);
        Ok(Self { path, entropy })
    }
}
impl fmt::Display for CandidateEntropy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<32} {:>12.6}", self.path.display(), self.entropy)
    }
}

/// Candidate files sorted by path
#[derive(Debug, Clone)]
pub struct Candidates {
    folder: PathBuf,
    paths: Vec<PathBuf>,
}
impl Candidates {
    /// Lists the files in `folder` matching the glob `pattern`
    ///
    /// The list is sorted so the selection does not depend on the filesystem ordering.
    /// Only `pattern` is a glob, `folder` is matched literally.
    pub fn list<P: AsRef<Path>>(folder: P, pattern: &str) -> Result<Self> {
        let folder = folder.as_ref().to_path_buf();
        let query = Path::new(&Pattern::escape(&folder.to_string_lossy())).join(pattern);
        let mut paths = glob(&query.to_string_lossy())?
            .map(|entry| entry.map_err(SelectorError::from))
            .filter_ok(|path| path.is_file())
            .collect::<Result<Vec<PathBuf>>>()?;
        if paths.is_empty() {
            return Err(SelectorError::NoCandidates {
                folder,
                pattern: pattern.to_string(),
            });
        }
        paths.sort();
        log::info!("{} candidates in {:?}", paths.len(), folder);
        Ok(Self { folder, paths })
    }
    pub fn folder(&self) -> &Path {
        &self.folder
    }
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
    pub fn len(&self) -> usize {
        self.paths.len()
    }
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.paths.iter()
    }
    /// Computes the entropy of every candidate, one after the other
    pub fn evaluate(&self, config: &EntropyConfig) -> Result<Vec<CandidateEntropy>> {
        let now = Instant::now();
        let entropies = self
            .iter()
            .map(|path| CandidateEntropy::evaluate(path, config))
            .collect::<Result<Vec<_>>>()?;
        log::info!("... evaluated in {:.3}s", now.elapsed().as_secs_f64());
        Ok(entropies)
    }
}
impl<'a> IntoIterator for &'a Candidates {
    type Item = &'a PathBuf;
    type IntoIter = std::slice::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.paths.iter()
    }
}

/// Returns the candidate with the lowest entropy
///
/// Ties are resolved in favor of the first one.
pub fn select_minimum(entropies: &[CandidateEntropy]) -> Option<&CandidateEntropy> {
    entropies
        .iter()
        .position_min_by(|a, b| a.entropy.total_cmp(&b.entropy))
        .map(|i| &entropies[i])
}

/// Returns the file in `folder` matching `pattern` with the lowest entropy
pub fn minimum_entropy<P: AsRef<Path>>(
    folder: P,
    pattern: &str,
    config: &EntropyConfig,
) -> Result<PathBuf> {
    let folder = folder.as_ref();
    let candidates = Candidates::list(folder, pattern)?;
    let entropies = candidates.evaluate(config)?;
    let best = select_minimum(&entropies).ok_or_else(|| SelectorError::NoCandidates {
        folder: folder.to_path_buf(),
        pattern: pattern.to_string(),
    })?;
    log::info!("minimum entropy: {}", best);
    Ok(best.path.clone())
}

/// Minimum entropy selection builder
///
/// ```no_run
/// use automo::MinimumEntropy;
///
/// let best = MinimumEntropy::default()
///     .folder("center/1024")
///     .pattern("*.tiff")
///     .select()?;
/// # Ok::<(), automo::selector::SelectorError>(())
/// ```
#[derive(Debug, Clone)]
pub struct MinimumEntropy {
    folder: PathBuf,
    pattern: String,
    config: EntropyConfig,
}
impl Default for MinimumEntropy {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("."),
            pattern: String::from("*.tiff"),
            config: EntropyConfig::default(),
        }
    }
}
impl MinimumEntropy {
    pub fn folder<P: AsRef<Path>>(self, folder: P) -> Self {
        Self {
            folder: folder.as_ref().to_path_buf(),
            ..self
        }
    }
    pub fn pattern<S: Into<String>>(self, pattern: S) -> Self {
        Self {
            pattern: pattern.into(),
            ..self
        }
    }
    pub fn config(self, config: EntropyConfig) -> Self {
        Self { config, ..self }
    }
    pub fn select(&self) -> Result<PathBuf> {
        minimum_entropy(&self.folder, &self.pattern, &self.config)
    }
}

/// Writes the candidates entropy as a CSV file
pub fn write_report<P: AsRef<Path>>(entropies: &[CandidateEntropy], path: P) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for entry in entropies {
        wtr.serialize(entry)?;
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{error::Error, fs};

    use assert_fs::TempDir;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    use super::*;
    use crate::{image::write_tiff, Image};

    fn candidate(name: &str, entropy: f64) -> CandidateEntropy {
        CandidateEntropy {
            path: PathBuf::from(name),
            entropy,
        }
    }

    fn config() -> EntropyConfig {
        EntropyConfig::default().range(0., 1.).ring_removal(false)
    }

    /// Writes a constant slice with `n_noisy` random pixels
    fn write_slice(dir: &Path, name: &str, n_noisy: usize, seed: u64) -> Result<PathBuf> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut image = Image::from_element(32, 32, 0.5);
        for _ in 0..n_noisy {
            let (i, j) = (rng.gen_range(8..24), rng.gen_range(8..24));
            image[(i, j)] = rng.gen::<f64>();
        }
        let path = dir.join(name);
        write_tiff(&path, &image).map_err(|e| SelectorError::Image(path.clone(), e))?;
        Ok(path)
    }

    #[test]
    fn synthetic_minimum() {
        let entropies = vec![candidate("A", 0.5), candidate("B", 0.2), candidate("C", 0.8)];
        assert_eq!(select_minimum(&entropies).map(|c| c.path.clone()), Some("B".into()));
    }

    #[test]
    fn ties_go_first() {
        let entropies = vec![candidate("A", 0.3), candidate("B", 0.1), candidate("C", 0.1)];
        assert_eq!(select_minimum(&entropies).map(|c| c.path.clone()), Some("B".into()));
        assert_eq!(select_minimum(&[]), None);
    }

    #[test]
    fn empty_folder() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("notes.txt"), "not an image")?;
        match minimum_entropy(dir.path(), "*.tiff", &config()) {
            Err(SelectorError::NoCandidates { pattern, .. }) => assert_eq!(pattern, "*.tiff"),
            other => panic!("expected no candidates, found {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn sharpest_slice() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        write_slice(dir.path(), "1010.00.tiff", 120, 1)?;
        let best = write_slice(dir.path(), "1012.00.tiff", 4, 2)?;
        write_slice(dir.path(), "1014.00.tiff", 60, 3)?;
        assert_eq!(minimum_entropy(dir.path(), "*.tiff", &config())?, best);
        let builder = MinimumEntropy::default()
            .folder(dir.path())
            .pattern("*.tiff")
            .config(config());
        assert_eq!(builder.select()?, best);
        Ok(())
    }

    #[test]
    fn sorted_candidates() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        for name in ["c.tiff", "a.tiff", "b.tiff"] {
            write_slice(dir.path(), name, 0, 0)?;
        }
        let candidates = Candidates::list(dir.path(), "*.tiff")?;
        let names: Vec<_> = candidates
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.tiff", "b.tiff", "c.tiff"]);
        // identical slices: the first one wins
        let best = minimum_entropy(dir.path(), "*.tiff", &config())?;
        assert_eq!(best, dir.path().join("a.tiff"));
        Ok(())
    }

    #[test]
    fn folder_with_glob_characters() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let scan = dir.path().join("scan[1]*");
        fs::create_dir(&scan)?;
        write_slice(&scan, "1262.00.tiff", 0, 0)?;
        // would match the `scan[1]*` pattern if the folder were not escaped
        let decoy = dir.path().join("scan1");
        fs::create_dir(&decoy)?;
        write_slice(&decoy, "1262.00.tiff", 0, 0)?;
        let candidates = Candidates::list(&scan, "*.tiff")?;
        assert_eq!(candidates.paths(), [scan.join("1262.00.tiff")]);
        assert_eq!(minimum_entropy(&scan, "*.tiff", &config())?, scan.join("1262.00.tiff"));
        Ok(())
    }

    #[test]
    fn unreadable_candidate() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        write_slice(dir.path(), "a.tiff", 0, 0)?;
        let broken = dir.path().join("b.tiff");
        fs::write(&broken, "not a tiff")?;
        match minimum_entropy(dir.path(), "*.tiff", &config()) {
            Err(SelectorError::Image(path, _)) => assert_eq!(path, broken),
            other => panic!("expected an image error, found {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn invalid_config_names_candidate() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let path = write_slice(dir.path(), "a.tiff", 0, 0)?;
        let config = config().mask_ratio(Some(2.));
        match minimum_entropy(dir.path(), "*.tiff", &config) {
            Err(SelectorError::Entropy(p, EntropyError::MaskRatio(_))) => assert_eq!(p, path),
            other => panic!("expected an entropy error, found {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn csv_report() -> std::result::Result<(), Box<dyn Error>> {
        let dir = TempDir::new()?;
        let report = dir.path().join("entropy.csv");
        write_report(&[candidate("A", 0.5), candidate("B", 0.25)], &report)?;
        let contents = fs::read_to_string(report)?;
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines, ["path,entropy", "A,0.5", "B,0.25"]);
        Ok(())
    }
}
