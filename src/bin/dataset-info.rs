//! HDF5 dataset dimensions
//!
//! Prints the dimensions of the `exchange` datasets of the given HDF5 files,
//! or of the first `*.h5` file in the current folder.

use std::path::PathBuf;

use anyhow::Context;
use automo::dataset::dataset_info;
use glob::glob;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "dataset-info", about = "HDF5 tomography dataset dimensions")]
struct Opt {
    /// HDF5 files
    #[structopt(parse(from_os_str))]
    files: Vec<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let files = if opt.files.is_empty() {
        let mut h5_files = glob("*.h5")?.collect::<Result<Vec<PathBuf>, _>>()?;
        h5_files.sort();
        let first = h5_files
            .into_iter()
            .next()
            .context("no HDF5 file in the current folder")?;
        log::info!("auto file name: {:?}", first);
        vec![first]
    } else {
        opt.files
    };

    for file in files {
        let info = dataset_info(&file)?;
        println!("{}:\n{}", file.display(), info);
    }
    Ok(())
}
