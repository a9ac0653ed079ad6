//! Rotation center sweep
//!
//! `center plan` lists the slices and candidate centers to reconstruct and
//! prepares the `center/<slice>` folders; once the test reconstructions are
//! written there, `center pick` selects the minimum entropy center of every
//! slice and the consensus center across slices.

use std::path::PathBuf;

use anyhow::{bail, Context};
use automo::{
    folder::{append, try_folder},
    minimum_entropy,
    sweep::{center_file, center_from_path, most_neighbor_clustering, CenterSweep, SweepPlan},
    EntropyConfig,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "center", about = "Rotation center sweep")]
enum Opt {
    /// Plans the sweep: slices, candidate centers and output folders
    Plan(PlanOpt),
    /// Picks the minimum entropy center of each slice
    Pick(PickOpt),
}

#[derive(Debug, StructOpt)]
struct PlanOpt {
    /// Dataset shape: # of projections, # of sinograms, # of columns
    #[structopt(long, use_delimiter = true, required_unless = "file")]
    shape: Option<Vec<usize>>,
    /// HDF5 dataset the shape is read from
    #[structopt(long, parse(from_os_str))]
    file: Option<PathBuf>,
    /// Rotation center range start, -1 for the default range
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    rot_start: i64,
    /// Rotation center range end, -1 for the default range
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    rot_end: i64,
    /// Rotation center step
    #[structopt(long, default_value = "1", allow_hyphen_values = true)]
    rot_step: i64,
    /// Single slice, -1 for `n_slice` slices over the detector
    #[structopt(long, default_value = "-1", allow_hyphen_values = true)]
    slice_start: i64,
    /// Number of slices
    #[structopt(long, default_value = "1", allow_hyphen_values = true)]
    n_slice: i64,
    /// Downsampling level
    #[structopt(long, default_value = "0")]
    level: u32,
    /// Sinogram padding
    #[structopt(long, default_value = "1000")]
    padding: usize,
    /// Root folder of the `center` reconstructions
    #[structopt(long, default_value = ".", parse(from_os_str))]
    root: PathBuf,
    /// Creates the slice folders
    #[structopt(long)]
    mkdir: bool,
    /// Appends the plan to this file
    #[structopt(long, parse(from_os_str))]
    log: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
struct PickOpt {
    /// Root folder of the `center` reconstructions
    #[structopt(long, default_value = ".", parse(from_os_str))]
    root: PathBuf,
    /// Slices to pick the center from
    #[structopt(long, use_delimiter = true)]
    slices: Vec<usize>,
    /// Histogram lower bound
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    min: f64,
    /// Histogram upper bound
    #[structopt(long, default_value = "0.002", allow_hyphen_values = true)]
    max: f64,
    /// Circular mask radius as a fraction of half the image size
    #[structopt(long, default_value = "0.9")]
    mask_ratio: f64,
    /// Skip the ring artifacts removal
    #[structopt(long)]
    no_ring_removal: bool,
    /// Neighborhood radius of the consensus center [pixel]
    #[structopt(long, default_value = "2")]
    radius: f64,
}

#[cfg(feature = "hdf5")]
fn file_shape(file: &std::path::Path) -> anyhow::Result<[usize; 3]> {
    Ok(automo::dataset::dataset_shape(file)?)
}
#[cfg(not(feature = "hdf5"))]
fn file_shape(file: &std::path::Path) -> anyhow::Result<[usize; 3]> {
    bail!(
        "reading the shape of {:?} requires the `hdf5` feature, use `--shape` instead",
        file
    )
}

fn plan(opt: PlanOpt) -> anyhow::Result<()> {
    let shape = match (opt.shape.as_deref(), &opt.file) {
        (Some(&[n_proj, n_sino, n_col]), _) => [n_proj, n_sino, n_col],
        (Some(shape), _) => bail!("expected 3 dimensions, found {:?}", shape),
        (None, Some(file)) => file_shape(file)?,
        (None, None) => bail!("either `--shape` or `--file` is required"),
    };
    let sweep = CenterSweep {
        rot_start: opt.rot_start,
        rot_end: opt.rot_end,
        rot_step: opt.rot_step,
        slice_start: opt.slice_start,
        n_slice: opt.n_slice,
        level: opt.level,
        pad_length: opt.padding,
    };
    let plan = sweep.plan(shape)?;
    let centers = plan.centers();

    let mut summary = format!("dataset shape: {:?}\n{}", shape, plan);
    for slice in plan.slices() {
        let dir = SweepPlan::slice_dir(&opt.root, slice);
        if opt.mkdir && !try_folder(&dir, true)? {
            bail!("failed to create {:?}", dir);
        }
        summary.push_str(&format!(
            "slice {:>5}: {:?} .. {:?}\n",
            slice,
            centers.first().map(|&c| center_file(&dir, c)),
            centers.last().map(|&c| center_file(&dir, c)),
        ));
    }
    print!("{}", summary);
    if let Some(log) = &opt.log {
        append(log, &summary)?;
    }
    Ok(())
}

fn pick(opt: PickOpt) -> anyhow::Result<()> {
    if opt.slices.is_empty() {
        bail!("no slice given");
    }
    let config = EntropyConfig::default()
        .range(opt.min, opt.max)
        .mask_ratio(Some(opt.mask_ratio))
        .ring_removal(!opt.no_ring_removal);
    let mut centers = vec![];
    for &slice in &opt.slices {
        let dir = SweepPlan::slice_dir(&opt.root, slice);
        let best = minimum_entropy(&dir, "*.tiff", &config)
            .with_context(|| format!("failed to pick the center of slice {}", slice))?;
        let center = center_from_path(&best)?;
        println!("slice {:>5}: {:.2}", slice, center);
        centers.push(center);
    }
    let consensus = most_neighbor_clustering(&centers, opt.radius);
    log::info!("most clustered centers: {:?}", consensus);
    let mean = consensus.iter().sum::<f64>() / consensus.len().max(1) as f64;
    println!("center: {:.2}", mean);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    match Opt::from_args() {
        Opt::Plan(opt) => plan(opt),
        Opt::Pick(opt) => pick(opt),
    }
}
