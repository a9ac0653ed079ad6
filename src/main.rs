use std::path::PathBuf;

use anyhow::{bail, Context};
use automo::{
    selector::{select_minimum, write_report, CandidateEntropy, Candidates},
    EntropyConfig, Window,
};
use indicatif::{ProgressBar, ProgressIterator, ProgressStyle};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "automo",
    about = "Selects the reconstruction with the minimum entropy"
)]
struct Opt {
    /// Folder with the candidate reconstructions
    #[structopt(parse(from_os_str))]
    folder: PathBuf,
    /// Candidate file name pattern
    #[structopt(short, long, default_value = "*.tiff")]
    pattern: String,
    /// Histogram lower bound
    #[structopt(long, default_value = "0", allow_hyphen_values = true)]
    min: f64,
    /// Histogram upper bound
    #[structopt(long, default_value = "0.002", allow_hyphen_values = true)]
    max: f64,
    /// Circular mask radius as a fraction of half the image size
    #[structopt(long, default_value = "0.9")]
    mask_ratio: f64,
    /// Use all the pixels
    #[structopt(long)]
    no_mask: bool,
    /// Crop window: row0,col0,row1,col1
    #[structopt(short, long, use_delimiter = true)]
    window: Option<Vec<usize>>,
    /// Skip the ring artifacts removal
    #[structopt(long)]
    no_ring_removal: bool,
    /// Ring removal center column
    #[structopt(long)]
    center_x: Option<f64>,
    /// Ring removal center row
    #[structopt(long)]
    center_y: Option<f64>,
    /// Write the candidates entropy to a CSV file
    #[structopt(long, parse(from_os_str))]
    report: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let window = match opt.window.as_deref() {
        Some(&[r0, c0, r1, c1]) => Some(Window::new((r0, c0), (r1, c1))),
        Some(w) => bail!("expected 4 window coordinates (row0,col0,row1,col1), found {:?}", w),
        None => None,
    };
    let config = EntropyConfig::default()
        .range(opt.min, opt.max)
        .mask_ratio((!opt.no_mask).then_some(opt.mask_ratio))
        .window(window)
        .ring_removal(!opt.no_ring_removal)
        .center(opt.center_x, opt.center_y);
    config.validate()?;

    let candidates = Candidates::list(&opt.folder, &opt.pattern)?;
    let pb = ProgressBar::new(candidates.len() as u64);
    pb.set_style(ProgressStyle::with_template(
        "{bar:40.cyan/blue} {pos:>4}/{len:4} {msg}",
    )?);
    let entropies = candidates
        .iter()
        .progress_with(pb)
        .map(|path| CandidateEntropy::evaluate(path, &config))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(report) = &opt.report {
        write_report(&entropies, report)
            .with_context(|| format!("failed to write {:?}", report))?;
    }
    entropies.iter().for_each(|entry| log::info!("{}", entry));
    let best = select_minimum(&entropies).context("no candidate evaluated")?;
    println!("{}", best.path.display());

    Ok(())
}
