use std::path::PathBuf;

use anyhow::Context;
use fiber_psf::{calibration::Synthetic, Bounds, Config, Psf, SpotGridPsf};
use serde::Serialize;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(name = "psf", about = "Multi-fiber spectrograph spot-grid PSF")]
struct Opt {
    /// Calibration file, defaults to the `PSF_FILE` environment variable
    #[structopt(long, parse(from_os_str))]
    psf: Option<PathBuf>,
    /// Relative tolerance on the integer CCD to spot pixel size ratio
    #[structopt(long)]
    rebin_tolerance: Option<f64>,
    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(Debug, StructOpt)]
enum Command {
    /// PSF dimensions and wavelength range
    Info,
    /// Pixel stamp of a fiber at a given wavelength
    Stamp {
        /// Fiber index
        #[structopt(short, long)]
        fiber: usize,
        /// Wavelength
        #[structopt(short, long)]
        wavelength: f64,
        /// Save the stamp pixels to a CSV file
        #[structopt(long, parse(from_os_str))]
        csv: Option<PathBuf>,
    },
    /// Detector window of the fibers [specmin,specmax) over a wavelength range
    Xyrange {
        #[structopt(long, default_value = "0")]
        specmin: usize,
        #[structopt(long)]
        specmax: usize,
        #[structopt(long)]
        wmin: f64,
        #[structopt(long)]
        wmax: f64,
    },
    /// Writes a synthetic calibration file
    Synth {
        #[structopt(short, long, parse(from_os_str))]
        output: PathBuf,
        /// Number of fibers
        #[structopt(long, default_value = "20")]
        nspec: usize,
        /// Number of wavelengths per fiber
        #[structopt(long, default_value = "50")]
        nwave: usize,
    },
}

#[derive(Debug, Serialize)]
struct Pixel {
    x: i64,
    y: i64,
    value: f64,
}

fn load(opt: &Opt) -> anyhow::Result<SpotGridPsf> {
    let config = match &opt.psf {
        Some(path) => Config::new(path),
        None => Config::from_env().context("no calibration file: set --psf or PSF_FILE")?,
    };
    let config = match opt.rebin_tolerance {
        Some(tolerance) => config.rebin_tolerance(tolerance),
        None => config,
    };
    Ok(config.load()?)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    match &opt.cmd {
        Command::Info => {
            let psf = load(&opt)?;
            if let Some(path) = &opt.psf {
                println!("PSF: {:?}", path);
            }
            println!(" - fibers     : {}", psf.nspec());
            println!(" - wavelengths: {} [{:.3},{:.3}]", psf.nwave(), psf.wmin(), psf.wmax());
            println!(" - detector   : {}x{}", psf.npix_x(), psf.npix_y());
            println!(" - rebinning  : {}", psf.rebin_factor().get());
        }
        Command::Stamp {
            fiber,
            wavelength,
            csv: csv_path,
        } => {
            let psf = load(&opt)?;
            let stamp = psf.xypix(*fiber, *wavelength, Bounds::default())?;
            println!(
                "fiber #{} @ {}: {} ({}x{} pixels, sum: {:.6})",
                fiber,
                wavelength,
                stamp.window(),
                stamp.shape().1,
                stamp.shape().0,
                stamp.sum()
            );
            if let Some(path) = csv_path {
                let mut wtr = csv::Writer::from_path(path)?;
                for (x, y, value) in stamp.pixels() {
                    wtr.serialize(Pixel { x, y, value })?;
                }
                wtr.flush()?;
                log::info!("stamp saved to {:?}", path);
            }
        }
        Command::Xyrange {
            specmin,
            specmax,
            wmin,
            wmax,
        } => {
            let psf = load(&opt)?;
            let range = psf.xyrange((*specmin..*specmax).into(), &[*wmin, *wmax])?;
            println!("{}", range);
        }
        Command::Synth {
            output,
            nspec,
            nwave,
        } => {
            Synthetic::default()
                .nspec(*nspec)
                .nwave(*nwave)
                .build()?
                .save(output)?;
        }
    }
    Ok(())
}
