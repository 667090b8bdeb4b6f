/*!
# Fiber spectrograph PSF

Point-spread function (PSF) models of a multi-fiber spectrograph.

For each fiber and wavelength, a PSF model tells where the light lands on the
detector, the centroid, and how it spreads over the detector pixels, the pixel
stamp. The stamps are used to render spectra on the detector and to build the
sparse linear operator of the spectral extraction.

## Key Components

- [`Calibration`] - spot-grid calibration data, loaded from a NumPy `.npz` archive
- [`Psf`] - the PSF model contract: centroids, widths, stamps, bounding boxes and projections
- [`SpotGridPsf`] - PSF model interpolating a grid of high-resolution spot images
- [`ProjectionMatrix`] - sparse projection operator
- [`Config`] - PSF loading configuration

## Usage

```rust,no_run
use fiber_psf::{Bounds, Config, Psf, Samples};

let psf = Config::from_env()?.load()?;
let wavelength = psf.wavelength(250, Samples::Native)?.to_vec();
let stamp = psf.xypix(250, wavelength[wavelength.len() / 2], Bounds::default())?;
println!("{} {}", stamp.window(), stamp.sum());
# Ok::<(), fiber_psf::Error>(())
```
*/

pub mod calibration;
mod config;
mod error;
pub mod interp;
pub mod projection;
pub mod psf;
pub mod resample;
mod stamp;

pub use calibration::{Calibration, CalibrationError};
pub use config::{Config, ConfigError, DEFAULT_REBIN_TOLERANCE};
pub use error::{Error, Result};
pub use projection::ProjectionMatrix;
pub use psf::{
    Bounds, Fibers, Psf, PsfError, Samples, SpecRange, SpotGridPsf, Values, Widths,
};
pub use stamp::{Stamp, XyRange};
