/*!
# Calibration store

The calibration data of a spot-grid PSF:

- the grid of high-resolution spot images sampled at (slit position, wavelength),
- the slit position of every fiber,
- the slit positions and wavelengths of the spot grid,
- the detector and spot pixel sizes,
- the detector size and the trace of every fiber.

It is read from, or written to, a NumPy `.npz` archive (see [`Calibration::load`]).
*/

use std::{io, path::PathBuf};

use crate::{psf::Trace, resample::RebinFactor};

mod npz;
mod synthetic;
pub use synthetic::Synthetic;

#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    #[error("failed to open calibration file {1:?}")]
    Open(#[source] io::Error, PathBuf),
    #[error("failed to read array {1:?}")]
    Read(#[source] io::Error, String),
    #[error("failed to write calibration file {1:?}")]
    Write(#[source] io::Error, PathBuf),
    #[error("array {0:?} is missing from the calibration file")]
    Missing(String),
    #[error("array {name:?} has shape {found:?}, expected {expected}")]
    Shape {
        name: String,
        found: Vec<usize>,
        expected: String,
    },
    #[error("{0} must be sorted in strictly ascending order")]
    NotAscending(String),
    #[error("{0} must be positive, found {1}")]
    NotPositive(&'static str, f64),
    #[error("CCD to spot pixel size ratio {0} is not an integer rebinning factor")]
    RebinFactor(f64),
}
type Result<T> = std::result::Result<T, CalibrationError>;

fn shape_error(name: &str, found: &[usize], expected: impl ToString) -> CalibrationError {
    CalibrationError::Shape {
        name: name.to_string(),
        found: found.to_vec(),
        expected: expected.to_string(),
    }
}

fn check_ascending(name: &str, values: &[f64]) -> Result<()> {
    if values.windows(2).all(|w| w[0] < w[1]) {
        Ok(())
    } else {
        Err(CalibrationError::NotAscending(name.to_string()))
    }
}

/// Spot images indexed by `[slit position][wavelength][row][column]`
#[derive(Debug, Clone, PartialEq)]
pub struct SpotGrid {
    data: Vec<f64>,
    shape: [usize; 4],
}
impl SpotGrid {
    /// Creates the grid from row-major `data`
    pub fn new(data: Vec<f64>, shape: [usize; 4]) -> Result<Self> {
        if data.len() != shape.iter().product::<usize>() {
            return Err(shape_error(
                "SPOTS",
                &[data.len()],
                format!("{} values for shape {:?}", shape.iter().product::<usize>(), shape),
            ));
        }
        Ok(Self { data, shape })
    }
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }
    /// Number of (slit positions, wavelengths)
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.shape[0], self.shape[1])
    }
    /// Size of a spot image as (rows, columns)
    pub fn image_shape(&self) -> (usize, usize) {
        (self.shape[2], self.shape[3])
    }
    /// Row-major spot image at slit position index `islit` and wavelength index `iwave`
    ///
    /// # Panics
    /// If either index is out of range
    pub fn image(&self, islit: usize, iwave: usize) -> &[f64] {
        let n = self.shape[2] * self.shape[3];
        let k = (islit * self.shape[1] + iwave) * n;
        &self.data[k..k + n]
    }
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}

/// Detector and spot image pixel sizes, in the same unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelScales {
    pub ccd: f64,
    pub spot: f64,
}
impl PixelScales {
    pub fn new(ccd: f64, spot: f64) -> Result<Self> {
        if !(ccd > 0f64) {
            return Err(CalibrationError::NotPositive("CCD pixel size", ccd));
        }
        if !(spot > 0f64) {
            return Err(CalibrationError::NotPositive("spot pixel size", spot));
        }
        Ok(Self { ccd, spot })
    }
    /// Ratio of the detector to the spot pixel size
    pub fn ratio(&self) -> f64 {
        self.ccd / self.spot
    }
    /// Integer rebinning factor from spot to detector pixels
    ///
    /// The ratio is rounded to the nearest integer if it is within `tolerance`
    /// (relative) of it, otherwise the pixel scales are rejected.
    pub fn rebin_factor(&self, tolerance: f64) -> Result<RebinFactor> {
        let ratio = self.ratio();
        let factor = ratio.round();
        if !(factor >= 1f64) || (ratio - factor).abs() > tolerance * ratio {
            return Err(CalibrationError::RebinFactor(ratio));
        }
        if ratio != factor {
            log::warn!("pixel size ratio {ratio} rounded to {factor}");
        }
        RebinFactor::new(factor as usize).ok_or(CalibrationError::RebinFactor(ratio))
    }
}

/// Spot-grid PSF calibration data
#[derive(Debug, Clone)]
pub struct Calibration {
    pub(crate) spots: SpotGrid,
    pub(crate) fiberpos: Vec<f64>,
    pub(crate) spotpos: Vec<f64>,
    pub(crate) spotwave: Vec<f64>,
    pub(crate) scales: PixelScales,
    pub(crate) npix: (usize, usize),
    pub(crate) traces: Vec<Trace>,
}
impl Calibration {
    /// Creates the calibration, checking the consistency of the data
    ///
    /// `npix` is the detector size as (columns, rows) and there must be one
    /// trace per fiber, all with the same number of native wavelengths.
    pub fn new(
        spots: SpotGrid,
        fiberpos: Vec<f64>,
        spotpos: Vec<f64>,
        spotwave: Vec<f64>,
        scales: PixelScales,
        npix: (usize, usize),
        traces: Vec<Trace>,
    ) -> Result<Self> {
        let (nslit, nspotwave) = spots.grid_shape();
        if spotpos.len() != nslit || nslit == 0 {
            return Err(shape_error(
                "SPOTPOS",
                &[spotpos.len()],
                format!("[{nslit}] (non-empty)"),
            ));
        }
        if spotwave.len() != nspotwave || nspotwave == 0 {
            return Err(shape_error(
                "SPOTWAVE",
                &[spotwave.len()],
                format!("[{nspotwave}] (non-empty)"),
            ));
        }
        check_ascending("SPOTPOS", &spotpos)?;
        check_ascending("SPOTWAVE", &spotwave)?;
        let (ny, nx) = spots.image_shape();
        if ny == 0 || nx == 0 {
            return Err(shape_error("SPOTS", &spots.shape(), "non-empty spot images"));
        }

        if traces.len() != fiberpos.len() || traces.is_empty() {
            return Err(shape_error(
                "FIBERPOS",
                &[fiberpos.len()],
                format!("[{}] (one per trace)", traces.len()),
            ));
        }
        let nwave = traces[0].len();
        if nwave < 2 {
            return Err(shape_error("WAVELENGTH", &[traces.len(), nwave], "at least 2 wavelengths"));
        }
        for (ispec, trace) in traces.iter().enumerate() {
            if trace.len() != nwave || trace.x().len() != nwave || trace.y().len() != nwave {
                return Err(shape_error(
                    "X/Y/WAVELENGTH",
                    &[ispec, trace.len(), trace.x().len(), trace.y().len()],
                    format!("{nwave} samples for every fiber"),
                ));
            }
            check_ascending(&format!("WAVELENGTH[{ispec}]"), trace.wavelength())?;
            check_ascending(&format!("Y[{ispec}]"), trace.y())?;
        }

        let (npix_x, npix_y) = npix;
        if npix_x == 0 {
            return Err(CalibrationError::NotPositive("NPIX_X", 0f64));
        }
        if npix_y == 0 {
            return Err(CalibrationError::NotPositive("NPIX_Y", 0f64));
        }

        Ok(Self {
            spots,
            fiberpos,
            spotpos,
            spotwave,
            scales,
            npix,
            traces,
        })
    }
    pub fn spots(&self) -> &SpotGrid {
        &self.spots
    }
    /// Slit position of every fiber
    pub fn fiber_positions(&self) -> &[f64] {
        &self.fiberpos
    }
    /// Slit positions of the spot grid
    pub fn spot_positions(&self) -> &[f64] {
        &self.spotpos
    }
    /// Wavelengths of the spot grid
    pub fn spot_wavelengths(&self) -> &[f64] {
        &self.spotwave
    }
    pub fn pixel_scales(&self) -> PixelScales {
        self.scales
    }
    /// Number of fibers
    pub fn nspec(&self) -> usize {
        self.traces.len()
    }
    /// Number of native wavelengths per fiber
    pub fn nwave(&self) -> usize {
        self.traces.first().map_or(0, Trace::len)
    }
    /// Detector size as (columns, rows)
    pub fn npix(&self) -> (usize, usize) {
        self.npix
    }
    pub fn traces(&self) -> &[Trace] {
        &self.traces
    }
}
