//! Spot-grid PSF
//!
//! The PSF of a fiber at a given wavelength is the bilinear interpolation of
//! the calibration spots at the fiber slit position and at the wavelength,
//! resampled to the detector pixels at the trace centroid.

use std::{
    collections::HashMap,
    path::Path,
    sync::Mutex,
};

use nalgebra::DMatrix;

use super::{Offset, Psf, PsfError, Result, Trace, Traces, Widths};
use crate::{
    calibration::{Calibration, CalibrationError},
    config::DEFAULT_REBIN_TOLERANCE,
    interp::GridInterp,
    resample::{resample, RebinFactor},
    stamp::Stamp,
};

type WidthsMemo = Mutex<HashMap<(usize, u64), Widths>>;

/// PSF model interpolating a grid of high-resolution spots
///
/// When memoized, the widths of every (fiber, wavelength) pair queried are
/// kept until [Psf::shift_xy] or [SpotGridPsf::clear_widths_memo].
pub struct SpotGridPsf {
    interp: GridInterp,
    fiberpos: Vec<f64>,
    traces: Traces,
    rebin: RebinFactor,
    npix: (usize, usize),
    wrange: (f64, f64),
    memo: Option<WidthsMemo>,
}
impl Clone for SpotGridPsf {
    fn clone(&self) -> Self {
        Self {
            interp: self.interp.clone(),
            fiberpos: self.fiberpos.clone(),
            traces: self.traces.clone(),
            rebin: self.rebin,
            npix: self.npix,
            wrange: self.wrange,
            memo: self.memo.as_ref().map(|_| Default::default()),
        }
    }
}
impl std::fmt::Debug for SpotGridPsf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpotGridPsf")
            .field("nspec", &self.nspec())
            .field("nwave", &self.nwave())
            .field("npix", &self.npix)
            .field("rebin", &self.rebin.get())
            .field("wrange", &self.wrange)
            .field("offset", &self.traces.offset())
            .finish()
    }
}
impl SpotGridPsf {
    /// Creates the PSF from the `calibration` data
    ///
    /// The ratio of the detector to the spot pixel sizes must be within the
    /// relative `rebin_tolerance` of an integer. The widths are memoized if
    /// `memoize_widths` is true.
    pub fn from_calibration(
        calibration: Calibration,
        rebin_tolerance: f64,
        memoize_widths: bool,
    ) -> std::result::Result<Self, CalibrationError> {
        let rebin = calibration.scales.rebin_factor(rebin_tolerance)?;
        log::debug!(
            "spot to CCD rebinning factor: {} (pixel size ratio: {})",
            rebin.get(),
            calibration.scales.ratio()
        );
        let Calibration {
            spots,
            fiberpos,
            spotpos,
            spotwave,
            npix,
            traces,
            ..
        } = calibration;
        let traces = Traces::new(traces);
        let wrange = (traces.wmin(), traces.wmax());
        Ok(Self {
            interp: GridInterp::new(spotpos, spotwave, spots),
            fiberpos,
            traces,
            rebin,
            npix,
            wrange,
            memo: memoize_widths.then(Default::default),
        })
    }
    /// Loads the PSF from a calibration file with the default settings
    pub fn load<P: AsRef<Path>>(path: P) -> std::result::Result<Self, CalibrationError> {
        Self::from_calibration(Calibration::load(path)?, DEFAULT_REBIN_TOLERANCE, true)
    }
    pub fn rebin_factor(&self) -> RebinFactor {
        self.rebin
    }
    pub fn offset(&self) -> Offset {
        self.traces.offset()
    }
    pub fn traces(&self) -> &Traces {
        &self.traces
    }
    /// Slit position of fiber `ispec`
    pub fn fiber_position(&self, ispec: usize) -> Result<f64> {
        self.check_spec(ispec)?;
        Ok(self.fiberpos[ispec])
    }
    /// High-resolution spot of fiber `ispec` at `wavelength`
    pub fn spot(&self, ispec: usize, wavelength: f64) -> Result<DMatrix<f64>> {
        Ok(self.interp.eval(self.fiber_position(ispec)?, wavelength))
    }
    /// Empties the widths memo
    pub fn clear_widths_memo(&self) {
        if let Some(mut memo) = self.memo.as_ref().and_then(|memo| memo.lock().ok()) {
            memo.clear();
        }
    }
    /// Number of memoized widths
    pub fn widths_memo_len(&self) -> usize {
        self.memo
            .as_ref()
            .and_then(|memo| memo.lock().ok())
            .map_or(0, |memo| memo.len())
    }
    fn trace(&self, ispec: usize) -> Result<&Trace> {
        self.traces.get(ispec).ok_or(PsfError::SpecIndex {
            index: ispec,
            nspec: self.nspec(),
        })
    }
}

impl Psf for SpotGridPsf {
    fn nspec(&self) -> usize {
        self.traces.len()
    }
    fn nwave(&self) -> usize {
        self.traces.nwave()
    }
    fn npix_x(&self) -> usize {
        self.npix.0
    }
    fn npix_y(&self) -> usize {
        self.npix.1
    }
    fn native_wavelengths(&self, ispec: usize) -> Result<&[f64]> {
        Ok(self.trace(ispec)?.wavelength())
    }
    fn centroid(&self, ispec: usize, wavelength: f64) -> Result<(f64, f64)> {
        self.check_spec(ispec)?;
        Ok(self.traces.xy(ispec, wavelength))
    }
    fn wavelength_at(&self, ispec: usize, y: f64) -> Result<f64> {
        self.check_spec(ispec)?;
        Ok(self.traces.wavelength_at(ispec, y))
    }
    fn stamp(&self, ispec: usize, wavelength: f64) -> Result<Stamp> {
        let spot = self.spot(ispec, wavelength)?;
        let (xc, yc) = self.traces.xy(ispec, wavelength);
        Ok(resample(&spot, xc, yc, self.rebin))
    }
    fn shift_xy(&mut self, dx: f64, dy: f64) {
        self.traces.shift(dx, dy);
        if let Some(memo) = self.memo.as_mut() {
            *memo = Default::default();
        }
    }
    fn wmin(&self) -> f64 {
        self.wrange.0
    }
    fn wmax(&self) -> f64 {
        self.wrange.1
    }
    fn widths(&self, ispec: usize, wavelength: f64) -> Result<Widths> {
        let key = (ispec, wavelength.to_bits());
        let memo = self.memo.as_ref().and_then(|memo| memo.lock().ok());
        if let Some(widths) = memo.as_ref().and_then(|memo| memo.get(&key)) {
            return Ok(*widths);
        }
        drop(memo);
        let widths = Widths::of(self, ispec, wavelength)?;
        if let Some(mut memo) = self.memo.as_ref().and_then(|memo| memo.lock().ok()) {
            memo.insert(key, widths);
        }
        Ok(widths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        calibration::Synthetic,
        psf::{Bounds, Fibers, Samples},
        stamp::XyRange,
    };

    fn psf() -> SpotGridPsf {
        let calibration = Synthetic::default().build().unwrap();
        SpotGridPsf::from_calibration(calibration, 1e-6, true).unwrap()
    }

    #[test]
    fn stamp_is_normalized() {
        let psf = psf();
        let stamp = psf.stamp(5, 5432.1).unwrap();
        assert_eq!(stamp.shape(), (7, 7));
        assert!((stamp.sum() - 1.).abs() < 1e-12);
        let (xc, yc) = psf.centroid(5, 5432.1).unwrap();
        assert!(stamp.xslice.contains(&(xc.floor() as i64)));
        assert!(stamp.yslice.contains(&(yc.floor() as i64)));
    }

    #[test]
    fn widths_are_memoized() {
        let mut psf = psf();
        let w1 = psf.widths(4, 5500.).unwrap();
        assert_eq!(psf.memo.as_ref().unwrap().lock().unwrap().len(), 1);
        let w2 = psf.widths(4, 5500.).unwrap();
        assert_eq!(w1, w2);
        psf.widths(4, 5501.).unwrap();
        assert_eq!(psf.widths_memo_len(), 2);
        psf.clear_widths_memo();
        assert_eq!(psf.widths_memo_len(), 0);
        assert_eq!(psf.widths(4, 5500.).unwrap(), w1);
        psf.shift_xy(0.3, 0.);
        assert!(psf.memo.as_ref().unwrap().lock().unwrap().is_empty());
        assert_eq!(psf.clone().memo.unwrap().lock().unwrap().len(), 0);

        let plain = SpotGridPsf::from_calibration(Synthetic::default().build().unwrap(), 1e-6, false)
            .unwrap();
        assert!(plain.memo.is_none());
        assert_eq!(plain.widths(4, 5500.).unwrap(), w1);
    }

    #[test]
    fn widths_follow_the_spots() {
        let psf = psf();
        // the synthetic spots widen with the slit position and the wavelength
        let x0 = psf.xsigma(0, 5500.).unwrap().as_scalar().unwrap();
        let x1 = psf.xsigma(psf.nspec() - 1, 5500.).unwrap().as_scalar().unwrap();
        assert!(x1 > x0);
        let d0 = psf.wdisp(7, 5000.).unwrap().as_scalar().unwrap();
        let d1 = psf.wdisp(7, 6000.).unwrap().as_scalar().unwrap();
        assert!(d0 > 0.);
        assert!(d1 > d0);
    }

    #[test]
    fn shift_moves_stamps() {
        let mut psf = psf();
        let s0 = psf.stamp(2, 5500.).unwrap();
        psf.shift_xy(3., -2.);
        let s1 = psf.stamp(2, 5500.).unwrap();
        assert_eq!(s1.xslice.start - s0.xslice.start, 3);
        assert_eq!(s1.yslice.start - s0.yslice.start, -2);
        s0.pix
            .iter()
            .zip(s1.pix.iter())
            .for_each(|(a, b)| assert!((a - b).abs() < 1e-12));
        assert_eq!(psf.offset().version, 1);
    }

    #[test]
    fn bad_fiber_index_is_an_error() {
        let psf = psf();
        let nspec = psf.nspec();
        let out_of_range = |r: Result<()>| {
            assert!(matches!(
                r,
                Err(PsfError::SpecIndex { index, nspec: n }) if index == nspec && n == nspec
            ))
        };
        out_of_range(psf.centroid(nspec, 5500.).map(|_| ()));
        out_of_range(psf.wavelength_at(nspec, 100.).map(|_| ()));
        out_of_range(psf.stamp(nspec, 5500.).map(|_| ()));
        out_of_range(psf.native_wavelengths(nspec).map(|_| ()));
        out_of_range(psf.spot(nspec, 5500.).map(|_| ()));
    }

    #[test]
    fn fractional_pixel_ratio_is_rejected() {
        let mut calibration = Synthetic::default().build().unwrap();
        calibration.scales = crate::calibration::PixelScales::new(15., 4.).unwrap();
        assert!(matches!(
            SpotGridPsf::from_calibration(calibration, 1e-6, true),
            Err(CalibrationError::RebinFactor(_))
        ));
    }

    #[test]
    fn end_to_end() {
        let synthetic = Synthetic::default().nspec(500);
        let path = std::env::temp_dir().join(format!("fiber-psf-e2e-{}.npz", std::process::id()));
        synthetic.build().unwrap().save(&path).unwrap();
        let psf = SpotGridPsf::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(psf.nspec(), 500);
        let w = psf.wavelength(250, Samples::Native).unwrap().to_vec();
        let wmean = w.iter().sum::<f64>() / w.len() as f64;
        let stamp = psf.xypix(250, wmean, Bounds::default()).unwrap();
        assert!(!stamp.is_empty());
        assert!((stamp.sum() - 1.).abs() < 1e-12);
        let detector = XyRange::detector(psf.npix_x(), psf.npix_y());
        assert_eq!(stamp.window().intersection(detector), stamp.window());
        assert_eq!(
            psf.x(Fibers::All, wmean).unwrap().shape(),
            vec![psf.nspec()]
        );
    }
}
