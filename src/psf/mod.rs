/*!
# PSF models

The [Psf] trait is the contract shared by the PSF models of the spectrograph:
where the light of a fiber at a given wavelength lands on the detector
([Psf::centroid]), how it spreads ([Psf::stamp]) and the operations built on
top of it: pixel stamps clipped to a detector window ([Psf::xypix]), bounding
boxes ([Psf::xyrange]), image rendering ([Psf::project]) and its sparse matrix
equivalent ([Psf::projection_matrix]).

The accessors [Psf::wavelength], [Psf::loglam], [Psf::x], [Psf::y], [Psf::xy],
[Psf::xyw], [Psf::xsigma] and [Psf::wdisp] take either one fiber or all of
them ([Fibers]) and either one, several or the native wavelengths ([Samples]),
and return a [Values] whose shape follows the arguments.

[SpotGridPsf] is the model interpolating a grid of high-resolution spot images.
*/

use nalgebra::DMatrix;

use crate::{
    projection::{self, ProjectionMatrix},
    stamp::{Stamp, XyRange},
};

mod args;
mod spotgrid;
mod trace;

pub(crate) use args::broadcast;
pub use args::{Bounds, Fibers, Samples, SpecRange, Values};
pub use spotgrid::SpotGridPsf;
pub use trace::{Offset, Trace, Traces};

#[derive(Debug, thiserror::Error)]
pub enum PsfError {
    #[error("fiber index {index} is out of range, there are {nspec} fibers")]
    SpecIndex { index: usize, nspec: usize },
    #[error("the fiber range is empty")]
    EmptySpecRange,
    #[error("no wavelength given")]
    NoWavelength,
    #[error("wavelength {0} is not a finite number")]
    Wavelength(f64),
    #[error("photons {photons:?} and wavelengths {wavelengths:?} shapes do not broadcast")]
    Broadcast {
        photons: (usize, usize),
        wavelengths: (usize, usize),
    },
    #[error("expected {expected} photon counts, found {found}")]
    PhotonCount { expected: usize, found: usize },
    #[error("expected {expected} pixels, found {found}")]
    PixelCount { expected: usize, found: usize },
    #[error("fibers have different numbers of samples ({expected} and {found})")]
    Ragged { expected: usize, found: usize },
}
pub type Result<T> = std::result::Result<T, PsfError>;

/// Standard deviation of a uniform one-pixel profile
pub const TOPHAT_SIGMA: f64 = 0.288_675_134_594_812_9;

/// PSF widths of one fiber at one wavelength
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Widths {
    /// Cross-dispersion standard deviation in pixels
    pub xsigma: f64,
    /// Dispersion standard deviation in wavelength unit
    pub wdisp: f64,
}
impl Widths {
    /// Widths of the natural stamp of fiber `ispec` at `wavelength`
    ///
    /// The dispersion width is the row standard deviation divided by the
    /// local dispersion `dy/dw`. A flat or degenerate profile has the width of
    /// a uniform pixel.
    pub fn of<P: Psf + ?Sized>(psf: &P, ispec: usize, wavelength: f64) -> Result<Self> {
        let (xsigma, ysigma) = stamp_sigmas(&psf.stamp(ispec, wavelength)?);
        let (_, y0) = psf.centroid(ispec, wavelength - 0.5)?;
        let (_, y1) = psf.centroid(ispec, wavelength + 0.5)?;
        let wdisp = ysigma / (y1 - y0).abs();
        Ok(Self {
            xsigma,
            wdisp: if wdisp > 0f64 && wdisp.is_finite() {
                wdisp
            } else {
                TOPHAT_SIGMA
            },
        })
    }
}

/// Standard deviations (x, y) in pixels of the stamp marginal profiles
fn stamp_sigmas(stamp: &Stamp) -> (f64, f64) {
    let norm = stamp.sum();
    if !(norm > 0f64) {
        return (TOPHAT_SIGMA, TOPHAT_SIGMA);
    }
    let (mx, my) = stamp
        .pixels()
        .fold((0f64, 0f64), |(mx, my), (x, y, v)| {
            (mx + x as f64 * v, my + y as f64 * v)
        });
    let (mx, my) = (mx / norm, my / norm);
    let (vx, vy) = stamp.pixels().fold((0f64, 0f64), |(vx, vy), (x, y, v)| {
        (
            vx + (x as f64 - mx).powi(2) * v,
            vy + (y as f64 - my).powi(2) * v,
        )
    });
    let sigma = |var: f64| {
        let s = (var / norm).sqrt();
        if s > 0f64 && s.is_finite() {
            s
        } else {
            TOPHAT_SIGMA
        }
    };
    (sigma(vx), sigma(vy))
}

/// PSF model contract
pub trait Psf: Sync {
    /// Number of fibers
    fn nspec(&self) -> usize;
    /// Number of native wavelengths per fiber
    fn nwave(&self) -> usize;
    /// Number of detector columns
    fn npix_x(&self) -> usize;
    /// Number of detector rows
    fn npix_y(&self) -> usize;
    /// Native wavelengths of fiber `ispec`
    fn native_wavelengths(&self, ispec: usize) -> Result<&[f64]>;
    /// Detector (x, y) centroid of fiber `ispec` at `wavelength`
    fn centroid(&self, ispec: usize, wavelength: f64) -> Result<(f64, f64)>;
    /// Wavelength of fiber `ispec` at detector row `y`
    fn wavelength_at(&self, ispec: usize, y: f64) -> Result<f64>;
    /// Natural (unclipped) pixel stamp of fiber `ispec` at `wavelength`
    fn stamp(&self, ispec: usize, wavelength: f64) -> Result<Stamp>;
    /// Adds `(dx, dy)` to all subsequent centroids
    fn shift_xy(&mut self, dx: f64, dy: f64);

    /// Smallest native wavelength of all fibers
    fn wmin(&self) -> f64 {
        (0..self.nspec())
            .filter_map(|i| self.native_wavelengths(i).ok()?.first().copied())
            .fold(f64::INFINITY, f64::min)
    }
    /// Largest native wavelength of all fibers
    fn wmax(&self) -> f64 {
        (0..self.nspec())
            .filter_map(|i| self.native_wavelengths(i).ok()?.last().copied())
            .fold(f64::NEG_INFINITY, f64::max)
    }
    fn check_spec(&self, ispec: usize) -> Result<()> {
        if ispec < self.nspec() {
            Ok(())
        } else {
            Err(PsfError::SpecIndex {
                index: ispec,
                nspec: self.nspec(),
            })
        }
    }
    /// Widths of fiber `ispec` at `wavelength`, see [Widths::of]
    fn widths(&self, ispec: usize, wavelength: f64) -> Result<Widths> {
        Widths::of(self, ispec, wavelength)
    }
    /// Pixel stamp of fiber `ispec` at `wavelength` clipped to `bounds`
    ///
    /// The stamp slices are relative to the bounds origin `(xmin, ymin)`,
    /// unset bounds default to the detector edges.
    /// A wavelength below [Psf::wmin] gives an empty stamp at `(0..0, 0..0)`
    /// and a wavelength above [Psf::wmax] an empty stamp at `(0..0, npix_y..npix_y)`.
    /// A NaN or infinite wavelength is an error.
    fn xypix(&self, ispec: usize, wavelength: f64, bounds: Bounds) -> Result<Stamp> {
        self.check_spec(ispec)?;
        if !wavelength.is_finite() {
            return Err(PsfError::Wavelength(wavelength));
        }
        if wavelength < self.wmin() {
            return Ok(Stamp::empty(0..0, 0..0));
        }
        if wavelength > self.wmax() {
            let ny = self.npix_y() as i64;
            return Ok(Stamp::empty(0..0, ny..ny));
        }
        let bounds = bounds.resolve(self.npix_x(), self.npix_y());
        Ok(self.stamp(ispec, wavelength)?.clip(bounds))
    }
    /// Pixel values of [Psf::xypix] within the detector
    fn pix(&self, ispec: usize, wavelength: f64) -> Result<DMatrix<f64>> {
        Ok(self.xypix(ispec, wavelength, Bounds::default())?.pix)
    }
    /// Detector window containing the stamps of the `specs` fibers over the `wavelengths` range
    ///
    /// The window is the union of the stamps at every native wavelength within
    /// the range and at every given wavelength. Stamps are clipped to the
    /// detector and those off the detector are ignored, if all of them are the
    /// window is empty.
    fn xyrange(&self, specs: SpecRange, wavelengths: &[f64]) -> Result<XyRange> {
        let specs = specs.check(self.nspec())?;
        if wavelengths.is_empty() {
            return Err(PsfError::NoWavelength);
        }
        let wlo = wavelengths.iter().copied().fold(f64::INFINITY, f64::min);
        let whi = wavelengths.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mut range: Option<XyRange> = None;
        for ispec in specs {
            let native = self.native_wavelengths(ispec)?;
            let samples = native
                .iter()
                .copied()
                .filter(|w| (wlo..=whi).contains(w))
                .chain(wavelengths.iter().copied());
            for w in samples {
                let stamp = self.xypix(ispec, w, Bounds::default())?;
                if stamp.is_empty() {
                    continue;
                }
                let window = stamp.window();
                range = Some(range.map_or(window, |range| range.union(window)));
            }
        }
        Ok(range.unwrap_or_default())
    }
    /// Renders `photons` on the detector, see [projection::project]
    fn project(
        &self,
        photons: &DMatrix<f64>,
        wavelengths: &DMatrix<f64>,
        specmin: usize,
        xyrange: Option<XyRange>,
    ) -> Result<DMatrix<f64>> {
        projection::project(self, photons, wavelengths, specmin, xyrange)
    }
    /// Sparse operator equivalent to [Psf::project], see [projection::projection_matrix]
    fn projection_matrix(
        &self,
        specs: SpecRange,
        wavelengths: &[f64],
        xyrange: XyRange,
    ) -> Result<ProjectionMatrix> {
        projection::projection_matrix(self, specs, wavelengths, xyrange)
    }

    /// Wavelengths at detector rows `y`, or the native wavelengths
    fn wavelength<'a>(&self, fibers: impl Into<Fibers>, y: impl Into<Samples<'a>>) -> Result<Values>
    where
        Self: Sized,
    {
        match y.into() {
            Samples::Native => broadcast(self, fibers.into(), Samples::Native, |_, w| Ok(w)),
            y => broadcast(self, fibers.into(), y, |ispec, y| self.wavelength_at(ispec, y)),
        }
    }
    /// Base-10 logarithm of [Psf::wavelength]
    fn loglam<'a>(&self, fibers: impl Into<Fibers>, y: impl Into<Samples<'a>>) -> Result<Values>
    where
        Self: Sized,
    {
        Ok(self.wavelength(fibers, y)?.map(f64::log10))
    }
    /// Centroid columns
    fn x<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<Values>
    where
        Self: Sized,
    {
        broadcast(self, fibers.into(), wavelength.into(), |ispec, w| {
            Ok(self.centroid(ispec, w)?.0)
        })
    }
    /// Centroid rows
    fn y<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<Values>
    where
        Self: Sized,
    {
        broadcast(self, fibers.into(), wavelength.into(), |ispec, w| {
            Ok(self.centroid(ispec, w)?.1)
        })
    }
    /// Centroid columns and rows
    fn xy<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<(Values, Values)>
    where
        Self: Sized,
    {
        let (fibers, wavelength) = (fibers.into(), wavelength.into());
        Ok((self.x(fibers, wavelength)?, self.y(fibers, wavelength)?))
    }
    /// Centroid columns and rows, and the matching wavelengths
    fn xyw<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<(Values, Values, Values)>
    where
        Self: Sized,
    {
        let (fibers, wavelength) = (fibers.into(), wavelength.into());
        let (x, y) = self.xy(fibers, wavelength)?;
        let w = broadcast(self, fibers, wavelength, |_, w| Ok(w))?;
        Ok((x, y, w))
    }
    /// Cross-dispersion widths in pixels
    fn xsigma<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<Values>
    where
        Self: Sized,
    {
        broadcast(self, fibers.into(), wavelength.into(), |ispec, w| {
            Ok(self.widths(ispec, w)?.xsigma)
        })
    }
    /// Dispersion widths in wavelength unit
    fn wdisp<'a>(
        &self,
        fibers: impl Into<Fibers>,
        wavelength: impl Into<Samples<'a>>,
    ) -> Result<Values>
    where
        Self: Sized,
    {
        broadcast(self, fibers.into(), wavelength.into(), |ispec, w| {
            Ok(self.widths(ispec, w)?.wdisp)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::Synthetic;

    fn psf() -> SpotGridPsf {
        let calibration = Synthetic::default().build().unwrap();
        SpotGridPsf::from_calibration(calibration, 1e-6, true).unwrap()
    }

    fn mean(values: &[f64]) -> f64 {
        values.iter().sum::<f64>() / values.len() as f64
    }

    #[test]
    fn dimensions() {
        let psf = psf();
        assert!(psf.npix_x() > 0);
        assert!(psf.npix_y() > 0);
        assert_eq!(psf.nspec(), 20);
        assert_eq!(psf.nwave(), 50);
    }

    fn check_wavelength_shapes<F>(psf: &SpotGridPsf, f: F)
    where
        F: Fn(Fibers, Samples) -> Result<Values>,
    {
        assert_eq!(f(0.into(), Samples::Native).unwrap().len(), psf.nwave());
        assert!(f(0.into(), 0f64.into()).unwrap().as_scalar().is_some());
        let yy: Vec<f64> = (0..50).map(|i| i as f64).collect();
        assert_eq!(f(0.into(), (&yy).into()).unwrap().shape(), vec![50]);
        assert_eq!(
            f(Fibers::All, Samples::Native).unwrap().shape(),
            vec![psf.nspec(), psf.nwave()]
        );
        assert!(matches!(
            f(psf.nspec().into(), Samples::Native),
            Err(PsfError::SpecIndex { .. })
        ));
    }

    #[test]
    fn wavelength_shapes() {
        let psf = psf();
        check_wavelength_shapes(&psf, |fibers, y| psf.wavelength(fibers, y));
        check_wavelength_shapes(&psf, |fibers, y| psf.loglam(fibers, y));
        let w = psf.wavelength(2, Samples::Native).unwrap();
        let l = psf.loglam(2, Samples::Native).unwrap();
        assert_eq!(l.to_vec()[7], w.to_vec()[7].log10());
    }

    fn check_centroid_shapes<F>(psf: &SpotGridPsf, f: F)
    where
        F: Fn(Fibers, Samples) -> Result<Values>,
    {
        let w0 = psf.wavelength(0, Samples::Native).unwrap().to_vec();
        let wmean = mean(&w0);
        let ww = &w0[0..10];
        let grid = f(Fibers::All, Samples::Native).unwrap();
        assert_eq!(grid.shape(), vec![psf.nspec(), psf.nwave()]);
        assert_eq!(
            f(0.into(), Samples::Native).unwrap().shape(),
            vec![psf.nwave()]
        );
        assert!(f(0.into(), wmean.into()).unwrap().as_scalar().is_some());
        assert_eq!(
            f(Fibers::All, wmean.into()).unwrap().shape(),
            vec![psf.nspec()]
        );
        assert_eq!(f(0.into(), ww.into()).unwrap().shape(), vec![10]);
        assert_eq!(
            f(Fibers::All, ww.into()).unwrap().shape(),
            vec![psf.nspec(), 10]
        );
    }

    #[test]
    fn centroid_shapes() {
        let psf = psf();
        check_centroid_shapes(&psf, |fibers, w| psf.x(fibers, w));
        check_centroid_shapes(&psf, |fibers, w| psf.y(fibers, w));
    }

    #[test]
    fn xy_and_xyw() {
        let psf = psf();
        let x = psf.x(0, Samples::Native).unwrap();
        let y = psf.y(0, Samples::Native).unwrap();
        let w = psf.wavelength(0, Samples::Native).unwrap();
        let (x1, y1) = psf.xy(0, Samples::Native).unwrap();
        assert_eq!((&x1, &y1), (&x, &y));
        let (x2, y2, w2) = psf.xyw(0, Samples::Native).unwrap();
        assert_eq!((x2, y2, w2), (x, y, w));
    }

    #[test]
    fn shift_xy() {
        let mut psf = psf();
        let x0 = psf.x(0, Samples::Native).unwrap().to_vec();
        let y0 = psf.y(0, Samples::Native).unwrap().to_vec();
        psf.shift_xy(0.1, 0.2);
        let x1 = psf.x(0, Samples::Native).unwrap().to_vec();
        let y1 = psf.y(0, Samples::Native).unwrap().to_vec();
        x0.iter().zip(&x1).for_each(|(x0, x1)| assert_eq!(*x1, x0 + 0.1));
        y0.iter().zip(&y1).for_each(|(y0, y1)| assert_eq!(*y1, y0 + 0.2));
    }

    #[test]
    fn centroids_are_repeatable() {
        let psf = psf();
        let ww = psf.wavelength(3, Samples::Native).unwrap().to_vec();
        let w = ww[ww.len() / 3];
        for ispec in [0, psf.nspec() / 2, psf.nspec() - 1] {
            assert_eq!(psf.x(ispec, w).unwrap(), psf.x(ispec, w).unwrap());
            assert_eq!(psf.y(ispec, w).unwrap(), psf.y(ispec, w).unwrap());
            assert_eq!(psf.x(ispec, &ww).unwrap(), psf.x(ispec, &ww).unwrap());
            assert_eq!(psf.y(ispec, &ww).unwrap(), psf.y(ispec, &ww).unwrap());
        }
        assert_eq!(
            psf.xy(Fibers::All, &ww).unwrap(),
            psf.xy(Fibers::All, &ww).unwrap()
        );
    }

    #[test]
    fn xsigma_is_positive_and_repeatable() {
        let psf = psf();
        let yy = [20., psf.npix_y() as f64 / 2., psf.npix_y() as f64 - 20.];
        for ispec in [0, psf.nspec() / 2, psf.nspec() - 1] {
            let ww = psf.wavelength(ispec, &yy).unwrap().to_vec();
            let xsig1 = psf.xsigma(ispec, &ww).unwrap().to_vec();
            assert_eq!(xsig1.len(), ww.len());
            assert!(xsig1.iter().all(|s| *s > 0.));
            let xsig2 = psf.xsigma(ispec, &ww).unwrap().to_vec();
            assert_eq!(xsig1, xsig2);
            let wdisp = psf.wdisp(ispec, &ww).unwrap().to_vec();
            assert!(wdisp.iter().all(|s| *s > 0.));
        }
        let ww = psf.wavelength(0, &yy).unwrap().to_vec();
        let xsig = psf.xsigma(0, &ww).unwrap().to_vec();
        for (w, s) in ww.iter().zip(&xsig) {
            assert_eq!(psf.xsigma(0, *w).unwrap().as_scalar(), Some(*s));
        }
    }

    fn test_wavelengths(psf: &SpotGridPsf) -> Vec<f64> {
        let ww = psf.wavelength(Fibers::All, Samples::Native).unwrap();
        let ww = ww.as_grid().unwrap();
        let first = ww.column(0);
        let last = ww.column(ww.ncols() - 1);
        let mut wtest = vec![first.min(), first.max(), last.min(), last.max()];
        wtest.push(mean(&wtest));
        wtest
    }

    #[test]
    fn pix_is_2d() {
        let psf = psf();
        for ispec in [0, psf.nspec() / 2, psf.nspec() - 1] {
            for w in test_wavelengths(&psf) {
                let pix = psf.pix(ispec, w).unwrap();
                assert!(pix.nrows() > 0 && pix.ncols() > 0);
            }
        }
    }

    #[test]
    fn xypix_shape_matches_slices() {
        let psf = psf();
        let mut wtest = test_wavelengths(&psf);
        wtest.push(psf.wmin() - 100.);
        for ispec in [0, psf.nspec() / 2, psf.nspec() - 1] {
            for &w in &wtest {
                let stamp = psf.xypix(ispec, w, Bounds::default()).unwrap();
                let shape = (
                    (stamp.yslice.end - stamp.yslice.start) as usize,
                    (stamp.xslice.end - stamp.xslice.start) as usize,
                );
                assert_eq!(stamp.shape(), shape, "ispec={ispec} w={w}");
            }
        }
    }

    #[test]
    fn xypix_bounds() {
        let psf = psf();
        let w = mean(&psf.wavelength(Fibers::All, Samples::Native).unwrap().to_vec());
        let i = psf.nspec() / 2;
        let s0 = psf.xypix(i, w, Bounds::default()).unwrap();
        let (x0, y0) = (s0.xslice.clone(), s0.yslice.clone());

        let s = psf.xypix(i, w, Bounds::default().xmin(x0.start)).unwrap();
        assert_eq!((s.xslice.start, s.yslice.start), (0, y0.start));
        let s = psf.xypix(i, w, Bounds::default().ymin(y0.start)).unwrap();
        assert_eq!((s.xslice.start, s.yslice.start), (x0.start, 0));
        let s = psf.xypix(i, w, Bounds::default().xmax(x0.end - 1)).unwrap();
        assert_eq!(s.xslice, x0.start..x0.end - 1);
        let s = psf.xypix(i, w, Bounds::default().ymax(y0.end - 1)).unwrap();
        assert_eq!(s.yslice, y0.start..y0.end - 1);
        let s = psf
            .xypix(i, w, Bounds::default().xmin(x0.start).ymin(y0.start))
            .unwrap();
        assert_eq!((s.xslice.start, s.yslice.start), (0, 0));
        assert_eq!(s.pix, s0.pix);
        let s = psf
            .xypix(i, w, Bounds::default().xmax(x0.end - 1).ymax(y0.end - 1))
            .unwrap();
        assert_eq!(
            (s.xslice, s.yslice),
            (x0.start..x0.end - 1, y0.start..y0.end - 1)
        );
        assert_eq!(s.pix, s0.pix.view((0, 0), s.pix.shape()).into_owned());
        let bounds = Bounds::default()
            .xmin(x0.start + 1)
            .xmax(x0.end - 1)
            .ymin(y0.start + 1)
            .ymax(y0.end - 1);
        let s = psf.xypix(i, w, bounds).unwrap();
        assert_eq!(
            (s.xslice, s.yslice),
            (0..x0.end - x0.start - 2, 0..y0.end - y0.start - 2)
        );
        assert_eq!(s.pix, s0.pix.view((1, 1), s.pix.shape()).into_owned());
    }

    #[test]
    fn out_of_band_stamps() {
        let psf = psf();
        let below = psf.xypix(0, psf.wmin() - 1., Bounds::default()).unwrap();
        assert_eq!((below.xslice, below.yslice), (0..0, 0..0));
        assert_eq!(below.pix.shape(), (0, 0));
        let above = psf.xypix(0, psf.wmax() + 1., Bounds::default()).unwrap();
        let ny = psf.npix_y() as i64;
        assert_eq!((above.xslice, above.yslice), (0..0, ny..ny));
        assert_eq!(above.pix.shape(), (0, 0));
        assert!(matches!(
            psf.xypix(psf.nspec(), 5500., Bounds::default()),
            Err(PsfError::SpecIndex { .. })
        ));
    }

    #[test]
    fn non_finite_wavelengths_are_rejected() {
        let psf = psf();
        for w in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            assert!(matches!(
                psf.xypix(0, w, Bounds::default()),
                Err(PsfError::Wavelength(_))
            ));
        }
        let photons = DMatrix::from_element(1, 2, 10f64);
        let wavelengths = DMatrix::from_row_slice(1, 2, &[5500., f64::NAN]);
        assert!(matches!(
            psf.project(&photons, &wavelengths, 0, None),
            Err(PsfError::Wavelength(_))
        ));
        assert!(psf.xyrange(0.into(), &[5500., f64::NAN]).is_err());
    }

    #[test]
    fn xyrange_contains_stamps() {
        let psf = psf();
        let ww: Vec<f64> = psf.wavelength(0, Samples::Native).unwrap().to_vec()[0..10].to_vec();
        let wave_range = [ww[0], ww[9]];
        let range = psf.xyrange((0..=10).into(), &wave_range).unwrap();
        let inside = |stamp: &Stamp| {
            stamp.xslice.start >= range.xmin
                && stamp.xslice.end <= range.xmax
                && stamp.yslice.start >= range.ymin
                && stamp.yslice.end <= range.ymax
        };
        for ispec in [0, 10] {
            for &w in &ww {
                let stamp = psf.xypix(ispec, w, Bounds::default()).unwrap();
                assert!(stamp.is_empty() || inside(&stamp));
            }
        }
        for ispec in 0..=10 {
            for &w in &wave_range {
                let stamp = psf.xypix(ispec, w, Bounds::default()).unwrap();
                assert!(stamp.is_empty() || inside(&stamp));
            }
        }
        // tight: the first and last stamps touch the window edges
        let first = psf.xypix(0, ww[0], Bounds::default()).unwrap();
        assert_eq!((range.xmin, range.ymin), (first.xslice.start, first.yslice.start));
        assert!(psf.xyrange((3..3).into(), &wave_range).is_err());
        assert!(psf.xyrange(0.into(), &[]).is_err());
    }

    #[test]
    fn trait_object() {
        let psf: Box<dyn Psf> = Box::new(psf());
        let stamp = psf.xypix(3, 5500., Bounds::default()).unwrap();
        assert!((stamp.sum() - 1.).abs() < 1e-12);
        assert_eq!(psf.pix(3, 5500.).unwrap(), stamp.pix);
    }
}
