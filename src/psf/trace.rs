//! Fiber traces: where each fiber lands on the detector as a function of wavelength

use crate::interp::interp_linear;

/// Tabulated trace of one fiber
///
/// The centroid (x, y) is sampled at the fiber native wavelengths and
/// interpolated linearly in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace {
    wavelength: Vec<f64>,
    x: Vec<f64>,
    y: Vec<f64>,
}
impl Trace {
    /// Creates a trace from the native wavelengths and the matching centroids
    ///
    /// Both `wavelength` and `y` are expected to increase monotonically, this is
    /// checked by [`Calibration`](crate::Calibration).
    pub fn new(wavelength: Vec<f64>, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { wavelength, x, y }
    }
    pub fn len(&self) -> usize {
        self.wavelength.len()
    }
    pub fn is_empty(&self) -> bool {
        self.wavelength.is_empty()
    }
    /// Native wavelengths
    pub fn wavelength(&self) -> &[f64] {
        &self.wavelength
    }
    pub fn x(&self) -> &[f64] {
        &self.x
    }
    pub fn y(&self) -> &[f64] {
        &self.y
    }
    pub fn wmin(&self) -> f64 {
        self.wavelength.first().copied().unwrap_or(f64::NAN)
    }
    pub fn wmax(&self) -> f64 {
        self.wavelength.last().copied().unwrap_or(f64::NAN)
    }
    pub fn x_at(&self, wavelength: f64) -> f64 {
        interp_linear(wavelength, &self.wavelength, &self.x)
    }
    pub fn y_at(&self, wavelength: f64) -> f64 {
        interp_linear(wavelength, &self.wavelength, &self.y)
    }
    /// Wavelength at detector row `y`
    pub fn wavelength_at(&self, y: f64) -> f64 {
        interp_linear(y, &self.y, &self.wavelength)
    }
}

/// Global offset added to every centroid
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Offset {
    pub dx: f64,
    pub dy: f64,
    /// Number of shifts applied so far
    pub version: u64,
}
impl Offset {
    /// Composes `(dx, dy)` with the current offset
    pub fn shift(self, dx: f64, dy: f64) -> Self {
        Self {
            dx: self.dx + dx,
            dy: self.dy + dy,
            version: self.version + 1,
        }
    }
}

/// The traces of all the fibers and their common offset
#[derive(Debug, Clone, Default)]
pub struct Traces {
    traces: Vec<Trace>,
    offset: Offset,
}
impl Traces {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self {
            traces,
            ..Default::default()
        }
    }
    /// Number of fibers
    pub fn len(&self) -> usize {
        self.traces.len()
    }
    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
    /// Number of native wavelengths per fiber
    pub fn nwave(&self) -> usize {
        self.traces.first().map_or(0, Trace::len)
    }
    pub fn get(&self, ispec: usize) -> Option<&Trace> {
        self.traces.get(ispec)
    }
    pub fn iter(&self) -> impl Iterator<Item = &Trace> {
        self.traces.iter()
    }
    pub fn offset(&self) -> Offset {
        self.offset
    }
    pub fn shift(&mut self, dx: f64, dy: f64) {
        self.offset = self.offset.shift(dx, dy);
    }
    /// Smallest native wavelength of all fibers
    pub fn wmin(&self) -> f64 {
        self.traces
            .iter()
            .map(Trace::wmin)
            .fold(f64::INFINITY, f64::min)
    }
    /// Largest native wavelength of all fibers
    pub fn wmax(&self) -> f64 {
        self.traces
            .iter()
            .map(Trace::wmax)
            .fold(f64::NEG_INFINITY, f64::max)
    }
    /// Centroid of fiber `ispec` at `wavelength`, offset included
    ///
    /// `ispec` must be in range, the public entry point is [Psf::centroid](super::Psf::centroid)
    pub(crate) fn xy(&self, ispec: usize, wavelength: f64) -> (f64, f64) {
        let trace = &self.traces[ispec];
        (
            trace.x_at(wavelength) + self.offset.dx,
            trace.y_at(wavelength) + self.offset.dy,
        )
    }
    /// Wavelength of fiber `ispec` at detector row `y`, offset included
    ///
    /// `ispec` must be in range, the public entry point is [Psf::wavelength_at](super::Psf::wavelength_at)
    pub(crate) fn wavelength_at(&self, ispec: usize, y: f64) -> f64 {
        self.traces[ispec].wavelength_at(y - self.offset.dy)
    }
}
