//! Scalar or array arguments and results of the PSF accessors

use std::ops::{Range, RangeInclusive};

use nalgebra::DMatrix;

use super::{Psf, PsfError, Result};
use crate::stamp::XyRange;

/// Fiber selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fibers {
    /// Every fiber, one result row per fiber
    #[default]
    All,
    One(usize),
}
impl From<usize> for Fibers {
    fn from(ispec: usize) -> Self {
        Fibers::One(ispec)
    }
}
impl From<Option<usize>> for Fibers {
    fn from(ispec: Option<usize>) -> Self {
        ispec.map_or(Fibers::All, Fibers::One)
    }
}

/// Wavelength (or detector row) samples
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Samples<'a> {
    /// The native wavelengths of each fiber
    #[default]
    Native,
    One(f64),
    Many(&'a [f64]),
}
impl From<f64> for Samples<'_> {
    fn from(value: f64) -> Self {
        Samples::One(value)
    }
}
impl<'a> From<&'a [f64]> for Samples<'a> {
    fn from(values: &'a [f64]) -> Self {
        Samples::Many(values)
    }
}
impl<'a> From<&'a Vec<f64>> for Samples<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Samples::Many(values.as_slice())
    }
}
impl<'a, const N: usize> From<&'a [f64; N]> for Samples<'a> {
    fn from(values: &'a [f64; N]) -> Self {
        Samples::Many(values.as_slice())
    }
}
impl From<Option<f64>> for Samples<'_> {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Samples::Native, Samples::One)
    }
}

/// Result of a PSF accessor
///
/// A single fiber at a single sample gives a [Values::Scalar], a single fiber
/// at several samples or all the fibers at a single sample a [Values::Vector]
/// and all the fibers at several samples a [Values::Grid] with one row per fiber.
#[derive(Debug, Clone, PartialEq)]
pub enum Values {
    Scalar(f64),
    Vector(Vec<f64>),
    Grid(DMatrix<f64>),
}
impl Values {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Values::Scalar(value) => Some(*value),
            _ => None,
        }
    }
    pub fn as_vector(&self) -> Option<&[f64]> {
        match self {
            Values::Vector(values) => Some(values),
            _ => None,
        }
    }
    pub fn as_grid(&self) -> Option<&DMatrix<f64>> {
        match self {
            Values::Grid(values) => Some(values),
            _ => None,
        }
    }
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Values::Scalar(_) => vec![],
            Values::Vector(values) => vec![values.len()],
            Values::Grid(values) => vec![values.nrows(), values.ncols()],
        }
    }
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }
    /// Number of values
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// All the values in row-major order
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Values::Scalar(value) => vec![*value],
            Values::Vector(values) => values.clone(),
            Values::Grid(values) => values.transpose().as_slice().to_vec(),
        }
    }
    /// Applies `f` to every value
    pub fn map<F: Fn(f64) -> f64>(self, f: F) -> Self {
        match self {
            Values::Scalar(value) => Values::Scalar(f(value)),
            Values::Vector(values) => Values::Vector(values.into_iter().map(f).collect()),
            Values::Grid(values) => Values::Grid(values.map(f)),
        }
    }
}

/// Half-open range of fiber indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRange(pub Range<usize>);
impl SpecRange {
    /// Returns the range if it is not empty and within `[0,nspec)`
    pub fn check(&self, nspec: usize) -> Result<Range<usize>> {
        let Range { start, end } = self.0;
        if start >= end {
            return Err(PsfError::EmptySpecRange);
        }
        if end > nspec {
            return Err(PsfError::SpecIndex {
                index: end - 1,
                nspec,
            });
        }
        Ok(start..end)
    }
}
impl From<usize> for SpecRange {
    fn from(ispec: usize) -> Self {
        Self(ispec..ispec + 1)
    }
}
impl From<Range<usize>> for SpecRange {
    fn from(range: Range<usize>) -> Self {
        Self(range)
    }
}
impl From<RangeInclusive<usize>> for SpecRange {
    fn from(range: RangeInclusive<usize>) -> Self {
        let (start, end) = range.into_inner();
        Self(start..end + 1)
    }
}

/// Optional detector bounds of [Psf::xypix](super::Psf::xypix)
///
/// Unset bounds default to the detector edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bounds {
    pub xmin: Option<i64>,
    pub xmax: Option<i64>,
    pub ymin: Option<i64>,
    pub ymax: Option<i64>,
}
impl Bounds {
    pub fn xmin(self, xmin: i64) -> Self {
        Self {
            xmin: Some(xmin),
            ..self
        }
    }
    pub fn xmax(self, xmax: i64) -> Self {
        Self {
            xmax: Some(xmax),
            ..self
        }
    }
    pub fn ymin(self, ymin: i64) -> Self {
        Self {
            ymin: Some(ymin),
            ..self
        }
    }
    pub fn ymax(self, ymax: i64) -> Self {
        Self {
            ymax: Some(ymax),
            ..self
        }
    }
    pub fn resolve(&self, npix_x: usize, npix_y: usize) -> XyRange {
        XyRange::new(
            self.xmin.unwrap_or(0),
            self.xmax.unwrap_or(npix_x as i64),
            self.ymin.unwrap_or(0),
            self.ymax.unwrap_or(npix_y as i64),
        )
    }
}
impl From<XyRange> for Bounds {
    fn from(range: XyRange) -> Self {
        Self {
            xmin: Some(range.xmin),
            xmax: Some(range.xmax),
            ymin: Some(range.ymin),
            ymax: Some(range.ymax),
        }
    }
}

/// Evaluates `f(ispec, sample)` for every selected fiber and sample
///
/// [Samples::Native] stands for the native wavelengths of each fiber.
pub(crate) fn broadcast<P, F>(psf: &P, fibers: Fibers, samples: Samples<'_>, f: F) -> Result<Values>
where
    P: Psf + ?Sized,
    F: Fn(usize, f64) -> Result<f64>,
{
    let row = |ispec: usize| -> Result<Vec<f64>> {
        match samples {
            Samples::Native => psf
                .native_wavelengths(ispec)?
                .iter()
                .map(|&w| f(ispec, w))
                .collect(),
            Samples::One(value) => Ok(vec![f(ispec, value)?]),
            Samples::Many(values) => values.iter().map(|&v| f(ispec, v)).collect(),
        }
    };
    match (fibers, samples) {
        (Fibers::One(ispec), Samples::One(value)) => {
            psf.check_spec(ispec)?;
            Ok(Values::Scalar(f(ispec, value)?))
        }
        (Fibers::One(ispec), _) => {
            psf.check_spec(ispec)?;
            Ok(Values::Vector(row(ispec)?))
        }
        (Fibers::All, Samples::One(value)) => (0..psf.nspec())
            .map(|ispec| f(ispec, value))
            .collect::<Result<Vec<_>>>()
            .map(Values::Vector),
        (Fibers::All, _) => {
            let nspec = psf.nspec();
            let rows = (0..nspec).map(row).collect::<Result<Vec<_>>>()?;
            let ncols = rows.first().map_or(0, Vec::len);
            if let Some(found) = rows.iter().map(Vec::len).find(|&n| n != ncols) {
                return Err(PsfError::Ragged {
                    expected: ncols,
                    found,
                });
            }
            Ok(Values::Grid(DMatrix::from_row_iterator(
                nspec,
                ncols,
                rows.into_iter().flatten(),
            )))
        }
    }
}
