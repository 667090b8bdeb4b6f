/*!
# Projection engine

[project] renders spectra, as photon counts per (fiber, wavelength) sample, on
the detector by summing the PSF stamps scaled by the photon counts.
[projection_matrix] records the same sum as a sparse linear operator from the
photon counts to the pixels of a detector window, the system solved by the
spectral extraction.

For the same fibers, wavelengths and window, the image given by
[ProjectionMatrix::apply] is identical, bit for bit, to the image given by
[project]: the stamps are the same and they are summed in the same order.
*/

use itertools::Itertools;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::{CooMatrix, CscMatrix};
use rayon::prelude::*;

use crate::{
    psf::{Bounds, Psf, PsfError, Result, SpecRange},
    stamp::{Stamp, XyRange},
};

/// Sparse projection operator in compressed sparse column format
///
/// There is one column per (fiber, wavelength) sample, fiber major, and one
/// row per pixel of the window, row major.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionMatrix {
    matrix: CscMatrix<f64>,
    window: XyRange,
}
impl ProjectionMatrix {
    /// Builds the operator from the clipped stamps of each column
    ///
    /// The stamps slices are relative to the `window` origin.
    fn from_stamps(window: XyRange, stamps: &[Stamp]) -> Self {
        let nx = window.nx();
        let mut coo = CooMatrix::new(nx * window.ny(), stamps.len());
        for (k, stamp) in stamps.iter().enumerate() {
            stamp
                .pixels()
                .filter(|(_, _, v)| *v != 0f64)
                .for_each(|(x, y, v)| coo.push(y as usize * nx + x as usize, k, v));
        }
        Self {
            matrix: CscMatrix::from(&coo),
            window,
        }
    }
    /// (pixels, samples)
    pub fn shape(&self) -> (usize, usize) {
        (self.matrix.nrows(), self.matrix.ncols())
    }
    /// Number of stored (non-zero) values
    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }
    /// Detector window of the rows
    pub fn window(&self) -> XyRange {
        self.window
    }
    /// The sparse matrix
    pub fn as_csc(&self) -> &CscMatrix<f64> {
        &self.matrix
    }
    /// Non-zero entries of column `k` as (row, value)
    ///
    /// # Panics
    /// If `k` is out of range
    pub fn column(&self, k: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.matrix.col_offsets()[k]..self.matrix.col_offsets()[k + 1];
        self.matrix.row_indices()[range.clone()]
            .iter()
            .copied()
            .zip(self.matrix.values()[range].iter().copied())
    }
    /// Pixel values `A.p` for the photon counts `photons`
    pub fn dot(&self, photons: &[f64]) -> Result<DVector<f64>> {
        let (_, ncols) = self.shape();
        if photons.len() != ncols {
            return Err(PsfError::PhotonCount {
                expected: ncols,
                found: photons.len(),
            });
        }
        Ok(&self.matrix * &DVector::from_column_slice(photons))
    }
    /// Sample values `A^T.d` for the window pixels `pixels`
    pub fn dot_transpose(&self, pixels: &[f64]) -> Result<DVector<f64>> {
        let (nrows, _) = self.shape();
        if pixels.len() != nrows {
            return Err(PsfError::PixelCount {
                expected: nrows,
                found: pixels.len(),
            });
        }
        Ok(&self.matrix.transpose() * &DVector::from_column_slice(pixels))
    }
    /// Image of the window for the photon counts `photons`
    pub fn apply(&self, photons: &[f64]) -> Result<DMatrix<f64>> {
        let pixels = self.dot(photons)?;
        Ok(DMatrix::from_row_slice(
            self.window.ny(),
            self.window.nx(),
            pixels.as_slice(),
        ))
    }
    pub fn to_dense(&self) -> DMatrix<f64> {
        DMatrix::from(&self.matrix)
    }
}

/// Element `(i,j)` of `m`, a single row being repeated
fn broadcast_at(m: &DMatrix<f64>, i: usize, j: usize) -> f64 {
    if m.nrows() == 1 {
        m[(0, j)]
    } else {
        m[(i, j)]
    }
}

/// Renders `photons` at `wavelengths` on the detector
///
/// `photons` and `wavelengths` have one row per fiber, starting with fiber
/// `specmin`, and one column per sample; a single row is repeated to match the
/// number of rows of the other one. The image covers the whole detector
/// (`npix_y` rows and `npix_x` columns) or the `xyrange` window only.
/// Samples with no photon are skipped.
pub fn project<P: Psf + ?Sized>(
    psf: &P,
    photons: &DMatrix<f64>,
    wavelengths: &DMatrix<f64>,
    specmin: usize,
    xyrange: Option<XyRange>,
) -> Result<DMatrix<f64>> {
    let (nphot, nwave) = (photons.shape(), wavelengths.shape());
    let nrows = match (nphot.0, nwave.0) {
        (a, b) if a == b => a,
        (1, b) => b,
        (a, 1) => a,
        _ => 0,
    };
    if nphot.1 != nwave.1 || nrows == 0 {
        return Err(PsfError::Broadcast {
            photons: nphot,
            wavelengths: nwave,
        });
    }
    let nspec = psf.nspec();
    if specmin + nrows > nspec {
        return Err(PsfError::SpecIndex {
            index: specmin.max(nspec),
            nspec,
        });
    }
    let window = xyrange.unwrap_or_else(|| XyRange::detector(psf.npix_x(), psf.npix_y()));
    let bounds = Bounds::from(window);

    let jobs: Vec<_> = (0..nrows)
        .cartesian_product(0..nphot.1)
        .filter(|&(i, j)| broadcast_at(photons, i, j) != 0f64)
        .collect();
    log::debug!(
        "projecting {} samples of fibers [{},{}) on {}",
        jobs.len(),
        specmin,
        specmin + nrows,
        window
    );
    let stamps = jobs
        .par_iter()
        .map(|&(i, j)| psf.xypix(specmin + i, broadcast_at(wavelengths, i, j), bounds))
        .collect::<Result<Vec<_>>>()?;

    let mut image = DMatrix::<f64>::zeros(window.ny(), window.nx());
    for (&(i, j), stamp) in jobs.iter().zip(&stamps) {
        let phot = broadcast_at(photons, i, j);
        for (x, y, v) in stamp.pixels() {
            image[(y as usize, x as usize)] += v * phot;
        }
    }
    Ok(image)
}

/// Sparse operator mapping the photon counts of the `specs` fibers at `wavelengths` to the `xyrange` window
///
/// The photon counts are ordered fiber major, the same wavelengths being used
/// for every fiber, and the window pixels row major.
pub fn projection_matrix<P: Psf + ?Sized>(
    psf: &P,
    specs: SpecRange,
    wavelengths: &[f64],
    xyrange: XyRange,
) -> Result<ProjectionMatrix> {
    let specs = specs.check(psf.nspec())?;
    let bounds = Bounds::from(xyrange);
    let jobs: Vec<_> = specs
        .clone()
        .cartesian_product(wavelengths.iter().copied())
        .collect();
    log::debug!(
        "projection matrix of {} samples of fibers {:?} on {}",
        jobs.len(),
        specs,
        xyrange
    );
    let stamps = jobs
        .par_iter()
        .map(|&(ispec, w)| psf.xypix(ispec, w, bounds))
        .collect::<Result<Vec<_>>>()?;
    Ok(ProjectionMatrix::from_stamps(xyrange, &stamps))
}
