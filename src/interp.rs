//! Linear interpolation helpers
//!
//! [`GridInterp`] blends the high-resolution spot images sampled on the
//! (slit position, wavelength) grid and [`interp_linear`] evaluates the
//! tabulated fiber traces.

use nalgebra::DMatrix;

use crate::calibration::SpotGrid;

/// Locates `value` on a sorted `axis`
///
/// Returns the indices of the bracketing samples and the interpolation
/// fraction, limited to `[0,1]` so queries beyond the axis ends stick to the
/// edge samples.
fn bracket(axis: &[f64], value: f64) -> (usize, usize, f64) {
    if axis.len() < 2 {
        return (0, 0, 0f64);
    }
    let hi = axis
        .partition_point(|&a| a <= value)
        .clamp(1, axis.len() - 1);
    let lo = hi - 1;
    let t = ((value - axis[lo]) / (axis[hi] - axis[lo])).clamp(0f64, 1f64);
    (lo, hi, t)
}

/// Piecewise linear interpolation of `(xp, fp)` at `x`
///
/// `xp` must be sorted in ascending order. Beyond the ends, the first or last
/// segment is extrapolated. The tabulated values are returned exactly at the
/// nodes.
pub fn interp_linear(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    match xp.len() {
        0 => f64::NAN,
        1 => fp[0],
        n => {
            let hi = xp.partition_point(|&v| v <= x).clamp(1, n - 1);
            let lo = hi - 1;
            let t = (x - xp[lo]) / (xp[hi] - xp[lo]);
            if t == 0f64 {
                fp[lo]
            } else if t == 1f64 {
                fp[hi]
            } else {
                fp[lo] * (1f64 - t) + fp[hi] * t
            }
        }
    }
}

/// Bilinear interpolator of spot images over the (slit position, wavelength) grid
#[derive(Debug, Clone)]
pub struct GridInterp {
    slitpos: Vec<f64>,
    wavelength: Vec<f64>,
    spots: SpotGrid,
}
impl GridInterp {
    /// Creates the interpolator
    ///
    /// The axes must be sorted in ascending order and match the first two
    /// dimensions of `spots`; both are checked by [`Calibration`](crate::Calibration).
    pub fn new(slitpos: Vec<f64>, wavelength: Vec<f64>, spots: SpotGrid) -> Self {
        Self {
            slitpos,
            wavelength,
            spots,
        }
    }
    /// Spot image size as (rows, columns)
    pub fn image_shape(&self) -> (usize, usize) {
        self.spots.image_shape()
    }
    /// Interpolates the spot image at slit position `p` and wavelength `w`
    pub fn eval(&self, p: f64, w: f64) -> DMatrix<f64> {
        let (ip0, ip1, dp) = bracket(&self.slitpos, p);
        let (iw0, iw1, dw) = bracket(&self.wavelength, w);
        let (ny, nx) = self.spots.image_shape();

        let s00 = self.spots.image(ip0, iw0);
        let s10 = self.spots.image(ip1, iw0);
        let s01 = self.spots.image(ip0, iw1);
        let s11 = self.spots.image(ip1, iw1);

        let data: Vec<f64> = s00
            .iter()
            .zip(s10)
            .zip(s01.iter().zip(s11))
            .map(|((a00, a10), (a01, a11))| {
                let low = a00 * (1f64 - dp) + a10 * dp;
                let high = a01 * (1f64 - dp) + a11 * dp;
                low * (1f64 - dw) + high * dw
            })
            .collect();
        DMatrix::from_row_slice(ny, nx, &data)
    }
}
