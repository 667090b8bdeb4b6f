//! Spot resampling
//!
//! Turns a high-resolution spot image into a detector-resolution pixel stamp
//! centered at an arbitrary sub-pixel position.
//!
//! The spot is first shifted on its own fine grid: the integer part of the
//! shift (in spot pixels) is an offset into a padded working grid and the
//! fractional part is applied by splatting every spot pixel onto its four
//! nearest neighbors with bilinear weights. The working grid is then summed
//! by blocks of `rebin x rebin` spot pixels into detector pixels.

use std::num::NonZeroUsize;

use nalgebra::DMatrix;

use crate::stamp::Stamp;

/// Number of spot pixels per detector pixel along each axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RebinFactor(NonZeroUsize);
impl RebinFactor {
    /// Returns `None` for a zero factor
    pub fn new(factor: usize) -> Option<Self> {
        NonZeroUsize::new(factor).map(Self)
    }
    pub fn get(&self) -> usize {
        self.0.get()
    }
}

/// Number of detector pixels spanned by `n_spot` spot pixels once padded by `rebin`
fn ccd_size(n_spot: usize, rebin: usize) -> usize {
    (n_spot + 2 * rebin - 1) / rebin
}

/// Splits a detector coordinate into
/// (detector pixel, fractional spot-pixel offset, integer spot-pixel offset)
fn split(center: f64, rebin: usize) -> (i64, f64, usize) {
    let r = rebin as i64;
    let scaled = center * rebin as f64;
    let fine = scaled.floor();
    let frac = scaled - fine;
    let mut coarse = center.floor() as i64;
    let mut sub = fine as i64 - coarse * r;
    // rounding of `center * rebin` may cross a detector pixel boundary
    if sub >= r {
        coarse += 1;
        sub -= r;
    } else if sub < 0 {
        coarse -= 1;
        sub += r;
    }
    (coarse, frac, sub as usize)
}

/// Resamples the high-resolution `spot` image to a detector stamp centered at (`xc`,`yc`)
///
/// The stamp is normalized to a unit sum, unless its raw sum is not positive
/// in which case it is left as is (all zeros after clipping negative values).
/// The stamp window has as many columns and rows as the stamp.
pub fn resample(spot: &DMatrix<f64>, xc: f64, yc: f64, rebin: RebinFactor) -> Stamp {
    let r = rebin.get();
    let (ny_spot, nx_spot) = spot.shape();
    let (ny_ccd, nx_ccd) = (ccd_size(ny_spot, r), ccd_size(nx_spot, r));

    let (x_pixel, dx, ix) = split(xc, r);
    let (y_pixel, dy, iy) = split(yc, r);

    // (row offset, column offset, weight)
    let splats = [
        (0, 0, (1f64 - dy) * (1f64 - dx)),
        (1, 0, dy * (1f64 - dx)),
        (0, 1, (1f64 - dy) * dx),
        (1, 1, dy * dx),
    ];
    let mut shifted = DMatrix::<f64>::zeros(ny_ccd * r, nx_ccd * r);
    for (oy, ox, weight) in splats {
        for col in 0..nx_spot {
            for row in 0..ny_spot {
                shifted[(iy + oy + row, ix + ox + col)] += weight * spot[(row, col)];
            }
        }
    }

    let mut pix = DMatrix::<f64>::from_fn(ny_ccd, nx_ccd, |j, i| {
        shifted.view((j * r, i * r), (r, r)).sum()
    });
    pix.apply(|v| {
        if *v < 0f64 {
            *v = 0f64
        }
    });
    let norm = pix.sum();
    if norm > 0f64 {
        pix /= norm;
    }

    let x0 = x_pixel - (nx_ccd / 2) as i64 + 1;
    let y0 = y_pixel - (ny_ccd / 2) as i64 + 1;
    Stamp::new(x0..x0 + nx_ccd as i64, y0..y0 + ny_ccd as i64, pix)
}
