//! Pixel stamps and detector windows

use std::{fmt, ops::Range};

use nalgebra::DMatrix;

/// Rectangular pixel window `[xmin,xmax) x [ymin,ymax)` on the detector
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct XyRange {
    pub xmin: i64,
    pub xmax: i64,
    pub ymin: i64,
    pub ymax: i64,
}
impl XyRange {
    pub fn new(xmin: i64, xmax: i64, ymin: i64, ymax: i64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
        }
    }
    /// The full detector
    pub fn detector(npix_x: usize, npix_y: usize) -> Self {
        Self::new(0, npix_x as i64, 0, npix_y as i64)
    }
    /// Number of columns
    pub fn nx(&self) -> usize {
        (self.xmax - self.xmin).max(0) as usize
    }
    /// Number of rows
    pub fn ny(&self) -> usize {
        (self.ymax - self.ymin).max(0) as usize
    }
    pub fn is_empty(&self) -> bool {
        self.nx() == 0 || self.ny() == 0
    }
    pub fn x_range(&self) -> Range<i64> {
        self.xmin..self.xmax
    }
    pub fn y_range(&self) -> Range<i64> {
        self.ymin..self.ymax
    }
    /// Smallest window containing both `self` and `other`
    pub fn union(self, other: Self) -> Self {
        Self {
            xmin: self.xmin.min(other.xmin),
            xmax: self.xmax.max(other.xmax),
            ymin: self.ymin.min(other.ymin),
            ymax: self.ymax.max(other.ymax),
        }
    }
    /// Overlap of `self` and `other`, collapsed to an empty window if they are disjoint
    pub fn intersection(self, other: Self) -> Self {
        let xmin = self.xmin.max(other.xmin);
        let ymin = self.ymin.max(other.ymin);
        Self {
            xmin,
            xmax: self.xmax.min(other.xmax).max(xmin),
            ymin,
            ymax: self.ymax.min(other.ymax).max(ymin),
        }
    }
}
impl From<(i64, i64, i64, i64)> for XyRange {
    fn from((xmin, xmax, ymin, ymax): (i64, i64, i64, i64)) -> Self {
        Self::new(xmin, xmax, ymin, ymax)
    }
}
impl fmt::Display for XyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x:[{},{}) y:[{},{})",
            self.xmin, self.xmax, self.ymin, self.ymax
        )
    }
}

/// PSF footprint of one fiber at one wavelength
///
/// `pix` has `yslice.len()` rows and `xslice.len()` columns and is placed on
/// the image at `[yslice, xslice]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    pub xslice: Range<i64>,
    pub yslice: Range<i64>,
    pub pix: DMatrix<f64>,
}
impl Stamp {
    pub fn new(xslice: Range<i64>, yslice: Range<i64>, pix: DMatrix<f64>) -> Self {
        Self {
            xslice,
            yslice,
            pix,
        }
    }
    /// A stamp with no pixels anchored at the given (empty) slices
    pub fn empty(xslice: Range<i64>, yslice: Range<i64>) -> Self {
        Self::new(xslice, yslice, DMatrix::zeros(0, 0))
    }
    pub fn is_empty(&self) -> bool {
        self.pix.is_empty()
    }
    /// Stamp size as (rows, columns)
    pub fn shape(&self) -> (usize, usize) {
        self.pix.shape()
    }
    pub fn window(&self) -> XyRange {
        XyRange::new(
            self.xslice.start,
            self.xslice.end,
            self.yslice.start,
            self.yslice.end,
        )
    }
    pub fn sum(&self) -> f64 {
        self.pix.sum()
    }
    /// Iterator over the stamp pixels as (x, y, value), row by row
    pub fn pixels(&self) -> impl Iterator<Item = (i64, i64, f64)> + '_ {
        let (nrows, ncols) = self.pix.shape();
        (0..nrows).flat_map(move |r| {
            (0..ncols).map(move |c| {
                (
                    self.xslice.start + c as i64,
                    self.yslice.start + r as i64,
                    self.pix[(r, c)],
                )
            })
        })
    }
    /// Crops the stamp to the `bounds` window
    ///
    /// The returned slices are relative to the bounds origin `(xmin, ymin)`.
    /// Rows and columns outside the bounds are dropped, never padded. A stamp
    /// entirely outside the bounds becomes empty with its slices collapsed on
    /// the bound it fell off.
    pub fn clip(self, bounds: XyRange) -> Self {
        let XyRange {
            xmin,
            xmax,
            ymin,
            ymax,
        } = bounds;
        let (nx, ny) = (xmax - xmin, ymax - ymin);
        let Self {
            xslice,
            yslice,
            pix,
        } = self;

        if yslice.start >= ymax {
            return Self::empty(0..0, ny..ny);
        }
        if yslice.end <= ymin {
            return Self::empty(0..0, 0..0);
        }
        if xslice.start >= xmax {
            return Self::empty(nx..nx, 0..0);
        }
        if xslice.end <= xmin {
            return Self::empty(0..0, 0..0);
        }

        let (xlo, xhi) = (xslice.start.max(xmin), xslice.end.min(xmax));
        let (ylo, yhi) = (yslice.start.max(ymin), yslice.end.min(ymax));
        let (nrows, ncols) = ((yhi - ylo).max(0) as usize, (xhi - xlo).max(0) as usize);
        let xslice_out = xlo - xmin..xlo - xmin + ncols as i64;
        let yslice_out = ylo - ymin..ylo - ymin + nrows as i64;
        if nrows == 0 || ncols == 0 {
            return Self::empty(xslice_out, yslice_out);
        }
        let offset = ((ylo - yslice.start) as usize, (xlo - xslice.start) as usize);
        let pix = pix.view(offset, (nrows, ncols)).into_owned();
        Self::new(xslice_out, yslice_out, pix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp() -> Stamp {
        // 3 rows x 4 columns at x:[10,14) y:[20,23)
        let pix = DMatrix::from_fn(3, 4, |r, c| (10 * r + c) as f64);
        Stamp::new(10..14, 20..23, pix)
    }

    #[test]
    fn clip_inside_is_relative() {
        let s = stamp().clip(XyRange::new(5, 30, 15, 40));
        assert_eq!(s.xslice, 5..9);
        assert_eq!(s.yslice, 5..8);
        assert_eq!(s.pix, stamp().pix);
    }

    #[test]
    fn clip_low_edges() {
        let s = stamp().clip(XyRange::new(12, 100, 21, 100));
        assert_eq!(s.xslice, 0..2);
        assert_eq!(s.yslice, 0..2);
        assert_eq!(s.shape(), (2, 2));
        assert_eq!(s.pix[(0, 0)], 12.0);
        assert_eq!(s.pix[(1, 1)], 23.0);
    }

    #[test]
    fn clip_high_edges() {
        let s = stamp().clip(XyRange::new(0, 13, 0, 22));
        assert_eq!(s.xslice, 10..13);
        assert_eq!(s.yslice, 20..22);
        assert_eq!(s.pix[(1, 2)], 12.0);
    }

    #[test]
    fn clip_both_sides() {
        let s = stamp().clip(XyRange::new(11, 13, 21, 22));
        assert_eq!(s.shape(), (1, 2));
        assert_eq!(s.pix[(0, 0)], 11.0);
        assert_eq!(s.pix[(0, 1)], 12.0);
    }

    #[test]
    fn clip_off_edges() {
        let above = stamp().clip(XyRange::new(0, 50, 0, 20));
        assert!(above.is_empty());
        assert_eq!((above.xslice, above.yslice), (0..0, 20..20));
        let below = stamp().clip(XyRange::new(0, 50, 23, 60));
        assert_eq!((below.xslice, below.yslice), (0..0, 0..0));
        let right = stamp().clip(XyRange::new(0, 10, 0, 50));
        assert_eq!((right.xslice, right.yslice), (10..10, 0..0));
        let left = stamp().clip(XyRange::new(14, 50, 0, 50));
        assert_eq!(left.shape(), (0, 0));
    }

    #[test]
    fn window_union() {
        let a = XyRange::new(0, 10, 5, 8);
        let b = XyRange::new(-2, 4, 6, 12);
        assert_eq!(a.union(b), XyRange::new(-2, 10, 5, 12));
        assert_eq!(a.intersection(b), XyRange::new(0, 4, 6, 8));
        assert!(a.intersection(XyRange::new(20, 30, 0, 1)).is_empty());
    }
}
