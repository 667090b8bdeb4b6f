use super::{Calibration, PixelScales, Result, SpotGrid};
use crate::psf::Trace;

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Synthetic spot-grid calibration
///
/// Fibers are evenly spaced along the detector columns with a slightly curved
/// trace and a linear dispersion along the rows. The spots are elliptical
/// Gaussians whose widths grow with the slit position and the wavelength.
///
/// ```
/// use fiber_psf::calibration::Synthetic;
/// let calibration = Synthetic::default().nspec(10).build().unwrap();
/// assert_eq!(calibration.nspec(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct Synthetic {
    nspec: usize,
    nwave: usize,
    wavelength_range: (f64, f64),
    fiber_spacing: f64,
    npix_y: usize,
    nslit: usize,
    nspotwave: usize,
    spot_size: usize,
    rebin: usize,
    sigma: f64,
}
impl Default for Synthetic {
    fn default() -> Self {
        Self {
            nspec: 20,
            nwave: 50,
            wavelength_range: (5000f64, 6000f64),
            fiber_spacing: 8f64,
            npix_y: 300,
            nslit: 5,
            nspotwave: 6,
            spot_size: 30,
            rebin: 5,
            sigma: 1f64,
        }
    }
}
impl Synthetic {
    /// Number of fibers
    pub fn nspec(self, nspec: usize) -> Self {
        Self { nspec, ..self }
    }
    /// Number of native wavelengths per fiber
    pub fn nwave(self, nwave: usize) -> Self {
        Self { nwave, ..self }
    }
    pub fn wavelength_range(self, wmin: f64, wmax: f64) -> Self {
        Self {
            wavelength_range: (wmin, wmax),
            ..self
        }
    }
    /// Distance between fibers in detector pixels
    pub fn fiber_spacing(self, fiber_spacing: f64) -> Self {
        Self {
            fiber_spacing,
            ..self
        }
    }
    /// Number of detector rows
    pub fn npix_y(self, npix_y: usize) -> Self {
        Self { npix_y, ..self }
    }
    /// Number of (slit positions, wavelengths) of the spot grid
    pub fn spot_grid(self, nslit: usize, nspotwave: usize) -> Self {
        Self {
            nslit,
            nspotwave,
            ..self
        }
    }
    /// Spot image size in spot pixels
    pub fn spot_size(self, spot_size: usize) -> Self {
        Self { spot_size, ..self }
    }
    /// Number of spot pixels per detector pixel
    pub fn rebin(self, rebin: usize) -> Self {
        Self { rebin, ..self }
    }
    /// Spot Gaussian width in detector pixels
    pub fn sigma(self, sigma: f64) -> Self {
        Self { sigma, ..self }
    }
    /// Detector size as (columns, rows)
    pub fn npix(&self) -> (usize, usize) {
        (
            (self.fiber_spacing * (self.nspec + 1) as f64).ceil() as usize,
            self.npix_y,
        )
    }

    fn spot(&self, slitpos: f64, t: f64) -> Vec<f64> {
        let n = self.spot_size;
        let c = (n as f64 - 1f64) * 0.5;
        let r = self.rebin as f64;
        let sx = self.sigma * (1f64 + 0.1 * slitpos) * r;
        let sy = self.sigma * (1f64 + 0.2 * t) * r;
        (0..n * n)
            .map(|k| {
                let (x, y) = ((k % n) as f64 - c, (k / n) as f64 - c);
                (-0.5 * ((x / sx).powi(2) + (y / sy).powi(2))).exp()
            })
            .collect()
    }

    pub fn build(&self) -> Result<Calibration> {
        let (wmin, wmax) = self.wavelength_range;
        let (npix_x, npix_y) = self.npix();

        let spotpos = linspace(-1f64, 1f64, self.nslit);
        let spotwave = linspace(wmin, wmax, self.nspotwave);
        let data: Vec<f64> = spotpos
            .iter()
            .flat_map(|&p| {
                spotwave
                    .iter()
                    .flat_map(move |&w| self.spot(p, (w - wmin) / (wmax - wmin)))
            })
            .collect();
        let spots = SpotGrid::new(
            data,
            [self.nslit, self.nspotwave, self.spot_size, self.spot_size],
        )?;

        let fiberpos = linspace(-1f64, 1f64, self.nspec);
        let wavelength = linspace(wmin, wmax, self.nwave);
        let traces = (0..self.nspec)
            .map(|i| {
                let x0 = self.fiber_spacing * (i + 1) as f64;
                let (x, y): (Vec<f64>, Vec<f64>) = wavelength
                    .iter()
                    .map(|w| {
                        let t = (w - wmin) / (wmax - wmin);
                        (
                            x0 + 0.3 * (2f64 * t - 1f64).powi(2),
                            10f64 + (npix_y as f64 - 20f64) * t,
                        )
                    })
                    .unzip();
                Trace::new(wavelength.clone(), x, y)
            })
            .collect();

        let scales = PixelScales::new(15f64, 15f64 / self.rebin as f64)?;
        Calibration::new(
            spots,
            fiberpos,
            spotpos,
            spotwave,
            scales,
            (npix_x, npix_y),
            traces,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_geometry() {
        let cal = Synthetic::default().build().unwrap();
        assert_eq!((cal.nspec(), cal.nwave()), (20, 50));
        assert_eq!(cal.npix(), (168, 300));
        assert_eq!(cal.spots().shape(), [5, 6, 30, 30]);
        assert_eq!(cal.pixel_scales().rebin_factor(1e-6).unwrap().get(), 5);
        let trace = &cal.traces()[3];
        assert_eq!(trace.wmin(), 5000.);
        assert_eq!(trace.wmax(), 6000.);
        assert!(trace.y().iter().all(|y| (10. ..=290.).contains(y)));
    }

    #[test]
    fn empty_synthetic_is_rejected() {
        assert!(Synthetic::default().nspec(0).build().is_err());
        assert!(Synthetic::default().nwave(1).build().is_err());
    }
}
