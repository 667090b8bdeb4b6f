//! PSF loading configuration

use std::{
    env,
    num::ParseFloatError,
    path::{Path, PathBuf},
};

use crate::psf::SpotGridPsf;

/// Default relative tolerance on the integer ratio of the detector to the spot pixel sizes
pub const DEFAULT_REBIN_TOLERANCE: f64 = 1e-6;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("environment variable not set")]
    Env(#[from] env::VarError),
    #[error("failed to parse {1:?}")]
    Parse(#[source] ParseFloatError, String),
}
type Result<T> = std::result::Result<T, ConfigError>;

/// Spot-grid PSF configuration
///
/// ```no_run
/// use fiber_psf::{Config, Psf};
/// let psf = Config::new("psf-spot.npz").rebin_tolerance(1e-3).load()?;
/// println!("{} fibers", psf.nspec());
/// # Ok::<(), fiber_psf::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    path: PathBuf,
    rebin_tolerance: f64,
    memoize_widths: bool,
}
impl Config {
    /// Configuration for the calibration file at `path`
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            rebin_tolerance: DEFAULT_REBIN_TOLERANCE,
            memoize_widths: true,
        }
    }
    /// Configuration from the environment variables
    ///
    /// `PSF_FILE` is the calibration file and the optional
    /// `PSF_REBIN_TOLERANCE` the rebin tolerance.
    pub fn from_env() -> Result<Self> {
        let path = env::var("PSF_FILE")?;
        let config = Self::new(path);
        match env::var("PSF_REBIN_TOLERANCE") {
            Ok(value) => {
                let tolerance = value
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::Parse(e, value.clone()))?;
                Ok(config.rebin_tolerance(tolerance))
            }
            Err(env::VarError::NotPresent) => Ok(config),
            Err(e) => Err(e.into()),
        }
    }
    /// Relative tolerance on the integer ratio of the detector to the spot pixel sizes
    pub fn rebin_tolerance(self, rebin_tolerance: f64) -> Self {
        Self {
            rebin_tolerance,
            ..self
        }
    }
    /// Memoizes the PSF widths (default: true)
    pub fn memoize_widths(self, memoize_widths: bool) -> Self {
        Self {
            memoize_widths,
            ..self
        }
    }
    pub fn path(&self) -> &Path {
        &self.path
    }
    /// Loads the calibration file and builds the PSF
    pub fn load(&self) -> crate::Result<SpotGridPsf> {
        let calibration = crate::Calibration::load(&self.path)?;
        Ok(SpotGridPsf::from_calibration(
            calibration,
            self.rebin_tolerance,
            self.memoize_widths,
        )?)
    }
}
