use crate::{calibration::CalibrationError, config::ConfigError, psf::PsfError};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("Error in the `calibration` module")]
    Calibration(#[from] CalibrationError),
    #[error("Error in the `psf` module")]
    Psf(#[from] PsfError),
    #[error("Error in the `config` module")]
    Config(#[from] ConfigError),
}
pub type Result<T> = std::result::Result<T, Error>;
