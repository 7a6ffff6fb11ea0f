//! Error taxonomy for the rectification and wavelength calibration core.
//!
//! Every failure aborts the reduction of the whole frame. Slit overlaps are
//! not errors: they are resolved by the compositor and surfaced as warnings.

use thiserror::Error;

/// Failure raised while validating inputs or reducing a frame.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RectWvError {
    /// Grism or filter of the frame does not match the calibration tags.
    #[error("{keyword} mismatch: frame has {frame:?}, calibration was derived for {calibration:?}")]
    IdentityMismatch {
        keyword: &'static str,
        frame: Option<String>,
        calibration: String,
    },

    /// DTU configuration of the frame differs from the calibration-time one
    /// and the caller asked for strict checking.
    #[error("DTU configurations do not match (frame: {frame}; calibration: {calibration})")]
    DtuMismatch { frame: String, calibration: String },

    /// A required header keyword is absent or has the wrong type.
    #[error("header keyword {0} is missing or not numeric")]
    MissingKeyword(String),

    /// Slit geometry falls outside the detector or is internally inconsistent.
    #[error("geometry fault in slitlet {islitlet}: {detail}")]
    GeometryFault { islitlet: u32, detail: String },

    /// The calibration carries no coefficients for a slit that is not listed
    /// as missing.
    #[error("slitlet {0} has no calibration coefficients")]
    SlitletNotCalibrated(u32),

    /// An array does not have the shape the operation expects.
    #[error("shape mismatch: expected {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ShapeMismatch {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    /// Wavelength solution is not strictly increasing across the slit.
    #[error("wavelength solution of slitlet {islitlet} is not monotonic")]
    NonMonotonicWavelength { islitlet: u32 },

    /// No output grid is known for the grism/filter pair.
    #[error("no wavelength parameters for grism {grism:?} and filter {filter:?}")]
    UnsupportedGrismFilter { grism: String, filter: String },

    /// Historical resampling code other than 1 or 2.
    #[error("invalid resampling code {0} (expected 1 or 2)")]
    InvalidResamplingCode(u8),

    /// A required field was never supplied to the calibration builder.
    #[error("calibration is missing required field `{0}`")]
    IncompleteCalibration(&'static str),

    /// The calibration content is inconsistent.
    #[error("invalid calibration: {0}")]
    InvalidCalibration(String),
}

pub type Result<T> = std::result::Result<T, RectWvError>;
