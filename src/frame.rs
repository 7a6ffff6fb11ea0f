//! Detector frames and detector geometry.

use nalgebra::DMatrix;

use crate::error::{RectWvError, Result};
use crate::header::Header;

/// Number of detector columns of EMIR.
pub const EMIR_NAXIS1: usize = 2048;
/// Number of detector rows of EMIR.
pub const EMIR_NAXIS2: usize = 2048;
/// Number of slit bars (and therefore slitlets) of the EMIR CSU.
pub const EMIR_NBARS: u32 = 55;

/// Fixed geometry of the detector and slit unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorGeometry {
    /// Number of columns (dispersion axis).
    pub naxis1: usize,
    /// Number of rows (spatial axis).
    pub naxis2: usize,
    /// Number of slit bars; slitlets are numbered `1..=nbars`.
    pub nbars: u32,
}

impl DetectorGeometry {
    pub fn emir() -> Self {
        Self {
            naxis1: EMIR_NAXIS1,
            naxis2: EMIR_NAXIS2,
            nbars: EMIR_NBARS,
        }
    }
}

impl Default for DetectorGeometry {
    fn default() -> Self {
        Self::emir()
    }
}

/// A 2D image together with its header.
///
/// `data` is indexed `(row, column)`; row 0 is detector scan 1 in the 1-based
/// convention used by the calibration polynomials.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorFrame {
    pub data: DMatrix<f64>,
    pub header: Header,
}

impl DetectorFrame {
    pub fn new(data: DMatrix<f64>, header: Header) -> Self {
        Self { data, header }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    /// Check that the pixel array has the shape of the detector.
    pub fn check_shape(&self, detector: &DetectorGeometry) -> Result<()> {
        if self.nrows() != detector.naxis2 || self.ncols() != detector.naxis1 {
            return Err(RectWvError::ShapeMismatch {
                expected_rows: detector.naxis2,
                expected_cols: detector.naxis1,
                rows: self.nrows(),
                cols: self.ncols(),
            });
        }
        Ok(())
    }

    /// Sum of all pixel values.
    pub fn total_flux(&self) -> f64 {
        self.data.sum()
    }
}
