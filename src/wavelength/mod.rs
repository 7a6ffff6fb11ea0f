//! Output wavelength grids and the grism/filter lookup that selects them.
//!
//! Every slitlet of a frame is resampled onto the same linear wavelength
//! grid. Pixel `k` (1-based) of the output is centred at
//!
//! ```text
//! λ(k) = crval1 + (k - crpix1) · cdelt1
//! ```
//!
//! The grid depends only on the grism and filter, and is obtained through a
//! [`WavelengthParameterResolver`]. [`EmirWavelengthTable`] carries the
//! values used for EMIR; [`CsvWavelengthTable`] reads them from a file.

pub mod resample;

use std::path::Path;

use anyhow::Context;

use crate::error::{RectWvError, Result};

pub use resample::resample_image2d_flux;

/// Width of the enlarged EMIR output grid.
pub const EMIR_NAXIS1_ENLARGED: usize = 3400;

/// Linear wavelength grid shared by all slitlets of a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputGrid {
    /// Reference pixel (1-based).
    pub crpix1: f64,
    /// Wavelength at the reference pixel (Angstrom).
    pub crval1: f64,
    /// Linear dispersion (Angstrom/pixel).
    pub cdelt1: f64,
    /// Number of output columns.
    pub naxis1: usize,
    /// Wavelength interval with useful signal, if restricted.
    pub wv_useful: Option<(f64, f64)>,
}

impl OutputGrid {
    /// Wavelength at a (1-based, possibly fractional) output pixel.
    #[inline]
    pub fn wavelength_at(&self, pixel: f64) -> f64 {
        self.crval1 + (pixel - self.crpix1) * self.cdelt1
    }

    /// Output pixel (1-based, fractional) at a wavelength.
    #[inline]
    pub fn pixel_at(&self, wavelength: f64) -> f64 {
        (wavelength - self.crval1) / self.cdelt1 + self.crpix1
    }

    /// Wavelengths of the `naxis1 + 1` pixel borders.
    pub fn border_wavelengths(&self) -> Vec<f64> {
        (0..=self.naxis1)
            .map(|k| self.wavelength_at(k as f64 + 0.5))
            .collect()
    }

    /// First and last output pixel (1-based, inclusive) whose centre lies in
    /// the useful wavelength interval. `None` when the grid has no useful
    /// range or it does not overlap the grid.
    pub fn useful_pixel_range(&self) -> Option<(usize, usize)> {
        let (wvmin, wvmax) = self.wv_useful?;
        let p1 = self.pixel_at(wvmin).ceil().max(1.0);
        let p2 = self.pixel_at(wvmax).floor().min(self.naxis1 as f64);
        (p1 <= p2).then(|| (p1 as usize, p2 as usize))
    }
}

/// Source of output grid parameters for a grism/filter pair.
pub trait WavelengthParameterResolver {
    /// # Errors
    ///
    /// [`RectWvError::UnsupportedGrismFilter`] when the pair is unknown.
    fn resolve(&self, grism: &str, filter: &str) -> Result<OutputGrid>;
}

/// Output grids used for EMIR.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmirWavelengthTable;

impl WavelengthParameterResolver for EmirWavelengthTable {
    fn resolve(&self, grism: &str, filter: &str) -> Result<OutputGrid> {
        let (crval1, cdelt1, wv_useful) = match (grism, filter) {
            ("J", "J") => (11200.0, 0.77, None),
            ("H", "H") => (14500.0, 1.22, None),
            ("K", "Ksp") => (19100.0, 1.73, None),
            ("LR", "YJ") => (8900.0, 3.56, Some((8900.0, 13700.0))),
            ("LR", "HK") => (14500.0, 5.19, Some((14500.0, 24300.0))),
            _ => {
                return Err(RectWvError::UnsupportedGrismFilter {
                    grism: grism.to_string(),
                    filter: filter.to_string(),
                })
            }
        };
        Ok(OutputGrid {
            crpix1: 1.0,
            crval1,
            cdelt1,
            naxis1: EMIR_NAXIS1_ENLARGED,
            wv_useful,
        })
    }
}

/// Grism/filter table read from CSV.
///
/// Columns: `grism,filter,crpix1,crval1,cdelt1,naxis1,wvmin_useful,wvmax_useful`.
/// The first line is a header. The two useful-range columns may be empty.
#[derive(Debug, Clone, Default)]
pub struct CsvWavelengthTable {
    entries: Vec<(String, String, OutputGrid)>,
}

impl CsvWavelengthTable {
    pub fn from_csv<P: AsRef<Path>>(file: P) -> anyhow::Result<Self> {
        let file = file.as_ref();
        let rdr = csv::Reader::from_path(file)
            .with_context(|| format!("Failed to open wavelength table: {}", file.display()))?;
        Self::from_reader(rdr)
    }

    pub fn from_reader<R: std::io::Read>(mut rdr: csv::Reader<R>) -> anyhow::Result<Self> {
        let mut entries = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result?;
            let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");
            let number = |i: usize| -> anyhow::Result<f64> {
                field(i)
                    .parse::<f64>()
                    .with_context(|| format!("row {}: bad value {:?} in column {}", line + 1, field(i), i))
            };
            let optional = |i: usize| -> anyhow::Result<Option<f64>> {
                match field(i) {
                    "" => Ok(None),
                    s => Ok(Some(s.parse::<f64>().with_context(|| {
                        format!("row {}: bad value {:?} in column {}", line + 1, s, i)
                    })?)),
                }
            };

            let naxis1: usize = field(5)
                .parse()
                .with_context(|| format!("row {}: bad naxis1 {:?}", line + 1, field(5)))?;
            let wv_useful = match (optional(6)?, optional(7)?) {
                (Some(a), Some(b)) => Some((a, b)),
                _ => None,
            };
            entries.push((
                field(0).to_string(),
                field(1).to_string(),
                OutputGrid {
                    crpix1: number(2)?,
                    crval1: number(3)?,
                    cdelt1: number(4)?,
                    naxis1,
                    wv_useful,
                },
            ));
        }
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl WavelengthParameterResolver for CsvWavelengthTable {
    fn resolve(&self, grism: &str, filter: &str) -> Result<OutputGrid> {
        self.entries
            .iter()
            .find(|(g, f, _)| g == grism && f == filter)
            .map(|(_, _, grid)| *grid)
            .ok_or_else(|| RectWvError::UnsupportedGrismFilter {
                grism: grism.to_string(),
                filter: filter.to_string(),
            })
    }
}
