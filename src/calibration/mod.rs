//! Rectification and wavelength calibration coefficients.
//!
//! A [`CalibrationBundle`] holds everything derived for one CSU configuration
//! and one grism/filter pair: per-slitlet frontier curves, bounding-box hints
//! and wavelength solutions, together with the DTU configuration and the
//! provenance identifiers of the calibration.
//!
//! The bundle is immutable once built. It is constructed through
//! [`CalibrationBundleBuilder`], which checks that every required field has
//! been supplied and that the slitlet coefficients are consistent before any
//! reduction starts. Persistence (JSON documents and rkyv binary caches)
//! lives in [`io`].

pub mod io;

use crate::dtu::DtuConfiguration;
use crate::error::{RectWvError, Result};
use crate::frame::EMIR_NBARS;
use crate::polynomial::Polynomial;

/// Instrument configuration the calibration was derived for.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct CalibrationTags {
    pub grism: String,
    pub filter: String,
}

/// Identifiers tracing where a calibration came from.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct Provenance {
    /// Unique id of this calibration.
    pub uuid: String,
    /// Id of the boundary-parameter fit the frontiers come from.
    pub bound_param: String,
    /// Id of the master calibration this one was interpolated from, if any.
    pub master_rectwv: Option<String>,
}

/// Coefficients of one slitlet.
///
/// Polynomials take 1-based detector columns. Frontier polynomials return
/// 1-based detector rows; `wpoly` returns wavelengths in Angstrom.
#[derive(
    Debug,
    Clone,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct SlitletCoefficients {
    /// Slitlet number, `1..=nbars`.
    pub islitlet: u32,
    /// Boundary with the previous slitlet in the distorted image.
    pub frontier_lower: Polynomial,
    /// Boundary with the next slitlet in the distorted image.
    pub frontier_upper: Polynomial,
    /// Row of the lower frontier in the rectified image.
    pub y0_frontier_lower: f64,
    /// Row of the upper frontier in the rectified image.
    pub y0_frontier_upper: f64,
    /// First detector column (1-based) of the bounding box.
    pub bb_nc1_orig: u32,
    /// Last detector column (1-based) of the bounding box.
    pub bb_nc2_orig: u32,
    /// Rows added below and above the slitlet footprint.
    pub ymargin_bb: u32,
    /// Wavelength solution (detector column → Angstrom).
    #[serde(rename = "wpoly_coeff")]
    pub wpoly: Polynomial,
}

/// Immutable calibration for one CSU configuration and grism/filter pair.
#[derive(
    Debug,
    Clone,
    PartialEq,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct CalibrationBundle {
    tags: CalibrationTags,
    nbars: u32,
    missing_slitlets: Vec<u32>,
    contents: Vec<SlitletCoefficients>,
    dtu_configuration: DtuConfiguration,
    provenance: Provenance,
}

impl CalibrationBundle {
    pub fn builder() -> CalibrationBundleBuilder {
        CalibrationBundleBuilder::default()
    }

    pub fn tags(&self) -> &CalibrationTags {
        &self.tags
    }

    /// Number of slit bars the calibration covers.
    pub fn nbars(&self) -> u32 {
        self.nbars
    }

    /// Slitlets excluded from the reduction, sorted ascending.
    pub fn missing_slitlets(&self) -> &[u32] {
        &self.missing_slitlets
    }

    /// Coefficients of every calibrated slitlet, sorted by slitlet number.
    pub fn contents(&self) -> &[SlitletCoefficients] {
        &self.contents
    }

    pub fn dtu_configuration(&self) -> &DtuConfiguration {
        &self.dtu_configuration
    }

    pub fn provenance(&self) -> &Provenance {
        &self.provenance
    }

    /// Slitlet numbers to reduce: `1..=nbars` without the missing ones, in
    /// increasing order.
    pub fn valid_slitlets(&self) -> Vec<u32> {
        (1..=self.nbars)
            .filter(|i| self.missing_slitlets.binary_search(i).is_err())
            .collect()
    }

    /// Coefficients of one slitlet, if calibrated.
    pub fn slitlet(&self, islitlet: u32) -> Option<&SlitletCoefficients> {
        self.contents
            .binary_search_by_key(&islitlet, |c| c.islitlet)
            .ok()
            .map(|i| &self.contents[i])
    }
}

/// Validating constructor for [`CalibrationBundle`].
///
/// `tags`, `dtu_configuration` and `provenance` are required. `nbars`
/// defaults to the EMIR slit unit.
#[derive(Debug, Clone, Default)]
pub struct CalibrationBundleBuilder {
    tags: Option<CalibrationTags>,
    nbars: Option<u32>,
    missing_slitlets: Vec<u32>,
    contents: Vec<SlitletCoefficients>,
    dtu_configuration: Option<DtuConfiguration>,
    provenance: Option<Provenance>,
}

impl CalibrationBundleBuilder {
    pub fn tags(mut self, grism: impl Into<String>, filter: impl Into<String>) -> Self {
        self.tags = Some(CalibrationTags {
            grism: grism.into(),
            filter: filter.into(),
        });
        self
    }

    pub fn nbars(mut self, nbars: u32) -> Self {
        self.nbars = Some(nbars);
        self
    }

    pub fn missing_slitlets(mut self, missing: impl IntoIterator<Item = u32>) -> Self {
        self.missing_slitlets = missing.into_iter().collect();
        self
    }

    pub fn slitlet(mut self, coeffs: SlitletCoefficients) -> Self {
        self.contents.push(coeffs);
        self
    }

    pub fn slitlets(mut self, coeffs: impl IntoIterator<Item = SlitletCoefficients>) -> Self {
        self.contents.extend(coeffs);
        self
    }

    pub fn dtu_configuration(mut self, dtu: DtuConfiguration) -> Self {
        self.dtu_configuration = Some(dtu);
        self
    }

    pub fn provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = Some(provenance);
        self
    }

    /// Check all fields and build the bundle.
    ///
    /// # Errors
    ///
    /// - [`RectWvError::IncompleteCalibration`] if a required field is absent.
    /// - [`RectWvError::InvalidCalibration`] for out-of-range or duplicated
    ///   slitlet numbers, or coefficients given for a missing slitlet.
    /// - [`RectWvError::SlitletNotCalibrated`] if a slitlet that is not
    ///   listed as missing has no coefficients.
    pub fn build(self) -> Result<CalibrationBundle> {
        let tags = self.tags.ok_or(RectWvError::IncompleteCalibration("tags"))?;
        let dtu_configuration = self
            .dtu_configuration
            .ok_or(RectWvError::IncompleteCalibration("dtu_configuration"))?;
        let provenance = self
            .provenance
            .ok_or(RectWvError::IncompleteCalibration("provenance"))?;
        if provenance.uuid.is_empty() {
            return Err(RectWvError::IncompleteCalibration("uuid"));
        }
        if provenance.bound_param.is_empty() {
            return Err(RectWvError::IncompleteCalibration("bound_param"));
        }
        if tags.grism.is_empty() || tags.filter.is_empty() {
            return Err(RectWvError::IncompleteCalibration("tags"));
        }
        let nbars = self.nbars.unwrap_or(EMIR_NBARS);

        let mut missing_slitlets = self.missing_slitlets;
        missing_slitlets.sort_unstable();
        missing_slitlets.dedup();
        if let Some(&bad) = missing_slitlets.iter().find(|&&i| i == 0 || i > nbars) {
            return Err(RectWvError::InvalidCalibration(format!(
                "missing slitlet {bad} outside 1..={nbars}"
            )));
        }

        let mut contents = self.contents;
        contents.sort_by_key(|c| c.islitlet);
        for pair in contents.windows(2) {
            if pair[0].islitlet == pair[1].islitlet {
                return Err(RectWvError::InvalidCalibration(format!(
                    "slitlet {} has duplicated coefficients",
                    pair[0].islitlet
                )));
            }
        }
        for c in &contents {
            if c.islitlet == 0 || c.islitlet > nbars {
                return Err(RectWvError::InvalidCalibration(format!(
                    "slitlet {} outside 1..={nbars}",
                    c.islitlet
                )));
            }
            if missing_slitlets.binary_search(&c.islitlet).is_ok() {
                return Err(RectWvError::InvalidCalibration(format!(
                    "slitlet {} is listed as missing but has coefficients",
                    c.islitlet
                )));
            }
        }

        let bundle = CalibrationBundle {
            tags,
            nbars,
            missing_slitlets,
            contents,
            dtu_configuration,
            provenance,
        };
        if let Some(i) = bundle
            .valid_slitlets()
            .into_iter()
            .find(|&i| bundle.slitlet(i).is_none())
        {
            return Err(RectWvError::SlitletNotCalibrated(i));
        }
        Ok(bundle)
    }
}
