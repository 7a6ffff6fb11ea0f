//! Rectification and wavelength calibration of a full frame.
//!
//! [`apply_rectwv_coeff`] drives the whole reduction:
//!
//! 1. check the frame shape against the detector,
//! 2. validate grism/filter and DTU configuration (before any pixel work),
//! 3. resolve the output wavelength grid for the grism/filter pair,
//! 4. for every valid slitlet, in increasing order: derive the geometry,
//!    extract, rectify, resample to the wavelength grid and write into the
//!    compositor,
//! 5. reconcile overlaps and rewrite the header.
//!
//! Any error aborts the whole frame; no partial output is produced.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::calibration::CalibrationBundle;
use crate::compositor::{ImageCompositor, OverlapAdjustment, ScanRange};
use crate::error::{RectWvError, Result};
use crate::frame::{DetectorFrame, DetectorGeometry};
use crate::slitlet::{Resampling, SlitletGeometry};
use crate::validate::{validate_frame, DtuCheck, DtuPolicy};
use crate::wavelength::{resample_image2d_flux, WavelengthParameterResolver};

// ── Configuration ──

/// Verbosity from which per-slitlet progress is logged at info level.
const PROGRESS_VERBOSITY: u8 = 10;

/// Options of the reduction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectWvConfig {
    /// Resampling used for rectification.
    /// Default: [`Resampling::FluxPreserving`]
    pub resampling: Resampling,
    /// Reaction to DTU configuration differences.
    /// Default: [`DtuPolicy::Permissive`]
    pub dtu_policy: DtuPolicy,
    /// Diagnostic level; only affects logging, never pixel values.
    /// Values of 10 or more log the progress of every slitlet.
    /// Default: 0
    pub verbosity: u8,
    /// Detector and slit-unit geometry.
    /// Default: EMIR
    pub detector: DetectorGeometry,
}

impl Default for RectWvConfig {
    fn default() -> Self {
        Self {
            resampling: Resampling::FluxPreserving,
            dtu_policy: DtuPolicy::Permissive,
            verbosity: 0,
            detector: DetectorGeometry::emir(),
        }
    }
}

// ── Driver ──

/// Rectified and wavelength-calibrated frame, with diagnostics.
#[derive(Debug, Clone)]
pub struct RectWvResult {
    /// Output frame: detector rows × output grid columns.
    pub frame: DetectorFrame,
    /// Final (reconciled) scan range of each slitlet, 0-based rows.
    pub scan_ranges: BTreeMap<u32, ScanRange>,
    /// Overlaps corrected during reconciliation.
    pub overlaps: Vec<OverlapAdjustment>,
    /// Outcome of the DTU check.
    pub dtu_check: DtuCheck,
}

/// Rectify and wavelength-calibrate `frame` with the coefficients of `bundle`.
///
/// The input frame is not modified; its header is copied into the output and
/// rewritten there.
///
/// # Errors
///
/// - [`RectWvError::ShapeMismatch`] if the frame does not match the detector.
/// - [`RectWvError::InvalidCalibration`] if the bundle was derived for a
///   slit unit with a different number of bars.
/// - [`RectWvError::IdentityMismatch`] on grism/filter disagreement.
/// - [`RectWvError::MissingKeyword`] if the DTU keywords are absent.
/// - [`RectWvError::DtuMismatch`] on DTU disagreement with
///   [`DtuPolicy::Strict`].
/// - [`RectWvError::UnsupportedGrismFilter`] from the resolver.
/// - [`RectWvError::GeometryFault`] if a slitlet leaves the detector.
/// - [`RectWvError::NonMonotonicWavelength`] if a wavelength solution folds.
pub fn apply_rectwv_coeff(
    frame: &DetectorFrame,
    bundle: &CalibrationBundle,
    resolver: &dyn WavelengthParameterResolver,
    config: &RectWvConfig,
) -> Result<RectWvResult> {
    // ── Validation: nothing below touches pixels until it passes ──
    let detector = &config.detector;
    frame.check_shape(detector)?;
    if bundle.nbars() != detector.nbars {
        return Err(RectWvError::InvalidCalibration(format!(
            "calibration covers {} slit bars, detector has {}",
            bundle.nbars(),
            detector.nbars
        )));
    }

    let dtu_check = validate_frame(frame, bundle, config.dtu_policy)?;

    let tags = bundle.tags();
    let grid = resolver.resolve(&tags.grism, &tags.filter)?;
    debug!(
        "Output grid: crpix1={}, crval1={}, cdelt1={}, naxis1={}",
        grid.crpix1, grid.crval1, grid.cdelt1, grid.naxis1
    );

    let valid_slitlets = bundle.valid_slitlets();
    debug!("Valid slitlet numbers: {:?}", valid_slitlets);

    // ── Per-slitlet reduction ──
    let mut compositor = ImageCompositor::new(detector.naxis2, grid.naxis1);
    info!("Computing rectification and wavelength calibration");
    for &islitlet in &valid_slitlets {
        if config.verbosity >= PROGRESS_VERBOSITY {
            info!("Slitlet {:02}/{:02}", islitlet, detector.nbars);
        }

        let geometry = SlitletGeometry::new(islitlet, bundle, detector)?;
        let slitlet2d = geometry.extract_slitlet2d(&frame.data)?;
        let slitlet2d_rect = geometry.rectify(&slitlet2d, config.resampling)?;
        let slitlet2d_rect_wv = resample_image2d_flux(
            &slitlet2d_rect,
            geometry.bounding_box.nc1 as f64,
            &geometry.wpoly,
            &grid,
        )
        .ok_or(RectWvError::NonMonotonicWavelength { islitlet })?;

        let range = compositor.insert(&geometry, &slitlet2d_rect_wv)?;
        debug!(
            "Slitlet {:02}: rows {}..={}",
            islitlet, range.min, range.max
        );
    }

    let composite = compositor.finalize(frame.header.clone(), &grid, bundle.provenance());
    info!("Generating rectified and wavelength calibrated image");

    Ok(RectWvResult {
        frame: composite.frame,
        scan_ranges: composite.scan_ranges,
        overlaps: composite.overlaps,
        dtu_check,
    })
}
