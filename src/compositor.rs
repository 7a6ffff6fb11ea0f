//! Assembly of the rectified and wavelength-calibrated output image.
//!
//! The compositor owns the output array while slitlets are written into it
//! one after the other (ACCUMULATING). Each slitlet copies its useful scans
//! into the matching absolute rows, overwriting whatever an earlier slitlet
//! left there. [`ImageCompositor::finalize`] consumes the compositor, so no
//! slitlet can be written after it has run (FINALIZED):
//!
//! 1. Overlap reconciliation. Frontiers are fitted independently for every
//!    slitlet and neighbouring slitlets, also across a missing one, may
//!    claim a few common rows. Those rows hold the data of the later
//!    slitlet, so the recorded maximum of the earlier one is clamped to the
//!    row before the later slitlet's minimum.
//! 2. Header rewrite: per-slitlet scan ranges (`SLTMINnn`/`SLTMAXnn`), the
//!    linear wavelength WCS of the output grid, and provenance history.

use std::collections::BTreeMap;

use nalgebra::DMatrix;
use tracing::{info, warn};

use crate::calibration::Provenance;
use crate::error::{RectWvError, Result};
use crate::frame::DetectorFrame;
use crate::header::Header;
use crate::slitlet::SlitletGeometry;
use crate::wavelength::OutputGrid;

/// Linear WCS keywords of the input that are replaced or dropped.
const OBSOLETE_WCS_KEYWORDS: [&str; 10] = [
    "CD1_1", "CD1_2", "CD2_1", "CD2_2", "PCD1_1", "PCD1_2", "PCD2_1", "PCD2_2", "PCRPIX1",
    "PCRPIX2",
];

// ── Scan ranges ──

/// Absolute rows (0-based, inclusive) owned by a slitlet in the output image.
///
/// After reconciliation a slitlet completely overwritten by its successor
/// ends up with `max < min`, i.e. owns no rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanRange {
    pub min: i64,
    pub max: i64,
}

impl ScanRange {
    pub fn is_empty(&self) -> bool {
        self.max < self.min
    }
}

/// Correction applied to the range of `previous` because `current`
/// overwrote some of its rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapAdjustment {
    pub previous: u32,
    pub current: u32,
    /// Recorded maximum of `previous` before the correction.
    pub previous_max: i64,
    /// Recorded minimum of `current`.
    pub current_min: i64,
}

impl OverlapAdjustment {
    /// New maximum of `previous`.
    pub fn adjusted_max(&self) -> i64 {
        self.current_min - 1
    }
}

/// Header keyword holding the first row of a slitlet.
pub fn sltmin_keyword(islitlet: u32) -> String {
    format!("SLTMIN{islitlet:02}")
}

/// Header keyword holding the last row of a slitlet.
pub fn sltmax_keyword(islitlet: u32) -> String {
    format!("SLTMAX{islitlet:02}")
}

// ── Compositor ──

/// Output image under construction.
#[derive(Debug, Clone)]
pub struct ImageCompositor {
    image: DMatrix<f64>,
    scan_ranges: BTreeMap<u32, ScanRange>,
}

/// Result of [`ImageCompositor::finalize`].
#[derive(Debug, Clone)]
pub struct CompositeImage {
    pub frame: DetectorFrame,
    /// Reconciled scan range of every written slitlet.
    pub scan_ranges: BTreeMap<u32, ScanRange>,
    /// Overlaps found during reconciliation, in slitlet order.
    pub overlaps: Vec<OverlapAdjustment>,
}

impl ImageCompositor {
    /// Zero-filled output of `naxis2` rows and `naxis1` columns.
    pub fn new(naxis2: usize, naxis1: usize) -> Self {
        Self {
            image: DMatrix::zeros(naxis2, naxis1),
            scan_ranges: BTreeMap::new(),
        }
    }

    pub fn image(&self) -> &DMatrix<f64> {
        &self.image
    }

    /// Ranges recorded so far, before reconciliation.
    pub fn scan_ranges(&self) -> &BTreeMap<u32, ScanRange> {
        &self.scan_ranges
    }

    /// Write the useful scans of a rectified and wavelength-calibrated
    /// slitlet into the output.
    ///
    /// `slitlet2d` has one row per bounding-box row and one column per output
    /// grid pixel. Rows `nscan_min..=nscan_max` of the slitlet are copied to
    /// absolute rows `nscan_min - 1..=nscan_max - 1`.
    pub fn insert(&mut self, geometry: &SlitletGeometry, slitlet2d: &DMatrix<f64>) -> Result<ScanRange> {
        let bb = &geometry.bounding_box;
        if slitlet2d.nrows() != bb.nrows() || slitlet2d.ncols() != self.image.ncols() {
            return Err(RectWvError::ShapeMismatch {
                expected_rows: bb.nrows(),
                expected_cols: self.image.ncols(),
                rows: slitlet2d.nrows(),
                cols: slitlet2d.ncols(),
            });
        }

        let first = geometry.nscan_min - 1;
        let count = geometry.nscan_max - geometry.nscan_min + 1;
        if first + count > self.image.nrows() {
            return Err(RectWvError::GeometryFault {
                islitlet: geometry.islitlet,
                detail: format!(
                    "scans {}..={} exceed output height {}",
                    geometry.nscan_min,
                    geometry.nscan_max,
                    self.image.nrows()
                ),
            });
        }
        let src_first = *geometry.useful_rows_in_box().start();
        self.image
            .rows_mut(first, count)
            .copy_from(&slitlet2d.rows(src_first, count));

        let range = ScanRange {
            min: first as i64,
            max: (first + count - 1) as i64,
        };
        self.scan_ranges.insert(geometry.islitlet, range);
        Ok(range)
    }

    /// Reconcile overlaps, rewrite `header` for the output grid and return
    /// the finished frame.
    pub fn finalize(self, mut header: Header, grid: &OutputGrid, provenance: &Provenance) -> CompositeImage {
        let mut scan_ranges = self.scan_ranges;
        let overlaps = reconcile_overlaps(&mut scan_ranges);

        info!("Updating image header");
        for (&islitlet, range) in &scan_ranges {
            header.set(&sltmin_keyword(islitlet), range.min);
            header.set(&sltmax_keyword(islitlet), range.max);
        }
        write_wavelength_wcs(&mut header, grid);
        write_history(&mut header, provenance);

        CompositeImage {
            frame: DetectorFrame::new(self.image, header),
            scan_ranges,
            overlaps,
        }
    }
}

// ── Overlap reconciliation ──

/// Clamp earlier slitlets whose rows were overwritten by a later one.
///
/// Slitlets are visited in increasing order. Every earlier slitlet whose
/// range still reaches into the current one gets its maximum set to the row
/// before the current minimum. With slitlets written in increasing order
/// this leaves the recorded ranges pairwise disjoint, and every recorded row
/// holds the data of the slitlet that claims it.
pub fn reconcile_overlaps(scan_ranges: &mut BTreeMap<u32, ScanRange>) -> Vec<OverlapAdjustment> {
    let mut overlaps = Vec::new();
    let slitlets: Vec<u32> = scan_ranges.keys().copied().collect();
    for (k, &current) in slitlets.iter().enumerate() {
        let claimed = scan_ranges[&current];
        for &previous in &slitlets[..k] {
            let Some(range) = scan_ranges.get_mut(&previous) else {
                continue;
            };
            if range.is_empty() || range.max < claimed.min || range.min > claimed.max {
                continue;
            }
            let adjustment = OverlapAdjustment {
                previous,
                current,
                previous_max: range.max,
                current_min: claimed.min,
            };
            warn!(
                "{}={:04} overlaps with {}={:04} ==> {} set to {:04}",
                sltmin_keyword(current),
                claimed.min,
                sltmax_keyword(previous),
                range.max,
                sltmax_keyword(previous),
                adjustment.adjusted_max()
            );
            range.max = adjustment.adjusted_max();
            overlaps.push(adjustment);
        }
    }
    overlaps
}

// ── Header rewrite ──

/// Replace the spatial/celestial WCS with the linear wavelength grid.
fn write_wavelength_wcs(header: &mut Header, grid: &OutputGrid) {
    for keyword in ["CRVAL1", "CRPIX1", "CRVAL2", "CRPIX2"] {
        header.remove(keyword);
    }
    header.set_with_comment("CRPIX1", grid.crpix1, "reference pixel");
    header.set_with_comment("CRVAL1", grid.crval1, "central wavelength at crpix1");
    header.set_with_comment("CDELT1", grid.cdelt1, "linear dispersion (Angstrom/pixel)");
    header.set_with_comment("CUNIT1", "Angstrom", "units along axis1");
    header.set("CTYPE1", "WAVELENGTH");
    header.set_with_comment("CRPIX2", 0.0, "reference pixel");
    header.set_with_comment("CRVAL2", 0.0, "central value at crpix2");
    header.set_with_comment("CDELT2", 1.0, "increment");
    header.set("CTYPE2", "PIXEL");
    header.set_with_comment("CUNIT2", "Pixel", "units along axis2");
    for keyword in OBSOLETE_WCS_KEYWORDS {
        header.remove(keyword);
    }
}

fn write_history(header: &mut Header, provenance: &Provenance) {
    header.add_history(format!(
        "Boundary parameters uuid:{}",
        bare_id(&provenance.bound_param)
    ));
    if let Some(master) = &provenance.master_rectwv {
        header.add_history(format!("MasterRectWave uuid:{}", bare_id(master)));
    }
    header.add_history(format!("RectWaveCoeff uuid:{}", bare_id(&provenance.uuid)));
    header.add_history(format!(
        "Rectification and wavelength calibration time {}",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f")
    ));
}

/// Strip a leading `uuid:` tag from a stored identifier.
fn bare_id(id: &str) -> &str {
    id.strip_prefix("uuid:").unwrap_or(id)
}
