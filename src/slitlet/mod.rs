//! Geometry of a single slitlet.
//!
//! A slitlet's footprint on the detector is bounded by two frontier curves,
//! each a polynomial giving the detector row as a function of detector
//! column. After rectification both frontiers become horizontal, at rows
//! `y0_frontier_lower` and `y0_frontier_upper`.
//!
//! [`SlitletGeometry`] is derived fresh for every slitlet from the calibration
//! bundle. It owns the bounding box used to [extract](SlitletGeometry::extract_slitlet2d)
//! the distorted sub-image, the mapping used to [rectify](SlitletGeometry::rectify)
//! it, and the wavelength solution handed to the wavelength resampler.
//!
//! # Coordinates
//!
//! Polynomials are evaluated at 1-based detector columns and return 1-based
//! detector rows (FITS convention: the first pixel spans `[0.5, 1.5]`).
//! Bounding-box limits are 1-based and inclusive; array offsets are obtained
//! by subtracting one.

pub mod extract;
pub mod rectify;

use tracing::debug;

use crate::calibration::CalibrationBundle;
use crate::error::{RectWvError, Result};
use crate::frame::DetectorGeometry;
use crate::polynomial::Polynomial;

pub use rectify::Resampling;

/// Detector rectangle enclosing a slitlet footprint (1-based, inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// First detector row (scan).
    pub ns1: usize,
    /// Last detector row (scan).
    pub ns2: usize,
    /// First detector column.
    pub nc1: usize,
    /// Last detector column.
    pub nc2: usize,
}

impl BoundingBox {
    pub fn nrows(&self) -> usize {
        self.ns2 - self.ns1 + 1
    }

    pub fn ncols(&self) -> usize {
        self.nc2 - self.nc1 + 1
    }
}

/// Round half up, matching `int(v + 0.5)` for positive values.
#[inline]
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Derived geometry of one slitlet.
#[derive(Debug, Clone)]
pub struct SlitletGeometry {
    pub islitlet: u32,
    pub bounding_box: BoundingBox,
    pub frontier_lower: Polynomial,
    pub frontier_upper: Polynomial,
    /// Row of the lower frontier in the rectified image.
    pub y0_frontier_lower: f64,
    /// Row of the upper frontier in the rectified image.
    pub y0_frontier_upper: f64,
    /// First useful scan of the rectified slitlet (1-based).
    pub nscan_min: usize,
    /// Last useful scan of the rectified slitlet (1-based).
    pub nscan_max: usize,
    /// Wavelength solution (detector column → Angstrom).
    pub wpoly: Polynomial,
}

impl SlitletGeometry {
    /// Derive the geometry of slitlet `islitlet` from the calibration.
    ///
    /// # Errors
    ///
    /// - [`RectWvError::SlitletNotCalibrated`] if the bundle has no
    ///   coefficients for the slitlet.
    /// - [`RectWvError::GeometryFault`] if the bounding box leaves the
    ///   detector, the frontiers cross, or the rectified frontiers do not
    ///   delimit at least one scan.
    pub fn new(
        islitlet: u32,
        bundle: &CalibrationBundle,
        detector: &DetectorGeometry,
    ) -> Result<Self> {
        let coeffs = bundle
            .slitlet(islitlet)
            .ok_or(RectWvError::SlitletNotCalibrated(islitlet))?;
        let fault = |detail: String| RectWvError::GeometryFault { islitlet, detail };

        let nc1 = coeffs.bb_nc1_orig as usize;
        let nc2 = coeffs.bb_nc2_orig as usize;
        if nc1 < 1 {
            return Err(fault(format!("first column {nc1} is below 1")));
        }
        if nc2 > detector.naxis1 {
            return Err(fault(format!(
                "last column {nc2} exceeds detector width {}",
                detector.naxis1
            )));
        }
        if nc1 > nc2 {
            return Err(fault(format!("empty column range {nc1}..={nc2}")));
        }

        let y0_lower = coeffs.y0_frontier_lower;
        let y0_upper = coeffs.y0_frontier_upper;
        if !y0_lower.is_finite() || !y0_upper.is_finite() {
            return Err(fault(format!(
                "rectified frontiers are not finite: lower {y0_lower}, upper {y0_upper}"
            )));
        }
        if !(y0_lower < y0_upper) {
            return Err(fault(format!(
                "rectified frontiers out of order: lower {y0_lower}, upper {y0_upper}"
            )));
        }

        let mut ymin = y0_lower;
        let mut ymax = y0_upper;
        for col in nc1..=nc2 {
            let x = col as f64;
            let lower = coeffs.frontier_lower.eval(x);
            let upper = coeffs.frontier_upper.eval(x);
            if !lower.is_finite() || !upper.is_finite() {
                return Err(fault(format!(
                    "frontiers not finite at column {col}: lower {lower}, upper {upper}"
                )));
            }
            if !(lower < upper) {
                return Err(fault(format!(
                    "frontiers cross at column {col}: lower {lower:.3}, upper {upper:.3}"
                )));
            }
            ymin = ymin.min(lower);
            ymax = ymax.max(upper);
        }

        let margin = coeffs.ymargin_bb as i64;
        let (Some(ns1), Some(ns2)) = (
            round_half_up(ymin).checked_sub(margin),
            round_half_up(ymax).checked_add(margin),
        ) else {
            return Err(fault(format!(
                "bounding box rows out of range: {ymin:e}..{ymax:e} with margin {margin}"
            )));
        };
        if ns1 < 1 {
            return Err(fault(format!(
                "bounding box lower row {ns1} is below the detector (row 1)"
            )));
        }
        if ns2 > detector.naxis2 as i64 {
            return Err(fault(format!(
                "bounding box upper row {ns2} exceeds detector height {}",
                detector.naxis2
            )));
        }

        let nscan_min = round_half_up(y0_lower) + 1;
        let nscan_max = round_half_up(y0_upper);
        if nscan_min > nscan_max {
            return Err(fault(format!(
                "no useful scans between rectified frontiers ({nscan_min} > {nscan_max})"
            )));
        }

        let bounding_box = BoundingBox {
            ns1: ns1 as usize,
            ns2: ns2 as usize,
            nc1,
            nc2,
        };
        debug!(
            "Slitlet {:02}: bbox rows {}..={} cols {}..={}, scans {}..={}",
            islitlet, bounding_box.ns1, bounding_box.ns2, nc1, nc2, nscan_min, nscan_max
        );

        Ok(Self {
            islitlet,
            bounding_box,
            frontier_lower: coeffs.frontier_lower.clone(),
            frontier_upper: coeffs.frontier_upper.clone(),
            y0_frontier_lower: y0_lower,
            y0_frontier_upper: y0_upper,
            nscan_min: nscan_min as usize,
            nscan_max: nscan_max as usize,
            wpoly: coeffs.wpoly.clone(),
        })
    }

    /// Detector row (1-based) in the distorted image that maps onto rectified
    /// row `y` at detector column `x`.
    ///
    /// The frontiers at column `x` are stretched affinely onto the rectified
    /// frontier rows.
    #[inline]
    pub fn source_row(&self, x: f64, y: f64) -> f64 {
        let lower = self.frontier_lower.eval(x);
        let upper = self.frontier_upper.eval(x);
        let scale = (upper - lower) / (self.y0_frontier_upper - self.y0_frontier_lower);
        lower + (y - self.y0_frontier_lower) * scale
    }

    /// Rows of the rectified sub-image holding useful data, as 0-based
    /// offsets relative to the bounding box.
    pub fn useful_rows_in_box(&self) -> std::ops::RangeInclusive<usize> {
        let ns1 = self.bounding_box.ns1;
        (self.nscan_min - ns1)..=(self.nscan_max - ns1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::{Provenance, SlitletCoefficients};
    use crate::dtu::DtuConfiguration;

    fn detector() -> DetectorGeometry {
        DetectorGeometry {
            naxis1: 64,
            naxis2: 100,
            nbars: 2,
        }
    }

    fn bundle_with(coeffs: Vec<SlitletCoefficients>) -> CalibrationBundle {
        CalibrationBundle::builder()
            .tags("J", "J")
            .nbars(2)
            .missing_slitlets([2])
            .slitlets(coeffs)
            .dtu_configuration(DtuConfiguration {
                xdtu: 0.0,
                ydtu: 0.0,
                zdtu: 0.0,
                xdtu_0: 0.0,
                ydtu_0: 0.0,
                zdtu_0: 0.0,
            })
            .provenance(Provenance {
                uuid: "u".to_string(),
                bound_param: "b".to_string(),
                master_rectwv: None,
            })
            .build()
            .unwrap()
    }

    fn tilted() -> SlitletCoefficients {
        SlitletCoefficients {
            islitlet: 1,
            // rises 2 rows across 64 columns
            frontier_lower: Polynomial::linear(20.0, 2.0 / 63.0),
            frontier_upper: Polynomial::linear(40.0, 2.0 / 63.0),
            y0_frontier_lower: 21.0,
            y0_frontier_upper: 41.0,
            bb_nc1_orig: 1,
            bb_nc2_orig: 64,
            ymargin_bb: 2,
            wpoly: Polynomial::linear(11200.0, 0.77),
        }
    }

    #[test]
    fn test_bounding_box_and_scans() {
        let bundle = bundle_with(vec![tilted()]);
        let g = SlitletGeometry::new(1, &bundle, &detector()).unwrap();
        // lower frontier min at column 1: 20.03 → 20, minus margin
        assert_eq!(g.bounding_box.ns1, 18);
        // upper frontier max at column 64: 42.03 → 42, plus margin
        assert_eq!(g.bounding_box.ns2, 44);
        assert_eq!((g.bounding_box.nc1, g.bounding_box.nc2), (1, 64));
        assert_eq!(g.nscan_min, 22);
        assert_eq!(g.nscan_max, 41);
        assert_eq!(g.useful_rows_in_box(), 4..=23);
    }

    #[test]
    fn test_source_row_maps_frontiers() {
        let bundle = bundle_with(vec![tilted()]);
        let g = SlitletGeometry::new(1, &bundle, &detector()).unwrap();
        let x = 32.0;
        let lower = g.frontier_lower.eval(x);
        let upper = g.frontier_upper.eval(x);
        assert!((g.source_row(x, 21.0) - lower).abs() < 1e-12);
        assert!((g.source_row(x, 41.0) - upper).abs() < 1e-12);
    }

    #[test]
    fn test_bounding_box_below_detector() {
        let mut c = tilted();
        c.frontier_lower = Polynomial::constant(1.2);
        c.y0_frontier_lower = 2.0;
        let bundle = bundle_with(vec![c]);
        let err = SlitletGeometry::new(1, &bundle, &detector()).unwrap_err();
        match err {
            RectWvError::GeometryFault { islitlet, detail } => {
                assert_eq!(islitlet, 1);
                assert!(detail.contains("-1"), "{detail}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_bounding_box_above_detector() {
        let mut c = tilted();
        c.frontier_upper = Polynomial::constant(99.0);
        let bundle = bundle_with(vec![c]);
        let err = SlitletGeometry::new(1, &bundle, &detector()).unwrap_err();
        assert!(matches!(
            err,
            RectWvError::GeometryFault { islitlet: 1, ref detail } if detail.contains("101")
        ));
    }

    #[test]
    fn test_column_range_outside_detector() {
        let mut c = tilted();
        c.bb_nc2_orig = 65;
        let bundle = bundle_with(vec![c]);
        assert!(matches!(
            SlitletGeometry::new(1, &bundle, &detector()),
            Err(RectWvError::GeometryFault { islitlet: 1, .. })
        ));
    }

    #[test]
    fn test_non_finite_frontier() {
        let mut c = tilted();
        c.frontier_upper = Polynomial::constant(f64::INFINITY);
        let bundle = bundle_with(vec![c]);
        let err = SlitletGeometry::new(1, &bundle, &detector()).unwrap_err();
        assert!(matches!(
            err,
            RectWvError::GeometryFault { islitlet: 1, ref detail } if detail.contains("not finite")
        ));

        let mut c = tilted();
        c.y0_frontier_lower = f64::NEG_INFINITY;
        let bundle = bundle_with(vec![c]);
        assert!(matches!(
            SlitletGeometry::new(1, &bundle, &detector()),
            Err(RectWvError::GeometryFault { islitlet: 1, .. })
        ));
    }

    #[test]
    fn test_huge_frontier_does_not_overflow() {
        let mut c = tilted();
        c.frontier_upper = Polynomial::constant(1.0e300);
        let bundle = bundle_with(vec![c]);
        assert!(matches!(
            SlitletGeometry::new(1, &bundle, &detector()),
            Err(RectWvError::GeometryFault { islitlet: 1, .. })
        ));

        let mut c = tilted();
        c.frontier_lower = Polynomial::constant(-1.0e300);
        let bundle = bundle_with(vec![c]);
        assert!(matches!(
            SlitletGeometry::new(1, &bundle, &detector()),
            Err(RectWvError::GeometryFault { islitlet: 1, .. })
        ));
    }

    #[test]
    fn test_crossing_frontiers() {
        let mut c = tilted();
        c.frontier_upper = Polynomial::linear(40.0, -1.0);
        let bundle = bundle_with(vec![c]);
        let err = SlitletGeometry::new(1, &bundle, &detector()).unwrap_err();
        assert!(matches!(err, RectWvError::GeometryFault { islitlet: 1, .. }));
    }

    #[test]
    fn test_missing_slitlet() {
        let bundle = bundle_with(vec![tilted()]);
        assert_eq!(
            SlitletGeometry::new(2, &bundle, &detector()).unwrap_err(),
            RectWvError::SlitletNotCalibrated(2)
        );
    }
}
