//! Rectification of the distorted slitlet sub-image.
//!
//! Each column is resampled independently. At detector column `x` the
//! frontier curves sit at rows `lower(x)` and `upper(x)`; rectified row `y`
//! is taken from the distorted row
//!
//! ```text
//! s(y) = lower(x) + (y - y0_lower) · (upper(x) - lower(x)) / (y0_upper - y0_lower)
//! ```
//!
//! so that both frontiers become horizontal at `y0_lower` and `y0_upper`.

use nalgebra::DMatrix;

use super::{round_half_up, SlitletGeometry};
use crate::error::{RectWvError, Result};
use crate::rebin::CumulativeFlux;

/// Resampling scheme used when rectifying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Resampling {
    /// Copy the distorted pixel nearest to the mapped row.
    NearestNeighbor,
    /// Integrate the distorted column over the mapped pixel extent,
    /// conserving flux.
    #[default]
    FluxPreserving,
}

impl Resampling {
    /// Map the historical numeric codes: 1 = nearest neighbour,
    /// 2 = flux-preserving interpolation.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            1 => Ok(Resampling::NearestNeighbor),
            2 => Ok(Resampling::FluxPreserving),
            other => Err(RectWvError::InvalidResamplingCode(other)),
        }
    }
}

impl SlitletGeometry {
    /// Rectify an extracted slitlet.
    ///
    /// `slitlet2d` must be the array returned by
    /// [`extract_slitlet2d`](Self::extract_slitlet2d); the output has the same
    /// shape, row `i` corresponding to detector row `bounding_box.ns1 + i`.
    /// Distorted rows falling outside the sub-image contribute zero.
    /// Nearest-neighbour lookups round halves up, like the bounding box.
    ///
    /// # Errors
    ///
    /// [`RectWvError::ShapeMismatch`] if the input does not match the
    /// bounding box.
    pub fn rectify(&self, slitlet2d: &DMatrix<f64>, resampling: Resampling) -> Result<DMatrix<f64>> {
        let bb = &self.bounding_box;
        let (nrows, ncols) = slitlet2d.shape();
        if nrows != bb.nrows() || ncols != bb.ncols() {
            return Err(RectWvError::ShapeMismatch {
                expected_rows: bb.nrows(),
                expected_cols: bb.ncols(),
                rows: nrows,
                cols: ncols,
            });
        }

        let ns1 = bb.ns1 as f64;
        let mut rectified = DMatrix::<f64>::zeros(nrows, ncols);

        for j in 0..ncols {
            let x = (bb.nc1 + j) as f64;
            // 0-based row offset inside the sub-image of rectified row y
            let local = |y: f64| self.source_row(x, y) - ns1;

            match resampling {
                Resampling::NearestNeighbor => {
                    for i in 0..nrows {
                        let k = round_half_up(local(ns1 + i as f64));
                        if (0..nrows as i64).contains(&k) {
                            rectified[(i, j)] = slitlet2d[(k as usize, j)];
                        }
                    }
                }
                Resampling::FluxPreserving => {
                    let column: Vec<f64> = slitlet2d.column(j).iter().copied().collect();
                    let cumulative = CumulativeFlux::unit_pixels(&column);
                    for i in 0..nrows {
                        let y = ns1 + i as f64;
                        rectified[(i, j)] = cumulative.integral(local(y - 0.5), local(y + 0.5));
                    }
                }
            }
        }
        Ok(rectified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Polynomial;
    use crate::slitlet::BoundingBox;
    use approx::assert_relative_eq;

    fn geometry(lower: Polynomial, upper: Polynomial) -> SlitletGeometry {
        SlitletGeometry {
            islitlet: 3,
            bounding_box: BoundingBox {
                ns1: 11,
                ns2: 40,
                nc1: 5,
                nc2: 12,
            },
            frontier_lower: lower,
            frontier_upper: upper,
            y0_frontier_lower: 15.0,
            y0_frontier_upper: 35.0,
            nscan_min: 16,
            nscan_max: 35,
            wpoly: Polynomial::linear(10000.0, 1.0),
        }
    }

    fn pattern() -> DMatrix<f64> {
        DMatrix::from_fn(30, 8, |r, c| ((r * 7 + c * 3) % 11) as f64 + 0.25 * c as f64)
    }

    #[test]
    fn test_resampling_codes() {
        assert_eq!(Resampling::from_code(1), Ok(Resampling::NearestNeighbor));
        assert_eq!(Resampling::from_code(2), Ok(Resampling::FluxPreserving));
        assert_eq!(
            Resampling::from_code(3),
            Err(RectWvError::InvalidResamplingCode(3))
        );
        assert_eq!(Resampling::default(), Resampling::FluxPreserving);
    }

    #[test]
    fn test_nearest_identity_is_pixel_identical() {
        let g = geometry(Polynomial::constant(15.0), Polynomial::constant(35.0));
        let input = pattern();
        let out = g.rectify(&input, Resampling::NearestNeighbor).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_flux_identity_reproduces_input() {
        let g = geometry(Polynomial::constant(15.0), Polynomial::constant(35.0));
        let input = pattern();
        let out = g.rectify(&input, Resampling::FluxPreserving).unwrap();
        for (a, b) in out.iter().zip(input.iter()) {
            assert_relative_eq!(*a, *b, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nearest_shift_by_whole_rows() {
        // distorted slitlet sits 2 rows higher than its rectified position
        let g = geometry(Polynomial::constant(17.0), Polynomial::constant(37.0));
        let input = pattern();
        let out = g.rectify(&input, Resampling::NearestNeighbor).unwrap();
        for j in 0..8 {
            for i in 0..28 {
                assert_eq!(out[(i, j)], input[(i + 2, j)]);
            }
            assert_eq!(out[(28, j)], 0.0);
            assert_eq!(out[(29, j)], 0.0);
        }
    }

    #[test]
    fn test_nearest_half_row_offsets_round_up() {
        // every mapped row sits exactly half a row below a pixel centre
        let g = geometry(Polynomial::constant(14.5), Polynomial::constant(34.5));
        let input = pattern();
        let out = g.rectify(&input, Resampling::NearestNeighbor).unwrap();
        assert_eq!(out, input);

        // and half a row above
        let g = geometry(Polynomial::constant(15.5), Polynomial::constant(35.5));
        let out = g.rectify(&input, Resampling::NearestNeighbor).unwrap();
        for j in 0..8 {
            for i in 0..29 {
                assert_eq!(out[(i, j)], input[(i + 1, j)]);
            }
            assert_eq!(out[(29, j)], 0.0);
        }
    }

    #[test]
    fn test_flux_preserving_conserves_column_flux() {
        // tilted and stretched frontiers; signal confined to the slit interior
        let g = geometry(
            Polynomial::linear(13.0, 0.1),
            Polynomial::linear(36.0, 0.15),
        );
        let mut input = DMatrix::<f64>::zeros(30, 8);
        for j in 0..8 {
            for i in 8..22 {
                input[(i, j)] = 1.0 + ((i + j) % 5) as f64;
            }
        }
        let out = g.rectify(&input, Resampling::FluxPreserving).unwrap();
        for j in 0..8 {
            assert_relative_eq!(
                out.column(j).sum(),
                input.column(j).sum(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_shape_mismatch() {
        let g = geometry(Polynomial::constant(15.0), Polynomial::constant(35.0));
        let err = g
            .rectify(&DMatrix::zeros(29, 8), Resampling::NearestNeighbor)
            .unwrap_err();
        assert!(matches!(err, RectWvError::ShapeMismatch { rows: 29, .. }));
    }
}
