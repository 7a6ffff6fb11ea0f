//! Extraction of the distorted slitlet sub-image.

use nalgebra::DMatrix;

use super::SlitletGeometry;
use crate::error::{RectWvError, Result};

impl SlitletGeometry {
    /// Copy the bounding box of the slitlet out of the full detector image.
    ///
    /// The result is an owned array of `bounding_box.nrows() ×
    /// bounding_box.ncols()` pixels.
    ///
    /// # Errors
    ///
    /// [`RectWvError::GeometryFault`] if the bounding box does not fit inside
    /// `image`.
    pub fn extract_slitlet2d(&self, image: &DMatrix<f64>) -> Result<DMatrix<f64>> {
        let bb = &self.bounding_box;
        if bb.ns2 > image.nrows() || bb.nc2 > image.ncols() || bb.ns1 < 1 || bb.nc1 < 1 {
            return Err(RectWvError::GeometryFault {
                islitlet: self.islitlet,
                detail: format!(
                    "bounding box rows {}..={} cols {}..={} outside {}x{} image",
                    bb.ns1,
                    bb.ns2,
                    bb.nc1,
                    bb.nc2,
                    image.nrows(),
                    image.ncols()
                ),
            });
        }
        Ok(image
            .view((bb.ns1 - 1, bb.nc1 - 1), (bb.nrows(), bb.ncols()))
            .into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polynomial::Polynomial;
    use crate::slitlet::BoundingBox;

    fn geometry(bounding_box: BoundingBox) -> SlitletGeometry {
        SlitletGeometry {
            islitlet: 7,
            bounding_box,
            frontier_lower: Polynomial::constant(3.0),
            frontier_upper: Polynomial::constant(5.0),
            y0_frontier_lower: 3.0,
            y0_frontier_upper: 5.0,
            nscan_min: 4,
            nscan_max: 5,
            wpoly: Polynomial::linear(0.0, 1.0),
        }
    }

    #[test]
    fn test_extract_copies_box() {
        let image = DMatrix::from_fn(6, 5, |r, c| (10 * r + c) as f64);
        let g = geometry(BoundingBox {
            ns1: 2,
            ns2: 4,
            nc1: 3,
            nc2: 5,
        });
        let mut sub = g.extract_slitlet2d(&image).unwrap();
        assert_eq!(sub.shape(), (3, 3));
        assert_eq!(sub[(0, 0)], 12.0);
        assert_eq!(sub[(2, 2)], 34.0);
        // owned copy: writing does not touch the source
        sub[(0, 0)] = -1.0;
        assert_eq!(image[(1, 2)], 12.0);
    }

    #[test]
    fn test_extract_out_of_bounds() {
        let image = DMatrix::<f64>::zeros(6, 5);
        let g = geometry(BoundingBox {
            ns1: 4,
            ns2: 7,
            nc1: 1,
            nc2: 5,
        });
        assert!(matches!(
            g.extract_slitlet2d(&image),
            Err(RectWvError::GeometryFault { islitlet: 7, .. })
        ));
    }
}
