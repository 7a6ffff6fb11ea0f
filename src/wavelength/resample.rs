//! Flux-conserving resampling along the dispersion axis.
//!
//! The input column `j` covers detector columns `first_column + j ± ½`
//! (1-based). The wavelength solution maps those borders to wavelength, which
//! turns each input row into a piecewise-constant spectrum on an irregular
//! wavelength grid. The spectrum is then rebinned onto the borders of the
//! linear [`OutputGrid`](super::OutputGrid).

use nalgebra::DMatrix;

use super::OutputGrid;
use crate::polynomial::Polynomial;
use crate::rebin::{strictly_increasing, CumulativeFlux};

/// Resample every row of `image` onto the common output grid.
///
/// `first_column` is the 1-based detector column of the first image column.
/// Returns an `image.nrows() × grid.naxis1` array, or `None` when the
/// wavelength solution is not strictly increasing across the input columns.
pub fn resample_image2d_flux(
    image: &DMatrix<f64>,
    first_column: f64,
    wpoly: &Polynomial,
    grid: &OutputGrid,
) -> Option<DMatrix<f64>> {
    let ncols = image.ncols();
    let in_edges: Vec<f64> = (0..=ncols)
        .map(|j| wpoly.eval(first_column + j as f64 - 0.5))
        .collect();
    if !strictly_increasing(&in_edges) {
        return None;
    }

    let mut out_edges = grid.border_wavelengths();
    // A negative dispersion lists the output borders in decreasing order.
    let reversed = grid.cdelt1 < 0.0;
    if reversed {
        out_edges.reverse();
    }

    let mut output = DMatrix::<f64>::zeros(image.nrows(), grid.naxis1);
    let mut row_values = vec![0.0; ncols];
    let mut row_out = vec![0.0; grid.naxis1];
    for i in 0..image.nrows() {
        for (j, v) in row_values.iter_mut().enumerate() {
            *v = image[(i, j)];
        }
        let cumulative = CumulativeFlux::new(in_edges.clone(), &row_values);
        cumulative.rebin_into(&out_edges, &mut row_out);
        if reversed {
            row_out.reverse();
        }
        for (k, &v) in row_out.iter().enumerate() {
            output[(i, k)] = v;
        }
    }
    Some(output)
}
