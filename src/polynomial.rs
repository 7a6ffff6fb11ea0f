//! One-dimensional polynomials for frontier curves and wavelength solutions.
//!
//! A [`Polynomial`] is an immutable sequence of coefficients in increasing
//! power order:
//!
//! ```text
//! p(x) = c0 + c1·x + c2·x² + … + cn·xⁿ
//! ```
//!
//! All polynomials handled by this crate take 1-based FITS pixel coordinates
//! as input (centre of the first pixel = 1.0). Frontier polynomials map a
//! detector column to a detector row; wavelength polynomials map a detector
//! column to a wavelength in Angstrom.

/// Immutable polynomial with coefficients in increasing power order.
///
/// Serialized (JSON) as a plain array of coefficients.
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
#[serde(transparent)]
pub struct Polynomial {
    coeffs: Vec<f64>,
}

impl Polynomial {
    /// Create a polynomial from coefficients `[c0, c1, …]`.
    ///
    /// An empty coefficient list is the zero polynomial.
    pub fn new(coeffs: Vec<f64>) -> Self {
        Self { coeffs }
    }

    /// Constant polynomial `p(x) = c`.
    pub fn constant(c: f64) -> Self {
        Self { coeffs: vec![c] }
    }

    /// Straight line `p(x) = intercept + slope·x`.
    pub fn linear(intercept: f64, slope: f64) -> Self {
        Self {
            coeffs: vec![intercept, slope],
        }
    }

    pub fn coeffs(&self) -> &[f64] {
        &self.coeffs
    }

    /// Evaluate at `x` (Horner scheme).
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.coeffs.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }
}
