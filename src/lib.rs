//! # rectwv
//!
//! **Rectification and wavelength calibration** of near-infrared multi-slit
//! spectroscopic frames, as produced by the EMIR spectrograph.
//!
//! A configurable slit unit carves the field into up to 55 *slitlets*. On the
//! detector each slitlet is a curved, tilted band whose dispersion axis runs
//! along the columns. Given a calibration bundle (per-slitlet frontier curves,
//! rectified frontier rows and wavelength solutions), `rectwv` straightens
//! every slitlet, resamples it onto a common linear wavelength grid and
//! assembles the results into a single output frame with a linear wavelength
//! WCS.
//!
//! ## Features
//!
//! - **Flux-conserving** rectification and wavelength resampling, or nearest
//!   neighbour rectification for pixel-exact copies
//! - **Safety checks** before any pixel is touched: grism/filter identity and
//!   detector translation unit (DTU) position
//! - **Overlap reconciliation** of adjacent slitlets, recorded in the header
//!   as `SLTMINnn`/`SLTMAXnn`
//! - **Calibration persistence**: JSON documents through serde, and a
//!   zero-copy binary cache with [rkyv](https://docs.rs/rkyv)
//!
//! ## Example
//!
//! ```no_run
//! use rectwv::{apply_rectwv_coeff, CalibrationBundle, EmirWavelengthTable, RectWvConfig};
//! # fn load_frame() -> rectwv::DetectorFrame { unimplemented!() }
//!
//! let bundle = CalibrationBundle::load_json("data/rectwv_coeff.json").unwrap();
//! let frame = load_frame();
//!
//! let result = apply_rectwv_coeff(
//!     &frame,
//!     &bundle,
//!     &EmirWavelengthTable,
//!     &RectWvConfig::default(),
//! )
//! .unwrap();
//! for adj in &result.overlaps {
//!     println!("slitlet {:02} clamped to row {}", adj.previous, adj.adjusted_max());
//! }
//! ```
//!
//! ## Processing steps
//!
//! 1. **Validation**: frame shape, grism/filter and DTU configuration
//! 2. **Geometry**: bounding box and useful scans of each slitlet
//! 3. **Extraction** of the distorted sub-image
//! 4. **Rectification**: both frontier curves become horizontal rows
//! 5. **Wavelength resampling** onto the output grid
//! 6. **Composition**: overlap reconciliation and header rewrite

/// Calibration bundle and its persistence
pub mod calibration;
/// Output image assembly and header rewrite
pub mod compositor;
pub mod dtu;
pub mod error;
/// Detector frames and geometry
pub mod frame;
pub mod header;
pub mod polynomial;
pub(crate) mod rebin;
pub mod rectwv;
/// Per-slitlet geometry, extraction and rectification
pub mod slitlet;
pub mod validate;
/// Output wavelength grids and resampling
pub mod wavelength;

pub use calibration::{
    CalibrationBundle, CalibrationBundleBuilder, CalibrationTags, Provenance, SlitletCoefficients,
};
pub use compositor::{ImageCompositor, OverlapAdjustment, ScanRange};
pub use dtu::DtuConfiguration;
pub use error::{RectWvError, Result};
pub use frame::{DetectorFrame, DetectorGeometry};
pub use header::{Header, HeaderValue};
pub use polynomial::Polynomial;
pub use rectwv::{apply_rectwv_coeff, RectWvConfig, RectWvResult};
pub use slitlet::{BoundingBox, Resampling, SlitletGeometry};
pub use validate::{DtuCheck, DtuPolicy};
pub use wavelength::{
    CsvWavelengthTable, EmirWavelengthTable, OutputGrid, WavelengthParameterResolver,
};

// Images are indexed (row, column), row 0 being detector scan 1.
pub type Image = nalgebra::DMatrix<f64>;
