//! Synthetic detectors, calibrations and frames shared by the integration tests.
//!
//! Frontiers follow `lower(x) = y0_lower - 0.5 + slope·x` (and the same for
//! the upper frontier), so a slope of zero puts the distorted frontiers half a
//! row below their rectified positions.

#![allow(dead_code)]

use nalgebra::DMatrix;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rectwv::{
    CalibrationBundle, DetectorFrame, DetectorGeometry, DtuConfiguration, Header, OutputGrid,
    Polynomial, Provenance, Result, SlitletCoefficients, WavelengthParameterResolver,
};

pub const GRISM: &str = "J";
pub const FILTER: &str = "J";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_env_filter("info").try_init();
}

/// Resolver returning the same grid for every grism/filter pair.
pub struct FixedGrid(pub OutputGrid);

impl WavelengthParameterResolver for FixedGrid {
    fn resolve(&self, _grism: &str, _filter: &str) -> Result<OutputGrid> {
        Ok(self.0)
    }
}

pub fn detector(naxis2: usize, naxis1: usize, nbars: u32) -> DetectorGeometry {
    DetectorGeometry {
        naxis1,
        naxis2,
        nbars,
    }
}

pub fn dtu() -> DtuConfiguration {
    DtuConfiguration {
        xdtu: -205.679000854,
        ydtu: -24.4878005981,
        zdtu: -463.765991211,
        xdtu_0: -205.679000854,
        ydtu_0: -24.4878005981,
        zdtu_0: -463.765991211,
    }
}

/// Wavelength solution: 1000 Å at column 0, about 1 Å/pixel, slightly curved.
pub fn wpoly() -> Polynomial {
    Polynomial::new(vec![1000.0, 1.0, 1.0e-4])
}

/// Slitlet whose frontiers have constant rows equal to their rectified rows.
pub fn straight_slitlet(islitlet: u32, y0_lower: f64, y0_upper: f64, ncols: u32) -> SlitletCoefficients {
    SlitletCoefficients {
        islitlet,
        frontier_lower: Polynomial::constant(y0_lower),
        frontier_upper: Polynomial::constant(y0_upper),
        y0_frontier_lower: y0_lower,
        y0_frontier_upper: y0_upper,
        bb_nc1_orig: 1,
        bb_nc2_orig: ncols,
        ymargin_bb: 1,
        wpoly: Polynomial::linear(1000.0, 1.0),
    }
}

/// Slitlet whose frontiers rise linearly along the dispersion axis.
pub fn tilted_slitlet(
    islitlet: u32,
    y0_lower: f64,
    y0_upper: f64,
    ncols: u32,
    slope: f64,
) -> SlitletCoefficients {
    SlitletCoefficients {
        islitlet,
        frontier_lower: Polynomial::linear(y0_lower - 0.5, slope),
        frontier_upper: Polynomial::linear(y0_upper - 0.5, slope),
        y0_frontier_lower: y0_lower,
        y0_frontier_upper: y0_upper,
        bb_nc1_orig: 1,
        bb_nc2_orig: ncols,
        ymargin_bb: 2,
        wpoly: wpoly(),
    }
}

pub fn provenance() -> Provenance {
    Provenance {
        uuid: "4b3f8a0e-7d55-4c2f-9d1a-3a64a2f3d0b1".to_string(),
        bound_param: "uuid:9d0e0b1c-2f7a-4a8e-8f1d-1f5d7c3e2a90".to_string(),
        master_rectwv: None,
    }
}

pub fn bundle(
    nbars: u32,
    missing: Vec<u32>,
    slitlets: Vec<SlitletCoefficients>,
) -> CalibrationBundle {
    CalibrationBundle::builder()
        .tags(GRISM, FILTER)
        .nbars(nbars)
        .missing_slitlets(missing)
        .slitlets(slitlets)
        .dtu_configuration(dtu())
        .provenance(provenance())
        .build()
        .expect("valid synthetic calibration")
}

pub fn header() -> Header {
    let mut header = Header::new();
    header.set("GRISM", GRISM);
    header.set("FILTER", FILTER);
    dtu().write_to_header(&mut header);
    header.set("CD1_1", 1.0);
    header.set("CD2_2", 1.0);
    header.set("PCRPIX1", 1024.0);
    header
}

/// Frame with Gaussian noise around `level` on the rows accepted by `mask`
/// (0-based row, 0-based column) and zero elsewhere.
pub fn noisy_frame(
    naxis2: usize,
    naxis1: usize,
    seed: u64,
    level: f64,
    mask: impl Fn(usize, usize) -> bool,
) -> DetectorFrame {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 0.05 * level).expect("valid noise sigma");
    let data = DMatrix::from_fn(naxis2, naxis1, |r, c| {
        if mask(r, c) {
            level + noise.sample(&mut rng)
        } else {
            0.0
        }
    });
    DetectorFrame::new(data, header())
}
