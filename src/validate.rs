//! Consistency checks between a frame and a calibration bundle.
//!
//! Two checks run before any pixel is touched:
//!
//! - **Identity**: the grism and filter of the frame must equal the
//!   calibration tags. A wavelength solution is meaningless for another
//!   instrument configuration, so a mismatch is always fatal.
//! - **DTU configuration**: the detector must sit where it sat when the
//!   calibration was derived. Callers choose whether a difference is fatal
//!   ([`DtuPolicy::Strict`]) or only reported ([`DtuPolicy::Permissive`]).

use tracing::{debug, info, warn};

use crate::calibration::{CalibrationBundle, CalibrationTags};
use crate::dtu::DtuConfiguration;
use crate::error::{RectWvError, Result};
use crate::frame::DetectorFrame;
use crate::header::Header;

/// How to react to a DTU configuration difference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DtuPolicy {
    /// Abort with [`RectWvError::DtuMismatch`].
    Strict,
    /// Log a warning and carry on.
    #[default]
    Permissive,
}

/// Outcome of the DTU configuration check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtuCheck {
    Match,
    /// Configurations differ but the policy allowed continuing.
    MismatchIgnored,
}

/// Check the `FILTER` and `GRISM` keywords against the calibration tags.
pub fn check_identity(header: &Header, tags: &CalibrationTags) -> Result<()> {
    for (keyword, expected) in [("FILTER", &tags.filter), ("GRISM", &tags.grism)] {
        let found = header.get_str(keyword);
        debug!("{}: {:?}", keyword, found);
        if found != Some(expected.as_str()) {
            return Err(RectWvError::IdentityMismatch {
                keyword,
                frame: found.map(str::to_string),
                calibration: expected.clone(),
            });
        }
    }
    Ok(())
}

/// Compare the DTU configuration of a frame with the calibration one.
pub fn check_dtu(
    frame: &DtuConfiguration,
    calibration: &DtuConfiguration,
    policy: DtuPolicy,
) -> Result<DtuCheck> {
    if frame == calibration {
        info!("DTU configuration match!");
        return Ok(DtuCheck::Match);
    }
    info!("DTU configuration from image header: {}", frame);
    info!("DTU configuration from master calibration: {}", calibration);
    match policy {
        DtuPolicy::Strict => Err(RectWvError::DtuMismatch {
            frame: frame.to_string(),
            calibration: calibration.to_string(),
        }),
        DtuPolicy::Permissive => {
            warn!("DTU configuration differences found!");
            Ok(DtuCheck::MismatchIgnored)
        }
    }
}

/// Run the identity check, then the DTU check, for a frame.
pub fn validate_frame(
    frame: &DetectorFrame,
    bundle: &CalibrationBundle,
    policy: DtuPolicy,
) -> Result<DtuCheck> {
    check_identity(&frame.header, bundle.tags())?;
    let frame_dtu = DtuConfiguration::from_header(&frame.header)?;
    debug!("DTU configuration: {}", frame_dtu);
    check_dtu(&frame_dtu, bundle.dtu_configuration(), policy)
}
