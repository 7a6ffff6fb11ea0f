//! Detector translation unit (DTU) configuration.
//!
//! The DTU sets the mechanical offset of the detector relative to the
//! instrument. A rectification calibration is only valid for the DTU
//! configuration it was derived with.

use std::fmt;

use crate::error::{RectWvError, Result};
use crate::header::Header;

/// Header keywords holding the six DTU fields, in field order.
pub const DTU_KEYWORDS: [&str; 6] = ["XDTU", "YDTU", "ZDTU", "XDTU_0", "YDTU_0", "ZDTU_0"];

/// DTU position and its reference (`_0`) position along the three axes.
///
/// Equality compares every field by value.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    serde::Serialize,
    serde::Deserialize,
    rkyv::Archive,
    rkyv::Serialize,
    rkyv::Deserialize,
)]
pub struct DtuConfiguration {
    pub xdtu: f64,
    pub ydtu: f64,
    pub zdtu: f64,
    pub xdtu_0: f64,
    pub ydtu_0: f64,
    pub zdtu_0: f64,
}

impl DtuConfiguration {
    /// Read the configuration from an image header.
    ///
    /// All six keywords must be present and numeric.
    pub fn from_header(header: &Header) -> Result<Self> {
        let read = |keyword: &str| {
            header
                .get_f64(keyword)
                .ok_or_else(|| RectWvError::MissingKeyword(keyword.to_string()))
        };
        Ok(Self {
            xdtu: read("XDTU")?,
            ydtu: read("YDTU")?,
            zdtu: read("ZDTU")?,
            xdtu_0: read("XDTU_0")?,
            ydtu_0: read("YDTU_0")?,
            zdtu_0: read("ZDTU_0")?,
        })
    }

    /// Write the configuration into a header.
    pub fn write_to_header(&self, header: &mut Header) {
        for (keyword, value) in DTU_KEYWORDS.iter().zip(self.values()) {
            header.set(keyword, value);
        }
    }

    fn values(&self) -> [f64; 6] {
        [
            self.xdtu,
            self.ydtu,
            self.zdtu,
            self.xdtu_0,
            self.ydtu_0,
            self.zdtu_0,
        ]
    }
}

impl fmt::Display for DtuConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "xdtu={}, ydtu={}, zdtu={}, xdtu_0={}, ydtu_0={}, zdtu_0={}",
            self.xdtu, self.ydtu, self.zdtu, self.xdtu_0, self.ydtu_0, self.zdtu_0
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DtuConfiguration {
        DtuConfiguration {
            xdtu: -205.679,
            ydtu: -24.4848,
            zdtu: -463.75,
            xdtu_0: -205.679,
            ydtu_0: -24.4848,
            zdtu_0: -463.75,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let mut header = Header::new();
        sample().write_to_header(&mut header);
        assert_eq!(DtuConfiguration::from_header(&header), Ok(sample()));
    }

    #[test]
    fn test_missing_keyword() {
        let mut header = Header::new();
        sample().write_to_header(&mut header);
        header.remove("ZDTU_0");
        assert_eq!(
            DtuConfiguration::from_header(&header),
            Err(RectWvError::MissingKeyword("ZDTU_0".to_string()))
        );
    }

    #[test]
    fn test_value_equality() {
        let mut other = sample();
        assert_eq!(other, sample());
        other.ydtu += 0.5;
        assert_ne!(other, sample());
    }
}
