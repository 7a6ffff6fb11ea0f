//! Loading and saving calibration bundles.
//!
//! Two formats are supported:
//!
//! - **JSON**: the RectWaveCoeff document written by the calibration
//!   procedure. It is parsed with `serde_json` and always funnelled through
//!   [`CalibrationBundleBuilder`](super::CalibrationBundleBuilder), so a
//!   malformed document fails before any reduction starts.
//! - **rkyv**: a binary cache of an already validated bundle for fast
//!   reloading.
//!
//! ```text
//! {
//!   "uuid": "…",
//!   "tags": { "grism": "J", "filter": "J" },
//!   "total_slitlets": 55,
//!   "missing_slitlets": [1, 55],
//!   "meta_info": {
//!     "dtu_configuration": { "xdtu": …, "ydtu": …, … },
//!     "origin": { "bound_param": "uuid:…", "master_rectwv": "uuid:…" }
//!   },
//!   "contents": [ { "islitlet": 2, "frontier_lower": [..], … }, … ]
//! }
//! ```

use std::path::Path;

use anyhow::Context;
use tracing::info;

use super::{CalibrationBundle, CalibrationTags, Provenance, SlitletCoefficients};
use crate::dtu::DtuConfiguration;

#[derive(serde::Serialize, serde::Deserialize)]
struct RectWvCoeffDocument {
    uuid: String,
    tags: CalibrationTags,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    total_slitlets: Option<u32>,
    #[serde(default)]
    missing_slitlets: Vec<u32>,
    meta_info: MetaInfo,
    contents: Vec<SlitletCoefficients>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MetaInfo {
    dtu_configuration: DtuConfiguration,
    origin: Origin,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct Origin {
    bound_param: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    master_rectwv: Option<String>,
}

impl CalibrationBundle {
    // ── JSON ──

    /// Parse a RectWaveCoeff JSON document.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let doc: RectWvCoeffDocument =
            serde_json::from_str(json).context("Failed to parse RectWaveCoeff JSON")?;

        let mut builder = CalibrationBundle::builder()
            .tags(doc.tags.grism, doc.tags.filter)
            .missing_slitlets(doc.missing_slitlets)
            .slitlets(doc.contents)
            .dtu_configuration(doc.meta_info.dtu_configuration)
            .provenance(Provenance {
                uuid: doc.uuid,
                bound_param: doc.meta_info.origin.bound_param,
                master_rectwv: doc.meta_info.origin.master_rectwv,
            });
        if let Some(nbars) = doc.total_slitlets {
            builder = builder.nbars(nbars);
        }
        Ok(builder.build()?)
    }

    /// Load a RectWaveCoeff JSON file.
    pub fn load_json(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read calibration: {}", path.display()))?;
        let bundle = Self::from_json_str(&json)
            .with_context(|| format!("Invalid calibration: {}", path.display()))?;
        info!(
            "Loaded RectWaveCoeff {} ({} slitlets, grism {}, filter {})",
            bundle.provenance.uuid,
            bundle.contents.len(),
            bundle.tags.grism,
            bundle.tags.filter
        );
        Ok(bundle)
    }

    /// Serialize the bundle as a RectWaveCoeff JSON document.
    pub fn to_json_string(&self) -> anyhow::Result<String> {
        let doc = RectWvCoeffDocument {
            uuid: self.provenance.uuid.clone(),
            tags: self.tags.clone(),
            total_slitlets: Some(self.nbars),
            missing_slitlets: self.missing_slitlets.clone(),
            meta_info: MetaInfo {
                dtu_configuration: self.dtu_configuration,
                origin: Origin {
                    bound_param: self.provenance.bound_param.clone(),
                    master_rectwv: self.provenance.master_rectwv.clone(),
                },
            },
            contents: self.contents.clone(),
        };
        Ok(serde_json::to_string_pretty(&doc)?)
    }

    // ── rkyv cache ──

    /// Serialize the bundle to bytes using rkyv.
    pub fn to_rkyv_bytes(&self) -> anyhow::Result<Vec<u8>> {
        let bytes = rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map_err(|e| anyhow::anyhow!("rkyv serialization failed: {}", e))?;
        Ok(bytes.to_vec())
    }

    /// Save the bundle to a file using rkyv.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        let bytes = self.to_rkyv_bytes()?;
        std::fs::write(path, &bytes)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved calibration to {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    /// Load a bundle from an rkyv file written by [`save_to_file`](Self::save_to_file).
    pub fn load_from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        let mut aligned = rkyv::util::AlignedVec::<16>::with_capacity(bytes.len());
        aligned.extend_from_slice(&bytes);
        let bundle = rkyv::from_bytes::<Self, rkyv::rancor::Error>(&aligned)
            .map_err(|e| anyhow::anyhow!("rkyv deserialization failed: {}", e))?;
        info!(
            "Loaded calibration {}: {} slitlets",
            bundle.provenance.uuid,
            bundle.contents.len()
        );
        Ok(bundle)
    }
}
