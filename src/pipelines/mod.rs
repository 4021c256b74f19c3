//! Pre-built pipeline definitions
//!
//! Each maker turns a [`PipelineSettings`] into a [`Pipeline`](crate::Pipeline)
//! whose later phases derive their priors from the results of earlier ones.

pub mod bulge_disk_parametric;
pub mod source_inversion;

use crate::model::{PixelizationKind, RegularizationKind};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Choices that fix a pipeline's model structure before it runs
///
/// The settings enter the pipeline tag, so runs with different choices are
/// written to different output directories.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PipelineSettings {
    #[serde(default = "PipelineSettings::default_include_shear")]
    pub include_shear: bool,
    #[serde(default = "PipelineSettings::default_pixelization")]
    pub pixelization: PixelizationKind,
    #[serde(default = "PipelineSettings::default_regularization")]
    pub regularization: RegularizationKind,
    #[serde(default = "PipelineSettings::default_hyper_galaxies")]
    pub hyper_galaxies: bool,
    #[serde(default = "PipelineSettings::default_align_bulge_disk_centre")]
    pub align_bulge_disk_centre: bool,
    #[serde(default = "PipelineSettings::default_redshift_lens")]
    pub redshift_lens: f64,
    #[serde(default = "PipelineSettings::default_redshift_source")]
    pub redshift_source: f64,
}

impl PipelineSettings {
    #[inline]
    pub fn default_include_shear() -> bool {
        true
    }

    #[inline]
    pub fn default_pixelization() -> PixelizationKind {
        PixelizationKind::VoronoiMagnification
    }

    #[inline]
    pub fn default_regularization() -> RegularizationKind {
        RegularizationKind::Constant
    }

    #[inline]
    pub fn default_hyper_galaxies() -> bool {
        false
    }

    #[inline]
    pub fn default_align_bulge_disk_centre() -> bool {
        false
    }

    #[inline]
    pub fn default_redshift_lens() -> f64 {
        0.5
    }

    #[inline]
    pub fn default_redshift_source() -> f64 {
        1.0
    }

    /// The directory-level tag encoding these settings
    pub fn tag(&self) -> String {
        let mut tag = String::from("pipeline_tag");
        if self.hyper_galaxies {
            tag.push_str("__hyper_galaxies");
        }
        if self.include_shear {
            tag.push_str("__with_shear");
        }
        if self.align_bulge_disk_centre {
            tag.push_str("__bd_align_centre");
        }
        tag.push_str("__pix_");
        tag.push_str(self.pixelization.tag());
        tag.push_str("__reg_");
        tag.push_str(self.regularization.tag());
        tag
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            include_shear: Self::default_include_shear(),
            pixelization: Self::default_pixelization(),
            regularization: Self::default_regularization(),
            hyper_galaxies: Self::default_hyper_galaxies(),
            align_bulge_disk_centre: Self::default_align_bulge_disk_centre(),
            redshift_lens: Self::default_redshift_lens(),
            redshift_source: Self::default_redshift_source(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_encodes_every_structural_choice() {
        let settings = PipelineSettings::default();
        assert_eq!(
            settings.tag(),
            "pipeline_tag__with_shear__pix_voro_mag__reg_const"
        );

        let settings = PipelineSettings {
            include_shear: false,
            pixelization: PixelizationKind::Rectangular,
            regularization: RegularizationKind::AdaptiveBrightness,
            hyper_galaxies: true,
            align_bulge_disk_centre: true,
            ..PipelineSettings::default()
        };
        assert_eq!(
            settings.tag(),
            "pipeline_tag__hyper_galaxies__bd_align_centre__pix_rect__reg_adapt_bright"
        );
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let settings: PipelineSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, PipelineSettings::default());

        let settings: PipelineSettings =
            serde_json::from_str(r#"{"include_shear": false, "redshift_source": 2.5}"#).unwrap();
        assert!(!settings.include_shear);
        approx::assert_relative_eq!(settings.redshift_source, 2.5);
    }
}
