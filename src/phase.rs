use crate::error::PipelineError;
use crate::model::{GalaxiesInstance, GalaxiesModel, ModelMapper};
use crate::result::PhaseResult;
use crate::search::{NonLinearSearch, SearchProblem, SearchSettings};
use crate::tracer::{ImagingData, TracerService};

use ndarray::Zip;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Mask applied to the imaging data, recorded for output tagging
#[derive(Clone, Copy, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Mask {
    Circular { radius: f64 },
    CircularAnnular { inner_radius: f64, outer_radius: f64 },
}

impl Default for Mask {
    fn default() -> Self {
        Self::Circular { radius: 3.0 }
    }
}

impl Mask {
    pub fn tag(&self) -> String {
        match self {
            Self::Circular { radius } => format!("circ_{radius:.1}"),
            Self::CircularAnnular {
                inner_radius,
                outer_radius,
            } => format!("ann_{inner_radius:.1}_{outer_radius:.1}"),
        }
    }
}

/// Per-phase data and inversion settings
///
/// All of them feed the phase tag, so runs with different settings never
/// share an output directory.
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PhaseSettings {
    pub sub_size: u32,
    pub signal_to_noise_limit: Option<f64>,
    pub bin_up_factor: Option<u32>,
    pub positions_threshold: Option<f64>,
    pub pixel_scale_interpolation_grid: Option<f64>,
    pub inversion_uses_border: bool,
    pub inversion_pixel_limit: Option<u32>,
}

impl Default for PhaseSettings {
    fn default() -> Self {
        Self {
            sub_size: 2,
            signal_to_noise_limit: None,
            bin_up_factor: None,
            positions_threshold: None,
            pixel_scale_interpolation_grid: None,
            inversion_uses_border: true,
            inversion_pixel_limit: None,
        }
    }
}

impl PhaseSettings {
    /// Compose the phase tag, e.g. `phase_tag__sub_2__snr_30__bin_2__pos_0.50`
    pub fn tag(&self) -> String {
        let mut tag = format!("phase_tag__sub_{}", self.sub_size);
        if let Some(snr) = self.signal_to_noise_limit {
            tag.push_str(&format!("__snr_{snr:.0}"));
        }
        if let Some(bin) = self.bin_up_factor {
            tag.push_str(&format!("__bin_{bin}"));
        }
        if let Some(pos) = self.positions_threshold {
            tag.push_str(&format!("__pos_{pos:.2}"));
        }
        if let Some(interp) = self.pixel_scale_interpolation_grid {
            tag.push_str(&format!("__interp_{interp:.3}"));
        }
        tag
    }
}

/// One bounded optimization phase: a named model fit of imaging data
#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Phase {
    pub name: String,
    pub galaxies: GalaxiesModel,
    pub settings: PhaseSettings,
    pub mask: Mask,
    pub search_settings: SearchSettings,
}

impl Phase {
    pub fn new(name: impl Into<String>, galaxies: GalaxiesModel) -> Self {
        Self {
            name: name.into(),
            galaxies,
            settings: PhaseSettings::default(),
            mask: Mask::default(),
            search_settings: SearchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: PhaseSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_mask(mut self, mask: Mask) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_search_settings(mut self, search_settings: SearchSettings) -> Self {
        self.search_settings = search_settings;
        self
    }

    pub fn tag(&self) -> String {
        format!("{}__{}", self.settings.tag(), self.mask.tag())
    }

    /// Fit the phase's model to the data with the given collaborators
    ///
    /// The likelihood is the usual Gaussian image likelihood: minus half the
    /// chi-squared of the tracer's model image plus the noise normalization
    /// term, which is constant per dataset but kept so that likelihoods are
    /// comparable across phases fitting the same data.
    pub fn run(
        &self,
        data: &ImagingData,
        tracer: &dyn TracerService,
        search: &dyn NonLinearSearch,
    ) -> Result<PhaseResult, PipelineError> {
        let span = tracing::info_span!("phase", name = %self.name);
        let _enter = span.enter();

        let mapper = ModelMapper::new(&self.galaxies);
        tracing::info!(
            free_parameters = mapper.prior_count(),
            n_live_points = self.search_settings.n_live_points,
            "starting non-linear search"
        );

        let ln_noise_norm: f64 = data
            .noise_map()
            .iter()
            .map(|&n| -f64::ln(n) - 0.5 * f64::ln(std::f64::consts::TAU))
            .sum();

        let ln_likelihood = |instance: &GalaxiesInstance| -> Result<f64, PipelineError> {
            let model_image = tracer.model_image(instance)?;
            if model_image.len() != data.len() {
                return Err(PipelineError::Tracer(format!(
                    "model image has {} pixels, data has {}",
                    model_image.len(),
                    data.len()
                )));
            }
            let chi2 = Zip::from(data.image())
                .and(data.noise_map())
                .and(&model_image)
                .fold(0.0, |chi2, &d, &n, &m| chi2 + ((m - d) / n).powi(2));
            Ok(-0.5 * chi2 + ln_noise_norm)
        };

        let problem = SearchProblem::new(&mapper, &ln_likelihood);
        let output = search.search(&problem, &self.search_settings)?;
        tracing::info!(samples = output.samples.len(), "search complete");

        PhaseResult::new(self.name.clone(), self.galaxies.clone(), output)
    }
}
