use crate::error::PipelineError;
use crate::model::GalaxiesInstance;

use ndarray::Array1;

/// Masked imaging data a phase fits: the flattened image and its noise map
///
/// Loading from FITS files and masking are the data library's business;
/// phases receive ready-made equal-length arrays.
#[derive(Clone, Debug)]
pub struct ImagingData {
    image: Array1<f64>,
    noise_map: Array1<f64>,
}

impl ImagingData {
    pub fn new(image: Array1<f64>, noise_map: Array1<f64>) -> Result<Self, PipelineError> {
        if image.len() != noise_map.len() {
            return Err(PipelineError::MismatchedLengths {
                image: image.len(),
                noise_map: noise_map.len(),
            });
        }
        Ok(Self { image, noise_map })
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }

    pub fn image(&self) -> &Array1<f64> {
        &self.image
    }

    pub fn noise_map(&self) -> &Array1<f64> {
        &self.noise_map
    }
}

/// The external ray-tracing service
///
/// Given a concrete galaxy configuration it produces the model image over
/// the same flattened pixel grid as the phase's [ImagingData]. Deflection
/// fields, Einstein radii and the rest of the lensing machinery live behind
/// this seam as well, but only the model image is needed to drive a fit.
pub trait TracerService {
    fn model_image(&self, galaxies: &GalaxiesInstance) -> Result<Array1<f64>, PipelineError>;
}
