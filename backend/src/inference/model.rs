use std::sync::{Arc, Mutex};

use shared::Diagnosis;
use tch::{CModule, Device, Tensor};

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("model error: {0}")]
    Model(#[from] tch::TchError),
    #[error("class index {0} has no diagnosis label")]
    UnknownClass(usize),
}

/// A loaded TorchScript classifier. The module is loaded once at startup
/// and only read afterwards; the mutex exists because libtorch modules
/// are not `Sync`.
#[derive(Clone)]
pub struct Classifier {
    module: Arc<Mutex<CModule>>,
}

impl Classifier {
    pub fn load(model_path: &str) -> Result<Self, InferenceError> {
        let device = Device::cuda_if_available();
        let module = CModule::load_on_device(model_path, device)?;
        Ok(Self {
            module: Arc::new(Mutex::new(module)),
        })
    }

    /// Runs the forward pass and returns the softmaxed probability vector
    /// over the diagnostic classes.
    pub fn predict(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError> {
        let output = self.module.lock().unwrap().forward_ts(&[input])?;
        let probabilities = output.softmax(-1, tch::Kind::Float);
        let flat = probabilities.to_kind(tch::Kind::Float).view([-1]);
        let count = flat.size()[0] as usize;
        let mut values = vec![0.0f32; count];
        flat.copy_data(&mut values, count);
        Ok(values)
    }

    /// Maps a preprocessed tensor to a diagnosis and its class index.
    pub fn classify(&self, input: &Tensor) -> Result<(Diagnosis, usize), InferenceError> {
        let probabilities = self.predict(input)?;
        let class_index = argmax(&probabilities);
        let diagnosis = Diagnosis::from_repr(class_index)
            .ok_or(InferenceError::UnknownClass(class_index))?;
        Ok((diagnosis, class_index))
    }
}

/// Index of the largest probability; ties resolve to the first occurrence.
pub fn argmax(probabilities: &[f32]) -> usize {
    let mut best = 0;
    for (index, value) in probabilities.iter().enumerate() {
        if *value > probabilities[best] {
            best = index;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argmax_picks_largest_probability() {
        assert_eq!(argmax(&[0.05, 0.1, 0.8, 0.05]), 2);
        assert_eq!(argmax(&[0.9, 0.05, 0.03, 0.02]), 0);
    }

    #[test]
    fn argmax_breaks_ties_on_first_occurrence() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), 1);
        assert_eq!(argmax(&[0.25, 0.25, 0.25, 0.25]), 0);
    }

    #[test]
    fn argmax_of_empty_vector_defaults_to_zero() {
        assert_eq!(argmax(&[]), 0);
    }

    #[test]
    fn class_indices_past_the_label_table_are_rejected() {
        assert!(Diagnosis::from_repr(4).is_none());
        assert!(matches!(
            Diagnosis::from_repr(7).ok_or(InferenceError::UnknownClass(7)),
            Err(InferenceError::UnknownClass(7))
        ));
    }
}
