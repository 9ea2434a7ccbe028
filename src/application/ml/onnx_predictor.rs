use super::predictor::SequencePredictor;
use anyhow::Context;
use ort::session::Session;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// Recurrent model exported to ONNX with input shape `[1, sequence_length, features]`
/// and a single scalar output.
pub struct OnnxSequencePredictor {
    session: Mutex<Session>,
    model_path: PathBuf,
    sequence_length: usize,
}

impl OnnxSequencePredictor {
    pub fn load(model_path: impl AsRef<Path>, sequence_length: usize) -> anyhow::Result<Self> {
        let model_path = model_path.as_ref().to_path_buf();
        if !model_path.exists() {
            anyhow::bail!("ONNX model file not found at {:?}", model_path);
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {:?}", model_path))?;

        info!("Successfully loaded ONNX model from {:?}", model_path);
        Ok(Self {
            session: Mutex::new(session),
            model_path,
            sequence_length,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SequencePredictor for OnnxSequencePredictor {
    fn predict_sequence(&self, window: &[Vec<f32>]) -> Result<f32, String> {
        if window.len() != self.sequence_length {
            return Err(format!(
                "Expected {} rows, got {}",
                self.sequence_length,
                window.len()
            ));
        }
        let feature_dim = window.first().map(|r| r.len()).ok_or("Empty window")?;
        if window.iter().any(|r| r.len() != feature_dim) {
            return Err("Ragged input window".to_string());
        }

        // [batch, seq_len, features], single batch
        let flat_data: Vec<f32> = window.iter().flatten().copied().collect();
        let shape = vec![1, self.sequence_length, feature_dim];

        let input_value = ort::value::Value::from_array((shape.as_slice(), flat_data))
            .map_err(|e| format!("Input value creation failed: {}", e))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| format!("Mutex lock failed: {}", e))?;

        let outputs = session
            .run(ort::inputs![input_value])
            .map_err(|e| e.to_string())?;
        let output_value = outputs
            .iter()
            .next()
            .map(|(_, v)| v)
            .ok_or("No output found")?;
        let data = output_value
            .try_extract_tensor::<f32>()
            .map_err(|e| e.to_string())?;
        data.1.iter().next().copied().ok_or_else(|| "Empty output".to_string())
    }

    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn name(&self) -> &str {
        "ONNX Runtime (LSTM)"
    }
}
