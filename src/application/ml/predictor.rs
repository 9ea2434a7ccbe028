/// Interface for sequence models served from a trained artifact
pub trait SequencePredictor: Send + Sync {
    /// Predict the next value from `window` (oldest row first), in the scaled units
    /// the model was trained on.
    fn predict_sequence(&self, window: &[Vec<f32>]) -> Result<f32, String>;

    /// Number of rows the model expects per input window
    fn sequence_length(&self) -> usize;

    /// Get model name/type
    fn name(&self) -> &str;
}
