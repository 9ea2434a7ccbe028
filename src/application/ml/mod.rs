pub mod model_handle;
pub mod onnx_predictor;
pub mod predictor;
