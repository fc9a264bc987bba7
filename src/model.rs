use std::path::Path;

use ndarray::prelude::*;
use ort::value::TensorRef;
use ort::{
    execution_providers::{CUDAExecutionProvider, TensorRTExecutionProvider},
    session::{builder::SessionBuilder, Session},
};
use parking_lot::Mutex;
use tracing::info;

use crate::errors::{Result, SegError};
use crate::traits::SegmentationModel;

/// ONNX Runtime backed segmentation model.
///
/// The session is wrapped in a mutex so rayon workers can share one model;
/// inference serializes on the session while image decoding and accumulation
/// run in parallel. Input/output tensor names are read from the session
/// metadata rather than hard-coded, so any single-input single-output
/// segmentation export works.
pub struct Model {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
    classes: usize,
}

impl Model {
    pub fn new(
        model_path: &Path,
        device_id: i32,
        classes: usize,
        crop: (usize, usize),
    ) -> Result<Self> {
        info!("loading segmentation model from {:?}", model_path);

        let mut session = SessionBuilder::new()
            .map_err(|e| SegError::Model {
                operation: "session builder initialization".to_string(),
                source: Box::new(e),
            })?
            .with_execution_providers([
                TensorRTExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
                CUDAExecutionProvider::default()
                    .with_device_id(device_id)
                    .build(),
            ])
            .map_err(|e| SegError::Model {
                operation: "execution provider setup".to_string(),
                source: Box::new(e),
            })?
            .with_memory_pattern(true)
            .map_err(|e| SegError::Model {
                operation: "memory pattern setup".to_string(),
                source: Box::new(e),
            })?
            .commit_from_file(model_path)
            .map_err(|e| SegError::Model {
                operation: format!("model file loading: {}", model_path.display()),
                source: Box::new(e),
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .ok_or_else(|| SegError::Model {
                operation: "model input inspection".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "model has no inputs",
                )),
            })?;
        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| SegError::Model {
                operation: "model output inspection".to_string(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "model has no outputs",
                )),
            })?;

        // warm-up run at the crop size so the first real window is not the
        // one paying for graph optimization
        let data = Array4::<f32>::zeros((1, 3, crop.0, crop.1));
        session
            .run(ort::inputs![input_name.as_str() => TensorRef::from_array_view(&data)
                .map_err(|e| SegError::Model {
                    operation: "warm-up tensor creation".to_string(),
                    source: Box::new(e),
                })?])
            .map_err(|e| SegError::Model {
                operation: "warm-up inference".to_string(),
                source: Box::new(e),
            })?;

        info!("model loaded, input '{}', output '{}'", input_name, output_name);
        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
            classes,
        })
    }
}

impl SegmentationModel for Model {
    fn predict(&self, input: ArrayView4<f32>) -> Result<Array4<f32>> {
        let mut session = self.session.lock();
        let outputs = session.run(
            ort::inputs![self.input_name.as_str() => TensorRef::from_array_view(&input.as_standard_layout())?],
        )?;
        Ok(outputs[self.output_name.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix4>()?
            .to_owned())
    }

    fn num_classes(&self) -> usize {
        self.classes
    }
}
