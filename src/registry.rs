use std::collections::HashMap;

use crate::config::Config;
use crate::errors::{Result, SegError};
use crate::model::Model;
use crate::traits::SegmentationModel;

/// Factory producing a ready-to-use model from the run configuration.
pub type ModelFactory = Box<dyn Fn(&Config) -> Result<Box<dyn SegmentationModel>> + Send + Sync>;

/// String-keyed registry of model architectures.
///
/// Adding an architecture means registering a factory, not branching deeper
/// in construction code. An unknown name is a configuration error surfaced
/// before any image is touched.
pub struct ModelRegistry {
    factories: HashMap<String, ModelFactory>,
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-loaded with the built-in ONNX backend.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("onnx", |config: &Config| {
            let model = Model::new(
                &config.model_path,
                config.device_id,
                config.classes,
                (config.crop_h, config.crop_w),
            )?;
            Ok(Box::new(model) as Box<dyn SegmentationModel>)
        });
        registry
    }

    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&Config) -> Result<Box<dyn SegmentationModel>> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn build(&self, arch: &str, config: &Config) -> Result<Box<dyn SegmentationModel>> {
        let factory = self.factories.get(arch).ok_or_else(|| {
            let mut known: Vec<_> = self.factories.keys().map(String::as_str).collect();
            known.sort_unstable();
            SegError::Configuration {
                message: format!(
                    "unsupported architecture '{}', available: {}",
                    arch,
                    known.join(", ")
                ),
            }
        })?;
        factory(config)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::MockSegmentationModel;
    use clap::Parser;

    fn test_config(arch: &str) -> Config {
        Config::parse_from([
            "seg-frac-rs",
            "--image-dir",
            "images",
            "--manifest-file",
            "manifest.csv",
            "--output-file",
            "out.csv",
            "--model-path",
            "model.onnx",
            "--arch",
            arch,
        ])
    }

    #[test]
    fn test_unknown_architecture_is_rejected() {
        let registry = ModelRegistry::with_builtins();
        let config = test_config("psp");
        let err = registry.build("psp", &config).unwrap_err();
        assert!(matches!(err, SegError::Configuration { .. }));
        assert!(err.to_string().contains("Configuration"));
    }

    #[test]
    fn test_custom_factory_registration() -> Result<()> {
        let mut registry = ModelRegistry::new();
        registry.register("mock", |config: &Config| {
            Ok(Box::new(MockSegmentationModel::new(config.classes)) as Box<dyn SegmentationModel>)
        });
        assert!(registry.contains("mock"));
        assert!(!registry.contains("onnx"));

        let config = test_config("mock");
        let model = registry.build("mock", &config)?;
        assert_eq!(model.num_classes(), config.classes);
        Ok(())
    }
}
