//! JSON configuration and report helpers.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doorcam_core::{CoreError, PipelineParams, RgbImage};
use serde::{Deserialize, Serialize};

use crate::batch::BatchReport;
use crate::raster::rgb_to_image;
use crate::template::{Template, TemplateCache, TemplateError};

#[derive(thiserror::Error, Debug)]
pub enum DeckIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error("invalid pipeline configuration: {0}")]
    Config(#[from] CoreError),
    #[error(transparent)]
    Template(#[from] TemplateError),
    #[error("raster {width}x{height} cannot be encoded")]
    Unencodable { width: usize, height: usize },
}

/// One camera installation: the reference patch and the pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoorcamConfig {
    /// Relative paths are resolved against the config file's folder.
    pub template_path: PathBuf,
    pub pipeline: PipelineParams,
}

impl DoorcamConfig {
    /// Load and validate a JSON config.
    ///
    /// A relative `template_path` is rewritten relative to `path`'s folder.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DeckIoError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)?;
        let mut cfg: Self = serde_json::from_str(&raw)?;
        cfg.pipeline.validate()?;
        if cfg.template_path.is_relative() {
            if let Some(dir) = path.parent() {
                cfg.template_path = dir.join(&cfg.template_path);
            }
        }
        Ok(cfg)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DeckIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Resolve the configured template through `cache`.
    pub fn template(&self, cache: &mut TemplateCache) -> Result<Template, DeckIoError> {
        Ok(Template::resolve(self.template_path.as_path(), cache)?)
    }

    /// Shared handle on the pipeline settings for building records.
    pub fn shared_pipeline(&self) -> Arc<PipelineParams> {
        Arc::new(self.pipeline.clone())
    }
}

impl BatchReport {
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, DeckIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write the report to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), DeckIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

/// Encode `img` in the format implied by the extension of `path`.
pub fn save_rgb(img: &RgbImage, path: impl AsRef<Path>) -> Result<PathBuf, DeckIoError> {
    let path = path.as_ref();
    let buf = rgb_to_image(img).ok_or(DeckIoError::Unencodable {
        width: img.width,
        height: img.height,
    })?;
    buf.save(path)?;
    Ok(path.to_path_buf())
}
