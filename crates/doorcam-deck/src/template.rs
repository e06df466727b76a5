//! Reference patch shared by every record of a batch.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doorcam_core::GrayImage;

#[derive(thiserror::Error, Debug)]
pub enum TemplateError {
    #[error("template `{path}` could not be read: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("template raster is empty ({width}x{height})")]
    Empty { width: usize, height: usize },
}

/// Immutable single-channel template. Clones share the raster.
#[derive(Clone, Debug)]
pub struct Template {
    raster: Arc<GrayImage>,
    path: Option<PathBuf>,
}

impl Template {
    pub fn from_raster(raster: GrayImage) -> Result<Self, TemplateError> {
        if raster.is_empty() {
            return Err(TemplateError::Empty {
                width: raster.width,
                height: raster.height,
            });
        }
        Ok(Self {
            raster: Arc::new(raster),
            path: None,
        })
    }

    /// Decode `path` as grayscale.
    pub fn load(path: &Path) -> Result<Self, TemplateError> {
        let raster = crate::raster::load_gray(path).map_err(|source| TemplateError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut template = Self::from_raster(raster)?;
        template.path = Some(path.to_path_buf());
        Ok(template)
    }

    /// Turn any accepted representation into a template, loading each
    /// distinct path at most once through `cache`.
    pub fn resolve(
        source: impl Into<TemplateSource>,
        cache: &mut TemplateCache,
    ) -> Result<Self, TemplateError> {
        match source.into() {
            TemplateSource::Template(t) => Ok(t),
            TemplateSource::Raster(r) => Self::from_raster(r),
            TemplateSource::Path(p) => cache.get_or_load(&p),
        }
    }

    #[inline]
    pub fn raster(&self) -> &GrayImage {
        &self.raster
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn width(&self) -> usize {
        self.raster.width
    }

    pub fn height(&self) -> usize {
        self.raster.height
    }

    /// True when both handles point at the same raster allocation.
    pub fn shares_raster_with(&self, other: &Template) -> bool {
        Arc::ptr_eq(&self.raster, &other.raster)
    }
}

/// The representations a template may be given in.
#[derive(Clone, Debug)]
pub enum TemplateSource {
    Path(PathBuf),
    Raster(GrayImage),
    Template(Template),
}

impl From<PathBuf> for TemplateSource {
    fn from(p: PathBuf) -> Self {
        TemplateSource::Path(p)
    }
}

impl From<&Path> for TemplateSource {
    fn from(p: &Path) -> Self {
        TemplateSource::Path(p.to_path_buf())
    }
}

impl From<&str> for TemplateSource {
    fn from(p: &str) -> Self {
        TemplateSource::Path(PathBuf::from(p))
    }
}

impl From<GrayImage> for TemplateSource {
    fn from(r: GrayImage) -> Self {
        TemplateSource::Raster(r)
    }
}

impl From<Template> for TemplateSource {
    fn from(t: Template) -> Self {
        TemplateSource::Template(t)
    }
}

/// Loaded templates keyed by path.
///
/// Owned by the host application and passed to whoever needs to resolve a
/// template; dropping it releases the rasters not held by a record.
#[derive(Debug, Default)]
pub struct TemplateCache {
    by_path: HashMap<PathBuf, Template>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path) -> Result<Template, TemplateError> {
        if let Some(t) = self.by_path.get(path) {
            return Ok(t.clone());
        }
        let t = Template::load(path)?;
        log::debug!(
            "loaded template {} ({}x{})",
            path.display(),
            t.width(),
            t.height()
        );
        self.by_path.insert(path.to_path_buf(), t.clone());
        Ok(t)
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}
