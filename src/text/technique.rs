//! Per-font cache of rendering techniques.
//!
//! A technique is one concrete way of drawing a font's glyphs: the pipeline state plus the
//! resource bindings that sample its atlas. Techniques are built on first request and then
//! live as long as the font. Each font holds at most one instance of each technique type.

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
};

use wgpu::RenderPass;

use super::font::FontFace;
use crate::{pipeline::PipelineBuildError, render::Render, shader::ShaderError};

#[derive(thiserror::Error, Debug)]
pub enum TechniqueError {
    #[error(transparent)]
    Shader(#[from] ShaderError),
    #[error(transparent)]
    Pipeline(#[from] PipelineBuildError),
    #[error("failed to bind font atlas: {0:#}")]
    Atlas(anyhow::Error),
    #[error("{technique} is missing from the technique cache")]
    NotCached { technique: &'static str },
}

pub trait AsAny {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// What a render pass needs from any technique, regardless of how it was built.
pub trait TechniqueBinding: AsAny + fmt::Debug + Send + Sync {
    /// Bind the technique's pipeline and resources on `rpass`.
    fn apply<'a>(&'a self, render: &'a Render, rpass: &mut RenderPass<'a>) -> anyhow::Result<()>;
}

/// A technique that can be built for a font.
pub trait Technique: TechniqueBinding + Sized + 'static {
    /// Whatever construction needs besides the font, e.g. the gpu context.
    type Context;

    fn create(face: &FontFace, ctx: &mut Self::Context) -> Result<Self, TechniqueError>;
}

/// Single-instance-per-type technique storage for one font.
///
/// Entries are never evicted, so a reference handed out stays valid for as long as the cache is
/// borrowed, and repeated lookups of one type always yield the same instance.
#[derive(Default)]
pub struct TechniqueCache {
    index: HashMap<TypeId, usize>,
    techniques: Vec<Box<dyn TechniqueBinding>>,
}

impl TechniqueCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Technique>(&self) -> Option<&T> {
        self.index
            .get(&TypeId::of::<T>())
            .and_then(|idx| self.downcast(*idx))
    }

    /// Return the cached `T`, building it for `face` first if this is the first request.
    ///
    /// A failed build leaves the cache unchanged; the next request tries again.
    pub fn get_or_create<T: Technique>(
        &mut self,
        face: &FontFace,
        ctx: &mut T::Context,
    ) -> Result<&T, TechniqueError> {
        let name = std::any::type_name::<T>();
        if self.index.contains_key(&TypeId::of::<T>()) {
            log::debug!("reusing {} for font '{}'", name, face.name());
        } else {
            let technique = T::create(face, ctx)?;
            log::info!("built {} for font '{}'", name, face.name());
            self.index.insert(TypeId::of::<T>(), self.techniques.len());
            self.techniques.push(Box::new(technique));
        }
        self.get::<T>()
            .ok_or(TechniqueError::NotCached { technique: name })
    }

    fn downcast<T: Technique>(&self, idx: usize) -> Option<&T> {
        self.techniques
            .get(idx)
            .and_then(|technique| (**technique).as_any().downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.techniques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.techniques.is_empty()
    }

    /// Techniques in the order they were built.
    pub fn iter(&self) -> impl Iterator<Item = &dyn TechniqueBinding> {
        self.techniques.iter().map(|technique| technique.as_ref())
    }
}

impl fmt::Debug for TechniqueCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.techniques.iter()).finish()
    }
}
