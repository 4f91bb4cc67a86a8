use std::{collections::HashMap, fmt};

use atlas_asset::{AssetError, Loader};
use wgpu::{Device, ShaderModule, ShaderModuleDescriptor};

/// Logical name of the text vertex stage.
pub const TEXT_VERTEX: &str = "text.vert";
/// Logical name of the text fragment stage.
pub const TEXT_FRAGMENT: &str = "text.frag";

const BUILTIN: [(&str, &str); 2] = [
    (TEXT_VERTEX, include_str!("../shaders/text.vert.wgsl")),
    (TEXT_FRAGMENT, include_str!("../shaders/text.frag.wgsl")),
];

#[derive(thiserror::Error, Debug)]
pub enum ShaderError {
    #[error("shader stage '{name}' is not available")]
    Unavailable { name: String },
    #[error("failed to load shader stage '{name}': {source}")]
    Load {
        name: String,
        #[source]
        source: AssetError,
    },
    #[error("shader stage '{name}' failed to compile: {message}")]
    Compile { name: String, message: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StageKind {
    Vertex,
    Fragment,
}

impl StageKind {
    /// WGSL entry point every stage of this kind must export.
    pub fn entry_point(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Fragment => "fragment",
        }
    }
}

/// A compiled shader module for one pipeline stage.
pub struct ShaderStage {
    pub name: String,
    pub kind: StageKind,
    pub module: ShaderModule,
}

impl ShaderStage {
    pub fn entry_point(&self) -> &'static str {
        self.kind.entry_point()
    }

    /// Compile `source` on `device`, reporting WGSL validation failures as errors.
    pub fn compile(
        device: &Device,
        name: &str,
        kind: StageKind,
        source: &str,
    ) -> Result<Self, ShaderError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(source.into()),
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(ShaderError::Compile {
                name: name.to_string(),
                message: err.to_string(),
            });
        }

        log::debug!("compiled {:?} stage '{}'", kind, name);
        Ok(Self {
            name: name.to_string(),
            kind,
            module,
        })
    }
}

impl fmt::Debug for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderStage")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// WGSL sources addressed by logical stage name.
#[derive(Clone, Debug, Default)]
pub struct ShaderLibrary {
    sources: HashMap<String, String>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// A library holding the stages shipped with this crate.
    pub fn builtin() -> Self {
        let mut library = Self::new();
        for (name, source) in BUILTIN {
            library.register(name, source);
        }
        library
    }

    /// Add or replace the source for `name`.
    pub fn register<N: Into<String>, S: Into<String>>(&mut self, name: N, source: S) {
        self.sources.insert(name.into(), source.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.sources.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Relative path a stage is looked up at: `shaders/<name>.wgsl`.
    pub fn stage_path(name: &str) -> String {
        format!("shaders/{}.wgsl", name)
    }

    /// Load `name` from the loader's search paths, replacing any registered source.
    pub fn load(&mut self, loader: &mut Loader, name: &str) -> Result<(), ShaderError> {
        let load_err = |source| ShaderError::Load {
            name: name.to_string(),
            source,
        };
        let asset = loader.load(Self::stage_path(name)).map_err(load_err)?;
        let source = asset.text().map_err(load_err)?;
        log::debug!("loaded shader stage '{}' from {:?}", name, asset.path);
        self.register(name, source);
        Ok(())
    }

    /// Load each of `names` that exists on the search paths. Missing files are skipped so that
    /// sources registered earlier stay in place; read failures are still errors.
    pub fn load_available(&mut self, loader: &mut Loader, names: &[&str]) -> Result<(), ShaderError> {
        for name in names {
            match self.load(loader, name) {
                Err(ShaderError::Load {
                    source: AssetError::NotFound { .. },
                    ..
                }) => log::debug!("no shader file for '{}' on search paths", name),
                other => other?,
            }
        }
        Ok(())
    }

    /// Compile the source registered under `name`.
    pub fn compile(
        &self,
        device: &Device,
        name: &str,
        kind: StageKind,
    ) -> Result<ShaderStage, ShaderError> {
        let source = self.get(name).ok_or_else(|| ShaderError::Unavailable {
            name: name.to_string(),
        })?;
        ShaderStage::compile(device, name, kind, source)
    }
}
