pub mod bind;
pub mod camera;
pub mod pipeline;
pub mod plain;
pub mod render;
pub mod shader;
pub mod text;
pub mod texture;

pub use atlas_asset::{SearchPaths, DEFAULT_ENV_VAR};
