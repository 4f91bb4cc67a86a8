//! File resolution for text assets.
//!
//! Assets (font descriptors, atlas images, shader sources) are addressed by a path relative to
//! one of an ordered list of search directories. The first directory containing the file wins.

pub mod loader;
pub mod search;

pub use loader::{Asset, AssetError, Loader};
pub use search::{SearchPaths, DEFAULT_ENV_VAR};
