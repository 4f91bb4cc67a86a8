use std::{io, path::PathBuf};

use atlas_asset::AssetError;

/// Failures while reading a font descriptor or assembling a [Font](super::font::Font).
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    #[error("'{}' not found (searched {searched:?})", path.display())]
    FileNotFound { path: PathBuf, searched: Vec<PathBuf> },
    #[error("failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("line {line}: {reason}")]
    Parse { line: usize, reason: String },
    #[error("descriptor declares {declared} glyphs but only {found} are present")]
    CountMismatch { declared: usize, found: usize },
    #[error("failed to load atlas image '{}': {source}", path.display())]
    AtlasLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("line {line}: glyph {character} lies outside the atlas")]
    GlyphOutOfBounds { character: u16, line: usize },
}

impl FontError {
    pub(crate) fn parse<S: Into<String>>(line: usize, reason: S) -> Self {
        Self::Parse {
            line,
            reason: reason.into(),
        }
    }
}

impl From<AssetError> for FontError {
    fn from(value: AssetError) -> Self {
        match value {
            AssetError::NotFound { path, searched } => Self::FileNotFound { path, searched },
            AssetError::Io { path, source } => Self::Io { path, source },
        }
    }
}
