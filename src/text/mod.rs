//! Bitmap font text.
//!
//! A [Font] is loaded from a BMFont style text descriptor plus its atlas image. Its glyphs are
//! normalized to units of the font pixel height when loaded. Rendering techniques such as
//! [StandardTechnique] are built per font on first use and cached on it.

pub mod draw;
pub mod error;
pub mod font;
pub mod glyph;
pub mod layout;
pub mod metrics;
pub mod standard;
pub mod technique;

pub use draw::TextDraw;
pub use error::FontError;
pub use font::{Font, FontFace, FontLoadOptions, FontMetrics};
pub use glyph::{GlyphData, GlyphMap, UvRect};
pub use layout::{LayoutError, Text, TextMesh};
pub use metrics::{CommonMetrics, FontDescriptor, GlyphRecord};
pub use standard::StandardTechnique;
pub use technique::{Technique, TechniqueBinding, TechniqueCache, TechniqueError};
