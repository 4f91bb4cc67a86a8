//! Turns a string into positioned glyph quads.
//!
//! The cursor starts at the text position, on the baseline, and moves right by each glyph's
//! advance. Every unit is a multiple of the font pixel height, so a model transform scales the
//! result to any size.

use nalgebra::{vector, Point3, Vector2, Vector3};

use super::font::FontFace;

/// Largest number of quads whose vertices are still addressable by `u16` indices.
pub const MAX_QUADS: usize = (u16::MAX as usize + 1) / 4;

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 2, 3, 0];

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum LayoutError {
    #[error("{count} visible glyphs exceed the {max} a single mesh can index", max = MAX_QUADS)]
    TooManyGlyphs { count: usize },
}

/// A piece of text placed in the scene.
#[derive(Clone, Debug, PartialEq)]
pub struct Text {
    pub position: Point3<f32>,
    pub color: Vector3<f32>,
    pub text: String,
}

impl Text {
    pub fn new<S: Into<String>>(text: S, position: Point3<f32>, color: Vector3<f32>) -> Self {
        Self {
            position,
            color,
            text: text.into(),
        }
    }

    pub fn layout(&self, face: &FontFace) -> Result<TextMesh, LayoutError> {
        TextMesh::layout(face, self.position, self.color, &self.text)
    }
}

/// Vertex streams for a laid out string, ready to upload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextMesh {
    pub positions: Vec<[f32; 3]>,
    pub colors: Vec<[f32; 3]>,
    pub tex_coords: Vec<[f32; 2]>,
    pub indices: Vec<u16>,
}

impl TextMesh {
    pub fn layout(
        face: &FontFace,
        position: Point3<f32>,
        color: Vector3<f32>,
        text: &str,
    ) -> Result<Self, LayoutError> {
        let line_height = face.metrics().normalized_line_height;
        let mut mesh = Self::default();
        let mut cursor = vector![position.x, position.y];

        for character in text.chars() {
            if character == '\n' {
                cursor = vector![position.x, cursor.y - line_height];
                continue;
            }

            let Some(glyph) = face.glyphs().get_char(character) else {
                log::debug!("font '{}' has no glyph for {:?}", face.name(), character);
                continue;
            };

            if glyph.is_visible() {
                let min = cursor + glyph.offset;
                mesh.push_quad(
                    min,
                    min + glyph.size,
                    position.z,
                    glyph.uv_rect.min(),
                    glyph.uv_rect.max(),
                    color,
                );
            }
            cursor.x += glyph.x_advance;
        }

        let count = mesh.quad_count();
        if count > MAX_QUADS {
            return Err(LayoutError::TooManyGlyphs { count });
        }
        Ok(mesh)
    }

    fn push_quad(
        &mut self,
        min: Vector2<f32>,
        max: Vector2<f32>,
        z: f32,
        uv_min: Vector2<f32>,
        uv_max: Vector2<f32>,
        color: Vector3<f32>,
    ) {
        // indices past the u16 range are caught once layout finishes
        let base = self.positions.len() as u16;

        // counter-clockwise from the bottom left
        self.positions.extend([
            [min.x, min.y, z],
            [max.x, min.y, z],
            [max.x, max.y, z],
            [min.x, max.y, z],
        ]);
        self.tex_coords.extend([
            [uv_min.x, uv_min.y],
            [uv_max.x, uv_min.y],
            [uv_max.x, uv_max.y],
            [uv_min.x, uv_max.y],
        ]);
        self.colors.extend([[color.x, color.y, color.z]; 4]);
        self.indices
            .extend(QUAD_INDICES.iter().map(|idx| base.wrapping_add(*idx)));
    }

    pub fn quad_count(&self) -> usize {
        self.positions.len() / 4
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Min and max corners of the emitted quads, `None` when nothing is drawn.
    pub fn bounds(&self) -> Option<(Vector2<f32>, Vector2<f32>)> {
        let mut iter = self.positions.iter().map(|p| vector![p[0], p[1]]);
        let first = iter.next()?;
        Some(iter.fold((first, first), |(min, max), p| {
            (min.inf(&p), max.sup(&p))
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use nalgebra::point;

    use crate::{
        text::metrics::{CommonMetrics, FontDescriptor, GlyphRecord},
        texture::Texture,
    };

    fn glyph(character: u16, x: f32, width: f32, height: f32, x_advance: f32) -> GlyphRecord {
        GlyphRecord {
            character,
            x,
            y: 0.0,
            width,
            height,
            x_offset: 0.0,
            y_offset: 0.0,
            x_advance,
            line: 0,
        }
    }

    /// 8px font on a 64x64 atlas: base 6, line height 12.
    fn face() -> FontFace {
        let descriptor = FontDescriptor {
            face: "layout".into(),
            metrics: CommonMetrics {
                font_pixel_height: 8.0,
                line_height: 12.0,
                base: 6.0,
                scale_w: 64.0,
                scale_h: 64.0,
            },
            glyphs: vec![
                glyph(32, 0.0, 0.0, 0.0, 4.0),
                glyph(65, 0.0, 8.0, 8.0, 8.0),
                glyph(66, 8.0, 4.0, 8.0, 6.0),
            ],
        };
        let atlas = Texture {
            data: vec![0; 64 * 64 * 4],
            width: 64,
            height: 64,
        };
        FontFace::new("layout", Arc::new(atlas), &descriptor).unwrap()
    }

    fn white() -> Vector3<f32> {
        vector![1.0, 1.0, 1.0]
    }

    #[test]
    fn single_glyph_quad() {
        let mesh = TextMesh::layout(&face(), point![1.0, 2.0, 0.5], white(), "A").unwrap();

        // offset.y = 6/8 - 1 - 0
        assert_eq!(
            mesh.positions,
            vec![
                [1.0, 1.75, 0.5],
                [2.0, 1.75, 0.5],
                [2.0, 2.75, 0.5],
                [1.0, 2.75, 0.5],
            ]
        );
        assert_eq!(
            mesh.tex_coords,
            vec![[0.0, 0.875], [0.125, 0.875], [0.125, 1.0], [0.0, 1.0]]
        );
        assert_eq!(mesh.indices, vec![0, 1, 2, 2, 3, 0]);
        assert_eq!(mesh.colors, vec![[1.0; 3]; 4]);
        assert_eq!(mesh.index_count(), 6);
    }

    #[test]
    fn cursor_advances_and_skips_blank_glyphs() {
        let mesh = TextMesh::layout(&face(), point![0.0, 0.0, 0.0], white(), "A B").unwrap();

        assert_eq!(mesh.quad_count(), 2);
        // 'A' advances 1.0, space advances 0.5
        assert_eq!(mesh.positions[4][0], 1.5);
        assert_eq!(mesh.indices[6..], [4, 5, 6, 6, 7, 4]);
    }

    #[test]
    fn newline_returns_to_start_one_line_down() {
        let mesh = TextMesh::layout(&face(), point![3.0, 0.0, 0.0], white(), "AB\nA").unwrap();

        assert_eq!(mesh.quad_count(), 3);
        assert_eq!(mesh.positions[8], [3.0, -1.75, 0.0]);
    }

    #[test]
    fn missing_glyphs_are_skipped() {
        let mesh =
            TextMesh::layout(&face(), point![0.0, 0.0, 0.0], white(), "AzB\u{1F600}").unwrap();

        assert_eq!(mesh.quad_count(), 2);
        // no advance for the missing 'z'
        assert_eq!(mesh.positions[4][0], 1.0);
    }

    #[test]
    fn empty_text_has_no_bounds() {
        let mesh = TextMesh::layout(&face(), point![0.0, 0.0, 0.0], white(), "  \n ").unwrap();
        assert!(mesh.is_empty());
        assert_eq!(mesh.bounds(), None);
    }

    #[test]
    fn bounds_cover_all_quads() {
        let text = Text::new("AB\nA", point![0.0, 0.0, 0.0], white());
        let mesh = text.layout(&face()).unwrap();

        assert_eq!(
            mesh.bounds(),
            Some((vector![0.0, -1.75], vector![1.5, 0.75]))
        );
    }

    #[test]
    fn too_many_glyphs() {
        let text = "A".repeat(MAX_QUADS + 1);
        let result = TextMesh::layout(&face(), point![0.0, 0.0, 0.0], white(), &text);
        assert_eq!(
            result,
            Err(LayoutError::TooManyGlyphs {
                count: MAX_QUADS + 1
            })
        );

        let text = "A".repeat(MAX_QUADS);
        let mesh = TextMesh::layout(&face(), point![0.0, 0.0, 0.0], white(), &text).unwrap();
        assert_eq!(*mesh.indices.iter().max().unwrap(), u16::MAX);
    }
}
