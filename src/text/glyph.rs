use std::collections::{btree_map, BTreeMap};

use nalgebra::{vector, Vector2, Vector4};

use super::{
    error::FontError,
    metrics::{CommonMetrics, FontDescriptor, GlyphRecord},
};

/// Slack allowed when checking that a glyph's uv rectangle lies inside the atlas.
pub const UV_EPSILON: f32 = 1e-5;

/// A glyph's location in the atlas, in [0, 1] texture space with a bottom-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UvRect {
    pub origin: Vector2<f32>,
    pub size: Vector2<f32>,
}

impl UvRect {
    pub fn min(&self) -> Vector2<f32> {
        self.origin
    }

    pub fn max(&self) -> Vector2<f32> {
        self.origin + self.size
    }

    /// `(origin.x, origin.y, size.x, size.y)`
    pub fn as_vec4(&self) -> Vector4<f32> {
        Vector4::new(self.origin.x, self.origin.y, self.size.x, self.size.y)
    }
}

/// Resolution independent glyph data. Sizes and offsets are in units of the font pixel height.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphData {
    pub character: u16,
    pub uv_rect: UvRect,
    pub size: Vector2<f32>,
    /// Bottom-left corner of the glyph box relative to the cursor on the baseline.
    pub offset: Vector2<f32>,
    pub x_advance: f32,
    /// Reserved for multi-atlas addressing, always 0 for a single atlas.
    pub lookup_offset: f32,
}

impl GlyphData {
    /// Convert a pixel space record. No clamping is done; see [GlyphData::is_within_atlas].
    pub fn normalize(record: &GlyphRecord, metrics: &CommonMetrics) -> Self {
        let CommonMetrics {
            font_pixel_height: f,
            scale_w: w,
            scale_h: h,
            ..
        } = *metrics;

        // descriptor rows count down from the top, uv space counts up from the bottom
        let y = h - (record.y + record.height);
        let size = vector![record.width / f, record.height / f];

        Self {
            character: record.character,
            uv_rect: UvRect {
                origin: vector![record.x / w, y / h],
                size: vector![record.width / w, record.height / h],
            },
            size,
            offset: vector![
                record.x_offset / f,
                metrics.normalized_base_line() - size.y - record.y_offset / f
            ],
            x_advance: record.x_advance / f,
            lookup_offset: 0.0,
        }
    }

    pub fn is_within_atlas(&self) -> bool {
        let (min, max) = (self.uv_rect.min(), self.uv_rect.max());
        self.size.x >= 0.0
            && self.size.y >= 0.0
            && min.x >= -UV_EPSILON
            && min.y >= -UV_EPSILON
            && max.x <= 1.0 + UV_EPSILON
            && max.y <= 1.0 + UV_EPSILON
    }

    /// Whether the glyph has any visible area. Whitespace glyphs only advance the cursor.
    pub fn is_visible(&self) -> bool {
        self.size.x > 0.0 && self.size.y > 0.0
    }
}

/// Glyphs keyed by character code, iterated in ascending code order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GlyphMap {
    glyphs: BTreeMap<u16, GlyphData>,
}

impl GlyphMap {
    /// Normalize every record of `descriptor`, rejecting glyphs that fall outside the atlas.
    pub fn from_descriptor(descriptor: &FontDescriptor) -> Result<Self, FontError> {
        let mut glyphs = BTreeMap::new();
        for record in &descriptor.glyphs {
            let glyph = GlyphData::normalize(record, &descriptor.metrics);
            if !glyph.is_within_atlas() {
                return Err(FontError::GlyphOutOfBounds {
                    character: record.character,
                    line: record.line,
                });
            }
            glyphs.insert(glyph.character, glyph);
        }
        Ok(Self { glyphs })
    }

    pub fn get(&self, character: u16) -> Option<&GlyphData> {
        self.glyphs.get(&character)
    }

    /// Look up a `char`. Characters outside the 16 bit range never have a glyph.
    pub fn get_char(&self, character: char) -> Option<&GlyphData> {
        u16::try_from(u32::from(character))
            .ok()
            .and_then(|code| self.get(code))
    }

    pub fn contains(&self, character: u16) -> bool {
        self.glyphs.contains_key(&character)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, u16, GlyphData> {
        self.glyphs.values()
    }

    pub fn codes(&self) -> impl Iterator<Item = u16> + '_ {
        self.glyphs.keys().copied()
    }
}

impl<'a> IntoIterator for &'a GlyphMap {
    type Item = &'a GlyphData;
    type IntoIter = btree_map::Values<'a, u16, GlyphData>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn worked_metrics() -> CommonMetrics {
        CommonMetrics {
            font_pixel_height: 64.0,
            line_height: 76.0,
            base: 52.0,
            scale_w: 256.0,
            scale_h: 256.0,
        }
    }

    fn record(character: u16, x: f32, y: f32, width: f32, height: f32) -> GlyphRecord {
        GlyphRecord {
            character,
            x,
            y,
            width,
            height,
            x_offset: 2.0,
            y_offset: 5.0,
            x_advance: 35.0,
            line: 5,
        }
    }

    #[test]
    fn normalizes_worked_example() {
        let glyph = GlyphData::normalize(&record(65, 10.0, 20.0, 30.0, 40.0), &worked_metrics());

        assert_eq!(glyph.character, 65);
        assert_eq!(glyph.uv_rect.origin, vector![0.0390625, 0.765625]);
        assert_eq!(glyph.uv_rect.size, vector![0.1171875, 0.15625]);
        assert_eq!(glyph.size, vector![0.46875, 0.625]);
        assert_eq!(glyph.offset, vector![0.03125, 0.109375]);
        assert_eq!(glyph.x_advance, 0.546875);
        assert_eq!(glyph.lookup_offset, 0.0);
        assert_eq!(
            glyph.uv_rect.as_vec4(),
            Vector4::new(0.0390625, 0.765625, 0.1171875, 0.15625)
        );
        assert!(glyph.is_within_atlas());
        assert!(glyph.is_visible());
    }

    #[test]
    fn glyph_touching_atlas_edges_is_in_bounds() {
        let glyph = GlyphData::normalize(&record(1, 0.0, 0.0, 256.0, 256.0), &worked_metrics());
        assert_eq!(glyph.uv_rect.min(), vector![0.0, 0.0]);
        assert_eq!(glyph.uv_rect.max(), vector![1.0, 1.0]);
        assert!(glyph.is_within_atlas());
    }

    #[test]
    fn glyph_past_atlas_edge_is_out_of_bounds() {
        let right = GlyphData::normalize(&record(1, 250.0, 0.0, 10.0, 10.0), &worked_metrics());
        assert!(!right.is_within_atlas());

        // y past the bottom of the image flips to a negative uv origin
        let bottom = GlyphData::normalize(&record(2, 0.0, 250.0, 10.0, 10.0), &worked_metrics());
        assert!(bottom.uv_rect.origin.y < 0.0);
        assert!(!bottom.is_within_atlas());
    }

    #[test]
    fn whitespace_is_not_visible() {
        let space = GlyphData::normalize(&record(32, 0.0, 0.0, 0.0, 0.0), &worked_metrics());
        assert!(!space.is_visible());
        assert!(space.is_within_atlas());
        assert_eq!(space.x_advance, 35.0 / 64.0);
    }

    #[test]
    fn map_iterates_in_code_order() {
        let descriptor = FontDescriptor {
            face: "x".into(),
            metrics: worked_metrics(),
            glyphs: vec![
                record(90, 0.0, 0.0, 8.0, 8.0),
                record(65, 8.0, 0.0, 8.0, 8.0),
                record(77, 16.0, 0.0, 8.0, 8.0),
            ],
        };
        let map = GlyphMap::from_descriptor(&descriptor).unwrap();

        assert_eq!(map.len(), descriptor.glyphs.len());
        assert_eq!(map.codes().collect::<Vec<_>>(), vec![65, 77, 90]);
        assert_eq!(
            map.iter().map(|g| g.character).collect::<Vec<_>>(),
            vec![65, 77, 90]
        );
        assert!(map.get_char('M').is_some());
        assert!(map.get_char('B').is_none());
        assert!(map.get_char('\u{1F600}').is_none());
    }

    #[test]
    fn map_rejects_out_of_bounds_glyphs() {
        let mut bad = record(66, 300.0, 0.0, 8.0, 8.0);
        bad.line = 9;
        let descriptor = FontDescriptor {
            face: "x".into(),
            metrics: worked_metrics(),
            glyphs: vec![record(65, 0.0, 0.0, 8.0, 8.0), bad],
        };

        match GlyphMap::from_descriptor(&descriptor) {
            Err(FontError::GlyphOutOfBounds { character, line }) => {
                assert_eq!((character, line), (66, 9));
            }
            other => panic!("expected GlyphOutOfBounds, got {:?}", other),
        }
    }
}
