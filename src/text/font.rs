use std::{path::PathBuf, sync::Arc};

use atlas_asset::{Asset, AssetError, Loader, SearchPaths};

use super::{
    error::FontError,
    glyph::{GlyphData, GlyphMap},
    metrics::FontDescriptor,
    technique::{Technique, TechniqueBinding, TechniqueCache, TechniqueError},
};
use crate::texture::Texture;

/// Where a font's files live relative to the search paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontLoadOptions {
    pub subdirectory: PathBuf,
    /// Atlas image extensions to try, in order.
    pub image_extensions: Vec<String>,
}

impl Default for FontLoadOptions {
    fn default() -> Self {
        Self {
            subdirectory: PathBuf::from("fonts"),
            image_extensions: ["png", "tga", "bmp", "jpg"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl FontLoadOptions {
    pub fn descriptor_path(&self, name: &str) -> PathBuf {
        self.subdirectory.join(format!("{}.txt", name))
    }

    pub fn image_paths(&self, name: &str) -> Vec<PathBuf> {
        self.image_extensions
            .iter()
            .map(|ext| self.subdirectory.join(format!("{}.{}", name, ext)))
            .collect()
    }
}

/// Font-wide values, normalized where they feed layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    pub pixel_height: f32,
    pub normalized_line_height: f32,
    pub normalized_base_line: f32,
    pub atlas_width: u32,
    pub atlas_height: u32,
}

/// The immutable part of a [Font]: atlas, glyphs and metrics. This is what techniques are
/// built from, and it can be shared freely between readers.
#[derive(Debug)]
pub struct FontFace {
    name: String,
    atlas: Arc<Texture>,
    glyphs: GlyphMap,
    metrics: FontMetrics,
}

impl FontFace {
    pub fn new(
        name: &str,
        atlas: Arc<Texture>,
        descriptor: &FontDescriptor,
    ) -> Result<Self, FontError> {
        let glyphs = GlyphMap::from_descriptor(descriptor)?;
        let common = descriptor.metrics;

        if (atlas.width() as f32, atlas.height() as f32) != (common.scale_w, common.scale_h) {
            log::warn!(
                "atlas for font '{}' is {}x{} but its descriptor says {}x{}",
                name,
                atlas.width(),
                atlas.height(),
                common.scale_w,
                common.scale_h
            );
        }

        Ok(Self {
            name: name.to_string(),
            metrics: FontMetrics {
                pixel_height: common.font_pixel_height,
                normalized_line_height: common.normalized_line_height(),
                normalized_base_line: common.normalized_base_line(),
                atlas_width: atlas.width(),
                atlas_height: atlas.height(),
            },
            atlas,
            glyphs,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn atlas(&self) -> &Arc<Texture> {
        &self.atlas
    }

    pub fn glyphs(&self) -> &GlyphMap {
        &self.glyphs
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }
}

/// A bitmap font: a glyph atlas, its normalized glyph map, and the techniques built to draw it.
///
/// Everything but the technique cache is fixed at load time.
#[derive(Debug)]
pub struct Font {
    face: FontFace,
    techniques: TechniqueCache,
}

impl Font {
    /// Load `fonts/<name>.txt` and its atlas image from the first search path containing each.
    pub fn load(name: &str, search_paths: &SearchPaths) -> Result<Self, FontError> {
        let mut loader = Loader::new(search_paths.clone());
        Self::load_with(name, &mut loader, &FontLoadOptions::default())
    }

    pub fn load_with(
        name: &str,
        loader: &mut Loader,
        options: &FontLoadOptions,
    ) -> Result<Self, FontError> {
        let descriptor = loader.load(options.descriptor_path(name))?;
        let image = load_image(loader, &options.image_paths(name))?;
        log::debug!(
            "font '{}': descriptor {:?}, atlas {:?}",
            name,
            descriptor.path,
            image.path
        );

        let descriptor = descriptor.text()?.parse::<FontDescriptor>()?;
        let atlas = Texture::from_bytes(&image.bytes, &image.path).map_err(|source| {
            FontError::AtlasLoad {
                path: image.path.clone(),
                source,
            }
        })?;

        let font = Self::from_parts(name, Arc::new(atlas), &descriptor)?;
        log::info!(
            "loaded font '{}' ({}): {} glyphs at {}px",
            name,
            descriptor.face,
            font.glyphs().len(),
            font.metrics().pixel_height
        );
        Ok(font)
    }

    /// Assemble a font from an already decoded atlas and parsed descriptor.
    pub fn from_parts(
        name: &str,
        atlas: Arc<Texture>,
        descriptor: &FontDescriptor,
    ) -> Result<Self, FontError> {
        Ok(Self {
            face: FontFace::new(name, atlas, descriptor)?,
            techniques: TechniqueCache::new(),
        })
    }

    pub fn name(&self) -> &str {
        self.face.name()
    }

    pub fn face(&self) -> &FontFace {
        &self.face
    }

    pub fn atlas(&self) -> &Arc<Texture> {
        self.face.atlas()
    }

    pub fn glyphs(&self) -> &GlyphMap {
        self.face.glyphs()
    }

    pub fn glyph(&self, character: u16) -> Option<&GlyphData> {
        self.face.glyphs().get(character)
    }

    pub fn glyph_for_char(&self, character: char) -> Option<&GlyphData> {
        self.face.glyphs().get_char(character)
    }

    pub fn metrics(&self) -> FontMetrics {
        self.face.metrics()
    }

    /// Get this font's `T`, building it on first request.
    pub fn technique<T: Technique>(&mut self, ctx: &mut T::Context) -> Result<&T, TechniqueError> {
        self.techniques.get_or_create::<T>(&self.face, ctx)
    }

    /// Get this font's `T` only if it has already been built.
    pub fn existing_technique<T: Technique>(&self) -> Option<&T> {
        self.techniques.get::<T>()
    }

    pub fn techniques(&self) -> impl Iterator<Item = &dyn TechniqueBinding> {
        self.techniques.iter()
    }
}

/// Load the first atlas candidate present on the search paths.
fn load_image(loader: &mut Loader, candidates: &[PathBuf]) -> Result<Asset, FontError> {
    let mut searched = Vec::new();
    for candidate in candidates {
        match loader.load(candidate) {
            Ok(asset) => return Ok(asset),
            Err(AssetError::NotFound { searched: s, .. }) => searched.extend(s),
            Err(err) => return Err(err.into()),
        }
    }
    Err(FontError::FileNotFound {
        path: candidates.first().cloned().unwrap_or_default(),
        searched,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{fs, path::Path};

    use image::{Rgba, RgbaImage};

    use crate::text::technique::tests::{Counter, Outline, Shadow};

    const DESCRIPTOR: &str = "\
info face=\"Fixture\" size=16 bold=0
common lineHeight=20 base=13 scaleW=32 scaleH=32 pages=1 packed=0
page id=0 file=\"fixture.png\"
chars count=3
char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=13 xadvance=4 page=0 chnl=15
char id=65 x=0 y=0 width=8 height=12 xoffset=1 yoffset=1 xadvance=9 page=0 chnl=15
char id=66 x=8 y=0 width=8 height=12 xoffset=1 yoffset=1 xadvance=9 page=0 chnl=15
";

    fn write_font(dir: &Path, name: &str, descriptor: &str) {
        let fonts = dir.join("fonts");
        fs::create_dir_all(&fonts).unwrap();
        fs::write(fonts.join(format!("{}.txt", name)), descriptor).unwrap();
        let mut atlas = RgbaImage::new(32, 32);
        atlas.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
        atlas.save(fonts.join(format!("{}.png", name))).unwrap();
    }

    #[test_log::test]
    fn loads_from_search_paths() {
        let dir = tempfile::tempdir().unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);

        let font = Font::load("fixture", &SearchPaths::from_iter([dir.path()])).unwrap();

        assert_eq!(font.name(), "fixture");
        assert_eq!(font.glyphs().len(), 3);
        assert_eq!(font.glyphs().codes().collect::<Vec<_>>(), vec![32, 65, 66]);
        assert_eq!(
            font.metrics(),
            FontMetrics {
                pixel_height: 16.0,
                normalized_line_height: 1.25,
                normalized_base_line: 0.8125,
                atlas_width: 32,
                atlas_height: 32,
            }
        );
        assert_eq!(font.glyph_for_char('A').unwrap().x_advance, 9.0 / 16.0);
        assert_eq!(font.atlas().width(), 32);
        for glyph in font.glyphs() {
            assert!(glyph.is_within_atlas());
            assert_eq!(glyph.lookup_offset, 0.0);
        }
    }

    #[test]
    fn loads_from_relative_search_path() {
        let dir = tempfile::tempdir_in(".").unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);
        let cwd = std::env::current_dir().unwrap();
        let relative = dir.path().strip_prefix(&cwd).unwrap_or(dir.path());
        assert!(relative.is_relative());

        let mut loader = Loader::new(SearchPaths::from_iter([relative]));
        let font = Font::load_with("fixture", &mut loader, &FontLoadOptions::default()).unwrap();
        assert_eq!(font.glyphs().len(), 3);
        assert!(loader.is_cached(relative.join("fonts/fixture.txt")));
        assert!(loader.is_cached(relative.join("fonts/fixture.png")));
    }

    #[test]
    fn first_search_path_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        write_font(first.path(), "fixture", DESCRIPTOR);
        write_font(
            second.path(),
            "fixture",
            &DESCRIPTOR.replace("chars count=3", "chars count=1"),
        );

        let paths = SearchPaths::from_iter([second.path(), first.path()]);
        assert_eq!(Font::load("fixture", &paths).unwrap().glyphs().len(), 1);
    }

    #[test]
    fn missing_descriptor_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let result = Font::load("absent", &SearchPaths::from_iter([dir.path()]));
        match result {
            Err(FontError::FileNotFound { path, searched }) => {
                assert_eq!(path, PathBuf::from("fonts/absent.txt"));
                assert_eq!(searched, vec![dir.path().join("fonts/absent.txt")]);
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn missing_atlas_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);
        fs::remove_file(dir.path().join("fonts/fixture.png")).unwrap();

        match Font::load("fixture", &SearchPaths::from_iter([dir.path()])) {
            Err(FontError::FileNotFound { path, searched }) => {
                assert_eq!(path, PathBuf::from("fonts/fixture.png"));
                assert_eq!(searched.len(), FontLoadOptions::default().image_extensions.len());
            }
            other => panic!("expected FileNotFound, got {:?}", other),
        }
    }

    #[test]
    fn undecodable_atlas_is_atlas_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);
        fs::write(dir.path().join("fonts/fixture.png"), b"definitely not a png").unwrap();

        let result = Font::load("fixture", &SearchPaths::from_iter([dir.path()]));
        assert!(matches!(result, Err(FontError::AtlasLoad { .. })));
    }

    #[test]
    fn parse_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        write_font(
            dir.path(),
            "fixture",
            &DESCRIPTOR.replace("chars count=3", "chars count=4"),
        );

        let result = Font::load("fixture", &SearchPaths::from_iter([dir.path()]));
        assert!(matches!(
            result,
            Err(FontError::CountMismatch {
                declared: 4,
                found: 3
            })
        ));
    }

    #[test]
    fn custom_subdirectory_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);
        fs::rename(dir.path().join("fonts"), dir.path().join("typefaces")).unwrap();

        let options = FontLoadOptions {
            subdirectory: PathBuf::from("typefaces"),
            image_extensions: vec!["bmp".into(), "png".into()],
        };
        let mut loader = Loader::new(SearchPaths::from_iter([dir.path()]));
        let font = Font::load_with("fixture", &mut loader, &options).unwrap();
        assert_eq!(font.glyphs().len(), 3);
    }

    #[test]
    fn techniques_are_cached_per_font() {
        let dir = tempfile::tempdir().unwrap();
        write_font(dir.path(), "fixture", DESCRIPTOR);
        let paths = SearchPaths::from_iter([dir.path()]);
        let mut first = Font::load("fixture", &paths).unwrap();
        let mut second = Font::load("fixture", &paths).unwrap();
        let mut ctx = Counter::default();

        assert!(first.existing_technique::<Outline>().is_none());
        let a = first.technique::<Outline>(&mut ctx).unwrap() as *const Outline;
        let b = first.technique::<Outline>(&mut ctx).unwrap() as *const Outline;
        assert_eq!(a, b);
        assert_eq!(first.technique::<Outline>(&mut ctx).unwrap().pixel_height, 16.0);

        // another font instance builds its own
        let c = second.technique::<Outline>(&mut ctx).unwrap() as *const Outline;
        assert_ne!(a, c);

        first.technique::<Shadow>(&mut ctx).unwrap();
        assert_eq!(ctx.built, 3);
        assert_eq!(first.techniques().count(), 2);
        assert!(first.existing_technique::<Outline>().is_some());
        assert!(first.existing_technique::<Shadow>().is_some());
    }

    #[test_log::test]
    fn atlas_size_mismatch_still_loads() {
        let descriptor: FontDescriptor = DESCRIPTOR.parse().unwrap();
        let atlas = Texture {
            data: vec![0; 64 * 48 * 4],
            width: 64,
            height: 48,
        };

        let face = FontFace::new("fixture", Arc::new(atlas), &descriptor).unwrap();
        assert_eq!(
            (face.metrics().atlas_width, face.metrics().atlas_height),
            (64, 48)
        );
        // uvs still follow scaleW/scaleH
        let glyph = face.glyphs().get_char('B').unwrap();
        assert_eq!(glyph.uv_rect.min().x, 0.25);
    }

    #[test]
    fn font_face_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FontFace>();
        assert_send_sync::<Font>();
    }
}
