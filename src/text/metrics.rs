//! Reader for the line-oriented bitmap font descriptor that accompanies a glyph atlas.
//!
//! ```text
//! info face="Roboto" size=64 bold=0 ...
//! common lineHeight=76 base=60 scaleW=512 scaleH=512 pages=1 ...
//! page id=0 file="roboto.png"
//! chars count=95
//! char id=32 x=0 y=0 width=0 height=0 xoffset=0 yoffset=60 xadvance=16 ...
//! ...
//! ```
//!
//! Fields sit at fixed positions on each line. Every position this reader relies on is checked
//! for presence and key name, so a short or reordered line is reported rather than misread.

use std::{
    collections::HashMap,
    fs::File,
    io::{self, BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use super::error::FontError;

/// Font-wide values from the `info` and `common` lines, in pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CommonMetrics {
    /// Nominal size the atlas was rendered at; divisor for every normalized glyph metric.
    pub font_pixel_height: f32,
    pub line_height: f32,
    /// Distance from the top of a line to the baseline.
    pub base: f32,
    pub scale_w: f32,
    pub scale_h: f32,
}

impl CommonMetrics {
    pub fn normalized_line_height(&self) -> f32 {
        self.line_height / self.font_pixel_height
    }

    pub fn normalized_base_line(&self) -> f32 {
        self.base / self.font_pixel_height
    }
}

/// One `char` line, in pixel space. `y` is measured from the top edge of the atlas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GlyphRecord {
    pub character: u16,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub x_advance: f32,
    /// 1-based line in the descriptor this record came from.
    pub line: usize,
}

/// A parsed descriptor: face name, font-wide metrics and raw glyph records in file order.
#[derive(Clone, Debug, PartialEq)]
pub struct FontDescriptor {
    pub face: String,
    pub metrics: CommonMetrics,
    pub glyphs: Vec<GlyphRecord>,
}

impl FontDescriptor {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, FontError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => FontError::FileNotFound {
                path: path.to_path_buf(),
                searched: vec![path.to_path_buf()],
            },
            _ => FontError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        log::debug!("reading font descriptor {:?}", path);

        Self::from_reader(BufReader::new(file)).map_err(|err| match err {
            FontError::Io { source, .. } => FontError::Io {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, FontError> {
        let mut lines = Lines::new(reader.lines());

        let (number, info) = lines.header("info")?;
        let tokens = tokenize(&info);
        expect_tag(&tokens, "info", number)?;
        let face = value(&tokens, 1, "face", number)?.trim_matches('"').to_string();
        let font_pixel_height: f32 = number_value(&tokens, 2, "size", number)?;
        if font_pixel_height <= 0.0 {
            return Err(FontError::parse(number, "font size must be positive"));
        }

        let (number, common) = lines.header("common")?;
        let tokens = tokenize(&common);
        expect_tag(&tokens, "common", number)?;
        let line_height = number_value(&tokens, 1, "lineHeight", number)?;
        let base = number_value(&tokens, 2, "base", number)?;
        let scale_w: f32 = number_value(&tokens, 3, "scaleW", number)?;
        let scale_h: f32 = number_value(&tokens, 4, "scaleH", number)?;
        if scale_w <= 0.0 || scale_h <= 0.0 {
            return Err(FontError::parse(number, "atlas dimensions must be positive"));
        }

        // single page atlas, only the tag is checked
        let (number, page) = lines.header("page")?;
        expect_tag(&tokenize(&page), "page", number)?;

        let (number, chars) = lines.header("chars")?;
        let tokens = tokenize(&chars);
        expect_tag(&tokens, "chars", number)?;
        let count: usize = number_value(&tokens, 1, "count", number)?;

        // ids are unique u16s, so a larger count can never be satisfied
        let capacity = count.min(usize::from(u16::MAX) + 1);
        let mut glyphs: Vec<GlyphRecord> = Vec::with_capacity(capacity);
        let mut seen: HashMap<u16, usize> = HashMap::with_capacity(capacity);
        for found in 0..count {
            let (number, line) = lines.next()?.ok_or(FontError::CountMismatch {
                declared: count,
                found,
            })?;
            let record = parse_glyph(&line, number)?;
            if let Some(previous) = seen.insert(record.character, number) {
                return Err(FontError::parse(
                    number,
                    format!(
                        "duplicate glyph id {} (first defined on line {})",
                        record.character, previous
                    ),
                ));
            }
            glyphs.push(record);
        }

        Ok(Self {
            face,
            metrics: CommonMetrics {
                font_pixel_height,
                line_height,
                base,
                scale_w,
                scale_h,
            },
            glyphs,
        })
    }

    pub fn font_pixel_height(&self) -> f32 {
        self.metrics.font_pixel_height
    }

    pub fn normalized_line_height(&self) -> f32 {
        self.metrics.normalized_line_height()
    }
}

impl FromStr for FontDescriptor {
    type Err = FontError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_reader(s.as_bytes())
    }
}

fn parse_glyph(line: &str, number: usize) -> Result<GlyphRecord, FontError> {
    let tokens = tokenize(line);
    expect_tag(&tokens, "char", number)?;

    let character = value(&tokens, 1, "id", number)?
        .parse::<u16>()
        .map_err(|_| FontError::parse(number, "glyph id must be in 0..=65535"))?;
    let record = GlyphRecord {
        character,
        x: number_value(&tokens, 2, "x", number)?,
        y: number_value(&tokens, 3, "y", number)?,
        width: number_value(&tokens, 4, "width", number)?,
        height: number_value(&tokens, 5, "height", number)?,
        x_offset: number_value(&tokens, 6, "xoffset", number)?,
        y_offset: number_value(&tokens, 7, "yoffset", number)?,
        x_advance: number_value(&tokens, 8, "xadvance", number)?,
        line: number,
    };
    if record.width < 0.0 || record.height < 0.0 {
        return Err(FontError::parse(number, "glyph size must not be negative"));
    }
    Ok(record)
}

/// Numbered line source. Blank lines are skipped and never counted as data.
struct Lines<I> {
    inner: I,
    number: usize,
}

impl<I: Iterator<Item = io::Result<String>>> Lines<I> {
    fn new(inner: I) -> Self {
        Self { inner, number: 0 }
    }

    fn next(&mut self) -> Result<Option<(usize, String)>, FontError> {
        for line in self.inner.by_ref() {
            self.number += 1;
            let line = line.map_err(|source| FontError::Io {
                path: Default::default(),
                source,
            })?;
            if !line.trim().is_empty() {
                return Ok(Some((self.number, line)));
            }
        }
        Ok(None)
    }

    fn header(&mut self, tag: &str) -> Result<(usize, String), FontError> {
        self.next()?
            .ok_or_else(|| FontError::parse(self.number + 1, format!("missing '{}' line", tag)))
    }
}

/// Split on runs of whitespace, keeping double-quoted spans (`face="Open Sans"`) in one token.
fn tokenize(line: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = None;
    let mut quoted = false;

    for (idx, c) in line.char_indices() {
        match (start, c) {
            (_, '"') => {
                quoted = !quoted;
                start.get_or_insert(idx);
            }
            (Some(s), c) if c.is_whitespace() && !quoted => {
                tokens.push(&line[s..idx]);
                start = None;
            }
            (None, c) if !c.is_whitespace() => start = Some(idx),
            _ => {}
        }
    }
    if let Some(s) = start {
        tokens.push(&line[s..]);
    }
    tokens
}

fn expect_tag(tokens: &[&str], tag: &str, line: usize) -> Result<(), FontError> {
    match tokens.first() {
        Some(found) if *found == tag => Ok(()),
        Some(found) => Err(FontError::parse(
            line,
            format!("expected a '{}' line, found '{}'", tag, found),
        )),
        None => Err(FontError::parse(line, format!("expected a '{}' line", tag))),
    }
}

fn value<'a>(tokens: &[&'a str], index: usize, key: &str, line: usize) -> Result<&'a str, FontError> {
    let token = tokens.get(index).ok_or_else(|| {
        FontError::parse(
            line,
            format!("expected '{}=' at position {}, line has {} fields", key, index, tokens.len()),
        )
    })?;
    match token.split_once('=') {
        Some((k, v)) if k == key => Ok(v),
        _ => Err(FontError::parse(
            line,
            format!("expected '{}=' at position {}, found '{}'", key, index, token),
        )),
    }
}

/// Parse a numeric `key=value` token. Non-finite floats are rejected.
fn number_value<T>(tokens: &[&str], index: usize, key: &str, line: usize) -> Result<T, FontError>
where
    T: FromStr + Finite,
{
    let raw = value(tokens, index, key, line)?;
    raw.parse::<T>()
        .ok()
        .filter(Finite::is_finite)
        .ok_or_else(|| FontError::parse(line, format!("'{}' is not a valid {} value", raw, key)))
}

trait Finite {
    fn is_finite(&self) -> bool;
}

impl Finite for f32 {
    fn is_finite(&self) -> bool {
        f32::is_finite(*self)
    }
}

impl Finite for usize {
    fn is_finite(&self) -> bool {
        true
    }
}
