use std::{collections::HashMap, path::Path};

use anyhow::Context;
use skrifa::{
    FontRef, MetadataProvider,
    instance::{LocationRef, Size},
};

use crate::scene::engine::Typeface;

/// Font request derived from a PostScript font name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FontQuery {
    /// Full PostScript name as stored in the document.
    pub postscript_name: String,
    /// Family part (before the first `-`).
    pub family: String,
    /// Style part (after the first `-`), `Regular` when absent.
    pub style: String,
    /// Weight derived from the style name.
    pub weight: u16,
    /// Style name asks for an italic or oblique face.
    pub italic: bool,
}

impl FontQuery {
    /// Split `Family-Style` and derive weight and slant from the style name.
    pub fn from_postscript_name(name: &str) -> Self {
        let (family, style) = match name.split_once('-') {
            Some((f, s)) if !s.is_empty() => (f, s),
            _ => (name, "Regular"),
        };
        Self {
            postscript_name: name.to_string(),
            family: family.to_string(),
            style: style.to_string(),
            weight: weight_from_style(style),
            italic: {
                let s = style.to_ascii_lowercase();
                s.contains("italic") || s.contains("oblique")
            },
        }
    }
}

/// Map a style name (`Bold`, `SemiBoldItalic`, ...) to a weight.
pub fn weight_from_style(style: &str) -> u16 {
    let s = style.to_ascii_lowercase().replace([' ', '-', '_'], "");
    const TABLE: &[(&str, u16)] = &[
        ("extralight", 200),
        ("ultralight", 200),
        ("semibold", 600),
        ("demibold", 600),
        ("extrabold", 800),
        ("ultrabold", 800),
        ("hairline", 100),
        ("thin", 100),
        ("light", 300),
        ("medium", 500),
        ("bold", 700),
        ("heavy", 800),
        ("black", 900),
    ];
    TABLE
        .iter()
        .find(|(key, _)| s.contains(key))
        .map(|&(_, w)| w)
        .unwrap_or(400)
}

/// Result of a successful typeface lookup.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedTypeface {
    /// Typeface to apply to the block.
    pub typeface: Typeface,
    /// URI used to fetch font metrics.
    pub uri: String,
}

/// Resolves a font request against a font catalog.
pub trait TypefaceResolver {
    /// Best match for `query`, or `None`.
    fn resolve(&self, query: &FontQuery) -> Option<ResolvedTypeface>;
}

impl<F> TypefaceResolver for F
where
    F: Fn(&FontQuery) -> Option<ResolvedTypeface>,
{
    fn resolve(&self, query: &FontQuery) -> Option<ResolvedTypeface> {
        self(query)
    }
}

/// Resolver that never finds a match.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTypefaceResolver;

impl TypefaceResolver for NoTypefaceResolver {
    fn resolve(&self, _query: &FontQuery) -> Option<ResolvedTypeface> {
        None
    }
}

/// [`TypefaceResolver`] backed by a `fontdb` database.
///
/// Lookups try an exact PostScript-name match first, then a family/weight/style query.
pub struct FontdbResolver {
    db: usvg::fontdb::Database,
}

impl FontdbResolver {
    /// Empty database.
    pub fn new() -> Self {
        Self {
            db: usvg::fontdb::Database::new(),
        }
    }

    /// Wrap an existing database.
    pub fn from_database(db: usvg::fontdb::Database) -> Self {
        Self { db }
    }

    /// Load installed system fonts.
    pub fn load_system_fonts(&mut self) {
        self.db.load_system_fonts();
    }

    /// Load every `.ttf`, `.otf` and `.ttc` file directly inside `dir`.
    pub fn load_fonts_dir(&mut self, dir: &Path) -> anyhow::Result<usize> {
        let rd = std::fs::read_dir(dir)
            .with_context(|| format!("read font directory '{}'", dir.display()))?;
        let before = self.db.len();
        for entry in rd.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(ext) = path.extension().and_then(|s| s.to_str()) else {
                continue;
            };
            let ext = ext.to_ascii_lowercase();
            if ext != "ttf" && ext != "otf" && ext != "ttc" {
                continue;
            }
            if let Err(e) = self.db.load_font_file(&path) {
                tracing::warn!(path = %path.display(), "skipping font file: {e}");
            }
        }
        Ok(self.db.len() - before)
    }

    /// Number of loaded faces.
    pub fn face_count(&self) -> usize {
        self.db.len()
    }

    fn typeface_for(&self, id: usvg::fontdb::ID) -> Option<ResolvedTypeface> {
        use usvg::fontdb::Source;

        let face = self.db.face(id)?;
        let path = match &face.source {
            Source::File(p) => Some(p.as_path()),
            Source::SharedFile(p, _) => Some(p.as_path()),
            Source::Binary(_) => None,
        };
        let uri = match path {
            Some(p) if face.index == 0 => format!("file://{}", p.display()),
            Some(p) => format!("file://{}#{}", p.display(), face.index),
            None => format!("fontdb://{}", face.post_script_name),
        };
        let family = face
            .families
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_else(|| face.post_script_name.clone());
        let italic = face.style != usvg::fontdb::Style::Normal;
        let style = face
            .post_script_name
            .split_once('-')
            .map(|(_, s)| s.to_string())
            .unwrap_or_else(|| "Regular".to_string());
        Some(ResolvedTypeface {
            typeface: Typeface {
                family,
                style,
                weight: face.weight.0,
                italic,
                uri: uri.clone(),
            },
            uri,
        })
    }
}

impl Default for FontdbResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TypefaceResolver for FontdbResolver {
    fn resolve(&self, query: &FontQuery) -> Option<ResolvedTypeface> {
        if let Some(face) = self
            .db
            .faces()
            .find(|f| f.post_script_name == query.postscript_name)
        {
            return self.typeface_for(face.id);
        }

        let spaced = split_camel_case(&query.family);
        let families = [
            usvg::fontdb::Family::Name(&query.family),
            usvg::fontdb::Family::Name(&spaced),
        ];
        let q = usvg::fontdb::Query {
            families: &families,
            weight: usvg::fontdb::Weight(query.weight),
            stretch: usvg::fontdb::Stretch::Normal,
            style: if query.italic {
                usvg::fontdb::Style::Italic
            } else {
                usvg::fontdb::Style::Normal
            },
        };
        self.db.query(&q).and_then(|id| self.typeface_for(id))
    }
}

/// `OpenSans` -> `Open Sans`.
fn split_camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev_lower = false;
    for ch in s.chars() {
        if ch.is_uppercase() && prev_lower {
            out.push(' ');
        }
        prev_lower = ch.is_lowercase() || ch.is_ascii_digit();
        out.push(ch);
    }
    out
}

/// Vertical font metrics in font units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FontMetrics {
    /// Units per em.
    pub units_per_em: u16,
    /// Ascender (positive, above the baseline).
    pub ascender: f64,
    /// Descender (negative, below the baseline).
    pub descender: f64,
}

impl FontMetrics {
    /// Content height per point of font size: `(ascender - descender) / upem`.
    pub fn correction_factor(&self) -> f64 {
        if self.units_per_em == 0 {
            return 1.0;
        }
        (self.ascender - self.descender) / f64::from(self.units_per_em)
    }
}

/// Loads vertical metrics for a font URI.
pub trait FontMetricsLoader {
    /// Fetch metrics of the font at `uri`.
    fn load(&self, uri: &str) -> anyhow::Result<FontMetrics>;
}

impl<F> FontMetricsLoader for F
where
    F: Fn(&str) -> anyhow::Result<FontMetrics>,
{
    fn load(&self, uri: &str) -> anyhow::Result<FontMetrics> {
        self(uri)
    }
}

/// Reads `file://` font URIs (with an optional `#index` face fragment) using `skrifa`.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileFontMetricsLoader;

impl FontMetricsLoader for FileFontMetricsLoader {
    fn load(&self, uri: &str) -> anyhow::Result<FontMetrics> {
        let rest = uri
            .strip_prefix("file://")
            .with_context(|| format!("unsupported font URI scheme: '{uri}'"))?;
        let (path, index) = match rest.rsplit_once('#') {
            Some((p, i)) => {
                let index = i
                    .parse::<u32>()
                    .with_context(|| format!("bad face index in '{uri}'"))?;
                (p, index)
            }
            None => (rest, 0),
        };
        let data = std::fs::read(path).with_context(|| format!("read font file '{path}'"))?;
        let font = FontRef::from_index(&data, index)
            .map_err(|e| anyhow::anyhow!("parse font '{path}': {e}"))?;
        let m = font.metrics(Size::unscaled(), LocationRef::default());
        Ok(FontMetrics {
            units_per_em: m.units_per_em,
            ascender: f64::from(m.ascent),
            descender: f64::from(m.descent),
        })
    }
}

/// Per-session memo of font metrics keyed by URI.
///
/// Insert-if-absent: each URI is loaded at most once, failures included.
#[derive(Clone, Debug, Default)]
pub struct FontInfoCache {
    entries: HashMap<String, Result<FontMetrics, String>>,
    loads: usize,
}

impl FontInfoCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached metrics for `uri`, loading them on first use.
    pub fn get_or_load(
        &mut self,
        uri: &str,
        loader: &dyn FontMetricsLoader,
    ) -> Result<FontMetrics, String> {
        if let Some(hit) = self.entries.get(uri) {
            return hit.clone();
        }
        self.loads += 1;
        let loaded = loader.load(uri).map_err(|e| format!("{e:#}"));
        self.entries.insert(uri.to_string(), loaded.clone());
        loaded
    }

    /// Cached entry without loading.
    pub fn get(&self, uri: &str) -> Option<&Result<FontMetrics, String>> {
        self.entries.get(uri)
    }

    /// Number of loader invocations so far.
    pub fn loads(&self) -> usize {
        self.loads
    }

    /// Number of cached URIs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Upward shift that aligns target text boxes with Photoshop's first baseline.
///
/// One line: half the difference between the line box and the font's content height. Several
/// lines: half the difference between the line box and the font size.
pub fn vertical_offset(metrics: &FontMetrics, font_size: f64, line_height: f64, lines: usize) -> f64 {
    let line_box = line_height * font_size;
    if lines <= 1 {
        (line_box - metrics.correction_factor() * font_size) / 2.0
    } else {
        (line_box - font_size) / 2.0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/text/font.rs"]
mod tests;
