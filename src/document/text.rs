use crate::{document::descriptor::Descriptor, foundation::core::Rgba};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Type-tool payload of a text layer.
pub struct TextPayload {
    /// Text content. Photoshop separates paragraphs with `\r`.
    pub text: String,
    /// Text-tool transform (`TySh` matrix).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TextTransform>,
    /// Raw text descriptor; carries the `bounds` / `boundingBox` objects.
    #[serde(default)]
    pub descriptor: Descriptor,
    /// Parsed engine data (style and paragraph runs).
    #[serde(default)]
    pub engine: TextEngineData,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Affine transform of the text tool, in Photoshop's `xx xy yx yy tx ty` order.
pub struct TextTransform {
    /// X scale / rotation cosine.
    pub xx: f64,
    /// Y component of the transformed x axis.
    pub xy: f64,
    /// X component of the transformed y axis.
    pub yx: f64,
    /// Y scale / rotation cosine.
    pub yy: f64,
    /// X translation.
    pub tx: f64,
    /// Y translation.
    pub ty: f64,
}

impl TextTransform {
    /// Pure translation.
    pub fn translate(tx: f64, ty: f64) -> Self {
        Self {
            xx: 1.0,
            xy: 0.0,
            yx: 0.0,
            yy: 1.0,
            tx,
            ty,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Text frame kind.
pub enum TextShape {
    /// Point text: grows with its content.
    #[default]
    Point,
    /// Paragraph text inside a fixed box.
    Box,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
/// Engine data of a text layer: run-length encoded style and paragraph runs.
pub struct TextEngineData {
    /// Character count of each style run, parallel to `run_styles`.
    #[serde(default)]
    pub run_lengths: Vec<usize>,
    /// Style sheet of each style run.
    #[serde(default)]
    pub run_styles: Vec<StyleSheet>,
    /// Character count of each paragraph run, parallel to `paragraph_sheets`.
    #[serde(default)]
    pub paragraph_lengths: Vec<usize>,
    /// Paragraph sheet of each paragraph run.
    #[serde(default)]
    pub paragraph_sheets: Vec<ParagraphSheet>,
    /// Layer-level default style sheet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_style: Option<StyleSheet>,
    /// Font set: PostScript names addressed by [`StyleSheet::font`].
    #[serde(default)]
    pub font_set: Vec<String>,
    /// Point or box text.
    #[serde(default)]
    pub shape: TextShape,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Character style sheet. Every attribute is optional and resolved through the style cascade.
pub struct StyleSheet {
    /// Index into [`TextEngineData::font_set`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font: Option<usize>,
    /// Font size in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    /// Synthesized bold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faux_bold: Option<bool>,
    /// Synthesized italic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faux_italic: Option<bool>,
    /// Case transform flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_caps: Option<u8>,
    /// Fill color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_color: Option<EngineColor>,
    /// Stroke color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<EngineColor>,
    /// Stroke enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_flag: Option<bool>,
    /// Stroke width in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_width: Option<f64>,
    /// Tracking in thousandths of an em.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking: Option<f64>,
    /// Manual kerning in thousandths of an em.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kerning: Option<f64>,
    /// Leading in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leading: Option<f64>,
    /// Use the paragraph's automatic leading instead of `leading`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_leading: Option<bool>,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Engine-data color: `[alpha, red, green, blue]` normalized floats.
pub struct EngineColor(pub [f64; 4]);

impl EngineColor {
    /// Convert to a normalized color.
    pub fn to_rgba(self) -> Rgba {
        let [a, r, g, b] = self.0;
        Rgba::new(r, g, b, a)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Paragraph sheet attributes the converter consumes.
pub struct ParagraphSheet {
    /// Justification code (0 left, 1 right, 2 center, 3.. justified variants).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub justification: Option<u8>,
    /// Automatic leading factor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_leading: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
/// A style run resolved to a character range `[from, to)` of the text.
pub struct StyleRun<'a> {
    /// Inclusive start character index.
    pub from: usize,
    /// Exclusive end character index.
    pub to: usize,
    /// Run style sheet.
    pub style: &'a StyleSheet,
}

impl StyleRun<'_> {
    /// Number of characters in the run.
    pub fn len(&self) -> usize {
        self.to - self.from
    }

    /// Return `true` for an empty run.
    pub fn is_empty(&self) -> bool {
        self.from == self.to
    }
}

impl TextPayload {
    /// Text length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    /// Contiguous style runs built from the run-length array, clamped to the text length.
    ///
    /// Empty runs are dropped; a run-length array shorter than the text leaves the tail unstyled.
    pub fn style_runs(&self) -> Vec<StyleRun<'_>> {
        let len = self.char_len();
        let mut out = Vec::with_capacity(self.engine.run_lengths.len());
        let mut from = 0usize;
        for (run_len, style) in self
            .engine
            .run_lengths
            .iter()
            .zip(self.engine.run_styles.iter())
        {
            if from >= len {
                break;
            }
            let to = from.saturating_add(*run_len).min(len);
            if to > from {
                out.push(StyleRun { from, to, style });
            }
            from = to;
        }
        out
    }

    /// First paragraph sheet, if any.
    pub fn first_paragraph(&self) -> Option<&ParagraphSheet> {
        self.engine.paragraph_sheets.first()
    }

    /// PostScript font name addressed by a style sheet.
    pub fn font_name(&self, style: &StyleSheet) -> Option<&str> {
        style
            .font
            .and_then(|i| self.engine.font_set.get(i))
            .map(String::as_str)
    }

    /// Number of text lines separated by `\r`, `\n` or `\r\n`, ignoring trailing breaks.
    pub fn line_count(&self) -> usize {
        let text = self.text.replace("\r\n", "\n");
        text.trim_end_matches(['\r', '\n'])
            .split(['\r', '\n'])
            .count()
            .max(1)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.engine.run_lengths.len() != self.engine.run_styles.len() {
            return Err(format!(
                "text has {} run lengths but {} run styles",
                self.engine.run_lengths.len(),
                self.engine.run_styles.len()
            ));
        }
        if self.engine.paragraph_lengths.len() != self.engine.paragraph_sheets.len() {
            return Err(format!(
                "text has {} paragraph lengths but {} paragraph sheets",
                self.engine.paragraph_lengths.len(),
                self.engine.paragraph_sheets.len()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/text.rs"]
mod tests;
