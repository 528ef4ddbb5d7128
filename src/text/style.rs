use crate::{
    convert::diagnostics::Diagnostics,
    document::text::{StyleRun, StyleSheet, TextPayload},
    foundation::core::BlockId,
    foundation::error::ConvertResult,
    scene::engine::{SceneEngine, Stroke, TextAlign, TextCase},
};

static EMPTY_STYLE: StyleSheet = StyleSheet {
    font: None,
    font_size: None,
    faux_bold: None,
    faux_italic: None,
    font_caps: None,
    fill_color: None,
    stroke_color: None,
    stroke_flag: None,
    outline_width: None,
    tracking: None,
    kerning: None,
    leading: None,
    auto_leading: None,
};

const DEFAULT_LINE_HEIGHT: f64 = 1.2;
const MIN_LINE_HEIGHT: f64 = 0.6;

/// Three-level style lookup: run sheet, then layer default, then document default.
#[derive(Clone, Copy, Debug, Default)]
pub struct StyleCascade<'a> {
    /// Layer-level default sheet.
    pub layer_default: Option<&'a StyleSheet>,
    /// Document-level default sheet.
    pub document_default: Option<&'a StyleSheet>,
}

impl<'a> StyleCascade<'a> {
    /// Cascade for a text payload inside a document.
    pub fn new(payload: &'a TextPayload, document_default: Option<&'a StyleSheet>) -> Self {
        Self {
            layer_default: payload.engine.default_style.as_ref(),
            document_default,
        }
    }

    /// First value `get` finds, in priority order.
    pub fn resolve<T>(&self, run: &StyleSheet, get: impl Fn(&StyleSheet) -> Option<T>) -> Option<T> {
        get(run)
            .or_else(|| self.layer_default.and_then(&get))
            .or_else(|| self.document_default.and_then(&get))
    }
}

/// Single-style values collapsed from the style runs.
#[derive(Clone, Debug, PartialEq)]
pub struct FlattenedStyle {
    /// Applied font size in target points, if any run resolved one.
    pub font_size: Option<f64>,
    /// Applied line height factor.
    pub line_height: f64,
    /// Applied letter spacing in ems.
    pub letter_spacing: f64,
    /// Applied alignment.
    pub align: TextAlign,
    /// PostScript name of the first run's font.
    pub font_name: Option<String>,
    /// Stroke applied to the whole block.
    pub stroke: Option<Stroke>,
}

/// Case transform for a `FontCaps` flag.
pub fn text_case(flag: Option<u8>) -> Option<TextCase> {
    match flag? {
        1 => Some(TextCase::Lowercase),
        2 => Some(TextCase::Uppercase),
        _ => None,
    }
}

/// Alignment for a paragraph justification code; justified variants fall back to left.
pub fn text_align(justification: Option<u8>) -> TextAlign {
    match justification {
        Some(1) => TextAlign::Right,
        Some(2) => TextAlign::Center,
        _ => TextAlign::Left,
    }
}

/// Average letter spacing in ems: `(sum(tracking * len) + sum(kerning * len)) / 1000 / text_len`.
pub fn average_letter_spacing(
    runs: &[StyleRun<'_>],
    cascade: &StyleCascade<'_>,
    text_len: usize,
) -> f64 {
    if text_len == 0 {
        return 0.0;
    }
    let (tracking, kerning) = runs.iter().fold((0.0, 0.0), |(t, k), run| {
        let len = run.len() as f64;
        (
            t + cascade.resolve(run.style, |s| s.tracking).unwrap_or(0.0) * len,
            k + cascade.resolve(run.style, |s| s.kerning).unwrap_or(0.0) * len,
        )
    });
    (tracking / 1000.0 + kerning / 1000.0) / text_len as f64
}

/// Line height factor of the first run.
///
/// `Leading / FontSize`, or the paragraph's auto-leading value when the run asks for automatic
/// leading. Unresolvable or implausibly small values yield 1.2.
pub fn line_height_factor(
    first: &StyleSheet,
    cascade: &StyleCascade<'_>,
    paragraph_auto_leading: Option<f64>,
) -> f64 {
    let auto = cascade.resolve(first, |s| s.auto_leading).unwrap_or(false);
    let factor = if auto {
        paragraph_auto_leading
    } else {
        let leading = cascade.resolve(first, |s| s.leading);
        let size = cascade.resolve(first, |s| s.font_size);
        match (leading, size) {
            (Some(l), Some(s)) if s > 0.0 => Some(l / s),
            _ => None,
        }
    };
    match factor {
        Some(f) if f.is_finite() && f >= MIN_LINE_HEIGHT => f,
        _ => DEFAULT_LINE_HEIGHT,
    }
}

/// PostScript font name of the first style run, through the style cascade.
pub fn first_font_name(payload: &TextPayload, document_default: Option<&StyleSheet>) -> Option<String> {
    let cascade = StyleCascade::new(payload, document_default);
    let runs = payload.style_runs();
    let first = runs.first().map(|r| r.style).unwrap_or(&EMPTY_STYLE);
    cascade
        .resolve(first, |s| s.font)
        .and_then(|i| payload.engine.font_set.get(i))
        .cloned()
}

fn snippet(text: &str, from: usize, to: usize) -> String {
    const MAX: usize = 20;
    let s: String = text.chars().skip(from).take((to - from).min(MAX)).collect();
    if to - from > MAX { format!("{s}...") } else { s }
}

/// Apply the rich-text runs of `payload` to a text block.
///
/// Case, bold/italic and fill color are applied per run. Font size, line height, alignment,
/// letter spacing and stroke have a single value per block; they are taken from the first run
/// (or paragraph) and disagreeing runs are reported.
pub fn flatten_text_style(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    payload: &TextPayload,
    document_default: Option<&StyleSheet>,
    font_scale: f64,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<FlattenedStyle> {
    let cascade = StyleCascade::new(payload, document_default);
    let text_len = payload.char_len();
    let mut runs = payload.style_runs();
    if runs.is_empty() && text_len > 0 {
        runs.push(StyleRun {
            from: 0,
            to: text_len,
            style: &EMPTY_STYLE,
        });
    }

    for run in &runs {
        let range = run.from..run.to;
        if let Some(case) = text_case(run.style.font_caps) {
            engine.set_text_case(block, range.clone(), case)?;
        }
        if run.style.faux_bold == Some(true) {
            if engine.can_toggle_bold(block, range.clone())? {
                engine.toggle_bold(block, range.clone())?;
            } else {
                diagnostics.error(
                    Some(layer),
                    format!(
                        "cannot apply bold to \"{}\" with the current typeface",
                        snippet(&payload.text, run.from, run.to)
                    ),
                );
            }
        }
        if run.style.faux_italic == Some(true) {
            if engine.can_toggle_italic(block, range.clone())? {
                engine.toggle_italic(block, range.clone())?;
            } else {
                diagnostics.error(
                    Some(layer),
                    format!(
                        "cannot apply italic to \"{}\" with the current typeface",
                        snippet(&payload.text, run.from, run.to)
                    ),
                );
            }
        }
        match cascade.resolve(run.style, |s| s.fill_color) {
            Some(c) => engine.set_text_color(block, range, c.to_rgba())?,
            None => diagnostics.warn(
                Some(layer),
                format!("no fill color for characters {}..{}", run.from, run.to),
            ),
        }
    }

    let Some(first) = runs.first() else {
        return Ok(FlattenedStyle {
            font_size: None,
            line_height: DEFAULT_LINE_HEIGHT,
            letter_spacing: 0.0,
            align: TextAlign::Left,
            font_name: None,
            stroke: None,
        });
    };

    // Font size.
    let sizes: Vec<f64> = runs
        .iter()
        .filter_map(|r| cascade.resolve(r.style, |s| s.font_size))
        .collect();
    let font_size = cascade
        .resolve(first.style, |s| s.font_size)
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| s * font_scale);
    match font_size {
        Some(size) => engine.set_font_size(block, size)?,
        None => diagnostics.warn(Some(layer), "no font size resolved, keeping engine default"),
    }
    if sizes.windows(2).any(|w| (w[0] - w[1]).abs() > 1e-6) {
        diagnostics.warn(
            Some(layer),
            "text uses several font sizes, only the first is honored",
        );
    }

    // Font.
    let fonts: Vec<usize> = runs
        .iter()
        .filter_map(|r| cascade.resolve(r.style, |s| s.font))
        .collect();
    if fonts.windows(2).any(|w| w[0] != w[1]) {
        diagnostics.warn(
            Some(layer),
            "text uses several fonts, only the first is honored",
        );
    }
    let font_name = first_font_name(payload, document_default);

    // Alignment.
    let paragraph = payload.first_paragraph();
    let justification = paragraph.and_then(|p| p.justification);
    if matches!(justification, Some(j) if j > 2) {
        diagnostics.info(Some(layer), "justified text is aligned left");
    }
    let align = text_align(justification);
    engine.set_alignment(block, align)?;

    // Spacing.
    let letter_spacing = average_letter_spacing(&runs, &cascade, text_len);
    engine.set_letter_spacing(block, letter_spacing)?;
    let line_height =
        line_height_factor(first.style, &cascade, paragraph.and_then(|p| p.auto_leading));
    engine.set_line_height(block, line_height)?;

    let stroke = resolve_stroke(&runs, &cascade, font_scale, layer, diagnostics);
    if stroke.is_some() {
        engine.set_stroke(block, stroke)?;
    }

    Ok(FlattenedStyle {
        font_size,
        line_height,
        letter_spacing,
        align,
        font_name,
        stroke,
    })
}

fn resolve_stroke(
    runs: &[StyleRun<'_>],
    cascade: &StyleCascade<'_>,
    font_scale: f64,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> Option<Stroke> {
    let flags: Vec<bool> = runs
        .iter()
        .map(|r| cascade.resolve(r.style, |s| s.stroke_flag).unwrap_or(false))
        .collect();
    let first_stroked = runs.iter().zip(&flags).find(|(_, f)| **f).map(|(r, _)| r)?;
    if flags.iter().any(|f| !f) {
        diagnostics.warn(
            Some(layer),
            "stroke is applied to the whole text, not only to stroked runs",
        );
    }
    let Some(color) = cascade.resolve(first_stroked.style, |s| s.stroke_color) else {
        diagnostics.warn(Some(layer), "stroked text has no stroke color, stroke dropped");
        return None;
    };
    let width = cascade
        .resolve(first_stroked.style, |s| s.outline_width)
        .unwrap_or(1.0)
        * font_scale;
    Some(Stroke {
        color: color.to_rgba(),
        width,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/text/style.rs"]
mod tests;
