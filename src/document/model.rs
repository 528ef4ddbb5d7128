use std::sync::Arc;

use crate::{
    document::descriptor::Descriptor,
    document::text::{StyleSheet, TextPayload},
    foundation::core::Canvas,
    foundation::error::{ConvertError, ConvertResult},
};

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Root of an externally decoded Photoshop document.
///
/// The tree is read-only input: the converter never mutates it. It can be built
/// programmatically or deserialized from JSON (see [`ParsedDocument::from_json_str`]).
pub struct ParsedDocument {
    /// Document name, used as the page name.
    #[serde(default)]
    pub name: String,
    /// Canvas width in pixels.
    pub width: u32,
    /// Canvas height in pixels.
    pub height: u32,
    /// Document-wide default text style sheet (lowest priority in the style cascade).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_style: Option<StyleSheet>,
    /// Top-level nodes in source (top-to-bottom panel) order.
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// A node of the layer tree.
pub enum Node {
    /// Layer folder.
    Group(GroupNode),
    /// Leaf layer.
    Layer(LayerNode),
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Layer folder with its own opacity, blend mode and optional vector mask.
pub struct GroupNode {
    /// Source layer id; keys the deferred grouping of its children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Group name.
    #[serde(default)]
    pub name: String,
    /// Opacity byte `0..=255`.
    #[serde(default = "opaque_u8")]
    pub opacity: u8,
    /// Blend mode; folders default to pass-through.
    #[serde(default = "pass_through")]
    pub blend_mode: PsdBlendMode,
    /// Visibility flag; a hidden folder hides its whole subtree.
    #[serde(default = "visible_true")]
    pub visible: bool,
    /// Vector mask clipping every descendant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_mask: Option<Vec<PathRecord>>,
    /// Children in source order.
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Leaf layer: text, vector shape or raster pixels.
pub struct LayerNode {
    /// Source layer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
    /// Layer name.
    #[serde(default)]
    pub name: String,
    /// Left edge in document pixels.
    #[serde(default)]
    pub left: i32,
    /// Top edge in document pixels.
    #[serde(default)]
    pub top: i32,
    /// Width in pixels.
    #[serde(default)]
    pub width: u32,
    /// Height in pixels.
    #[serde(default)]
    pub height: u32,
    /// Layer opacity byte `0..=255`.
    #[serde(default = "opaque_u8")]
    pub opacity: u8,
    /// Blend-option fill opacity byte; `None` means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<u8>,
    /// Blend mode.
    #[serde(default)]
    pub blend_mode: PsdBlendMode,
    /// Visibility flag.
    #[serde(default = "visible_true")]
    pub visible: bool,
    /// Layer is clipped to the layer below it.
    #[serde(default)]
    pub clipping: bool,
    /// Layer carries layer effects (shadows, glows, overlays, ...).
    #[serde(default)]
    pub has_effects: bool,
    /// Layer carries a pixel (user) mask.
    #[serde(default)]
    pub has_pixel_mask: bool,
    /// Type-tool payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextPayload>,
    /// Vector shape payload.
    #[serde(default)]
    pub vector: VectorData,
    /// Rendered layer pixels (own effects only, layer opacity baked in).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<RasterComposite>,
}

#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
/// Vector-related layer blocks.
pub struct VectorData {
    /// `vmsk`: vector mask path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vector_mask: Option<Vec<PathRecord>>,
    /// `vscg`: shape fill content descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_content: Option<Descriptor>,
    /// `vsms`: vector mask path (newer block id).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_mask: Option<Vec<PathRecord>>,
    /// `vstk`: stroke style descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_style: Option<Descriptor>,
    /// `SoCo`: solid color fill descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solid_color: Option<Descriptor>,
}

impl GroupNode {
    /// Visible, opaque pass-through group without mask or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            opacity: opaque_u8(),
            blend_mode: pass_through(),
            visible: true,
            vector_mask: None,
            children: Vec::new(),
        }
    }
}

impl LayerNode {
    /// Visible, opaque, normal-blend layer with the given bounds and no content.
    pub fn new(name: impl Into<String>, left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            id: None,
            name: name.into(),
            left,
            top,
            width,
            height,
            opacity: opaque_u8(),
            fill_opacity: None,
            blend_mode: PsdBlendMode::Normal,
            visible: true,
            clipping: false,
            has_effects: false,
            has_pixel_mask: false,
            text: None,
            vector: VectorData::default(),
            composite: None,
        }
    }
}

impl VectorData {
    /// Return `true` when any of the four vector markers is present.
    pub fn is_vector(&self) -> bool {
        self.vector_mask.is_some()
            || self.stroke_content.is_some()
            || self.stroke_mask.is_some()
            || self.stroke_style.is_some()
    }

    /// Path records describing the shape outline.
    pub fn path_records(&self) -> Option<&[PathRecord]> {
        self.vector_mask
            .as_deref()
            .or(self.stroke_mask.as_deref())
            .filter(|r| !r.is_empty())
    }
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
/// Straight-alpha RGBA8 pixels of a layer composite.
pub struct RasterComposite {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Row-major RGBA8 bytes.
    pub rgba8: Arc<Vec<u8>>,
}

impl RasterComposite {
    /// Check that the buffer holds exactly `width * height` RGBA8 pixels.
    pub(crate) fn validate(&self) -> Result<(), String> {
        let expected = (self.width as usize)
            .checked_mul(self.height as usize)
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| "composite dimensions overflow".to_string())?;
        if self.rgba8.len() != expected {
            return Err(format!(
                "composite buffer has {} bytes, expected {expected} for {}x{}",
                self.rgba8.len(),
                self.width,
                self.height
            ));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// A path-record point in unit-square coordinates (wraparound-encoded).
pub struct PathPoint {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl PathPoint {
    /// Construct a point.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Bezier knot: anchor plus incoming/outgoing control points.
pub struct Knot {
    /// Knot belongs to a closed subpath.
    pub closed: bool,
    /// Control points are linked (smooth).
    #[serde(default)]
    pub linked: bool,
    /// Incoming control point.
    pub preceding: PathPoint,
    /// Anchor point.
    pub anchor: PathPoint,
    /// Outgoing control point.
    pub leaving: PathPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
/// One record of a vector path resource.
pub enum PathRecord {
    /// Subpath length marker.
    SubpathLength {
        /// Subpath is closed.
        closed: bool,
        /// Number of knots that follow.
        knots: u32,
    },
    /// Anchor knot.
    Knot(Knot),
    /// Fill rule / initial fill marker.
    FillRule {
        /// Fill starts with all pixels.
        #[serde(default)]
        initial_fill: bool,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
/// Photoshop blend-mode tag. Accepts four-character keys and readable names.
pub enum PsdBlendMode {
    /// `pass`
    #[serde(rename = "pass", alias = "pass through", alias = "passThrough")]
    PassThrough,
    /// `norm`
    #[default]
    #[serde(rename = "norm", alias = "normal")]
    Normal,
    /// `diss`
    #[serde(rename = "diss", alias = "dissolve")]
    Dissolve,
    /// `dark`
    #[serde(rename = "dark", alias = "darken")]
    Darken,
    /// `mul `
    #[serde(rename = "mul ", alias = "mul", alias = "multiply")]
    Multiply,
    /// `idiv`
    #[serde(rename = "idiv", alias = "color burn")]
    ColorBurn,
    /// `lbrn`
    #[serde(rename = "lbrn", alias = "linear burn")]
    LinearBurn,
    /// `dkCl`
    #[serde(rename = "dkCl", alias = "darker color")]
    DarkerColor,
    /// `lite`
    #[serde(rename = "lite", alias = "lighten")]
    Lighten,
    /// `scrn`
    #[serde(rename = "scrn", alias = "screen")]
    Screen,
    /// `div `
    #[serde(rename = "div ", alias = "div", alias = "color dodge")]
    ColorDodge,
    /// `lddg`
    #[serde(rename = "lddg", alias = "linear dodge")]
    LinearDodge,
    /// `lgCl`
    #[serde(rename = "lgCl", alias = "lighter color")]
    LighterColor,
    /// `over`
    #[serde(rename = "over", alias = "overlay")]
    Overlay,
    /// `sLit`
    #[serde(rename = "sLit", alias = "soft light")]
    SoftLight,
    /// `hLit`
    #[serde(rename = "hLit", alias = "hard light")]
    HardLight,
    /// `vLit`
    #[serde(rename = "vLit", alias = "vivid light")]
    VividLight,
    /// `lLit`
    #[serde(rename = "lLit", alias = "linear light")]
    LinearLight,
    /// `pLit`
    #[serde(rename = "pLit", alias = "pin light")]
    PinLight,
    /// `hMix`
    #[serde(rename = "hMix", alias = "hard mix")]
    HardMix,
    /// `diff`
    #[serde(rename = "diff", alias = "difference")]
    Difference,
    /// `smud`
    #[serde(rename = "smud", alias = "exclusion")]
    Exclusion,
    /// `fsub`
    #[serde(rename = "fsub", alias = "subtract")]
    Subtract,
    /// `fdiv`
    #[serde(rename = "fdiv", alias = "divide")]
    Divide,
    /// `hue `
    #[serde(rename = "hue ", alias = "hue")]
    Hue,
    /// `sat `
    #[serde(rename = "sat ", alias = "sat", alias = "saturation")]
    Saturation,
    /// `colr`
    #[serde(rename = "colr", alias = "color")]
    Color,
    /// `lum `
    #[serde(rename = "lum ", alias = "lum", alias = "luminosity")]
    Luminosity,
}

fn opaque_u8() -> u8 {
    255
}

fn visible_true() -> bool {
    true
}

fn pass_through() -> PsdBlendMode {
    PsdBlendMode::PassThrough
}

impl ParsedDocument {
    /// Empty document with the given canvas size.
    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            default_style: None,
            children: Vec::new(),
        }
    }

    /// Parse a document from JSON.
    pub fn from_json_str(s: &str) -> ConvertResult<Self> {
        serde_json::from_str(s).map_err(|e| ConvertError::document(format!("parse document: {e}")))
    }

    /// Canvas size, validated to be non-empty.
    pub fn canvas(&self) -> ConvertResult<Canvas> {
        Canvas::new(self.width, self.height)
            .map_err(|_| ConvertError::document("document width/height must be > 0"))
    }

    /// Validate document-level invariants.
    ///
    /// Layer payloads (composite buffers, text run arrays) are checked per layer during
    /// conversion so one broken layer does not fail the document.
    pub fn validate(&self) -> ConvertResult<()> {
        self.canvas()?;
        Ok(())
    }

    /// Number of leaf layers in the whole tree.
    pub fn layer_count(&self) -> usize {
        fn count(nodes: &[Node]) -> usize {
            nodes
                .iter()
                .map(|n| match n {
                    Node::Layer(_) => 1,
                    Node::Group(g) => count(&g.children),
                })
                .sum()
        }
        count(&self.children)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/model.rs"]
mod tests;
