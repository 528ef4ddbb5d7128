use std::{ops::Range, time::Duration};

use crate::{
    convert::path::VectorPath,
    foundation::core::{BlockId, Point, Rgba, Size},
    foundation::error::ConvertResult,
};

/// Kind of block created in the target scene.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    /// Page container; one per converted document.
    Page,
    /// Shape or image block.
    Graphic,
    /// Single-style text block with ranged overrides.
    Text,
    /// Group created by the grouping phase.
    Group,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Size axis.
pub enum Axis {
    /// Horizontal.
    Width,
    /// Vertical.
    Height,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// How a block dimension is determined.
pub enum SizeMode {
    /// Explicit value.
    #[default]
    Fixed,
    /// Computed from content (text layout).
    Auto,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Block outline.
pub enum Shape {
    /// Axis-aligned rectangle covering the block frame.
    Rect,
    /// Vector path normalized against its own width/height and stretched to the block frame.
    Path(VectorPath),
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// Block fill.
pub enum Fill {
    /// Solid color.
    Color(Rgba),
    /// Encoded image referenced by URI.
    Image {
        /// Image URI (e.g. `buffer://<hash>`).
        uri: String,
        /// Pixel width.
        width: u32,
        /// Pixel height.
        height: u32,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Fill discriminant reported by [`SceneEngine::fill_kind`].
pub enum FillKind {
    /// No fill.
    None,
    /// Solid color fill.
    Color,
    /// Image fill.
    Image,
}

impl Fill {
    /// Discriminant of this fill.
    pub fn kind(&self) -> FillKind {
        match self {
            Self::Color(_) => FillKind::Color,
            Self::Image { .. } => FillKind::Image,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Outline stroke.
pub struct Stroke {
    /// Stroke color.
    pub color: Rgba,
    /// Stroke width in target units.
    pub width: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Content crop of a block: scale and translation relative to the block frame.
pub struct Crop {
    /// Horizontal content scale.
    pub scale_x: f64,
    /// Vertical content scale.
    pub scale_y: f64,
    /// Horizontal translation as a fraction of the block width.
    pub translate_x: f64,
    /// Vertical translation as a fraction of the block height.
    pub translate_y: f64,
}

impl Default for Crop {
    fn default() -> Self {
        Self {
            scale_x: 1.0,
            scale_y: 1.0,
            translate_x: 0.0,
            translate_y: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Boolean operator for [`SceneEngine::combine`].
pub enum BooleanOp {
    /// Union of all inputs.
    Union,
    /// Region covered by every input.
    Intersection,
    /// First input minus the others.
    Difference,
    /// Symmetric difference.
    Xor,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Target blend modes.
#[allow(missing_docs)]
pub enum BlendMode {
    PassThrough,
    #[default]
    Normal,
    Darken,
    Multiply,
    ColorBurn,
    LinearBurn,
    DarkenColor,
    Lighten,
    Screen,
    ColorDodge,
    LinearDodge,
    LightenColor,
    Overlay,
    SoftLight,
    HardLight,
    VividLight,
    LinearLight,
    PinLight,
    HardMix,
    Difference,
    Exclusion,
    Subtract,
    Divide,
    Hue,
    Saturation,
    Color,
    Luminosity,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Case transform applied to a text range.
pub enum TextCase {
    /// As typed.
    #[default]
    Normal,
    /// Lowercase.
    Lowercase,
    /// Uppercase.
    Uppercase,
    /// Title case.
    Titlecase,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Horizontal text alignment.
pub enum TextAlign {
    /// Left aligned.
    #[default]
    Left,
    /// Right aligned.
    Right,
    /// Centered.
    Center,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Typeface applied to a text block.
pub struct Typeface {
    /// Family name.
    pub family: String,
    /// Style name (`Regular`, `Bold Italic`, ...).
    pub style: String,
    /// CSS-like weight (100..=900).
    pub weight: u16,
    /// Italic face.
    pub italic: bool,
    /// Font file URI.
    pub uri: String,
}

/// Capability interface of the target scene-graph engine.
///
/// The converter owns nothing in the scene: it creates blocks, mutates them through this
/// trait and hands the resulting ids back to the caller. Text ranges are character (Unicode
/// scalar value) index ranges `[from, to)`.
pub trait SceneEngine {
    /// Create a detached block.
    fn create_block(&mut self, kind: BlockKind) -> ConvertResult<BlockId>;
    /// Destroy a block and its descendants.
    fn destroy_block(&mut self, id: BlockId) -> ConvertResult<()>;
    /// Append `child` to `parent`, detaching it from any previous parent.
    fn append_child(&mut self, parent: BlockId, child: BlockId) -> ConvertResult<()>;
    /// Return `true` when `id` refers to a live block.
    fn block_exists(&self, id: BlockId) -> bool;

    /// Set the block name.
    fn set_name(&mut self, id: BlockId, name: &str) -> ConvertResult<()>;
    /// Set the top-left position.
    fn set_position(&mut self, id: BlockId, pos: Point) -> ConvertResult<()>;
    /// Top-left position.
    fn position(&self, id: BlockId) -> ConvertResult<Point>;
    /// Set the frame size; both axes become [`SizeMode::Fixed`].
    fn set_size(&mut self, id: BlockId, size: Size) -> ConvertResult<()>;
    /// Frame size; auto-sized axes report their laid-out extent.
    fn size(&self, id: BlockId) -> ConvertResult<Size>;
    /// Set how one axis is sized.
    fn set_size_mode(&mut self, id: BlockId, axis: Axis, mode: SizeMode) -> ConvertResult<()>;
    /// Sizing mode of one axis.
    fn size_mode(&self, id: BlockId, axis: Axis) -> ConvertResult<SizeMode>;
    /// Set the rotation in radians (clockwise, around the top-left corner).
    fn set_rotation(&mut self, id: BlockId, radians: f64) -> ConvertResult<()>;
    /// Rotation in radians.
    fn rotation(&self, id: BlockId) -> ConvertResult<f64>;
    /// Set opacity in `[0, 1]`.
    fn set_opacity(&mut self, id: BlockId, opacity: f64) -> ConvertResult<()>;
    /// Opacity in `[0, 1]`.
    fn opacity(&self, id: BlockId) -> ConvertResult<f64>;
    /// Set the blend mode.
    fn set_blend_mode(&mut self, id: BlockId, mode: BlendMode) -> ConvertResult<()>;
    /// Show or hide the block.
    fn set_visible(&mut self, id: BlockId, visible: bool) -> ConvertResult<()>;
    /// Set the block outline.
    fn set_shape(&mut self, id: BlockId, shape: Shape) -> ConvertResult<()>;
    /// Set or remove the fill.
    fn set_fill(&mut self, id: BlockId, fill: Option<Fill>) -> ConvertResult<()>;
    /// Kind of the current fill.
    fn fill_kind(&self, id: BlockId) -> ConvertResult<FillKind>;
    /// Set or remove the stroke.
    fn set_stroke(&mut self, id: BlockId, stroke: Option<Stroke>) -> ConvertResult<()>;
    /// Set the content crop.
    fn set_crop(&mut self, id: BlockId, crop: Crop) -> ConvertResult<()>;
    /// Make encoded PNG bytes available under `uri` for [`Fill::Image`].
    fn store_image(&mut self, _uri: &str, _png: Vec<u8>) -> ConvertResult<()> {
        Ok(())
    }

    /// Combine blocks into a new block.
    ///
    /// On success the inputs are destroyed and the new block takes the first input's place.
    /// On failure the inputs are left untouched.
    fn combine(&mut self, ids: &[BlockId], op: BooleanOp) -> ConvertResult<BlockId>;
    /// Return `true` when `ids` can be grouped together.
    fn is_groupable(&self, ids: &[BlockId]) -> bool;
    /// Group blocks, returning the new group block.
    fn group(&mut self, ids: &[BlockId]) -> ConvertResult<BlockId>;

    /// Replace the whole text content, resetting ranged styles.
    fn set_text(&mut self, id: BlockId, text: &str) -> ConvertResult<()>;
    /// Current text content.
    fn text(&self, id: BlockId) -> ConvertResult<String>;
    /// Replace a character range, keeping the styling of the replaced range.
    fn replace_text(&mut self, id: BlockId, range: Range<usize>, text: &str) -> ConvertResult<()>;
    /// Apply a case transform to a range.
    fn set_text_case(&mut self, id: BlockId, range: Range<usize>, case: TextCase)
    -> ConvertResult<()>;
    /// Return `true` when bold can be toggled on the range with the current typeface.
    fn can_toggle_bold(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool>;
    /// Toggle bold on a range.
    fn toggle_bold(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()>;
    /// Return `true` when italic can be toggled on the range with the current typeface.
    fn can_toggle_italic(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool>;
    /// Toggle italic on a range.
    fn toggle_italic(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()>;
    /// Set the text color of a range.
    fn set_text_color(&mut self, id: BlockId, range: Range<usize>, color: Rgba)
    -> ConvertResult<()>;
    /// Set the block typeface.
    fn set_typeface(&mut self, id: BlockId, typeface: &Typeface) -> ConvertResult<()>;
    /// Set the block font size in points.
    fn set_font_size(&mut self, id: BlockId, size: f64) -> ConvertResult<()>;
    /// Block font size in points.
    fn font_size(&self, id: BlockId) -> ConvertResult<f64>;
    /// Set letter spacing in ems.
    fn set_letter_spacing(&mut self, id: BlockId, spacing: f64) -> ConvertResult<()>;
    /// Letter spacing in ems.
    fn letter_spacing(&self, id: BlockId) -> ConvertResult<f64>;
    /// Set the line height as a multiple of the font size.
    fn set_line_height(&mut self, id: BlockId, factor: f64) -> ConvertResult<()>;
    /// Set horizontal alignment.
    fn set_alignment(&mut self, id: BlockId, align: TextAlign) -> ConvertResult<()>;
    /// Laid-out text frame height.
    fn frame_height(&self, id: BlockId) -> ConvertResult<f64>;
    /// Wait until the block reached its ready state; return `false` on timeout.
    fn wait_ready(&mut self, id: BlockId, timeout: Duration) -> ConvertResult<bool>;
}
