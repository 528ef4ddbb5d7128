//! psd2scene transcodes a parsed Photoshop layer tree into positioned blocks of a scene-graph
//! design engine.
//!
//! The entry point is session-oriented:
//!
//! - Load and validate a [`ParsedDocument`]
//! - Create a [`Converter`] with [`ConvertOptions`] and optional font/PNG collaborators
//! - Convert documents into any [`SceneEngine`]; [`MemoryScene`] is the bundled engine
//!
//! Conversion is best-effort: only malformed documents fail; everything else is recorded in the
//! report's [`Diagnostics`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![allow(missing_docs_in_private_items)]

mod convert;
mod document;
mod foundation;
mod raster;
mod scene;
mod text;

pub use crate::foundation::core::{
    Affine, BezPath, BlockId, Canvas, Point, Rect, Rgba, Size, Vec2,
};
pub use crate::foundation::error::{ConvertError, ConvertResult};

pub use crate::document::descriptor::{Descriptor, DescriptorValue};
pub use crate::document::model::{
    GroupNode, Knot, LayerNode, Node, ParsedDocument, PathPoint, PathRecord, PsdBlendMode,
    RasterComposite, VectorData,
};
pub use crate::document::text::{
    EngineColor, ParagraphSheet, StyleRun, StyleSheet, TextEngineData, TextPayload, TextShape,
    TextTransform,
};

pub use crate::convert::blend::{apply_blend_mode, map_blend_mode};
pub use crate::convert::color::{PsdColor, nested_color, normalize_color};
pub use crate::convert::diagnostics::{Diagnostic, Diagnostics, Severity};
pub use crate::convert::geometry::{
    Placement, TextBounds, apply_placement, layer_placement, text_placement, transform_scale,
    transformed_placement,
};
pub use crate::convert::mask::{apply_clip_masks, crop_for_intersection};
pub use crate::convert::opacity::{compose_opacity, effective_opacity, fill_opacity};
pub use crate::convert::options::ConvertOptions;
pub use crate::convert::path::{PathCommand, VectorPath, reconstruct_path};
pub use crate::convert::session::{ConversionReport, Converter, GroupMembership, LayerKind};

pub use crate::text::fit::{FitOutcome, FitStatus, fit_letter_spacing};
pub use crate::text::font::{
    FileFontMetricsLoader, FontInfoCache, FontMetrics, FontMetricsLoader, FontQuery,
    FontdbResolver, NoTypefaceResolver, ResolvedTypeface, TypefaceResolver, vertical_offset,
    weight_from_style,
};
pub use crate::text::style::{
    FlattenedStyle, StyleCascade, average_letter_spacing, first_font_name, flatten_text_style,
    line_height_factor, text_align, text_case,
};
pub use crate::text::variables::{
    EscapedVariables, escape_text_variables, restore_text_variables, variable_delimiters,
};

pub use crate::raster::png::{ImagePngEncoder, PngEncoder, buffer_uri, composite_over};
pub use crate::scene::engine::{
    Axis, BlendMode, BlockKind, BooleanOp, Crop, Fill, FillKind, SceneEngine, Shape, SizeMode,
    Stroke, TextAlign, TextCase, Typeface,
};
pub use crate::scene::memory::{CharStyle, FontVariant, MemoryBlock, MemoryScene, TextContent};
