use crate::{
    convert::diagnostics::Diagnostics,
    document::model::{GroupNode, LayerNode, PsdBlendMode},
    foundation::core::BlockId,
    foundation::error::ConvertResult,
    foundation::math::{clamp01, unit_from_u8},
    scene::engine::{FillKind, SceneEngine},
};

/// Blend-option fill opacity in `[0, 1]`.
///
/// Missing means opaque. An explicit zero would make the block invisible in the target, so it is
/// logged and forced to full opacity.
pub fn fill_opacity(layer: &LayerNode, diagnostics: &mut Diagnostics) -> f64 {
    match layer.fill_opacity {
        None => 1.0,
        Some(0) => {
            diagnostics.warn(
                Some(&layer.name),
                "fill opacity is 0, using full opacity instead",
            );
            1.0
        }
        Some(v) => unit_from_u8(v),
    }
}

/// Effective block opacity of `layer` under `ancestors` (root first).
///
/// `raster_fill` marks blocks whose fill is the rendered layer composite; those pixels already
/// carry the layer opacity, so only the fill opacity is applied. Pass-through groups do not
/// contribute their own opacity.
pub fn effective_opacity(
    layer: &LayerNode,
    ancestors: &[&GroupNode],
    raster_fill: bool,
    diagnostics: &mut Diagnostics,
) -> f64 {
    let fill = fill_opacity(layer, diagnostics);
    let mut opacity = if raster_fill && !layer.vector.is_vector() {
        fill
    } else {
        fill * unit_from_u8(layer.opacity)
    };
    for group in ancestors.iter().rev() {
        if group.blend_mode == PsdBlendMode::PassThrough {
            continue;
        }
        opacity *= unit_from_u8(group.opacity);
    }
    clamp01(opacity)
}

/// Compute and set the block's opacity. Returns the applied value.
pub fn compose_opacity(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    layer: &LayerNode,
    ancestors: &[&GroupNode],
    diagnostics: &mut Diagnostics,
) -> ConvertResult<f64> {
    let raster_fill = engine.fill_kind(block)? == FillKind::Image;
    let opacity = effective_opacity(layer, ancestors, raster_fill, diagnostics);
    engine.set_opacity(block, opacity)?;
    Ok(opacity)
}

#[cfg(test)]
#[path = "../../tests/unit/convert/opacity.rs"]
mod tests;
