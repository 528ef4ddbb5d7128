use crate::{
    convert::diagnostics::Diagnostics,
    document::model::PsdBlendMode,
    foundation::core::BlockId,
    foundation::error::ConvertResult,
    scene::engine::{BlendMode, SceneEngine},
};

/// Map a Photoshop blend mode onto the target enum. `None` means unsupported.
pub fn map_blend_mode(mode: PsdBlendMode) -> Option<BlendMode> {
    use PsdBlendMode as P;

    Some(match mode {
        P::PassThrough => BlendMode::PassThrough,
        P::Normal => BlendMode::Normal,
        P::Dissolve => return None,
        P::Darken => BlendMode::Darken,
        P::Multiply => BlendMode::Multiply,
        P::ColorBurn => BlendMode::ColorBurn,
        P::LinearBurn => BlendMode::LinearBurn,
        P::DarkerColor => BlendMode::DarkenColor,
        P::Lighten => BlendMode::Lighten,
        P::Screen => BlendMode::Screen,
        P::ColorDodge => BlendMode::ColorDodge,
        P::LinearDodge => BlendMode::LinearDodge,
        P::LighterColor => BlendMode::LightenColor,
        P::Overlay => BlendMode::Overlay,
        P::SoftLight => BlendMode::SoftLight,
        P::HardLight => BlendMode::HardLight,
        P::VividLight => BlendMode::VividLight,
        P::LinearLight => BlendMode::LinearLight,
        P::PinLight => BlendMode::PinLight,
        P::HardMix => BlendMode::HardMix,
        P::Difference => BlendMode::Difference,
        P::Exclusion => BlendMode::Exclusion,
        P::Subtract => BlendMode::Subtract,
        P::Divide => BlendMode::Divide,
        P::Hue => BlendMode::Hue,
        P::Saturation => BlendMode::Saturation,
        P::Color => BlendMode::Color,
        P::Luminosity => BlendMode::Luminosity,
    })
}

/// Set the block's blend mode; unsupported modes fall back to normal with a warning.
pub fn apply_blend_mode(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    mode: PsdBlendMode,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<BlendMode> {
    let mapped = map_blend_mode(mode).unwrap_or_else(|| {
        diagnostics.warn(
            Some(layer),
            format!("unsupported blend mode {mode:?}, using normal"),
        );
        BlendMode::Normal
    });
    engine.set_blend_mode(block, mapped)?;
    Ok(mapped)
}

#[cfg(test)]
#[path = "../../tests/unit/convert/blend.rs"]
mod tests;
