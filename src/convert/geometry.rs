use crate::{
    document::descriptor::Descriptor,
    document::model::LayerNode,
    document::text::{TextPayload, TextTransform},
    foundation::core::{Affine, BlockId, Point, Size},
    foundation::error::ConvertResult,
    scene::engine::SceneEngine,
};

/// Absolute placement of a block in target coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    /// Top-left corner after transformation.
    pub position: Point,
    /// Frame width.
    pub width: f64,
    /// Frame height.
    pub height: f64,
    /// Clockwise rotation in radians.
    pub rotation: f64,
}

impl Placement {
    /// Frame size.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }
}

/// Text-local bounding box from the text descriptor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextBounds {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Right edge.
    pub right: f64,
    /// Bottom edge.
    pub bottom: f64,
}

impl TextBounds {
    /// Read `Left`/`Top `/`Rght`/`Btom` from the `bounds` (or `boundingBox`) object.
    ///
    /// Left, top and right are required; a missing bottom falls back to `top + fallback_height`.
    pub fn from_descriptor(desc: &Descriptor, fallback_height: f64) -> Result<Self, String> {
        let bounds = desc
            .object("bounds")
            .or_else(|| desc.object("boundingBox"))
            .ok_or_else(|| "text bounds descriptor is missing".to_string())?;
        let edge = |key: &str| {
            bounds
                .number(key)
                .filter(|v| v.is_finite())
                .ok_or_else(|| format!("text bounds have no usable '{}' value", key.trim_end()))
        };
        let left = edge("Left")?;
        let top = edge("Top ")?;
        let right = edge("Rght")?;
        let bottom = bounds
            .number("Btom")
            .filter(|v| v.is_finite())
            .unwrap_or(top + fallback_height);
        Ok(Self {
            left,
            top,
            right,
            bottom,
        })
    }
}

fn to_affine(t: &TextTransform) -> Affine {
    Affine::new([t.xx, t.xy, t.yx, t.yy, t.tx, t.ty])
}

/// Map text-local bounds through a text transform.
///
/// The top-left, top-right and bottom-left corners are transformed; size is derived from the
/// distances between them so rotated or skewed boxes keep their true extent. The stored matrix
/// is already y-down, so only the rotation angle changes sign for the clockwise target.
pub fn transformed_placement(t: &TextTransform, bounds: TextBounds) -> Placement {
    let m = to_affine(t);
    let top_left = m * Point::new(bounds.left, bounds.top);
    let top_right = m * Point::new(bounds.right, bounds.top);
    let bottom_left = m * Point::new(bounds.left, bounds.bottom);
    Placement {
        position: top_left,
        width: top_left.distance(top_right),
        height: top_left.distance(bottom_left),
        rotation: -f64::atan2(t.yx, t.xx),
    }
}

/// Axis-aligned placement from the layer's pixel bounds.
pub fn layer_placement(layer: &LayerNode) -> Placement {
    Placement {
        position: Point::new(f64::from(layer.left), f64::from(layer.top)),
        width: f64::from(layer.width),
        height: f64::from(layer.height),
        rotation: 0.0,
    }
}

/// Placement of a text layer: transformed text bounds when a transform is present, layer bounds
/// otherwise.
pub fn text_placement(layer: &LayerNode, payload: &TextPayload) -> Result<Placement, String> {
    match &payload.transform {
        Some(t) => {
            let bounds = TextBounds::from_descriptor(&payload.descriptor, f64::from(layer.height))?;
            Ok(transformed_placement(t, bounds))
        }
        None => Ok(layer_placement(layer)),
    }
}

/// Average of the x and y scale factors of a transform's linear part (1 without a transform).
pub fn transform_scale(t: Option<&TextTransform>) -> f64 {
    let Some(t) = t else {
        return 1.0;
    };
    let sx = t.xx.hypot(t.xy);
    let sy = t.yy.hypot(t.yx);
    let avg = (sx + sy) / 2.0;
    if avg.is_finite() && avg > 0.0 { avg } else { 1.0 }
}

/// Set position, size and rotation of a block.
pub fn apply_placement(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    placement: &Placement,
) -> ConvertResult<()> {
    engine.set_position(block, placement.position)?;
    engine.set_size(block, placement.size())?;
    engine.set_rotation(block, placement.rotation)?;
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/convert/geometry.rs"]
mod tests;
