use crate::{
    convert::diagnostics::Diagnostics,
    convert::path::reconstruct_path,
    document::model::{GroupNode, PathRecord},
    foundation::core::{BlockId, Canvas, Point, Rgba, Size, Vec2},
    foundation::error::ConvertResult,
    scene::engine::{BlockKind, BooleanOp, Crop, Fill, SceneEngine, Shape},
};

/// Crop that keeps the content of a block whose frame moved from `old` to `new`.
pub fn crop_for_intersection(old_pos: Point, old_size: Size, new_pos: Point, new_size: Size) -> Crop {
    Crop {
        scale_x: old_size.width / new_size.width,
        scale_y: old_size.height / new_size.height,
        translate_x: (old_pos.x - new_pos.x) / new_size.width,
        translate_y: (old_pos.y - new_pos.y) / new_size.height,
    }
}

/// Intersect `block` with the vector masks of its ancestor groups.
///
/// One canvas-sized mask block is created per masking ancestor. Returns the id of the
/// intersected block, or `block` itself when no ancestor carries a mask or the intersection
/// failed; in the latter case every mask block is destroyed again.
pub fn apply_clip_masks(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    page: BlockId,
    ancestors: &[&GroupNode],
    canvas: Canvas,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<BlockId> {
    let mut masks = Vec::new();
    for group in ancestors.iter().rev() {
        let Some(records) = group.vector_mask.as_deref().filter(|r| !r.is_empty()) else {
            continue;
        };
        match create_mask_block(engine, page, canvas, records) {
            Ok(id) => masks.push(id),
            Err(e) => {
                destroy_all(engine, &masks);
                return Err(e);
            }
        }
    }
    if masks.is_empty() {
        return Ok(block);
    }

    let old_pos = engine.position(block)?;
    let old_size = engine.size(block)?;

    let mut inputs = Vec::with_capacity(masks.len() + 1);
    inputs.push(block);
    inputs.extend_from_slice(&masks);

    let combined = match engine.combine(&inputs, BooleanOp::Intersection) {
        Ok(id) => id,
        Err(e) => {
            destroy_all(engine, &masks);
            diagnostics.warn(
                Some(layer),
                format!("empty mask intersection, keeping unmasked block ({e})"),
            );
            return Ok(block);
        }
    };

    let new_pos = engine.position(combined)?;
    let new_size = engine.size(combined)?;
    if new_size.width > 0.0 && new_size.height > 0.0 {
        engine.set_crop(
            combined,
            crop_for_intersection(old_pos, old_size, new_pos, new_size),
        )?;
    }
    tracing::debug!(%block, %combined, masks = masks.len(), "applied clip masks");
    Ok(combined)
}

fn create_mask_block(
    engine: &mut dyn SceneEngine,
    page: BlockId,
    canvas: Canvas,
    records: &[PathRecord],
) -> ConvertResult<BlockId> {
    let width = f64::from(canvas.width);
    let height = f64::from(canvas.height);
    let id = engine.create_block(BlockKind::Graphic)?;
    let setup = (|| -> ConvertResult<()> {
        engine.append_child(page, id)?;
        engine.set_position(id, Point::ZERO)?;
        engine.set_size(id, Size::new(width, height))?;
        engine.set_shape(
            id,
            Shape::Path(reconstruct_path(records, width, height, Vec2::ZERO)),
        )?;
        engine.set_fill(id, Some(Fill::Color(Rgba::opaque(1.0, 0.0, 0.0))))
    })();
    if let Err(e) = setup {
        let _ = engine.destroy_block(id);
        return Err(e);
    }
    Ok(id)
}

fn destroy_all(engine: &mut dyn SceneEngine, ids: &[BlockId]) {
    for &id in ids {
        if engine.block_exists(id) {
            let _ = engine.destroy_block(id);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/convert/mask.rs"]
mod tests;
