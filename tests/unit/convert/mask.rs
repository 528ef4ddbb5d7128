use super::*;
use crate::{
    document::model::{Knot, PathPoint},
    scene::memory::MemoryScene,
};

fn square_mask(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<PathRecord> {
    [(x0, y0), (x1, y0), (x1, y1), (x0, y1)]
        .into_iter()
        .map(|(x, y)| {
            let p = PathPoint::new(x, y);
            PathRecord::Knot(Knot {
                closed: true,
                linked: false,
                preceding: p,
                anchor: p,
                leaving: p,
            })
        })
        .collect()
}

fn masked_group(records: Vec<PathRecord>) -> GroupNode {
    GroupNode {
        vector_mask: Some(records),
        ..GroupNode::new("masked")
    }
}

struct Fixture {
    scene: MemoryScene,
    page: BlockId,
    block: BlockId,
    canvas: Canvas,
}

fn fixture() -> Fixture {
    let mut scene = MemoryScene::new();
    let page = scene.create_block(BlockKind::Page).unwrap();
    let block = scene.create_block(BlockKind::Graphic).unwrap();
    scene.append_child(page, block).unwrap();
    scene.set_position(block, Point::new(10.0, 10.0)).unwrap();
    scene.set_size(block, Size::new(40.0, 20.0)).unwrap();
    Fixture {
        scene,
        page,
        block,
        canvas: Canvas::new(100, 100).unwrap(),
    }
}

#[test]
fn crop_is_old_over_new() {
    let crop = crop_for_intersection(
        Point::new(10.0, 10.0),
        Size::new(40.0, 20.0),
        Point::new(20.0, 15.0),
        Size::new(20.0, 10.0),
    );
    assert_eq!(crop.scale_x, 2.0);
    assert_eq!(crop.scale_y, 2.0);
    assert_eq!(crop.translate_x, -0.5);
    assert_eq!(crop.translate_y, -0.5);
}

#[test]
fn no_masking_ancestor_returns_block_unchanged() {
    let mut f = fixture();
    let mut d = Diagnostics::new();
    let plain = GroupNode::new("plain");
    let before = f.scene.len();
    let out = apply_clip_masks(&mut f.scene, f.block, f.page, &[&plain], f.canvas, "l", &mut d)
        .unwrap();
    assert_eq!(out, f.block);
    assert_eq!(f.scene.len(), before);
    assert!(d.is_empty());
}

#[test]
fn overlapping_mask_replaces_block_and_sets_crop() {
    let mut f = fixture();
    let mut d = Diagnostics::new();
    // canvas-relative square 20..60 x 0..100
    let g = masked_group(square_mask(0.2, 0.0, 0.6, 1.0));
    let out = apply_clip_masks(&mut f.scene, f.block, f.page, &[&g], f.canvas, "l", &mut d)
        .unwrap();
    assert_ne!(out, f.block);
    assert!(!f.scene.block_exists(f.block));
    // page holds only the intersected block
    assert_eq!(f.scene.children(f.page), &[out]);

    let b = f.scene.block(out).unwrap();
    assert!((b.position.x - 20.0).abs() < 1e-6);
    assert!((b.position.y - 10.0).abs() < 1e-6);
    assert!((b.size.width - 30.0).abs() < 1e-6);
    assert!((b.size.height - 20.0).abs() < 1e-6);
    assert!((b.crop.scale_x - 40.0 / 30.0).abs() < 1e-6);
    assert!((b.crop.scale_y - 1.0).abs() < 1e-6);
    assert!((b.crop.translate_x - (-10.0 / 30.0)).abs() < 1e-6);
    assert!(b.crop.translate_y.abs() < 1e-6);
}

#[test]
fn nested_masks_intersect_together() {
    let mut f = fixture();
    let mut d = Diagnostics::new();
    let outer = masked_group(square_mask(0.0, 0.0, 0.3, 1.0));
    let inner = masked_group(square_mask(0.2, 0.0, 1.0, 1.0));
    let out = apply_clip_masks(
        &mut f.scene,
        f.block,
        f.page,
        &[&outer, &inner],
        f.canvas,
        "l",
        &mut d,
    )
    .unwrap();
    let size = f.scene.size(out).unwrap();
    assert!((size.width - 10.0).abs() < 1e-6);
    assert_eq!(f.scene.len(), 2);
}

#[test]
fn empty_intersection_keeps_block_and_leaves_no_masks() {
    let mut f = fixture();
    let mut d = Diagnostics::new();
    let g = masked_group(square_mask(0.8, 0.8, 0.9, 0.9));
    let before = f.scene.len();

    let out = apply_clip_masks(&mut f.scene, f.block, f.page, &[&g], f.canvas, "l", &mut d)
        .unwrap();
    assert_eq!(out, f.block);
    assert_eq!(f.scene.len(), before);
    assert_eq!(f.scene.children(f.page), &[f.block]);
    assert_eq!(f.scene.position(f.block).unwrap(), Point::new(10.0, 10.0));
    assert_eq!(f.scene.size(f.block).unwrap(), Size::new(40.0, 20.0));
    assert!(d.contains("empty mask intersection"));
}
