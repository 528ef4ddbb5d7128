use super::*;
use crate::scene::memory::MemoryScene;
use crate::scene::engine::BlockKind;

#[test]
fn every_mode_but_dissolve_maps() {
    let modes: Vec<PsdBlendMode> = serde_json::from_str(
        r#"["pass","norm","diss","dark","mul ","idiv","lbrn","dkCl","lite","scrn","div ","lddg",
            "lgCl","over","sLit","hLit","vLit","lLit","pLit","hMix","diff","smud","fsub","fdiv",
            "hue ","sat ","colr","lum "]"#,
    )
    .unwrap();
    assert_eq!(modes.len(), 28);
    for mode in modes {
        assert_eq!(map_blend_mode(mode).is_none(), mode == PsdBlendMode::Dissolve);
    }
    assert_eq!(
        map_blend_mode(PsdBlendMode::PassThrough),
        Some(BlendMode::PassThrough)
    );
    assert_eq!(
        map_blend_mode(PsdBlendMode::DarkerColor),
        Some(BlendMode::DarkenColor)
    );
}

#[test]
fn unsupported_mode_falls_back_to_normal_with_warning() {
    let mut scene = MemoryScene::new();
    let b = scene.create_block(BlockKind::Graphic).unwrap();
    let mut diag = Diagnostics::new();

    let applied = apply_blend_mode(&mut scene, b, PsdBlendMode::Dissolve, "noise", &mut diag).unwrap();
    assert_eq!(applied, BlendMode::Normal);
    assert_eq!(diag.len(), 1);
    assert!(diag.contains("unsupported blend mode"));

    let applied = apply_blend_mode(&mut scene, b, PsdBlendMode::Screen, "glow", &mut diag).unwrap();
    assert_eq!(applied, BlendMode::Screen);
    assert_eq!(scene.block(b).unwrap().blend_mode, BlendMode::Screen);
    assert_eq!(diag.len(), 1);
}
