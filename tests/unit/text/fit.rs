use super::*;

use crate::scene::{engine::BlockKind, memory::MemoryScene};

fn boxed_text(scene: &mut MemoryScene, height: f64) -> BlockId {
    let b = scene.create_block(BlockKind::Text).unwrap();
    scene.set_text(b, "aaaa bbbb").unwrap();
    scene.set_font_size(b, 10.0).unwrap();
    scene.set_line_height(b, 1.0).unwrap();
    scene.set_size(b, Size::new(60.0, height)).unwrap();
    b
}

fn assert_restored(scene: &MemoryScene, b: BlockId, height: f64) {
    assert_eq!(scene.size(b).unwrap(), Size::new(60.0, height));
    assert_eq!(scene.size_mode(b, Axis::Height).unwrap(), SizeMode::Fixed);
    assert_eq!(scene.size_mode(b, Axis::Width).unwrap(), SizeMode::Fixed);
}

#[test]
fn finds_the_widest_spacing_that_keeps_one_line() {
    let mut scene = MemoryScene::new();
    let b = boxed_text(&mut scene, 10.0);
    let mut diag = Diagnostics::new();

    let out = fit_letter_spacing(&mut scene, b, 0.01, 100, "caption", &mut diag).unwrap();

    assert_eq!(out.status, FitStatus::PerfectFit);
    assert!((out.spacing - 0.06).abs() < 1e-9);
    assert!(out.iterations <= 100);
    assert!((scene.letter_spacing(b).unwrap() - 0.06).abs() < 1e-9);
    assert!(diag.is_empty());
    assert_restored(&scene, b, 10.0);
}

#[test]
fn budget_exhaustion_restores_the_baseline() {
    let mut scene = MemoryScene::new();
    let b = boxed_text(&mut scene, 10.0);
    let mut diag = Diagnostics::new();

    let out = fit_letter_spacing(&mut scene, b, 0.01, 1, "caption", &mut diag).unwrap();

    assert_eq!(out.status, FitStatus::Exhausted);
    assert_eq!(out.iterations, 1);
    assert_eq!(out.spacing, 0.0);
    assert_eq!(scene.letter_spacing(b).unwrap(), 0.0);
    assert!(diag.contains("gave up after 1 iterations"));
    assert_restored(&scene, b, 10.0);
}

#[test]
fn box_too_small_for_any_spacing() {
    let mut scene = MemoryScene::new();
    let b = boxed_text(&mut scene, 1.0);
    scene.set_letter_spacing(b, 0.02).unwrap();
    let mut diag = Diagnostics::new();

    let out = fit_letter_spacing(&mut scene, b, 0.01, 100, "caption", &mut diag).unwrap();

    assert_eq!(out.status, FitStatus::NoFit);
    assert!((out.spacing - 0.02).abs() < 1e-12);
    assert!((scene.letter_spacing(b).unwrap() - 0.02).abs() < 1e-12);
    assert!(diag.contains("overflows its box at every tested letter spacing"));
    assert_restored(&scene, b, 1.0);
}

#[test]
fn roomy_box_narrows_to_the_upper_bound() {
    let mut scene = MemoryScene::new();
    let b = boxed_text(&mut scene, 100.0);
    let mut diag = Diagnostics::new();

    let out = fit_letter_spacing(&mut scene, b, 0.01, 100, "caption", &mut diag).unwrap();

    assert_eq!(out.status, FitStatus::Narrowed);
    assert!((out.spacing - 0.10).abs() < 1e-9);
    assert!(diag.is_empty());
    assert_restored(&scene, b, 100.0);
}

#[test]
fn resulting_spacing_never_overflows() {
    for height in [10.0, 20.0, 30.0] {
        let mut scene = MemoryScene::new();
        let b = boxed_text(&mut scene, height);
        let mut diag = Diagnostics::new();
        let out = fit_letter_spacing(&mut scene, b, 0.05, 64, "caption", &mut diag).unwrap();
        assert_ne!(out.status, FitStatus::NoFit);
        scene.set_size_mode(b, Axis::Height, SizeMode::Auto).unwrap();
        assert!(scene.frame_height(b).unwrap() <= height + 5.0);
    }
}
