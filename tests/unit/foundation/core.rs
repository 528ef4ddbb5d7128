use super::*;

#[test]
fn canvas_rejects_zero_dimensions() {
    assert!(Canvas::new(0, 10).is_err());
    assert!(Canvas::new(10, 0).is_err());
    let c = Canvas::new(200, 100).unwrap();
    assert_eq!((c.width, c.height), (200, 100));
}

#[test]
fn rgba_clamps_and_sanitizes_channels() {
    let c = Rgba::new(1.5, -0.2, f64::NAN, 0.5);
    assert_eq!(c.r, 1.0);
    assert_eq!(c.g, 0.0);
    assert_eq!(c.b, 0.0);
    assert_eq!(c.a, 0.5);
}

#[test]
fn block_id_display_is_stable() {
    assert_eq!(BlockId(42).to_string(), "#42");
}
