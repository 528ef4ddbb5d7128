use super::*;

#[test]
fn entries_keep_insertion_order_and_layer() {
    let mut d = Diagnostics::new();
    assert!(d.is_empty());
    d.warn(Some("Title"), "no font match");
    d.info(None, "done");
    d.error(Some("Body"), "missing bounds");

    assert_eq!(d.len(), 3);
    let e = d.entries();
    assert_eq!(e[0].severity, Severity::Warning);
    assert_eq!(e[0].layer.as_deref(), Some("Title"));
    assert_eq!(e[1].layer, None);
    assert_eq!(e[2].message, "missing bounds");
    assert_eq!(d.count(Severity::Error), 1);
    assert!(d.contains("font"));
    assert!(!d.contains("gradient"));
}

#[test]
fn extend_appends_at_the_end() {
    let mut a = Diagnostics::new();
    a.info(None, "first");
    let mut b = Diagnostics::new();
    b.warn(None, "second");
    a.extend(b);
    let messages: Vec<_> = a.entries().iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, ["first", "second"]);
}

#[test]
fn serializes_severity_in_snake_case() {
    let mut d = Diagnostics::new();
    d.warn(Some("L"), "m");
    let json = serde_json::to_string(&d).unwrap();
    assert!(json.contains(r#""severity":"warning""#));
    assert!(json.contains(r#""layer":"L""#));
}
