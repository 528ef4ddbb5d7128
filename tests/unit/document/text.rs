use super::*;

fn sheet(size: f64) -> StyleSheet {
    StyleSheet {
        font_size: Some(size),
        ..StyleSheet::default()
    }
}

fn payload(text: &str, lengths: &[usize]) -> TextPayload {
    TextPayload {
        text: text.to_string(),
        transform: None,
        descriptor: Descriptor::default(),
        engine: TextEngineData {
            run_lengths: lengths.to_vec(),
            run_styles: lengths.iter().map(|&n| sheet(n as f64)).collect(),
            ..TextEngineData::default()
        },
    }
}

#[test]
fn style_runs_are_contiguous() {
    let p = payload("HelloWorld", &[5, 5]);
    let runs = p.style_runs();
    assert_eq!(runs.len(), 2);
    assert_eq!((runs[0].from, runs[0].to), (0, 5));
    assert_eq!((runs[1].from, runs[1].to), (5, 10));
    assert_eq!(runs[1].len(), 5);
}

#[test]
fn style_runs_clamp_to_text_length_and_drop_empty_runs() {
    // Photoshop counts a trailing paragraph break the text string does not carry.
    let p = payload("abc", &[0, 2, 5, 4]);
    let runs = p.style_runs();
    assert_eq!(runs.len(), 2);
    assert_eq!((runs[0].from, runs[0].to), (0, 2));
    assert_eq!((runs[1].from, runs[1].to), (2, 3));
    assert!(runs.iter().all(|r| r.to <= p.char_len() && !r.is_empty()));
}

#[test]
fn runs_use_character_indices() {
    let p = payload("héllo✓", &[3, 3]);
    assert_eq!(p.char_len(), 6);
    let runs = p.style_runs();
    assert_eq!((runs[1].from, runs[1].to), (3, 6));
}

#[test]
fn line_count_handles_mixed_breaks() {
    assert_eq!(payload("", &[]).line_count(), 1);
    assert_eq!(payload("one", &[]).line_count(), 1);
    assert_eq!(payload("one\r", &[]).line_count(), 1);
    assert_eq!(payload("one\rtwo", &[]).line_count(), 2);
    assert_eq!(payload("one\r\ntwo\nthree", &[]).line_count(), 3);
}

#[test]
fn engine_color_is_argb() {
    let c = EngineColor([0.5, 1.0, 0.25, 0.0]).to_rgba();
    assert_eq!((c.r, c.g, c.b, c.a), (1.0, 0.25, 0.0, 0.5));
}

#[test]
fn font_name_follows_font_set() {
    let mut p = payload("x", &[1]);
    p.engine.font_set = vec!["Inter-Bold".to_string()];
    let style = StyleSheet {
        font: Some(0),
        ..StyleSheet::default()
    };
    assert_eq!(p.font_name(&style), Some("Inter-Bold"));
    assert_eq!(p.font_name(&StyleSheet::default()), None);
}

#[test]
fn validate_rejects_mismatched_parallel_arrays() {
    let mut p = payload("abc", &[3]);
    assert!(p.validate().is_ok());
    p.engine.run_styles.clear();
    assert!(p.validate().unwrap_err().contains("run lengths"));

    let mut p = payload("abc", &[3]);
    p.engine.paragraph_lengths = vec![3];
    assert!(p.validate().unwrap_err().contains("paragraph"));
}
