use super::*;

#[test]
fn empty_json_yields_defaults() {
    let opts = ConvertOptions::from_json_str("{}").unwrap();
    assert_eq!(opts, ConvertOptions::default());
    assert!(!opts.create_hidden_layers);
    assert!(opts.group_layers);
    assert!(opts.fit_text_boxes);
    assert_eq!(opts.fit_step, 0.001);
    assert_eq!(opts.fit_max_iterations, 500);
    assert_eq!(opts.ready_timeout(), Duration::from_millis(1000));
    assert_eq!(opts.text_variable_placeholder, '_');
    assert_eq!(opts.dpi_scale(), 1.0);
}

#[test]
fn overrides_are_read() {
    let opts = ConvertOptions::from_json_str(
        r#"{ "target_dpi": 144, "create_hidden_layers": true, "raster_background": [255,255,255,255] }"#,
    )
    .unwrap();
    assert_eq!(opts.dpi_scale(), 2.0);
    assert!(opts.create_hidden_layers);
    assert_eq!(opts.raster_background, Some([255, 255, 255, 255]));
}

#[test]
fn invalid_values_are_rejected() {
    for json in [
        r#"{ "target_dpi": 0 }"#,
        r#"{ "target_dpi": -72 }"#,
        r#"{ "fit_step": 0 }"#,
        r#"{ "fit_max_iterations": 0 }"#,
        r#"{ "text_variable_placeholder": "{" }"#,
    ] {
        let err = ConvertOptions::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConvertError::Validation(_)), "{json}: {err}");
    }
    let err = ConvertOptions::from_json_str(r#"{ "fit_step": "fast" }"#).unwrap_err();
    assert!(matches!(err, ConvertError::Serde(_)));

    let opts = ConvertOptions {
        target_dpi: f64::NAN,
        ..ConvertOptions::default()
    };
    assert!(opts.validate().is_err());
}
