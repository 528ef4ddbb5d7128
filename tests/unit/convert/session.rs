use std::{ops::Range, time::Duration};

use super::*;
use crate::{
    convert::diagnostics::{Diagnostic, Severity},
    document::descriptor::DescriptorValue,
    document::text::{ParagraphSheet, StyleSheet, TextEngineData, TextTransform},
    foundation::error::ConvertError,
    scene::engine::{BlendMode, BooleanOp, Crop, FillKind, TextAlign, TextCase, Typeface},
    scene::memory::MemoryScene,
};

fn text_layer(name: &str) -> LayerNode {
    LayerNode {
        text: Some(TextPayload {
            text: "Hi".to_string(),
            transform: None,
            descriptor: Descriptor::default(),
            engine: TextEngineData::default(),
        }),
        ..LayerNode::new(name, 0, 0, 20, 10)
    }
}

fn raster_layer(name: &str, left: i32, top: i32) -> LayerNode {
    LayerNode {
        composite: Some(RasterComposite {
            width: 1,
            height: 1,
            rgba8: std::sync::Arc::new(vec![255, 0, 0, 255]),
        }),
        ..LayerNode::new(name, left, top, 1, 1)
    }
}

#[test]
fn classification_priority() {
    let mut l = text_layer("t");
    l.vector.stroke_style = Some(Descriptor::default());
    assert!(matches!(LayerKind::classify(&l), LayerKind::Text(p) if p.text == "Hi"));
    l.text = None;
    assert!(matches!(
        LayerKind::classify(&l),
        LayerKind::Vector(v) if v.stroke_style.is_some()
    ));
    assert!(matches!(
        LayerKind::classify(&LayerNode::new("p", 0, 0, 1, 1)),
        LayerKind::Raster(None)
    ));
    let px = raster_layer("px", 0, 0);
    let kind = LayerKind::classify(&px);
    assert!(kind.is_raster());
    assert_eq!(kind.label(), "raster");
    assert!(matches!(kind, LayerKind::Raster(Some(c)) if c.width == 1));
}

#[test]
fn membership_keeps_first_seen_order() {
    let mut m = GroupMembership::default();
    assert!(m.is_empty());
    m.record(9, "b", BlockId(1));
    m.record(3, "a", BlockId(2));
    m.record(9, "b", BlockId(3));
    assert_eq!(m.len(), 2);
    assert_eq!(m.members(9), &[BlockId(1), BlockId(3)]);
    assert_eq!(m.members(42), &[] as &[BlockId]);
    let order: Vec<u32> = m.iter().map(|(id, _, _)| id).collect();
    assert_eq!(order, [9, 3]);
}

#[test]
fn converter_rejects_invalid_options() {
    let opts = ConvertOptions {
        fit_max_iterations: 0,
        ..ConvertOptions::default()
    };
    assert!(Converter::new(opts).is_err());
}

#[test]
fn invalid_canvas_aborts_before_creating_blocks() {
    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let err = conv
        .convert(&mut scene, &ParsedDocument::new("empty", 0, 10))
        .unwrap_err();
    assert!(err.is_fatal());
    assert!(scene.is_empty());
}

#[test]
fn hidden_layers_are_skipped_or_created_invisible() {
    let mut doc = ParsedDocument::new("doc", 10, 10);
    let mut hidden = raster_layer("hidden", 0, 0);
    hidden.visible = false;
    let mut hidden_group = GroupNode::new("folder");
    hidden_group.visible = false;
    hidden_group.children.push(Node::Layer(raster_layer("inside", 1, 1)));
    doc.children = vec![Node::Layer(hidden), Node::Group(hidden_group)];

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.layers_converted, 0);
    assert_eq!(report.layers_skipped, 1);
    assert_eq!(scene.len(), 1);

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions {
        create_hidden_layers: true,
        ..ConvertOptions::default()
    })
    .unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.layers_converted, 2);
    assert!(!scene.find_by_name("hidden").unwrap().visible);
    assert!(!scene.find_by_name("inside").unwrap().visible);
}

#[test]
fn siblings_of_a_source_group_are_grouped() {
    let mut group = GroupNode::new("cluster");
    group.id = Some(4);
    group.children = vec![
        Node::Layer(raster_layer("a", 0, 0)),
        Node::Layer(raster_layer("b", 5, 5)),
    ];
    let mut lonely = GroupNode::new("lonely");
    lonely.id = Some(5);
    lonely.children = vec![Node::Layer(raster_layer("c", 2, 2))];
    let mut doc = ParsedDocument::new("doc", 10, 10);
    doc.children = vec![Node::Group(group), Node::Group(lonely)];

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.groups_created, 1);

    let grouped = scene.find_by_name("cluster").unwrap();
    assert_eq!(grouped.kind, BlockKind::Group);
    assert_eq!(grouped.children.len(), 2);
    assert!(scene.find_by_name("lonely").is_none());

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions {
        group_layers: false,
        ..ConvertOptions::default()
    })
    .unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.groups_created, 0);
    assert_eq!(scene.children(report.pages[0]).len(), 3);
}

#[test]
fn informational_warnings_do_not_stop_conversion() {
    let mut l = raster_layer("fx", 0, 0);
    l.has_effects = true;
    l.has_pixel_mask = true;
    l.clipping = true;
    let mut doc = ParsedDocument::new("doc", 4, 4);
    doc.children = vec![Node::Layer(l)];

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.layers_converted, 1);
    assert!(report.diagnostics.contains("layer effects"));
    assert!(report.diagnostics.contains("pixel masks"));
    assert!(report.diagnostics.contains("clipping masks"));
}

#[test]
fn raster_without_pixels_is_skipped() {
    let mut doc = ParsedDocument::new("doc", 4, 4);
    doc.children = vec![
        Node::Layer(LayerNode::new("empty", 0, 0, 0, 0)),
        Node::Layer(LayerNode::new("no pixels", 0, 0, 2, 2)),
    ];
    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();
    assert_eq!(report.layers_skipped, 2);
    assert!(report.diagnostics.contains("empty bounds"));
    assert!(report.diagnostics.contains("no composite"));
    assert_eq!(scene.len(), 1);
}

#[test]
fn vector_stroke_reads_style_descriptor() {
    use crate::document::descriptor::DescriptorValue as V;
    let color = Descriptor::new("RGBC")
        .with("Rd  ", V::Double(255.0))
        .with("Grn ", V::Double(0.0))
        .with("Bl  ", V::Double(0.0));
    let style = Descriptor::new("strokeStyle")
        .with("strokeEnabled", V::Bool(true))
        .with(
            "strokeStyleLineWidth",
            V::UnitFloat {
                unit: "#Pxl".to_string(),
                value: 3.0,
            },
        )
        .with(
            "strokeStyleOpacity",
            V::UnitFloat {
                unit: "#Prc".to_string(),
                value: 50.0,
            },
        )
        .with(
            "strokeStyleContent",
            V::Object(Descriptor::new("solidColorLayer").with("Clr ", V::Object(color))),
        );
    let stroke = vector_stroke(&style).unwrap();
    assert_eq!(stroke.width, 3.0);
    assert_eq!(stroke.color, Rgba::new(1.0, 0.0, 0.0, 0.5));

    let disabled = style.clone().with("strokeEnabled", V::Bool(false));
    assert!(vector_stroke(&disabled).is_none());
}

fn styled_text_layer(name: &str, text: &str, shape: TextShape) -> LayerNode {
    let len = text.chars().count();
    LayerNode {
        text: Some(TextPayload {
            text: text.to_string(),
            transform: None,
            descriptor: Descriptor::default(),
            engine: TextEngineData {
                run_lengths: vec![len],
                run_styles: vec![StyleSheet {
                    font_size: Some(10.0),
                    leading: Some(12.0),
                    ..StyleSheet::default()
                }],
                paragraph_lengths: vec![len],
                paragraph_sheets: vec![ParagraphSheet::default()],
                shape,
                ..TextEngineData::default()
            },
        }),
        ..LayerNode::new(name, 0, 0, 60, 20)
    }
}

#[test]
fn malformed_layers_are_skipped_and_siblings_still_convert() {
    let mut bad_runs = styled_text_layer("t", "Hello!", TextShape::Point);
    if let Some(text) = bad_runs.text.as_mut() {
        text.engine.run_lengths = vec![5, 1];
    }
    let mut short_pixels = raster_layer("short", 2, 2);
    short_pixels.composite = Some(RasterComposite {
        width: 2,
        height: 2,
        rgba8: std::sync::Arc::new(vec![0; 15]),
    });
    let mut doc = ParsedDocument::new("doc", 10, 10);
    doc.children = vec![
        Node::Layer(raster_layer("good", 0, 0)),
        Node::Layer(bad_runs),
        Node::Layer(short_pixels),
        Node::Layer(raster_layer("after", 3, 3)),
    ];

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();

    assert_eq!(report.layers_converted, 2);
    assert_eq!(report.layers_skipped, 2);
    assert!(report.diagnostics.contains("2 run lengths but 1 run styles"));
    assert!(report.diagnostics.contains("composite buffer has 15 bytes"));
    assert_eq!(report.diagnostics.count(Severity::Error), 2);
    assert!(scene.find_by_name("good").is_some());
    assert!(scene.find_by_name("after").is_some());
    assert!(scene.find_by_name("t").is_none());
    assert!(scene.find_by_name("short").is_none());
    // Page plus the two good layers.
    assert_eq!(scene.len(), 3);
}

#[test]
fn text_without_bounds_aborts_only_that_layer() {
    let mut broken = styled_text_layer("rotated", "Hi", TextShape::Point);
    if let Some(text) = broken.text.as_mut() {
        text.transform = Some(TextTransform::translate(5.0, 5.0));
    }
    let mut partial = styled_text_layer("partial", "Hi", TextShape::Point);
    if let Some(text) = partial.text.as_mut() {
        text.transform = Some(TextTransform::translate(5.0, 5.0));
        text.descriptor = Descriptor::default().with(
            "bounds",
            DescriptorValue::Object(
                Descriptor::new("bounds").with("Left", DescriptorValue::Double(0.0)),
            ),
        );
    }
    let mut doc = ParsedDocument::new("doc", 100, 100);
    doc.children = vec![
        Node::Layer(broken),
        Node::Layer(partial),
        Node::Layer(raster_layer("next", 1, 1)),
    ];

    let mut scene = MemoryScene::new();
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();

    assert!(report.diagnostics.contains("text bounds descriptor is missing"));
    assert!(report.diagnostics.contains("no usable 'Top' value"));
    assert_eq!(report.diagnostics.count(Severity::Error), 2);
    assert_eq!(report.layers_converted, 3);
    assert!(scene.find_by_name("next").is_some());
    // The aborted block keeps its raw content and nothing past the failure was applied.
    let rotated = scene.find_by_name("rotated").unwrap();
    assert_eq!(rotated.text.as_ref().unwrap().content, "Hi");
    assert_eq!(rotated.opacity, 1.0);
}

#[test]
fn ready_timeout_is_logged_and_measurement_continues() {
    let mut doc = ParsedDocument::new("doc", 100, 100);
    doc.children = vec![Node::Layer(styled_text_layer(
        "para",
        "aaaa bbbb",
        TextShape::Box,
    ))];

    let mut scene = MemoryScene::new().never_ready();
    let mut conv = Converter::new(ConvertOptions {
        ready_timeout_ms: 5,
        ..ConvertOptions::default()
    })
    .unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();

    assert_eq!(report.layers_converted, 1);
    let timeouts: Vec<&Diagnostic> = report
        .diagnostics
        .entries()
        .iter()
        .filter(|d| d.message.contains("not ready after 5 ms"))
        .collect();
    assert_eq!(timeouts.len(), 1);
    assert_eq!(timeouts[0].severity, Severity::Info);

    // The fit search ran afterwards and restored the fixed box.
    let para = scene.find_by_name("para").unwrap();
    assert_eq!(para.height_mode, SizeMode::Fixed);
    assert_eq!((para.size.width, para.size.height), (60.0, 20.0));
}

/// Delegates to [`MemoryScene`] but refuses to group sets containing `ungroupable`, and fails
/// grouping of sets containing `failing`.
struct PickyScene {
    inner: MemoryScene,
    ungroupable: &'static str,
    failing: &'static str,
}

impl PickyScene {
    fn has_member(&self, ids: &[BlockId], name: &str) -> bool {
        ids.iter()
            .any(|id| self.inner.block(*id).is_some_and(|b| b.name == name))
    }
}

impl SceneEngine for PickyScene {
    fn create_block(&mut self, kind: BlockKind) -> ConvertResult<BlockId> {
        self.inner.create_block(kind)
    }
    fn destroy_block(&mut self, id: BlockId) -> ConvertResult<()> {
        self.inner.destroy_block(id)
    }
    fn append_child(&mut self, parent: BlockId, child: BlockId) -> ConvertResult<()> {
        self.inner.append_child(parent, child)
    }
    fn block_exists(&self, id: BlockId) -> bool {
        self.inner.block_exists(id)
    }
    fn set_name(&mut self, id: BlockId, name: &str) -> ConvertResult<()> {
        self.inner.set_name(id, name)
    }
    fn set_position(&mut self, id: BlockId, pos: Point) -> ConvertResult<()> {
        self.inner.set_position(id, pos)
    }
    fn position(&self, id: BlockId) -> ConvertResult<Point> {
        self.inner.position(id)
    }
    fn set_size(&mut self, id: BlockId, size: Size) -> ConvertResult<()> {
        self.inner.set_size(id, size)
    }
    fn size(&self, id: BlockId) -> ConvertResult<Size> {
        self.inner.size(id)
    }
    fn set_size_mode(&mut self, id: BlockId, axis: Axis, mode: SizeMode) -> ConvertResult<()> {
        self.inner.set_size_mode(id, axis, mode)
    }
    fn size_mode(&self, id: BlockId, axis: Axis) -> ConvertResult<SizeMode> {
        self.inner.size_mode(id, axis)
    }
    fn set_rotation(&mut self, id: BlockId, radians: f64) -> ConvertResult<()> {
        self.inner.set_rotation(id, radians)
    }
    fn rotation(&self, id: BlockId) -> ConvertResult<f64> {
        self.inner.rotation(id)
    }
    fn set_opacity(&mut self, id: BlockId, opacity: f64) -> ConvertResult<()> {
        self.inner.set_opacity(id, opacity)
    }
    fn opacity(&self, id: BlockId) -> ConvertResult<f64> {
        self.inner.opacity(id)
    }
    fn set_blend_mode(&mut self, id: BlockId, mode: BlendMode) -> ConvertResult<()> {
        self.inner.set_blend_mode(id, mode)
    }
    fn set_visible(&mut self, id: BlockId, visible: bool) -> ConvertResult<()> {
        self.inner.set_visible(id, visible)
    }
    fn set_shape(&mut self, id: BlockId, shape: Shape) -> ConvertResult<()> {
        self.inner.set_shape(id, shape)
    }
    fn set_fill(&mut self, id: BlockId, fill: Option<Fill>) -> ConvertResult<()> {
        self.inner.set_fill(id, fill)
    }
    fn fill_kind(&self, id: BlockId) -> ConvertResult<FillKind> {
        self.inner.fill_kind(id)
    }
    fn set_stroke(&mut self, id: BlockId, stroke: Option<Stroke>) -> ConvertResult<()> {
        self.inner.set_stroke(id, stroke)
    }
    fn set_crop(&mut self, id: BlockId, crop: Crop) -> ConvertResult<()> {
        self.inner.set_crop(id, crop)
    }
    fn store_image(&mut self, uri: &str, png: Vec<u8>) -> ConvertResult<()> {
        self.inner.store_image(uri, png)
    }
    fn combine(&mut self, ids: &[BlockId], op: BooleanOp) -> ConvertResult<BlockId> {
        self.inner.combine(ids, op)
    }
    fn is_groupable(&self, ids: &[BlockId]) -> bool {
        !self.has_member(ids, self.ungroupable) && self.inner.is_groupable(ids)
    }
    fn group(&mut self, ids: &[BlockId]) -> ConvertResult<BlockId> {
        if self.has_member(ids, self.failing) {
            return Err(ConvertError::engine("group refused"));
        }
        self.inner.group(ids)
    }
    fn set_text(&mut self, id: BlockId, text: &str) -> ConvertResult<()> {
        self.inner.set_text(id, text)
    }
    fn text(&self, id: BlockId) -> ConvertResult<String> {
        self.inner.text(id)
    }
    fn replace_text(&mut self, id: BlockId, range: Range<usize>, text: &str) -> ConvertResult<()> {
        self.inner.replace_text(id, range, text)
    }
    fn set_text_case(
        &mut self,
        id: BlockId,
        range: Range<usize>,
        case: TextCase,
    ) -> ConvertResult<()> {
        self.inner.set_text_case(id, range, case)
    }
    fn can_toggle_bold(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool> {
        self.inner.can_toggle_bold(id, range)
    }
    fn toggle_bold(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()> {
        self.inner.toggle_bold(id, range)
    }
    fn can_toggle_italic(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool> {
        self.inner.can_toggle_italic(id, range)
    }
    fn toggle_italic(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()> {
        self.inner.toggle_italic(id, range)
    }
    fn set_text_color(
        &mut self,
        id: BlockId,
        range: Range<usize>,
        color: Rgba,
    ) -> ConvertResult<()> {
        self.inner.set_text_color(id, range, color)
    }
    fn set_typeface(&mut self, id: BlockId, typeface: &Typeface) -> ConvertResult<()> {
        self.inner.set_typeface(id, typeface)
    }
    fn set_font_size(&mut self, id: BlockId, size: f64) -> ConvertResult<()> {
        self.inner.set_font_size(id, size)
    }
    fn font_size(&self, id: BlockId) -> ConvertResult<f64> {
        self.inner.font_size(id)
    }
    fn set_letter_spacing(&mut self, id: BlockId, spacing: f64) -> ConvertResult<()> {
        self.inner.set_letter_spacing(id, spacing)
    }
    fn letter_spacing(&self, id: BlockId) -> ConvertResult<f64> {
        self.inner.letter_spacing(id)
    }
    fn set_line_height(&mut self, id: BlockId, factor: f64) -> ConvertResult<()> {
        self.inner.set_line_height(id, factor)
    }
    fn set_alignment(&mut self, id: BlockId, align: TextAlign) -> ConvertResult<()> {
        self.inner.set_alignment(id, align)
    }
    fn frame_height(&self, id: BlockId) -> ConvertResult<f64> {
        self.inner.frame_height(id)
    }
    fn wait_ready(&mut self, id: BlockId, timeout: Duration) -> ConvertResult<bool> {
        self.inner.wait_ready(id, timeout)
    }
}

#[test]
fn grouping_failures_are_logged_per_group() {
    let group = |id: u32, name: &str, members: [&str; 2]| {
        let mut g = GroupNode::new(name);
        g.id = Some(id);
        g.children = members
            .iter()
            .enumerate()
            .map(|(i, m)| Node::Layer(raster_layer(m, i as i32, 0)))
            .collect();
        Node::Group(g)
    };
    let mut doc = ParsedDocument::new("doc", 10, 10);
    doc.children = vec![
        group(1, "loose", ["u1", "u2"]),
        group(2, "broken", ["f1", "f2"]),
        group(3, "fine", ["ok1", "ok2"]),
    ];

    let mut scene = PickyScene {
        inner: MemoryScene::new(),
        ungroupable: "u1",
        failing: "f1",
    };
    let mut conv = Converter::new(ConvertOptions::default()).unwrap();
    let report = conv.convert(&mut scene, &doc).unwrap();

    assert_eq!(report.layers_converted, 6);
    assert_eq!(report.groups_created, 1);
    assert!(
        report
            .diagnostics
            .contains("blocks of group 'loose' cannot be grouped")
    );
    assert!(report.diagnostics.contains("grouping 'broken' failed"));
    assert_eq!(report.diagnostics.count(Severity::Warning), 2);

    let fine = scene.inner.find_by_name("fine").unwrap();
    assert_eq!(fine.kind, BlockKind::Group);
    assert!(scene.inner.find_by_name("loose").is_none());
    assert!(scene.inner.find_by_name("broken").is_none());
    // Four ungrouped blocks plus the 'fine' group.
    assert_eq!(scene.inner.children(report.pages[0]).len(), 5);
}
