use std::collections::HashMap;

use crate::{
    convert::blend::apply_blend_mode,
    convert::color::nested_color,
    convert::diagnostics::Diagnostics,
    convert::geometry::{apply_placement, layer_placement, text_placement, transform_scale},
    convert::mask::apply_clip_masks,
    convert::opacity::compose_opacity,
    convert::options::ConvertOptions,
    convert::path::reconstruct_path,
    document::descriptor::Descriptor,
    document::model::{GroupNode, LayerNode, Node, ParsedDocument, RasterComposite, VectorData},
    document::text::{TextPayload, TextShape},
    foundation::core::{BlockId, Canvas, Point, Rgba, Size, Vec2},
    foundation::error::ConvertResult,
    raster::png::{ImagePngEncoder, PngEncoder, buffer_uri},
    scene::engine::{Axis, BlockKind, Fill, SceneEngine, Shape, SizeMode, Stroke},
    text::fit::fit_letter_spacing,
    text::font::{
        FileFontMetricsLoader, FontInfoCache, FontMetrics, FontMetricsLoader, FontQuery,
        NoTypefaceResolver, TypefaceResolver, vertical_offset,
    },
    text::style::{first_font_name, flatten_text_style},
    text::variables::{escape_text_variables, restore_text_variables},
};

const UNSUPPORTED_FILL_GRAY: f64 = 0.5;

/// Content class of a leaf layer, computed once per layer, with the payload it converts from.
#[derive(Clone, Copy, Debug)]
pub enum LayerKind<'a> {
    /// Type layer.
    Text(&'a TextPayload),
    /// Shape layer.
    Vector(&'a VectorData),
    /// Pixel layer; the composite may be missing.
    Raster(Option<&'a RasterComposite>),
}

impl<'a> LayerKind<'a> {
    /// Classify a layer. Text wins over vector data; everything else is raster.
    pub fn classify(layer: &'a LayerNode) -> Self {
        if let Some(text) = &layer.text {
            Self::Text(text)
        } else if layer.vector.is_vector() {
            Self::Vector(&layer.vector)
        } else {
            Self::Raster(layer.composite.as_ref())
        }
    }

    /// Short lowercase label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Vector(_) => "vector",
            Self::Raster(_) => "raster",
        }
    }

    /// Return `true` for pixel layers.
    pub fn is_raster(&self) -> bool {
        matches!(self, Self::Raster(_))
    }

    /// Check the payload before any block is created.
    fn validate(&self) -> Result<(), String> {
        match self {
            Self::Text(text) => text.validate(),
            Self::Raster(Some(composite)) => composite.validate(),
            Self::Vector(_) | Self::Raster(None) => Ok(()),
        }
    }
}

/// Blocks created per source group, in first-seen order.
#[derive(Clone, Debug, Default)]
pub struct GroupMembership {
    index: HashMap<u32, usize>,
    groups: Vec<(u32, String, Vec<BlockId>)>,
}

impl GroupMembership {
    /// Record `block` as a member of source group `group_id`.
    pub fn record(&mut self, group_id: u32, group_name: &str, block: BlockId) {
        let i = *self.index.entry(group_id).or_insert_with(|| {
            self.groups.push((group_id, group_name.to_string(), Vec::new()));
            self.groups.len() - 1
        });
        self.groups[i].2.push(block);
    }

    /// Members of a source group.
    pub fn members(&self, group_id: u32) -> &[BlockId] {
        self.index
            .get(&group_id)
            .map(|&i| self.groups[i].2.as_slice())
            .unwrap_or(&[])
    }

    /// `(group id, group name, members)` in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &str, &[BlockId])> {
        self.groups
            .iter()
            .map(|(id, name, blocks)| (*id, name.as_str(), blocks.as_slice()))
    }

    /// Number of source groups seen.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Return `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Summary of one or more converted documents.
#[derive(Clone, Debug, Default, serde::Serialize)]
pub struct ConversionReport {
    /// Created pages, one per document.
    pub pages: Vec<BlockId>,
    /// Layers that produced a block.
    pub layers_converted: usize,
    /// Layers skipped (hidden, empty or failed).
    pub layers_skipped: usize,
    /// Groups created by the grouping phase.
    pub groups_created: usize,
    /// Conversion log.
    pub diagnostics: Diagnostics,
}

impl ConversionReport {
    fn merge(&mut self, other: ConversionReport) {
        self.pages.extend(other.pages);
        self.layers_converted += other.layers_converted;
        self.layers_skipped += other.layers_skipped;
        self.groups_created += other.groups_created;
        self.diagnostics.extend(other.diagnostics);
    }
}

/// Conversion session: options, collaborators and the per-session font metrics memo.
///
/// ```no_run
/// use psd2scene::{ConvertOptions, Converter, MemoryScene, ParsedDocument};
///
/// # fn main() -> anyhow::Result<()> {
/// let doc = ParsedDocument::from_json_str(&std::fs::read_to_string("doc.json")?)?;
/// let mut scene = MemoryScene::new();
/// let mut converter = Converter::new(ConvertOptions::default())?;
/// let report = converter.convert(&mut scene, &doc)?;
/// println!("{} layers, {} diagnostics", report.layers_converted, report.diagnostics.len());
/// # Ok(())
/// # }
/// ```
pub struct Converter {
    options: ConvertOptions,
    resolver: Box<dyn TypefaceResolver>,
    metrics: Box<dyn FontMetricsLoader>,
    encoder: Box<dyn PngEncoder>,
    fonts: FontInfoCache,
}

impl Converter {
    /// Session with validated options, no font catalog, file-based metrics and `image` PNG
    /// encoding.
    pub fn new(options: ConvertOptions) -> ConvertResult<Self> {
        options.validate()?;
        Ok(Self {
            options,
            resolver: Box::new(NoTypefaceResolver),
            metrics: Box::new(FileFontMetricsLoader),
            encoder: Box::new(ImagePngEncoder),
            fonts: FontInfoCache::new(),
        })
    }

    /// Use `resolver` for font matching.
    pub fn with_resolver(mut self, resolver: impl TypefaceResolver + 'static) -> Self {
        self.resolver = Box::new(resolver);
        self
    }

    /// Use `loader` for font metrics.
    pub fn with_metrics_loader(mut self, loader: impl FontMetricsLoader + 'static) -> Self {
        self.metrics = Box::new(loader);
        self
    }

    /// Use `encoder` for raster layers.
    pub fn with_encoder(mut self, encoder: impl PngEncoder + 'static) -> Self {
        self.encoder = Box::new(encoder);
        self
    }

    /// Session options.
    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Font metrics memo shared by every conversion of this session.
    pub fn font_cache(&self) -> &FontInfoCache {
        &self.fonts
    }

    /// Convert one document into a new page of `engine`.
    ///
    /// Only document-level failures are returned as errors; per-layer problems end up in the
    /// report's diagnostics.
    #[tracing::instrument(skip(self, engine, doc), fields(document = %doc.name))]
    pub fn convert(
        &mut self,
        engine: &mut dyn SceneEngine,
        doc: &ParsedDocument,
    ) -> ConvertResult<ConversionReport> {
        doc.validate()?;
        let canvas = doc.canvas()?;

        let page = engine.create_block(BlockKind::Page)?;
        engine.set_name(page, &doc.name)?;
        engine.set_position(page, Point::ZERO)?;
        engine.set_size(
            page,
            Size::new(f64::from(canvas.width), f64::from(canvas.height)),
        )?;

        let mut walk = Walk {
            options: &self.options,
            resolver: self.resolver.as_ref(),
            metrics: self.metrics.as_ref(),
            encoder: self.encoder.as_ref(),
            fonts: &mut self.fonts,
            engine,
            doc,
            canvas,
            page,
            diagnostics: Diagnostics::new(),
            membership: GroupMembership::default(),
            report: ConversionReport::default(),
        };
        let mut ancestors = Vec::new();
        walk.visit(&doc.children, &mut ancestors, false)?;
        if walk.options.group_layers {
            walk.group_members();
        }

        let Walk {
            diagnostics,
            mut report,
            ..
        } = walk;
        report.pages.push(page);
        report.diagnostics = diagnostics;
        tracing::debug!(
            layers = report.layers_converted,
            skipped = report.layers_skipped,
            groups = report.groups_created,
            "document converted"
        );
        Ok(report)
    }

    /// Convert several documents, one page each, in order.
    #[tracing::instrument(skip_all, fields(documents = docs.len()))]
    pub fn convert_pages(
        &mut self,
        engine: &mut dyn SceneEngine,
        docs: &[ParsedDocument],
    ) -> ConvertResult<ConversionReport> {
        let mut report = ConversionReport::default();
        for doc in docs {
            report.merge(self.convert(engine, doc)?);
        }
        Ok(report)
    }
}

struct Built {
    block: BlockId,
    complete: bool,
}

struct Walk<'a, 'd> {
    options: &'a ConvertOptions,
    resolver: &'a dyn TypefaceResolver,
    metrics: &'a dyn FontMetricsLoader,
    encoder: &'a dyn PngEncoder,
    fonts: &'a mut FontInfoCache,
    engine: &'a mut dyn SceneEngine,
    doc: &'d ParsedDocument,
    canvas: Canvas,
    page: BlockId,
    diagnostics: Diagnostics,
    membership: GroupMembership,
    report: ConversionReport,
}

impl<'d> Walk<'_, 'd> {
    fn visit(
        &mut self,
        nodes: &'d [Node],
        ancestors: &mut Vec<&'d GroupNode>,
        hidden: bool,
    ) -> ConvertResult<()> {
        for node in nodes {
            match node {
                Node::Group(group) => {
                    let hidden = hidden || !group.visible;
                    if hidden && !self.options.create_hidden_layers {
                        tracing::trace!(group = %group.name, "skipping hidden group");
                        continue;
                    }
                    ancestors.push(group);
                    let res = self.visit(&group.children, ancestors, hidden);
                    ancestors.pop();
                    res?;
                }
                Node::Layer(layer) => {
                    let hidden = hidden || !layer.visible;
                    if hidden && !self.options.create_hidden_layers {
                        tracing::trace!(layer = %layer.name, "skipping hidden layer");
                        self.report.layers_skipped += 1;
                        continue;
                    }
                    match self.convert_layer(layer, ancestors, hidden) {
                        Ok(Some(_)) => self.report.layers_converted += 1,
                        Ok(None) => self.report.layers_skipped += 1,
                        Err(e) if e.is_fatal() => return Err(e),
                        Err(e) => {
                            self.report.layers_skipped += 1;
                            self.diagnostics
                                .error(Some(&layer.name), format!("layer conversion failed: {e}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn convert_layer(
        &mut self,
        layer: &LayerNode,
        ancestors: &[&GroupNode],
        hidden: bool,
    ) -> ConvertResult<Option<BlockId>> {
        let kind = LayerKind::classify(layer);
        tracing::debug!(layer = %layer.name, kind = kind.label(), "visiting layer");
        if let Err(msg) = kind.validate() {
            self.diagnostics
                .error(Some(&layer.name), format!("malformed {} layer: {msg}", kind.label()));
            return Ok(None);
        }
        self.note_unsupported(layer);

        let built = match kind {
            LayerKind::Text(payload) => Some(self.build_text(layer, payload)?),
            LayerKind::Vector(vector) => Some(self.build_vector(layer, vector)?),
            LayerKind::Raster(composite) => self.build_raster(layer, composite)?,
        };
        let Some(Built {
            mut block,
            complete,
        }) = built
        else {
            return Ok(None);
        };

        self.engine.set_name(block, &layer.name)?;
        if hidden {
            self.engine.set_visible(block, false)?;
        }
        if !complete {
            return Ok(Some(block));
        }

        block = apply_clip_masks(
            &mut *self.engine,
            block,
            self.page,
            ancestors,
            self.canvas,
            &layer.name,
            &mut self.diagnostics,
        )?;
        apply_blend_mode(
            &mut *self.engine,
            block,
            layer.blend_mode,
            &layer.name,
            &mut self.diagnostics,
        )?;
        if let Some(group) = ancestors.last()
            && let Some(id) = group.id
        {
            self.membership.record(id, &group.name, block);
        }
        compose_opacity(
            &mut *self.engine,
            block,
            layer,
            ancestors,
            &mut self.diagnostics,
        )?;
        Ok(Some(block))
    }

    fn note_unsupported(&mut self, layer: &LayerNode) {
        let name = Some(layer.name.as_str());
        if layer.has_effects {
            self.diagnostics
                .warn(name, "layer effects are not supported and were ignored");
        }
        if layer.has_pixel_mask {
            self.diagnostics
                .warn(name, "pixel masks are not supported and were ignored");
        }
        if layer.clipping {
            self.diagnostics
                .warn(name, "clipping masks are not supported, layer is unclipped");
        }
    }

    fn new_block(&mut self, kind: BlockKind) -> ConvertResult<BlockId> {
        let block = self.engine.create_block(kind)?;
        self.engine.append_child(self.page, block)?;
        Ok(block)
    }

    fn build_raster(
        &mut self,
        layer: &LayerNode,
        composite: Option<&RasterComposite>,
    ) -> ConvertResult<Option<Built>> {
        let name = Some(layer.name.as_str());
        if layer.width == 0 || layer.height == 0 {
            self.diagnostics.warn(name, "raster layer has empty bounds, skipped");
            return Ok(None);
        }
        let Some(composite) = composite else {
            self.diagnostics.warn(name, "raster layer has no composite pixels, skipped");
            return Ok(None);
        };
        if composite.width == 0 || composite.height == 0 {
            self.diagnostics.warn(name, "raster layer has an empty composite, skipped");
            return Ok(None);
        }

        let png = self.encoder.encode(
            &composite.rgba8,
            composite.width,
            composite.height,
            self.options.raster_background,
        )?;
        let uri = buffer_uri(&png);
        self.engine.store_image(&uri, png)?;

        let block = self.new_block(BlockKind::Graphic)?;
        apply_placement(&mut *self.engine, block, &layer_placement(layer))?;
        self.engine.set_shape(block, Shape::Rect)?;
        self.engine.set_fill(
            block,
            Some(Fill::Image {
                uri,
                width: composite.width,
                height: composite.height,
            }),
        )?;
        Ok(Some(Built {
            block,
            complete: true,
        }))
    }

    fn build_vector(&mut self, layer: &LayerNode, vector: &VectorData) -> ConvertResult<Built> {
        let name = Some(layer.name.as_str());
        let block = self.new_block(BlockKind::Graphic)?;
        apply_placement(&mut *self.engine, block, &layer_placement(layer))?;

        let shape = match vector.path_records() {
            Some(records) if layer.width > 0 && layer.height > 0 => {
                let mut path = reconstruct_path(
                    records,
                    f64::from(self.canvas.width),
                    f64::from(self.canvas.height),
                    Vec2::new(-f64::from(layer.left), -f64::from(layer.top)),
                );
                path.width = f64::from(layer.width);
                path.height = f64::from(layer.height);
                Shape::Path(path)
            }
            _ => {
                self.diagnostics
                    .warn(name, "vector layer has no usable path, using its bounds");
                Shape::Rect
            }
        };
        self.engine.set_shape(block, shape)?;

        let style = vector.stroke_style.as_ref();
        let fill_enabled = style.and_then(|s| s.bool("fillEnabled")).unwrap_or(true);
        let fill = if fill_enabled {
            Some(Fill::Color(self.vector_fill_color(&layer.name, vector)))
        } else {
            None
        };
        self.engine.set_fill(block, fill)?;
        self.engine.set_stroke(block, style.and_then(vector_stroke))?;

        Ok(Built {
            block,
            complete: true,
        })
    }

    fn vector_fill_color(&mut self, layer: &str, vector: &VectorData) -> Rgba {
        let name = Some(layer);
        let gray = Rgba::opaque(UNSUPPORTED_FILL_GRAY, UNSUPPORTED_FILL_GRAY, UNSUPPORTED_FILL_GRAY);
        if let Some(content) = &vector.stroke_content {
            if content.contains("Grad") || content.contains("Ptrn") {
                self.diagnostics
                    .warn(name, "unsupported gradient fill, using a neutral gray");
                return gray;
            }
            if let Some(c) = nested_color(content, "Clr ") {
                return c;
            }
        }
        if let Some(c) = vector
            .solid_color
            .as_ref()
            .and_then(|d| nested_color(d, "Clr "))
        {
            return c;
        }
        self.diagnostics
            .warn(name, "vector layer has no fill color, using a neutral gray");
        gray
    }

    fn build_text(&mut self, layer: &LayerNode, payload: &TextPayload) -> ConvertResult<Built> {
        let name = layer.name.as_str();
        let block = self.new_block(BlockKind::Text)?;
        self.engine.set_text(block, &payload.text)?;

        let placement = match text_placement(layer, payload) {
            Ok(p) => p,
            Err(msg) => {
                self.diagnostics.error(Some(name), msg);
                return Ok(Built {
                    block,
                    complete: false,
                });
            }
        };
        apply_placement(&mut *self.engine, block, &placement)?;

        let metrics = self.apply_typeface(block, payload, name);

        let escaped =
            escape_text_variables(&mut *self.engine, block, self.options.text_variable_placeholder)?;
        let font_scale = self.options.dpi_scale() * transform_scale(payload.transform.as_ref());
        let style = flatten_text_style(
            &mut *self.engine,
            block,
            payload,
            self.doc.default_style.as_ref(),
            font_scale,
            name,
            &mut self.diagnostics,
        )?;
        restore_text_variables(&mut *self.engine, block, &escaped)?;

        match payload.engine.shape {
            TextShape::Box => {
                if self.options.fit_text_boxes {
                    let ready = self
                        .engine
                        .wait_ready(block, self.options.ready_timeout())?;
                    if !ready {
                        self.diagnostics.info(
                            Some(name),
                            format!(
                                "text block not ready after {} ms, measuring anyway",
                                self.options.ready_timeout_ms
                            ),
                        );
                    }
                    fit_letter_spacing(
                        &mut *self.engine,
                        block,
                        self.options.fit_step,
                        self.options.fit_max_iterations,
                        name,
                        &mut self.diagnostics,
                    )?;
                }
            }
            TextShape::Point => {
                self.engine.set_size_mode(block, Axis::Width, SizeMode::Auto)?;
                self.engine.set_size_mode(block, Axis::Height, SizeMode::Auto)?;
                if let (Some(m), Some(size)) = (metrics, style.font_size) {
                    let offset = vertical_offset(&m, size, style.line_height, payload.line_count());
                    let pos = self.engine.position(block)?;
                    self.engine
                        .set_position(block, Point::new(pos.x, pos.y - offset))?;
                }
            }
        }

        Ok(Built {
            block,
            complete: true,
        })
    }

    /// Resolve and apply the first run's font; returns its metrics when they could be loaded.
    fn apply_typeface(
        &mut self,
        block: BlockId,
        payload: &TextPayload,
        layer: &str,
    ) -> Option<FontMetrics> {
        let font_name = first_font_name(payload, self.doc.default_style.as_ref())?;
        let query = FontQuery::from_postscript_name(&font_name);
        let Some(resolved) = self.resolver.resolve(&query) else {
            self.diagnostics.warn(
                Some(layer),
                format!("no font match for '{font_name}', keeping the default typeface"),
            );
            return None;
        };
        if let Err(e) = self.engine.set_typeface(block, &resolved.typeface) {
            self.diagnostics
                .warn(Some(layer), format!("cannot apply typeface '{font_name}': {e}"));
            return None;
        }
        match self.fonts.get_or_load(&resolved.uri, self.metrics) {
            Ok(m) => Some(m),
            Err(e) => {
                self.diagnostics.warn(
                    Some(layer),
                    format!("unloadable font URI '{}': {e}", resolved.uri),
                );
                None
            }
        }
    }

    fn group_members(&mut self) {
        let groups: Vec<(String, Vec<BlockId>)> = self
            .membership
            .iter()
            .filter(|(_, _, blocks)| blocks.len() > 1)
            .map(|(_, name, blocks)| (name.to_string(), blocks.to_vec()))
            .collect();
        for (name, blocks) in groups {
            if !self.engine.is_groupable(&blocks) {
                self.diagnostics.warn(
                    None,
                    format!("blocks of group '{name}' cannot be grouped, left ungrouped"),
                );
                continue;
            }
            match self
                .engine
                .group(&blocks)
                .and_then(|g| self.engine.set_name(g, &name))
            {
                Ok(()) => self.report.groups_created += 1,
                Err(e) => self
                    .diagnostics
                    .warn(None, format!("grouping '{name}' failed: {e}")),
            }
        }
    }
}

fn vector_stroke(style: &Descriptor) -> Option<Stroke> {
    if !style.bool("strokeEnabled").unwrap_or(false) {
        return None;
    }
    let width = style
        .number("strokeStyleLineWidth")
        .filter(|w| w.is_finite() && *w > 0.0)
        .unwrap_or(1.0);
    let alpha = style
        .number("strokeStyleOpacity")
        .map(|pct| pct / 100.0)
        .unwrap_or(1.0);
    let color = style
        .object("strokeStyleContent")
        .and_then(|c| nested_color(c, "Clr "))
        .unwrap_or(Rgba::opaque(0.0, 0.0, 0.0))
        .with_alpha(alpha);
    Some(Stroke { color, width })
}

#[cfg(test)]
#[path = "../../tests/unit/convert/session.rs"]
mod tests;
