use std::{collections::BTreeMap, ops::Range, sync::Arc, time::Duration};

use crate::{
    convert::path::VectorPath,
    foundation::core::{Affine, BezPath, BlockId, Point, Rect, Rgba, Size},
    foundation::error::{ConvertError, ConvertResult},
    scene::engine::{
        Axis, BlendMode, BlockKind, BooleanOp, Crop, Fill, FillKind, SceneEngine, Shape,
        SizeMode, Stroke, TextAlign, TextCase, Typeface,
    },
};

const FLATTEN_TOLERANCE: f64 = 0.25;
const AREA_EPSILON: f64 = 1e-6;
/// Advance of one character in ems for the monospaced layout model.
const CHAR_ADVANCE_EM: f64 = 0.6;

/// Font variant a typeface may lack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontVariant {
    /// Bold face.
    Bold,
    /// Italic face.
    Italic,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Per-character styling of a text block.
pub struct CharStyle {
    /// Bold toggled on.
    #[serde(default)]
    pub bold: bool,
    /// Italic toggled on.
    #[serde(default)]
    pub italic: bool,
    /// Text color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Rgba>,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Text state of a text block.
pub struct TextContent {
    /// Text.
    pub content: String,
    /// One style per character of `content`.
    pub styles: Vec<CharStyle>,
    /// Applied typeface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typeface: Option<Typeface>,
    /// Font size in points.
    pub font_size: f64,
    /// Letter spacing in ems.
    pub letter_spacing: f64,
    /// Line height factor.
    pub line_height: f64,
    /// Alignment.
    pub align: TextAlign,
}

impl Default for TextContent {
    fn default() -> Self {
        Self {
            content: String::new(),
            styles: Vec::new(),
            typeface: None,
            font_size: 12.0,
            letter_spacing: 0.0,
            line_height: 1.2,
            align: TextAlign::Left,
        }
    }
}

impl TextContent {
    fn char_len(&self) -> usize {
        self.styles.len()
    }

    fn advance(&self) -> f64 {
        (self.font_size * (CHAR_ADVANCE_EM + self.letter_spacing)).max(0.0)
    }

    fn paragraphs(&self) -> impl Iterator<Item = &str> {
        self.content
            .strip_suffix(['\r', '\n'])
            .unwrap_or(&self.content)
            .split(['\r', '\n'])
    }

    /// Lines after greedy word wrapping at `width` (no wrapping without a width).
    fn line_count(&self, width: Option<f64>) -> usize {
        let advance = self.advance();
        self.paragraphs()
            .map(|para| {
                let Some(width) = width.filter(|_| advance > 0.0) else {
                    return 1;
                };
                let mut lines = 1;
                let mut line_w = 0.0;
                for word in para.split(' ') {
                    let w = word.chars().count() as f64 * advance;
                    if line_w == 0.0 {
                        line_w = w;
                    } else if line_w + advance + w <= width + 1e-9 {
                        line_w += advance + w;
                    } else {
                        lines += 1;
                        line_w = w;
                    }
                }
                lines
            })
            .sum()
    }

    fn layout_height(&self, width: Option<f64>) -> f64 {
        self.line_count(width) as f64 * self.font_size * self.line_height
    }

    fn layout_width(&self) -> f64 {
        let advance = self.advance();
        self.paragraphs()
            .map(|p| p.chars().count() as f64 * advance)
            .fold(0.0, f64::max)
    }

    fn check_range(&self, range: &Range<usize>) -> ConvertResult<()> {
        if range.start > range.end || range.end > self.char_len() {
            return Err(ConvertError::engine(format!(
                "text range {}..{} out of bounds for {} characters",
                range.start,
                range.end,
                self.char_len()
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One block of a [`MemoryScene`].
pub struct MemoryBlock {
    /// Block id.
    pub id: BlockId,
    /// Block kind.
    pub kind: BlockKind,
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Parent block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<BlockId>,
    /// Children in paint order.
    #[serde(default)]
    pub children: Vec<BlockId>,
    /// Top-left position in page coordinates.
    pub position: Point,
    /// Stored frame size.
    pub size: Size,
    /// Width sizing mode.
    pub width_mode: SizeMode,
    /// Height sizing mode.
    pub height_mode: SizeMode,
    /// Clockwise rotation in radians around the top-left corner.
    pub rotation: f64,
    /// Opacity.
    pub opacity: f64,
    /// Blend mode.
    pub blend_mode: BlendMode,
    /// Visibility.
    pub visible: bool,
    /// Outline.
    pub shape: Shape,
    /// Fill.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<Fill>,
    /// Stroke.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Stroke>,
    /// Content crop.
    pub crop: Crop,
    /// Text state of text blocks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
}

impl MemoryBlock {
    fn new(id: BlockId, kind: BlockKind) -> Self {
        Self {
            id,
            kind,
            name: String::new(),
            parent: None,
            children: Vec::new(),
            position: Point::ZERO,
            size: Size::ZERO,
            width_mode: SizeMode::Fixed,
            height_mode: SizeMode::Fixed,
            rotation: 0.0,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            visible: true,
            shape: Shape::Rect,
            fill: None,
            stroke: None,
            crop: Crop::default(),
            text: (kind == BlockKind::Text).then(TextContent::default),
        }
    }

    /// Frame size with auto-sized text axes resolved from layout.
    pub fn effective_size(&self) -> Size {
        let Some(text) = &self.text else {
            return self.size;
        };
        let width = match self.width_mode {
            SizeMode::Fixed => self.size.width,
            SizeMode::Auto => text.layout_width(),
        };
        let height = match self.height_mode {
            SizeMode::Fixed => self.size.height,
            SizeMode::Auto => {
                let wrap = (self.width_mode == SizeMode::Fixed).then_some(width);
                text.layout_height(wrap)
            }
        };
        Size::new(width, height)
    }

    /// Outline in page coordinates.
    pub fn outline(&self) -> BezPath {
        let size = self.effective_size();
        let local = match &self.shape {
            Shape::Rect => kurbo::Shape::to_path(&Rect::from_origin_size(Point::ZERO, size), 0.1),
            Shape::Path(p) => p.fitted_to(size.width, size.height),
        };
        let to_page = Affine::translate(self.position.to_vec2()) * Affine::rotate(self.rotation);
        to_page * local
    }
}

/// In-memory [`SceneEngine`].
///
/// Blocks live in an id-keyed map and form a parent/child tree; the whole scene serializes to
/// JSON. Text uses a monospaced layout model (advance `font_size * (0.6 + letter_spacing)`,
/// greedy word wrap at fixed widths). Boolean intersection clips flattened outlines with
/// Sutherland-Hodgman and therefore expects convex clip shapes.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct MemoryScene {
    blocks: BTreeMap<u64, MemoryBlock>,
    next_id: u64,
    #[serde(skip)]
    images: BTreeMap<String, Arc<Vec<u8>>>,
    #[serde(skip)]
    missing_variants: Vec<(String, FontVariant)>,
    #[serde(skip)]
    never_ready: bool,
}

impl MemoryScene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `family` as lacking `variant`, making the matching toggle impossible.
    pub fn without_variant(mut self, family: impl Into<String>, variant: FontVariant) -> Self {
        self.missing_variants.push((family.into(), variant));
        self
    }

    /// Make [`SceneEngine::wait_ready`] time out.
    pub fn never_ready(mut self) -> Self {
        self.never_ready = true;
        self
    }

    /// Block by id.
    pub fn block(&self, id: BlockId) -> Option<&MemoryBlock> {
        self.blocks.get(&id.0)
    }

    /// All live blocks in id order.
    pub fn blocks(&self) -> impl Iterator<Item = &MemoryBlock> {
        self.blocks.values()
    }

    /// Number of live blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Return `true` when the scene has no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Page blocks in creation order.
    pub fn pages(&self) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|b| b.kind == BlockKind::Page)
            .map(|b| b.id)
            .collect()
    }

    /// Children of a block.
    pub fn children(&self, id: BlockId) -> &[BlockId] {
        self.block(id).map(|b| b.children.as_slice()).unwrap_or(&[])
    }

    /// First block with the given name.
    pub fn find_by_name(&self, name: &str) -> Option<&MemoryBlock> {
        self.blocks.values().find(|b| b.name == name)
    }

    /// Encoded image bytes stored under `uri`.
    pub fn image(&self, uri: &str) -> Option<&[u8]> {
        self.images.get(uri).map(|b| b.as_slice())
    }

    /// Every stored image.
    pub fn images(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.images.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Serialize the scene as pretty JSON.
    pub fn to_json_pretty(&self) -> ConvertResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ConvertError::serde(format!("serialize scene: {e}")))
    }

    fn get(&self, id: BlockId) -> ConvertResult<&MemoryBlock> {
        self.blocks
            .get(&id.0)
            .ok_or_else(|| ConvertError::engine(format!("unknown block {id}")))
    }

    fn get_mut(&mut self, id: BlockId) -> ConvertResult<&mut MemoryBlock> {
        self.blocks
            .get_mut(&id.0)
            .ok_or_else(|| ConvertError::engine(format!("unknown block {id}")))
    }

    fn text_ref(&self, id: BlockId) -> ConvertResult<&TextContent> {
        self.get(id)?
            .text
            .as_ref()
            .ok_or_else(|| ConvertError::engine(format!("block {id} is not a text block")))
    }

    fn text_mut(&mut self, id: BlockId) -> ConvertResult<&mut TextContent> {
        self.get_mut(id)?
            .text
            .as_mut()
            .ok_or_else(|| ConvertError::engine(format!("block {id} is not a text block")))
    }

    fn detach(&mut self, id: BlockId) -> ConvertResult<Option<(BlockId, usize)>> {
        let Some(parent) = self.get(id)?.parent else {
            return Ok(None);
        };
        let siblings = &mut self.get_mut(parent)?.children;
        let index = siblings.iter().position(|c| *c == id);
        if let Some(i) = index {
            siblings.remove(i);
        }
        self.get_mut(id)?.parent = None;
        Ok(index.map(|i| (parent, i)))
    }

    fn insert_child(&mut self, parent: BlockId, index: usize, child: BlockId) -> ConvertResult<()> {
        let siblings = &mut self.get_mut(parent)?.children;
        let index = index.min(siblings.len());
        siblings.insert(index, child);
        self.get_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn is_ancestor(&self, candidate: BlockId, of: BlockId) -> bool {
        let mut cur = self.block(of).and_then(|b| b.parent);
        while let Some(p) = cur {
            if p == candidate {
                return true;
            }
            cur = self.block(p).and_then(|b| b.parent);
        }
        false
    }

    fn alloc(&mut self, kind: BlockKind) -> BlockId {
        self.next_id += 1;
        let id = BlockId(self.next_id);
        self.blocks.insert(id.0, MemoryBlock::new(id, kind));
        id
    }

    fn lacks_variant(&self, id: BlockId, variant: FontVariant) -> ConvertResult<bool> {
        let family = self
            .text_ref(id)?
            .typeface
            .as_ref()
            .map(|t| t.family.as_str())
            .unwrap_or("");
        Ok(self
            .missing_variants
            .iter()
            .any(|(f, v)| *v == variant && f == family))
    }

    fn intersect(&self, ids: &[BlockId]) -> ConvertResult<Vec<Point>> {
        let mut subject = polygon(&self.get(ids[0])?.outline());
        for &id in &ids[1..] {
            let mut clip = polygon(&self.get(id)?.outline());
            if signed_area(&clip) < 0.0 {
                clip.reverse();
            }
            subject = clip_polygon(&subject, &clip);
            if subject.len() < 3 {
                break;
            }
        }
        if subject.len() < 3 || signed_area(&subject).abs() < AREA_EPSILON {
            return Err(ConvertError::engine("intersection is empty"));
        }
        Ok(subject)
    }
}

/// Vertices of the first subpath of a flattened path.
fn polygon(path: &BezPath) -> Vec<Point> {
    let mut points = Vec::new();
    let mut done = false;
    kurbo::flatten(path.iter(), FLATTEN_TOLERANCE, |el| {
        if done {
            return;
        }
        match el {
            kurbo::PathEl::MoveTo(p) => {
                if points.is_empty() {
                    points.push(p);
                } else {
                    done = true;
                }
            }
            kurbo::PathEl::LineTo(p) => {
                if points.last().is_none_or(|last: &Point| last.distance(p) > 1e-9) {
                    points.push(p);
                }
            }
            kurbo::PathEl::ClosePath => done = true,
            _ => {}
        }
    });
    if points.len() > 1 && points[0].distance(points[points.len() - 1]) <= 1e-9 {
        points.pop();
    }
    points
}

fn signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    (0..n)
        .map(|i| {
            let a = points[i];
            let b = points[(i + 1) % n];
            a.x * b.y - b.x * a.y
        })
        .sum::<f64>()
        / 2.0
}

fn is_inside(a: Point, b: Point, p: Point) -> bool {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= -1e-9
}

fn line_intersection(a: Point, b: Point, c: Point, d: Point) -> Point {
    let a1 = b.y - a.y;
    let b1 = a.x - b.x;
    let c1 = a1 * a.x + b1 * a.y;
    let a2 = d.y - c.y;
    let b2 = c.x - d.x;
    let c2 = a2 * c.x + b2 * c.y;
    let det = a1 * b2 - a2 * b1;
    if det.abs() < 1e-12 {
        return c;
    }
    Point::new((b2 * c1 - b1 * c2) / det, (a1 * c2 - a2 * c1) / det)
}

/// Sutherland-Hodgman: clip `subject` by the convex, positively oriented `clip` polygon.
fn clip_polygon(subject: &[Point], clip: &[Point]) -> Vec<Point> {
    let mut output = subject.to_vec();
    for i in 0..clip.len() {
        if output.is_empty() {
            break;
        }
        let (a, b) = (clip[i], clip[(i + 1) % clip.len()]);
        let input = std::mem::take(&mut output);
        let mut s = input[input.len() - 1];
        for &e in &input {
            if is_inside(a, b, e) {
                if !is_inside(a, b, s) {
                    output.push(line_intersection(a, b, s, e));
                }
                output.push(e);
            } else if is_inside(a, b, s) {
                output.push(line_intersection(a, b, s, e));
            }
            s = e;
        }
    }
    output
}

impl SceneEngine for MemoryScene {
    fn create_block(&mut self, kind: BlockKind) -> ConvertResult<BlockId> {
        Ok(self.alloc(kind))
    }

    fn destroy_block(&mut self, id: BlockId) -> ConvertResult<()> {
        self.detach(id)?;
        let mut stack = vec![id];
        while let Some(cur) = stack.pop() {
            if let Some(b) = self.blocks.remove(&cur.0) {
                stack.extend(b.children);
            }
        }
        Ok(())
    }

    fn append_child(&mut self, parent: BlockId, child: BlockId) -> ConvertResult<()> {
        self.get(parent)?;
        self.get(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(ConvertError::engine(format!(
                "cannot append {child} to its own descendant {parent}"
            )));
        }
        self.detach(child)?;
        let len = self.get(parent)?.children.len();
        self.insert_child(parent, len, child)
    }

    fn block_exists(&self, id: BlockId) -> bool {
        self.blocks.contains_key(&id.0)
    }

    fn set_name(&mut self, id: BlockId, name: &str) -> ConvertResult<()> {
        self.get_mut(id)?.name = name.to_string();
        Ok(())
    }

    fn set_position(&mut self, id: BlockId, pos: Point) -> ConvertResult<()> {
        self.get_mut(id)?.position = pos;
        Ok(())
    }

    fn position(&self, id: BlockId) -> ConvertResult<Point> {
        Ok(self.get(id)?.position)
    }

    fn set_size(&mut self, id: BlockId, size: Size) -> ConvertResult<()> {
        let b = self.get_mut(id)?;
        b.size = size;
        b.width_mode = SizeMode::Fixed;
        b.height_mode = SizeMode::Fixed;
        Ok(())
    }

    fn size(&self, id: BlockId) -> ConvertResult<Size> {
        Ok(self.get(id)?.effective_size())
    }

    fn set_size_mode(&mut self, id: BlockId, axis: Axis, mode: SizeMode) -> ConvertResult<()> {
        let b = self.get_mut(id)?;
        // Freeze the laid-out extent when an auto axis becomes fixed.
        let current = b.effective_size();
        match axis {
            Axis::Width => {
                if mode == SizeMode::Fixed && b.width_mode == SizeMode::Auto {
                    b.size.width = current.width;
                }
                b.width_mode = mode;
            }
            Axis::Height => {
                if mode == SizeMode::Fixed && b.height_mode == SizeMode::Auto {
                    b.size.height = current.height;
                }
                b.height_mode = mode;
            }
        }
        Ok(())
    }

    fn size_mode(&self, id: BlockId, axis: Axis) -> ConvertResult<SizeMode> {
        let b = self.get(id)?;
        Ok(match axis {
            Axis::Width => b.width_mode,
            Axis::Height => b.height_mode,
        })
    }

    fn set_rotation(&mut self, id: BlockId, radians: f64) -> ConvertResult<()> {
        self.get_mut(id)?.rotation = radians;
        Ok(())
    }

    fn rotation(&self, id: BlockId) -> ConvertResult<f64> {
        Ok(self.get(id)?.rotation)
    }

    fn set_opacity(&mut self, id: BlockId, opacity: f64) -> ConvertResult<()> {
        if !opacity.is_finite() {
            return Err(ConvertError::engine("opacity must be finite"));
        }
        self.get_mut(id)?.opacity = opacity.clamp(0.0, 1.0);
        Ok(())
    }

    fn opacity(&self, id: BlockId) -> ConvertResult<f64> {
        Ok(self.get(id)?.opacity)
    }

    fn set_blend_mode(&mut self, id: BlockId, mode: BlendMode) -> ConvertResult<()> {
        self.get_mut(id)?.blend_mode = mode;
        Ok(())
    }

    fn set_visible(&mut self, id: BlockId, visible: bool) -> ConvertResult<()> {
        self.get_mut(id)?.visible = visible;
        Ok(())
    }

    fn set_shape(&mut self, id: BlockId, shape: Shape) -> ConvertResult<()> {
        self.get_mut(id)?.shape = shape;
        Ok(())
    }

    fn set_fill(&mut self, id: BlockId, fill: Option<Fill>) -> ConvertResult<()> {
        self.get_mut(id)?.fill = fill;
        Ok(())
    }

    fn fill_kind(&self, id: BlockId) -> ConvertResult<FillKind> {
        Ok(self
            .get(id)?
            .fill
            .as_ref()
            .map(Fill::kind)
            .unwrap_or(FillKind::None))
    }

    fn set_stroke(&mut self, id: BlockId, stroke: Option<Stroke>) -> ConvertResult<()> {
        self.get_mut(id)?.stroke = stroke;
        Ok(())
    }

    fn set_crop(&mut self, id: BlockId, crop: Crop) -> ConvertResult<()> {
        self.get_mut(id)?.crop = crop;
        Ok(())
    }

    fn store_image(&mut self, uri: &str, png: Vec<u8>) -> ConvertResult<()> {
        self.images.insert(uri.to_string(), Arc::new(png));
        Ok(())
    }

    fn combine(&mut self, ids: &[BlockId], op: BooleanOp) -> ConvertResult<BlockId> {
        if op != BooleanOp::Intersection {
            return Err(ConvertError::engine(format!("unsupported boolean operation {op:?}")));
        }
        if ids.len() < 2 {
            return Err(ConvertError::engine("combine needs at least two blocks"));
        }
        for &id in ids {
            self.get(id)?;
        }

        let points = self.intersect(ids)?;
        let bounds = points
            .iter()
            .skip(1)
            .fold(Rect::from_points(points[0], points[0]), |r, p| r.union_pt(*p));
        if bounds.width() <= 0.0 || bounds.height() <= 0.0 {
            return Err(ConvertError::engine("intersection is degenerate"));
        }
        let origin = bounds.origin().to_vec2();
        let local: Vec<Point> = points.iter().map(|p| *p - origin).collect();

        let first = self.get(ids[0])?.clone();
        let id = self.alloc(BlockKind::Graphic);
        {
            let b = self.get_mut(id)?;
            b.name = first.name.clone();
            b.position = bounds.origin();
            b.size = bounds.size();
            b.opacity = first.opacity;
            b.blend_mode = first.blend_mode;
            b.visible = first.visible;
            b.fill = first.fill.clone();
            b.stroke = first.stroke;
            b.shape = Shape::Path(VectorPath::polygon(&local, bounds.width(), bounds.height()));
        }
        if let Some(parent) = first.parent {
            let index = self
                .children(parent)
                .iter()
                .position(|c| *c == ids[0])
                .unwrap_or(usize::MAX);
            self.insert_child(parent, index, id)?;
        }
        for &input in ids {
            self.destroy_block(input)?;
        }
        Ok(id)
    }

    fn is_groupable(&self, ids: &[BlockId]) -> bool {
        if ids.len() < 2 {
            return false;
        }
        let Some(parent) = self.block(ids[0]).and_then(|b| b.parent) else {
            return false;
        };
        ids.iter().enumerate().all(|(i, id)| {
            !ids[..i].contains(id)
                && self
                    .block(*id)
                    .is_some_and(|b| b.parent == Some(parent) && b.kind != BlockKind::Page)
        })
    }

    fn group(&mut self, ids: &[BlockId]) -> ConvertResult<BlockId> {
        if !self.is_groupable(ids) {
            return Err(ConvertError::engine("blocks cannot be grouped"));
        }
        let parent = self.get(ids[0])?.parent.ok_or_else(|| ConvertError::engine("no parent"))?;
        let index = ids
            .iter()
            .filter_map(|id| self.children(parent).iter().position(|c| c == id))
            .min()
            .unwrap_or(usize::MAX);

        let mut bounds: Option<Rect> = None;
        for &id in ids {
            let r = kurbo::Shape::bounding_box(&self.get(id)?.outline());
            bounds = Some(bounds.map_or(r, |b| b.union(r)));
        }
        let bounds = bounds.unwrap_or(Rect::ZERO);

        let group = self.alloc(BlockKind::Group);
        {
            let g = self.get_mut(group)?;
            g.position = bounds.origin();
            g.size = bounds.size();
        }
        for &id in ids {
            self.detach(id)?;
            let len = self.get(group)?.children.len();
            self.insert_child(group, len, id)?;
        }
        self.insert_child(parent, index, group)?;
        Ok(group)
    }

    fn set_text(&mut self, id: BlockId, text: &str) -> ConvertResult<()> {
        let t = self.text_mut(id)?;
        t.content = text.to_string();
        t.styles = vec![CharStyle::default(); text.chars().count()];
        Ok(())
    }

    fn text(&self, id: BlockId) -> ConvertResult<String> {
        Ok(self.text_ref(id)?.content.clone())
    }

    fn replace_text(&mut self, id: BlockId, range: Range<usize>, text: &str) -> ConvertResult<()> {
        let t = self.text_mut(id)?;
        t.check_range(&range)?;
        let style = t
            .styles
            .get(range.start)
            .or_else(|| range.start.checked_sub(1).and_then(|i| t.styles.get(i)))
            .cloned()
            .unwrap_or_default();
        let mut chars: Vec<char> = t.content.chars().collect();
        let new: Vec<char> = text.chars().collect();
        let n = new.len();
        chars.splice(range.clone(), new);
        t.styles.splice(range, std::iter::repeat_n(style, n));
        t.content = chars.into_iter().collect();
        Ok(())
    }

    fn set_text_case(
        &mut self,
        id: BlockId,
        range: Range<usize>,
        case: TextCase,
    ) -> ConvertResult<()> {
        let t = self.text_mut(id)?;
        t.check_range(&range)?;
        let mut chars: Vec<char> = t.content.chars().collect();
        let mut prev_alpha = range.start > 0 && chars[range.start - 1].is_alphanumeric();
        for ch in &mut chars[range] {
            let mapped: Vec<char> = match case {
                TextCase::Normal => vec![*ch],
                TextCase::Lowercase => ch.to_lowercase().collect(),
                TextCase::Uppercase => ch.to_uppercase().collect(),
                TextCase::Titlecase if prev_alpha => ch.to_lowercase().collect(),
                TextCase::Titlecase => ch.to_uppercase().collect(),
            };
            prev_alpha = ch.is_alphanumeric();
            // Multi-char mappings would shift style ranges; keep the original char instead.
            if let [single] = mapped.as_slice() {
                *ch = *single;
            }
        }
        t.content = chars.into_iter().collect();
        Ok(())
    }

    fn can_toggle_bold(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool> {
        self.text_ref(id)?.check_range(&range)?;
        Ok(!self.lacks_variant(id, FontVariant::Bold)?)
    }

    fn toggle_bold(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()> {
        if !self.can_toggle_bold(id, range.clone())? {
            return Err(ConvertError::engine("typeface has no bold variant"));
        }
        for s in &mut self.text_mut(id)?.styles[range] {
            s.bold = !s.bold;
        }
        Ok(())
    }

    fn can_toggle_italic(&self, id: BlockId, range: Range<usize>) -> ConvertResult<bool> {
        self.text_ref(id)?.check_range(&range)?;
        Ok(!self.lacks_variant(id, FontVariant::Italic)?)
    }

    fn toggle_italic(&mut self, id: BlockId, range: Range<usize>) -> ConvertResult<()> {
        if !self.can_toggle_italic(id, range.clone())? {
            return Err(ConvertError::engine("typeface has no italic variant"));
        }
        for s in &mut self.text_mut(id)?.styles[range] {
            s.italic = !s.italic;
        }
        Ok(())
    }

    fn set_text_color(
        &mut self,
        id: BlockId,
        range: Range<usize>,
        color: Rgba,
    ) -> ConvertResult<()> {
        let t = self.text_mut(id)?;
        t.check_range(&range)?;
        for s in &mut t.styles[range] {
            s.color = Some(color);
        }
        Ok(())
    }

    fn set_typeface(&mut self, id: BlockId, typeface: &Typeface) -> ConvertResult<()> {
        self.text_mut(id)?.typeface = Some(typeface.clone());
        Ok(())
    }

    fn set_font_size(&mut self, id: BlockId, size: f64) -> ConvertResult<()> {
        if !size.is_finite() || size <= 0.0 {
            return Err(ConvertError::engine("font size must be finite and > 0"));
        }
        self.text_mut(id)?.font_size = size;
        Ok(())
    }

    fn font_size(&self, id: BlockId) -> ConvertResult<f64> {
        Ok(self.text_ref(id)?.font_size)
    }

    fn set_letter_spacing(&mut self, id: BlockId, spacing: f64) -> ConvertResult<()> {
        self.text_mut(id)?.letter_spacing = spacing;
        Ok(())
    }

    fn letter_spacing(&self, id: BlockId) -> ConvertResult<f64> {
        Ok(self.text_ref(id)?.letter_spacing)
    }

    fn set_line_height(&mut self, id: BlockId, factor: f64) -> ConvertResult<()> {
        self.text_mut(id)?.line_height = factor;
        Ok(())
    }

    fn set_alignment(&mut self, id: BlockId, align: TextAlign) -> ConvertResult<()> {
        self.text_mut(id)?.align = align;
        Ok(())
    }

    fn frame_height(&self, id: BlockId) -> ConvertResult<f64> {
        let b = self.get(id)?;
        let t = self.text_ref(id)?;
        let wrap = (b.width_mode == SizeMode::Fixed).then_some(b.size.width);
        Ok(t.layout_height(wrap))
    }

    fn wait_ready(&mut self, id: BlockId, _timeout: Duration) -> ConvertResult<bool> {
        self.get(id)?;
        Ok(!self.never_ready)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/memory.rs"]
mod tests;
