use std::fmt::Write as _;

use crate::{
    document::model::{Knot, PathPoint, PathRecord},
    foundation::core::{Affine, BezPath, Point, Vec2},
    foundation::math::unwrap_signed_coord,
};

#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
/// One drawing command of a [`VectorPath`].
pub enum PathCommand {
    /// Start a subpath.
    MoveTo {
        /// Target point.
        to: Point,
    },
    /// Straight segment.
    LineTo {
        /// Target point.
        to: Point,
    },
    /// Cubic Bezier segment.
    CubicTo {
        /// First control point.
        c1: Point,
        /// Second control point.
        c2: Point,
        /// Target point.
        to: Point,
    },
    /// Close the current subpath.
    Close,
}

impl PathCommand {
    fn map(self, f: impl Fn(Point) -> Point) -> Self {
        match self {
            Self::MoveTo { to } => Self::MoveTo { to: f(to) },
            Self::LineTo { to } => Self::LineTo { to: f(to) },
            Self::CubicTo { c1, c2, to } => Self::CubicTo {
                c1: f(c1),
                c2: f(c2),
                to: f(to),
            },
            Self::Close => Self::Close,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
/// Path description in pixel space, together with the frame it was normalized against.
pub struct VectorPath {
    /// Drawing commands.
    pub commands: Vec<PathCommand>,
    /// Reference frame width.
    pub width: f64,
    /// Reference frame height.
    pub height: f64,
}

impl VectorPath {
    /// Return `true` when the path has no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Return `true` when the path ends with a close command.
    pub fn is_closed(&self) -> bool {
        matches!(self.commands.last(), Some(PathCommand::Close))
    }

    /// Number of cubic segments.
    pub fn curve_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, PathCommand::CubicTo { .. }))
            .count()
    }

    /// Closed polygon path through `points`, relative to a `width` x `height` frame.
    pub fn polygon(points: &[Point], width: f64, height: f64) -> Self {
        let mut commands = Vec::with_capacity(points.len() + 1);
        for (i, &p) in points.iter().enumerate() {
            commands.push(if i == 0 {
                PathCommand::MoveTo { to: p }
            } else {
                PathCommand::LineTo { to: p }
            });
        }
        if !commands.is_empty() {
            commands.push(PathCommand::Close);
        }
        Self {
            commands,
            width,
            height,
        }
    }

    /// Translate every point.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self {
            commands: self.commands.iter().map(|c| c.map(|p| p + delta)).collect(),
            width: self.width,
            height: self.height,
        }
    }

    /// Convert to a kurbo path.
    pub fn to_bez_path(&self) -> BezPath {
        let mut out = BezPath::new();
        for c in &self.commands {
            match *c {
                PathCommand::MoveTo { to } => out.move_to(to),
                PathCommand::LineTo { to } => out.line_to(to),
                PathCommand::CubicTo { c1, c2, to } => out.curve_to(c1, c2, to),
                PathCommand::Close => out.close_path(),
            }
        }
        out
    }

    /// Kurbo path stretched from the reference frame onto a `width` x `height` frame.
    pub fn fitted_to(&self, width: f64, height: f64) -> BezPath {
        let sx = if self.width > 0.0 { width / self.width } else { 1.0 };
        let sy = if self.height > 0.0 { height / self.height } else { 1.0 };
        Affine::scale_non_uniform(sx, sy) * self.to_bez_path()
    }

    /// SVG path data (`M`, `L`, `C`, `Z`).
    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        for c in &self.commands {
            if !out.is_empty() {
                out.push(' ');
            }
            // Writing to a String cannot fail.
            let _ = match *c {
                PathCommand::MoveTo { to } => write!(out, "M {} {}", to.x, to.y),
                PathCommand::LineTo { to } => write!(out, "L {} {}", to.x, to.y),
                PathCommand::CubicTo { c1, c2, to } => write!(
                    out,
                    "C {} {} {} {} {} {}",
                    c1.x, c1.y, c2.x, c2.y, to.x, to.y
                ),
                PathCommand::Close => write!(out, "Z"),
            };
        }
        out
    }
}

/// Rebuild a smooth path from vector path records.
///
/// Record coordinates live in the unit square (with the signed wraparound encoding); they are
/// decoded, scaled by `width`/`height` and shifted by `offset`. Every knot contributes one cubic
/// segment from the previous knot's outgoing control point. A single open knot makes the
/// whole path open; closed paths get a closing segment back to the first knot and a close
/// command.
pub fn reconstruct_path(
    records: &[PathRecord],
    width: f64,
    height: f64,
    offset: Vec2,
) -> VectorPath {
    let to_px = |p: PathPoint| {
        Point::new(
            unwrap_signed_coord(p.x) * width + offset.x,
            unwrap_signed_coord(p.y) * height + offset.y,
        )
    };

    let mut commands = Vec::new();
    let mut first: Option<Knot> = None;
    let mut previous: Option<Knot> = None;
    let mut open = false;

    for record in records {
        match record {
            PathRecord::Knot(knot) => {
                open |= !knot.closed;
                if let Some(prev) = previous {
                    commands.push(PathCommand::CubicTo {
                        c1: to_px(prev.leaving),
                        c2: to_px(knot.preceding),
                        to: to_px(knot.anchor),
                    });
                } else {
                    first = Some(*knot);
                }
                previous = Some(*knot);
            }
            PathRecord::FillRule { initial_fill } => {
                tracing::trace!(initial_fill, "fill rule record has no target equivalent");
            }
            PathRecord::SubpathLength { .. } => {}
        }
    }

    let (Some(first), Some(last)) = (first, previous) else {
        return VectorPath {
            commands,
            width,
            height,
        };
    };

    let start = to_px(first.anchor);
    let mut out = Vec::with_capacity(commands.len() + 3);
    out.push(PathCommand::MoveTo { to: start });
    if open {
        out.push(PathCommand::CubicTo {
            c1: start,
            c2: start,
            to: start,
        });
    }
    out.extend(commands);
    if !open {
        out.push(PathCommand::CubicTo {
            c1: to_px(last.leaving),
            c2: to_px(first.preceding),
            to: start,
        });
        out.push(PathCommand::Close);
    }

    VectorPath {
        commands: out,
        width,
        height,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/convert/path.rs"]
mod tests;
