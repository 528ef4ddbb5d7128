use crate::{
    convert::diagnostics::Diagnostics,
    foundation::core::{BlockId, Size},
    foundation::error::ConvertResult,
    scene::engine::{Axis, SceneEngine, SizeMode},
};

/// How the fit search ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitStatus {
    /// One step less spacing stops the overflow.
    PerfectFit,
    /// The search range narrowed to nothing; the widest non-overflowing value was kept.
    Narrowed,
    /// No tested value fit; baseline spacing restored.
    NoFit,
    /// Iteration budget exhausted; baseline spacing restored.
    Exhausted,
}

/// Outcome of [`fit_letter_spacing`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitOutcome {
    /// Letter spacing left on the block.
    pub spacing: f64,
    /// Search iterations used.
    pub iterations: u32,
    /// Termination reason.
    pub status: FitStatus,
}

struct Probe<'e> {
    engine: &'e mut dyn SceneEngine,
    block: BlockId,
    baseline: f64,
    step: f64,
    limit: f64,
}

impl Probe<'_> {
    fn overflows_at(&mut self, steps: i64) -> ConvertResult<bool> {
        self.engine
            .set_letter_spacing(self.block, self.baseline + steps as f64 * self.step)?;
        Ok(self.engine.frame_height(self.block)? > self.limit)
    }
}

/// Search the widest letter spacing that keeps auto-sized text inside the block's fixed height.
///
/// Spacing is `baseline + k * step` for integer `k` in `[-bound, bound]`, `bound` being
/// `ceil(sqrt(max_iterations))`. A value overflows when the laid-out height exceeds the fixed
/// height by more than half the font size. The block's fixed height mode and height are restored
/// whatever the outcome.
#[tracing::instrument(skip(engine, diagnostics))]
pub fn fit_letter_spacing(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    step: f64,
    max_iterations: u32,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<FitOutcome> {
    let original = engine.size(block)?;
    let original_mode = engine.size_mode(block, Axis::Height)?;
    engine.set_size_mode(block, Axis::Height, SizeMode::Auto)?;

    let result = search(engine, block, original.height, step, max_iterations, layer, diagnostics);

    engine.set_size(block, Size::new(original.width, original.height))?;
    engine.set_size_mode(block, Axis::Height, original_mode)?;
    result
}

fn search(
    engine: &mut dyn SceneEngine,
    block: BlockId,
    target_height: f64,
    step: f64,
    max_iterations: u32,
    layer: &str,
    diagnostics: &mut Diagnostics,
) -> ConvertResult<FitOutcome> {
    let baseline = engine.letter_spacing(block)?;
    let font_size = engine.font_size(block)?;
    let bound = f64::from(max_iterations).sqrt().ceil() as i64;
    let mut probe = Probe {
        engine,
        block,
        baseline,
        step,
        limit: target_height + font_size / 2.0,
    };

    let (mut low, mut high) = (-bound, bound);
    let mut iterations = 0u32;
    let mut best: Option<i64> = None;

    let status = loop {
        if low > high {
            break if best.is_some() {
                FitStatus::Narrowed
            } else {
                FitStatus::NoFit
            };
        }
        if iterations >= max_iterations {
            break FitStatus::Exhausted;
        }
        iterations += 1;

        let mid = (low + high).div_euclid(2);
        if probe.overflows_at(mid)? {
            if !probe.overflows_at(mid - 1)? {
                best = Some(mid - 1);
                break FitStatus::PerfectFit;
            }
            high = mid - 1;
        } else {
            best = Some(mid);
            low = mid + 1;
        }
    };

    let spacing = match (status, best) {
        (FitStatus::PerfectFit | FitStatus::Narrowed, Some(k)) => baseline + k as f64 * step,
        _ => baseline,
    };
    probe.engine.set_letter_spacing(block, spacing)?;

    match status {
        FitStatus::Exhausted => diagnostics.warn(
            Some(layer),
            format!("letter-spacing fit gave up after {iterations} iterations"),
        ),
        FitStatus::NoFit => diagnostics.warn(
            Some(layer),
            "text overflows its box at every tested letter spacing",
        ),
        _ => {}
    }
    tracing::debug!(?status, iterations, spacing, "letter-spacing fit finished");

    Ok(FitOutcome {
        spacing,
        iterations,
        status,
    })
}

#[cfg(test)]
#[path = "../../tests/unit/text/fit.rs"]
mod tests;
