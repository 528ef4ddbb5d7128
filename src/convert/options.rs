use std::time::Duration;

use crate::foundation::error::{ConvertError, ConvertResult};

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// Conversion settings.
///
/// Every field has a default, so an empty JSON object is a valid configuration.
pub struct ConvertOptions {
    /// Create hidden layers as invisible blocks instead of skipping them.
    #[serde(default)]
    pub create_hidden_layers: bool,
    /// Group blocks that shared a source group once the walk finished.
    #[serde(default = "default_true")]
    pub group_layers: bool,
    /// Target resolution; font sizes are scaled by `target_dpi / 72`.
    #[serde(default = "default_dpi")]
    pub target_dpi: f64,
    /// Run the letter-spacing fit search on paragraph text.
    #[serde(default = "default_true")]
    pub fit_text_boxes: bool,
    /// Letter-spacing increment of the fit search, in ems.
    #[serde(default = "default_fit_step")]
    pub fit_step: f64,
    /// Iteration budget of the fit search.
    #[serde(default = "default_fit_iterations")]
    pub fit_max_iterations: u32,
    /// How long to wait for a text block to become ready before measuring it.
    #[serde(default = "default_ready_timeout_ms")]
    pub ready_timeout_ms: u64,
    /// Straight-alpha RGBA8 background composited under raster layers before encoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raster_background: Option<[u8; 4]>,
    /// Character substituted for `{` and `}` of `{{...}}` tokens while styling text.
    #[serde(default = "default_placeholder")]
    pub text_variable_placeholder: char,
}

fn default_true() -> bool {
    true
}

fn default_dpi() -> f64 {
    72.0
}

fn default_fit_step() -> f64 {
    0.001
}

fn default_fit_iterations() -> u32 {
    500
}

fn default_ready_timeout_ms() -> u64 {
    1000
}

fn default_placeholder() -> char {
    '_'
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            create_hidden_layers: false,
            group_layers: true,
            target_dpi: default_dpi(),
            fit_text_boxes: true,
            fit_step: default_fit_step(),
            fit_max_iterations: default_fit_iterations(),
            ready_timeout_ms: default_ready_timeout_ms(),
            raster_background: None,
            text_variable_placeholder: default_placeholder(),
        }
    }
}

impl ConvertOptions {
    /// Parse options from JSON.
    pub fn from_json_str(s: &str) -> ConvertResult<Self> {
        let opts: Self = serde_json::from_str(s)
            .map_err(|e| ConvertError::serde(format!("parse options: {e}")))?;
        opts.validate()?;
        Ok(opts)
    }

    /// Validate numeric ranges.
    pub fn validate(&self) -> ConvertResult<()> {
        if !self.target_dpi.is_finite() || self.target_dpi <= 0.0 {
            return Err(ConvertError::validation("target_dpi must be finite and > 0"));
        }
        if !self.fit_step.is_finite() || self.fit_step <= 0.0 {
            return Err(ConvertError::validation("fit_step must be finite and > 0"));
        }
        if self.fit_max_iterations == 0 {
            return Err(ConvertError::validation("fit_max_iterations must be > 0"));
        }
        if matches!(self.text_variable_placeholder, '{' | '}') {
            return Err(ConvertError::validation(
                "text_variable_placeholder must not be a brace",
            ));
        }
        Ok(())
    }

    /// Font-size scale factor from points to target units.
    pub fn dpi_scale(&self) -> f64 {
        self.target_dpi / 72.0
    }

    /// Ready-wait timeout.
    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/convert/options.rs"]
mod tests;
