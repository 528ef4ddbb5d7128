#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
/// Diagnostic severity.
pub enum Severity {
    /// Informational note.
    Info,
    /// Best-effort substitution happened.
    Warning,
    /// Part of a layer could not be converted.
    Error,
}

#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
/// One diagnostic entry.
pub struct Diagnostic {
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
    /// Name of the layer the entry refers to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layer: Option<String>,
}

/// Append-only, ordered conversion log.
///
/// Every entry is mirrored as a `tracing` event at the matching level.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry.
    pub fn push(&mut self, severity: Severity, layer: Option<&str>, message: impl Into<String>) {
        let message = message.into();
        let layer = layer.map(str::to_owned);
        let name = layer.as_deref().unwrap_or("");
        match severity {
            Severity::Info => tracing::info!(layer = name, "{message}"),
            Severity::Warning => tracing::warn!(layer = name, "{message}"),
            Severity::Error => tracing::error!(layer = name, "{message}"),
        }
        self.entries.push(Diagnostic {
            severity,
            message,
            layer,
        });
    }

    /// Append an info entry.
    pub fn info(&mut self, layer: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Info, layer, message);
    }

    /// Append a warning.
    pub fn warn(&mut self, layer: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Warning, layer, message);
    }

    /// Append an error.
    pub fn error(&mut self, layer: Option<&str>, message: impl Into<String>) {
        self.push(Severity::Error, layer, message);
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` when nothing was logged.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.entries.iter().filter(|d| d.severity == severity).count()
    }

    /// Return `true` when any entry's message contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|d| d.message.contains(needle))
    }

    /// Move every entry of `other` to the end of this log without re-emitting events.
    pub fn extend(&mut self, other: Diagnostics) {
        self.entries.extend(other.entries);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/convert/diagnostics.rs"]
mod tests;
