use std::collections::BTreeMap;

/// Raw Photoshop action descriptor, as produced by the external PSD decoder.
///
/// Keys are the four-character (or long-form) identifiers used by Photoshop, e.g. `"Rd  "`,
/// `"strokeStyleLineWidth"`. Lookups tolerate trailing-space differences so hand-written JSON
/// may use `"Rd"` instead of `"Rd  "`.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Descriptor {
    /// Descriptor class identifier (e.g. `"RGBC"`, `"Grdn"`).
    #[serde(default)]
    pub class_id: String,
    /// Descriptor items keyed by identifier.
    #[serde(default)]
    pub items: BTreeMap<String, DescriptorValue>,
}

/// One typed value inside a [`Descriptor`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorValue {
    /// `bool`
    Bool(bool),
    /// `long`
    Integer(i64),
    /// `doub`
    Double(f64),
    /// `UntF` / `UnFl`: value tagged with a unit (`#Pxl`, `#Prc`, `#Pnt`, ...).
    UnitFloat {
        /// Unit identifier.
        unit: String,
        /// Numeric value.
        value: f64,
    },
    /// `TEXT`
    Text(String),
    /// `enum`: enumeration type plus value.
    Enum {
        /// Enumeration type identifier.
        type_id: String,
        /// Enumeration value identifier.
        value: String,
    },
    /// `VlLs`
    List(Vec<DescriptorValue>),
    /// `Objc` / `GlbO`
    Object(Descriptor),
}

impl DescriptorValue {
    /// Numeric view of integer, double and unit-float values.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::UnitFloat { value, .. } => Some(*value),
            _ => None,
        }
    }

    /// Nested descriptor, if this value is an object.
    pub fn as_object(&self) -> Option<&Descriptor> {
        match self {
            Self::Object(d) => Some(d),
            _ => None,
        }
    }
}

impl Descriptor {
    /// Create an empty descriptor of the given class.
    pub fn new(class_id: impl Into<String>) -> Self {
        Self {
            class_id: class_id.into(),
            items: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: DescriptorValue) -> Self {
        self.items.insert(key.into(), value);
        self
    }

    /// Look up an item, ignoring trailing padding in keys.
    pub fn get(&self, key: &str) -> Option<&DescriptorValue> {
        if let Some(v) = self.items.get(key) {
            return Some(v);
        }
        let want = key.trim_end();
        self.items
            .iter()
            .find(|(k, _)| k.trim_end() == want)
            .map(|(_, v)| v)
    }

    /// Return `true` when `key` is present.
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Numeric item (integer, double or unit float).
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(DescriptorValue::as_f64)
    }

    /// Boolean item.
    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            DescriptorValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Text item.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            DescriptorValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Enumeration value of an item.
    pub fn enum_value(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            DescriptorValue::Enum { value, .. } => Some(value.as_str()),
            _ => None,
        }
    }

    /// Nested descriptor item.
    pub fn object(&self, key: &str) -> Option<&Descriptor> {
        self.get(key).and_then(DescriptorValue::as_object)
    }

    /// List item.
    pub fn list(&self, key: &str) -> Option<&[DescriptorValue]> {
        match self.get(key)? {
            DescriptorValue::List(v) => Some(v.as_slice()),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/document/descriptor.rs"]
mod tests;
