use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(rename_all = "lowercase"))]
pub enum Datatype {
    Text,
    /// Long-form HTML or Markdown text
    Comments,
    /// Named series, paired with a numeric index sibling column
    Series,
    /// Text restricted to a fixed set of values
    Enumeration,
    Int,
    Float,
    Bool,
    /// Star rating, stored as an integer from 0 to 10
    Rating,
    DateTime,
    /// Computed from other fields at read time, never stored
    Composite,
}
impl Datatype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Datatype::Text => "text",
            Datatype::Comments => "comments",
            Datatype::Series => "series",
            Datatype::Enumeration => "enumeration",
            Datatype::Int => "int",
            Datatype::Float => "float",
            Datatype::Bool => "bool",
            Datatype::Rating => "rating",
            Datatype::DateTime => "datetime",
            Datatype::Composite => "composite",
        }
    }
}
impl FromStr for Datatype {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "text" => Self::Text,
            "comments" => Self::Comments,
            "series" => Self::Series,
            "enumeration" => Self::Enumeration,
            "int" | "integer" => Self::Int,
            "float" => Self::Float,
            "bool" | "boolean" => Self::Bool,
            "rating" => Self::Rating,
            "datetime" | "date" => Self::DateTime,
            "composite" => Self::Composite,
            _ => return Err(format!("unknown datatype: {s}")),
        })
    }
}
impl Display for Datatype {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Schema of one column, as declared by the backend.
///
/// Custom columns are addressed by their key, which is the label prefixed
/// with `#` (a column labelled `mycol` is `#mycol`).
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ColumnMeta {
    /// Lookup name without any prefix
    pub label: String,
    /// Human readable column heading
    pub name: String,
    pub datatype: Datatype,
    /// Values are always a list when set
    pub is_multiple: bool,
    pub is_custom: bool,
    /// Template for composite columns
    pub template: Option<String>,
}
impl ColumnMeta {
    /// Schema for one of the built-in columns (`title`, `tags`, ...).
    pub fn standard(label: impl Into<String>, datatype: Datatype) -> Self {
        let label = label.into();
        Self {
            name: label.clone(),
            label,
            datatype,
            is_multiple: false,
            is_custom: false,
            template: None,
        }
    }

    /// Schema for a user-defined column.
    pub fn custom(label: impl Into<String>, name: impl Into<String>, datatype: Datatype) -> Self {
        Self {
            label: label.into(),
            name: name.into(),
            datatype,
            is_multiple: false,
            is_custom: true,
            template: None,
        }
    }

    /// Schema for a user-defined composite column rendered from `template`.
    pub fn composite(label: impl Into<String>, name: impl Into<String>, template: impl Into<String>) -> Self {
        Self::custom(label, name, Datatype::Composite).with_template(template)
    }

    /// Schema of the numeric `<key>_index` sibling that series columns carry.
    pub fn index_sibling(&self) -> Self {
        Self::standard(format!("{}_index", self.key()), Datatype::Float)
    }

    pub fn multiple(mut self) -> Self {
        self.is_multiple = true;
        self
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Registry key: labels of custom columns get a `#` prefix.
    pub fn key(&self) -> String {
        match self.is_custom {
            true => format!("#{}", self.label),
            false => self.label.clone(),
        }
    }

    pub fn is_composite(&self) -> bool {
        self.datatype == Datatype::Composite
    }
}
