use std::collections::BTreeMap;

/// User-defined categories: category name to its members.
pub type UserCategories = BTreeMap<String, Vec<CategoryMember>>;

/// One member of a user category.
///
/// A member names a value (`"Terry Pratchett"`) and the field that value
/// lives in (`"authors"`). A book belongs to the category when its record
/// holds that value in that field.
///
/// With the `serde` feature, members also deserialize from a
/// `[name, field, ignored]` sequence.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CategoryMember {
    pub name: String,
    pub field: String,
    /// Carried for completeness; matching does not consult it.
    #[cfg_attr(feature = "serde", serde(default))]
    pub ignored: bool,
}
impl CategoryMember {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            ignored: false,
        }
    }
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_from_sequence() {
        let member: CategoryMember = serde_json::from_str(r#"["Alice", "authors", true]"#).unwrap();
        assert_eq!(member.name, "Alice");
        assert_eq!(member.field, "authors");
        assert!(member.ignored);
    }

    #[test]
    fn test_deserialize_from_map() {
        let member: CategoryMember = serde_json::from_str(r#"{"name": "Epic", "field": "tags"}"#).unwrap();
        assert_eq!(member, CategoryMember::new("Epic", "tags"));
    }
}
