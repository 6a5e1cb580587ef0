/// One author, as stored in the authors table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AuthorData {
    /// Display name
    pub name: String,
    /// Sort key, e.g. `"Pratchett, Terry"`
    pub sort: String,
    /// Link to an external page about the author; may be empty
    pub link: String,
}
impl AuthorData {
    pub fn new(name: impl Into<String>, sort: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sort: sort.into(),
            link: link.into(),
        }
    }
}
