pub mod backend;
pub mod error;
mod path;
mod table;

pub use crate::backend::{Backend, Cover, CoverShape};
pub use crate::path::{resolve as resolve_path, validate as validate_path};
pub use crate::table::{Table, TableData};
use std::sync::Arc;

pub type BackendHandle = Arc<dyn Backend>;
