use super::Column;
use shelf_model::{BookId, ColumnMeta, Datatype, Value};
use std::collections::BTreeMap;

pub(crate) const ONDEVICE: &str = "ondevice";

/// Synthetic field with no backend table. Markers are injected from
/// outside the cache (whatever tracks connected devices).
pub(crate) struct OnDeviceField {
    meta: ColumnMeta,
    markers: BTreeMap<BookId, String>,
}

impl Default for OnDeviceField {
    fn default() -> Self {
        Self {
            meta: ColumnMeta::standard(ONDEVICE, Datatype::Text),
            markers: BTreeMap::new(),
        }
    }
}

impl OnDeviceField {
    pub(crate) fn set_markers(&mut self, markers: BTreeMap<BookId, String>) {
        self.markers = markers;
    }
}

impl Column for OnDeviceField {
    fn meta(&self) -> &ColumnMeta {
        &self.meta
    }

    fn for_book(&self, book_id: BookId) -> Option<Value> {
        self.markers.get(&book_id).cloned().map(Value::Text)
    }
}
