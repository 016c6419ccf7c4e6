use serde::{Deserialize, Serialize};

/// The host record an attachment container or archive belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub table_name: String,
    pub record_id: i64,
}

impl OwnerRecord {
    pub fn new(table_name: impl Into<String>, record_id: i64) -> Self {
        Self {
            table_name: table_name.into(),
            record_id,
        }
    }
}
