//! Reference entity: links one owning record to one stored resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Kind of record that owns a stored resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerKind {
    Attachment,
    Image,
    Archive,
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OwnerKind::Attachment => write!(f, "attachment"),
            OwnerKind::Image => write!(f, "image"),
            OwnerKind::Archive => write!(f, "archive"),
        }
    }
}

/// The single owning record of a reference entity.
///
/// A reference belongs to exactly one attachment container, image, or archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum OwnerRef {
    Attachment(i64),
    Image(i64),
    Archive(i64),
}

impl OwnerRef {
    pub fn kind(&self) -> OwnerKind {
        match self {
            OwnerRef::Attachment(_) => OwnerKind::Attachment,
            OwnerRef::Image(_) => OwnerKind::Image,
            OwnerRef::Archive(_) => OwnerKind::Archive,
        }
    }

    pub fn id(&self) -> i64 {
        match *self {
            OwnerRef::Attachment(id) | OwnerRef::Image(id) | OwnerRef::Archive(id) => id,
        }
    }

    /// Build an owner from the three nullable owner columns of a stored row.
    ///
    /// Returns `None` unless exactly one of them is set to a positive id.
    pub fn from_columns(
        attachment_id: Option<i64>,
        image_id: Option<i64>,
        archive_id: Option<i64>,
    ) -> Option<Self> {
        let positive = |id: Option<i64>| id.filter(|id| *id > 0);
        match (
            positive(attachment_id),
            positive(image_id),
            positive(archive_id),
        ) {
            (Some(id), None, None) => Some(OwnerRef::Attachment(id)),
            (None, Some(id), None) => Some(OwnerRef::Image(id)),
            (None, None, Some(id)) => Some(OwnerRef::Archive(id)),
            _ => None,
        }
    }

    /// The owner as (attachment_id, image_id, archive_id) columns.
    pub fn to_columns(&self) -> (Option<i64>, Option<i64>, Option<i64>) {
        match *self {
            OwnerRef::Attachment(id) => (Some(id), None, None),
            OwnerRef::Image(id) => (None, Some(id), None),
            OwnerRef::Archive(id) => (None, None, Some(id)),
        }
    }
}

impl Display for OwnerRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

/// Tenant and transaction a record store call runs under.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordScope {
    pub tenant_id: i64,
    pub transaction: Option<String>,
}

impl RecordScope {
    pub fn new(tenant_id: i64) -> Self {
        Self {
            tenant_id,
            transaction: None,
        }
    }

    pub fn with_transaction(mut self, transaction: impl Into<String>) -> Self {
        self.transaction = Some(transaction.into());
        self
    }
}

/// Persisted association between an owning record and one stored resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntity {
    /// Surrogate key; `0` while the entity has not been persisted.
    pub id: i64,
    pub tenant_id: i64,
    #[serde(skip)]
    pub transaction: Option<String>,
    pub backend_id: i64,
    pub owner: OwnerRef,
    pub file_name: String,
    pub note: Option<String>,
    pub description: Option<String>,
    pub file_size: Option<i64>,
    /// Incremented by the record store on every update.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferenceEntity {
    /// Create an unsaved entity in the given scope.
    pub fn new(scope: &RecordScope, backend_id: i64, owner: OwnerRef, file_name: &str) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            tenant_id: scope.tenant_id,
            transaction: scope.transaction.clone(),
            backend_id,
            owner,
            file_name: file_name.to_string(),
            note: None,
            description: None,
            file_size: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }

    pub fn scope(&self) -> RecordScope {
        RecordScope {
            tenant_id: self.tenant_id,
            transaction: self.transaction.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_from_columns_requires_exactly_one() {
        assert_eq!(
            OwnerRef::from_columns(Some(42), None, None),
            Some(OwnerRef::Attachment(42))
        );
        assert_eq!(
            OwnerRef::from_columns(None, Some(7), Some(0)),
            Some(OwnerRef::Image(7))
        );
        assert_eq!(OwnerRef::from_columns(Some(1), Some(2), None), None);
        assert_eq!(OwnerRef::from_columns(None, None, None), None);
    }

    #[test]
    fn test_owner_columns_round_trip() {
        let owner = OwnerRef::Archive(9);
        let (attachment, image, archive) = owner.to_columns();
        assert_eq!(OwnerRef::from_columns(attachment, image, archive), Some(owner));
    }

    #[test]
    fn test_new_entity_is_unsaved() {
        let scope = RecordScope::new(1).with_transaction("trx-1");
        let entity = ReferenceEntity::new(&scope, 3, OwnerRef::Image(7), "logo.png");
        assert!(!entity.is_persisted());
        assert_eq!(entity.scope(), scope);
        assert_eq!(entity.owner.to_string(), "image:7");
    }
}
