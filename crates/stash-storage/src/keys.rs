//! Shared key generation for storage backends.
//!
//! Key layout: `{tenant}/{container}[/{container_id}][/{table}][/{record_id}]/{name}`.
//! Unset segments are omitted. Names must already be sanitized (see
//! `stash_core::sanitize_file_name`); the builder does not re-sanitize them.

use std::fmt::{Display, Formatter, Result as FmtResult};

/// Top-level container a resource is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerType {
    /// Files attached to a host record.
    Attachment,
    /// Resources generated by the host (images, archived documents).
    Resource,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::Attachment => "attachment",
            ContainerType::Resource => "resource",
        }
    }
}

/// Where a resource lives, for the three canonical layouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    Attachment { table_name: String, record_id: i64 },
    Image,
    Archive { table_name: String, record_id: i64 },
}

/// Backend-addressable name of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    /// Key for `name` at one of the canonical locations.
    pub fn for_location(tenant_id: i64, location: &ResourceLocation, name: &str) -> Self {
        let builder = match location {
            ResourceLocation::Attachment {
                table_name,
                record_id,
            } => ResourceKeyBuilder::new(tenant_id, ContainerType::Attachment)
                .with_table_name(table_name)
                .with_record_id(*record_id),
            ResourceLocation::Image => {
                ResourceKeyBuilder::new(tenant_id, ContainerType::Resource).with_container_id("image")
            }
            ResourceLocation::Archive {
                table_name,
                record_id,
            } => ResourceKeyBuilder::new(tenant_id, ContainerType::Resource)
                .with_container_id("archive")
                .with_table_name(table_name)
                .with_record_id(*record_id),
        };
        builder.with_name(name).build()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ResourceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builder for resource keys.
#[derive(Debug, Clone)]
pub struct ResourceKeyBuilder {
    tenant_id: i64,
    container: ContainerType,
    container_id: Option<String>,
    table_name: Option<String>,
    record_id: Option<i64>,
    name: String,
}

impl ResourceKeyBuilder {
    pub fn new(tenant_id: i64, container: ContainerType) -> Self {
        Self {
            tenant_id,
            container,
            container_id: None,
            table_name: None,
            record_id: None,
            name: String::new(),
        }
    }

    /// Container subtype, e.g. `image` or `archive` under `resource`.
    pub fn with_container_id(mut self, container_id: impl Into<String>) -> Self {
        self.container_id = Some(container_id.into());
        self
    }

    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_record_id(mut self, record_id: i64) -> Self {
        self.record_id = Some(record_id);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(&self) -> ResourceKey {
        let mut segments: Vec<String> = vec![
            self.tenant_id.to_string(),
            self.container.as_str().to_string(),
        ];
        if let Some(container_id) = self.container_id.as_deref().filter(|s| !s.is_empty()) {
            segments.push(container_id.to_string());
        }
        if let Some(table_name) = self.table_name.as_deref().filter(|s| !s.is_empty()) {
            segments.push(table_name.to_string());
        }
        if let Some(record_id) = self.record_id {
            segments.push(record_id.to_string());
        }
        segments.push(self.name.clone());
        ResourceKey(segments.join("/"))
    }
}
