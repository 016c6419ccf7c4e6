//! Reference resolution: which persisted reference entity a context designates.

use stash_core::ReferenceEntity;
use stash_db::ReferenceRepository;
use std::sync::Arc;

use crate::context::{RequestContext, Selector};
use crate::error::AttachmentResult;
use crate::selector::BackendHandle;

pub struct ReferenceResolver {
    references: Arc<dyn ReferenceRepository>,
}

impl ReferenceResolver {
    pub fn new(references: Arc<dyn ReferenceRepository>) -> Self {
        Self { references }
    }

    /// Find the entity matching the context's selector on `handle`'s backend.
    ///
    /// Absence is `Ok(None)`. An attachment selector without a file name never matches,
    /// since one container holds several named resources.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        handle: &BackendHandle,
    ) -> AttachmentResult<Option<ReferenceEntity>> {
        let scope = ctx.scope();
        let backend_id = handle.backend_id();
        let found = match ctx.selector() {
            None => None,
            Some(Selector::Reference(id)) => self.references.get_by_id(&scope, id).await?,
            Some(Selector::Attachment(attachment_id)) => match ctx.file_name() {
                Some(file_name) => {
                    self.references
                        .find_by_attachment(&scope, backend_id, attachment_id, file_name)
                        .await?
                }
                None => None,
            },
            Some(Selector::Image(image_id)) => {
                self.references
                    .find_by_image(&scope, backend_id, image_id)
                    .await?
            }
            Some(Selector::Archive(archive_id)) => {
                self.references
                    .find_by_archive(&scope, backend_id, archive_id)
                    .await?
            }
        };
        Ok(found)
    }

    /// All entities of an attachment container on `handle`'s backend, in creation order.
    pub async fn list_by_attachment(
        &self,
        ctx: &RequestContext,
        handle: &BackendHandle,
        attachment_id: i64,
    ) -> AttachmentResult<Vec<ReferenceEntity>> {
        Ok(self
            .references
            .list_by_attachment(&ctx.scope(), handle.backend_id(), attachment_id)
            .await?)
    }
}
