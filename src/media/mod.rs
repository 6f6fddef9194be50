//! Media slots of one record.

use crate::api::{ApiClient, UploadFile};
use crate::errors::AppError;
use crate::models::{Media, MediaData, MediaSlotDescriptor};
use crate::notifications::Notifier;

/// Whether a slot takes files of `mime`; an empty list takes anything.
pub fn accepts(slot: &MediaSlotDescriptor, mime: &str) -> bool {
    slot.mime.is_empty()
        || slot.mime.iter().any(|allowed| {
            allowed == "*"
                || allowed == mime
                || allowed
                    .strip_suffix("/*")
                    .is_some_and(|family| mime.split('/').next() == Some(family))
        })
}

pub struct MediaSlots {
    api: ApiClient,
    notifier: Notifier,
    route: String,
    uuid: String,
    slots: Vec<MediaSlotDescriptor>,
    media: MediaData,
}

impl MediaSlots {
    pub fn new(
        api: ApiClient,
        notifier: Notifier,
        route: &str,
        uuid: &str,
        slots: Vec<MediaSlotDescriptor>,
    ) -> Self {
        Self {
            api,
            notifier,
            route: route.trim_start_matches('/').to_string(),
            uuid: uuid.to_string(),
            slots,
            media: MediaData::new(),
        }
    }

    pub fn slots(&self) -> &[MediaSlotDescriptor] {
        &self.slots
    }

    pub fn media(&self, slot: &str) -> &[Media] {
        self.media.get(slot).map(Vec::as_slice).unwrap_or(&[])
    }

    fn slot(&self, name: &str) -> Result<&MediaSlotDescriptor, AppError> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .ok_or_else(|| AppError::Validation(format!("Unknown media slot {}", name)))
    }

    fn fail<T>(&self, err: AppError) -> Result<T, AppError> {
        self.notifier.failure(&err);
        Err(err)
    }

    /// Fetch the record's media.
    pub async fn load(&mut self) -> Result<(), AppError> {
        match self.api.media_for(&self.route, &self.uuid).await {
            Ok(mut media) => {
                for files in media.values_mut() {
                    files.sort_by_key(|m| m.sort.unwrap_or(i64::MAX));
                }
                self.media = media;
                Ok(())
            }
            Err(err) => self.fail(err),
        }
    }

    /// Upload files into a slot.
    ///
    /// A single-file slot that already holds media has it replaced; otherwise
    /// the uploads are appended and the whole slot order assigned.
    pub async fn upload(&mut self, slot: &str, files: Vec<UploadFile>) -> Result<(), AppError> {
        let descriptor = self.slot(slot)?.clone();
        if let Some(file) = files.iter().find(|f| !accepts(&descriptor, &f.mime)) {
            return self.fail(AppError::Validation(format!(
                "{} does not accept {} ({})",
                descriptor.label, file.mime, file.file_name
            )));
        }
        if !descriptor.multiple && files.len() > 1 {
            return self.fail(AppError::Validation(format!(
                "{} takes a single file",
                descriptor.label
            )));
        }

        let uploaded = match self.api.upload_media(files).await {
            Ok(uploaded) => uploaded,
            Err(err) => return self.fail(err),
        };

        let existing = self.media(slot).to_vec();
        let result = match (descriptor.multiple, existing.first(), uploaded.first()) {
            (false, Some(_), Some(new)) => {
                self.api
                    .replace_media(&self.route, &self.uuid, slot, &new.id)
                    .await
            }
            _ => {
                let ids: Vec<String> = existing
                    .iter()
                    .chain(uploaded.iter())
                    .map(|m| m.id.clone())
                    .collect();
                self.api.assign_media(&self.route, &self.uuid, slot, &ids).await
            }
        };
        if let Err(err) = result {
            return self.fail(err);
        }

        let files = self.media.entry(slot.to_string()).or_default();
        if !descriptor.multiple {
            files.clear();
        }
        files.extend(uploaded);
        tracing::info!("Uploaded media into {}/{} slot {}", self.route, self.uuid, slot);
        self.notifier.success("Media uploaded");
        Ok(())
    }

    /// Delete one media file of a slot.
    pub async fn delete(&mut self, slot: &str, id: &str) -> Result<(), AppError> {
        if let Err(err) = self.api.delete_media(id).await {
            return self.fail(err);
        }
        if let Some(files) = self.media.get_mut(slot) {
            files.retain(|m| m.id != id);
        }
        self.notifier.success("Media deleted");
        Ok(())
    }

    /// Set one media file's sort key.
    pub async fn set_sort(&mut self, slot: &str, id: &str, sort: i64) -> Result<(), AppError> {
        if let Err(err) = self.api.sort_media(id, sort).await {
            return self.fail(err);
        }
        if let Some(files) = self.media.get_mut(slot) {
            if let Some(media) = files.iter_mut().find(|m| m.id == id) {
                media.sort = Some(sort);
            }
            files.sort_by_key(|m| m.sort.unwrap_or(i64::MAX));
        }
        Ok(())
    }

    /// Move a file within its slot; sorts are renumbered by position.
    ///
    /// The previous order is restored when the backend rejects the new one.
    pub async fn reorder(&mut self, slot: &str, from: usize, to: usize) -> Result<(), AppError> {
        let snapshot = self.media(slot).to_vec();
        if from >= snapshot.len() || to >= snapshot.len() {
            return self.fail(AppError::Validation(format!(
                "Move {} -> {} is outside slot {}",
                from, to, slot
            )));
        }
        if from == to {
            return Ok(());
        }

        let mut files = snapshot.clone();
        let moved = files.remove(from);
        files.insert(to, moved);
        for (index, media) in files.iter_mut().enumerate() {
            media.sort = Some(index as i64);
        }
        let ids: Vec<String> = files.iter().map(|m| m.id.clone()).collect();
        self.media.insert(slot.to_string(), files);

        if let Err(err) = self.api.assign_media(&self.route, &self.uuid, slot, &ids).await {
            tracing::warn!("Media reorder in {} rejected, restoring: {}", slot, err);
            self.media.insert(slot.to_string(), snapshot);
            return self.fail(err);
        }
        Ok(())
    }
}
