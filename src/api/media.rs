//! Media endpoints.

use reqwest::multipart::{Form, Part};

use super::ApiClient;
use crate::errors::AppError;
use crate::models::{Media, MediaData, MediaSortRequest, ReplaceMediaRequest};

/// A file to upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ApiClient {
    /// POST /media/upload - Upload files, returning the created media.
    pub async fn upload_media(&self, files: Vec<UploadFile>) -> Result<Vec<Media>, AppError> {
        tracing::debug!("POST /media/upload ({} files)", files.len());
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.mime)?;
            form = form.part("files[]", part);
        }

        let media: Option<Vec<Media>> = self
            .send(self.http.post(self.url("media/upload")).multipart(form))
            .await?;
        Ok(media.unwrap_or_default())
    }

    /// GET /{route}/{uuid}/media - Media of a record, by slot.
    pub async fn media_for(&self, route: &str, uuid: &str) -> Result<MediaData, AppError> {
        tracing::debug!("GET /{}/{}/media", route, uuid);
        let media: Option<MediaData> = self
            .send(self.http.get(self.url(&format!("{}/{}/media", route, uuid))))
            .await?;
        Ok(media.unwrap_or_default())
    }

    /// POST /{route}/{uuid}/media/assign/{slot} - Set the ordered media of a slot.
    pub async fn assign_media(
        &self,
        route: &str,
        uuid: &str,
        slot: &str,
        ids: &[String],
    ) -> Result<(), AppError> {
        tracing::debug!("POST /{}/{}/media/assign/{}", route, uuid, slot);
        self.send_unit(
            self.http
                .post(self.url(&format!("{}/{}/media/assign/{}", route, uuid, slot)))
                .json(ids),
        )
        .await
    }

    /// POST /{route}/{uuid}/media/replace/{slot} - Replace the media of a single slot.
    pub async fn replace_media(
        &self,
        route: &str,
        uuid: &str,
        slot: &str,
        new_id: &str,
    ) -> Result<(), AppError> {
        tracing::debug!("POST /{}/{}/media/replace/{}", route, uuid, slot);
        self.send_unit(
            self.http
                .post(self.url(&format!("{}/{}/media/replace/{}", route, uuid, slot)))
                .json(&ReplaceMediaRequest {
                    new_id: new_id.to_string(),
                }),
        )
        .await
    }

    /// POST /media/{id}/sort - Change one media's sort key.
    pub async fn sort_media(&self, id: &str, sort: i64) -> Result<(), AppError> {
        tracing::debug!("POST /media/{}/sort", id);
        self.send_unit(
            self.http
                .post(self.url(&format!("media/{}/sort", id)))
                .json(&MediaSortRequest { sort }),
        )
        .await
    }

    /// POST /media/{id}/delete - Delete a media file.
    pub async fn delete_media(&self, id: &str) -> Result<(), AppError> {
        tracing::debug!("POST /media/{}/delete", id);
        self.send_unit(self.http.post(self.url(&format!("media/{}/delete", id))))
            .await
    }
}
