//! # Upload Relay Module
//!
//! Moves a document or photo the user sent to the bot into remote storage
//! and returns a shareable link. Each file is staged in a temporary file that
//! is removed when the relay finishes, whether it succeeded or not.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;
use teloxide::prelude::*;
use teloxide::types::FileId;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::catalog::UploadFolder;
use crate::config::FolderConfig;
use crate::errors::UploadError;
use crate::google::{base_url, GoogleClient};

const DRIVE_UPLOAD_API: &str = "https://www.googleapis.com/upload/drive/v3/files";
const DRIVE_FILES_API: &str = "https://www.googleapis.com/drive/v3/files";

/// Shareable view link for a Drive file id
pub fn share_link(file_id: &str) -> String {
    format!("https://drive.google.com/file/d/{file_id}/view?usp=sharing")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileKind {
    Document,
    Photo,
}

/// A file attached to an inbound message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundFile {
    pub file_id: String,
    pub file_name: Option<String>,
    /// Size reported by the platform, 0 when unknown
    pub size: u64,
    pub kind: FileKind,
}

impl InboundFile {
    /// Name used in remote storage: the document's own name, or
    /// `photo_<file id>.jpg` for photos and unnamed documents
    pub fn upload_name(&self) -> String {
        match (&self.kind, &self.file_name) {
            (FileKind::Document, Some(name)) if !name.trim().is_empty() => name.clone(),
            _ => format!("photo_{}.jpg", self.file_id),
        }
    }
}

/// Where inbound files are fetched from
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Write the file's bytes into `dest`, returning the byte count
    async fn download(&self, file_id: &str, dest: &mut tokio::fs::File) -> Result<u64, UploadError>;
}

/// Where files are kept
#[async_trait]
pub trait RemoteStorage: Send + Sync {
    /// Upload the file at `path` under `name` into `folder_id`, returning its link
    async fn store(&self, path: &Path, folder_id: &str, name: &str) -> Result<String, UploadError>;
}

/// Download-then-upload pipeline for one file at a time
pub struct UploadRelay {
    source: Arc<dyn FileSource>,
    storage: Arc<dyn RemoteStorage>,
    folders: FolderConfig,
    max_bytes: u64,
}

impl UploadRelay {
    pub fn new(
        source: Arc<dyn FileSource>,
        storage: Arc<dyn RemoteStorage>,
        folders: FolderConfig,
        max_bytes: u64,
    ) -> Self {
        Self {
            source,
            storage,
            folders,
            max_bytes,
        }
    }

    fn folder_id(&self, folder: UploadFolder) -> &str {
        match folder {
            UploadFolder::Testimonials => &self.folders.testimonials,
            UploadFolder::Education => &self.folders.education,
        }
    }

    /// Relay `file` into `folder` and return the shareable link
    pub async fn relay(&self, file: &InboundFile, folder: UploadFolder) -> Result<String, UploadError> {
        if file.size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: file.size,
                limit: self.max_bytes,
            });
        }

        let staged = NamedTempFile::new()?;
        let mut dest = tokio::fs::File::from_std(staged.reopen()?);

        let written = self.source.download(&file.file_id, &mut dest).await?;
        dest.flush().await?;
        drop(dest);

        if written > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: written,
                limit: self.max_bytes,
            });
        }
        debug!(file_id = %file.file_id, bytes = written, path = %staged.path().display(), "Staged inbound file");

        let name = file.upload_name();
        let link = self
            .storage
            .store(staged.path(), self.folder_id(folder), &name)
            .await?;

        info!(file_id = %file.file_id, name = %name, folder = ?folder, "Relayed file to remote storage");
        Ok(link)
    }
}

/// Fetches files through the Bot API file endpoint
pub struct TelegramFileSource {
    bot: Bot,
    http: reqwest::Client,
}

impl TelegramFileSource {
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl FileSource for TelegramFileSource {
    async fn download(&self, file_id: &str, dest: &mut tokio::fs::File) -> Result<u64, UploadError> {
        let file = self
            .bot
            .get_file(FileId(file_id.to_string()))
            .await
            .map_err(|e| UploadError::Download(e.to_string()))?;

        let url = format!(
            "https://api.telegram.org/file/bot{}/{}",
            self.bot.token(),
            file.path
        );

        let mut response = self
            .http
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| UploadError::Download(e.without_url().to_string()))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UploadError::Download(e.without_url().to_string()))?
        {
            dest.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        Ok(written)
    }
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

/// Google Drive storage: media upload, then a metadata patch that sets the
/// name and parent folder
pub struct DriveStorage {
    client: GoogleClient,
}

impl DriveStorage {
    pub fn new(client: GoogleClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RemoteStorage for DriveStorage {
    async fn store(&self, path: &Path, folder_id: &str, name: &str) -> Result<String, UploadError> {
        let bytes = tokio::fs::read(path).await?;

        let mut upload_url = base_url(DRIVE_UPLOAD_API)?;
        upload_url
            .query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("supportsAllDrives", "true")
            .append_pair("fields", "id");
        let created: DriveFile = self
            .client
            .send_bytes(Method::POST, upload_url, "application/octet-stream", bytes)
            .await?;

        let mut meta_url = base_url(DRIVE_FILES_API)?;
        meta_url
            .path_segments_mut()
            .map_err(|_| UploadError::Upload("Drive API URL cannot take a path".to_string()))?
            .push(&created.id);
        {
            let mut query = meta_url.query_pairs_mut();
            query
                .append_pair("supportsAllDrives", "true")
                .append_pair("fields", "id");
            if !folder_id.is_empty() {
                query.append_pair("addParents", folder_id);
            }
        }

        if let Err(e) = self
            .client
            .send_json::<DriveFile>(Method::PATCH, meta_url, &json!({ "name": name }))
            .await
        {
            warn!(drive_id = %created.id, error = %e, "Uploaded file left unnamed outside its folder");
            return Err(e.into());
        }

        Ok(share_link(&created.id))
    }
}
