//! Asset resources and the `/assets` endpoint.
//!
//! Assets are files stored in a project: job inputs uploaded by the caller
//! and outputs produced by jobs.

use std::path::Path;

use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::api::{ApiError, Client, list_query};
use crate::datetime::rfc1123;

/// A stored file resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub filename: String,
    /// File size in bytes.
    pub size: u64,
    /// Content hash with algorithm prefix, e.g. `sha256:...`.
    pub checksum: String,
    #[serde(with = "rfc1123")]
    pub created: DateTime<Utc>,
    #[serde(with = "rfc1123")]
    pub modified: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct DownloadLink {
    link: Option<String>,
}

/// Handle for the assets endpoint of one project.
pub struct AssetsEndpoint<'a> {
    client: &'a Client,
    project_id: &'a str,
}

impl<'a> AssetsEndpoint<'a> {
    pub fn new(client: &'a Client, project_id: &'a str) -> Self {
        Self { client, project_id }
    }

    fn collection(&self) -> String {
        format!("/projects/{}/assets", self.project_id)
    }

    fn resource(&self, id: &str) -> String {
        format!("/projects/{}/assets/{id}", self.project_id)
    }

    /// List assets.
    ///
    /// `sort` and `q` are passed to the API verbatim; see the Metafold API
    /// docs for their syntax (e.g. `sort = "id:1"`, `q = "filename:a.bin"`).
    pub async fn list(&self, sort: Option<&str>, q: Option<&str>) -> Result<Vec<Asset>, ApiError> {
        let query = list_query(sort, q);
        let response = self.client.get(&self.collection(), &query).await?;
        Client::json(response).await
    }

    pub async fn get(&self, id: &str) -> Result<Asset, ApiError> {
        let response = self.client.get(&self.resource(id), &[]).await?;
        Client::json(response).await
    }

    /// Download an asset's content to `path`.
    ///
    /// The API first returns a temporary signed link, which is then streamed
    /// chunk by chunk into a temporary file next to `path`. The file is moved
    /// into place only once the whole body has arrived, so a failed download
    /// leaves `path` untouched.
    pub async fn download_file(&self, id: &str, path: impl AsRef<Path>) -> Result<(), ApiError> {
        let response = self.client.get(&self.resource(id), &[("download", "true")]).await?;
        let link = Client::json::<DownloadLink>(response)
            .await?
            .link
            .ok_or_else(|| ApiError::MissingDownloadLink {
                asset_id: id.to_string(),
            })?;

        let path = path.as_ref();
        let mut response = self.client.fetch_link(&link).await?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let partial = NamedTempFile::new_in(dir)?;
        let mut file = tokio::fs::File::from_std(partial.reopen()?);
        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;
        drop(file);

        partial.persist(path).map_err(|err| ApiError::Io(err.error))?;
        debug!(asset_id = id, bytes = written, path = %path.display(), "asset downloaded");
        Ok(())
    }

    /// Upload a file from disk as a new asset.
    pub async fn create(&self, path: impl AsRef<Path>) -> Result<Asset, ApiError> {
        let form = file_form_from_path(path.as_ref()).await?;
        let response = self.client.post_multipart(&self.collection(), form).await?;
        Client::json(response).await
    }

    /// Upload in-memory content as a new asset.
    pub async fn create_bytes(&self, filename: &str, content: Vec<u8>) -> Result<Asset, ApiError> {
        let response = self
            .client
            .post_multipart(&self.collection(), file_form(filename, content))
            .await?;
        Client::json(response).await
    }

    /// Replace an asset's content with a file from disk.
    pub async fn update(&self, id: &str, path: impl AsRef<Path>) -> Result<Asset, ApiError> {
        let form = file_form_from_path(path.as_ref()).await?;
        let response = self.client.patch_multipart(&self.resource(id), form).await?;
        Client::json(response).await
    }

    pub async fn update_bytes(&self, id: &str, filename: &str, content: Vec<u8>) -> Result<Asset, ApiError> {
        let response = self
            .client
            .patch_multipart(&self.resource(id), file_form(filename, content))
            .await?;
        Client::json(response).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client.delete(&self.resource(id)).await?;
        Ok(())
    }
}

fn file_form(filename: &str, content: Vec<u8>) -> Form {
    Form::new().part("file", Part::bytes(content).file_name(filename.to_string()))
}

async fn file_form_from_path(path: &Path) -> Result<Form, ApiError> {
    let content = tokio::fs::read(path).await?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    Ok(file_form(&filename, content))
}
