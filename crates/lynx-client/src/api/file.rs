//! Files stored on installations and organizations

use crate::client::LynxClient;
use crate::error::{LynxError, LynxResult};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub id: i64,
    /// Content hash, used for downloads
    pub hash: String,
    pub name: String,
    pub mime: String,
    pub installation_id: i64,
    pub organization_id: i64,
    pub created: i64,
    pub updated: i64,
}

/// Entity a file belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOwner {
    Installation(i64),
    Organization(i64),
}

impl FileOwner {
    fn path(&self) -> String {
        match self {
            FileOwner::Installation(id) => format!("api/v2/file/installation/{id}"),
            FileOwner::Organization(id) => format!("api/v2/file/organization/{id}"),
        }
    }
}

/// Build the upload form: the part is named after the file, the file name
/// is its base name
fn upload_form(file_name: &str, mime: Option<&str>, data: Vec<u8>) -> LynxResult<Form> {
    let base_name = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
        .to_string();
    let mime = match mime {
        Some(mime) if !mime.is_empty() => mime.to_string(),
        _ => mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .to_string(),
    };

    let part = Part::bytes(data).file_name(base_name).mime_str(&mime)?;
    Ok(Form::new().part(file_name.to_string(), part))
}

impl LynxClient {
    pub async fn get_files(&self, owner: FileOwner) -> LynxResult<Vec<File>> {
        self.http().get(&owner.path()).await
    }

    pub async fn get_file(&self, owner: FileOwner, file_id: i64) -> LynxResult<File> {
        self.http()
            .get(&format!("{}/{file_id}", owner.path()))
            .await
    }

    /// Upload a new file
    ///
    /// The MIME type is guessed from `file_name` when not given.
    pub async fn create_file(
        &self,
        owner: FileOwner,
        file_name: &str,
        mime: Option<&str>,
        data: Vec<u8>,
    ) -> LynxResult<File> {
        let request = self
            .http()
            .request(Method::POST, &owner.path())
            .multipart(upload_form(file_name, mime, data)?);
        first_file(self.http().execute(request).await?)
    }

    /// Replace the contents of an existing file
    pub async fn update_file(
        &self,
        owner: FileOwner,
        file_id: i64,
        file_name: &str,
        mime: Option<&str>,
        data: Vec<u8>,
    ) -> LynxResult<File> {
        let request = self
            .http()
            .request(Method::POST, &format!("{}/{file_id}", owner.path()))
            .multipart(upload_form(file_name, mime, data)?);
        first_file(self.http().execute(request).await?)
    }

    pub async fn delete_file(&self, owner: FileOwner, file_id: i64) -> LynxResult<()> {
        self.http()
            .delete(&format!("{}/{file_id}", owner.path()))
            .await
    }

    /// Download file contents by hash
    pub async fn download_file(&self, hash: &str) -> LynxResult<Vec<u8>> {
        let request = self
            .http()
            .request(Method::GET, &format!("api/v2/file/download/{hash}"));
        self.http().execute_bytes(request).await
    }
}

// Uploads answer with a list holding the stored file
fn first_file(files: Vec<File>) -> LynxResult<File> {
    files.into_iter().next().ok_or(LynxError::NoResponse)
}
