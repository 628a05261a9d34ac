//! Implements the `Drive` trait with the Google Drive v3 REST API.

use crate::api::{Drive, DriveFile, TokenProvider};
use crate::Result;
use anyhow::{bail, Context};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";
const APP_DATA_FOLDER: &str = "appDataFolder";
const JSON_MIME_TYPE: &str = "application/json";

/// Files live in `folder_id` when one is configured, otherwise in the hidden application data
/// space of the user's Drive.
pub(crate) struct GoogleDrive {
    folder_id: Option<String>,
    token_provider: TokenProvider,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

impl GoogleDrive {
    pub(crate) fn new(folder_id: Option<String>, token_provider: TokenProvider) -> Self {
        Self {
            folder_id,
            token_provider,
            client: reqwest::Client::new(),
        }
    }

    fn parent(&self) -> &str {
        self.folder_id.as_deref().unwrap_or(APP_DATA_FOLDER)
    }

    fn spaces(&self) -> &'static str {
        if self.folder_id.is_some() {
            "drive"
        } else {
            APP_DATA_FOLDER
        }
    }

    /// Adds a fresh bearer token to the request and sends it.
    async fn send(&mut self, request: RequestBuilder, what: &str) -> Result<Response> {
        let token = self.token_provider.token_with_refresh().await?.to_string();
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .with_context(|| format!("Failed to send the {what} request to Google Drive"))?;
        check_status(response, what).await
    }

    async fn query(&mut self, filter: &str) -> Result<Vec<DriveFile>> {
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut url = Url::parse(FILES_URL).context("Invalid Drive files URL")?;
            {
                let mut pairs = url.query_pairs_mut();
                pairs
                    .append_pair("q", filter)
                    .append_pair("spaces", self.spaces())
                    .append_pair("fields", "nextPageToken, files(id, name)");
                if let Some(token) = &page_token {
                    pairs.append_pair("pageToken", token);
                }
            }
            let request = self.client.get(url);
            let list: FileList = self
                .send(request, "list")
                .await?
                .json()
                .await
                .context("Failed to parse the Drive file list")?;
            files.extend(list.files);
            match list.next_page_token {
                Some(token) => page_token = Some(token),
                None => return Ok(files),
            }
        }
    }
}

async fn check_status(response: Response, what: &str) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read response body".to_string());
    bail!("Google Drive {what} request failed with status {status}: {body}")
}

/// Escapes a value for use inside a single-quoted Drive query string.
fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[async_trait::async_trait]
impl Drive for GoogleDrive {
    async fn find(&mut self, name: &str) -> Result<Option<String>> {
        let filter = format!(
            "name = '{}' and '{}' in parents and trashed = false",
            quote(name),
            quote(self.parent())
        );
        let files = self.query(&filter).await?;
        if files.len() > 1 {
            tracing::warn!(
                "Found {} files named '{name}' in Drive, using the first one",
                files.len()
            );
        }
        Ok(files.into_iter().next().map(|f| f.id))
    }

    async fn download(&mut self, id: &str) -> Result<String> {
        let mut url = Url::parse(&format!("{FILES_URL}/{id}")).context("Invalid Drive file URL")?;
        url.query_pairs_mut().append_pair("alt", "media");
        let request = self.client.get(url);
        self.send(request, "download")
            .await?
            .text()
            .await
            .with_context(|| format!("Failed to read the body of Drive file {id}"))
    }

    async fn create(&mut self, name: &str) -> Result<String> {
        let metadata = serde_json::json!({
            "name": name,
            "parents": [self.parent()],
            "mimeType": JSON_MIME_TYPE,
        });
        let request = self.client.post(FILES_URL).json(&metadata);
        let created: DriveFile = self
            .send(request, "create")
            .await?
            .json()
            .await
            .context("Failed to parse the Drive create response")?;
        Ok(created.id)
    }

    async fn upload(&mut self, id: &str, body: &str) -> Result<()> {
        let mut url =
            Url::parse(&format!("{UPLOAD_URL}/{id}")).context("Invalid Drive upload URL")?;
        url.query_pairs_mut().append_pair("uploadType", "media");
        let request = self
            .client
            .patch(url)
            .header(reqwest::header::CONTENT_TYPE, JSON_MIME_TYPE)
            .body(body.to_string());
        self.send(request, "upload").await?;
        Ok(())
    }

    async fn list(&mut self) -> Result<Vec<DriveFile>> {
        let filter = format!("'{}' in parents and trashed = false", quote(self.parent()));
        self.query(&filter).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote("categories.json"), "categories.json");
        assert_eq!(quote("bob's"), "bob\\'s");
    }

    #[test]
    fn test_file_list_parse() {
        let json = r#"{"files":[{"id":"abc","name":"categories.json"}]}"#;
        let list: FileList = serde_json::from_str(json).unwrap();
        assert_eq!(list.files.len(), 1);
        assert_eq!(list.files[0].name, "categories.json");
        assert!(list.next_page_token.is_none());
    }
}
