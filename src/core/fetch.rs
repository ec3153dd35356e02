use std::{
    fs::File,
    io::{BufReader, Read},
    path::PathBuf,
};

use async_trait::async_trait;
use awc::Client;

use crate::error::{Error, Result};

const MAX_BODY_SIZE: usize = 8 * 1024 * 1024;

/// GET access to same-origin JSON assets, addressed by path relative to the site root.
#[async_trait(?Send)]
pub trait Fetch {
    async fn get(&self, path: &str) -> Result<Vec<u8>>;
}

/// Fetches assets over HTTP from a running site.
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpFetcher {
            client: Client::default(),
            base_url: base_url.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait(?Send)]
impl Fetch for HttpFetcher {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path);
        match self.client.get(&url).send().await {
            Ok(mut response) => {
                if !response.status().is_success() {
                    return Err(Error::Status {
                        url,
                        status: response.status().as_u16(),
                    });
                }
                match response.body().limit(MAX_BODY_SIZE).await {
                    Ok(body) => {
                        tracing::debug!(%url, size = body.len(), "Fetched asset");
                        Ok(body.to_vec())
                    }
                    Err(error) => Err(Error::fetch(url, error)),
                }
            }
            Err(error) => Err(Error::fetch(url, error)),
        }
    }
}

/// Reads assets straight from a build output directory.
pub struct LocalFetcher {
    root: PathBuf,
}

impl LocalFetcher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalFetcher { root: root.into() }
    }
}

#[async_trait(?Send)]
impl Fetch for LocalFetcher {
    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let file_path = self.root.join(path.trim_start_matches('/'));
        match File::open(&file_path) {
            Ok(file) => {
                let mut buffer: Vec<u8> = Vec::new();
                let mut reader = BufReader::new(file);
                reader.read_to_end(&mut buffer)?;
                tracing::debug!(path = %file_path.display(), size = buffer.len(), "Read asset");
                Ok(buffer)
            }
            Err(error) => Err(Error::fetch(file_path.display().to_string(), error)),
        }
    }
}
