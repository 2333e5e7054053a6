use crate::domain::model::MenuItem;
use crate::domain::ports::MenuSource;
use crate::utils::error::{JarvisError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MENU_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts a bare array or an object wrapping it as `items` or `menu`.
fn decode_menu(json_data: serde_json::Value) -> Result<Vec<MenuItem>> {
    let items = match json_data {
        serde_json::Value::Array(_) => json_data,
        serde_json::Value::Object(mut obj) => obj
            .remove("items")
            .or_else(|| obj.remove("menu"))
            .ok_or_else(|| JarvisError::MenuError {
                message: "expected an array or an object with an `items` array".to_string(),
            })?,
        _ => {
            return Err(JarvisError::MenuError {
                message: "expected a JSON array of menu items".to_string(),
            })
        }
    };

    let menu: Vec<MenuItem> = serde_json::from_value(items)?;
    Ok(menu)
}

/// Menu stored as a JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileMenuSource {
    path: PathBuf,
}

impl FileMenuSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl MenuSource for FileMenuSource {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>> {
        tracing::debug!("Reading menu from {}", self.path.display());
        let data = tokio::fs::read(&self.path).await?;
        let json_data: serde_json::Value = serde_json::from_slice(&data)?;
        decode_menu(json_data)
    }
}

/// Menu served by the canteen backend.
#[derive(Debug, Clone)]
pub struct HttpMenuSource {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpMenuSource {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::new(),
            timeout: DEFAULT_MENU_TIMEOUT,
        }
    }

    /// Upper bound for the whole fetch, body included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn fetch(&self) -> Result<Vec<MenuItem>> {
        let response = self.client.get(&self.endpoint).send().await?;

        tracing::debug!("Menu response status: {}", response.status());
        if !response.status().is_success() {
            return Err(JarvisError::MenuError {
                message: format!("{} returned {}", self.endpoint, response.status()),
            });
        }

        let json_data: serde_json::Value = response.json().await?;
        decode_menu(json_data)
    }
}

#[async_trait]
impl MenuSource for HttpMenuSource {
    async fn fetch_menu(&self) -> Result<Vec<MenuItem>> {
        tracing::debug!("Fetching menu from {}", self.endpoint);
        tokio::time::timeout(self.timeout, self.fetch())
            .await
            .map_err(|_| JarvisError::MenuError {
                message: format!("{} did not answer within {:?}", self.endpoint, self.timeout),
            })?
    }
}

/// Picks the HTTP source for `http(s)://` locations and the file source otherwise.
pub fn menu_source_for(location: &str) -> Box<dyn MenuSource> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpMenuSource::new(location))
    } else {
        Box::new(FileMenuSource::new(location))
    }
}
