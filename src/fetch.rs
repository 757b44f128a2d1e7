use std::fs::{self, File};
use std::thread;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::CcviError;

pub trait Fetcher: Send + Sync {
    /// Makes `url` available as a local file. `filename` overrides the name
    /// taken from the last URL path segment.
    fn fetch(&self, url: &str, filename: Option<&str>) -> Result<Utf8PathBuf, CcviError>;
}

#[derive(Debug, Clone)]
pub struct RetrieveOptions {
    /// Where fresh downloads land. Usually the run's scratch directory.
    pub download_dir: Utf8PathBuf,
    pub saved_dir: Option<Utf8PathBuf>,
    /// Copy every download into `saved_dir`.
    pub save: bool,
    /// Serve files from `saved_dir` instead of the network.
    pub use_saved: bool,
}

impl RetrieveOptions {
    pub fn new(download_dir: Utf8PathBuf) -> Self {
        Self {
            download_dir,
            saved_dir: None,
            save: false,
            use_saved: false,
        }
    }

    fn saved_dir(&self) -> Result<&Utf8Path, CcviError> {
        self.saved_dir.as_deref().ok_or_else(|| {
            CcviError::InvalidConfig("saved directory required for save/use-saved".to_string())
        })
    }
}

#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
    options: RetrieveOptions,
}

impl HttpFetcher {
    pub fn new(options: RetrieveOptions) -> Result<Self, CcviError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("ccvi-catalog/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| CcviError::InvalidConfig(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|err| CcviError::Network {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(Self { client, options })
    }

    fn download(&self, url: &str, destination: &Utf8Path) -> Result<(), CcviError> {
        let mut response = self.send_with_retries(url, || self.client.get(url))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(CcviError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let message = response
                .text()
                .unwrap_or_else(|_| "request failed".to_string());
            return Err(CcviError::NetworkStatus {
                url: url.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        }
        let mut file = File::create(destination.as_std_path())
            .map_err(|err| CcviError::Filesystem(format!("create {destination}: {err}")))?;
        std::io::copy(&mut response, &mut file).map_err(|err| CcviError::Network {
            url: url.to_string(),
            message: err.to_string(),
        })?;
        Ok(())
    }

    fn send_with_retries<F>(
        &self,
        url: &str,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, CcviError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const MAX_RETRIES: usize = 3;
        const BASE_DELAY_MS: u64 = 500;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < MAX_RETRIES && is_retryable_status(status) {
                        tracing::warn!(url, status, attempt, "retrying download");
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < MAX_RETRIES && is_retryable_error(&err) {
                        tracing::warn!(url, error = %err, attempt, "retrying download");
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(CcviError::Network {
                        url: url.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, filename: Option<&str>) -> Result<Utf8PathBuf, CcviError> {
        let filename = match filename {
            Some(name) => name.to_string(),
            None => filename_from_url(url)?,
        };

        if self.options.use_saved {
            let saved = self.options.saved_dir()?.join(&filename);
            if !saved.as_std_path().is_file() {
                return Err(CcviError::NotFound(saved.to_string()));
            }
            tracing::info!(%url, path = %saved, "using saved file");
            return Ok(saved);
        }

        let destination = self.options.download_dir.join(&filename);
        let start = std::time::Instant::now();
        self.download(url, &destination)?;
        tracing::info!(
            %url,
            path = %destination,
            latency_ms = start.elapsed().as_millis() as u64,
            "downloaded"
        );

        if self.options.save {
            let saved_dir = self.options.saved_dir()?;
            fs::create_dir_all(saved_dir.as_std_path())
                .map_err(|err| CcviError::Filesystem(err.to_string()))?;
            fs::copy(destination.as_std_path(), saved_dir.join(&filename).as_std_path())
                .map_err(|err| CcviError::Filesystem(err.to_string()))?;
        }
        Ok(destination)
    }
}

pub fn filename_from_url(url: &str) -> Result<String, CcviError> {
    let parsed =
        Url::parse(url).map_err(|err| CcviError::InvalidConfig(format!("{url}: {err}")))?;
    parsed
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| CcviError::InvalidConfig(format!("{url}: no file name in URL")))
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}
