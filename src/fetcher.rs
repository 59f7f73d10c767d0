use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};
use tracing::info;

use crate::config::{Config, LogType};
use crate::error::{ItemError, TransportError};
use crate::output;
use crate::parsers::LogId;

const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:109.0) Gecko/20100101 Firefox/110.0";
const PREVIEW_CHARS: usize = 30;

/// Where raw logs come from.
pub trait LogSource {
    fn fetch_text(&self, base_id: &str) -> Result<String, TransportError>;
}

/// The tenhou.net log endpoints.
pub struct HttpSource {
    client: Client,
    log_type: LogType,
}

impl HttpSource {
    pub fn new(log_type: LogType) -> Result<Self, TransportError> {
        let client = Client::builder().build()?;
        Ok(Self { client, log_type })
    }

    fn request_for(&self, base_id: &str) -> (String, HeaderMap) {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_UA));
        let url = match self.log_type {
            LogType::Xml => format!("https://tenhou.net/0/log/?{base_id}"),
            LogType::Json => {
                let referer = format!("https://tenhou.net/6/?log={base_id}");
                if let Ok(referer) = HeaderValue::from_str(&referer) {
                    headers.insert(REFERER, referer);
                }
                format!("https://tenhou.net/5/mjlog2json.cgi?{base_id}")
            }
        };
        (url, headers)
    }
}

impl LogSource for HttpSource {
    fn fetch_text(&self, base_id: &str) -> Result<String, TransportError> {
        let (url, headers) = self.request_for(base_id);
        let response = self.client.get(&url).headers(headers).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.text()?)
    }
}

/// Result of a fetch, with whether the network was touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub id: LogId,
    pub cache_hit: bool,
}

/// Make sure the raw record for `id` exists locally, downloading it only when it is missing or empty.
pub fn fetch(source: &dyn LogSource, id: LogId, config: &Config) -> Result<Fetched, ItemError> {
    let path = output::raw_path(config, &id);
    if output::is_materialized(&path) {
        info!(id = %id, path = %path.display(), "raw log already present, skipping download");
        return Ok(Fetched { id, cache_hit: true });
    }

    let content = source.fetch_text(id.base())?;
    info!(id = %id, len = content.len(), "log content length");
    info!(id = %id, "log content: '{}..........{}'", head(&content), tail(&content));

    output::create_parent_dirs(&path)?;
    output::write_atomically(&path, &content)?;
    info!(path = %path.display(), "log content written to file");
    Ok(Fetched { id, cache_hit: false })
}

fn head(s: &str) -> &str {
    match s.char_indices().nth(PREVIEW_CHARS) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

fn tail(s: &str) -> &str {
    match s.char_indices().rev().nth(PREVIEW_CHARS - 1) {
        Some((i, _)) => &s[i..],
        None => s,
    }
}
