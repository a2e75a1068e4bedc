//! HTTP requests through a PowerShell helper script.
//!
//! The request is serialized to JSON and handed to a script (by default
//! `REQUESTS.PS1`) that performs it with `Invoke-WebRequest` and prints the
//! response body. Responses to cacheable requests are stored under the
//! cache directory, keyed by the SHA-256 of the request JSON.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::GlueError;
use crate::output::ByteDecoder;
use crate::Result;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
}

impl Method {
    /// Uppercase method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Patch => "PATCH",
            Method::Head => "HEAD",
        }
    }

    /// PUT and DELETE responses are never cached.
    pub fn is_cacheable(&self) -> bool {
        !matches!(self, Method::Put | Method::Delete)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = GlueError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "DELETE" => Ok(Method::Delete),
            "PATCH" => Ok(Method::Patch),
            "HEAD" => Ok(Method::Head),
            _ => Err(GlueError::RequestFailed(format!("unsupported method: {}", s))),
        }
    }
}

/// Where the helper script lives and how to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    /// PowerShell executable.
    pub powershell: String,
    /// Arguments placed before the script path.
    pub powershell_args: Vec<String>,
    /// Helper script.
    pub script: PathBuf,
    /// Response cache directory.
    pub cache_dir: PathBuf,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            powershell: "powershell".to_string(),
            powershell_args: vec![
                "-ExecutionPolicy".to_string(),
                "Bypass".to_string(),
                "-File".to_string(),
            ],
            script: PathBuf::from("REQUESTS.PS1"),
            cache_dir: PathBuf::from(".cache"),
        }
    }
}

/// A single request.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<Value>,
    /// Use the response cache (ignored for PUT and DELETE).
    pub cache: bool,
}

/// Wire shape read by the helper script.
#[derive(Serialize)]
struct Payload<'a> {
    #[serde(rename = "URL")]
    url: &'a str,
    #[serde(rename = "Method")]
    method: &'static str,
    #[serde(rename = "Headers")]
    headers: &'a BTreeMap<String, String>,
    #[serde(rename = "Body")]
    body: &'a Value,
}

impl Request {
    /// Create a request without headers, body, or caching.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            body: None,
            cache: false,
        }
    }

    /// Add a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the JSON body.
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Enable or disable the response cache.
    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Whether this request reads and writes the cache.
    pub fn uses_cache(&self) -> bool {
        self.cache && self.method.is_cacheable()
    }

    /// JSON handed to the helper script. A missing body is sent as `{}`.
    pub fn payload_json(&self) -> Result<String> {
        let empty = Value::Object(serde_json::Map::new());
        let payload = Payload {
            url: &self.url,
            method: self.method.as_str(),
            headers: &self.headers,
            body: self.body.as_ref().unwrap_or(&empty),
        };
        Ok(serde_json::to_string(&payload)?)
    }

    /// Cache key: hex SHA-256 of the payload JSON.
    pub fn cache_key(&self) -> Result<String> {
        Ok(hash_payload(&self.payload_json()?))
    }
}

fn hash_payload(data_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data_json.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Request runner backed by PowerShell.
#[derive(Debug, Clone, Default)]
pub struct PwshRequests {
    settings: RequestSettings,
}

impl PwshRequests {
    /// Create a runner with the given settings.
    pub fn new(settings: RequestSettings) -> Self {
        Self { settings }
    }

    /// Current settings.
    pub fn settings(&self) -> &RequestSettings {
        &self.settings
    }

    /// Cache file for a key.
    pub fn cache_path(&self, key: &str) -> PathBuf {
        self.settings.cache_dir.join(format!("{}.json", key))
    }

    /// Perform a request and return the response text.
    pub async fn request(
        &self,
        method: Method,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
        cache: bool,
    ) -> Result<String> {
        let request = Request {
            method,
            url: url.to_string(),
            headers,
            body,
            cache,
        };
        self.send(&request).await
    }

    /// GET, optionally cached.
    pub async fn get(
        &self,
        url: &str,
        headers: BTreeMap<String, String>,
        cache: bool,
    ) -> Result<String> {
        self.request(Method::Get, url, headers, None, cache).await
    }

    /// POST, optionally cached.
    pub async fn post(
        &self,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
        cache: bool,
    ) -> Result<String> {
        self.request(Method::Post, url, headers, body, cache).await
    }

    /// PUT, never cached.
    pub async fn put(
        &self,
        url: &str,
        headers: BTreeMap<String, String>,
        body: Option<Value>,
    ) -> Result<String> {
        self.request(Method::Put, url, headers, body, false).await
    }

    /// DELETE, never cached.
    pub async fn delete(&self, url: &str, headers: BTreeMap<String, String>) -> Result<String> {
        self.request(Method::Delete, url, headers, None, false).await
    }

    /// Perform a prepared request.
    pub async fn send(&self, request: &Request) -> Result<String> {
        let data_json = request.payload_json()?;
        let key = hash_payload(&data_json);
        let cache_file = self.cache_path(&key);
        let use_cache = request.uses_cache();

        if use_cache {
            tokio::fs::create_dir_all(&self.settings.cache_dir).await?;
            if let Some(cached) = load_cached(&cache_file).await? {
                debug!(method = %request.method, url = %request.url, "request: cache hit");
                return Ok(cached);
            }
        }

        debug!(method = %request.method, url = %request.url, "request: running helper script");
        let output = tokio::process::Command::new(&self.settings.powershell)
            .args(&self.settings.powershell_args)
            .arg(&self.settings.script)
            .arg("-dataJson")
            .arg(&data_json)
            .arg("-dir")
            .arg(&self.settings.cache_dir)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| GlueError::Spawn {
                command: self.settings.powershell.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = ByteDecoder::decode_to_string(&output.stderr);
            return Err(GlueError::RequestFailed(stderr.trim().to_string()));
        }

        let response = ByteDecoder::decode_to_string(&output.stdout);
        if use_cache {
            tokio::fs::write(&cache_file, &response).await?;
        }
        Ok(response)
    }
}

async fn load_cached(path: &Path) -> Result<Option<String>> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
