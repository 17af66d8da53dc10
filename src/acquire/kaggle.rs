//! Kaggle dataset host.
//!
//! Authentication only resolves credentials locally, the same way the Kaggle
//! command-line client does; the network is touched by the download alone.

use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use log::{debug, info};
use reqwest::StatusCode;
use serde::Deserialize;

use super::{AcquireError, DatasetHost, DatasetRef};
use crate::config::KAGGLE_API_BASE;

const USER_AGENT: &str = concat!("vitals-report/", env!("CARGO_PKG_VERSION"));
const CREDENTIALS_FILE: &str = "kaggle.json";

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// Kaggle API username and key.
#[derive(Clone, PartialEq, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Resolve from the process environment and the standard config locations.
    pub fn resolve() -> Result<Self, AcquireError> {
        let env = |name: &str| std::env::var(name).ok();
        let dirs = Self::config_dirs(env);
        Self::resolve_with(env, &dirs)
    }

    /// `KAGGLE_USERNAME` + `KAGGLE_KEY` win; otherwise the first `kaggle.json`
    /// found in `config_dirs`.
    pub fn resolve_with(
        env: impl Fn(&str) -> Option<String>,
        config_dirs: &[PathBuf],
    ) -> Result<Self, AcquireError> {
        let non_empty = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        if let (Some(username), Some(key)) = (non_empty("KAGGLE_USERNAME"), non_empty("KAGGLE_KEY")) {
            debug!("Using Kaggle credentials from environment");
            return Ok(Credentials { username, key });
        }

        for dir in config_dirs {
            let path = dir.join(CREDENTIALS_FILE);
            if path.is_file() {
                debug!("Using Kaggle credentials from {}", path.display());
                return Self::from_file(&path);
            }
        }
        Err(AcquireError::MissingCredentials)
    }

    /// Read a `kaggle.json` file.
    pub fn from_file(path: &Path) -> Result<Self, AcquireError> {
        let text = std::fs::read_to_string(path).map_err(|e| AcquireError::Authentication {
            message: format!("reading {}: {e}", path.display()),
        })?;
        let creds: Credentials =
            serde_json::from_str(&text).map_err(|e| AcquireError::Authentication {
                message: format!("parsing {}: {e}", path.display()),
            })?;
        if creds.username.is_empty() || creds.key.is_empty() {
            return Err(AcquireError::Authentication {
                message: format!("{} has an empty username or key", path.display()),
            });
        }
        Ok(creds)
    }

    /// `$KAGGLE_CONFIG_DIR` when set, else `~/.kaggle` then `<config dir>/kaggle`.
    fn config_dirs(env: impl Fn(&str) -> Option<String>) -> Vec<PathBuf> {
        if let Some(dir) = env("KAGGLE_CONFIG_DIR") {
            return vec![PathBuf::from(dir)];
        }
        let mut dirs_found = Vec::new();
        if let Some(home) = dirs::home_dir() {
            dirs_found.push(home.join(".kaggle"));
        }
        if let Some(config) = dirs::config_dir() {
            dirs_found.push(config.join("kaggle"));
        }
        dirs_found
    }
}

// ---------------------------------------------------------------------------
// API client
// ---------------------------------------------------------------------------

/// Blocking client for the Kaggle dataset download endpoint.
#[derive(Debug)]
pub struct KaggleApi {
    base_url: String,
    credentials: Option<Credentials>,
    use_env_proxy: bool,
}

impl KaggleApi {
    pub fn new() -> Self {
        Self::with_base_url(KAGGLE_API_BASE)
    }

    /// Client talking to a different API root.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials: None,
            use_env_proxy: true,
        }
    }

    /// Ignore `HTTP_PROXY`/`HTTPS_PROXY` from the environment.
    pub fn without_proxy(mut self) -> Self {
        self.use_env_proxy = false;
        self
    }

    /// Client with credentials already in hand; `authenticate` keeps them.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn download_url(&self, dataset: &DatasetRef) -> String {
        format!(
            "{}/datasets/download/{}/{}",
            self.base_url,
            dataset.owner(),
            dataset.name()
        )
    }

    fn fetch(&self, dataset: &DatasetRef, credentials: &Credentials) -> Result<Vec<u8>, AcquireError> {
        let transfer = |message: String| AcquireError::Transfer {
            dataset: dataset.to_string(),
            message,
        };

        let mut builder = reqwest::blocking::Client::builder().user_agent(USER_AGENT);
        if !self.use_env_proxy {
            builder = builder.no_proxy();
        }
        let client = builder
            .build()
            .map_err(|e| transfer(format!("failed to create HTTP client: {e}")))?;

        let url = self.download_url(dataset);
        debug!("GET {url}");
        let response = client
            .get(&url)
            .basic_auth(&credentials.username, Some(&credentials.key))
            .send()
            .map_err(|e| transfer(format!("request failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AcquireError::DatasetNotFound {
                dataset: dataset.to_string(),
            });
        }
        if !status.is_success() {
            return Err(transfer(format!("server returned {status}")));
        }

        let body = response
            .bytes()
            .map_err(|e| transfer(format!("reading response body: {e}")))?;
        debug!("Received {} bytes for {dataset}", body.len());
        Ok(body.to_vec())
    }
}

impl DatasetHost for KaggleApi {
    fn authenticate(&mut self) -> Result<(), AcquireError> {
        if self.credentials.is_none() {
            self.credentials = Some(Credentials::resolve()?);
        }
        Ok(())
    }

    fn download_and_unpack(&self, dataset: &DatasetRef, target: &Path) -> Result<(), AcquireError> {
        let credentials = self
            .credentials
            .as_ref()
            .ok_or(AcquireError::NotAuthenticated)?;
        let body = self.fetch(dataset, credentials)?;

        let archive_path = target.join(format!("{}.zip", dataset.name()));
        std::fs::write(&archive_path, &body).map_err(|source| AcquireError::Io {
            path: archive_path.clone(),
            source,
        })?;
        unpack_archive(&archive_path, target)?;
        std::fs::remove_file(&archive_path).map_err(|source| AcquireError::Io {
            path: archive_path.clone(),
            source,
        })?;
        Ok(())
    }
}

/// Extract every entry of the zip archive at `archive` into `target`.
///
/// Entries whose names would escape `target` are rejected by the zip reader.
pub fn unpack_archive(archive: &Path, target: &Path) -> Result<usize, AcquireError> {
    let file = File::open(archive).map_err(|source| AcquireError::Io {
        path: archive.to_path_buf(),
        source,
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| AcquireError::Archive {
        message: format!("{}: {e}", archive.display()),
    })?;
    let entries = zip.len();
    zip.extract(target).map_err(|e| AcquireError::Archive {
        message: format!("{}: {e}", archive.display()),
    })?;
    info!(
        "Unpacked {entries} entries from {} into '{}'",
        archive.display(),
        target.display()
    );
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;
    use tempfile::TempDir;

    fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buffer));
            let options = zip::write::SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, contents) in files {
                zip.start_file(*name, options).unwrap();
                zip.write_all(contents.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buffer
    }

    /// Serve exactly one HTTP response; the thread yields the request head.
    fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut head = String::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" || line.is_empty() {
                    break;
                }
                head.push_str(&line);
            }
            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: {}\r\nContent-Type: application/zip\r\nConnection: close\r\n\r\n",
                body.len()
            )
            .unwrap();
            stream.write_all(&body).unwrap();
            stream.flush().unwrap();
            head
        });
        (base, handle)
    }

    fn creds() -> Credentials {
        Credentials {
            username: "analyst".into(),
            key: "secret".into(),
        }
    }

    fn dataset() -> DatasetRef {
        DatasetRef::new("owner", "vitals")
    }

    #[test]
    fn test_env_credentials_take_priority() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("kaggle.json"),
            r#"{"username": "file-user", "key": "file-key"}"#,
        )
        .unwrap();
        let env: HashMap<&str, &str> = [("KAGGLE_USERNAME", "env-user"), ("KAGGLE_KEY", "env-key")].into();

        let creds = Credentials::resolve_with(
            |k| env.get(k).map(|v| v.to_string()),
            &[dir.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(creds.username, "env-user");
        assert_eq!(creds.key, "env-key");
    }

    #[test]
    fn test_partial_env_falls_back_to_file() {
        let empty = TempDir::new().unwrap();
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("kaggle.json"),
            r#"{"username": "file-user", "key": "file-key"}"#,
        )
        .unwrap();

        let creds = Credentials::resolve_with(
            |k| (k == "KAGGLE_USERNAME").then(|| "env-user".to_string()),
            &[empty.path().to_path_buf(), dir.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(creds.username, "file-user");
    }

    #[test]
    fn test_no_credentials_anywhere() {
        let dir = TempDir::new().unwrap();
        let err = Credentials::resolve_with(|_| None, &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, AcquireError::MissingCredentials));
    }

    #[test]
    fn test_malformed_credentials_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("kaggle.json"), "{not json").unwrap();
        let err = Credentials::resolve_with(|_| None, &[dir.path().to_path_buf()]).unwrap_err();
        assert!(matches!(err, AcquireError::Authentication { .. }));
    }

    #[test]
    fn test_debug_redacts_key() {
        let text = format!("{:?}", creds());
        assert!(text.contains("analyst"));
        assert!(!text.contains("secret"));
    }

    #[test]
    fn test_download_url() {
        let api = KaggleApi::with_base_url("https://example.test/api/v1/");
        assert_eq!(
            api.download_url(&dataset()),
            "https://example.test/api/v1/datasets/download/owner/vitals"
        );
    }

    #[test]
    fn test_download_requires_authentication() {
        let dir = TempDir::new().unwrap();
        let api = KaggleApi::with_base_url("http://127.0.0.1:9");
        let err = api.download_and_unpack(&dataset(), dir.path()).unwrap_err();
        assert!(matches!(err, AcquireError::NotAuthenticated));
    }

    #[test]
    fn test_authenticate_keeps_given_credentials() {
        let mut api = KaggleApi::new().with_credentials(creds());
        api.authenticate().unwrap();
        assert_eq!(api.credentials, Some(creds()));
    }

    #[test]
    fn test_unpack_archive() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bundle.zip");
        std::fs::write(&archive, zip_bytes(&[("a.csv", "x\n1\n"), ("notes.txt", "hi")])).unwrap();

        let n = unpack_archive(&archive, dir.path()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.csv")).unwrap(), "x\n1\n");
    }

    #[test]
    fn test_unpack_rejects_non_zip() {
        let dir = TempDir::new().unwrap();
        let archive = dir.path().join("bundle.zip");
        std::fs::write(&archive, "<html>not a zip</html>").unwrap();
        let err = unpack_archive(&archive, dir.path()).unwrap_err();
        assert!(matches!(err, AcquireError::Archive { .. }));
    }

    #[test]
    fn test_download_and_unpack_over_http() {
        let dir = TempDir::new().unwrap();
        let body = zip_bytes(&[("heart.csv", "age,systolic_bp\n30,120\n")]);
        let (base, server) = serve_once("200 OK", body);

        let api = KaggleApi::with_base_url(format!("{base}/api/v1"))
            .without_proxy()
            .with_credentials(creds());
        api.download_and_unpack(&dataset(), dir.path()).unwrap();

        let head = server.join().unwrap();
        assert!(head.starts_with("GET /api/v1/datasets/download/owner/vitals "));
        assert!(head.to_ascii_lowercase().contains("authorization: basic "));
        assert!(dir.path().join("heart.csv").is_file());
        assert!(!dir.path().join("vitals.zip").exists());
    }

    #[test]
    fn test_not_found_status() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("404 Not Found", Vec::new());

        let api = KaggleApi::with_base_url(base).without_proxy().with_credentials(creds());
        let err = api.download_and_unpack(&dataset(), dir.path()).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, AcquireError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_server_error_is_transfer_failure() {
        let dir = TempDir::new().unwrap();
        let (base, server) = serve_once("500 Internal Server Error", Vec::new());

        let api = KaggleApi::with_base_url(base).without_proxy().with_credentials(creds());
        let err = api.download_and_unpack(&dataset(), dir.path()).unwrap_err();
        server.join().unwrap();
        assert!(matches!(err, AcquireError::Transfer { ref message, .. } if message.contains("500")));
    }
}
