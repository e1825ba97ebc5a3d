use std::path::Path;

use anyhow::Result;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONNECTION, HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use super::{ResourceFetcher, data_url, write_atomically};
use crate::base_system::context::Config;
use crate::download::error::HarvestError;

/// 基于 reqwest 阻塞客户端的下载器，按流写入临时文件。
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    overwrite: bool,
}

impl HttpFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        // reqwest in this project is built without default features (no gzip decoder).
        // Request identity encoding so the returned bytes are directly usable.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
        );

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            overwrite: config.allow_overwrite_files,
        })
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, String> {
        let resp = self.client.get(url).send().map_err(|e| e.to_string())?;
        resp.error_for_status().map_err(|e| e.to_string())
    }

    pub fn fetch_bytes(&self, source: &str) -> Result<Vec<u8>, String> {
        let source = normalize_source(source);
        if data_url::is_data_url(source) {
            return data_url::decode(source).map(|(_, bytes)| bytes);
        }
        let resp = self.get(source)?;
        resp.bytes().map(|b| b.to_vec()).map_err(|e| e.to_string())
    }

    pub fn fetch_text(&self, source: &str) -> Result<String, String> {
        let bytes = self.fetch_bytes(source)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// 页面里的 `blob:` 地址去掉前缀后即为真实地址。
pub(crate) fn normalize_source(source: &str) -> &str {
    let trimmed = source.trim();
    trimmed
        .get(..5)
        .filter(|p| p.eq_ignore_ascii_case("blob:"))
        .map(|_| &trimmed[5..])
        .unwrap_or(trimmed)
}

fn file_label(target: &Path) -> String {
    target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| target.display().to_string())
}

impl ResourceFetcher for HttpFetcher {
    fn fetch(&self, source: &str, target: &Path) -> Result<u64, HarvestError> {
        let source = normalize_source(source);
        let fetch_err = |reason: String| HarvestError::Fetch {
            file_name: file_label(target),
            reason,
        };

        if data_url::is_data_url(source) {
            let (_, bytes) = data_url::decode(source).map_err(fetch_err)?;
            return write_atomically(target, self.overwrite, |file| {
                use std::io::Write;
                file.write_all(&bytes).map_err(|e| HarvestError::io(target, e))
            });
        }

        // 先检查覆盖策略，避免白白下载大文件
        if !self.overwrite && target.exists() {
            return Err(HarvestError::AlreadyExists(target.to_path_buf()));
        }

        debug!(target: "fetch", url = source, "开始下载");
        let mut resp = self.get(source).map_err(fetch_err)?;
        write_atomically(target, self.overwrite, |file| {
            resp.copy_to(file).map(|_| ()).map_err(|e| HarvestError::Fetch {
                file_name: file_label(target),
                reason: e.to_string(),
            })
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(overwrite: bool) -> HttpFetcher {
        let cfg = Config {
            allow_overwrite_files: overwrite,
            ..Config::default()
        };
        HttpFetcher::new(&cfg).unwrap()
    }

    #[test]
    fn downloads_to_target() {
        let base = test_server::start(vec![("/video.mp4", b"0123456789".to_vec())]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("lesson.mp4");

        let n = fetcher(true)
            .fetch(&format!("{base}/video.mp4"), &target)
            .unwrap();
        assert_eq!(n, 10);
        assert_eq!(std::fs::read(&target).unwrap(), b"0123456789");
    }

    #[test]
    fn http_error_is_reported_and_leaves_nothing() {
        let base = test_server::start(vec![]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("missing.mp4");

        let err = fetcher(true)
            .fetch(&format!("{base}/missing"), &target)
            .unwrap_err();
        match err {
            HarvestError::Fetch { file_name, reason } => {
                assert_eq!(file_name, "missing.mp4");
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_file_is_kept_without_overwrite() {
        let base = test_server::start(vec![("/a", b"new".to_vec())]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a.bin");
        std::fs::write(&target, b"old").unwrap();

        let err = fetcher(false)
            .fetch(&format!("{base}/a"), &target)
            .unwrap_err();
        assert!(matches!(err, HarvestError::AlreadyExists(_)));
        assert_eq!(std::fs::read(&target).unwrap(), b"old");
    }

    #[test]
    fn blob_prefix_and_data_urls() {
        assert_eq!(normalize_source(" blob:https://m.example.com/v "), "https://m.example.com/v");
        assert_eq!(normalize_source("https://x"), "https://x");

        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("inline.txt");
        fetcher(true)
            .fetch("data:text/plain;base64,aGk=", &target)
            .unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"hi");
        assert_eq!(fetcher(true).fetch_text("data:,plain").unwrap(), "plain");
    }
}
