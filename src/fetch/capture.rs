//! 内容区域截取：图片统一转为 PNG，HTML 片段包成独立文档。

use std::io::Write;
use std::path::Path;

use image::ImageFormat;

use super::http::HttpFetcher;
use super::{Capturer, write_atomically};
use crate::download::error::HarvestError;
use crate::download::models::CaptureRegion;

pub struct SnapshotCapturer {
    http: HttpFetcher,
}

impl SnapshotCapturer {
    pub fn new(http: HttpFetcher) -> Self {
        Self { http }
    }
}

impl Capturer for SnapshotCapturer {
    fn capture(&self, region: &CaptureRegion, target: &Path) -> Result<u64, HarvestError> {
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let fail = |reason: String| HarvestError::Capture {
            file_name: file_name.clone(),
            reason,
        };
        let overwrite = self.http.overwrite();

        match region {
            CaptureRegion::Image { source } => {
                let bytes = self.http.fetch_bytes(source).map_err(fail)?;
                let img = image::load_from_memory(&bytes)
                    .map_err(|e| fail(format!("decode image: {e}")))?;
                write_atomically(target, overwrite, |file| {
                    img.write_to(file, ImageFormat::Png)
                        .map_err(|e| fail(format!("encode png: {e}")))
                })
            }
            CaptureRegion::DocumentHtml { html } => {
                let doc = wrap_document(&document_title(target), html);
                write_text(target, overwrite, &doc)
            }
            CaptureRegion::DocumentUrl { url } => {
                let body = self.http.fetch_text(url).map_err(fail)?;
                let doc = if looks_like_document(&body) {
                    body
                } else {
                    wrap_document(&document_title(target), &body)
                };
                write_text(target, overwrite, &doc)
            }
        }
    }
}

fn write_text(target: &Path, overwrite: bool, text: &str) -> Result<u64, HarvestError> {
    write_atomically(target, overwrite, |file| {
        file.write_all(text.as_bytes())
            .map_err(|e| HarvestError::io(target, e))
    })
}

fn document_title(target: &Path) -> String {
    target
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn looks_like_document(body: &str) -> bool {
    let head: String = body.trim_start().chars().take(64).collect();
    let head = head.to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

pub(crate) fn wrap_document(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n{}\n</body>\n</html>\n",
        escape_html(title),
        body
    )
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::context::Config;
    use crate::fetch::http::test_server;
    use base64::Engine;
    use std::io::Cursor;

    fn capturer() -> SnapshotCapturer {
        SnapshotCapturer::new(HttpFetcher::new(&Config::default()).unwrap())
    }

    fn tiny_png() -> Vec<u8> {
        let img = image::RgbImage::from_pixel(2, 2, image::Rgb([200, 10, 10]));
        let mut out = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn inline_html_becomes_standalone_document() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("Quiz <1>.html");
        let region = CaptureRegion::DocumentHtml {
            html: "<p>Q1</p>".to_string(),
        };
        capturer().capture(&region, &target).unwrap();
        let doc = std::fs::read_to_string(&target).unwrap();
        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Quiz &lt;1&gt;</title>"));
        assert!(doc.contains("<p>Q1</p>"));
    }

    #[test]
    fn remote_document_is_kept_as_is() {
        let page = b"<html><body>full</body></html>".to_vec();
        let base = test_server::start(vec![("/quiz", page.clone())]);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("quiz.html");
        let region = CaptureRegion::DocumentUrl {
            url: format!("{base}/quiz"),
        };
        capturer().capture(&region, &target).unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), page);
    }

    #[test]
    fn data_url_image_is_reencoded_as_png() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(tiny_png());
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("shot.png");
        let region = CaptureRegion::Image {
            source: format!("data:image/png;base64,{encoded}"),
        };
        capturer().capture(&region, &target).unwrap();

        let saved = image::open(&target).unwrap();
        assert_eq!((saved.width(), saved.height()), (2, 2));
    }

    #[test]
    fn undecodable_image_is_a_capture_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("bad.png");
        let region = CaptureRegion::Image {
            source: "data:image/png;base64,aGVsbG8=".to_string(),
        };
        let err = capturer().capture(&region, &target).unwrap_err();
        assert!(matches!(err, HarvestError::Capture { .. }));
        assert!(!target.exists());
    }
}
