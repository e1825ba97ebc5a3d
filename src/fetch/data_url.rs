//! `data:` URL 解码。截图库常以 data URL 形式交出渲染结果。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

pub fn is_data_url(source: &str) -> bool {
    source
        .get(..5)
        .is_some_and(|p| p.eq_ignore_ascii_case("data:"))
}

/// 返回 (媒体类型, 内容)。非 base64 的内容做百分号解码。
pub fn decode(source: &str) -> Result<(String, Vec<u8>), String> {
    if !is_data_url(source) {
        return Err("not a data url".to_string());
    }
    let (meta, payload) = source[5..]
        .split_once(',')
        .ok_or_else(|| "data url has no payload".to_string())?;

    let mut parts = meta.split(';');
    let media_type = parts
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("text/plain")
        .to_ascii_lowercase();
    let is_base64 = parts.any(|p| p.eq_ignore_ascii_case("base64"));

    let bytes = if is_base64 {
        let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
        STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| format!("invalid base64 payload: {e}"))?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Ok((media_type, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_base64_and_plain_payloads() {
        let (mt, bytes) = decode("data:image/png;base64,aGVs bG8=").unwrap();
        assert_eq!(mt, "image/png");
        assert_eq!(bytes, b"hello");

        let (mt, bytes) = decode("DATA:,plain").unwrap();
        assert_eq!(mt, "text/plain");
        assert_eq!(bytes, b"plain");

        let (_, bytes) = decode("data:text/html,a%20b%3Cp%3E").unwrap();
        assert_eq!(bytes, b"a b<p>");
    }

    #[test]
    fn rejects_malformed() {
        assert!(decode("https://x").is_err());
        assert!(decode("data:image/png;base64").is_err());
        assert!(decode("data:image/png;base64,@@@").is_err());
    }
}
