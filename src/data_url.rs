//! Decoding images passed as `data:` URLs.

use std::sync::LazyLock;

use base64::{Engine as _, prelude::BASE64_STANDARD};
use regex::Regex;

use crate::prelude::*;

/// Regex for parsing a `data:` URL. Browsers produce these when capturing
/// photos, so we accept them anywhere we accept an image path.
static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^data:(?P<mime_type>[^;,]+);base64,(?P<data>.+)$")
        .expect("failed to compile regex")
});

/// Does this look like a `data:` URL?
pub fn is_data_url(s: &str) -> bool {
    s.starts_with("data:")
}

/// Parse a `data:` URL into a MIME type and Base64-encoded data.
pub fn parse_data_url(data_url: &str) -> Option<(&str, &str)> {
    let caps = DATA_URL_RE.captures(data_url.trim())?;
    let mime_type = caps.name("mime_type")?.as_str();
    let data = caps.name("data")?.as_str();
    Some((mime_type, data))
}

/// Decode a `data:` URL into its declared MIME type and raw bytes.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>)> {
    let (mime_type, data) = parse_data_url(data_url)
        .ok_or_else(|| anyhow!("expected a Base64 `data:` URL"))?;
    // Pasted URLs are often wrapped across several lines.
    let data = data
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>();
    let bytes = BASE64_STANDARD
        .decode(data)
        .with_context(|| format!("failed to decode Base64 data for {mime_type}"))?;
    Ok((mime_type.to_owned(), bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_base64_data_urls() {
        let (mime_type, data) = parse_data_url("data:image/png;base64,iVBORw0K").unwrap();
        assert_eq!(mime_type, "image/png");
        assert_eq!(data, "iVBORw0K");
        assert!(parse_data_url("data:image/png,raw").is_none());
        assert!(parse_data_url("image.png").is_none());
    }

    #[test]
    fn decodes_wrapped_base64() {
        let url = format!("data:image/gif;base64,{}\n", BASE64_STANDARD.encode(b"GIF89a"));
        let (mime_type, bytes) = decode_data_url(&url).unwrap();
        assert_eq!(mime_type, "image/gif");
        assert_eq!(bytes, b"GIF89a");

        let (_, bytes) = decode_data_url("data:image/gif;base64,R0lG\nODlh").unwrap();
        assert_eq!(bytes, b"GIF89a");
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(decode_data_url("data:image/png;base64,***").is_err());
        assert!(decode_data_url("not a url").is_err());
    }
}
