//! Embedded image extraction
//!
//! Images on reading pages are inlined as `data:image/...;base64,...` URIs.
//! Only the first `div#primary` is searched; pages without one fall back to
//! the whole body.

use std::sync::LazyLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use scraper::{Html, Selector};

use super::types::EmbeddedImageError;

/// Prefix that marks an inline image source
const DATA_IMAGE_PREFIX: &str = "data:image";

static CONTENT_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#primary").expect("content selector is valid"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("body selector is valid"));
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("img selector is valid"));

/// Collect the inline image sources of a page, in document order
pub fn extract_embedded_images(html: &str) -> Vec<String> {
    let doc = Html::parse_document(html);

    let Some(content) = doc
        .select(&CONTENT_SELECTOR)
        .next()
        .or_else(|| doc.select(&BODY_SELECTOR).next())
    else {
        return Vec::new();
    };

    content
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .filter(|src| src.starts_with(DATA_IMAGE_PREFIX))
        .map(str::to_string)
        .collect()
}

/// Decode the payload of an inline image URI
///
/// Everything after the first comma is base64; ASCII whitespace inside it is
/// ignored.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, EmbeddedImageError> {
    let (_, payload) = uri
        .split_once(',')
        .ok_or(EmbeddedImageError::MissingPayload)?;

    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    if compact.is_empty() {
        return Err(EmbeddedImageError::EmptyPayload);
    }

    Ok(STANDARD.decode(compact)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_uri(bytes: &[u8]) -> String {
        format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes))
    }

    #[test]
    fn test_extract_from_primary_only() {
        let html = format!(
            r#"<html><body>
                <div id="sidebar"><img src="{}"></div>
                <div id="primary">
                    <img src="{}">
                    <img src="https://cdn.example.com/ad.png">
                    <p><img src="{}"></p>
                </div>
            </body></html>"#,
            data_uri(b"side"),
            data_uri(b"one"),
            data_uri(b"two")
        );

        let images = extract_embedded_images(&html);
        assert_eq!(images, vec![data_uri(b"one"), data_uri(b"two")]);
    }

    #[test]
    fn test_extract_falls_back_to_body() {
        let html = format!(
            r#"<html><body><main><img src="{}"><img src="{}"></main></body></html>"#,
            data_uri(b"a"),
            data_uri(b"b")
        );
        assert_eq!(extract_embedded_images(&html).len(), 2);
    }

    #[test]
    fn test_extract_no_images() {
        let html = r#"<html><body><div id="primary"><p>The end.</p></div></body></html>"#;
        assert!(extract_embedded_images(html).is_empty());
    }

    #[test]
    fn test_extract_ignores_img_without_src() {
        let html = r#"<div id="primary"><img alt="x"><img src=""></div>"#;
        assert!(extract_embedded_images(html).is_empty());
    }

    #[test]
    fn test_decode_data_uri() {
        let bytes = decode_data_uri(&data_uri(&[0xFF, 0xD8, 0xFF, 0xE0])).unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF, 0xE0]);
    }

    #[test]
    fn test_decode_ignores_whitespace() {
        let encoded = STANDARD.encode(b"hello slice");
        let (head, tail) = encoded.split_at(4);
        let uri = format!("data:image/png;base64,{}\n  {}", head, tail);
        assert_eq!(decode_data_uri(&uri).unwrap(), b"hello slice");
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            decode_data_uri("data:image/png;base64"),
            Err(EmbeddedImageError::MissingPayload)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,"),
            Err(EmbeddedImageError::EmptyPayload)
        ));
        assert!(matches!(
            decode_data_uri("data:image/png;base64,@@@@"),
            Err(EmbeddedImageError::InvalidBase64(_))
        ));
    }
}
