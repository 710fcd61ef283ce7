//! Body decoding helpers for feed processing.

use std::io::Read;
use tracing::debug;

use crate::TARGET_WEB_REQUEST;

/// Clean up malformed XML
pub fn cleanup_xml(xml: &str) -> String {
    let mut cleaned = xml.trim().trim_start_matches('\u{FEFF}').to_string();

    // Drop anything before the document element.
    if let Some(xml_start) = cleaned.find("<?xml") {
        cleaned = cleaned[xml_start..].to_string();
    } else if let Some(rss_start) = cleaned.find("<rss") {
        cleaned = cleaned[rss_start..].to_string();
    } else if let Some(feed_start) = cleaned.find("<feed") {
        cleaned = cleaned[feed_start..].to_string();
    }

    // HTML entities that are not defined in XML
    cleaned = cleaned
        .replace("&nbsp;", "&#160;")
        .replace("&ndash;", "&#8211;")
        .replace("&mdash;", "&#8212;")
        .replace("&rsquo;", "&#8217;")
        .replace("&lsquo;", "&#8216;")
        .replace("&rdquo;", "&#8221;")
        .replace("&ldquo;", "&#8220;")
        .replace("&hellip;", "&#8230;")
        .replace("&amp;amp;", "&amp;")
        .replace("&apos;", "&#39;");

    cleaned = cleaned
        .chars()
        .filter(|&c| {
            matches!(c,
                '\u{0009}' | '\u{000A}' | '\u{000D}' |
                '\u{0020}'..='\u{D7FF}' |
                '\u{E000}'..='\u{FFFD}' |
                '\u{10000}'..='\u{10FFFF}'
            )
        })
        .collect();

    if !cleaned.starts_with("<?xml") {
        cleaned = format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", cleaned);
    }

    cleaned
}

/// True when the bytes already look like an XML or JSON document.
fn looks_like_text(bytes: &[u8]) -> bool {
    let start = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    start
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'<' || *b == b'{')
}

/// Try various decompression methods for a byte array
pub fn try_decompressions(bytes: &[u8], feed_url: &str) -> Vec<u8> {
    if looks_like_text(bytes) {
        return bytes.to_vec();
    }

    let mut decoded = Vec::new();
    if flate2::read::GzDecoder::new(bytes).read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with gzip from {}", feed_url);
        return decoded;
    }

    let mut decoded = Vec::new();
    if flate2::read::ZlibDecoder::new(bytes).read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with zlib from {}", feed_url);
        return decoded;
    }

    let mut decoded = Vec::new();
    if flate2::read::DeflateDecoder::new(bytes).read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
        debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed with deflate from {}", feed_url);
        return decoded;
    }

    debug!(target: TARGET_WEB_REQUEST, "No decompression method worked for {}, using original bytes", feed_url);
    bytes.to_vec()
}

/// Undo any content encoding the HTTP client left in place. Brotli is only
/// attempted when the server declared it.
pub fn decompress_body(bytes: &[u8], content_encoding: Option<&str>, feed_url: &str) -> Vec<u8> {
    if content_encoding == Some("br") {
        let mut decoded = Vec::new();
        let mut reader = brotli::Decompressor::new(bytes, 4096);
        if reader.read_to_end(&mut decoded).is_ok() && !decoded.is_empty() {
            debug!(target: TARGET_WEB_REQUEST, "Successfully decompressed brotli content from {}", feed_url);
            return decoded;
        }
        debug!(target: TARGET_WEB_REQUEST, "Brotli decompression failed for {}, trying other methods", feed_url);
    }
    try_decompressions(bytes, feed_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_cleanup_xml() {
        let dirty = "\u{FEFF}  junk<rss version=\"2.0\"><channel><title>A&nbsp;B</title></channel></rss>";
        let cleaned = cleanup_xml(dirty);
        assert!(cleaned.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<rss"));
        assert!(cleaned.contains("A&#160;B"));
        assert!(!cleaned.contains("junk"));
    }

    #[test]
    fn test_plain_body_is_untouched() {
        let body = b"  <?xml version=\"1.0\"?><rss/>";
        assert_eq!(try_decompressions(body, "test"), body.to_vec());
    }

    #[test]
    fn test_gzip_body_is_inflated() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"<rss></rss>").unwrap();
        let compressed = encoder.finish().unwrap();
        assert_eq!(decompress_body(&compressed, Some("gzip"), "test"), b"<rss></rss>".to_vec());
    }

    #[test]
    fn test_brotli_body_is_inflated() {
        let mut compressed = Vec::new();
        {
            let mut writer = brotli::CompressorWriter::new(&mut compressed, 4096, 5, 22);
            writer.write_all(b"{\"items\":[]}").unwrap();
        }
        assert_eq!(decompress_body(&compressed, Some("br"), "test"), b"{\"items\":[]}".to_vec());
    }
}
