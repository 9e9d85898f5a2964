//! Encoded payload codec
//!
//! Payload bytes are gzip compressed, Ascii85 encoded and wrapped in
//! delimiters so that downstream tooling can find them in plugin output
//! that has been through one or more layers of escaping.

pub mod ascii85;

use crate::utils::PayloadError;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use regex::Regex;
use std::io::{Read, Write};

pub const DEFAULT_LEFT_DELIMITER: &str = "<~";
pub const DEFAULT_RIGHT_DELIMITER: &str = "~>";

/// Matches an Ascii85 body with optional embedded whitespace
pub const DEFAULT_DATA_PATTERN: &str = r"[\s!-uz]+";

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

fn compress(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(input)?;
    encoder.finish()
}

/// Compress, Ascii85 encode and delimit `input`.
///
/// Empty input yields an empty string. If compression fails the raw bytes
/// are encoded instead.
pub fn encode(input: &[u8], left: &str, right: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let body = match compress(input) {
        Ok(compressed) => compressed,
        Err(err) => {
            tracing::warn!(error = %err, "payload compression failed, encoding raw bytes");
            input.to_vec()
        }
    };

    format!("{}{}{}", left, ascii85::encode(&body), right)
}

/// [`encode`] with the default delimiters
pub fn encode_default(input: &[u8]) -> String {
    encode(input, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER)
}

/// Undo one layer of backslash escaping
pub fn unescape(input: &str) -> String {
    input.replace("\\\\", "\\")
}

/// Reverse [`encode`].
///
/// Delimiters are stripped when present. Decoded data without the gzip
/// header is returned as-is. Backslashes are part of the Ascii85 alphabet
/// and are taken literally; use [`decode_escaped`] for escaped text.
pub fn decode(input: &str, left: &str, right: &str) -> Result<Vec<u8>, PayloadError> {
    let mut body = input.trim();
    if !left.is_empty() {
        body = body.strip_prefix(left).unwrap_or(body);
    }
    if !right.is_empty() {
        body = body.strip_suffix(right).unwrap_or(body);
    }

    if body.trim().is_empty() {
        return Ok(Vec::new());
    }

    let decoded = ascii85::decode(body)?;
    if !decoded.starts_with(&GZIP_MAGIC) {
        return Ok(decoded);
    }

    let mut decompressed = Vec::new();
    GzDecoder::new(decoded.as_slice())
        .read_to_end(&mut decompressed)
        .map_err(PayloadError::CompressedInputInvalid)?;
    Ok(decompressed)
}

/// [`decode`] with the default delimiters
pub fn decode_default(input: &str) -> Result<Vec<u8>, PayloadError> {
    decode(input, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER)
}

/// [`decode`] a payload that went through one layer of backslash escaping
pub fn decode_escaped(input: &str, left: &str, right: &str) -> Result<Vec<u8>, PayloadError> {
    decode(&unescape(input), left, right)
}

/// Find the first delimited payload in `text` and return its body.
///
/// `pattern` describes the encoded body and defaults to
/// [`DEFAULT_DATA_PATTERN`]. Without delimiters almost any text matches,
/// so they should always be supplied.
pub fn extract(
    text: &str,
    pattern: Option<&str>,
    left: &str,
    right: &str,
) -> Result<String, PayloadError> {
    let body_pattern = pattern.unwrap_or(DEFAULT_DATA_PATTERN);
    let full = format!(
        "{}({}){}",
        regex::escape(left),
        body_pattern,
        regex::escape(right)
    );
    let re = Regex::new(&full)?;

    re.captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|body| !body.is_empty())
        .ok_or(PayloadError::NotFound)
}

/// Extract the first payload from escaped `text` and decode it.
///
/// One layer of backslash escaping is undone before extraction, as happens
/// when plugin output is returned through a JSON API. Raw plugin output
/// goes through [`extract`] and [`decode`] instead.
pub fn extract_and_decode(
    text: &str,
    pattern: Option<&str>,
    left: &str,
    right: &str,
) -> Result<Vec<u8>, PayloadError> {
    let unescaped = unescape(text);
    let body = extract(&unescaped, pattern, left, right)?;
    decode(&body, "", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(encode_default(b""), "");
        assert_eq!(decode_default("").unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_round_trip() {
        let data = br#"{"format_version":1,"certs":[]}"#;
        let encoded = encode_default(data);
        assert!(encoded.starts_with("<~") && encoded.ends_with("~>"));
        assert_eq!(decode_default(&encoded).unwrap(), data);
    }

    #[test]
    fn test_legacy_uncompressed_payload() {
        let encoded = format!("<~{}~>", ascii85::encode(b"plain text"));
        assert_eq!(decode_default(&encoded).unwrap(), b"plain text");
    }

    #[test]
    fn test_extract_from_surrounding_text() {
        let encoded = encode_default(&[1, 2, 3]);
        let text = format!("OK: fine \n \n**ENCODED PAYLOAD** \n \n{} \n", encoded);
        let body = extract(&text, None, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER).unwrap();
        assert_eq!(decode(&body, "", "").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_custom_delimiters() {
        let encoded = encode(b"abc", "START", "END");
        let text = format!("noise {} noise", encoded);
        let body = extract(&text, None, "START", "END").unwrap();
        assert_eq!(decode(&body, "", "").unwrap(), b"abc");
    }

    /// Deterministic byte sequences of varied length and content
    fn samples() -> Vec<Vec<u8>> {
        let mut state: u32 = 0x2545_f491;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            state
        };
        let mut samples = vec![vec![0, 0, 4, 199], vec![0; 9], vec![0xff; 7], b"\\\\".to_vec()];
        for len in 1..300 {
            samples.push((0..len).map(|_| next() as u8).collect());
        }
        samples
    }

    #[test]
    fn test_round_trip_varied_inputs() {
        for data in samples() {
            let encoded = encode_default(&data);
            assert_eq!(decode_default(&encoded).unwrap(), data, "encoded as {}", encoded);
        }
    }

    #[test]
    fn test_doubled_backslash_in_body_is_literal() {
        let data = [0xb9, 0xbb, 0x75, 0x6a];
        assert_eq!(ascii85::encode(&data), r"\\!!!");
        assert_eq!(decode_default(r"<~\\!!!~>").unwrap(), data);
    }

    #[test]
    fn test_escaped_text_is_unescaped_once() {
        for data in samples() {
            let escaped = encode_default(&data).replace('\\', "\\\\");
            let text = format!("{{\"output\":\"OK: fine \\n{} \\n\"}}", escaped);
            let decoded = extract_and_decode(
                &text,
                None,
                DEFAULT_LEFT_DELIMITER,
                DEFAULT_RIGHT_DELIMITER,
            )
            .unwrap();
            assert_eq!(decoded, data);
            assert_eq!(
                decode_escaped(&escaped, DEFAULT_LEFT_DELIMITER, DEFAULT_RIGHT_DELIMITER).unwrap(),
                data
            );
        }
    }

    #[test]
    fn test_not_found_and_bad_regex() {
        let err = extract("no payload here", None, "<~", "~>").unwrap_err();
        assert!(matches!(err, PayloadError::NotFound));
        let err = extract("<~abc~>", Some("("), "<~", "~>").unwrap_err();
        assert!(matches!(err, PayloadError::RegexInvalid(_)));
    }

    #[test]
    fn test_corrupt_gzip_body() {
        let mut compressed = compress(b"some data to compress").unwrap();
        compressed.truncate(12);
        let encoded = format!("<~{}~>", ascii85::encode(&compressed));
        let err = decode_default(&encoded).unwrap_err();
        assert!(matches!(err, PayloadError::CompressedInputInvalid(_)));
    }
}
