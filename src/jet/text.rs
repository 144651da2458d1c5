//! TEXT/MEMO (de)compression (§4.5).
//!
//! A compressed value starts with `0xFF 0xFE` followed by segments
//! separated by `0x00` bytes, alternating compressed (SCSU) and
//! uncompressed (UTF-16 via the database charset) starting in compressed
//! mode. The SCSU codec itself is out of scope for this engine (§1); it is
//! modeled as an injected collaborator, the same way [`crate::jet::page_channel`]
//! injects a [`crate::jet::page_channel::PageCodec`] for encryption.

use crate::JetError;

const COMPRESSION_HEADER: [u8; 2] = [0xFF, 0xFE];
const SEGMENT_SEPARATOR: u8 = 0x00;

/// Expands SCSU-compressed segments back into UTF-16 text. Supplied by an
/// external collaborator (§4.5); this engine bundles no SCSU implementation.
pub trait ScsuDecoder {
    fn reset(&mut self);
    fn expand(&mut self, bytes: &[u8]) -> Result<String, JetError>;
}

/// A decoder that always fails, used when no SCSU collaborator has been
/// configured. Uncompressed TEXT/MEMO values never reach it.
pub struct UnavailableScsuDecoder;

impl ScsuDecoder for UnavailableScsuDecoder {
    fn reset(&mut self) {}
    fn expand(&mut self, _bytes: &[u8]) -> Result<String, JetError> {
        Err(JetError::TextDecode(
            "no SCSU decoder configured for this database".into(),
        ))
    }
}

/// Returns `true` if `bytes` begins with the compression header.
pub fn is_compressed(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPRESSION_HEADER)
}

/// Decode a TEXT/MEMO byte string, dispatching to `decoder` for compressed
/// segments and to plain UTF-16LE-via-`charset` decoding for the rest.
///
/// `charset` is accepted for parity with the write side but only UTF-16LE
/// decoding is implemented for uncompressed segments, matching the
/// default Jet4+ charset; callers on legacy Jet3 databases with a
/// single-byte charset should decode before calling this function.
pub fn decode(bytes: &[u8], decoder: &mut dyn ScsuDecoder) -> Result<String, JetError> {
    if !is_compressed(bytes) {
        return decode_utf16le(bytes);
    }

    let mut out = String::new();
    let mut compressed = true;
    decoder.reset();
    for segment in bytes[COMPRESSION_HEADER.len()..].split(|&b| b == SEGMENT_SEPARATOR) {
        if segment.is_empty() {
            compressed = !compressed;
            continue;
        }
        if compressed {
            out.push_str(&decoder.expand(segment)?);
        } else {
            out.push_str(&decode_utf16le(segment)?);
        }
        compressed = !compressed;
    }
    Ok(out)
}

fn decode_utf16le(bytes: &[u8]) -> Result<String, JetError> {
    if bytes.len() % 2 != 0 {
        return Err(JetError::TextDecode(format!(
            "odd-length UTF-16LE buffer ({} bytes)",
            bytes.len()
        )));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| JetError::TextDecode(e.to_string()))
}

fn encode_utf16le(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() * 2);
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_le_bytes());
    }
    out
}

/// Returns `true` if `s` qualifies for the ISO-Latin-1 compressed write
/// path: at least 3 characters, every one ASCII printable, CR, LF or TAB.
fn is_latin1_compressible(s: &str) -> bool {
    s.chars().count() >= 3
        && s.chars()
            .all(|c| matches!(c, '\r' | '\n' | '\t') || (c.is_ascii_graphic() || c == ' '))
}

/// Encode a TEXT/MEMO value for storage. When `allow_compression` is set
/// and the text qualifies (§4.5 write side), emits the `0xFF 0xFE` header
/// followed by one-byte-per-character ISO-Latin-1 bytes; otherwise emits
/// plain UTF-16LE.
pub fn encode(s: &str, allow_compression: bool) -> Vec<u8> {
    if allow_compression && is_latin1_compressible(s) {
        let mut out = Vec::with_capacity(COMPRESSION_HEADER.len() + s.len());
        out.extend_from_slice(&COMPRESSION_HEADER);
        out.extend(s.chars().map(|c| c as u8));
        out
    } else {
        encode_utf16le(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopScsu;
    impl ScsuDecoder for NoopScsu {
        fn reset(&mut self) {}
        fn expand(&mut self, bytes: &[u8]) -> Result<String, JetError> {
            Ok(bytes.iter().map(|&b| b as char).collect())
        }
    }

    #[test]
    fn uncompressed_round_trip() {
        let encoded = encode_utf16le("hello world");
        let decoded = decode_utf16le(&encoded).unwrap();
        assert_eq!(decoded, "hello world");
    }

    #[test]
    fn latin1_compressible_text_gets_header() {
        let encoded = encode("hello", true);
        assert!(is_compressed(&encoded));
        assert_eq!(&encoded[2..], b"hello");
    }

    #[test]
    fn short_text_is_not_compressed() {
        let encoded = encode("hi", true);
        assert!(!is_compressed(&encoded));
    }

    #[test]
    fn non_ascii_text_falls_back_to_utf16() {
        let encoded = encode("héllo", true);
        assert!(!is_compressed(&encoded));
        assert_eq!(decode_utf16le(&encoded).unwrap(), "héllo");
    }

    #[test]
    fn compression_disabled_always_emits_utf16() {
        let encoded = encode("hello", false);
        assert!(!is_compressed(&encoded));
    }

    #[test]
    fn compressed_segments_alternate_starting_compressed() {
        let mut bytes = COMPRESSION_HEADER.to_vec();
        bytes.extend_from_slice(b"AB"); // compressed segment, decoded via NoopScsu
        bytes.push(SEGMENT_SEPARATOR);
        bytes.extend_from_slice(&encode_utf16le("x")); // uncompressed segment
        bytes.push(SEGMENT_SEPARATOR);
        bytes.extend_from_slice(b"C"); // compressed again

        let mut decoder = NoopScsu;
        let decoded = decode(&bytes, &mut decoder).unwrap();
        assert_eq!(decoded, "ABxC");
    }

    #[test]
    fn unavailable_decoder_errors_on_compressed_input() {
        let mut bytes = COMPRESSION_HEADER.to_vec();
        bytes.extend_from_slice(b"abc");
        let mut decoder = UnavailableScsuDecoder;
        assert!(decode(&bytes, &mut decoder).is_err());
    }
}
