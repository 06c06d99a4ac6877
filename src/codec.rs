//! Portable share-link codec
//!
//! Payloads are raw-deflate compressed JSON, base64url encoded without
//! padding, so they can be dropped into a query string unescaped.

use std::io::{Read, Write};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use flate2::{Compression, read::DeflateDecoder, write::DeflateEncoder};
use reqwest::Url;

use crate::brief::Brief;
use crate::error::{BriefError, Result};

/// Upper bound on the inflated payload, so a tiny link cannot expand without limit.
pub const MAX_DECODED_BYTES: u64 = 1 << 20;

pub fn encode(brief: &Brief) -> Result<String> {
    let json = serde_json::to_vec(brief)?;
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(&json)?;
    let compressed = encoder.finish()?;
    Ok(URL_SAFE_NO_PAD.encode(compressed))
}

pub fn decode(payload: &str) -> Result<Brief> {
    let compressed = URL_SAFE_NO_PAD
        .decode(payload.trim())
        .map_err(|e| decode_err(format!("not base64url: {e}")))?;

    let mut json = Vec::new();
    DeflateDecoder::new(compressed.as_slice())
        .take(MAX_DECODED_BYTES + 1)
        .read_to_end(&mut json)
        .map_err(|e| decode_err(format!("decompression failed: {e}")))?;
    if json.len() as u64 > MAX_DECODED_BYTES {
        return Err(decode_err("payload too large".to_string()));
    }
    if json.is_empty() {
        return Err(decode_err("empty payload".to_string()));
    }

    let brief: Brief =
        serde_json::from_slice(&json).map_err(|e| decode_err(format!("not a brief: {e}")))?;
    match brief.shape_violation() {
        Some(problem) => Err(decode_err(format!("not a valid brief: {problem}"))),
        None => Ok(brief),
    }
}

fn decode_err(message: String) -> BriefError {
    BriefError::Decode { message }
}

/// A share link in either of its two forms
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShareLink {
    /// Self-contained payload (`?data=`).
    Portable(String),
    /// Opaque id resolved against the local store (`?id=`).
    Local(String),
}

pub fn portable_url(origin: &str, brief: &Brief) -> Result<String> {
    Ok(portable_url_for(origin, &encode(brief)?))
}

/// Portable link for an already encoded payload.
pub fn portable_url_for(origin: &str, data: &str) -> String {
    format!("{}/brief?data={}", origin.trim_end_matches('/'), data)
}

pub fn local_url(origin: &str, id: &str) -> String {
    let base = format!("{}/brief", origin.trim_end_matches('/'));
    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut().append_pair("id", id);
            url.to_string()
        }
        Err(_) => format!("{base}?id={id}"),
    }
}

/// Accepts a full share URL, a bare query string, or a bare payload.
/// `data` wins when both parameters are present.
pub fn parse_share_link(input: &str) -> Option<ShareLink> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    let url = Url::parse(input)
        .or_else(|_| Url::parse(&format!("http://local/brief?{}", input.trim_start_matches('?'))))
        .ok()?;

    let mut id = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "data" if !value.trim().is_empty() => {
                return Some(ShareLink::Portable(value.trim().to_string()));
            }
            "id" if !value.trim().is_empty() => id = Some(value.trim().to_string()),
            _ => {}
        }
    }
    match id {
        Some(id) => Some(ShareLink::Local(id)),
        None if !input.contains(['=', '?', '/']) => Some(ShareLink::Portable(input.to_string())),
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brief::{make_demo_brief, pad_with_unknown};

    fn sample() -> Brief {
        let mut brief = make_demo_brief("best earbuds", "under $100", &pad_with_unknown(vec![]));
        brief.top_pick.why = "Très bon rapport qualité/prix — 静か 🎧".to_string();
        brief
    }

    #[test]
    fn test_roundtrip_preserves_unicode() {
        let brief = sample();
        let packed = encode(&brief).unwrap();
        assert!(
            packed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        let back = decode(&packed).unwrap();
        assert_eq!(back, brief);
        assert_eq!(back.top_pick.why.as_bytes(), brief.top_pick.why.as_bytes());
    }

    #[test]
    fn test_corrupt_payloads_fail_distinctly() {
        let packed = encode(&sample()).unwrap();
        let truncated = &packed[..packed.len() / 2];
        for bad in ["", "!!!", "abc$", truncated] {
            let err = decode(bad).unwrap_err();
            assert_eq!(err.kind(), "decode", "input {bad:?}");
        }

        // Valid compression of something that is not a brief
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(br#"{"hello": "world"}"#).unwrap();
        let other = URL_SAFE_NO_PAD.encode(encoder.finish().unwrap());
        assert!(matches!(decode(&other), Err(BriefError::Decode { .. })));
    }

    #[test]
    fn test_share_urls() {
        let brief = sample();
        let url = portable_url("https://brief.example/", &brief).unwrap();
        assert!(url.starts_with("https://brief.example/brief?data="));
        match parse_share_link(&url) {
            Some(ShareLink::Portable(data)) => assert_eq!(decode(&data).unwrap(), brief),
            other => panic!("unexpected {other:?}"),
        }

        let local = local_url("https://brief.example", "k2x9 a&b");
        assert_eq!(
            parse_share_link(&local),
            Some(ShareLink::Local("k2x9 a&b".to_string()))
        );
    }

    #[test]
    fn test_parse_bare_forms() {
        assert_eq!(
            parse_share_link("id=xyz123"),
            Some(ShareLink::Local("xyz123".to_string()))
        );
        assert_eq!(
            parse_share_link("AbC-_09"),
            Some(ShareLink::Portable("AbC-_09".to_string()))
        );
        assert_eq!(parse_share_link("https://brief.example/brief"), None);
        assert_eq!(parse_share_link("  "), None);
    }
}
