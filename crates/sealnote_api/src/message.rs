//! Message payloads and their (optionally compressed) body encoding.

use crate::wire::{CodecReader, CodecWriter};
use crate::*;
use std::io::{Read, Write};

const BODY_RAW: u8 = 0;
const BODY_DEFLATE: u8 = 1;

const KIND_TEXT: u8 = 0;

/// Upper bound on the decompressed size of a message body.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// A message payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Plain text.
    Text(String),
}

impl Message {
    fn to_payload(&self) -> SealResult<Vec<u8>> {
        let mut writer = CodecWriter::new();
        match self {
            Self::Text(content) => {
                writer.write_u8(KIND_TEXT)?;
                writer.write_bytes(content.as_bytes())?;
            }
        }
        Ok(writer.into_vec())
    }

    fn from_payload(payload: &[u8]) -> SealResult<Self> {
        let mut reader = CodecReader::new(payload);
        match reader.read_u8()? {
            KIND_TEXT => {
                let content = std::str::from_utf8(reader.read_remaining())
                    .map_err(SealError::format)?;
                Ok(Self::Text(content.to_string()))
            }
            oth => Err(SealError::outdated(format!("message kind {oth}"))),
        }
    }

    /// Encode as a message body, compressing when that comes out smaller.
    pub fn to_body(&self) -> SealResult<Vec<u8>> {
        let payload = self.to_payload()?;
        let compressed = deflate(&payload)?;

        let mut writer = CodecWriter::with_capacity(1 + payload.len());
        if compressed.len() < payload.len() {
            writer.write_u8(BODY_DEFLATE)?;
            writer.write_bytes(&compressed)?;
        } else {
            writer.write_u8(BODY_RAW)?;
            writer.write_bytes(&payload)?;
        }
        Ok(writer.into_vec())
    }

    /// Decode a message body. Both the raw and compressed forms are
    /// always accepted.
    pub fn from_body(body: &[u8]) -> SealResult<Self> {
        let mut reader = CodecReader::new(body);
        match reader.read_u8()? {
            BODY_RAW => Self::from_payload(reader.read_remaining()),
            BODY_DEFLATE => {
                Self::from_payload(&inflate(reader.read_remaining())?)
            }
            oth => Err(SealError::outdated(format!("message body tag {oth}"))),
        }
    }
}

impl Message {
    /// Best-effort text of a body that failed to decode. A body that
    /// fails to inflate is shown as is, invalid utf-8 is replaced.
    pub(crate) fn from_body_lossy(body: &[u8]) -> Self {
        let rest = body.get(1..).unwrap_or_default();
        let payload = match body.first() {
            Some(&BODY_DEFLATE) => {
                inflate(rest).unwrap_or_else(|_| rest.to_vec())
            }
            _ => rest.to_vec(),
        };
        let content = payload.get(1..).unwrap_or_default();
        Self::Text(String::from_utf8_lossy(content).into_owned())
    }
}

fn deflate(data: &[u8]) -> SealResult<Vec<u8>> {
    let mut enc = flate2::write::DeflateEncoder::new(
        Vec::new(),
        flate2::Compression::best(),
    );
    enc.write_all(data)?;
    Ok(enc.finish()?)
}

fn inflate(data: &[u8]) -> SealResult<Vec<u8>> {
    let mut out = Vec::new();
    flate2::read::DeflateDecoder::new(data)
        .take(MAX_BODY_BYTES as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| SealError::format(format!("bad compressed body: {e}")))?;
    if out.len() > MAX_BODY_BYTES {
        return Err(SealError::format("compressed body too large"));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_stays_raw() {
        let msg = Message::Text("hi".into());
        let body = msg.to_body().unwrap();
        assert_eq!(&[BODY_RAW, KIND_TEXT, b'h', b'i'], &body[..]);
        assert_eq!(msg, Message::from_body(&body).unwrap());
    }

    #[test]
    fn repetitive_text_compresses() {
        let text = "a".repeat(60);
        let msg = Message::Text(text.clone());
        let body = msg.to_body().unwrap();
        assert_eq!(BODY_DEFLATE, body[0]);
        assert!(body.len() < text.len());
        assert_eq!(msg, Message::from_body(&body).unwrap());

        // the raw path still decodes the same text
        let mut raw = vec![BODY_RAW, KIND_TEXT];
        raw.extend_from_slice(text.as_bytes());
        assert_eq!(msg, Message::from_body(&raw).unwrap());
    }

    #[test]
    fn lossy_body_never_fails() {
        let msg = Message::Text("pay bob 10".into());
        let mut body = msg.to_body().unwrap();
        assert_eq!(msg, Message::from_body_lossy(&body));

        *body.last_mut().unwrap() ^= 0x80;
        assert!(Message::from_body(&body).is_err());
        assert_eq!(
            Message::Text("pay bob 1\u{fffd}".into()),
            Message::from_body_lossy(&body)
        );

        let mut body = Message::Text("a".repeat(60)).to_body().unwrap();
        body[1] ^= 0xff;
        assert!(matches!(Message::from_body_lossy(&body), Message::Text(_)));
        assert_eq!(Message::Text(String::new()), Message::from_body_lossy(&[]));
    }

    #[test]
    fn unknown_tags_are_outdated() {
        assert!(matches!(
            Message::from_body(&[9, 0]),
            Err(SealError::OutdatedVersion(_))
        ));
        assert!(matches!(
            Message::from_body(&[BODY_RAW, 4, b'x']),
            Err(SealError::OutdatedVersion(_))
        ));
    }

    #[test]
    fn malformed_bodies_are_format_errors() {
        assert!(matches!(
            Message::from_body(&[]),
            Err(SealError::Format(_))
        ));
        assert!(matches!(
            Message::from_body(&[BODY_RAW, KIND_TEXT, 0xc3, 0x28]),
            Err(SealError::Format(_))
        ));
    }

    #[test]
    fn decompression_is_bounded() {
        let huge = vec![0_u8; MAX_BODY_BYTES + 10];
        let mut body = vec![BODY_DEFLATE];
        body.extend_from_slice(&deflate(&huge).unwrap());
        assert!(matches!(
            Message::from_body(&body),
            Err(SealError::Format(_))
        ));
    }
}
