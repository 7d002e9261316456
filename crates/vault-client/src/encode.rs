//! Payload encoding: optional deflate behind a one-byte marker, content
//! digest over the full marked stream, fixed-size chunk split.
//!
//! The marker is written unconditionally (0x00 raw, 0x01 deflate), so the
//! read path never has to guess whether a stream was compressed. Legacy
//! base64-armored sessions remain decodable because base64 text cannot begin
//! with either marker byte.

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::DeflateDecoder;
use flate2::write::DeflateEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use crate::error::{Result, VaultClientError};

pub const MARKER_RAW: u8 = 0x00;
pub const MARKER_DEFLATE: u8 = 0x01;

/// Below this size the marker/deflate header overhead dominates any saving.
pub const COMPRESS_THRESHOLD: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingMethod {
    Raw,
    Deflate,
}

impl EncodingMethod {
    pub fn as_byte(self) -> u8 {
        match self {
            Self::Raw => MARKER_RAW,
            Self::Deflate => MARKER_DEFLATE,
        }
    }
}

/// Result of the pure encode transform; no I/O happens here.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// `marker || body` — the exact byte stream the chunks carry.
    pub stream: Vec<u8>,
    /// SHA-256 over `stream`; independent of the chunk size by construction.
    pub digest: [u8; 32],
    pub method: EncodingMethod,
    pub original_len: usize,
}

impl EncodedPayload {
    pub fn chunk_count(&self, chunk_size: usize) -> u32 {
        (self.stream.len().div_ceil(chunk_size)) as u32
    }
}

pub fn encode(payload: &[u8], compress: bool) -> Result<EncodedPayload> {
    if payload.is_empty() {
        return Err(VaultClientError::InvalidInput(
            "payload is empty; nothing to store".into(),
        ));
    }

    let (method, body) = if compress && payload.len() >= COMPRESS_THRESHOLD {
        let deflated = deflate(payload)?;
        if deflated.len() < payload.len() {
            (EncodingMethod::Deflate, deflated)
        } else {
            // Incompressible input; the marker still records that honestly.
            (EncodingMethod::Raw, payload.to_vec())
        }
    } else {
        (EncodingMethod::Raw, payload.to_vec())
    };

    let mut stream = Vec::with_capacity(1 + body.len());
    stream.push(method.as_byte());
    stream.extend_from_slice(&body);

    let digest: [u8; 32] = Sha256::digest(&stream).into();
    Ok(EncodedPayload {
        stream,
        digest,
        method,
        original_len: payload.len(),
    })
}

/// Split an encoded stream into chunks of `chunk_size`; the last chunk may be
/// shorter, none is empty.
pub fn split_chunks(stream: &[u8], chunk_size: usize) -> Result<Vec<Vec<u8>>> {
    if chunk_size == 0 {
        return Err(VaultClientError::InvalidInput("chunk size is zero".into()));
    }
    Ok(stream.chunks(chunk_size).map(<[u8]>::to_vec).collect())
}

/// Reverse of [`encode`] over a reassembled stream.
///
/// Decoding order is fixed: a stream without a recognized marker that is
/// entirely base64 alphabet is un-armored first, then the marker decides
/// whether to inflate. Anything else is structurally malformed — our writer
/// always emits a marker.
pub fn decode(stream: &[u8]) -> Result<Vec<u8>> {
    let first = *stream.first().ok_or_else(|| {
        VaultClientError::MalformedStream("empty stream".into())
    })?;
    match first {
        MARKER_RAW => Ok(stream[1..].to_vec()),
        MARKER_DEFLATE => inflate(&stream[1..]),
        _ if is_base64_text(stream) => {
            let unarmored = STANDARD
                .decode(stream)
                .map_err(|e| VaultClientError::MalformedStream(format!("base64 armor: {e}")))?;
            match unarmored.first() {
                Some(&MARKER_RAW) => Ok(unarmored[1..].to_vec()),
                Some(&MARKER_DEFLATE) => inflate(&unarmored[1..]),
                _ => Err(VaultClientError::MalformedStream(
                    "base64 armor did not wrap a marked stream".into(),
                )),
            }
        }
        other => Err(VaultClientError::MalformedStream(format!(
            "unrecognized leading byte 0x{other:02x}"
        ))),
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .and_then(|_| encoder.finish())
        .map_err(|e| VaultClientError::MalformedStream(format!("deflate: {e}")))
}

fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    DeflateDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| VaultClientError::MalformedStream(format!("inflate: {e}")))?;
    Ok(out)
}

fn is_base64_text(stream: &[u8]) -> bool {
    stream
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}
