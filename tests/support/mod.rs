//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod socket_guard;

use std::path::{Path, PathBuf};

/// Writes `content` to `name` under `dir` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).expect("failed to write fixture");
    path
}

/// Encodes `text` as UTF-16LE, optionally with a byte order mark.
pub fn utf16le(text: &str, with_bom: bool) -> Vec<u8> {
    let mut bytes = if with_bom { vec![0xFF, 0xFE] } else { Vec::new() };
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

/// Deterministic binary payload of `len` bytes.
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
