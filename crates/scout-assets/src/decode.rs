// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Payload classification and decoding.

use std::sync::Arc;

use bytes::Bytes;
use image::ImageFormat;

use crate::types::{Asset, AssetError, AssetResult};

/// Leading signatures of animated formats kept as raw bytes.
const ANIMATED_SIGNATURES: [&[u8; 6]; 2] = [b"GIF87a", b"GIF89a"];

/// Sniff the first six bytes for an animated-image signature.
pub fn is_animated(data: &[u8]) -> bool {
    ANIMATED_SIGNATURES
        .iter()
        .any(|sig| data.starts_with(&sig[..]))
}

/// Classify and decode a fetched payload.
///
/// Animated payloads are validated by decoding their first frame but stored
/// as the original bytes. Anything else must decode as a still image.
pub fn decode(data: Bytes) -> AssetResult<Asset> {
    if is_animated(&data) {
        image::load_from_memory_with_format(&data, ImageFormat::Gif)
            .map_err(|e| AssetError::Decode(e.to_string()))?;
        return Ok(Asset::Animated(data));
    }

    let img = image::load_from_memory(&data).map_err(|e| AssetError::Decode(e.to_string()))?;
    Ok(Asset::Static(Arc::new(img)))
}
