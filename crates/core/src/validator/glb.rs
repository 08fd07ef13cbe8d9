//! Binary glTF container inspection.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `glTF` in little-endian.
pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Errors found while reading a GLB container.
#[derive(Debug, Error)]
pub enum GlbError {
    #[error("File is too short for a GLB header ({len} bytes)")]
    TooShort { len: usize },

    #[error("Bad magic 0x{found:08x}, expected glTF")]
    BadMagic { found: u32 },

    #[error("Unsupported GLB version {0}")]
    UnsupportedVersion(u32),

    #[error("Header declares {declared} bytes but file has {actual}")]
    LengthMismatch { declared: u32, actual: usize },

    #[error("Chunk at offset {offset} runs past the end of the file")]
    ChunkOutOfBounds { offset: usize },

    #[error("First chunk must be JSON")]
    MissingJsonChunk,

    #[error("JSON chunk is not valid: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// One chunk header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlbChunk {
    pub chunk_type: u32,
    pub offset: usize,
    pub length: u32,
}

/// What the validator learned about a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlbReport {
    pub version: u32,
    pub total_length: u32,
    pub json_length: u32,
    /// Length of the BIN chunk, when present.
    pub bin_length: Option<u32>,
    pub chunk_count: usize,
    pub image_count: usize,
    pub material_count: usize,
    /// Materials with `pbrMetallicRoughness.baseColorTexture`.
    pub textured_material_count: usize,
    /// Image URIs that point outside the container.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_image_uris: Vec<String>,
}

impl GlbReport {
    /// Whether the materials reference textures but no images were packed.
    pub fn has_missing_textures(&self) -> bool {
        self.textured_material_count > 0 && self.image_count == 0
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> Option<u32> {
    let slice = bytes.get(offset..offset + 4)?;
    Some(u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

/// Walk the header and chunk table, then summarize the JSON chunk.
pub fn inspect_glb(bytes: &[u8]) -> Result<GlbReport, GlbError> {
    if bytes.len() < HEADER_LEN {
        return Err(GlbError::TooShort { len: bytes.len() });
    }

    let magic = read_u32(bytes, 0).ok_or(GlbError::TooShort { len: bytes.len() })?;
    if magic != GLB_MAGIC {
        return Err(GlbError::BadMagic { found: magic });
    }
    let version = read_u32(bytes, 4).ok_or(GlbError::TooShort { len: bytes.len() })?;
    if version != GLB_VERSION {
        return Err(GlbError::UnsupportedVersion(version));
    }
    let total_length = read_u32(bytes, 8).ok_or(GlbError::TooShort { len: bytes.len() })?;
    if total_length as usize != bytes.len() {
        return Err(GlbError::LengthMismatch {
            declared: total_length,
            actual: bytes.len(),
        });
    }

    let mut chunks = Vec::new();
    let mut offset = HEADER_LEN;
    while offset < bytes.len() {
        let length = read_u32(bytes, offset).ok_or(GlbError::ChunkOutOfBounds { offset })?;
        let chunk_type =
            read_u32(bytes, offset + 4).ok_or(GlbError::ChunkOutOfBounds { offset })?;
        let data_start = offset + CHUNK_HEADER_LEN;
        let data_end = data_start
            .checked_add(length as usize)
            .filter(|end| *end <= bytes.len())
            .ok_or(GlbError::ChunkOutOfBounds { offset })?;

        chunks.push(GlbChunk {
            chunk_type,
            offset: data_start,
            length,
        });
        offset = data_end;
    }

    let json_chunk = chunks
        .first()
        .filter(|c| c.chunk_type == CHUNK_TYPE_JSON)
        .ok_or(GlbError::MissingJsonChunk)?;
    let json_bytes = &bytes[json_chunk.offset..json_chunk.offset + json_chunk.length as usize];
    // Chunks are space-padded to 4 bytes.
    let json_text = trim_padding(json_bytes);
    let document: serde_json::Value = serde_json::from_slice(json_text)?;

    let images = document
        .get("images")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();
    let materials = document
        .get("materials")
        .and_then(|v| v.as_array())
        .map(|a| a.as_slice())
        .unwrap_or_default();

    let textured_material_count = materials
        .iter()
        .filter(|m| {
            m.get("pbrMetallicRoughness")
                .and_then(|pbr| pbr.get("baseColorTexture"))
                .is_some_and(|t| !t.is_null())
        })
        .count();

    let external_image_uris = images
        .iter()
        .filter_map(|img| img.get("uri").and_then(|u| u.as_str()))
        .filter(|uri| !uri.starts_with("data:"))
        .map(str::to_string)
        .collect();

    let bin_length = chunks
        .iter()
        .find(|c| c.chunk_type == CHUNK_TYPE_BIN)
        .map(|c| c.length);

    Ok(GlbReport {
        version,
        total_length,
        json_length: json_chunk.length,
        bin_length,
        chunk_count: chunks.len(),
        image_count: images.len(),
        material_count: materials.len(),
        textured_material_count,
        external_image_uris,
    })
}

fn trim_padding(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|b| !matches!(b, b' ' | 0))
        .map(|i| i + 1)
        .unwrap_or(0);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{build_glb, sample_gltf_json};

    #[test]
    fn test_inspect_counts_textured_materials() {
        let glb = build_glb(&sample_gltf_json(2, 3, 1), Some(&[0u8; 16]));
        let report = inspect_glb(&glb).unwrap();

        assert_eq!(report.version, 2);
        assert_eq!(report.total_length as usize, glb.len());
        assert_eq!(report.chunk_count, 2);
        assert_eq!(report.bin_length, Some(16));
        assert_eq!(report.image_count, 2);
        assert_eq!(report.material_count, 3);
        assert_eq!(report.textured_material_count, 1);
        assert!(!report.has_missing_textures());
    }

    #[test]
    fn test_inspect_json_only() {
        let glb = build_glb(&serde_json::json!({"asset": {"version": "2.0"}}), None);
        let report = inspect_glb(&glb).unwrap();
        assert_eq!(report.chunk_count, 1);
        assert_eq!(report.bin_length, None);
        assert_eq!(report.image_count, 0);
        assert_eq!(report.material_count, 0);
    }

    #[test]
    fn test_missing_textures_detected() {
        let glb = build_glb(&sample_gltf_json(0, 2, 2), None);
        let report = inspect_glb(&glb).unwrap();
        assert!(report.has_missing_textures());
    }

    #[test]
    fn test_external_uris_reported() {
        let json = serde_json::json!({
            "asset": {"version": "2.0"},
            "images": [
                {"uri": "textures/brick.png"},
                {"uri": "data:image/png;base64,AAAA"},
                {"bufferView": 0, "mimeType": "image/png"}
            ]
        });
        let report = inspect_glb(&build_glb(&json, None)).unwrap();
        assert_eq!(report.image_count, 3);
        assert_eq!(report.external_image_uris, vec!["textures/brick.png"]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut glb = build_glb(&sample_gltf_json(0, 0, 0), None);
        glb[0] = b'x';
        assert!(matches!(inspect_glb(&glb), Err(GlbError::BadMagic { .. })));
    }

    #[test]
    fn test_rejects_short_input() {
        assert!(matches!(
            inspect_glb(b"glTF"),
            Err(GlbError::TooShort { len: 4 })
        ));
    }

    #[test]
    fn test_rejects_wrong_version() {
        let mut glb = build_glb(&sample_gltf_json(0, 0, 0), None);
        glb[4] = 1;
        assert!(matches!(
            inspect_glb(&glb),
            Err(GlbError::UnsupportedVersion(1))
        ));
    }

    #[test]
    fn test_rejects_length_mismatch() {
        let mut glb = build_glb(&sample_gltf_json(0, 0, 0), None);
        glb.extend_from_slice(&[0, 0, 0, 0]);
        assert!(matches!(
            inspect_glb(&glb),
            Err(GlbError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_rejects_truncated_chunk() {
        let mut glb = build_glb(&sample_gltf_json(1, 1, 1), None);
        // Claim a longer JSON chunk than exists
        glb[12..16].copy_from_slice(&10_000u32.to_le_bytes());
        assert!(matches!(
            inspect_glb(&glb),
            Err(GlbError::ChunkOutOfBounds { offset: 12 })
        ));
    }

    #[test]
    fn test_rejects_bin_first() {
        let mut glb = build_glb(&sample_gltf_json(0, 0, 0), None);
        glb[16..20].copy_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
        assert!(matches!(inspect_glb(&glb), Err(GlbError::MissingJsonChunk)));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = inspect_glb(&build_glb(&sample_gltf_json(1, 1, 1), None)).unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["texturedMaterialCount"], 1);
        assert!(json.get("externalImageUris").is_none());
    }
}
