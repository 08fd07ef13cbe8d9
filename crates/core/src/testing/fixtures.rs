//! Test fixtures and helper functions.

use serde_json::{json, Value};

use crate::validator::{CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_MAGIC, GLB_VERSION};

/// Assemble a GLB container: header, JSON chunk, then an optional BIN chunk.
///
/// The JSON chunk is padded with spaces and the BIN chunk with zeros to a
/// multiple of four bytes.
pub fn build_glb(json: &Value, bin: Option<&[u8]>) -> Vec<u8> {
    let mut json_bytes = serde_json::to_vec(json).unwrap_or_default();
    while json_bytes.len() % 4 != 0 {
        json_bytes.push(b' ');
    }

    let bin_bytes = bin.map(|b| {
        let mut padded = b.to_vec();
        while padded.len() % 4 != 0 {
            padded.push(0);
        }
        padded
    });

    let total_length = 12
        + 8
        + json_bytes.len()
        + bin_bytes.as_ref().map(|b| 8 + b.len()).unwrap_or(0);

    let mut out = Vec::with_capacity(total_length);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&(total_length as u32).to_le_bytes());

    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    out.extend_from_slice(&json_bytes);

    if let Some(bin_bytes) = bin_bytes {
        out.extend_from_slice(&(bin_bytes.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
        out.extend_from_slice(&bin_bytes);
    }

    out
}

/// A glTF document with `images` embedded images and `materials` materials,
/// the first `textured` of which carry a base color texture.
pub fn sample_gltf_json(images: usize, materials: usize, textured: usize) -> Value {
    let images: Vec<Value> = (0..images)
        .map(|i| json!({"bufferView": i, "mimeType": "image/png"}))
        .collect();
    let materials: Vec<Value> = (0..materials)
        .map(|i| {
            if i < textured {
                json!({
                    "name": format!("textured-{i}"),
                    "pbrMetallicRoughness": {"baseColorTexture": {"index": 0}}
                })
            } else {
                json!({
                    "name": format!("plain-{i}"),
                    "pbrMetallicRoughness": {"baseColorFactor": [0.8, 0.8, 0.8, 1.0]}
                })
            }
        })
        .collect();

    let mut doc = json!({
        "asset": {"version": "2.0", "generator": "glbforge-tests"},
        "scenes": [{"nodes": []}],
        "scene": 0
    });
    if !images.is_empty() {
        doc["images"] = Value::Array(images);
        doc["textures"] = json!([{"source": 0}]);
    }
    if !materials.is_empty() {
        doc["materials"] = Value::Array(materials);
    }
    doc
}

/// Write an executable `#!/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_fake_tool(
    dir: &std::path::Path,
    name: &str,
    body: &str,
) -> std::path::PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    let script = format!("#!/bin/sh\n{body}\n");
    std::fs::write(&path, script).unwrap_or_else(|e| panic!("write {}: {e}", path.display()));
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .unwrap_or_else(|e| panic!("chmod {}: {e}", path.display()));
    path
}
