//! Zip bundle around a backup document: `manifest.json` names the format and
//! the checksum of `backup.json`.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const BUNDLE_FORMAT_V1: &str = "rollcall-backup-v1";
pub const PLAIN_JSON_FORMAT: &str = "plain-json";

const MANIFEST_ENTRY: &str = "manifest.json";
const DOCUMENT_ENTRY: &str = "backup.json";
const LOCAL_HEADER_MAGIC: [u8; 4] = *b"PK\x03\x04";

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Manifest {
    #[serde(default)]
    format: String,
    #[serde(default)]
    app_version: Option<String>,
    #[serde(default)]
    exported_at: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct BundlePayload {
    pub bundle_format_detected: String,
    pub bytes: Vec<u8>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_bundle(
    payload: &[u8],
    out_path: &Path,
    exported_at: &str,
) -> anyhow::Result<ExportSummary> {
    if let Some(dir) = out_path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }
    let file = File::create(out_path)
        .with_context(|| format!("failed to create bundle {}", out_path.display()))?;

    let sha256 = sha256_hex(payload);
    let manifest = Manifest {
        format: BUNDLE_FORMAT_V1.to_string(),
        app_version: Some(env!("CARGO_PKG_VERSION").to_string()),
        exported_at: Some(exported_at.to_string()),
        sha256: Some(sha256.clone()),
    };
    let manifest_bytes = serde_json::to_vec_pretty(&manifest).context("failed to encode manifest")?;

    let mut zip = ZipWriter::new(file);
    let entries: [(&str, &[u8]); 2] = [(MANIFEST_ENTRY, &manifest_bytes), (DOCUMENT_ENTRY, payload)];
    for (name, bytes) in entries {
        zip.start_file(name, FileOptions::default().compression_method(CompressionMethod::Deflated))
            .with_context(|| format!("failed to add {name}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write {name}"))?;
    }
    zip.finish().context("failed to finish bundle")?;

    Ok(ExportSummary {
        bundle_format: manifest.format,
        entry_count: entries.len(),
        sha256,
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("bundle has no {name}"))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(bytes)
}

/// Document bytes from `in_path`. Zip bundles are checked against their
/// manifest; any other file is returned untouched as a plain JSON backup.
pub fn read_bundle(in_path: &Path) -> anyhow::Result<BundlePayload> {
    let mut file = File::open(in_path)
        .with_context(|| format!("failed to open {}", in_path.display()))?;
    let mut head = Vec::with_capacity(LOCAL_HEADER_MAGIC.len());
    (&mut file)
        .take(LOCAL_HEADER_MAGIC.len() as u64)
        .read_to_end(&mut head)
        .context("failed to read file header")?;

    if head != LOCAL_HEADER_MAGIC {
        let bytes = std::fs::read(in_path)
            .with_context(|| format!("failed to read {}", in_path.display()))?;
        return Ok(BundlePayload {
            bundle_format_detected: PLAIN_JSON_FORMAT.to_string(),
            bytes,
        });
    }

    let mut archive = ZipArchive::new(file).context("not a readable zip archive")?;
    let manifest: Manifest = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is not valid")?;
    if manifest.format != BUNDLE_FORMAT_V1 {
        bail!("unsupported bundle format: {:?}", manifest.format);
    }
    let Some(expected) = manifest.sha256 else {
        bail!("manifest.json has no sha256");
    };

    let bytes = read_entry(&mut archive, DOCUMENT_ENTRY)?;
    let actual = sha256_hex(&bytes);
    if !actual.eq_ignore_ascii_case(&expected) {
        bail!("backup.json checksum mismatch: expected {expected}, found {actual}");
    }

    Ok(BundlePayload {
        bundle_format_detected: manifest.format,
        bytes,
    })
}
