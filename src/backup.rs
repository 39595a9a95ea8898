use crate::db::{db_path, DB_FILE_NAME};
use crate::model::{CurriculumData, FullDataset, Grade};
use crate::store::{ingest, IngestReport};
use anyhow::{anyhow, Context};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const CURRICULUM_ENTRY: &str = "data/curriculum.json";
const DB_ENTRY: &str = "db/eduplan.sqlite3";
pub const BUNDLE_FORMAT_V1: &str = "eduplan-workspace-v1";
pub const FULL_BACKUP_FILE: &str = "EduPlan_Backup.json";

pub fn subject_backup_file(subject: &str) -> String {
    format!("EduPlan_{}.json", subject)
}

/// Pretty-printed dump of the whole dataset, or of one subject.
pub fn export_json(data: &FullDataset, subject: Option<&str>) -> anyhow::Result<(String, String)> {
    match subject {
        None => Ok((
            FULL_BACKUP_FILE.to_string(),
            serde_json::to_string_pretty(data).context("failed to serialize dataset")?,
        )),
        Some(s) => {
            let one = data
                .get(s)
                .ok_or_else(|| anyhow!("subject has no curriculum: {}", s))?;
            Ok((
                subject_backup_file(s),
                serde_json::to_string_pretty(one).context("failed to serialize subject")?,
            ))
        }
    }
}

pub fn write_json_backup(
    dir: &Path,
    data: &FullDataset,
    subject: Option<&str>,
) -> anyhow::Result<PathBuf> {
    let (name, text) = export_json(data, subject)?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create directory {}", dir.to_string_lossy()))?;
    let path = dir.join(name);
    std::fs::write(&path, text)
        .with_context(|| format!("failed to write {}", path.to_string_lossy()))?;
    Ok(path)
}

#[derive(Debug)]
pub enum JsonImport {
    Full(FullDataset, IngestReport),
    Subject(String, CurriculumData, IngestReport),
}

fn is_subject_form(value: &Value) -> bool {
    value
        .as_object()
        .map(|o| !o.is_empty() && o.keys().all(|k| Grade::parse(k).is_some()))
        .unwrap_or(false)
}

/// Reads either backup form. A per-subject file (grade keys at the top level)
/// needs `subject` to say where it goes.
pub fn import_json(text: &str, subject: Option<&str>) -> anyhow::Result<JsonImport> {
    let value: Value = serde_json::from_str(text).context("backup is not valid JSON")?;
    if is_subject_form(&value) {
        let Some(subject) = subject.map(str::trim).filter(|s| !s.is_empty()) else {
            return Err(anyhow!("per-subject backup needs a subject"));
        };
        let wrapped = serde_json::Map::from_iter([(subject.to_string(), value)]);
        let (mut data, report) = ingest(Value::Object(wrapped))?;
        let one = data.remove(subject).unwrap_or_default();
        return Ok(JsonImport::Subject(subject.to_string(), one, report));
    }
    let (data, report) = ingest(value)?;
    Ok(JsonImport::Full(data, report))
}

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub entry_count: usize,
    pub curriculum_sha256: String,
    pub db_sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn shown(path: &Path) -> std::borrow::Cow<'_, str> {
    path.to_string_lossy()
}

/// Zips the manifest, a JSON snapshot of `data` and the workspace database.
/// The manifest carries a SHA-256 for both payload entries.
pub fn export_workspace_bundle(
    workspace_path: &Path,
    data: &FullDataset,
    out_path: &Path,
) -> anyhow::Result<ExportSummary> {
    let db_file_path = db_path(workspace_path);
    let db_bytes = std::fs::read(&db_file_path)
        .with_context(|| format!("cannot read workspace database {}", shown(&db_file_path)))?;
    let curriculum = serde_json::to_vec_pretty(data).context("cannot serialize curriculum")?;
    let curriculum_sha256 = sha256_hex(&curriculum);
    let db_sha256 = sha256_hex(&db_bytes);
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "curriculumSha256": curriculum_sha256,
        "dbSha256": db_sha256,
    });
    let manifest = serde_json::to_vec_pretty(&manifest).context("cannot serialize manifest")?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {}", shown(parent)))?;
    }
    let out_file = File::create(out_path)
        .with_context(|| format!("cannot create bundle {}", shown(out_path)))?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
    let entries: [(&str, &[u8]); 3] = [
        (MANIFEST_ENTRY, manifest.as_slice()),
        (CURRICULUM_ENTRY, curriculum.as_slice()),
        (DB_ENTRY, db_bytes.as_slice()),
    ];
    for (name, bytes) in entries {
        zip.start_file(name, opts)
            .with_context(|| format!("cannot start bundle entry {name}"))?;
        zip.write_all(bytes)
            .with_context(|| format!("cannot write bundle entry {name}"))?;
    }
    zip.finish().context("cannot finalize bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        entry_count: entries.len(),
        curriculum_sha256,
        db_sha256,
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<Vec<u8>> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("bundle has no {name} entry"))?;
    let mut bytes = Vec::new();
    entry
        .read_to_end(&mut bytes)
        .with_context(|| format!("cannot read bundle entry {name}"))?;
    Ok(bytes)
}

fn verify(manifest: &Value, key: &str, name: &str, bytes: &[u8]) -> anyhow::Result<()> {
    let expected = manifest.get(key).and_then(|v| v.as_str()).unwrap_or("");
    if sha256_hex(bytes) != expected {
        return Err(anyhow!("{name} checksum mismatch"));
    }
    Ok(())
}

/// Checks the manifest format and both payload checksums, then swaps the
/// bundled database into `workspace_path`. Nothing is written unless every
/// check passes. The workspace database must not be open.
pub fn import_workspace_bundle(
    in_path: &Path,
    workspace_path: &Path,
) -> anyhow::Result<ImportSummary> {
    let in_file =
        File::open(in_path).with_context(|| format!("cannot open bundle {}", shown(in_path)))?;
    let mut archive = ZipArchive::new(in_file).context("bundle is not a zip archive")?;

    let manifest: Value = serde_json::from_slice(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest is not valid JSON")?;
    let format = manifest.get("format").and_then(|v| v.as_str()).unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let curriculum = read_entry(&mut archive, CURRICULUM_ENTRY)?;
    verify(&manifest, "curriculumSha256", "curriculum", &curriculum)?;
    let db_bytes = read_entry(&mut archive, DB_ENTRY)?;
    verify(&manifest, "dbSha256", "database", &db_bytes)?;

    std::fs::create_dir_all(workspace_path)
        .with_context(|| format!("cannot create workspace {}", shown(workspace_path)))?;
    let dst = workspace_path.join(DB_FILE_NAME);
    let staged = workspace_path.join(format!("{}.importing", DB_FILE_NAME));
    std::fs::write(&staged, &db_bytes)
        .with_context(|| format!("cannot stage database {}", shown(&staged)))?;
    if dst.exists() {
        std::fs::remove_file(&dst)
            .with_context(|| format!("cannot remove old database {}", shown(&dst)))?;
    }
    std::fs::rename(&staged, &dst)
        .with_context(|| format!("cannot move restored database to {}", shown(&dst)))?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
    })
}
