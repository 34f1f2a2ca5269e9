use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::curriculum::Curriculum;
use crate::records;
use crate::store::Store;

const MANIFEST_ENTRY: &str = "manifest.json";
const RECORDS_ENTRY: &str = "records.csv";
const CURRICULUM_ENTRY: &str = "meta/curriculum.json";
pub const BUNDLE_FORMAT_V1: &str = "gradebook-bundle-v1";
pub const FLAT_FILE_FORMAT: &str = "flat-file";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub bundle_id: Uuid,
    pub entry_count: usize,
    pub record_count: usize,
}

#[derive(Debug)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub store: Store,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

pub fn export_bundle(store: &Store, out_path: &Path) -> anyhow::Result<ExportSummary> {
    let records_text = records::encode_records(store.query_all());
    let curriculum_text = store.curriculum().to_json()?;
    let bundle_id = Uuid::new_v4();
    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "bundleId": bundle_id.to_string(),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "recordCount": store.len(),
        "recordsSha256": sha256_hex(records_text.as_bytes()),
    });

    let entries = [
        (
            MANIFEST_ENTRY,
            serde_json::to_string_pretty(&manifest).context("failed to serialize manifest")?,
        ),
        (RECORDS_ENTRY, records_text),
        (CURRICULUM_ENTRY, curriculum_text),
    ];
    records::write_atomically(out_path, |out_file| {
        let mut zip = ZipWriter::new(out_file);
        let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);
        for (name, body) in &entries {
            zip.start_file(*name, opts)
                .with_context(|| format!("failed to start {name} entry"))?;
            zip.write_all(body.as_bytes())
                .with_context(|| format!("failed to write {name} entry"))?;
        }
        zip.finish().context("failed to finalize zip bundle")?;
        Ok(())
    })?;

    tracing::info!(path = %out_path.display(), %bundle_id, "backup bundle exported");
    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        bundle_id,
        entry_count: entries.len(),
        record_count: store.len(),
    })
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> anyhow::Result<String> {
    let mut text = String::new();
    archive
        .by_name(name)
        .with_context(|| format!("bundle missing {name}"))?
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(text)
}

/// Decodes a bundle into a fresh store carrying the bundled curriculum. A
/// plain flat file is accepted too and decoded against `current`.
pub fn import_bundle(in_path: &Path, current: &Curriculum) -> anyhow::Result<ImportSummary> {
    if !is_zip_file(in_path)? {
        let store = records::import_file(in_path, current)?;
        return Ok(ImportSummary {
            bundle_format_detected: FLAT_FILE_FORMAT.to_string(),
            store,
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let manifest: serde_json::Value = serde_json::from_str(&read_entry(&mut archive, MANIFEST_ENTRY)?)
        .context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let records_text = read_entry(&mut archive, RECORDS_ENTRY)?;
    let expected = manifest
        .get("recordsSha256")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if sha256_hex(records_text.as_bytes()) != expected {
        return Err(anyhow!("records.csv checksum does not match manifest"));
    }

    let curriculum = Curriculum::from_json(&read_entry(&mut archive, CURRICULUM_ENTRY)?)
        .context("bundled curriculum is invalid")?;
    let decoded = records::decode_records(&records_text, &curriculum)?;

    tracing::info!(path = %in_path.display(), records = decoded.len(), "backup bundle imported");
    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        store: Store::from_records(curriculum, decoded),
    })
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::YearModules;
    use crate::store::Submission;

    fn store_with_custom_curriculum() -> Store {
        let c = Curriculum::new(vec![YearModules {
            year: "Foundation".into(),
            modules: vec!["Maths".into(), "English".into()],
        }])
        .expect("curriculum");
        let mut s = Store::new(c);
        s.submit(
            "31",
            "Mary Seacole",
            Submission {
                year: "Foundation".into(),
                modules: vec!["Maths".into(), "English".into()],
                marks: vec![64.0, 58.5],
            },
        )
        .expect("submit");
        s
    }

    #[test]
    fn bundle_round_trip_restores_records_and_curriculum() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("backup.gbbundle.zip");
        let s = store_with_custom_curriculum();

        let export = export_bundle(&s, &bundle).expect("export");
        assert_eq!(export.entry_count, 3);
        assert_eq!(export.record_count, 1);

        let mut archive = ZipArchive::new(File::open(&bundle).expect("open")).expect("zip");
        let manifest = read_entry(&mut archive, MANIFEST_ENTRY).expect("manifest");
        assert!(manifest.contains(BUNDLE_FORMAT_V1));
        assert!(manifest.contains(&export.bundle_id.to_string()));

        let imported = import_bundle(&bundle, &Curriculum::default()).expect("import");
        assert_eq!(imported.bundle_format_detected, BUNDLE_FORMAT_V1);
        assert_eq!(imported.store.curriculum(), s.curriculum());
        assert_eq!(imported.store.query_all(), s.query_all());
    }

    #[test]
    fn failed_export_leaves_no_partial_bundle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let bundle = dir.path().join("backup.zip");
        std::fs::create_dir(&bundle).expect("dir target");
        std::fs::write(bundle.join("keep.txt"), "old").expect("seed");

        assert!(export_bundle(&store_with_custom_curriculum(), &bundle).is_err());
        assert!(bundle.join("keep.txt").exists());
        assert!(!records::writing_path(&bundle).exists());
    }

    #[test]
    fn plain_flat_file_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("students.csv");
        std::fs::write(
            &path,
            "ID,Name,Year_Data,Average,Grade,Remark\n1,Ann,Year 1:A:50.0,50.00,C,Good\n",
        )
        .expect("write");
        let imported = import_bundle(&path, &Curriculum::default()).expect("import");
        assert_eq!(imported.bundle_format_detected, FLAT_FILE_FORMAT);
        assert_eq!(imported.store.len(), 1);
    }

    #[test]
    fn tampered_records_fail_the_checksum() {
        let dir = tempfile::tempdir().expect("tempdir");
        let src = dir.path().join("src.zip");
        export_bundle(&store_with_custom_curriculum(), &src).expect("export");

        let mut archive = ZipArchive::new(File::open(&src).expect("open")).expect("zip");
        let manifest = read_entry(&mut archive, MANIFEST_ENTRY).expect("manifest");
        let curriculum = read_entry(&mut archive, CURRICULUM_ENTRY).expect("curriculum");
        let records = read_entry(&mut archive, RECORDS_ENTRY).expect("records");

        let forged = dir.path().join("forged.zip");
        let mut zip = ZipWriter::new(File::create(&forged).expect("create"));
        let opts = FileOptions::default();
        for (name, body) in [
            (MANIFEST_ENTRY, manifest),
            (RECORDS_ENTRY, records.replace("64.0", "99.0")),
            (CURRICULUM_ENTRY, curriculum),
        ] {
            zip.start_file(name, opts).expect("start");
            zip.write_all(body.as_bytes()).expect("write");
        }
        zip.finish().expect("finish");

        let err = import_bundle(&forged, &Curriculum::default()).unwrap_err();
        assert!(err.to_string().contains("checksum"), "{err}");
    }
}
