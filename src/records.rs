//! Flat-file encoding of the student store.
//!
//! ```text
//! ID,Name,Year_Data,Average,Grade,Remark
//! 1001,Ada Lovelace,Year 1:Networking|Big Data:65.0|72.5,68.75,B,Very Good
//! ```
//!
//! `Year_Data` holds `;`-joined `<year>:<modules>:<marks>` blocks with `|`
//! between list items. The stored average, grade and remark are read back
//! verbatim rather than recomputed.

use anyhow::Context;
use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::curriculum::Curriculum;
use crate::grading::{format_mark, GradeSummary, Letter};
use crate::store::{self, Store, StudentRecord, Submission};

pub const HEADER: [&str; 6] = ["ID", "Name", "Year_Data", "Average", "Grade", "Remark"];
const LINE_END: &str = "\r\n";

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
}

impl ImportError {
    pub fn code(&self) -> &'static str {
        "import_failed"
    }

    pub fn line(&self) -> Option<usize> {
        match self {
            ImportError::Io { .. } => None,
            ImportError::Malformed { line, .. } => Some(*line),
        }
    }

    fn at(line: usize, reason: impl Into<String>) -> Self {
        ImportError::Malformed {
            line,
            reason: reason.into(),
        }
    }
}

fn csv_quote(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

fn parse_csv_record(line: &str) -> Result<Vec<String>, String> {
    let mut out: Vec<String> = Vec::new();
    let mut buf = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                buf.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut buf)),
            _ => buf.push(ch),
        }
    }
    if in_quotes {
        return Err("unterminated quoted field".into());
    }
    out.push(buf);
    Ok(out)
}

pub fn encode_year_data(years: &[Submission]) -> String {
    years
        .iter()
        .map(|s| {
            let marks: Vec<String> = s.marks.iter().map(|m| format_mark(*m)).collect();
            format!("{}:{}:{}", s.year, s.modules.join("|"), marks.join("|"))
        })
        .collect::<Vec<_>>()
        .join(";")
}

pub fn decode_year_data(raw: &str) -> Result<Vec<Submission>, String> {
    let mut out: Vec<Submission> = Vec::new();
    for block in raw.split(';') {
        if block.is_empty() {
            continue;
        }
        let parts: Vec<&str> = block.split(':').collect();
        let [year, modules, marks] = parts.as_slice() else {
            return Err(format!(
                "year block {block:?} must have 3 ':'-separated parts, found {}",
                parts.len()
            ));
        };
        if year.trim().is_empty() {
            return Err(format!("year block {block:?} has an empty year label"));
        }
        let modules: Vec<String> = modules.split('|').map(|m| m.to_string()).collect();
        let marks = marks
            .split('|')
            .map(|m| store::parse_mark(m).map_err(|e| format!("{year}: {e}")))
            .collect::<Result<Vec<f64>, String>>()?;
        if modules.len() != marks.len() {
            return Err(format!(
                "{year}: {} modules but {} marks",
                modules.len(),
                marks.len()
            ));
        }
        out.push(Submission {
            year: year.to_string(),
            modules,
            marks,
        });
    }
    Ok(out)
}

pub fn encode_record(r: &StudentRecord) -> String {
    let s = r.summary();
    [
        csv_quote(r.id()),
        csv_quote(r.name()),
        csv_quote(&encode_year_data(r.years())),
        format!("{:.2}", s.average),
        s.grade.to_string(),
        csv_quote(&s.remark),
    ]
    .join(",")
}

pub fn encode_records(records: &[StudentRecord]) -> String {
    let mut out = HEADER.join(",");
    out.push_str(LINE_END);
    for r in records {
        out.push_str(&encode_record(r));
        out.push_str(LINE_END);
    }
    out
}

fn decode_record(
    fields: Vec<String>,
    line: usize,
    curriculum: &Curriculum,
) -> Result<StudentRecord, ImportError> {
    let Ok([id, name, year_data, average, grade, remark]) = <[String; 6]>::try_from(fields) else {
        return Err(ImportError::at(line, "expected 6 fields"));
    };
    if !store::is_valid_id(&id) {
        return Err(ImportError::at(line, format!("invalid student id {id:?}")));
    }
    if !store::is_valid_name(&name) {
        return Err(ImportError::at(line, format!("invalid name {name:?}")));
    }

    let years = decode_year_data(&year_data).map_err(|e| ImportError::at(line, e))?;
    if years.is_empty() {
        return Err(ImportError::at(line, format!("student {id} has no year data")));
    }
    let mut seen: HashSet<&str> = HashSet::new();
    for s in &years {
        if !curriculum.contains(&s.year) {
            return Err(ImportError::at(line, format!("unknown year {:?}", s.year)));
        }
        if !seen.insert(s.year.as_str()) {
            return Err(ImportError::at(line, format!("{} appears twice", s.year)));
        }
    }

    let average = average
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ImportError::at(line, format!("invalid average {average:?}")))?;
    let grade = Letter::parse(&grade)
        .ok_or_else(|| ImportError::at(line, format!("invalid grade {grade:?}")))?;

    Ok(StudentRecord::restore(
        id,
        name,
        years,
        GradeSummary {
            average,
            grade,
            remark,
        },
    ))
}

/// Cuts `text` into CSV records. A line break inside a quoted field stays
/// part of the record; each record carries the physical line it starts on.
fn split_records(text: &str) -> Result<Vec<(usize, String)>, ImportError> {
    let mut out: Vec<(usize, String)> = Vec::new();
    let mut pending: Option<(usize, String)> = None;
    for (i, raw) in text.split_inclusive('\n').enumerate() {
        let (start, mut buf) = match pending.take() {
            Some(open) => open,
            None if raw.trim().is_empty() => continue,
            None => (i + 1, String::new()),
        };
        buf.push_str(raw);
        // Escaped quotes come in pairs, so odd parity means a field is open.
        if buf.matches('"').count() % 2 == 1 {
            pending = Some((start, buf));
        } else {
            let end = buf.trim_end_matches(['\r', '\n']).len();
            buf.truncate(end);
            out.push((start, buf));
        }
    }
    if let Some((start, _)) = pending {
        return Err(ImportError::at(start, "unterminated quoted field"));
    }
    Ok(out)
}

/// Decodes a whole file. Nothing is returned unless every row is valid.
pub fn decode_records(
    text: &str,
    curriculum: &Curriculum,
) -> Result<Vec<StudentRecord>, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = split_records(text)?.into_iter();

    let Some((header_line, header)) = lines.next() else {
        return Err(ImportError::at(1, "file is empty"));
    };
    let columns = parse_csv_record(&header).map_err(|e| ImportError::at(header_line, e))?;
    if columns.iter().map(|c| c.trim()).ne(HEADER.iter().copied()) {
        return Err(ImportError::at(
            header_line,
            format!("expected header {}", HEADER.join(",")),
        ));
    }

    let mut ids: HashSet<String> = HashSet::new();
    let mut out: Vec<StudentRecord> = Vec::new();
    for (line, raw) in lines {
        let fields = parse_csv_record(&raw).map_err(|e| ImportError::at(line, e))?;
        let record = decode_record(fields, line, curriculum)?;
        if !ids.insert(record.id().to_string()) {
            return Err(ImportError::at(
                line,
                format!("duplicate student id {}", record.id()),
            ));
        }
        out.push(record);
    }
    Ok(out)
}

/// Fills a `<name>.writing` sibling of `path` and renames it into place.
/// On any failure the sibling is removed and a previous file at `path` is
/// left as it was.
pub fn write_atomically<F>(path: &Path, fill: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut File) -> anyhow::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let tmp = writing_path(path);

    let result: anyhow::Result<()> = (|| {
        let mut f = File::create(&tmp)
            .with_context(|| format!("failed to create {}", tmp.to_string_lossy()))?;
        fill(&mut f)?;
        f.sync_all()
            .with_context(|| format!("failed to sync {}", tmp.to_string_lossy()))?;
        drop(f);
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to move {} into place", path.to_string_lossy()))
    })();
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result
}

pub fn writing_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".writing");
    path.with_file_name(name)
}

pub fn export_file(store: &Store, path: &Path) -> anyhow::Result<usize> {
    let text = encode_records(store.query_all());
    write_atomically(path, |f| {
        f.write_all(text.as_bytes())
            .with_context(|| format!("failed to write records for {}", path.to_string_lossy()))
    })?;

    tracing::info!(path = %path.display(), records = store.len(), "records exported");
    Ok(store.len())
}

/// Builds a fresh store from `path`. The caller swaps it in on success.
pub fn import_file(path: &Path, curriculum: &Curriculum) -> Result<Store, ImportError> {
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = decode_records(&text, curriculum)?;
    tracing::info!(path = %path.display(), records = records.len(), "records imported");
    Ok(Store::from_records(curriculum.clone(), records))
}
