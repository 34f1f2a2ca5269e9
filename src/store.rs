use thiserror::Error;

use crate::curriculum::Curriculum;
use crate::grading::{self, GradeSummary};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("student id must be numeric: {0:?}")]
    InvalidId(String),

    #[error("name must contain only letters/spaces: {0:?}")]
    InvalidName(String),

    #[error("marks must be numbers between 0 and 100 for all modules: {0}")]
    InvalidMark(String),

    #[error("unknown year: {0}")]
    UnknownYear(String),

    #[error("modules for {year} do not match the curriculum")]
    ModuleMismatch { year: String },

    #[error("student id {id} already exists with a different name ({existing})")]
    NameConflict { id: String, existing: String },

    #[error("student id {id} already has marks for {year}")]
    DuplicateYear { id: String, year: String },

    #[error("not found: {0}")]
    NotFound(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::InvalidId(_) => "invalid_id",
            StoreError::InvalidName(_) => "invalid_name",
            StoreError::InvalidMark(_) => "invalid_mark",
            StoreError::UnknownYear(_) => "unknown_year",
            StoreError::ModuleMismatch { .. } => "module_mismatch",
            StoreError::NameConflict { .. } => "name_conflict",
            StoreError::DuplicateYear { .. } => "duplicate_year",
            StoreError::NotFound(_) => "not_found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Created,
    YearAdded,
    YearUpdated,
    Deleted,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::YearAdded => "yearAdded",
            Outcome::YearUpdated => "yearUpdated",
            Outcome::Deleted => "deleted",
        }
    }
}

/// One year's module names and marks, positionally aligned.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub year: String,
    pub modules: Vec<String>,
    pub marks: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    id: String,
    name: String,
    years: Vec<Submission>,
    summary: GradeSummary,
}

impl StudentRecord {
    fn create(id: &str, name: &str, submission: Submission) -> Self {
        let summary = grading::grade(&submission.marks);
        Self {
            id: id.to_string(),
            name: name.to_string(),
            years: vec![submission],
            summary,
        }
    }

    /// Rebuilds a record from persisted values. The summary is taken as given.
    pub(crate) fn restore(
        id: String,
        name: String,
        years: Vec<Submission>,
        summary: GradeSummary,
    ) -> Self {
        Self {
            id,
            name,
            years,
            summary,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn years(&self) -> &[Submission] {
        &self.years
    }

    pub fn summary(&self) -> &GradeSummary {
        &self.summary
    }

    pub fn year(&self, year: &str) -> Option<&Submission> {
        self.years.iter().find(|s| s.year == year)
    }

    pub fn pooled_marks(&self) -> Vec<f64> {
        self.years
            .iter()
            .flat_map(|s| s.marks.iter().copied())
            .collect()
    }

    pub fn mark_count(&self) -> usize {
        self.years.iter().map(|s| s.marks.len()).sum()
    }

    fn regrade(&mut self) {
        self.summary = grading::grade(&self.pooled_marks());
    }
}

pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_digit())
}

pub fn is_valid_name(name: &str) -> bool {
    !name.trim().is_empty() && name.chars().all(|c| c.is_alphabetic() || c.is_whitespace())
}

pub fn check_identity(id: &str, name: &str) -> Result<(), StoreError> {
    if !is_valid_id(id) {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    if !is_valid_name(name) {
        return Err(StoreError::InvalidName(name.to_string()));
    }
    Ok(())
}

pub fn check_mark(mark: f64) -> Result<f64, StoreError> {
    if !mark.is_finite() {
        return Err(StoreError::InvalidMark(format!("{mark} is not a number")));
    }
    if !(0.0..=100.0).contains(&mark) {
        return Err(StoreError::InvalidMark(format!("{mark} is out of range")));
    }
    Ok(mark)
}

/// Parses a raw mark as typed into a form field.
pub fn parse_mark(raw: &str) -> Result<f64, StoreError> {
    let t = raw.trim();
    if t.is_empty() {
        return Err(StoreError::InvalidMark("empty mark".into()));
    }
    let v = t
        .parse::<f64>()
        .map_err(|_| StoreError::InvalidMark(format!("{t:?} is not a number")))?;
    check_mark(v)
}

/// All student records, in order of first creation.
#[derive(Debug, Clone)]
pub struct Store {
    curriculum: Curriculum,
    records: Vec<StudentRecord>,
}

impl Store {
    pub fn new(curriculum: Curriculum) -> Self {
        Self {
            curriculum,
            records: Vec::new(),
        }
    }

    pub(crate) fn from_records(curriculum: Curriculum, records: Vec<StudentRecord>) -> Self {
        Self {
            curriculum,
            records,
        }
    }

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    /// Swaps the curriculum, refusing when a stored record uses a year the new
    /// one drops. Returns the years still in use on refusal.
    pub fn set_curriculum(&mut self, curriculum: Curriculum) -> Result<(), Vec<String>> {
        let mut missing: Vec<String> = Vec::new();
        for r in &self.records {
            for s in &r.years {
                if !curriculum.contains(&s.year) && !missing.contains(&s.year) {
                    missing.push(s.year.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        self.curriculum = curriculum;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn query_all(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Result<&StudentRecord, StoreError> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("student id {id}")))
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    fn check_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let Some(expected) = self.curriculum.modules_for(&submission.year) else {
            return Err(StoreError::UnknownYear(submission.year.clone()));
        };
        if submission.marks.len() != submission.modules.len() {
            return Err(StoreError::InvalidMark(format!(
                "expected {} marks, got {}",
                submission.modules.len(),
                submission.marks.len()
            )));
        }
        for m in &submission.marks {
            check_mark(*m)?;
        }
        if submission.modules.as_slice() != expected {
            return Err(StoreError::ModuleMismatch {
                year: submission.year.clone(),
            });
        }
        Ok(())
    }

    pub fn submit(
        &mut self,
        id: &str,
        name: &str,
        submission: Submission,
    ) -> Result<Outcome, StoreError> {
        check_identity(id, name)?;
        self.check_submission(&submission)?;

        let Some(idx) = self.position(id) else {
            tracing::info!(id, year = %submission.year, "student record created");
            self.records
                .push(StudentRecord::create(id, name, submission));
            return Ok(Outcome::Created);
        };

        let record = &mut self.records[idx];
        if record.name != name {
            return Err(StoreError::NameConflict {
                id: id.to_string(),
                existing: record.name.clone(),
            });
        }
        if record.year(&submission.year).is_some() {
            return Err(StoreError::DuplicateYear {
                id: id.to_string(),
                year: submission.year,
            });
        }
        tracing::info!(id, year = %submission.year, "year added to student record");
        record.years.push(submission);
        record.regrade();
        Ok(Outcome::YearAdded)
    }

    /// The stored submission for `year`, or `NotFound` naming what is missing.
    /// Record index and year index of `id`'s marks for `year`.
    fn year_slot(&self, id: &str, year: &str) -> Result<(usize, usize), StoreError> {
        let idx = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(format!("student id {id}")))?;
        let slot = self.records[idx]
            .years
            .iter()
            .position(|s| s.year == year)
            .ok_or_else(|| {
                StoreError::NotFound(format!("student id {id} has no marks for {year}"))
            })?;
        Ok((idx, slot))
    }

    pub fn require_year(&self, id: &str, year: &str) -> Result<&Submission, StoreError> {
        let (idx, slot) = self.year_slot(id, year)?;
        Ok(&self.records[idx].years[slot])
    }

    pub fn update_year(&mut self, id: &str, submission: Submission) -> Result<Outcome, StoreError> {
        let (idx, slot) = self.year_slot(id, &submission.year)?;
        self.check_submission(&submission)?;

        tracing::info!(id, year = %submission.year, "year marks updated");
        let record = &mut self.records[idx];
        record.years[slot] = submission;
        record.regrade();
        Ok(Outcome::YearUpdated)
    }

    pub fn delete(&mut self, id: &str) -> Result<Outcome, StoreError> {
        let Some(idx) = self.position(id) else {
            return Err(StoreError::NotFound(format!("student id {id}")));
        };
        self.records.remove(idx);
        tracing::info!(id, "student record deleted");
        Ok(Outcome::Deleted)
    }

    /// Drops every record; returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let n = self.records.len();
        self.records.clear();
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grading::Letter;

    fn sub(store: &Store, year: &str, marks: &[f64]) -> Submission {
        Submission {
            year: year.to_string(),
            modules: store
                .curriculum()
                .modules_for(year)
                .map(|m| m.to_vec())
                .unwrap_or_default(),
            marks: marks.to_vec(),
        }
    }

    fn store() -> Store {
        Store::new(Curriculum::default())
    }

    #[test]
    fn new_id_is_created_with_its_own_grade() {
        let mut s = store();
        let marks = [72.0, 65.0, 80.0, 58.0];
        let out = s.submit("1001", "Ada Lovelace", sub(&s, "Year 1", &marks));
        assert_eq!(out, Ok(Outcome::Created));

        let r = s.get("1001").expect("record");
        assert_eq!(r.summary(), &grading::grade(&marks));
        assert_eq!(r.summary().grade, Letter::B);
    }

    #[test]
    fn second_year_pools_marks_instead_of_averaging_averages() {
        let mut s = store();
        let y1 = sub(&s, "Year 1", &[40.0, 40.0, 40.0, 40.0]);
        let mut y2 = sub(&s, "Year 2", &[100.0, 100.0, 100.0, 100.0]);
        s.submit("7", "Grace Hopper", y1).expect("create");
        assert_eq!(s.submit("7", "Grace Hopper", y2.clone()), Ok(Outcome::YearAdded));

        let r = s.get("7").expect("record");
        assert_eq!(r.summary().average, 70.0);
        assert_eq!(r.summary().grade, Letter::A);

        // Pooled mean differs from the mean of per-year means once years differ in size.
        y2.year = "Year 3".into();
        y2.modules = s.curriculum().modules_for("Year 3").expect("y3").to_vec();
        s.submit("7", "Grace Hopper", y2).expect("third year");
        let r = s.get("7").expect("record");
        assert_eq!(r.summary().average, grading::grade(&r.pooled_marks()).average);
        assert_eq!(r.mark_count(), 12);
    }

    #[test]
    fn different_name_conflicts_without_mutation() {
        let mut s = store();
        s.submit("42", "Alan Turing", sub(&s, "Year 1", &[50.0; 4]))
            .expect("create");
        let before = s.query_all().to_vec();

        let err = s
            .submit("42", "Alan Smith", sub(&s, "Year 2", &[90.0; 4]))
            .unwrap_err();
        assert_eq!(err.code(), "name_conflict");
        assert_eq!(s.query_all(), before.as_slice());
    }

    #[test]
    fn same_year_twice_is_a_duplicate() {
        let mut s = store();
        s.submit("42", "Alan Turing", sub(&s, "Year 1", &[50.0; 4]))
            .expect("create");
        let err = s
            .submit("42", "Alan Turing", sub(&s, "Year 1", &[99.0; 4]))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateYear { .. }));
        assert_eq!(s.get("42").expect("rec").years()[0].marks, vec![50.0; 4]);
    }

    #[test]
    fn validation_order_and_kinds() {
        let mut s = store();
        let good = sub(&s, "Year 1", &[50.0; 4]);
        assert_eq!(
            s.submit("", "Ann", good.clone()).unwrap_err().code(),
            "invalid_id"
        );
        assert_eq!(
            s.submit("12a", "Ann", good.clone()).unwrap_err().code(),
            "invalid_id"
        );
        assert_eq!(
            s.submit("12", "Ann2", good.clone()).unwrap_err().code(),
            "invalid_name"
        );
        assert_eq!(
            s.submit("12", "   ", good.clone()).unwrap_err().code(),
            "invalid_name"
        );
        assert_eq!(
            s.submit("12", "Ann", sub(&s, "Year 9", &[50.0; 4]))
                .unwrap_err()
                .code(),
            "unknown_year"
        );
        assert_eq!(
            s.submit("12", "Ann", sub(&s, "Year 1", &[50.0, 101.0, 50.0, 50.0]))
                .unwrap_err()
                .code(),
            "invalid_mark"
        );
        assert_eq!(
            s.submit("12", "Ann", sub(&s, "Year 1", &[50.0, 50.0, 50.0]))
                .unwrap_err()
                .code(),
            "invalid_mark"
        );
        assert_eq!(
            s.submit("12", "Ann", sub(&s, "Year 1", &[50.0, f64::NAN, 50.0, 50.0]))
                .unwrap_err()
                .code(),
            "invalid_mark"
        );
        let mut renamed = good.clone();
        renamed.modules[0] = "Basket Weaving".into();
        assert_eq!(
            s.submit("12", "Ann", renamed).unwrap_err().code(),
            "module_mismatch"
        );
        assert!(s.is_empty());
    }

    #[test]
    fn update_year_replaces_in_place_and_regrades() {
        let mut s = store();
        s.submit("1", "Ann", sub(&s, "Year 1", &[80.0; 4])).expect("y1");
        s.submit("2", "Bob", sub(&s, "Year 1", &[80.0; 4])).expect("y1");
        s.submit("1", "Ann", sub(&s, "Year 2", &[80.0; 4])).expect("y2");

        let out = s.update_year("1", sub(&s, "Year 1", &[30.0, 80.0, 80.0, 80.0]));
        assert_eq!(out, Ok(Outcome::YearUpdated));
        let r = s.get("1").expect("rec");
        assert_eq!(r.years()[0].year, "Year 1");
        assert_eq!(r.summary().grade, Letter::F);
        assert_eq!(s.query_all()[0].id(), "1");

        let missing_year = s.update_year("2", sub(&s, "Year 3", &[50.0; 4])).unwrap_err();
        assert_eq!(missing_year.code(), "not_found");
        assert!(missing_year.to_string().contains("no marks for Year 3"), "{missing_year}");
        let missing_id = s.update_year("99", sub(&s, "Year 1", &[50.0; 4])).unwrap_err();
        assert_eq!(missing_id.code(), "not_found");
        assert!(missing_id.to_string().ends_with("student id 99"), "{missing_id}");
        assert_eq!(s.get("2").expect("rec").years().len(), 1);
    }

    #[test]
    fn delete_keeps_order_and_reports_missing() {
        let mut s = store();
        for (id, name) in [("1", "Ann"), ("2", "Bob"), ("3", "Cy")] {
            s.submit(id, name, sub(&s, "Year 1", &[60.0; 4])).expect("create");
        }
        assert_eq!(s.delete("2"), Ok(Outcome::Deleted));
        assert_eq!(s.delete("2").unwrap_err().code(), "not_found");
        assert_eq!(s.len(), 2);
        let ids: Vec<&str> = s.query_all().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        s.submit("2", "Bob", sub(&s, "Year 1", &[60.0; 4])).expect("recreate");
        let ids: Vec<&str> = s.query_all().iter().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["1", "3", "2"]);
        assert_eq!(s.clear(), 3);
    }

    #[test]
    fn curriculum_swap_refuses_years_in_use() {
        let mut s = store();
        s.submit("1", "Ann", sub(&s, "Year 2", &[60.0; 4])).expect("create");
        let mut trimmed = Curriculum::default();
        trimmed.years.retain(|y| y.year != "Year 2");
        assert_eq!(s.set_curriculum(trimmed), Err(vec!["Year 2".to_string()]));
    }

    #[test]
    fn raw_marks_parse_like_form_entries() {
        assert_eq!(parse_mark(" 65 "), Ok(65.0));
        assert_eq!(parse_mark("0"), Ok(0.0));
        assert_eq!(parse_mark("100.0"), Ok(100.0));
        assert!(parse_mark("").is_err());
        assert!(parse_mark("abc").is_err());
        assert!(parse_mark("-1").is_err());
        assert!(parse_mark("NaN").is_err());
    }
}
