use serde::Serialize;
use std::fmt;

use crate::store::StudentRecord;

pub const PASS_MARK: f64 = 40.0;
pub const FAIL_REMARK: &str = "Fail - Resit Required";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Letter {
    A,
    B,
    C,
    D,
    F,
}

impl Letter {
    pub const ALL: [Letter; 5] = [Letter::A, Letter::B, Letter::C, Letter::D, Letter::F];

    pub fn as_str(self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
            Letter::F => "F",
        }
    }

    pub fn remark(self) -> &'static str {
        match self {
            Letter::A => "Excellent",
            Letter::B => "Very Good",
            Letter::C => "Good",
            Letter::D => "Pass",
            Letter::F => FAIL_REMARK,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "A" => Some(Letter::A),
            "B" => Some(Letter::B),
            "C" => Some(Letter::C),
            "D" => Some(Letter::D),
            "F" => Some(Letter::F),
            _ => None,
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached grading of a record. `remark` is a free string because imported
/// files carry their own remark text, which is kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeSummary {
    pub average: f64,
    pub grade: Letter,
    pub remark: String,
}

/// Mean of `marks` (0 when empty) and its classification.
///
/// Any single mark below the pass mark fails the whole group, whatever the
/// mean works out to.
pub fn grade(marks: &[f64]) -> GradeSummary {
    let average = if marks.is_empty() {
        0.0
    } else {
        marks.iter().sum::<f64>() / (marks.len() as f64)
    };

    let letter = if marks.iter().any(|m| *m < PASS_MARK) {
        Letter::F
    } else if average >= 70.0 {
        Letter::A
    } else if average >= 60.0 {
        Letter::B
    } else if average >= 50.0 {
        Letter::C
    } else if average >= PASS_MARK {
        Letter::D
    } else {
        Letter::F
    };

    GradeSummary {
        average,
        grade: letter,
        remark: letter.remark().to_string(),
    }
}

/// Each stored year graded on its own, in year-addition order.
pub fn weighted_year_averages(record: &StudentRecord) -> Vec<(String, f64)> {
    record
        .years()
        .iter()
        .map(|sub| (sub.year.clone(), grade(&sub.marks).average))
        .collect()
}

/// `"Year 1: 65.00 | Year 2: 71.25"`
pub fn year_average_text(record: &StudentRecord) -> String {
    weighted_year_averages(record)
        .iter()
        .map(|(y, avg)| format!("{y}: {avg:.2}"))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Renders a mark the way the flat file and text report expect it: whole
/// numbers keep a trailing `.0`, anything else uses the shortest form that
/// parses back to the same value.
pub fn format_mark(mark: f64) -> String {
    if mark.is_finite() && mark.fract() == 0.0 {
        format!("{mark:.1}")
    } else {
        format!("{mark}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn single_failing_mark_fails_the_group() {
        let g = grade(&[95.0, 95.0, 95.0, 10.0]);
        assert_close(g.average, 73.75);
        assert_eq!(g.grade, Letter::F);
        assert_eq!(g.remark, FAIL_REMARK);
    }

    #[test]
    fn empty_marks_fall_through_to_fail() {
        let g = grade(&[]);
        assert_eq!(g.average, 0.0);
        assert_eq!(g.grade, Letter::F);
        assert_eq!(g.remark, "Fail - Resit Required");
    }

    #[test]
    fn thresholds_are_inclusive() {
        let g = grade(&[70.0]);
        assert_eq!((g.grade, g.remark.as_str()), (Letter::A, "Excellent"));
        assert_close(g.average, 70.0);

        let g = grade(&[69.99]);
        assert_eq!((g.grade, g.remark.as_str()), (Letter::B, "Very Good"));
        assert_close(g.average, 69.99);

        let g = grade(&[60.0]);
        assert_eq!(g.grade, Letter::B);
        let g = grade(&[59.5, 50.5]);
        assert_eq!((g.grade, g.remark.as_str()), (Letter::C, "Good"));

        let g = grade(&[40.0]);
        assert_eq!((g.grade, g.remark.as_str()), (Letter::D, "Pass"));
        assert_close(g.average, 40.0);

        let g = grade(&[39.99]);
        assert_eq!(g.grade, Letter::F);
        assert_close(g.average, 39.99);
    }

    #[test]
    fn letters_parse_and_print() {
        for l in Letter::ALL {
            assert_eq!(Letter::parse(l.as_str()), Some(l));
        }
        assert_eq!(Letter::parse("E"), None);
        assert_eq!(Letter::parse(""), None);
    }

    #[test]
    fn marks_format_like_the_flat_file() {
        assert_eq!(format_mark(65.0), "65.0");
        assert_eq!(format_mark(0.0), "0.0");
        assert_eq!(format_mark(100.0), "100.0");
        assert_eq!(format_mark(69.99), "69.99");
        assert_eq!(format_mark(73.75), "73.75");
    }
}
