use serde::Serialize;

use crate::grading::{self, format_mark, Letter};
use crate::store::Store;

pub const REPORT_TITLE: &str = "----- Student Grade Report -----";
const SEPARATOR: &str = "-------------------------------------------";

/// Plain-text report: one block per student, year by year, followed by the
/// overall standing recomputed from the pooled marks.
pub fn student_report(store: &Store) -> String {
    let mut out = String::new();
    out.push_str(REPORT_TITLE);
    out.push_str("\n\n");
    for r in store.query_all() {
        let overall = grading::grade(&r.pooled_marks());
        for s in r.years() {
            let mods: Vec<String> = s
                .modules
                .iter()
                .zip(&s.marks)
                .map(|(m, mark)| format!("{m}:{}", format_mark(*mark)))
                .collect();
            out.push_str(&format!(
                "ID:{} | Name:{} | Year:{}\nModules:{}\n\n",
                r.id(),
                r.name(),
                s.year,
                mods.join(", ")
            ));
        }
        out.push_str(&format!(
            "Overall Average:{:.2} | Grade:{} ({})\n",
            overall.average, overall.grade, overall.remark
        ));
        out.push_str(SEPARATOR);
        out.push_str("\n\n");
    }
    out
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GradeCount {
    pub grade: Letter,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StudentAverage {
    pub id: String,
    pub name: String,
    pub average: f64,
    pub grade: Letter,
}

/// Data behind the overview charts: grade distribution and per-student
/// averages, both from the cached summaries.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub student_count: usize,
    pub grade_distribution: Vec<GradeCount>,
    pub averages: Vec<StudentAverage>,
}

pub fn overview(store: &Store) -> Overview {
    let grade_distribution = Letter::ALL
        .iter()
        .map(|l| GradeCount {
            grade: *l,
            count: store
                .query_all()
                .iter()
                .filter(|r| r.summary().grade == *l)
                .count(),
        })
        .collect();
    let averages = store
        .query_all()
        .iter()
        .map(|r| StudentAverage {
            id: r.id().to_string(),
            name: r.name().to_string(),
            average: r.summary().average,
            grade: r.summary().grade,
        })
        .collect();
    Overview {
        student_count: store.len(),
        grade_distribution,
        averages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curriculum::{Curriculum, YearModules};
    use crate::store::Submission;

    fn small_store() -> Store {
        let c = Curriculum::new(vec![
            YearModules {
                year: "Year 1".into(),
                modules: vec!["Maths".into(), "Art".into()],
            },
            YearModules {
                year: "Year 2".into(),
                modules: vec!["Physics".into()],
            },
        ])
        .expect("curriculum");
        let mut s = Store::new(c);
        let y1 = |marks: [f64; 2]| Submission {
            year: "Year 1".into(),
            modules: vec!["Maths".into(), "Art".into()],
            marks: marks.to_vec(),
        };
        s.submit("1", "Ann", y1([70.0, 80.5])).expect("ann");
        s.submit(
            "1",
            "Ann",
            Submission {
                year: "Year 2".into(),
                modules: vec!["Physics".into()],
                marks: vec![60.0],
            },
        )
        .expect("ann y2");
        s.submit("2", "Bob", y1([35.0, 90.0])).expect("bob");
        s
    }

    #[test]
    fn report_lists_each_year_then_overall() {
        let text = student_report(&small_store());
        let expected = "----- Student Grade Report -----\n\n\
            ID:1 | Name:Ann | Year:Year 1\nModules:Maths:70.0, Art:80.5\n\n\
            ID:1 | Name:Ann | Year:Year 2\nModules:Physics:60.0\n\n\
            Overall Average:70.17 | Grade:A (Excellent)\n\
            -------------------------------------------\n\n\
            ID:2 | Name:Bob | Year:Year 1\nModules:Maths:35.0, Art:90.0\n\n\
            Overall Average:62.50 | Grade:F (Fail - Resit Required)\n\
            -------------------------------------------\n\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn overview_counts_every_letter() {
        let o = overview(&small_store());
        assert_eq!(o.student_count, 2);
        let counts: Vec<(Letter, usize)> = o
            .grade_distribution
            .iter()
            .map(|g| (g.grade, g.count))
            .collect();
        assert_eq!(
            counts,
            vec![
                (Letter::A, 1),
                (Letter::B, 0),
                (Letter::C, 0),
                (Letter::D, 0),
                (Letter::F, 1)
            ]
        );
        assert_eq!(o.averages[1].name, "Bob");
        assert_eq!(o.averages[1].average, 62.5);
    }
}
