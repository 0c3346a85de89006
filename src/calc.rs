use serde::Serialize;

use crate::schema::MarkColumn;

/// One stored row, with each mark tied to the column it came from. Totals
/// walk this finite list; nothing pattern-matches column names.
#[derive(Debug, Clone)]
pub struct StudentRecord {
    pub id: i64,
    pub name: String,
    pub grade: i64,
    pub section: String,
    pub marks: Vec<(MarkColumn, i64)>,
}

/// Round half away from zero to 2 decimal places.
pub fn round_2dp(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

pub fn term_total(record: &StudentRecord, term: u8) -> i64 {
    record
        .marks
        .iter()
        .filter(|(col, _)| col.term == term)
        .map(|(_, mark)| mark)
        .sum()
}

/// Percentage of marks earned out of marks possible for one term:
/// `total / (subject_count * 100) * 100`. The subject count must be the
/// registry size in effect when the row was written; reconciling a changed
/// registry is the caller's problem.
pub fn term_average_pct(total: i64, subject_count: usize) -> f64 {
    if subject_count == 0 {
        return 0.0;
    }
    round_2dp(total as f64 / (subject_count as f64 * 100.0) * 100.0)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSummary {
    pub name: String,
    pub grade: i64,
    pub section: String,
    pub term1_total: i64,
    pub term1_avg_pct: f64,
    pub term2_total: i64,
    pub term2_avg_pct: f64,
}

/// Per-record totals and percentage averages, in retrieval order. An empty
/// input yields an empty summary.
pub fn summarize(records: &[StudentRecord], subject_count: usize) -> Vec<RecordSummary> {
    records
        .iter()
        .map(|r| {
            let t1 = term_total(r, 1);
            let t2 = term_total(r, 2);
            RecordSummary {
                name: r.name.clone(),
                grade: r.grade,
                section: r.section.clone(),
                term1_total: t1,
                term1_avg_pct: term_average_pct(t1, subject_count),
                term2_total: t2,
                term2_avg_pct: term_average_pct(t2, subject_count),
            }
        })
        .collect()
}

/// Data handed across the visualization boundary: one label per record and
/// two aligned percentage series. Rendering is the caller's concern.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub labels: Vec<String>,
    pub term1_avg_pct: Vec<f64>,
    pub term2_avg_pct: Vec<f64>,
}

pub fn chart_data(records: &[StudentRecord], subject_count: usize) -> ChartData {
    let mut data = ChartData {
        labels: Vec::with_capacity(records.len()),
        term1_avg_pct: Vec::with_capacity(records.len()),
        term2_avg_pct: Vec::with_capacity(records.len()),
    };
    for r in records {
        data.labels
            .push(format!("{} ({}-{})", r.name, r.grade, r.section));
        data.term1_avg_pct
            .push(term_average_pct(term_total(r, 1), subject_count));
        data.term2_avg_pct
            .push(term_average_pct(term_total(r, 2), subject_count));
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::mark_columns;

    fn record_with_uniform_marks(subjects: &[&str], mark: i64) -> StudentRecord {
        let subjects: Vec<String> = subjects.iter().map(|s| s.to_string()).collect();
        StudentRecord {
            id: 1,
            name: "Asha".to_string(),
            grade: 9,
            section: "A".to_string(),
            marks: mark_columns(&subjects)
                .into_iter()
                .map(|c| (c, mark))
                .collect(),
        }
    }

    #[test]
    fn round_2dp_behaves_at_boundaries() {
        assert_eq!(round_2dp(0.0), 0.0);
        assert_eq!(round_2dp(84.999), 85.0);
        assert_eq!(round_2dp(84.994), 84.99);
        assert_eq!(round_2dp(100.0), 100.0);
    }

    #[test]
    fn all_zero_marks_total_zero() {
        let r = record_with_uniform_marks(&["Physics", "Chemistry", "Maths"], 0);
        assert_eq!(term_total(&r, 1), 0);
        assert_eq!(term_total(&r, 2), 0);
        assert_eq!(term_average_pct(term_total(&r, 1), 3), 0.00);
    }

    #[test]
    fn all_hundred_marks_total_subject_count_times_hundred() {
        let r = record_with_uniform_marks(&["Physics", "Chemistry", "Maths"], 100);
        assert_eq!(term_total(&r, 1), 300);
        assert_eq!(term_total(&r, 2), 300);
        assert_eq!(term_average_pct(300, 3), 100.00);
    }

    #[test]
    fn mixed_marks_average_rounds_to_two_decimals() {
        // 170 of 200 possible -> 85.00; 100 of 300 -> 33.33.
        assert_eq!(term_average_pct(170, 2), 85.00);
        assert_eq!(term_average_pct(100, 3), 33.33);
    }

    #[test]
    fn totals_only_count_the_requested_term() {
        let subjects = vec!["Physics".to_string(), "Chemistry".to_string()];
        let marks: Vec<(MarkColumn, i64)> = mark_columns(&subjects)
            .into_iter()
            .zip([80, 90, 70, 60])
            .collect();
        let r = StudentRecord {
            id: 1,
            name: "Asha".to_string(),
            grade: 9,
            section: "A".to_string(),
            marks,
        };
        assert_eq!(term_total(&r, 1), 170);
        assert_eq!(term_total(&r, 2), 130);
        assert_eq!(term_average_pct(term_total(&r, 1), 2), 85.00);
        assert_eq!(term_average_pct(term_total(&r, 2), 2), 65.00);
    }

    #[test]
    fn empty_record_set_summarizes_to_nothing() {
        assert!(summarize(&[], 5).is_empty());
        let data = chart_data(&[], 5);
        assert!(data.labels.is_empty());
        assert!(data.term1_avg_pct.is_empty());
        assert!(data.term2_avg_pct.is_empty());
    }

    #[test]
    fn chart_labels_compose_name_grade_section() {
        let r = record_with_uniform_marks(&["Physics"], 50);
        let data = chart_data(&[r], 1);
        assert_eq!(data.labels, vec!["Asha (9-A)"]);
        assert_eq!(data.term1_avg_pct, vec![50.00]);
    }
}
