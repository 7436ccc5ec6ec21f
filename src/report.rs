use std::collections::HashMap;
use std::fmt::Write;

use crate::models::{BehavioralNote, FieldIssue, StudentNoteSummary};

pub fn summarize_by_student(notes: &[BehavioralNote]) -> Vec<StudentNoteSummary> {
    let mut map: HashMap<&str, usize> = HashMap::new();

    for note in notes {
        *map.entry(note.student_name.as_str()).or_insert(0) += 1;
    }

    let mut summaries: Vec<StudentNoteSummary> = map
        .into_iter()
        .map(|(student_name, count)| StudentNoteSummary {
            student_name: student_name.to_string(),
            count,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.student_name.cmp(&b.student_name))
    });
    summaries
}

pub fn build_notes_summary(notes: &[BehavioralNote], sample: usize) -> String {
    let summaries = summarize_by_student(notes);
    let mut output = String::new();

    let _ = writeln!(output, "Valid notes: {}", notes.len());
    if summaries.is_empty() {
        return output;
    }

    let _ = writeln!(output, "Students mentioned: {}", summaries.len());
    let _ = writeln!(output, "Sample students:");
    for summary in summaries.iter().take(sample) {
        let _ = writeln!(
            output,
            "  - {} ({} notes)",
            summary.student_name, summary.count
        );
    }

    output
}

pub fn build_issue_list(issues: &[FieldIssue]) -> String {
    let mut output = String::new();
    for issue in issues {
        let _ = writeln!(
            output,
            "  - line {}: column '{}' has unusable value '{}'",
            issue.line, issue.column, issue.value
        );
    }
    output
}
