use std::path::Path;

use anyhow::Context;

use crate::models::{BehavioralNote, StudentRecord};
use crate::normalize::normalize_name;

pub fn find_student(students: &[StudentRecord], student_id: i64) -> Option<&StudentRecord> {
    students.iter().find(|student| student.id == Some(student_id))
}

/// Notes whose normalized name equals the normalized name of the first
/// student carrying `student_id`. Unknown ids yield nothing.
pub fn find_notes<'a>(
    students: &[StudentRecord],
    notes: &'a [BehavioralNote],
    student_id: i64,
) -> Vec<&'a BehavioralNote> {
    let Some(student) = find_student(students, student_id) else {
        return Vec::new();
    };
    let key = normalize_name(&student.name);
    if key.is_empty() {
        return Vec::new();
    }
    notes
        .iter()
        .filter(|note| normalize_name(&note.student_name) == key)
        .collect()
}

pub fn load_students(path: &Path) -> anyhow::Result<Vec<StudentRecord>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("invalid grades JSON in {}", path.display()))
}

pub fn load_notes(path: &Path) -> anyhow::Result<Vec<BehavioralNote>> {
    let body = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&body).with_context(|| format!("invalid notes JSON in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn students() -> Vec<StudentRecord> {
        serde_json::from_value(json!([
            {"الهوية": 1152684930, "الطالب": "أحمد  علي", "الرياضيات": 90},
            {"الهوية": 2, "الطالب": "سارة ناصر", "الرياضيات": 75},
            {"الهوية": 2, "الطالب": "نسخة مكررة", "الرياضيات": 10},
            {"الهوية": 3, "الطالب": "", "الرياضيات": 0}
        ]))
        .unwrap()
    }

    fn note(name: &str, problem: &str) -> BehavioralNote {
        BehavioralNote {
            raw_name: name.to_string(),
            student_name: name.to_string(),
            date: "2025-11-06".to_string(),
            problem: problem.to_string(),
            grade_level: Some(3),
            action: String::new(),
            hijri_date: None,
        }
    }

    fn notes() -> Vec<BehavioralNote> {
        vec![
            note("أحمد علي", "تأخر"),
            note("سارة ناصر", "غياب"),
            note("أَحْمَد عَلِي", "نوم"),
            note("أحمد علي محمد", "حديث جانبي"),
            note("", "بلا اسم"),
        ]
    }

    #[test]
    fn matches_through_normalization() {
        let students = students();
        let notes = notes();
        let found = find_notes(&students, &notes, 1152684930);
        let problems: Vec<_> = found.iter().map(|n| n.problem.as_str()).collect();
        assert_eq!(problems, vec!["تأخر", "نوم"]);
    }

    #[test]
    fn unknown_id_yields_nothing() {
        let students = students();
        let notes = notes();
        assert!(find_notes(&students, &notes, 404).is_empty());
        assert!(find_notes(&[], &notes, 1).is_empty());
    }

    #[test]
    fn duplicate_ids_resolve_to_the_first_student() {
        let students = students();
        let notes = notes();
        let found = find_notes(&students, &notes, 2);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].problem, "غياب");
    }

    #[test]
    fn student_without_name_matches_no_notes() {
        let students = students();
        let notes = notes();
        assert!(find_notes(&students, &notes, 3).is_empty());
    }

    #[test]
    fn loads_json_written_by_the_converters() {
        let dir = tempfile::tempdir().unwrap();
        let grades = dir.path().join("period1.json");
        let notes_path = dir.path().join("notes.json");
        std::fs::write(&grades, serde_json::to_string(&students()).unwrap()).unwrap();
        std::fs::write(&notes_path, serde_json::to_string(&notes()).unwrap()).unwrap();

        let students = load_students(&grades).unwrap();
        let notes = load_notes(&notes_path).unwrap();
        assert_eq!(students.len(), 4);
        assert_eq!(find_notes(&students, &notes, 1152684930).len(), 2);
    }

    #[test]
    fn missing_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_notes(&dir.path().join("notes.json")).is_err());
    }
}
