use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::hijri::{self, HijriConverter};
use crate::models::{BehavioralNote, Extraction, FieldIssue, StudentRecord, ID_COLUMN, NAME_COLUMN};
use crate::normalize::normalize_name;
use crate::spreadsheet::{Cell, Sheet, SheetRow};

pub const NOTE_NAME_COLUMN: &str = "اسم الطالب";
pub const NOTE_DATE_COLUMN: &str = "التاريخ";
pub const NOTE_PROBLEM_COLUMN: &str = "المشكلة";
pub const NOTE_GRADE_COLUMN: &str = "الصف";
pub const NOTE_ACTION_COLUMN: &str = "الإجراء";

pub const GRADES_REQUIRED: [&str; 2] = [ID_COLUMN, NAME_COLUMN];
pub const NOTES_REQUIRED: [&str; 2] = [NOTE_NAME_COLUMN, NOTE_PROBLEM_COLUMN];

/// Exact integer for integral numbers, including floats produced by
/// spreadsheet type inference (`1152684930.0`) and numeric text.
pub fn coerce_integer(cell: &Cell) -> Option<i64> {
    match cell {
        Cell::Int(value) => Some(*value),
        Cell::Float(value) => float_to_integer(*value),
        Cell::Text(text) => match Cell::from_text(text) {
            Cell::Int(value) => Some(value),
            Cell::Float(value) => float_to_integer(value),
            _ => None,
        },
        Cell::Empty | Cell::Bool(_) | Cell::DateTime(_) => None,
    }
}

fn float_to_integer(value: f64) -> Option<i64> {
    // 2^63 is the first float past i64::MAX
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if value.is_finite() && value.fract() == 0.0 && (-LIMIT..LIMIT).contains(&value) {
        Some(value as i64)
    } else {
        None
    }
}

/// ISO date string, or "" when the cell holds nothing readable as a date.
pub fn format_cell_date(cell: &Cell) -> String {
    hijri::parse_cell_date(cell)
        .map(|date| date.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

static EMPTY_CELL: Cell = Cell::Empty;

struct RowView<'a> {
    sheet: &'a Sheet,
    row: &'a SheetRow,
}

impl<'a> RowView<'a> {
    fn get(&self, column: &str) -> &'a Cell {
        self.sheet
            .column_index(column)
            .and_then(|index| self.row.cells.get(index))
            .unwrap_or(&EMPTY_CELL)
    }

    fn issue(&self, column: &str, cell: &Cell) -> FieldIssue {
        FieldIssue {
            line: self.row.line,
            column: column.to_string(),
            value: cell.to_string(),
        }
    }
}

/// A column is numeric when every non-empty value in it is a number; its
/// blanks then default to 0 instead of "".
fn numeric_columns(sheet: &Sheet) -> Vec<bool> {
    (0..sheet.headers.len())
        .map(|index| {
            let mut values = sheet
                .rows
                .iter()
                .filter_map(|row| row.cells.get(index))
                .filter(|cell| !cell.is_empty())
                .peekable();
            values.peek().is_some() && values.all(Cell::is_number)
        })
        .collect()
}

fn cell_to_json(cell: &Cell, numeric_column: bool) -> Value {
    match cell {
        Cell::Int(value) => Value::from(*value),
        Cell::Float(value) => Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::from(0)),
        Cell::Bool(value) => Value::Bool(*value),
        Cell::DateTime(value) => Value::String(value.format("%Y-%m-%d").to_string()),
        Cell::Text(text) if !text.trim().is_empty() => Value::String(text.trim().to_string()),
        _ if numeric_column => Value::from(0),
        _ => Value::String(String::new()),
    }
}

/// Grades rows: id and name are required, the id is coerced to an integer,
/// every other blank gets its column default.
pub fn extract_students(sheet: &Sheet) -> Result<Extraction<StudentRecord>> {
    sheet.require_columns(&GRADES_REQUIRED)?;
    let numeric = numeric_columns(sheet);

    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut issues = Vec::new();
    let mut skipped = 0;

    for row in &sheet.rows {
        let view = RowView { sheet, row };
        let id_cell = view.get(ID_COLUMN);
        let name_cell = view.get(NAME_COLUMN);
        if id_cell.is_empty() || name_cell.is_empty() {
            tracing::debug!(line = row.line, "skipping grades row without id or name");
            skipped += 1;
            continue;
        }

        let id = coerce_integer(id_cell);
        if id.is_none() {
            tracing::warn!(line = row.line, value = %id_cell, "student id is not an integer");
            issues.push(view.issue(ID_COLUMN, id_cell));
        }

        let mut columns = Map::with_capacity(sheet.headers.len());
        for (index, header) in sheet.headers.iter().enumerate() {
            let value = if header == ID_COLUMN {
                id.map(Value::from).unwrap_or(Value::Null)
            } else {
                let cell = row.cells.get(index).unwrap_or(&EMPTY_CELL);
                cell_to_json(cell, numeric[index])
            };
            columns.insert(header.clone(), value);
        }

        records.push(StudentRecord {
            id,
            name: name_cell.as_text(),
            columns,
        });
    }

    Ok(Extraction {
        records,
        skipped,
        issues,
    })
}

/// Notes rows: kept only when both the normalized name and the problem text
/// are non-empty. A grade level that isn't an integer becomes null.
///
/// With a converter and style, each note also gets its Hijri date; a bad
/// date only blanks that note's field.
pub fn extract_notes(
    sheet: &Sheet,
    hijri: Option<(&dyn HijriConverter, &str)>,
) -> Result<Extraction<BehavioralNote>> {
    sheet.require_columns(&NOTES_REQUIRED)?;

    let mut records = Vec::with_capacity(sheet.rows.len());
    let mut issues = Vec::new();
    let mut skipped = 0;

    for row in &sheet.rows {
        let view = RowView { sheet, row };
        let raw_name = view.get(NOTE_NAME_COLUMN).as_text();
        let student_name = normalize_name(&raw_name);
        let problem = view.get(NOTE_PROBLEM_COLUMN).as_text();
        if student_name.is_empty() || problem.is_empty() {
            tracing::debug!(line = row.line, "skipping note without student name or problem");
            skipped += 1;
            continue;
        }

        let date_cell = view.get(NOTE_DATE_COLUMN);
        let date = format_cell_date(date_cell);
        if date.is_empty() && !date_cell.is_empty() {
            tracing::warn!(line = row.line, value = %date_cell, "unparseable note date");
        }

        let grade_cell = view.get(NOTE_GRADE_COLUMN);
        let grade_level = coerce_integer(grade_cell);
        if grade_level.is_none() && !grade_cell.is_empty() {
            tracing::warn!(line = row.line, value = %grade_cell, "grade level is not an integer");
            issues.push(view.issue(NOTE_GRADE_COLUMN, grade_cell));
        }

        let hijri_date = hijri.map(|(converter, style)| {
            hijri::convert_excel_date_to_hijri(converter, date_cell, style)
        });

        records.push(BehavioralNote {
            raw_name,
            student_name,
            date,
            problem,
            grade_level,
            action: view.get(NOTE_ACTION_COLUMN).as_text(),
            hijri_date,
        });
    }

    Ok(Extraction {
        records,
        skipped,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;
    use crate::hijri::HijriDate;
    use chrono::{Datelike, NaiveDate};
    use serde_json::json;

    fn sheet(headers: &[&str], rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .into_iter()
                .enumerate()
                .map(|(index, cells)| SheetRow {
                    line: index + 2,
                    cells,
                })
                .collect(),
        }
    }

    fn text(value: &str) -> Cell {
        Cell::Text(value.to_string())
    }

    struct FixedHijri;

    impl HijriConverter for FixedHijri {
        fn to_hijri(&self, date: NaiveDate) -> Result<HijriDate> {
            Ok(HijriDate {
                year: 1447,
                month: 5,
                day: date.day(),
            })
        }
    }

    #[test]
    fn integer_coercion() {
        assert_eq!(coerce_integer(&Cell::Float(1152684930.0)), Some(1152684930));
        assert_eq!(coerce_integer(&Cell::Int(-4)), Some(-4));
        assert_eq!(coerce_integer(&text("3")), Some(3));
        assert_eq!(coerce_integer(&text("3.0")), Some(3));
        assert_eq!(coerce_integer(&Cell::Float(3.5)), None);
        assert_eq!(coerce_integer(&text("3A")), None);
        assert_eq!(coerce_integer(&Cell::Float(f64::INFINITY)), None);
        assert_eq!(coerce_integer(&Cell::Float(1e19)), None);
        assert_eq!(coerce_integer(&Cell::Empty), None);
    }

    #[test]
    fn students_keep_row_order_and_defaults() {
        let sheet = sheet(
            &["الهوية", "الطالب", "الرياضيات", "ملاحظة"],
            vec![
                vec![Cell::Float(2.0), text("سارة"), Cell::Float(88.5), text("ممتاز")],
                vec![Cell::Empty, text("بلا هوية"), Cell::Int(70), Cell::Empty],
                vec![Cell::Int(1), text("  أحمد  علي "), Cell::Empty, Cell::Empty],
            ],
        );
        let extraction = extract_students(&sheet).unwrap();
        assert_eq!(extraction.skipped, 1);
        assert!(extraction.issues.is_empty());
        let ids: Vec<_> = extraction.records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![Some(2), Some(1)]);

        let second = serde_json::to_value(&extraction.records[1]).unwrap();
        assert_eq!(
            second,
            json!({"الهوية": 1, "الطالب": "أحمد  علي", "الرياضيات": 0, "ملاحظة": ""})
        );
        let first = serde_json::to_value(&extraction.records[0]).unwrap();
        assert_eq!(first["الرياضيات"], json!(88.5));
        assert_eq!(first["الهوية"], json!(2));
    }

    #[test]
    fn bad_student_id_is_flagged_not_dropped() {
        let sheet = sheet(
            &["الهوية", "الطالب"],
            vec![vec![text("غير معروف"), text("خالد")]],
        );
        let extraction = extract_students(&sheet).unwrap();
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].id, None);
        assert_eq!(extraction.records[0].columns["الهوية"], Value::Null);
        assert_eq!(extraction.issues.len(), 1);
        assert_eq!(extraction.issues[0].column, "الهوية");
        assert_eq!(extraction.issues[0].line, 2);
    }

    #[test]
    fn short_rows_fall_back_to_column_defaults() {
        let sheet = sheet(
            &["الهوية", "الطالب", "الرياضيات", "ملاحظة"],
            vec![
                vec![Cell::Int(1), text("علي"), Cell::Int(90), text("جيد")],
                vec![Cell::Int(2), text("سارة")],
            ],
        );
        let extraction = extract_students(&sheet).unwrap();
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(
            serde_json::to_value(&extraction.records[1]).unwrap(),
            json!({"الهوية": 2, "الطالب": "سارة", "الرياضيات": 0, "ملاحظة": ""})
        );
    }

    #[test]
    fn grades_without_id_column_fail_validation() {
        let sheet = sheet(&["الطالب"], vec![vec![text("خالد")]]);
        let err = extract_students(&sheet).unwrap_err();
        assert!(matches!(err, ConvertError::MissingRequiredColumn { ref column, .. } if column == "الهوية"));
    }

    fn notes_sheet(rows: Vec<Vec<Cell>>) -> Sheet {
        sheet(
            &["م", "اسم الطالب", "التاريخ", "المشكلة", "الصف", "الإجراء"],
            rows,
        )
    }

    #[test]
    fn notes_need_name_and_problem() {
        let sheet = notes_sheet(vec![
            vec![Cell::Int(1), Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Int(2), text("أحمد"), Cell::Empty, text("  "), Cell::Int(3), Cell::Empty],
            vec![Cell::Int(3), Cell::Empty, Cell::Empty, text("تأخر"), Cell::Int(3), Cell::Empty],
            vec![Cell::Int(4), text("مُحَمَّد  سالم"), Cell::Empty, text(" نوم في الحصة "), Cell::Float(2.0), text("تنبيه")],
        ]);
        let extraction = extract_notes(&sheet, None).unwrap();
        assert_eq!(extraction.skipped, 3);
        assert_eq!(extraction.records.len(), 1);
        let note = &extraction.records[0];
        assert_eq!(note.raw_name, "مُحَمَّد  سالم");
        assert_eq!(note.student_name, "محمد سالم");
        assert_eq!(note.problem, "نوم في الحصة");
        assert_eq!(note.grade_level, Some(2));
        assert_eq!(note.action, "تنبيه");
        assert_eq!(note.date, "");
        assert_eq!(note.hijri_date, None);
    }

    #[test]
    fn non_numeric_grade_level_becomes_null() {
        let sheet = notes_sheet(vec![vec![
            Cell::Int(1),
            text("أحمد"),
            text("2025-11-06"),
            text("غياب"),
            text("3A"),
            Cell::Empty,
        ]]);
        let extraction = extract_notes(&sheet, None).unwrap();
        assert_eq!(extraction.records[0].grade_level, None);
        assert_eq!(extraction.records[0].date, "2025-11-06");
        assert_eq!(extraction.issues.len(), 1);
        assert_eq!(extraction.issues[0].value, "3A");
    }

    #[test]
    fn one_bad_date_does_not_affect_the_rest() {
        let row = |date: Cell| {
            vec![Cell::Int(1), text("سارة"), date, text("غياب"), Cell::Int(4), Cell::Empty]
        };
        let sheet = notes_sheet(vec![
            row(Cell::DateTime(NaiveDate::from_ymd_opt(2025, 11, 5).unwrap().and_hms_opt(0, 0, 0).unwrap())),
            row(text("31/02/2025")),
            row(Cell::Float(45967.0)),
            row(text("2025/11/07")),
        ]);
        let converter: &dyn HijriConverter = &FixedHijri;
        let extraction = extract_notes(&sheet, Some((converter, "short"))).unwrap();
        let dates: Vec<_> = extraction.records.iter().map(|n| n.date.as_str()).collect();
        assert_eq!(dates, vec!["2025-11-05", "", "2025-11-06", "2025-11-07"]);
        let hijri: Vec<_> = extraction
            .records
            .iter()
            .map(|n| n.hijri_date.clone().unwrap())
            .collect();
        assert_eq!(
            hijri,
            vec![
                "5 جمادى الأولى, 1447".to_string(),
                String::new(),
                "6 جمادى الأولى, 1447".to_string(),
                "7 جمادى الأولى, 1447".to_string(),
            ]
        );
    }

    #[test]
    fn notes_without_problem_column_fail_validation() {
        let sheet = sheet(&["اسم الطالب", "التاريخ"], Vec::new());
        let err = extract_notes(&sheet, None).unwrap_err();
        match err {
            ConvertError::MissingRequiredColumn { column, present } => {
                assert_eq!(column, "المشكلة");
                assert_eq!(present, vec!["اسم الطالب", "التاريخ"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn optional_note_columns_may_be_absent() {
        let sheet = sheet(
            &["اسم الطالب", "المشكلة"],
            vec![vec![text("علي"), text("تأخر")]],
        );
        let note = &extract_notes(&sheet, None).unwrap().records[0];
        assert_eq!(note.date, "");
        assert_eq!(note.grade_level, None);
        assert_eq!(note.action, "");
    }
}
