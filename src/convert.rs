use std::ffi::OsString;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use crate::config::{GRADES_HEADER_ROW, NOTES_HEADER_ROW};
use crate::error::Result;
use crate::extract;
use crate::hijri::HijriConverter;
use crate::models::{BehavioralNote, Extraction, StudentRecord, UpdateStamp};
use crate::spreadsheet;
use crate::stamp;

const GRADES_INDENT: &[u8] = b" ";
const NOTES_INDENT: &[u8] = b"  ";

#[derive(Debug)]
pub struct GradesOutcome {
    pub output: PathBuf,
    pub columns: Vec<String>,
    pub rows_read: usize,
    pub extraction: Extraction<StudentRecord>,
}

#[derive(Debug)]
pub struct NotesOutcome {
    pub output: PathBuf,
    pub columns: Vec<String>,
    pub rows_read: usize,
    pub extraction: Extraction<BehavioralNote>,
}

/// Pretty JSON with non-ASCII left as is. The file only appears at `path`
/// once it has been fully written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, indent: &[u8]) -> Result<()> {
    let mut temp_name = OsString::from(".");
    temp_name.push(path.file_name().unwrap_or_default());
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    let written = (|| -> Result<()> {
        let mut writer = BufWriter::new(File::create(&temp_path)?);
        let formatter = serde_json::ser::PrettyFormatter::with_indent(indent);
        let mut serializer = serde_json::Serializer::with_formatter(&mut writer, formatter);
        value.serialize(&mut serializer)?;
        writer.flush()?;
        Ok(())
    })();

    if let Err(err) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err);
    }
    if let Err(err) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err.into());
    }
    tracing::debug!(path = %path.display(), "wrote JSON output");
    Ok(())
}

pub fn convert_grades(input: &Path, output: &Path) -> Result<GradesOutcome> {
    let sheet = spreadsheet::read_sheet(input, GRADES_HEADER_ROW)?;
    let extraction = extract::extract_students(&sheet)?;
    write_json(output, &extraction.records, GRADES_INDENT)?;

    Ok(GradesOutcome {
        output: output.to_path_buf(),
        columns: sheet.headers,
        rows_read: sheet.rows.len(),
        extraction,
    })
}

/// `hijri` adds a Hijri rendering of each note date in the given style.
pub fn convert_notes(
    input: &Path,
    output: &Path,
    hijri: Option<(&dyn HijriConverter, &str)>,
) -> Result<NotesOutcome> {
    let sheet = spreadsheet::read_sheet(input, NOTES_HEADER_ROW)?;
    let extraction = extract::extract_notes(&sheet, hijri)?;
    write_json(output, &extraction.records, NOTES_INDENT)?;

    Ok(NotesOutcome {
        output: output.to_path_buf(),
        columns: sheet.headers,
        rows_read: sheet.rows.len(),
        extraction,
    })
}

pub fn save_update_stamp<Tz>(
    output: &Path,
    converter: &dyn HijriConverter,
    now: &DateTime<Tz>,
) -> Result<UpdateStamp>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let stamp = stamp::build_stamp(now, converter)?;
    write_json(output, &stamp, NOTES_INDENT)?;
    Ok(stamp)
}
