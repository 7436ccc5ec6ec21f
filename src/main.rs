use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod convert;
mod error;
mod extract;
mod hijri;
mod matcher;
mod models;
mod normalize;
mod report;
mod spreadsheet;
mod stamp;

use config::{DataDir, Period};
use convert::{GradesOutcome, NotesOutcome};
use hijri::{HijriConverter, UmmAlQura};

const SAMPLE_STUDENTS: usize = 5;
const MATCH_PREVIEW: usize = 3;

#[derive(Parser)]
#[command(name = "school-grades-export")]
#[command(about = "Convert school grade and behavioral note spreadsheets into website JSON", long_about = None)]
struct Cli {
    /// Data directory holding the workbooks and the JSON outputs
    /// (defaults to the directory of this executable)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a grades workbook for one period
    Grades {
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=2))]
        period: u8,
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Convert the behavioral notes workbook
    Notes {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Also emit a Hijri date per note: full, short or no_year
        #[arg(long)]
        hijri_style: Option<String>,
    },
    /// Write the "last updated" stamp
    Stamp {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show the notes recorded for one student
    Match {
        #[arg(long)]
        student_id: i64,
        #[arg(long)]
        grades: Option<PathBuf>,
        #[arg(long)]
        notes: Option<PathBuf>,
    },
    /// Convert both periods and the notes, then write the stamp
    All {
        #[arg(long)]
        hijri_style: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let data = DataDir::resolve(cli.dir)?;
    tracing::debug!(dir = %data.root().display(), "resolved data directory");
    let converter = UmmAlQura;

    match cli.command {
        Commands::Grades { period, input, out } => {
            let period = Period::from_number(period).context("period must be 1 or 2")?;
            let input = input.unwrap_or_else(|| data.grades_workbook(period));
            let out = out.unwrap_or_else(|| data.grades_json(period));
            run_grades(period, &input, &out)?;
        }
        Commands::Notes {
            input,
            out,
            hijri_style,
        } => {
            let input = input.unwrap_or_else(|| data.notes_workbook());
            let out = out.unwrap_or_else(|| data.notes_json());
            run_notes(&input, &out, &converter, hijri_style.as_deref())?;
        }
        Commands::Stamp { out } => {
            let out = out.unwrap_or_else(|| data.stamp_json());
            run_stamp(&out, &converter)?;
        }
        Commands::Match {
            student_id,
            grades,
            notes,
        } => {
            let grades = grades.unwrap_or_else(|| data.grades_json(Period::First));
            let notes = notes.unwrap_or_else(|| data.notes_json());
            run_match(student_id, &grades, &notes)?;
        }
        Commands::All { hijri_style } => {
            let mut failures = Vec::new();
            for period in [Period::First, Period::Second] {
                if let Err(err) =
                    run_grades(period, &data.grades_workbook(period), &data.grades_json(period))
                {
                    eprintln!("Period {} failed: {err:#}", period.number());
                    failures.push(format!("period {}", period.number()));
                }
            }
            if let Err(err) = run_notes(
                &data.notes_workbook(),
                &data.notes_json(),
                &converter,
                hijri_style.as_deref(),
            ) {
                eprintln!("Notes failed: {err:#}");
                failures.push("notes".to_string());
            }

            if !failures.is_empty() {
                anyhow::bail!(
                    "conversion failed for {}; the update stamp was not written",
                    failures.join(", ")
                );
            }
            run_stamp(&data.stamp_json(), &converter)?;
        }
    }

    Ok(())
}

fn run_grades(period: Period, input: &Path, out: &Path) -> anyhow::Result<()> {
    println!(
        "Converting period {} grades from {}",
        period.number(),
        input.display()
    );
    let outcome = convert::convert_grades(input, out)
        .with_context(|| format!("period {} conversion failed", period.number()))?;
    print_grades(&outcome);
    Ok(())
}

fn print_grades(outcome: &GradesOutcome) {
    println!("Columns: {}", outcome.columns.join(", "));
    println!(
        "Rows read: {}, students written: {}, rows skipped: {}",
        outcome.rows_read,
        outcome.extraction.records.len(),
        outcome.extraction.skipped
    );
    if !outcome.extraction.issues.is_empty() {
        println!("Fields left empty:");
        print!("{}", report::build_issue_list(&outcome.extraction.issues));
    }
    println!("Written to {}.", outcome.output.display());
}

fn run_notes(
    input: &Path,
    out: &Path,
    converter: &dyn HijriConverter,
    hijri_style: Option<&str>,
) -> anyhow::Result<()> {
    println!("Converting behavioral notes from {}", input.display());
    let hijri = hijri_style.map(|style| (converter, style));
    let outcome = convert::convert_notes(input, out, hijri).map_err(|err| {
        if matches!(err, error::ConvertError::MissingInputFile { .. }) {
            eprintln!(
                "The notes workbook needs the columns: {}",
                [
                    "م",
                    extract::NOTE_NAME_COLUMN,
                    extract::NOTE_DATE_COLUMN,
                    extract::NOTE_PROBLEM_COLUMN,
                    extract::NOTE_GRADE_COLUMN,
                    extract::NOTE_ACTION_COLUMN,
                ]
                .join(", ")
            );
        }
        anyhow::Error::new(err).context("notes conversion failed")
    })?;
    print_notes(&outcome);
    Ok(())
}

fn print_notes(outcome: &NotesOutcome) {
    println!("Columns: {}", outcome.columns.join(", "));
    println!(
        "Rows read: {}, rows skipped: {}",
        outcome.rows_read, outcome.extraction.skipped
    );
    print!(
        "{}",
        report::build_notes_summary(&outcome.extraction.records, SAMPLE_STUDENTS)
    );
    if !outcome.extraction.issues.is_empty() {
        println!("Fields left empty:");
        print!("{}", report::build_issue_list(&outcome.extraction.issues));
    }
    println!("Written to {}.", outcome.output.display());
}

fn run_stamp(out: &Path, converter: &dyn HijriConverter) -> anyhow::Result<()> {
    let now = chrono::Local::now();
    let stamp = convert::save_update_stamp(out, converter, &now)
        .context("failed to write the update stamp")?;
    println!("Update stamp saved:");
    println!("  Gregorian: {}", stamp.last_update.gregorian.full);
    match converter.to_hijri(now.date_naive()) {
        Ok(hijri) => println!(
            "  Hijri: {} ({})",
            stamp.last_update.hijri.date,
            hijri::format_hijri_simple(hijri)
        ),
        Err(_) => println!("  Hijri: {}", stamp.last_update.hijri.date),
    }
    Ok(())
}

fn run_match(student_id: i64, grades: &Path, notes: &Path) -> anyhow::Result<()> {
    let students = matcher::load_students(grades)?;
    let notes = matcher::load_notes(notes)?;

    let Some(student) = matcher::find_student(&students, student_id) else {
        println!("No student with id {student_id}.");
        return Ok(());
    };
    println!("Student: '{}'", student.name);
    println!("Normalized: '{}'", normalize::normalize_name(&student.name));

    let found = matcher::find_notes(&students, &notes, student_id);
    println!("Matching notes: {}", found.len());
    for (index, note) in found.iter().take(MATCH_PREVIEW).enumerate() {
        println!("  {}. {} - {}", index + 1, note.problem, note.date);
    }
    Ok(())
}
