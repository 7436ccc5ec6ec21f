use std::path::{Path, PathBuf};

use anyhow::Context;

pub const PERIOD_1_WORKBOOK: &str = "الفترة 1.xlsx";
/// The period 2 workbook is distributed with two right-to-left marks in
/// front of its name.
pub const PERIOD_2_WORKBOOK: &str = "\u{200f}\u{200f}الفترة 2.xlsx";
pub const NOTES_WORKBOOK: &str = "الملاحظات.xlsx";

pub const PERIOD_1_JSON: &str = "period1.json";
pub const PERIOD_2_JSON: &str = "period2.json";
pub const NOTES_JSON: &str = "notes.json";
pub const STAMP_JSON: &str = "last_update.json";

/// Notes workbooks open with a title caption; column names sit on the second row.
pub const NOTES_HEADER_ROW: usize = 1;
pub const GRADES_HEADER_ROW: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    First,
    Second,
}

impl Period {
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(Period::First),
            2 => Some(Period::Second),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            Period::First => 1,
            Period::Second => 2,
        }
    }
}

/// Where inputs are read from and outputs written to.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `dir` when given, otherwise the directory holding the running
    /// executable.
    pub fn resolve(dir: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(dir) = dir {
            return Ok(Self::new(dir));
        }
        let exe = std::env::current_exe().context("failed to locate the running executable")?;
        let root = exe
            .parent()
            .map(Path::to_path_buf)
            .context("the executable has no parent directory")?;
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn grades_workbook(&self, period: Period) -> PathBuf {
        match period {
            Period::First => self.root.join(PERIOD_1_WORKBOOK),
            Period::Second => self.root.join(PERIOD_2_WORKBOOK),
        }
    }

    pub fn grades_json(&self, period: Period) -> PathBuf {
        match period {
            Period::First => self.root.join(PERIOD_1_JSON),
            Period::Second => self.root.join(PERIOD_2_JSON),
        }
    }

    pub fn notes_workbook(&self) -> PathBuf {
        self.root.join(NOTES_WORKBOOK)
    }

    pub fn notes_json(&self) -> PathBuf {
        self.root.join(NOTES_JSON)
    }

    pub fn stamp_json(&self) -> PathBuf {
        self.root.join(STAMP_JSON)
    }
}
