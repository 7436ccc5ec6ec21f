use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use icu_calendar::islamic::IslamicUmmAlQura;
use icu_calendar::Date;

use crate::error::{ConvertError, Result};
use crate::spreadsheet::Cell;

pub const HIJRI_MONTHS: [&str; 12] = [
    "محرم",
    "صفر",
    "ربيع الأول",
    "ربيع الآخر",
    "جمادى الأولى",
    "جمادى الآخرة",
    "رجب",
    "شعبان",
    "رمضان",
    "شوال",
    "ذو القعدة",
    "ذو الحجة",
];

/// Indexed Monday = 0 through Sunday = 6.
pub const WEEKDAYS: [&str; 7] = [
    "الاثنين",
    "الثلاثاء",
    "الأربعاء",
    "الخميس",
    "الجمعة",
    "السبت",
    "الأحد",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HijriDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

/// Gregorian to Hijri conversion. The arithmetic lives outside this crate.
pub trait HijriConverter {
    fn to_hijri(&self, date: NaiveDate) -> Result<HijriDate>;
}

/// Umm al-Qura calendar backed by ICU.
#[derive(Debug, Default, Clone, Copy)]
pub struct UmmAlQura;

impl HijriConverter for UmmAlQura {
    fn to_hijri(&self, date: NaiveDate) -> Result<HijriDate> {
        let month = u8::try_from(date.month()).map_err(|err| ConvertError::Calendar(err.to_string()))?;
        let day = u8::try_from(date.day()).map_err(|err| ConvertError::Calendar(err.to_string()))?;
        let iso = Date::try_new_iso_date(date.year(), month, day)
            .map_err(|err| ConvertError::Calendar(format!("{date}: {err}")))?;
        let hijri = iso.to_calendar(IslamicUmmAlQura::new());
        Ok(HijriDate {
            year: hijri.year().number,
            month: hijri.month().ordinal,
            day: hijri.day_of_month().0,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatStyle {
    Full,
    Short,
    NoYear,
}

impl FormatStyle {
    /// Unrecognized selectors fall back to `Full`.
    pub fn from_selector(selector: &str) -> Self {
        match selector {
            "short" => FormatStyle::Short,
            "no_year" => FormatStyle::NoYear,
            _ => FormatStyle::Full,
        }
    }

    fn parts(self) -> (bool, bool) {
        match self {
            FormatStyle::Full => (true, true),
            FormatStyle::Short => (false, true),
            FormatStyle::NoYear => (true, false),
        }
    }
}

pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => HIJRI_MONTHS[month as usize - 1],
        _ => "",
    }
}

pub fn weekday_name(weekday: Weekday) -> &'static str {
    WEEKDAYS[weekday.num_days_from_monday() as usize]
}

/// Renders an already converted date. The weekday comes from the Gregorian
/// side of the pair.
pub fn format_hijri_date(
    gregorian: NaiveDate,
    hijri: HijriDate,
    include_weekday: bool,
    include_year: bool,
) -> String {
    let mut parts = Vec::with_capacity(3);
    if include_weekday {
        parts.push(weekday_name(gregorian.weekday()).to_string());
    }
    parts.push(format!("{} {}", hijri.day, month_name(hijri.month)));
    if include_year {
        parts.push(hijri.year.to_string());
    }
    parts.join(", ")
}

pub fn format_hijri_simple(hijri: HijriDate) -> String {
    format!("{}/{}/{}", hijri.day, hijri.month, hijri.year)
}

pub fn to_hijri_display(
    converter: &dyn HijriConverter,
    date: NaiveDate,
    include_weekday: bool,
    include_year: bool,
) -> Result<String> {
    let hijri = converter.to_hijri(date)?;
    Ok(format_hijri_date(date, hijri, include_weekday, include_year))
}

/// Lenient date parsing shared by the notes extractor and the Hijri
/// formatter: native datetimes, Excel serials and the common text layouts.
pub fn parse_cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::DateTime(value) => Some(value.date()),
        Cell::Int(serial) => crate::spreadsheet::excel_serial_to_datetime(*serial as f64)
            .map(|value| value.date()),
        Cell::Float(serial) => {
            crate::spreadsheet::excel_serial_to_datetime(*serial).map(|value| value.date())
        }
        Cell::Text(text) => parse_date_text(text),
        Cell::Empty | Cell::Bool(_) => None,
    }
}

pub fn parse_date_text(text: &str) -> Option<NaiveDate> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    // Day-month-year text is read month-first, with day-first only when
    // month-first is not a valid date. Same rule for slashes and dashes.
    const DATE_FORMATS: [&str; 6] = [
        "%Y-%m-%d",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d/%m/%Y",
        "%m-%d-%Y",
        "%d-%m-%Y",
    ];

    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(text, format) {
            return Some(value.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
}

/// Hijri rendering for a value of unknown type. Never fails: anything that
/// can't be read or converted becomes "" with a warning.
pub fn convert_excel_date_to_hijri(
    converter: &dyn HijriConverter,
    value: &Cell,
    format_style: &str,
) -> String {
    if value.is_empty() {
        return String::new();
    }
    let Some(date) = parse_cell_date(value) else {
        tracing::warn!(value = %value, "unparseable date, leaving the Hijri date empty");
        return String::new();
    };
    let (include_weekday, include_year) = FormatStyle::from_selector(format_style).parts();
    match to_hijri_display(converter, date, include_weekday, include_year) {
        Ok(display) => display,
        Err(err) => {
            tracing::warn!(%date, error = %err, "Hijri conversion failed");
            String::new()
        }
    }
}
