use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

pub const ID_COLUMN: &str = "الهوية";
pub const NAME_COLUMN: &str = "الطالب";

/// One row of a grades sheet. Serialized as the original columns, keyed by
/// the spreadsheet headers in their original order.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub id: Option<i64>,
    pub name: String,
    pub columns: Map<String, Value>,
}

impl StudentRecord {
    pub fn from_columns(columns: Map<String, Value>) -> Result<Self, String> {
        let id = match columns.get(ID_COLUMN) {
            Some(Value::Number(number)) => number
                .as_i64()
                .or_else(|| number.as_f64().filter(|v| v.fract() == 0.0).map(|v| v as i64)),
            Some(Value::String(text)) => text.trim().parse().ok(),
            Some(Value::Null) | None => None,
            Some(other) => return Err(format!("unexpected {ID_COLUMN} value: {other}")),
        };
        let name = match columns.get(NAME_COLUMN) {
            Some(Value::String(text)) => text.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        Ok(Self { id, name, columns })
    }
}

impl Serialize for StudentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.columns.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for StudentRecord {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let columns = Map::deserialize(deserializer)?;
        StudentRecord::from_columns(columns).map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralNote {
    /// Name exactly as it appeared in the sheet.
    #[serde(skip)]
    pub raw_name: String,
    #[serde(rename = "اسم_الطالب")]
    pub student_name: String,
    #[serde(rename = "التاريخ")]
    pub date: String,
    #[serde(rename = "المشكلة")]
    pub problem: String,
    #[serde(rename = "الصف")]
    pub grade_level: Option<i64>,
    #[serde(rename = "الإجراء", default)]
    pub action: String,
    #[serde(
        rename = "التاريخ_الهجري",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hijri_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStamp {
    pub last_update: LastUpdate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUpdate {
    pub gregorian: GregorianStamp,
    pub hijri: HijriStamp,
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GregorianStamp {
    pub date: String,
    pub time: String,
    pub full: String,
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HijriStamp {
    pub date: String,
    pub display: String,
}

/// A field that could not be coerced to its expected type. The record is
/// kept with the field nulled.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldIssue {
    pub line: usize,
    pub column: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Extraction<T> {
    pub records: Vec<T>,
    pub skipped: usize,
    pub issues: Vec<FieldIssue>,
}

#[derive(Debug, Clone)]
pub struct StudentNoteSummary {
    pub student_name: String,
    pub count: usize,
}
