use serde::ser::{Serialize, Serializer};
use serde_json::Value;

use crate::error::ThemeError;
use crate::utils::averages::{mean, round_half_up};
use crate::utils::locale::Locale;

/// Grade states that count towards an average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeStatus {
    Fv,
    Pd,
    Kd,
    Nod,
    Opb,
    Psd,
    Md,
    Isk,
    T,
    Rd,
    Dd,
    Prm,
}

impl GradeStatus {
    pub fn from_code(code: &str) -> Option<Self> {
        let status = match code {
            "FV" => Self::Fv,
            "PD" => Self::Pd,
            "KD" => Self::Kd,
            "NOD" => Self::Nod,
            "OPB" => Self::Opb,
            "PSD" => Self::Psd,
            "MD" => Self::Md,
            "ISK" => Self::Isk,
            "T" => Self::T,
            "RD" => Self::Rd,
            "DD" => Self::Dd,
            "prm" => Self::Prm,
            _ => return None,
        };
        Some(status)
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::Fv => "FV",
            Self::Pd => "PD",
            Self::Kd => "KD",
            Self::Nod => "NOD",
            Self::Opb => "OPB",
            Self::Psd => "PSD",
            Self::Md => "MD",
            Self::Isk => "ISK",
            Self::T => "T",
            Self::Rd => "RD",
            Self::Dd => "DD",
            Self::Prm => "prm",
        }
    }
}

/// Validated `_theme` metadata of one grade element.
///
/// The page stores a JSON list of tuples next to every grade; only the status
/// code in the third field of the first tuple is relied upon.
#[derive(Debug, Clone, PartialEq)]
pub struct GradeTheme {
    pub status: GradeStatus,
    pub fields: Vec<Value>,
}

impl GradeTheme {
    /// Parses the sibling text as found in the page, with `\/` still escaped.
    pub fn parse(escaped: &str) -> Result<Self, ThemeError> {
        let unescaped = escaped.replace("\\/", "/");
        let value: Value = serde_json::from_str(&unescaped)?;

        let tuples = match value {
            Value::Array(tuples) => tuples,
            _ => return Err(ThemeError::NotATupleList),
        };
        let fields = match tuples.into_iter().next() {
            Some(Value::Array(fields)) => fields,
            _ => return Err(ThemeError::NotATupleList),
        };
        if fields.len() <= 2 {
            return Err(ThemeError::TooFewFields(fields.len()));
        }

        let code = fields[2].as_str().ok_or(ThemeError::StatusNotText)?;
        let status = GradeStatus::from_code(code)
            .ok_or_else(|| ThemeError::UncountedStatus(code.to_string()))?;

        Ok(GradeTheme { status, fields })
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    #[serde(serialize_with = "serialize_grades_label")]
    pub grades: Vec<f64>,
    /// Mean rounded half-up. Nothing downstream reads it: the checklist
    /// re-rounds the two-decimal raw average instead.
    pub rounded_avg: Option<i64>,
    pub raw_avg: Option<f64>,
}

impl SubjectRecord {
    pub fn from_grades(grades: Vec<f64>) -> Self {
        let raw_avg = mean(&grades);
        let rounded_avg = raw_avg.map(|avg| round_half_up(avg) as i64);
        SubjectRecord { grades, rounded_avg, raw_avg }
    }

    /// Grades rounded to whole numbers, e.g. `8, 9, 7`, or the locale's none marker.
    pub fn grades_label(&self, locale: &Locale) -> String {
        grades_label(&self.grades, locale)
    }
}

fn grades_label(grades: &[f64], locale: &Locale) -> String {
    if grades.is_empty() {
        return locale.none_marker.to_string();
    }
    grades
        .iter()
        .map(|grade| (round_half_up(*grade) as i64).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

// Written the way the page shows it: `"8, 9, 7"`, or the none marker.
fn serialize_grades_label<S: Serializer>(grades: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&grades_label(grades, Locale::build()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubjectEntry {
    pub name: String,
    pub record: SubjectRecord,
}

/// Subject name -> record, in the order subjects were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubjectGrades {
    entries: Vec<SubjectEntry>,
}

impl SubjectGrades {
    /// Replacing an existing subject keeps its original position.
    pub fn insert(&mut self, name: String, record: SubjectRecord) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.record = record,
            None => self.entries.push(SubjectEntry { name, record }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SubjectRecord> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.record)
    }

    pub fn remove_first(&mut self) -> Option<SubjectEntry> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubjectEntry> {
        self.entries.iter()
    }
}

impl Serialize for SubjectGrades {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.entries.iter().map(|entry| (&entry.name, &entry.record)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub subject_grades: SubjectGrades,
    pub overall_avg: Option<f64>,
}
