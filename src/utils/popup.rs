use std::collections::BTreeSet;

use log::{error, info};
use serde::Serialize;

use crate::models::{ExtractionResult, SubjectRecord};
use crate::utils::averages::{round_half_up, round_to_two, to_fixed};
use crate::utils::host::Host;
use crate::utils::locale::Locale;

/// One subject line of the checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct ChecklistRow {
    pub subject: String,
    pub record: SubjectRecord,
    /// Raw average cut to two decimals; this is what the overall average is built from.
    pub stored_avg: Option<f64>,
}

impl ChecklistRow {
    pub fn average_label(&self, locale: &Locale) -> String {
        match (self.record.rounded_avg, self.record.raw_avg) {
            (Some(_), Some(raw)) => format!(
                "{}: {} ({})",
                locale.average,
                round_half_up(raw) as i64,
                round_to_two(raw)
            ),
            _ => locale.no_average.to_string(),
        }
    }
}

/// The extracted subjects laid out as a checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct Checklist {
    result: ExtractionResult,
    rows: Vec<ChecklistRow>,
}

impl Checklist {
    pub fn from_result(result: ExtractionResult) -> Self {
        let rows = result
            .subject_grades
            .iter()
            .map(|entry| ChecklistRow {
                subject: entry.name.clone(),
                record: entry.record.clone(),
                stored_avg: entry.record.raw_avg.map(round_to_two),
            })
            .collect();
        Checklist { result, rows }
    }

    pub fn result(&self) -> &ExtractionResult {
        &self.result
    }

    pub fn rows(&self) -> &[ChecklistRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every subject starts out checked.
    pub fn inclusion(&self) -> InclusionSet {
        InclusionSet {
            checked: self.rows.iter().map(|row| row.subject.clone()).collect(),
        }
    }

    /// Mean of the checked subjects' averages, each rounded to a whole grade first.
    pub fn overall(&self, included: &InclusionSet) -> OverallAverage {
        let (sum, count) = self
            .rows
            .iter()
            .filter(|row| included.is_checked(&row.subject))
            .filter_map(|row| row.stored_avg)
            .filter(|avg| avg.is_finite())
            .fold((0.0, 0usize), |(sum, count), avg| (sum + round_half_up(avg), count + 1));

        if count == 0 {
            OverallAverage::NoSelection
        } else {
            OverallAverage::Value(sum / count as f64)
        }
    }
}

/// Subjects currently ticked in the checklist.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InclusionSet {
    checked: BTreeSet<String>,
}

impl InclusionSet {
    pub fn is_checked(&self, subject: &str) -> bool {
        self.checked.contains(subject)
    }

    /// Returns whether the subject is checked afterwards.
    pub fn toggle(&mut self, subject: &str) -> bool {
        if self.checked.remove(subject) {
            false
        } else {
            self.checked.insert(subject.to_string());
            true
        }
    }

    pub fn check(&mut self, subject: &str) {
        self.checked.insert(subject.to_string());
    }

    /// Returns false if the subject was not checked.
    pub fn uncheck(&mut self, subject: &str) -> bool {
        self.checked.remove(subject)
    }

    pub fn len(&self) -> usize {
        self.checked.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverallAverage {
    Value(f64),
    NoSelection,
}

impl OverallAverage {
    pub fn label(&self, locale: &Locale) -> String {
        match self {
            OverallAverage::Value(avg) => format!("{}: {}", locale.overall, to_fixed(*avg, 2)),
            OverallAverage::NoSelection => locale.select_prompt.to_string(),
        }
    }
}

/// What the popup shows after it has been opened.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PopupState {
    #[default]
    Unloaded,
    WrongPage,
    Empty,
    Failed(String),
    Loaded(Checklist),
}

impl PopupState {
    pub fn inclusion(&self) -> InclusionSet {
        match self {
            PopupState::Loaded(checklist) => checklist.inclusion(),
            _ => InclusionSet::default(),
        }
    }
}

/// Finds the active tab and, if it is the grades page, extracts it.
pub async fn open_popup<H: Host + ?Sized>(host: &H) -> PopupState {
    let tab = match host.active_tab().await {
        Ok(Some(tab)) => tab,
        Ok(None) => return PopupState::WrongPage,
        Err(e) => {
            error!("Error querying the active tab: {}", e);
            return PopupState::Failed(e.to_string());
        }
    };

    if !tab.is_grades_page() {
        info!("Active tab {:?} is not the grades page", tab.url);
        return PopupState::WrongPage;
    }

    match host.inject_extractor(&tab).await {
        Ok(Some(result)) => {
            let checklist = Checklist::from_result(result);
            if checklist.is_empty() {
                PopupState::Empty
            } else {
                info!("Extracted {} subjects", checklist.rows().len());
                PopupState::Loaded(checklist)
            }
        }
        Ok(None) => PopupState::Empty,
        Err(e) => {
            error!("Error extracting grades: {}", e);
            PopupState::Failed(e.to_string())
        }
    }
}

/// Plain-text rendering for the terminal.
pub fn render_text(state: &PopupState, included: &InclusionSet, locale: &Locale) -> String {
    match state {
        PopupState::Unloaded => String::new(),
        PopupState::WrongPage => locale.wrong_page.to_string(),
        PopupState::Empty => locale.no_data.to_string(),
        PopupState::Failed(message) => format!("{}: {}", locale.error, message),
        PopupState::Loaded(checklist) => {
            let mut out = String::new();
            for row in checklist.rows() {
                let mark = if included.is_checked(&row.subject) { "x" } else { " " };
                out.push_str(&format!("[{}] {}\n", mark, row.subject));
                out.push_str(&format!("    {}: {}\n", locale.grades, row.record.grades_label(locale)));
                out.push_str(&format!("    {}\n", row.average_label(locale)));
            }
            out.push('\n');
            out.push_str(&checklist.overall(included).label(locale));
            out
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// The popup markup: `#results` with one `.subject` block per row, then `#overall`.
pub fn render_html(state: &PopupState, included: &InclusionSet, locale: &Locale) -> String {
    let (results, overall) = match state {
        PopupState::Unloaded => (String::new(), String::new()),
        PopupState::WrongPage => (format!("<p>{}</p>", locale.wrong_page), String::new()),
        PopupState::Empty => (format!("<p>{}</p>", locale.no_data), String::new()),
        PopupState::Failed(message) => (
            format!("<p>{}: {}</p>", locale.error, escape_html(message)),
            String::new(),
        ),
        PopupState::Loaded(checklist) => {
            let mut html = String::new();
            for row in checklist.rows() {
                let data_avg = row
                    .stored_avg
                    .map_or_else(|| "null".to_string(), |avg| avg.to_string());
                let checked = if included.is_checked(&row.subject) { " checked" } else { "" };
                html.push_str(&format!(
                    concat!(
                        "<div class=\"subject\">\n",
                        "  <label>\n",
                        "    <input type=\"checkbox\" class=\"subject-checkbox\"{} data-avg=\"{}\">\n",
                        "    {}\n",
                        "  </label>\n",
                        "  <div class=\"grades\">{}: {}</div>\n",
                        "  <div class=\"average\">{}</div>\n",
                        "</div>\n"
                    ),
                    checked,
                    data_avg,
                    escape_html(&row.subject),
                    locale.grades,
                    row.record.grades_label(locale),
                    row.average_label(locale),
                ));
            }
            (html, escape_html(&checklist.overall(included).label(locale)))
        }
    };

    format!(
        "<div id=\"results\">\n{}</div>\n<div id=\"overall\">{}</div>\n",
        results, overall
    )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonReport<'a> {
    state: &'static str,
    message: Option<String>,
    result: Option<&'a ExtractionResult>,
    selected: Vec<&'a str>,
    overall: Option<f64>,
}

/// Machine-readable rendering: the page script's result plus the current selection.
pub fn render_json(
    state: &PopupState,
    included: &InclusionSet,
    locale: &Locale,
) -> serde_json::Result<String> {
    let report = match state {
        PopupState::Loaded(checklist) => JsonReport {
            state: "loaded",
            message: None,
            result: Some(checklist.result()),
            selected: checklist
                .rows()
                .iter()
                .filter(|row| included.is_checked(&row.subject))
                .map(|row| row.subject.as_str())
                .collect(),
            overall: match checklist.overall(included) {
                OverallAverage::Value(avg) => Some(avg),
                OverallAverage::NoSelection => None,
            },
        },
        other => {
            let (name, message) = match other {
                PopupState::WrongPage => ("wrongPage", Some(locale.wrong_page.to_string())),
                PopupState::Empty => ("empty", Some(locale.no_data.to_string())),
                PopupState::Failed(message) => ("error", Some(message.clone())),
                _ => ("unloaded", None),
            };
            JsonReport {
                state: name,
                message,
                result: None,
                selected: Vec::new(),
                overall: None,
            }
        }
    };
    serde_json::to_string_pretty(&report)
}
