use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};

use crate::error::{GradeRejection, ThemeError};
use crate::models::{ExtractionResult, GradeTheme, SubjectGrades, SubjectRecord};
use crate::utils::averages::{mean, parse_leading_float};

/// Name used for subject rows whose name cells are missing or blank.
pub const SUBJECT_PLACEHOLDER: &str = "Empty";

// CSS hooks of the Mykoob "period" grades view.
const SUBJECT_CONTAINER: &str = "div.period_subject_div";
const DATA_CONTAINER: &str = "div.period_data_div";
const ROW: &str = "tr";
const SUBJECT_CELL: &str = "td.col_1.nowrap";
const SUBJECT_CELL_FALLBACK: &str = "td.col_0.white";
const GRADE_CELL: &str = r#"td[class*="col_month_"]"#;
const GRADE_SPAN: &str = "span.viewgrades_period_grade";
const THEME_CLASSES: [&str; 2] = ["hide", "_theme"];

struct PageSelectors {
    subject_container: Selector,
    data_container: Selector,
    row: Selector,
    subject_cell: Selector,
    subject_cell_fallback: Selector,
    grade_cell: Selector,
    grade_span: Selector,
}

impl PageSelectors {
    fn new() -> Self {
        PageSelectors {
            subject_container: selector(SUBJECT_CONTAINER),
            data_container: selector(DATA_CONTAINER),
            row: selector(ROW),
            subject_cell: selector(SUBJECT_CELL),
            subject_cell_fallback: selector(SUBJECT_CELL_FALLBACK),
            grade_cell: selector(GRADE_CELL),
            grade_span: selector(GRADE_SPAN),
        }
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("grade page selectors are valid CSS")
}

fn element_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

// Subject names in document order, one per row of the subject column.
fn parse_subjects(document: &Html, selectors: &PageSelectors) -> Vec<String> {
    let Some(container) = document.select(&selectors.subject_container).next() else {
        return Vec::new();
    };

    container
        .select(&selectors.row)
        .map(|row| {
            // The fallback cell is only read when the name cell is absent.
            [&selectors.subject_cell, &selectors.subject_cell_fallback]
                .into_iter()
                .find_map(|cell| row.select(cell).next())
                .map(element_text)
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| SUBJECT_PLACEHOLDER.to_string())
        })
        .collect()
}

// The hidden `<span class="hide _theme">` right after a grade, if it has any text.
fn theme_text(grade: ElementRef) -> Option<String> {
    let sibling = grade.next_siblings().find_map(ElementRef::wrap)?;
    let classes: Vec<&str> = sibling.value().classes().collect();
    if !THEME_CLASSES.iter().all(|class| classes.contains(class)) {
        return None;
    }
    let text: String = sibling.text().collect();
    (!text.is_empty()).then_some(text)
}

/// Turns a displayed grade token into a number.
///
/// Percentage entries never count, and a trailing backtick marker is dropped
/// before parsing.
pub fn parse_grade_token(token: &str) -> Result<f64, GradeRejection> {
    let token = token.trim();
    if token.contains('%') {
        return Err(GradeRejection::Percentage(token.to_string()));
    }
    let number = token.strip_suffix('`').unwrap_or(token);
    parse_leading_float(number).ok_or_else(|| GradeRejection::NotANumber(token.to_string()))
}

fn grade_value(grade: ElementRef, theme: &str) -> Result<f64, GradeRejection> {
    GradeTheme::parse(theme)?;
    parse_grade_token(&element_text(grade))
}

fn row_grades(row: ElementRef, subject: &str, selectors: &PageSelectors) -> Vec<f64> {
    let mut grades = Vec::new();
    for cell in row.select(&selectors.grade_cell) {
        for grade in cell.select(&selectors.grade_span) {
            let Some(theme) = theme_text(grade) else {
                continue;
            };
            match grade_value(grade, &theme) {
                Ok(value) => grades.push(value),
                Err(GradeRejection::Theme(ThemeError::Json(e))) => {
                    warn!("Error parsing grade data for {}: {}", subject, e)
                }
                Err(e) => debug!("Skipping grade for {}: {}", subject, e),
            }
        }
    }
    grades
}

/// Extracts every subject's grades and averages from a rendered grades page.
///
/// The first subject row is a header on this page, so it is dropped from the
/// result and from the overall average. Missing containers simply yield an
/// empty result.
pub fn extract_grades(html: &str) -> ExtractionResult {
    let document = Html::parse_document(html);
    let selectors = PageSelectors::new();

    let subjects = parse_subjects(&document, &selectors);
    let mut subject_grades = SubjectGrades::default();
    let mut row_averages: Vec<Option<f64>> = Vec::new();

    if let Some(container) = document.select(&selectors.data_container).next() {
        // Rows past the shorter of the two columns are ignored.
        for (subject, row) in subjects.iter().zip(container.select(&selectors.row)) {
            let record = SubjectRecord::from_grades(row_grades(row, subject, &selectors));
            row_averages.push(record.raw_avg);
            subject_grades.insert(subject.clone(), record);
        }
    }

    if let Some(header) = subject_grades.remove_first() {
        debug!("Dropping header row `{}`", header.name);
    }
    let counted: Vec<f64> = row_averages.iter().skip(1).flatten().copied().collect();

    ExtractionResult {
        subject_grades,
        overall_avg: mean(&counted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::locale::ENGLISH;

    fn grade(text: &str, status: &str) -> String {
        format!(
            r#"<span class="viewgrades_period_grade">{text}</span><span class="hide _theme">[["2024-02-01","Kontroldarbs \/ 1","{status}"]]</span>"#
        )
    }

    fn page(subjects: &[&str], rows: &[Vec<String>]) -> String {
        let subject_rows: String = subjects
            .iter()
            .map(|s| format!(r#"<tr><td class="col_1 nowrap">{s}</td></tr>"#))
            .collect();
        let data_rows: String = rows
            .iter()
            .map(|cells| {
                let cells: String = cells
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!(r#"<td class="col_month_{i}">{c}</td>"#))
                    .collect();
                format!("<tr>{cells}</tr>")
            })
            .collect();
        format!(
            r#"<html><body>
            <div class="period_subject_div"><table>{subject_rows}</table></div>
            <div class="period_data_div"><table>{data_rows}</table></div>
            </body></html>"#
        )
    }

    #[test]
    fn test_header_math_art_scenario() {
        let html = page(
            &["Header", "Math", "Art"],
            &[
                vec![grade("10", "FV")],
                vec![grade("8", "FV") + &grade("9", "PD"), grade("7", "T")],
                vec![],
            ],
        );

        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.len(), 2);
        assert!(result.subject_grades.get("Header").is_none());

        let math = result.subject_grades.get("Math").unwrap();
        assert_eq!(math.grades_label(&ENGLISH), "8, 9, 7");
        assert_eq!(math.raw_avg, Some(8.0));
        assert_eq!(math.rounded_avg, Some(8));

        let art = result.subject_grades.get("Art").unwrap();
        assert_eq!(art.grades_label(&ENGLISH), "None");
        assert_eq!(art.raw_avg, None);
        assert_eq!(art.rounded_avg, None);

        assert_eq!(result.overall_avg, Some(8.0));
    }

    #[test]
    fn test_uncounted_status_excluded() {
        let html = page(
            &["Header", "Math"],
            &[vec![], vec![grade("4", "NV") + &grade("9", "KD") + &grade("2", "fv")]],
        );
        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.get("Math").unwrap().grades, vec![9.0]);
    }

    #[test]
    fn test_percentage_and_suffix_tokens() {
        let html = page(
            &["Header", "Physics"],
            &[vec![], vec![grade("85%", "FV") + &grade("6`", "FV") + &grade("n", "FV")]],
        );
        let result = extract_grades(&html);
        let physics = result.subject_grades.get("Physics").unwrap();
        assert_eq!(physics.grades, vec![6.0]);
        assert_eq!(result.overall_avg, Some(6.0));
    }

    #[test]
    fn test_malformed_theme_drops_only_that_grade() {
        let broken = r#"<span class="viewgrades_period_grade">3</span><span class="hide _theme">[["x","y",</span>"#;
        let html = page(
            &["Header", "Math"],
            &[vec![], vec![grade("8", "FV") + broken + &grade("10", "MD")]],
        );
        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.get("Math").unwrap().grades, vec![8.0, 10.0]);
    }

    #[test]
    fn test_grade_without_theme_marker_is_ignored() {
        let html = page(
            &["Header", "Math"],
            &[
                vec![],
                vec![
                    r#"<span class="viewgrades_period_grade">5</span><span class="hide">[["a","b","FV"]]</span>"#
                        .to_string()
                        + r#"<span class="viewgrades_period_grade">6</span><span class="hide _theme"></span>"#
                        + &grade("7", "FV"),
                ],
            ],
        );
        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.get("Math").unwrap().grades, vec![7.0]);
    }

    #[test]
    fn test_first_subject_never_counts() {
        let html = page(
            &["Header", "Math", "Art"],
            &[vec![grade("2", "FV")], vec![], vec![grade("10", "FV")]],
        );
        let result = extract_grades(&html);
        assert!(result.subject_grades.get("Header").is_none());
        assert_eq!(result.overall_avg, Some(10.0));
    }

    #[test]
    fn test_rows_beyond_subject_list_ignored() {
        let html = page(
            &["Header", "Math"],
            &[vec![], vec![grade("6", "FV")], vec![grade("1", "FV")]],
        );
        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.len(), 1);
        assert_eq!(result.overall_avg, Some(6.0));
    }

    #[test]
    fn test_round_half_up_average() {
        let html = page(
            &["Header", "Math", "Art"],
            &[
                vec![],
                vec![grade("7", "FV") + &grade("8", "FV")],
                vec![grade("7", "FV") + &grade("7", "FV") + &grade("7.47", "FV")],
            ],
        );
        let result = extract_grades(&html);
        assert_eq!(result.subject_grades.get("Math").unwrap().rounded_avg, Some(8));
        assert_eq!(result.subject_grades.get("Art").unwrap().rounded_avg, Some(7));
    }

    #[test]
    fn test_subject_name_fallbacks() {
        let html = r#"<html><body>
            <div class="period_subject_div"><table>
                <tr><td class="col_0 white">Header</td></tr>
                <tr><td class="col_0 white">Biology</td></tr>
                <tr><td class="col_0 white">2.</td><td class="col_1 nowrap"> </td></tr>
                <tr><th>no cells</th></tr>
            </table></div>
            <div class="period_data_div"><table>
                <tr></tr><tr></tr><tr></tr><tr></tr>
            </table></div>
        </body></html>"#;
        let result = extract_grades(html);
        let names: Vec<_> = result.subject_grades.iter().map(|e| e.name.as_str()).collect();
        // A blank name cell never falls through to the row number.
        assert_eq!(names, ["Biology", SUBJECT_PLACEHOLDER]);
    }

    #[test]
    fn test_missing_containers_yield_empty_result() {
        assert_eq!(extract_grades("<html><body><p>login</p></body></html>"), ExtractionResult::default());
        let only_subjects = r#"<div class="period_subject_div"><table><tr><td class="col_1 nowrap">A</td></tr></table></div>"#;
        assert!(extract_grades(only_subjects).subject_grades.is_empty());
    }

    #[test]
    fn test_json_grades_are_rounded_labels() {
        let html = page(
            &["Header", "Math", "Art"],
            &[vec![], vec![grade("8", "FV") + &grade("9.6", "FV")], vec![]],
        );
        let json = serde_json::to_value(extract_grades(&html)).unwrap();
        assert_eq!(json["subjectGrades"]["Math"]["grades"], "8, 10");
        assert_eq!(json["subjectGrades"]["Art"]["grades"], crate::utils::locale::Locale::build().none_marker);
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let html = page(
            &["Header", "Math", "Art"],
            &[vec![], vec![grade("8", "FV") + &grade("9", "prm")], vec![grade("5`", "ISK")]],
        );
        assert_eq!(extract_grades(&html), extract_grades(&html));
    }

    #[test]
    fn test_parse_grade_token() {
        assert_eq!(parse_grade_token(" 9 ").unwrap(), 9.0);
        assert_eq!(parse_grade_token("7`").unwrap(), 7.0);
        assert!(matches!(parse_grade_token("90%"), Err(GradeRejection::Percentage(_))));
        assert!(matches!(parse_grade_token("nv"), Err(GradeRejection::NotANumber(_))));
    }
}
