use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::collect::SearchConfig;
use crate::models::NormalizedListing;
use crate::normalize::{
    classify_employment, clean_description, company_is_public_sector, resolve_posted_date,
    DATE_FORMAT, DEFAULT_COMPANY, DEFAULT_LOCATION, INDUSTRY, SALARY_NOT_SPECIFIED,
    SOURCE_CURATED, SOURCE_GOVERNMENT,
};

/// Published CSV endpoint of the manually curated sheet. Overridable via
/// SHEET_CSV_URL or --sheet-url.
pub const DEFAULT_SHEET_CSV_URL: &str = "https://docs.google.com/spreadsheets/d/e/2PACX-1vQm4jR8tKzVbq0sYdHtWk3n/pub?gid=0&single=true&output=csv";

/// Sheet rows get their own identifier namespace so a curated row can never
/// collide with an aggregation-source id.
const SHEET_ID_PREFIX: &str = "sheet-";
const ROW_KEY_MAX_CHARS: usize = 48;

pub fn fetch_sheet_csv(client: &reqwest::blocking::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .context("Failed to fetch the curated sheet")?;

    if !response.status().is_success() {
        return Err(anyhow!(
            "Sheet fetch failed with status {}",
            response.status()
        ));
    }

    response.text().context("Failed to read sheet response body")
}

/// Parses the published CSV into normalized listings ready for the sink.
/// Rows without a title or apply link are dropped; duplicate apply links
/// keep their first row.
pub fn parse_sheet(
    text: &str,
    config: &SearchConfig,
    now: DateTime<Utc>,
) -> Result<Vec<NormalizedListing>> {
    let rows = parse_csv(text);
    let mut iter = rows.into_iter();
    let header = iter.next().ok_or_else(|| anyhow!("Sheet is empty"))?;
    let columns = map_columns(&header)?;

    let mut seen: HashSet<String> = HashSet::new();
    let mut listings = Vec::new();
    for row in iter {
        if let Some(listing) = sheet_row_to_listing(&columns, &row, config, now) {
            if seen.insert(listing.job_id.clone()) {
                listings.push(listing);
            }
        }
    }
    Ok(listings)
}

// --- CSV parsing ---

/// Minimal RFC-4180 reader: quoted fields may contain commas, newlines and
/// doubled quotes. Published sheets emit exactly this dialect.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    let mut row = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => row.push(std::mem::take(&mut field)),
                '\r' => {}
                '\n' => {
                    row.push(std::mem::take(&mut field));
                    rows.push(std::mem::take(&mut row));
                }
                _ => field.push(c),
            }
        }
    }
    if !field.is_empty() || !row.is_empty() {
        row.push(field);
        rows.push(row);
    }
    rows
}

// --- Column mapping ---

#[derive(Debug)]
struct SheetColumns {
    title: usize,
    apply: usize,
    company: Option<usize>,
    location: Option<usize>,
    salary: Option<usize>,
    description: Option<usize>,
    job_type: Option<usize>,
    posted: Option<usize>,
}

fn map_columns(header: &[String]) -> Result<SheetColumns> {
    let mut title = None;
    let mut apply = None;
    let mut company = None;
    let mut location = None;
    let mut salary = None;
    let mut description = None;
    let mut job_type = None;
    let mut posted = None;

    for (idx, name) in header.iter().enumerate() {
        let name = name.trim().to_lowercase();
        if name.contains("title") && title.is_none() {
            title = Some(idx);
        } else if (name.contains("apply") || name.contains("link") || name.contains("url"))
            && apply.is_none()
        {
            apply = Some(idx);
        } else if name.contains("company") && company.is_none() {
            company = Some(idx);
        } else if name.contains("location") && location.is_none() {
            location = Some(idx);
        } else if (name.contains("salary") || name.contains("stipend")) && salary.is_none() {
            salary = Some(idx);
        } else if (name.contains("description") || name.contains("details"))
            && description.is_none()
        {
            description = Some(idx);
        } else if name.contains("type") && job_type.is_none() {
            job_type = Some(idx);
        } else if (name.contains("date") || name.contains("posted")) && posted.is_none() {
            posted = Some(idx);
        }
    }

    Ok(SheetColumns {
        title: title.ok_or_else(|| anyhow!("Sheet header has no title column"))?,
        apply: apply.ok_or_else(|| anyhow!("Sheet header has no apply link column"))?,
        company,
        location,
        salary,
        description,
        job_type,
        posted,
    })
}

// --- Row mapping ---

fn cell<'a>(row: &'a [String], idx: usize) -> Option<&'a str> {
    row.get(idx).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn opt_cell<'a>(row: &'a [String], idx: Option<usize>) -> Option<&'a str> {
    idx.and_then(|i| cell(row, i))
}

/// Stable per-row key: the apply link reduced to lowercase alphanumerics.
fn sanitize_row_key(apply_url: &str) -> String {
    apply_url
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .take(ROW_KEY_MAX_CHARS)
        .collect()
}

fn sheet_row_to_listing(
    columns: &SheetColumns,
    row: &[String],
    config: &SearchConfig,
    now: DateTime<Utc>,
) -> Option<NormalizedListing> {
    let title = cell(row, columns.title)?;
    let apply_url = cell(row, columns.apply)?;

    let company = opt_cell(row, columns.company).unwrap_or(DEFAULT_COMPANY);
    let source = if company_is_public_sector(company) {
        SOURCE_GOVERNMENT
    } else {
        SOURCE_CURATED
    };

    let posted_date = resolve_posted_date(opt_cell(row, columns.posted), now);
    let created_at = if config.created_at_mirrors_posted {
        posted_date.clone()
    } else {
        now.format(DATE_FORMAT).to_string()
    };

    Some(NormalizedListing {
        job_id: format!("{}{}", SHEET_ID_PREFIX, sanitize_row_key(apply_url)),
        title: title.to_string(),
        company_name: company.to_string(),
        location: opt_cell(row, columns.location)
            .unwrap_or(DEFAULT_LOCATION)
            .to_string(),
        salary: opt_cell(row, columns.salary)
            .unwrap_or(SALARY_NOT_SPECIFIED)
            .to_string(),
        posted_date,
        apply_url: apply_url.to_string(),
        source: source.to_string(),
        employment_type: classify_employment(opt_cell(row, columns.job_type)).to_string(),
        discription: clean_description(opt_cell(row, columns.description), company),
        industry: INDUSTRY.to_string(),
        created_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 30, 0).unwrap()
    }

    const SHEET_HEADER: &str =
        "Job Title,Company,Location,Salary,Job Type,Posted Date,Apply Link,Description";

    #[test]
    fn test_parse_csv_simple_rows() {
        let rows = parse_csv("a,b,c\n1,2,3\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], vec!["a", "b", "c"]);
        assert_eq!(rows[1], vec!["1", "2", "3"]);
    }

    #[test]
    fn test_parse_csv_quoted_fields() {
        let rows = parse_csv("\"Architect, Senior\",\"says \"\"hi\"\"\",plain\r\nnext,row,here\n");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Architect, Senior");
        assert_eq!(rows[0][1], "says \"hi\"");
        assert_eq!(rows[0][2], "plain");
    }

    #[test]
    fn test_parse_csv_quoted_newline() {
        let rows = parse_csv("\"line one\nline two\",b\n");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "line one\nline two");
    }

    #[test]
    fn test_parse_csv_no_trailing_newline() {
        let rows = parse_csv("a,b\n1,2");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["1", "2"]);
    }

    #[test]
    fn test_map_columns_is_case_insensitive() {
        let header: Vec<String> = SHEET_HEADER.split(',').map(|s| s.to_string()).collect();
        let columns = map_columns(&header).unwrap();
        assert_eq!(columns.title, 0);
        assert_eq!(columns.company, Some(1));
        assert_eq!(columns.apply, 6);
        assert_eq!(columns.description, Some(7));
    }

    #[test]
    fn test_map_columns_requires_title_and_apply() {
        let header: Vec<String> = ["Company", "Location"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(map_columns(&header).is_err());
    }

    #[test]
    fn test_parse_sheet_maps_rows_into_curated_listings() {
        let csv = format!(
            "{}\n{}\n{}\n",
            SHEET_HEADER,
            "Junior Architect,Studio A,Mumbai,\"₹25,000\",,2025-06-01,https://forms.gle/abc123,A studio role working on residential projects across Mumbai.",
            "Site Architect,CPWD,Delhi,,Internship,2025-06-02,https://forms.gle/def456,Field posting with the public works department in Delhi NCR."
        );

        let listings = parse_sheet(&csv, &SearchConfig::default(), fixed_now()).unwrap();
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.job_id, "sheet-httpsformsgleabc123");
        assert_eq!(first.source, "Curated");
        assert_eq!(first.employment_type, "Full-time");
        assert_eq!(first.salary, "₹25,000");
        assert_eq!(first.posted_date, "2025-06-01T00:00:00Z");
        assert_eq!(first.industry, "Architecture");

        let second = &listings[1];
        assert_eq!(second.source, "Government");
        assert_eq!(second.employment_type, "Internship");
    }

    #[test]
    fn test_parse_sheet_skips_rows_without_apply_link() {
        let csv = format!(
            "{}\n{}\n",
            SHEET_HEADER, "Junior Architect,Studio A,Mumbai,,,2025-06-01,,No link for this one."
        );
        let listings = parse_sheet(&csv, &SearchConfig::default(), fixed_now()).unwrap();
        assert!(listings.is_empty());
    }

    #[test]
    fn test_parse_sheet_dedupes_repeated_apply_links() {
        let row = "Junior Architect,Studio A,Mumbai,,,2025-06-01,https://forms.gle/abc123,Duplicate submission of the same listing row.";
        let csv = format!("{}\n{}\n{}\n", SHEET_HEADER, row, row);
        let listings = parse_sheet(&csv, &SearchConfig::default(), fixed_now()).unwrap();
        assert_eq!(listings.len(), 1);
    }

    #[test]
    fn test_parse_sheet_missing_header_is_an_error() {
        assert!(parse_sheet("", &SearchConfig::default(), fixed_now()).is_err());
    }

    #[test]
    fn test_sheet_row_short_description_falls_back_to_template() {
        let csv = format!(
            "{}\n{}\n",
            SHEET_HEADER,
            "Junior Architect,Studio A,Mumbai,,,2025-06-01,https://forms.gle/abc123,Short."
        );
        let listings = parse_sheet(&csv, &SearchConfig::default(), fixed_now()).unwrap();
        assert!(listings[0].discription.contains("Studio A"));
    }
}
