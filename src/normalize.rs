use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use scraper::Html;

use crate::collect::SearchConfig;
use crate::models::{NormalizedListing, RawListing};

// --- Field defaults and constants ---

pub const DEFAULT_COMPANY: &str = "Not specified";
pub const DEFAULT_LOCATION: &str = "India";
pub const SALARY_NOT_SPECIFIED: &str = "Not specified";
pub const DEFAULT_CURRENCY: &str = "₹";
pub const INDUSTRY: &str = "Architecture";

pub const EMPLOYMENT_INTERNSHIP: &str = "Internship";
pub const EMPLOYMENT_FULL_TIME: &str = "Full-time";

pub const SOURCE_GOVERNMENT: &str = "Government";
pub const SOURCE_CURATED: &str = "Curated";

pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

const MAX_DESCRIPTION_CHARS: usize = 1000;
const MIN_DESCRIPTION_CHARS: usize = 40;

/// Any of these in the raw employment text classifies the role as an
/// internship; everything else is treated as full-time.
pub const INTERN_TYPE_KEYWORDS: &[&str] =
    &["part-time", "internship", "contract", "temporary", "volunteer"];

/// Employer-name phrases that mark a listing as public-sector regardless of
/// which site it came from.
pub const PUBLIC_SECTOR_PHRASES: &[&str] = &[
    "government",
    "govt",
    "ministry",
    "municipal",
    "nagar nigam",
    "development authority",
    "public works",
    "town planning",
];

/// Public-works acronyms, matched as whole words only so that e.g.
/// "Haddad Architects" does not trip the "dda" check.
pub const PUBLIC_SECTOR_ACRONYMS: &[&str] =
    &["pwd", "cpwd", "nbcc", "dda", "hudco", "cidco", "dmrc", "nhai", "isro"];

/// A title must contain at least one of these to be kept.
pub const RELEVANT_TITLE_KEYWORDS: &[&str] = &[
    "architect",
    "architecture",
    "architectural",
    "interior design",
    "urban",
    "landscape",
    "draft",
    "draughtsman",
    "autocad",
    "revit",
    "bim",
    "planner",
    "planning",
    "sketchup",
    "visualizer",
    "visualiser",
];

/// Software/IT terms that disqualify a title outright. Job boards return
/// plenty of "Solution Architect" style roles for architecture queries.
pub const EXCLUDED_TITLE_KEYWORDS: &[&str] = &[
    "software",
    "developer",
    "python",
    "java",
    "javascript",
    "devops",
    "cloud",
    "frontend",
    "backend",
    "full stack",
    "fullstack",
    "data engineer",
    "sql",
    "qa engineer",
    "it support",
];

// --- Deduplication ---

/// Drops records whose id was already seen; first occurrence wins. Returns
/// the kept records and the number dropped.
pub fn dedup_by_id(raw: Vec<RawListing>) -> (Vec<RawListing>, usize) {
    let total = raw.len();
    let mut seen: HashSet<String> = HashSet::new();
    let unique: Vec<RawListing> = raw
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();
    let dropped = total - unique.len();
    (unique, dropped)
}

// --- Title relevance filter ---

pub fn is_relevant_title(title: &str) -> bool {
    let lower = title.to_lowercase();
    if EXCLUDED_TITLE_KEYWORDS.iter().any(|k| lower.contains(k)) {
        return false;
    }
    RELEVANT_TITLE_KEYWORDS.iter().any(|k| lower.contains(k))
}

// --- Employment type ---

pub fn classify_employment(job_type: Option<&str>) -> &'static str {
    match job_type {
        Some(text) => {
            let lower = text.to_lowercase();
            if INTERN_TYPE_KEYWORDS.iter().any(|k| lower.contains(k)) {
                EMPLOYMENT_INTERNSHIP
            } else {
                EMPLOYMENT_FULL_TIME
            }
        }
        None => EMPLOYMENT_FULL_TIME,
    }
}

// --- Salary ---

/// Structured amounts win; otherwise scan the description with the pattern
/// table; otherwise "Not specified".
pub fn resolve_salary(raw: &RawListing) -> String {
    if let Some(min) = raw.min_amount {
        let currency = raw.currency.as_deref().unwrap_or(DEFAULT_CURRENCY);
        let mut display = with_currency(currency, &format_amount(min));
        if let Some(max) = raw.max_amount {
            display.push_str(&format!(" - {}", format_amount(max)));
        }
        return display;
    }
    if let Some(description) = &raw.description {
        if let Some(found) = extract_salary_text(description) {
            return found;
        }
    }
    SALARY_NOT_SPECIFIED.to_string()
}

/// Prefixes `value` with `currency`, stripping any marker already present
/// so "₹50,000" never becomes "₹₹50,000".
pub fn with_currency(currency: &str, value: &str) -> String {
    if currency.is_empty() {
        return value.trim().to_string();
    }
    let mut rest = value.trim();
    while let Some(stripped) = rest.strip_prefix(currency) {
        rest = stripped.trim_start();
    }
    format!("{}{}", currency, rest)
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Ordered pattern table for salaries buried in free text; the first
/// pattern with a hit anywhere in the description wins.
fn extract_salary_text(description: &str) -> Option<String> {
    let patterns = [
        // ₹25,000 or ₹25,000 - ₹35,000
        r"[₹$€£]\s?\d[\d,]*(?:\s?-\s?[₹$€£]?\s?\d[\d,]*)?",
        // 4.5 LPA, 3 - 5 LPA
        r"(?i)\d+(?:\.\d+)?\s?(?:-\s?\d+(?:\.\d+)?\s?)?LPA",
        // 15k - 20k
        r"(?i)\d+\s?k\s?-\s?\d+\s?k",
        // Salary: 28,000
        r"(?i)salary\s*:?\s*([\d,]+)",
    ];

    for pattern in patterns {
        let Ok(re) = Regex::new(pattern) else {
            continue;
        };
        if let Some(caps) = re.captures(description) {
            let matched = caps.get(1).or_else(|| caps.get(0));
            if let Some(m) = matched {
                return Some(m.as_str().trim().to_string());
            }
        }
    }
    None
}

// --- Description ---

pub fn clean_description(description: Option<&str>, company: &str) -> String {
    let cleaned = description.map(flatten_markup).unwrap_or_default();
    if cleaned.is_empty()
        || cleaned.eq_ignore_ascii_case("none")
        || cleaned.chars().count() < MIN_DESCRIPTION_CHARS
    {
        return fallback_description(company);
    }
    truncate_chars(&cleaned, MAX_DESCRIPTION_CHARS)
}

fn fallback_description(company: &str) -> String {
    format!(
        "Exciting opportunity at {}. Open the apply link for the complete job description.",
        company
    )
}

/// Strips HTML tags and markdown emphasis, collapsing all whitespace runs
/// to single spaces.
fn flatten_markup(text: &str) -> String {
    let fragment = Html::parse_fragment(text);
    let flat = fragment
        .root_element()
        .text()
        .collect::<Vec<_>>()
        .join(" ");
    let no_emphasis: String = flat
        .chars()
        .filter(|c| !matches!(c, '*' | '_' | '#' | '`'))
        .collect();
    no_emphasis.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        text.chars().take(max).collect()
    }
}

// --- Dates ---

/// Resolves the source posting date to a `%Y-%m-%dT%H:%M:%SZ` string.
/// Absent, unparseable, and future-dated values all clamp to `now`.
pub fn resolve_posted_date(date_posted: Option<&str>, now: DateTime<Utc>) -> String {
    let resolved = match date_posted.and_then(parse_source_date) {
        Some(parsed) if parsed <= now => parsed,
        _ => now,
    };
    resolved.format(DATE_FORMAT).to_string()
}

fn parse_source_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    if let Ok(nd) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return nd
            .and_hms_opt(0, 0, 0)
            .map(|ndt| Utc.from_utc_datetime(&ndt));
    }
    None
}

// --- Source label ---

pub fn company_is_public_sector(company: &str) -> bool {
    let lower = company.to_lowercase();
    if PUBLIC_SECTOR_PHRASES.iter().any(|k| lower.contains(k)) {
        return true;
    }
    lower
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| PUBLIC_SECTOR_ACRONYMS.contains(&word))
}

/// Public-sector employers override the per-site label no matter which
/// board the record came from.
pub fn resolve_source_label(company: Option<&str>, site: &str) -> String {
    if let Some(name) = company {
        if company_is_public_sector(name) {
            return SOURCE_GOVERNMENT.to_string();
        }
    }
    capitalize(site)
}

fn capitalize(text: &str) -> String {
    let lower = text.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

// --- Full mapping ---

/// Maps one raw record into the sink schema. Returns `None` for records
/// the relevance filter rejects and for records missing the identifier or
/// apply URL (both are required for a valid row).
pub fn normalize(
    raw: &RawListing,
    config: &SearchConfig,
    now: DateTime<Utc>,
) -> Option<NormalizedListing> {
    if raw.id.is_empty() {
        return None;
    }
    let apply_url = raw.job_url.clone()?;
    if !is_relevant_title(&raw.title) {
        return None;
    }

    let company_name = raw
        .company
        .clone()
        .unwrap_or_else(|| DEFAULT_COMPANY.to_string());
    let posted_date = resolve_posted_date(raw.date_posted.as_deref(), now);
    let created_at = if config.created_at_mirrors_posted {
        posted_date.clone()
    } else {
        now.format(DATE_FORMAT).to_string()
    };

    Some(NormalizedListing {
        job_id: raw.id.clone(),
        title: raw.title.clone(),
        company_name: company_name.clone(),
        location: raw
            .location
            .clone()
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string()),
        salary: resolve_salary(raw),
        posted_date,
        apply_url,
        source: resolve_source_label(raw.company.as_deref(), &raw.site),
        employment_type: classify_employment(raw.job_type.as_deref()).to_string(),
        discription: clean_description(raw.description.as_deref(), &company_name),
        industry: INDUSTRY.to_string(),
        created_at,
    })
}
