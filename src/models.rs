use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A listing as returned by the aggregation source, before any cleaning.
///
/// The source reports missing values inconsistently (JSON null, empty
/// strings, the literal strings "NaN" and "None"). All of that is resolved
/// to `None` here, at the deserialization boundary, so downstream code only
/// ever sees real values or proper absence.
#[derive(Debug, Clone, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, deserialize_with = "text_or_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub location: Option<String>,
    #[serde(default, deserialize_with = "amount_or_none")]
    pub min_amount: Option<f64>,
    #[serde(default, deserialize_with = "amount_or_none")]
    pub max_amount: Option<f64>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub currency: Option<String>,
    /// Compensation interval (yearly/monthly/hourly). Reported by the
    /// source but never rendered in the salary display.
    #[allow(dead_code)]
    #[serde(default, deserialize_with = "text_or_none")]
    pub interval: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub date_posted: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "text_or_none")]
    pub job_type: Option<String>,
    #[serde(default)]
    pub site: String,
    #[serde(default, deserialize_with = "text_or_none")]
    pub job_url: Option<String>,
}

/// The record shape the jobs table expects. Field names match the table
/// columns exactly, including the `discription` spelling the schema uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListing {
    #[serde(rename = "jobId")]
    pub job_id: String,
    pub title: String,
    #[serde(rename = "companyName")]
    pub company_name: String,
    pub location: String,
    pub salary: String,
    #[serde(rename = "postedDate")]
    pub posted_date: String,
    #[serde(rename = "applyUrl")]
    pub apply_url: String,
    pub source: String,
    #[serde(rename = "employmentType")]
    pub employment_type: String,
    pub discription: String,
    pub industry: String,
    pub created_at: String,
}

fn text_or_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty()
                || trimmed.eq_ignore_ascii_case("nan")
                || trimmed.eq_ignore_ascii_case("none")
                || trimmed.eq_ignore_ascii_case("null")
            {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        _ => None,
    })
}

fn amount_or_none<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(s)) => s
            .trim()
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite()),
        _ => None,
    })
}
