use crate::brief::{Entry, format_hours, round3};
use chrono::NaiveDate;
use thiserror::Error;

/// Field layout of an aggregate report line. The last field always holds the
/// comma-quoted description/hours pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineLayout {
    /// `date|hours|category|activity|activity_id|tags|pairs`
    #[default]
    Brief,
    /// `date|hours|category|activity|activity_id|fact_ids|tags|pairs`
    BriefWithFacts,
}

impl LineLayout {
    pub fn field_count(self) -> usize {
        match self {
            Self::Brief => 7,
            Self::BriefWithFacts => 8,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum LineError {
    #[error("invalid line: expected {expected} fields, found {found}: {line}")]
    FieldCount {
        expected: usize,
        found: usize,
        line: String,
    },
    #[error("invalid line: odd number of description/hours fields ({count}): {line}")]
    OddPairs { count: usize, line: String },
    #[error("invalid line: {field} is not a non-negative number ({value}): {line}")]
    BadNumber {
        field: &'static str,
        value: String,
        line: String,
    },
    #[error("invalid line: date is not YYYY-MM-DD ({value}): {line}")]
    BadDate { value: String, line: String },
}

/// The fields of one aggregate line, used when rendering report output.
#[derive(Debug, Clone, PartialEq)]
pub struct BriefLine {
    pub date: NaiveDate,
    pub hours: f64,
    pub category: String,
    pub activity_name: String,
    pub activity_id: String,
    pub fact_ids: Option<String>,
    pub tags: String,
    pub pairs: Vec<(String, f64)>,
}

pub fn parse_line(line: &str, layout: LineLayout) -> Result<Entry, LineError> {
    let expected = layout.field_count();
    let fields = line.splitn(expected, '|').collect::<Vec<_>>();

    if fields.len() != expected {
        return Err(LineError::FieldCount {
            expected,
            found: fields.len(),
            line: line.to_string(),
        });
    }

    let (fact_ids, tags, trailing) = match layout {
        LineLayout::Brief => ("", fields[5], fields[6]),
        LineLayout::BriefWithFacts => (fields[5], fields[6], fields[7]),
    };

    let date = NaiveDate::parse_from_str(fields[0].trim(), "%Y-%m-%d").map_err(|_| {
        LineError::BadDate {
            value: fields[0].to_string(),
            line: line.to_string(),
        }
    })?;
    let hours = parse_hours("duration", fields[1], line)?;
    let pairs = parse_pairs(trailing, line)?;

    let mut entry = Entry::new(
        date,
        hours,
        pairs
            .iter()
            .map(|(text, hours)| format!("{text} [{}]", format_hours(*hours)))
            .collect(),
    );
    entry.category = fields[2].to_string();
    entry.activity_name = fields[3].to_string();
    entry.activity_id = fields[4].to_string();
    entry.fact_ids = fact_ids.to_string();
    entry.tags = tags.to_string();

    Ok(entry)
}

/// Splits the trailing `"desc","hours",...` field into pairs. Descriptions
/// repeated within the field are merged by summing their hours, keeping the
/// order in which each first appeared.
pub fn parse_pairs(trailing: &str, line: &str) -> Result<Vec<(String, f64)>, LineError> {
    let stripped = trailing.trim().trim_matches('"');
    if stripped.is_empty() {
        return Ok(Vec::new());
    }

    let parts = stripped.split("\",\"").collect::<Vec<_>>();
    if parts.len() % 2 != 0 {
        return Err(LineError::OddPairs {
            count: parts.len(),
            line: line.to_string(),
        });
    }

    let mut pairs: Vec<(String, f64)> = Vec::with_capacity(parts.len() / 2);
    for chunk in parts.chunks_exact(2) {
        let hours = parse_hours("description hours", chunk[1], line)?;
        match pairs.iter_mut().find(|(text, _)| text == chunk[0]) {
            Some((_, total)) => *total += hours,
            None => pairs.push((chunk[0].to_string(), hours)),
        }
    }

    Ok(pairs
        .into_iter()
        .map(|(text, hours)| (text, round3(hours)))
        .collect())
}

pub fn render_pairs(pairs: &[(String, f64)]) -> String {
    pairs
        .iter()
        .map(|(text, hours)| format!("\"{}\",\"{hours:.3}\"", text.replace('"', "'")))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn render_line(brief: &BriefLine) -> String {
    let mut fields = vec![
        brief.date.format("%Y-%m-%d").to_string(),
        format!("{:.3}", brief.hours),
        brief.category.clone(),
        brief.activity_name.replace('|', "/"),
        brief.activity_id.clone(),
    ];
    if let Some(fact_ids) = &brief.fact_ids {
        fields.push(fact_ids.clone());
    }
    fields.push(brief.tags.replace('|', "/"));
    fields.push(render_pairs(&brief.pairs));

    fields.join("|")
}

fn parse_hours(field: &'static str, raw: &str, line: &str) -> Result<f64, LineError> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|hours| hours.is_finite() && *hours >= 0.0)
        .ok_or_else(|| LineError::BadNumber {
            field,
            value: raw.to_string(),
            line: line.to_string(),
        })
}
