use crate::brief::{Entry, RawEntry, round3};
use crate::error::EntryError;
use chrono::NaiveDate;
use serde_json::Value;

pub const RESERVED_FIELDS: [&str; 6] = [
    "project_key",
    "project_id",
    "issue_key",
    "issue_id",
    "issue_resolution",
    "payload",
];

#[derive(Debug)]
pub struct Normalized {
    pub entry: Entry,
    /// Reserved field names found on the raw entry and dropped.
    pub ignored: Vec<&'static str>,
}

/// Turns a decoded batch element into an `Entry`. Optional text fields default
/// to empty; date, hours and descriptions are required. Resolved fields left
/// over from an earlier run are dropped and reported back in `ignored`.
pub fn normalize(raw: RawEntry) -> Result<Normalized, EntryError> {
    let ignored = RESERVED_FIELDS
        .into_iter()
        .zip([
            &raw.project_key,
            &raw.project_id,
            &raw.issue_key,
            &raw.issue_id,
            &raw.issue_resolution,
            &raw.payload,
        ])
        .filter(|(_, value)| value.is_some())
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

    let date_raw = raw
        .year_month_day
        .filter(|value| !value.trim().is_empty())
        .ok_or(EntryError::MissingField {
            field: "year_month_day",
        })?;
    let date = NaiveDate::parse_from_str(date_raw.trim(), "%Y-%m-%d").map_err(|_| {
        EntryError::InvalidField {
            field: "year_month_day",
            value: date_raw.clone(),
        }
    })?;

    let hours = parse_time_spent(raw.time_spent)?;

    let descriptions = raw
        .desctimes
        .filter(|items| items.iter().any(|item| !item.trim().is_empty()))
        .ok_or(EntryError::MissingField { field: "desctimes" })?;

    let mut entry = Entry::new(date, hours, descriptions);
    entry.activity_name = raw.activity_name.unwrap_or_default();
    entry.tags = raw.tags.unwrap_or_default();
    entry.fact_ids = raw.fact_ids.unwrap_or_default();
    entry.category = raw.category.unwrap_or_default();
    entry.activity_id = raw.activity_id.map(value_to_text).unwrap_or_default();

    Ok(Normalized { entry, ignored })
}

fn parse_time_spent(value: Option<Value>) -> Result<f64, EntryError> {
    let value = value.ok_or(EntryError::MissingField {
        field: "time_spent",
    })?;

    let hours = match &value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) if text.trim().is_empty() => {
            return Err(EntryError::MissingField {
                field: "time_spent",
            });
        }
        Value::String(text) => text.trim().parse::<f64>().ok(),
        Value::Null => {
            return Err(EntryError::MissingField {
                field: "time_spent",
            });
        }
        _ => None,
    };

    match hours {
        Some(hours) if hours.is_finite() && hours > 0.0 => Ok(round3(hours)),
        Some(hours) if hours == 0.0 => Err(EntryError::MissingField {
            field: "time_spent",
        }),
        _ => Err(EntryError::InvalidField {
            field: "time_spent",
            value: value_to_text(value),
        }),
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::normalize;
    use crate::brief::RawEntry;
    use crate::error::EntryError;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawEntry {
        serde_json::from_value(value).expect("raw entry")
    }

    #[test]
    fn fills_defaults_for_optional_fields() {
        let normalized = normalize(raw(json!({
            "year_month_day": "2017-08-01",
            "time_spent": 1.5,
            "desctimes": ["Did work [1.5]"],
            "activity_id": 42
        })))
        .expect("normalized");

        assert_eq!(normalized.entry.activity_name, "");
        assert_eq!(normalized.entry.tags, "");
        assert_eq!(normalized.entry.fact_ids, "");
        assert_eq!(normalized.entry.activity_id, "42");
        assert!(normalized.ignored.is_empty());
    }

    #[test]
    fn accepts_time_spent_as_text() {
        let normalized = normalize(raw(json!({
            "year_month_day": "2017-08-01",
            "time_spent": "0.25",
            "desctimes": ["x [0.25]"]
        })))
        .expect("normalized");

        assert_eq!(normalized.entry.duration_hours, 0.25);
    }

    #[test]
    fn rejects_missing_required_fields() {
        let missing_date = normalize(raw(json!({"time_spent": 1.0, "desctimes": ["x"]})));
        assert!(matches!(
            missing_date,
            Err(EntryError::MissingField { field: "year_month_day" })
        ));

        let zero_time = normalize(raw(json!({
            "year_month_day": "2017-08-01", "time_spent": 0, "desctimes": ["x"]
        })));
        assert!(matches!(
            zero_time,
            Err(EntryError::MissingField { field: "time_spent" })
        ));

        let no_descriptions = normalize(raw(json!({
            "year_month_day": "2017-08-01", "time_spent": 1.0, "desctimes": []
        })));
        assert!(matches!(
            no_descriptions,
            Err(EntryError::MissingField { field: "desctimes" })
        ));
    }

    #[test]
    fn rejects_malformed_values() {
        let bad_date = normalize(raw(json!({
            "year_month_day": "08/01/2017", "time_spent": 1.0, "desctimes": ["x"]
        })));
        assert!(matches!(
            bad_date,
            Err(EntryError::InvalidField { field: "year_month_day", .. })
        ));

        let negative = normalize(raw(json!({
            "year_month_day": "2017-08-01", "time_spent": -2, "desctimes": ["x"]
        })));
        assert!(matches!(
            negative,
            Err(EntryError::InvalidField { field: "time_spent", .. })
        ));
    }

    #[test]
    fn drops_reserved_fields_and_reports_them() {
        let normalized = normalize(raw(json!({
            "year_month_day": "2017-08-01",
            "time_spent": 1.0,
            "desctimes": ["x [1.0]"],
            "issue_key": "ABC-1",
            "payload": {"comment": "old"}
        })))
        .expect("normalized");

        assert_eq!(normalized.ignored, vec!["issue_key", "payload"]);
        assert!(normalized.entry.issue_key.is_none());
        assert!(normalized.entry.payload.is_none());
    }
}
