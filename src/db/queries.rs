use chrono::NaiveDateTime;
use rusqlite::types::Value;

pub const COUNT_OPEN_FACTS: &str = "SELECT COUNT(*) FROM facts WHERE end_time IS NULL";

const FACT_COLUMNS: &str = r#"
SELECT
  facts.id,
  facts.start_time,
  facts.end_time,
  COALESCE(categories.search_name, ''),
  activities.name,
  facts.activity_id,
  (SELECT group_concat(tags.name)
     FROM fact_tags
     JOIN tags ON (tags.id = fact_tags.tag_id)
    WHERE fact_tags.fact_id = facts.id) AS tag_names,
  facts.description
FROM facts
JOIN activities ON (activities.id = facts.activity_id)
LEFT OUTER JOIN categories ON (categories.id = activities.category_id)
"#;

pub fn open_facts_query() -> String {
    format!("{FACT_COLUMNS} WHERE facts.end_time IS NULL ORDER BY facts.start_time")
}

/// Narrows the facts a report covers. Empty lists mean no restriction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactFilter {
    pub categories: Vec<String>,
    pub activities: Vec<String>,
    pub tags: Vec<String>,
    /// Require both an activity and a tag match instead of either.
    pub match_all: bool,
    pub begin: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

/// Builds the fact query and its positional parameters. Filter values are
/// always bound, never spliced into the statement.
pub fn fact_query(filter: &FactFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut params = Vec::new();

    if !filter.categories.is_empty() {
        clauses.push(format!(
            "categories.search_name IN ({})",
            placeholders(filter.categories.len())
        ));
        params.extend(
            filter
                .categories
                .iter()
                .map(|category| Value::Text(category.to_lowercase())),
        );
    }

    if let Some(begin) = filter.begin {
        clauses.push("facts.start_time >= datetime(?)".to_string());
        params.push(Value::Text(sql_timestamp(begin)));
    }
    if let Some(end) = filter.end {
        clauses.push("facts.start_time < datetime(?)".to_string());
        params.push(Value::Text(sql_timestamp(end)));
    }

    let activity_clause = (!filter.activities.is_empty()).then(|| {
        params.extend(filter.activities.iter().map(|name| like_pattern(name)));
        any_like("activities.name", filter.activities.len())
    });
    let tag_clause = (!filter.tags.is_empty()).then(|| {
        params.extend(filter.tags.iter().map(|name| like_pattern(name)));
        format!(
            "EXISTS (SELECT 1 FROM fact_tags JOIN tags ON (tags.id = fact_tags.tag_id) \
             WHERE fact_tags.fact_id = facts.id AND {})",
            any_like("tags.name", filter.tags.len())
        )
    });

    match (activity_clause, tag_clause) {
        (Some(activities), Some(tags)) => {
            let relation = if filter.match_all { "AND" } else { "OR" };
            clauses.push(format!("({activities} {relation} {tags})"));
        }
        (Some(clause), None) | (None, Some(clause)) => clauses.push(clause),
        (None, None) => {}
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join("\n  AND "))
    };

    (
        format!("{FACT_COLUMNS}{where_clause}\nORDER BY facts.start_time, facts.id DESC"),
        params,
    )
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn any_like(column: &str, count: usize) -> String {
    let alternatives = vec![format!("{column} LIKE ?"); count];
    format!("({})", alternatives.join(" OR "))
}

fn like_pattern(needle: &str) -> Value {
    Value::Text(format!("%{needle}%"))
}

fn sql_timestamp(at: NaiveDateTime) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
pub const HAMSTER_SCHEMA: &str = r#"
CREATE TABLE categories (id INTEGER PRIMARY KEY, name TEXT, search_name TEXT);
CREATE TABLE activities (
  id INTEGER PRIMARY KEY, name TEXT, category_id INTEGER, search_name TEXT
);
CREATE TABLE facts (
  id INTEGER PRIMARY KEY, activity_id INTEGER, start_time TIMESTAMP,
  end_time TIMESTAMP, description TEXT
);
CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT);
CREATE TABLE fact_tags (fact_id INTEGER, tag_id INTEGER);
"#;

#[cfg(test)]
mod tests {
    use super::{FactFilter, fact_query};
    use chrono::NaiveDate;
    use rusqlite::types::Value;

    #[test]
    fn unfiltered_query_has_no_where_clause() {
        let (sql, params) = fact_query(&FactFilter::default());

        assert!(!sql.contains("WHERE facts"));
        assert!(!sql.contains("IN ("));
        assert!(params.is_empty());
    }

    #[test]
    fn filters_are_bound_in_clause_order() {
        let begin = NaiveDate::from_ymd_opt(2017, 8, 1)
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .expect("begin");
        let filter = FactFilter {
            categories: vec!["Work".to_string()],
            activities: vec!["ABC".to_string()],
            tags: vec!["billable".to_string(), "x'); DROP".to_string()],
            match_all: true,
            begin: Some(begin),
            end: None,
        };

        let (sql, params) = fact_query(&filter);

        assert!(sql.contains("categories.search_name IN (?)"));
        assert!(sql.contains("(activities.name LIKE ?) AND EXISTS"));
        assert!(sql.contains("(tags.name LIKE ? OR tags.name LIKE ?)"));
        assert!(!sql.contains("DROP"));
        assert_eq!(
            params,
            vec![
                Value::Text("work".to_string()),
                Value::Text("2017-08-01 00:00:00".to_string()),
                Value::Text("%ABC%".to_string()),
                Value::Text("%billable%".to_string()),
                Value::Text("%x'); DROP%".to_string()),
            ]
        );
    }

    #[test]
    fn activity_and_tag_filters_default_to_either() {
        let filter = FactFilter {
            activities: vec!["ABC".to_string()],
            tags: vec!["billable".to_string()],
            ..FactFilter::default()
        };

        let (sql, _) = fact_query(&filter);
        assert!(sql.contains("(activities.name LIKE ?) OR EXISTS"));
    }
}
