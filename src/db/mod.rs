pub mod queries;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDateTime};
use queries::FactFilter;
use rusqlite::{Connection, OpenFlags, Row, params_from_iter};
use std::path::Path;

#[derive(Debug, Clone, PartialEq)]
pub struct FactRow {
    pub id: i64,
    pub start_time: NaiveDateTime,
    pub end_time: Option<NaiveDateTime>,
    pub category: String,
    pub activity_name: String,
    pub activity_id: i64,
    pub tag_names: String,
    pub description: Option<String>,
}

impl FactRow {
    /// Hours between start and end; a fact still running counts up to `now`.
    pub fn duration_hours(&self, now: NaiveDateTime) -> f64 {
        let end = self.end_time.unwrap_or(now);
        let seconds = (end - self.start_time).num_seconds().max(0);
        seconds as f64 / 3600.0
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            category: row.get(3)?,
            activity_name: row.get(4)?,
            activity_id: row.get(5)?,
            tag_names: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
            description: row.get(7)?,
        })
    }
}

/// Read-only handle on a Hamster time tracker database.
pub struct HamsterDb {
    conn: Connection,
}

impl HamsterDb {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!("Hamster database not found: {}", path.display());
        }

        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .with_context(|| format!("Failed to open Hamster DB: {}", path.display()))?;

        Ok(Self { conn })
    }

    /// Hamster keeps at most one fact running; more than one open fact
    /// means the data needs fixing before any report adds up.
    pub fn check_integrity(&self) -> Result<()> {
        let open: i64 = self
            .conn
            .query_row(queries::COUNT_OPEN_FACTS, [], |row| row.get(0))
            .context("Failed to count open facts")?;

        if open <= 1 {
            return Ok(());
        }

        let listing = self
            .open_facts()?
            .iter()
            .map(|fact| format!("  #{} {} {}", fact.id, fact.start_time, fact.activity_name))
            .collect::<Vec<_>>()
            .join("\n");
        bail!("DATA ERROR: {open} facts have no end time; fix them to continue:\n{listing}")
    }

    pub fn open_facts(&self) -> Result<Vec<FactRow>> {
        let mut statement = self.conn.prepare(&queries::open_facts_query())?;

        let rows = statement
            .query_map([], FactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query open facts")?;

        Ok(rows)
    }

    /// Facts matching `filter`, ordered by start time. Overlapping rows that
    /// share a start time keep only the newest fact.
    pub fn facts(&self, filter: &FactFilter) -> Result<Vec<FactRow>> {
        let (sql, params) = queries::fact_query(filter);
        let mut statement = self.conn.prepare(&sql)?;

        let rows = statement
            .query_map(params_from_iter(params), FactRow::from_row)?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to query facts")?;

        Ok(rows.into_iter().fold(Vec::new(), |mut kept: Vec<FactRow>, row| {
            if kept.last().is_none_or(|last| last.start_time != row.start_time) {
                kept.push(row);
            }
            kept
        }))
    }
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

#[cfg(test)]
mod tests {
    use super::HamsterDb;
    use super::queries::{FactFilter, HAMSTER_SCHEMA};
    use chrono::NaiveDate;
    use rusqlite::Connection;
    use std::path::Path;

    fn seed(path: &Path, extra: &str) {
        let conn = Connection::open(path).expect("create db");
        conn.execute_batch(HAMSTER_SCHEMA).expect("schema");
        conn.execute_batch(
            r#"
            INSERT INTO categories VALUES (1, 'Work', 'work'), (2, 'Personal', 'personal');
            INSERT INTO activities VALUES (10, 'ABC-123 implement thing', 1, 'abc-123 implement thing');
            INSERT INTO activities VALUES (11, 'Lunch', 2, 'lunch');
            INSERT INTO tags VALUES (100, 'billable'), (101, 'client');
            INSERT INTO facts VALUES (1, 10, '2017-08-01 09:00:00', '2017-08-01 10:30:00', 'Did work');
            INSERT INTO facts VALUES (2, 11, '2017-08-01 12:00:00', '2017-08-01 12:30:00', NULL);
            INSERT INTO facts VALUES (3, 10, '2017-08-02 09:00:00', '2017-08-02 09:15:00', 'Review');
            INSERT INTO facts VALUES (4, 10, '2017-08-02 09:00:00', '2017-08-02 10:00:00', 'Review again');
            INSERT INTO fact_tags VALUES (1, 100), (1, 101), (4, 100);
            "#,
        )
        .expect("rows");
        conn.execute_batch(extra).expect("extra rows");
    }

    #[test]
    fn reads_facts_with_tags_and_keeps_newest_duplicate() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hamster.db");
        seed(&path, "");

        let db = HamsterDb::open(&path).expect("open");
        db.check_integrity().expect("integrity");
        let facts = db.facts(&FactFilter::default()).expect("facts");

        assert_eq!(facts.iter().map(|fact| fact.id).collect::<Vec<_>>(), vec![1, 2, 4]);
        assert_eq!(facts[0].tag_names, "billable,client");
        assert_eq!(facts[0].category, "work");
        assert_eq!(facts[1].description, None);
        assert_eq!(facts[0].duration_hours(facts[0].start_time), 1.5);
    }

    #[test]
    fn filters_by_category_tag_and_dates() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hamster.db");
        seed(&path, "");
        let db = HamsterDb::open(&path).expect("open");

        let by_category = FactFilter {
            categories: vec!["Personal".to_string()],
            ..FactFilter::default()
        };
        let facts = db.facts(&by_category).expect("facts");
        assert_eq!(facts.len(), 1);
        assert_eq!(facts[0].activity_name, "Lunch");

        let by_tag = FactFilter {
            tags: vec!["client".to_string()],
            ..FactFilter::default()
        };
        assert_eq!(db.facts(&by_tag).expect("facts").len(), 1);

        let second_day = FactFilter {
            begin: NaiveDate::from_ymd_opt(2017, 8, 2).and_then(|date| date.and_hms_opt(0, 0, 0)),
            end: NaiveDate::from_ymd_opt(2017, 8, 3).and_then(|date| date.and_hms_opt(0, 0, 0)),
            ..FactFilter::default()
        };
        let facts = db.facts(&second_day).expect("facts");
        assert_eq!(facts.iter().map(|fact| fact.id).collect::<Vec<_>>(), vec![4]);
    }

    #[test]
    fn one_running_fact_is_fine_but_two_are_not() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hamster.db");
        seed(
            &path,
            "INSERT INTO facts VALUES (5, 11, '2017-08-03 12:00:00', NULL, 'running');",
        );
        let db = HamsterDb::open(&path).expect("open");
        db.check_integrity().expect("one open fact");
        drop(db);

        let conn = Connection::open(&path).expect("reopen");
        conn.execute_batch("INSERT INTO facts VALUES (6, 11, '2017-08-04 12:00:00', NULL, 'stuck');")
            .expect("row");
        drop(conn);

        let db = HamsterDb::open(&path).expect("open");
        let error = db.check_integrity().expect_err("two open facts");
        assert!(error.to_string().contains("2 facts have no end time"));
    }

    #[test]
    fn missing_database_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(HamsterDb::open(&dir.path().join("nope.db")).is_err());
    }
}
