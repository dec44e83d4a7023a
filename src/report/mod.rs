pub mod catalog;
pub mod render;
pub mod span;

use crate::db::HamsterDb;
use crate::db::queries::FactFilter;
use anyhow::Result;
use render::{RenderOptions, render_report};
use span::ReportPlan;
use tracing::debug;

/// Runs the integrity check, loads the facts once and renders every planned
/// report in order.
pub fn build_reports(
    db: &HamsterDb,
    filter: &FactFilter,
    plan: &ReportPlan,
    options: &RenderOptions,
) -> Result<Vec<String>> {
    db.check_integrity()?;

    let filter = FactFilter {
        begin: plan.begin,
        end: plan.end,
        ..filter.clone()
    };
    let facts = db.facts(&filter)?;
    debug!(facts = facts.len(), reports = plan.kinds.len(), "rendering reports");

    let mut lines = Vec::new();
    for kind in &plan.kinds {
        let rendered = render_report(*kind, &facts, options);
        debug!(report = %kind, lines = rendered.len(), "rendered report");
        lines.extend(rendered);
    }

    if plan.show_usage_hint {
        lines.extend([
            String::new(),
            "Using default report format. To pick reports, try".to_string(),
            "  hamster-briefs report --help".to_string(),
        ]);
    }

    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::build_reports;
    use super::catalog::ReportKind;
    use super::render::RenderOptions;
    use super::span::ReportPlan;
    use crate::db::HamsterDb;
    use crate::db::queries::{FactFilter, HAMSTER_SCHEMA};
    use chrono::NaiveDate;
    use rusqlite::Connection;

    #[test]
    fn aggregate_report_from_database() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("hamster.db");
        let conn = Connection::open(&path).expect("db");
        conn.execute_batch(HAMSTER_SCHEMA).expect("schema");
        conn.execute_batch(
            r#"
            INSERT INTO categories VALUES (1, 'Work', 'work');
            INSERT INTO activities VALUES (10, 'ABC-123 Implement thing', 1, 'abc-123 implement thing');
            INSERT INTO tags VALUES (100, 'billable');
            INSERT INTO facts VALUES (1, 10, '2017-08-01 09:00:00', '2017-08-01 10:30:00', 'Did work');
            INSERT INTO facts VALUES (2, 10, '2017-08-01 11:00:00', '2017-08-01 11:30:00', 'Review');
            INSERT INTO facts VALUES (3, 10, '2017-08-02 11:00:00', '2017-08-02 11:30:00', 'Later');
            INSERT INTO fact_tags VALUES (1, 100), (2, 100);
            "#,
        )
        .expect("rows");
        drop(conn);

        let db = HamsterDb::open(&path).expect("open");
        let day = |d| NaiveDate::from_ymd_opt(2017, 8, d).and_then(|date| date.and_hms_opt(0, 0, 0));
        let plan = ReportPlan {
            begin: day(1),
            end: day(2),
            kinds: vec![ReportKind::Aggregate],
            split_days: false,
            show_usage_hint: false,
        };
        let options = RenderOptions {
            week_starts: 0,
            first_sprint_week_num: 0,
            split_days: false,
            with_fact_ids: false,
            now: day(9).expect("now"),
        };

        let lines = build_reports(&db, &FactFilter::default(), &plan, &options).expect("report");

        assert_eq!(
            lines,
            vec![
                r#"2017-08-01|2.000|work|ABC-123 Implement thing|10|billable|"Did work","1.500","Review","0.500""#
            ]
        );
    }
}
