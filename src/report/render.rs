use crate::brief::line::{BriefLine, render_line};
use crate::brief::round3;
use crate::db::FactRow;
use crate::report::catalog::{Grouping, ReportKind, WeekScheme};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Weekday};
use std::collections::BTreeMap;

const CATEGORY_WIDTH: usize = 12;
const MISC_DESCRIPTION: &str = "Misc.";

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub week_starts: u32,
    pub first_sprint_week_num: i64,
    pub split_days: bool,
    pub with_fact_ids: bool,
    pub now: NaiveDateTime,
}

struct Timed<'a> {
    fact: &'a FactRow,
    day: NaiveDate,
    hours: f64,
}

/// Renders one report as text lines, title and header included.
pub fn render_report(kind: ReportKind, facts: &[FactRow], options: &RenderOptions) -> Vec<String> {
    let timed = facts
        .iter()
        .map(|fact| Timed {
            fact,
            day: fact.start_time.date(),
            hours: fact.duration_hours(options.now),
        })
        .collect::<Vec<_>>();

    let mut lines = kind
        .title()
        .map(|title| vec![String::new(), title, "=".repeat(63)])
        .unwrap_or_default();

    let body = match kind {
        ReportKind::All => all_facts(&timed),
        ReportKind::Daily(grouping) => {
            let rows = daily(&timed, grouping);
            if grouping == Grouping::Activity && options.split_days {
                split_by_day(rows)
            } else {
                rows
            }
        }
        ReportKind::Weekly(scheme, grouping) => weekly(&timed, Some(scheme), grouping, options),
        ReportKind::Gross(grouping) => weekly(&timed, None, grouping, options),
        ReportKind::Aggregate => {
            let rows = aggregate(&timed, options.with_fact_ids);
            if options.split_days {
                split_by_day(rows)
            } else {
                rows
            }
        }
    };

    lines.extend(body);
    lines
}

fn all_facts(timed: &[Timed<'_>]) -> Vec<String> {
    timed
        .iter()
        .map(|item| {
            let end = item
                .fact
                .end_time
                .map(|end| end.format("%H:%M").to_string())
                .unwrap_or_default();
            format!(
                "{}|{}|{}|{end}|{}|{}|{}",
                weekday_abbrev(item.day),
                item.day,
                item.fact.start_time.format("%H:%M"),
                duration(item.hours),
                item.fact.activity_name,
                item.fact.description.as_deref().unwrap_or_default()
            )
        })
        .collect()
}

#[derive(Default)]
struct Bucket {
    first_start: Option<NaiveDateTime>,
    hours: f64,
    category: String,
    activity_name: String,
    tags: Vec<String>,
}

impl Bucket {
    fn add(&mut self, item: &Timed<'_>) {
        if self.first_start.is_none_or(|start| item.fact.start_time < start) {
            self.first_start = Some(item.fact.start_time);
        }
        self.hours += item.hours;
        if self.category.is_empty() {
            self.category = item.fact.category.clone();
            self.activity_name = item.fact.activity_name.clone();
        }
        for tag in item.fact.tag_names.split(',').filter(|tag| !tag.is_empty()) {
            if !self.tags.iter().any(|known| known == tag) {
                self.tags.push(tag.to_string());
            }
        }
    }

    fn tag_names(&self) -> String {
        self.tags.join(",")
    }
}

fn daily(timed: &[Timed<'_>], grouping: Grouping) -> Vec<String> {
    let buckets = timed.iter().fold(BTreeMap::new(), |mut acc, item| {
        let key = match grouping {
            Grouping::Activity => (item.day, item.fact.activity_id.to_string()),
            Grouping::Category => (item.day, item.fact.category.clone()),
            Grouping::Totals => (item.day, String::new()),
        };
        acc.entry(key).or_insert_with(Bucket::default).add(item);
        acc
    });

    let mut rows = buckets.into_iter().collect::<Vec<_>>();
    rows.sort_by(|(left_key, left), (right_key, right)| {
        left_key
            .0
            .cmp(&right_key.0)
            .then_with(|| left.first_start.cmp(&right.first_start))
            .then_with(|| left.activity_name.cmp(&right.activity_name))
    });

    rows.into_iter()
        .map(|((day, _), bucket)| {
            let prefix = format!("{}|{day}|{}", weekday_abbrev(day), duration(bucket.hours));
            match grouping {
                Grouping::Activity => format!(
                    "{prefix}|{}|{}|{}",
                    fit_category(&bucket.category),
                    bucket.activity_name,
                    bucket.tag_names()
                ),
                Grouping::Category => format!(
                    "{prefix}|{}|{}",
                    fit_category(&bucket.category),
                    bucket.tag_names()
                ),
                Grouping::Totals => prefix,
            }
        })
        .collect()
}

/// Weekly rollups when `scheme` is given, otherwise one gross total per group
/// over the whole span.
fn weekly(
    timed: &[Timed<'_>],
    scheme: Option<WeekScheme>,
    grouping: Grouping,
    options: &RenderOptions,
) -> Vec<String> {
    let buckets = timed.iter().fold(BTreeMap::new(), |mut acc, item| {
        let week = scheme.map(|scheme| week_number(item.day, scheme, options));
        let (category, activity, tags) = match grouping {
            Grouping::Activity => (
                item.fact.category.clone(),
                item.fact.activity_name.clone(),
                item.fact.tag_names.clone(),
            ),
            Grouping::Category => (item.fact.category.clone(), String::new(), String::new()),
            Grouping::Totals => (String::new(), String::new(), String::new()),
        };
        acc.entry((week, category, activity, tags))
            .or_insert_with(Bucket::default)
            .add(item);
        acc
    });

    let mut header = vec!["wkd", "start_date"];
    let mut dashes = vec!["---", "----------"];
    if scheme.is_some() {
        header.push("w");
        dashes.push("-");
    }
    header.push("duration");
    dashes.push("--------");
    if grouping != Grouping::Totals {
        header.push("category_nom");
        dashes.push("------------");
    }
    if grouping == Grouping::Activity {
        header.extend(["activity_name", "tag_names"]);
        dashes.extend(["-------------", "---------"]);
    }

    let mut rows = buckets
        .into_iter()
        .map(|((week, category, activity, tags), bucket)| {
            let first_day = bucket
                .first_start
                .map(|start| start.date())
                .unwrap_or_default();
            let start_date = match scheme {
                Some(scheme) => week_start(first_day, scheme, options.week_starts),
                None => first_day,
            };
            (start_date, week, category, activity, tags, bucket.hours)
        })
        .collect::<Vec<_>>();
    rows.sort_by(|left, right| {
        (left.0, &left.2, &left.3).cmp(&(right.0, &right.2, &right.3))
    });

    let body = rows.into_iter().map(|(start_date, week, category, activity, tags, hours)| {
        let mut fields = vec![weekday_abbrev(start_date).to_string(), start_date.to_string()];
        if let Some(week) = week {
            fields.push(week.to_string());
        }
        fields.push(duration(hours));
        if grouping != Grouping::Totals {
            fields.push(fit_category(&category));
        }
        if grouping == Grouping::Activity {
            fields.push(activity);
            fields.push(tags);
        }
        fields.join("|")
    });

    [header.join("|"), dashes.join("|")]
        .into_iter()
        .chain(body)
        .collect()
}

/// Daily activity+tag rollup with description/hours pairs, one
/// `brief::line` formatted line per group.
fn aggregate(timed: &[Timed<'_>], with_fact_ids: bool) -> Vec<String> {
    let groups = timed.iter().fold(
        BTreeMap::<(NaiveDate, i64, String), Vec<&Timed<'_>>>::new(),
        |mut acc, item| {
            acc.entry((item.day, item.fact.activity_id, item.fact.tag_names.clone()))
                .or_default()
                .push(item);
            acc
        },
    );

    groups
        .into_iter()
        .map(|((day, activity_id, tags), items)| {
            let first = items[0].fact;
            let line = BriefLine {
                date: day,
                hours: round3(items.iter().map(|item| item.hours).sum()),
                category: first.category.clone(),
                activity_name: first.activity_name.clone(),
                activity_id: activity_id.to_string(),
                fact_ids: with_fact_ids.then(|| {
                    items
                        .iter()
                        .map(|item| item.fact.id.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                }),
                tags,
                pairs: items
                    .iter()
                    .map(|item| {
                        let text = item
                            .fact
                            .description
                            .as_deref()
                            .filter(|text| !text.trim().is_empty())
                            .unwrap_or(MISC_DESCRIPTION);
                        (text.to_string(), round3(item.hours))
                    })
                    .collect(),
            };
            render_line(&line)
        })
        .collect()
}

/// Inserts a blank line wherever the day column (the first field that looks
/// like a date) changes.
fn split_by_day(rows: Vec<String>) -> Vec<String> {
    let mut out = Vec::with_capacity(rows.len());
    let mut last_day: Option<String> = None;

    for row in rows {
        let day = row
            .split('|')
            .find(|field| NaiveDate::parse_from_str(field, "%Y-%m-%d").is_ok())
            .map(ToOwned::to_owned);
        if last_day.is_some() && day != last_day {
            out.push(String::new());
        }
        last_day = day;
        out.push(row);
    }

    out
}

/// Week number of `day`, shifted by the configured first sprint week.
pub fn week_number(day: NaiveDate, scheme: WeekScheme, options: &RenderOptions) -> i64 {
    let day_of_year0 = i64::from(day.ordinal0());
    let raw = match scheme {
        WeekScheme::SatSun => {
            let jan1 = NaiveDate::from_ymd_opt(day.year(), 1, 1).unwrap_or(day);
            (day_of_year0 + i64::from(jan1.weekday().num_days_from_sunday())) / 7
        }
        WeekScheme::Sprint => {
            let offset = week_offset(day, options.week_starts);
            (day_of_year0 - offset + 7) / 7
        }
    };
    raw - options.first_sprint_week_num
}

fn week_offset(day: NaiveDate, week_starts: u32) -> i64 {
    (i64::from(day.weekday().num_days_from_sunday()) - i64::from(week_starts)).rem_euclid(7)
}

fn week_start(day: NaiveDate, scheme: WeekScheme, week_starts: u32) -> NaiveDate {
    let offset = match scheme {
        WeekScheme::SatSun => i64::from(day.weekday().num_days_from_sunday()),
        WeekScheme::Sprint => week_offset(day, week_starts),
    };
    day - Duration::days(offset)
}

fn weekday_abbrev(day: NaiveDate) -> &'static str {
    match day.weekday() {
        Weekday::Sun => "sun",
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
    }
}

fn duration(hours: f64) -> String {
    format!("{hours:>8.3}")
}

/// Right-aligns to 12 columns, keeping the tail of longer names.
fn fit_category(category: &str) -> String {
    let chars = category.chars().collect::<Vec<_>>();
    let tail = chars[chars.len().saturating_sub(CATEGORY_WIDTH)..]
        .iter()
        .collect::<String>();
    format!("{tail:>CATEGORY_WIDTH$}")
}
