use crate::report::catalog::{ReportKind, ReportSelector, expand_selectors};
use anyhow::{Result, bail};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use clap::ValueEnum;
use tracing::warn;

/// Canned date ranges, each ending today (inclusive) unless noted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SpanPreset {
    Today,
    /// Since the most recent week start.
    ThisWeek,
    /// The whole previous week, ending before this week's start.
    LastWeek,
    /// The previous week and this one.
    LastTwoWeeks,
    ThisMonth,
    /// This month and the previous one.
    LastTwoMonths,
}

impl SpanPreset {
    fn is_weekly(self) -> bool {
        matches!(self, Self::ThisWeek | Self::LastWeek | Self::LastTwoWeeks)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportRequest {
    pub preset: Option<SpanPreset>,
    pub begin: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    /// 0 = Sunday ... 6 = Saturday.
    pub week_starts: u32,
    pub quick_list: bool,
    pub aggregate: bool,
    pub split_days: bool,
    pub selectors: Vec<ReportSelector>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan {
    pub begin: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub kinds: Vec<ReportKind>,
    pub split_days: bool,
    /// Nothing was asked for, so the default report was picked.
    pub show_usage_hint: bool,
}

/// Resolves span presets and default report selections against `today`.
pub fn plan(request: &ReportRequest, today: NaiveDate) -> ReportPlan {
    let mut selectors = request.selectors.clone();
    let mut preset = request.preset;
    let mut split_days = request.split_days;
    let mut begin = request.begin;
    let mut end = request.end;
    let mut show_usage_hint = false;

    let weekday = today.weekday().num_days_from_sunday() as i64;
    let raw_days_ago = weekday - i64::from(request.week_starts);

    if request.quick_list {
        if selectors.is_empty() {
            selectors.push(ReportSelector::ReportActivity);
            split_days = true;
        }
        if preset.is_none() {
            // Early in a new week the previous one is what still needs filing.
            preset = Some(if raw_days_ago <= 1 {
                SpanPreset::LastWeek
            } else {
                SpanPreset::ThisWeek
            });
        }
    }

    if request.aggregate {
        selectors.push(ReportSelector::Egg);
    }

    if let Some(preset) = preset {
        if begin.is_some() || end.is_some() {
            warn!(preset = ?preset, "span preset overrides --begin/--end");
        }
        let days_ago = raw_days_ago.rem_euclid(7);
        let week_start = today - Duration::days(days_ago);
        let tomorrow = today + Duration::days(1);

        let (first_day, last_day_exclusive) = match preset {
            SpanPreset::Today => (today, tomorrow),
            SpanPreset::ThisWeek => (week_start, tomorrow),
            SpanPreset::LastWeek => (week_start - Duration::days(7), week_start),
            SpanPreset::LastTwoWeeks => (week_start - Duration::days(7), tomorrow),
            SpanPreset::ThisMonth => (today.with_day(1).unwrap_or(today), tomorrow),
            SpanPreset::LastTwoMonths => (previous_month_start(today), tomorrow),
        };
        begin = Some(first_day.and_time(NaiveTime::MIN));
        end = Some(last_day_exclusive.and_time(NaiveTime::MIN));

        if preset == SpanPreset::Today && selectors.is_empty() {
            selectors.push(ReportSelector::Daily);
        }
    }

    let mut extra = Vec::new();
    if selectors.is_empty() && preset.is_none() {
        if let (Some(begin), Some(end)) = (begin, end) {
            let span_days = (end - begin).num_days();
            if span_days == 0 {
                selectors.push(ReportSelector::Daily);
            } else if span_days > 7 {
                extra.push(ReportSelector::Gross);
            }
        }
    }

    if selectors.is_empty() {
        let weekly = preset.is_some_and(SpanPreset::is_weekly);
        let default = match (request.week_starts != 0, weekly) {
            (true, true) => ReportSelector::SprintReport,
            (true, false) => ReportSelector::SprintSummary,
            (false, true) => ReportSelector::WeeklyReport,
            (false, false) => {
                show_usage_hint = true;
                ReportSelector::Gross
            }
        };
        selectors.push(default);
        selectors.extend(extra);
    }

    ReportPlan {
        begin,
        end,
        kinds: expand_selectors(&selectors),
        split_days,
        show_usage_hint,
    }
}

fn previous_month_start(today: NaiveDate) -> NaiveDate {
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Accepts `0`-`6`, `m`/`w`/`f`, or any word starting with a two-letter day
/// abbreviation (`su`, `mo`, `tu`, `we`, `th`, `fr`, `sa`). 0 is Sunday.
pub fn parse_weekday(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    if let Ok(number) = raw.parse::<i64>() {
        if !(0..=6).contains(&number) {
            bail!("\"{raw}\" is not a valid weekday number (0-6)");
        }
        return Ok(number as u32);
    }

    let lowered = raw.to_lowercase();
    let day = if lowered.chars().count() == 1 {
        match lowered.as_str() {
            "m" => Some(1),
            "w" => Some(3),
            "f" => Some(5),
            _ => None,
        }
    } else {
        let prefix = lowered.chars().take(2).collect::<String>();
        ["su", "mo", "tu", "we", "th", "fr", "sa"]
            .iter()
            .position(|abbrev| *abbrev == prefix)
            .map(|index| index as u32)
    };

    match day {
        Some(day) => Ok(day),
        None => bail!("\"{raw}\" is not a valid weekday"),
    }
}

/// Reads `YYYY-MM-DD` or `YYYY-MM-DD HH:MM[:SS]` as local wall-clock time.
pub fn parse_report_time(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Ok(date.and_time(NaiveTime::MIN)),
        Err(_) => bail!("\"{raw}\" is not a date (YYYY-MM-DD [HH:MM])"),
    }
}

#[cfg(test)]
mod tests {
    use super::{ReportRequest, SpanPreset, parse_report_time, parse_weekday, plan};
    use crate::report::catalog::{Grouping, ReportKind, ReportSelector, WeekScheme};
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    fn midnight(y: i32, m: u32, d: u32) -> Option<NaiveDateTime> {
        day(y, m, d).and_hms_opt(0, 0, 0)
    }

    #[test]
    fn parses_weekday_spellings() {
        assert_eq!(parse_weekday("0").expect("sun"), 0);
        assert_eq!(parse_weekday("W").expect("wed"), 3);
        assert_eq!(parse_weekday("thursday").expect("thu"), 4);
        assert_eq!(parse_weekday("Sa").expect("sat"), 6);
        assert!(parse_weekday("7").is_err());
        assert!(parse_weekday("t").is_err());
        assert!(parse_weekday("xx").is_err());
    }

    #[test]
    fn this_week_starts_on_configured_weekday() {
        // 2017-08-03 is a Thursday; weeks start on Wednesday.
        let request = ReportRequest {
            preset: Some(SpanPreset::ThisWeek),
            week_starts: 3,
            ..ReportRequest::default()
        };
        let plan = plan(&request, day(2017, 8, 3));

        assert_eq!(plan.begin, midnight(2017, 8, 2));
        assert_eq!(plan.end, midnight(2017, 8, 4));
        assert_eq!(plan.kinds, ReportSelector::SprintReport.expand());
    }

    #[test]
    fn last_week_wraps_before_week_start() {
        // Tuesday with weeks starting Wednesday: this week began last Wednesday.
        let request = ReportRequest {
            preset: Some(SpanPreset::LastWeek),
            week_starts: 3,
            ..ReportRequest::default()
        };
        let plan = plan(&request, day(2017, 8, 1));

        assert_eq!(plan.begin, midnight(2017, 7, 19));
        assert_eq!(plan.end, midnight(2017, 7, 26));
    }

    #[test]
    fn month_presets() {
        let this_month = ReportRequest {
            preset: Some(SpanPreset::ThisMonth),
            ..ReportRequest::default()
        };
        assert_eq!(plan(&this_month, day(2017, 8, 15)).begin, midnight(2017, 8, 1));

        let two_months = ReportRequest {
            preset: Some(SpanPreset::LastTwoMonths),
            ..ReportRequest::default()
        };
        let plan = plan(&two_months, day(2017, 1, 15));
        assert_eq!(plan.begin, midnight(2016, 12, 1));
        assert_eq!(plan.kinds, ReportSelector::Gross.expand());
        assert!(plan.show_usage_hint);
    }

    #[test]
    fn today_defaults_to_daily_reports() {
        let request = ReportRequest {
            preset: Some(SpanPreset::Today),
            ..ReportRequest::default()
        };
        let plan = plan(&request, day(2017, 8, 3));

        assert_eq!(plan.begin, midnight(2017, 8, 3));
        assert_eq!(plan.end, midnight(2017, 8, 4));
        assert_eq!(plan.kinds, ReportSelector::Daily.expand());
    }

    #[test]
    fn quick_list_picks_last_week_early_in_the_sprint() {
        let request = ReportRequest {
            quick_list: true,
            week_starts: 3,
            ..ReportRequest::default()
        };

        // Thursday is one day into a Wednesday sprint.
        let early = plan(&request, day(2017, 8, 3));
        assert_eq!(early.begin, midnight(2017, 7, 26));
        assert_eq!(early.end, midnight(2017, 8, 2));
        assert!(early.split_days);
        assert_eq!(early.kinds[0], ReportKind::Daily(Grouping::Activity));

        // Saturday is three days in.
        let later = plan(&request, day(2017, 8, 5));
        assert_eq!(later.begin, midnight(2017, 8, 2));
    }

    #[test]
    fn explicit_long_span_adds_gross_reports() {
        let request = ReportRequest {
            begin: midnight(2017, 7, 1),
            end: midnight(2017, 7, 20),
            ..ReportRequest::default()
        };
        let plan = plan(&request, day(2017, 8, 3));

        assert_eq!(plan.kinds, ReportSelector::Gross.expand());

        let sprint = ReportRequest {
            week_starts: 3,
            ..request
        };
        let kinds = super::plan(&sprint, day(2017, 8, 3)).kinds;
        assert!(kinds.contains(&ReportKind::Weekly(WeekScheme::Sprint, Grouping::Activity)));
        assert!(kinds.contains(&ReportKind::Gross(Grouping::Totals)));
    }

    #[test]
    fn aggregate_flag_appends_egg() {
        let request = ReportRequest {
            preset: Some(SpanPreset::ThisWeek),
            aggregate: true,
            ..ReportRequest::default()
        };
        assert_eq!(plan(&request, day(2017, 8, 3)).kinds, vec![ReportKind::Aggregate]);
    }

    #[test]
    fn parses_report_times() {
        assert_eq!(parse_report_time("2017-08-01").ok(), midnight(2017, 8, 1));
        assert_eq!(
            parse_report_time("2017-08-01 13:30").ok(),
            day(2017, 8, 1).and_hms_opt(13, 30, 0)
        );
        assert!(parse_report_time("yesterday").is_err());
    }
}
