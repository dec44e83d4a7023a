use clap::ValueEnum;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grouping {
    Activity,
    Category,
    Totals,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeekScheme {
    /// Calendar weeks running Sunday to Saturday.
    SatSun,
    /// Weeks starting on the configured sprint weekday.
    Sprint,
}

/// One concrete report the renderer knows how to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    All,
    Daily(Grouping),
    Weekly(WeekScheme, Grouping),
    Gross(Grouping),
    Aggregate,
}

impl ReportKind {
    pub fn title(self) -> Option<String> {
        let title = match self {
            Self::All => "ALL FACTS".to_string(),
            Self::Daily(Grouping::Activity) => "DAILY ACTIVITY TOTALS".to_string(),
            Self::Daily(Grouping::Category) => "DAILY CATEGORY TOTALS".to_string(),
            Self::Daily(Grouping::Totals) => "DAILY TOTALS".to_string(),
            Self::Weekly(scheme, grouping) => {
                let prefix = match scheme {
                    WeekScheme::SatSun => "SUN-SAT",
                    WeekScheme::Sprint => "SPRINT",
                };
                format!("{prefix} WEEKLY {} TOTALS", grouping_label(grouping, "TOTAL"))
            }
            Self::Gross(grouping) => {
                format!("GROSS {} TOTALS", grouping_label(grouping, "GROSS"))
            }
            // Aggregate lines feed `read`, so they are printed bare.
            Self::Aggregate => return None,
        };
        Some(title)
    }
}

fn grouping_label(grouping: Grouping, totals: &'static str) -> &'static str {
    match grouping {
        Grouping::Activity => "ACTIVITY",
        Grouping::Category => "CATEGORY",
        Grouping::Totals => totals,
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::All => "all".to_string(),
            Self::Daily(grouping) => format!("daily-{}", grouping_name(*grouping)),
            Self::Weekly(scheme, grouping) => {
                let scheme = match scheme {
                    WeekScheme::SatSun => "satsun",
                    WeekScheme::Sprint => "sprint",
                };
                format!("weekly-{}-{scheme}", grouping_name(*grouping))
            }
            Self::Gross(grouping) => format!("gross-{}", grouping_name(*grouping)),
            Self::Aggregate => "egg".to_string(),
        };
        f.write_str(&name)
    }
}

fn grouping_name(grouping: Grouping) -> &'static str {
    match grouping {
        Grouping::Activity => "activity",
        Grouping::Category => "category",
        Grouping::Totals => "totals",
    }
}

/// A report name accepted on the command line: either one concrete report or
/// a group that expands to several.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportSelector {
    All,
    Egg,
    Gross,
    WeeklySummary,
    SprintSummary,
    WeeklyReport,
    SprintReport,
    Daily,
    Weekly,
    Activity,
    Category,
    Totals,
    Satsun,
    WeeklySatsun,
    Sprint,
    WeeklySprint,
    WeeklyActivity,
    WeeklyCategory,
    WeeklyTotals,
    Report,
    ReportActivity,
    DailyActivity,
    DailyCategory,
    DailyTotals,
    WeeklyActivitySatsun,
    WeeklyCategorySatsun,
    WeeklyTotalsSatsun,
    WeeklyActivitySprint,
    WeeklyCategorySprint,
    WeeklyTotalsSprint,
    GrossActivity,
    GrossCategory,
    GrossTotals,
}

impl ReportSelector {
    pub fn expand(self) -> Vec<ReportKind> {
        use Grouping::{Activity, Category, Totals};
        use ReportKind::{Daily, Gross, Weekly};
        use WeekScheme::{SatSun, Sprint};

        match self {
            Self::All => vec![ReportKind::All],
            Self::Egg => vec![ReportKind::Aggregate],
            Self::Gross => vec![Gross(Totals), Gross(Category), Gross(Activity)],
            Self::WeeklySummary => vec![
                Daily(Activity),
                Daily(Category),
                Daily(Totals),
                Weekly(SatSun, Activity),
                Weekly(SatSun, Category),
                Weekly(SatSun, Totals),
            ],
            Self::SprintSummary => vec![
                Daily(Activity),
                Daily(Category),
                Daily(Totals),
                Weekly(Sprint, Activity),
                Weekly(Sprint, Category),
                Weekly(Sprint, Totals),
            ],
            Self::WeeklyReport => vec![
                Daily(Activity),
                Daily(Totals),
                Weekly(SatSun, Category),
                Weekly(SatSun, Totals),
            ],
            Self::SprintReport => vec![
                Daily(Activity),
                Daily(Totals),
                Weekly(Sprint, Category),
                Weekly(Sprint, Totals),
            ],
            Self::Daily => vec![Daily(Totals), Daily(Category), Daily(Activity)],
            Self::Weekly => vec![
                Weekly(SatSun, Activity),
                Weekly(SatSun, Category),
                Weekly(SatSun, Totals),
                Weekly(Sprint, Activity),
                Weekly(Sprint, Category),
                Weekly(Sprint, Totals),
            ],
            Self::Activity => vec![
                Daily(Activity),
                Weekly(SatSun, Activity),
                Weekly(Sprint, Activity),
            ],
            Self::Category => vec![
                Daily(Category),
                Weekly(SatSun, Category),
                Weekly(Sprint, Category),
            ],
            Self::Totals => vec![Daily(Totals), Weekly(SatSun, Totals), Weekly(Sprint, Totals)],
            Self::Satsun | Self::WeeklySatsun => vec![
                Weekly(SatSun, Activity),
                Weekly(SatSun, Category),
                Weekly(SatSun, Totals),
            ],
            Self::Sprint | Self::WeeklySprint => vec![
                Weekly(Sprint, Activity),
                Weekly(Sprint, Category),
                Weekly(Sprint, Totals),
            ],
            Self::WeeklyActivity => vec![Weekly(SatSun, Activity), Weekly(Sprint, Activity)],
            Self::WeeklyCategory => vec![Weekly(SatSun, Category), Weekly(Sprint, Category)],
            Self::WeeklyTotals => vec![Weekly(SatSun, Totals), Weekly(Sprint, Totals)],
            Self::Report | Self::ReportActivity => vec![
                Daily(Activity),
                Weekly(Sprint, Category),
                Daily(Totals),
                Weekly(Sprint, Totals),
            ],
            Self::DailyActivity => vec![Daily(Activity)],
            Self::DailyCategory => vec![Daily(Category)],
            Self::DailyTotals => vec![Daily(Totals)],
            Self::WeeklyActivitySatsun => vec![Weekly(SatSun, Activity)],
            Self::WeeklyCategorySatsun => vec![Weekly(SatSun, Category)],
            Self::WeeklyTotalsSatsun => vec![Weekly(SatSun, Totals)],
            Self::WeeklyActivitySprint => vec![Weekly(Sprint, Activity)],
            Self::WeeklyCategorySprint => vec![Weekly(Sprint, Category)],
            Self::WeeklyTotalsSprint => vec![Weekly(Sprint, Totals)],
            Self::GrossActivity => vec![Gross(Activity)],
            Self::GrossCategory => vec![Gross(Category)],
            Self::GrossTotals => vec![Gross(Totals)],
        }
    }
}

/// Expands selectors in order, keeping only the first occurrence of each
/// concrete report.
pub fn expand_selectors(selectors: &[ReportSelector]) -> Vec<ReportKind> {
    selectors
        .iter()
        .flat_map(|selector| selector.expand())
        .fold(Vec::new(), |mut kinds, kind| {
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
            kinds
        })
}

#[cfg(test)]
mod tests {
    use super::{Grouping, ReportKind, ReportSelector, WeekScheme, expand_selectors};
    use clap::ValueEnum;

    #[test]
    fn groups_expand_in_order_without_duplicates() {
        let kinds = expand_selectors(&[ReportSelector::Daily, ReportSelector::Activity]);
        let names = kinds.iter().map(ToString::to_string).collect::<Vec<_>>();

        assert_eq!(
            names,
            vec![
                "daily-totals",
                "daily-category",
                "daily-activity",
                "weekly-activity-satsun",
                "weekly-activity-sprint",
            ]
        );
    }

    #[test]
    fn report_group_matches_quick_list_layout() {
        assert_eq!(
            ReportSelector::ReportActivity.expand(),
            vec![
                ReportKind::Daily(Grouping::Activity),
                ReportKind::Weekly(WeekScheme::Sprint, Grouping::Category),
                ReportKind::Daily(Grouping::Totals),
                ReportKind::Weekly(WeekScheme::Sprint, Grouping::Totals),
            ]
        );
    }

    #[test]
    fn selectors_parse_from_kebab_case_names() {
        let parsed = ReportSelector::from_str("weekly-totals-sprint", false).expect("selector");
        assert_eq!(parsed, ReportSelector::WeeklyTotalsSprint);
        assert!(ReportSelector::from_str("weekly-tight", false).is_err());
    }

    #[test]
    fn concrete_selectors_round_trip_through_display() {
        let concrete = ReportSelector::value_variants()
            .iter()
            .filter(|selector| selector.expand().len() == 1)
            .filter(|selector| !matches!(selector, ReportSelector::Egg))
            .copied()
            .collect::<Vec<_>>();

        for selector in concrete {
            let kind = selector.expand()[0];
            let parsed = ReportSelector::from_str(&kind.to_string(), false).expect("selector");
            assert_eq!(parsed.expand(), vec![kind]);
        }
    }

    #[test]
    fn titles_follow_the_report_kind() {
        assert_eq!(
            ReportKind::Weekly(WeekScheme::SatSun, Grouping::Totals).title().as_deref(),
            Some("SUN-SAT WEEKLY TOTAL TOTALS")
        );
        assert_eq!(ReportKind::Aggregate.title(), None);
    }
}
