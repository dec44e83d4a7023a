pub mod client;
pub mod http;
pub mod jira;
pub mod keys;
pub mod payload;
pub mod workflow;

use crate::brief::normalize::{Normalized, normalize};
use crate::brief::{Entry, RawEntry, batch_to_json, format_hours, load_batch};
use crate::error::{EntryError, ValidationError};
use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate, NaiveDateTime};
use client::WorklogSink;
use jira::{IssueCache, IssueDirectory};
use keys::resolve_entry_key;
use payload::{build_payload, hours_to_seconds};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info, warn};
use workflow::IssueWorkflow;

static STAMPED_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[-_.]?\d{4}[-_.]?\d{2}[-_.]?\d{2}[-_.]?\d{6}\.json$")
        .expect("invalid stamped suffix regex")
});
static TESTMODE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\d{4}-\d{2}-\d{2}-TESTMODE\.json$").expect("invalid test mode suffix regex")
});
static JSON_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.json$").expect("invalid json suffix regex"));

/// Asked before large batches are processed.
pub trait Operator {
    fn confirm_batch(&mut self, count: usize) -> bool;
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub author: String,
    pub comment_delimiter: String,
    pub confirm_threshold: usize,
    pub test_mode: bool,
    pub reopen_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Declined,
    Aborted { errors: usize },
    DryRun { path: PathBuf, count: usize },
    Submitted { count: usize },
    PartiallyFailed { failed: usize, path: PathBuf },
}

struct Prepared {
    entry: Entry,
    closed: bool,
}

/// Two-pass batch driver: every entry is resolved and checked before the
/// first worklog is posted, and whatever fails to post is written back out
/// for another attempt.
pub struct Uploader<D: IssueDirectory, S: WorklogSink> {
    directory: D,
    sink: S,
    workflow: Option<Box<dyn IssueWorkflow>>,
    operator: Box<dyn Operator>,
    settings: UploadSettings,
    cache: IssueCache,
    parse_errs: Vec<ValidationError>,
    failed_reqs: Vec<Entry>,
}

impl<D: IssueDirectory, S: WorklogSink> Uploader<D, S> {
    pub fn new(
        directory: D,
        sink: S,
        operator: Box<dyn Operator>,
        settings: UploadSettings,
    ) -> Self {
        Self {
            directory,
            sink,
            workflow: None,
            operator,
            settings,
            cache: IssueCache::default(),
            parse_errs: Vec::new(),
            failed_reqs: Vec::new(),
        }
    }

    pub fn with_workflow(mut self, workflow: Box<dyn IssueWorkflow>) -> Self {
        self.workflow = Some(workflow);
        self
    }

    #[cfg(test)]
    pub fn directory(&self) -> &D {
        &self.directory
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn run(&mut self, path: &Path) -> Result<UploadOutcome> {
        let raw = load_batch(path)?;
        self.run_batch(raw, path, Local::now().naive_local())
    }

    pub fn run_batch(
        &mut self,
        raw: Vec<RawEntry>,
        input_path: &Path,
        now: NaiveDateTime,
    ) -> Result<UploadOutcome> {
        self.parse_errs.clear();
        self.failed_reqs.clear();

        if raw.len() > self.settings.confirm_threshold && !self.operator.confirm_batch(raw.len()) {
            return Ok(UploadOutcome::Declined);
        }

        println!("PASS 1/2 Checking JSON");
        let (prepared, day_seconds) = self.check_batch(raw);
        print_totals(&day_seconds);
        debug!(cached_issues = self.cache.cached_issues(), "validation pass done");

        if !self.parse_errs.is_empty() {
            for error in &self.parse_errs {
                println!("{error}");
            }
            println!(
                "ERROR: Found {} error(s) you need to fix before you can upload.",
                self.parse_errs.len()
            );
            return Ok(UploadOutcome::Aborted {
                errors: self.parse_errs.len(),
            });
        }

        if self.settings.test_mode {
            let path = recovery_path(input_path, now, true);
            let entries = prepared.into_iter().map(|item| item.entry).collect::<Vec<_>>();
            fs::write(&path, batch_to_json(&entries)?)
                .with_context(|| format!("Failed to write test mode file: {}", path.display()))?;
            println!("TEST MODE: nothing was posted. Resolved batch: {}", path.display());
            return Ok(UploadOutcome::DryRun {
                path,
                count: entries.len(),
            });
        }

        println!("PASS 2/2 Tickling TEMPO");
        let count = prepared.len();
        for item in prepared {
            self.submit(item);
        }

        if self.failed_reqs.is_empty() {
            info!(count, "all worklogs submitted");
            return Ok(UploadOutcome::Submitted { count });
        }

        let path = write_new_file(
            &recovery_path(input_path, now, false),
            &batch_to_json(&self.failed_reqs)?,
        )?;
        println!(
            "{} of {count} worklog(s) failed. Please fix the problems and try again on the new file:",
            self.failed_reqs.len()
        );
        println!("  {}", path.display());

        Ok(UploadOutcome::PartiallyFailed {
            failed: self.failed_reqs.len(),
            path,
        })
    }

    /// Validates every entry, returning the prepared ones and the seconds
    /// they add up to per day.
    fn check_batch(&mut self, raw: Vec<RawEntry>) -> (Vec<Prepared>, BTreeMap<NaiveDate, u64>) {
        let mut prepared = Vec::with_capacity(raw.len());
        let mut day_seconds: BTreeMap<NaiveDate, u64> = BTreeMap::new();

        for (index, raw_entry) in raw.into_iter().enumerate() {
            let label = raw_label(&raw_entry);
            match self.check_entry(index, raw_entry) {
                Ok(item) => {
                    let seconds = hours_to_seconds(item.entry.duration_hours);
                    *day_seconds.entry(item.entry.date).or_default() += seconds;
                    println!(
                        "Entry: {} / {} hrs / {}",
                        item.entry.date,
                        format_hours(item.entry.duration_hours),
                        item.entry.issue_key.as_deref().unwrap_or_default()
                    );
                    prepared.push(item);
                }
                Err(error) => self.parse_errs.push(ValidationError {
                    index,
                    label,
                    error,
                }),
            }
        }

        (prepared, day_seconds)
    }

    fn check_entry(&mut self, index: usize, raw: RawEntry) -> Result<Prepared, EntryError> {
        let Normalized { mut entry, ignored } = normalize(raw)?;
        for field in ignored {
            warn!(entry = index + 1, field, "Ignoring reserved field on loaded entry");
        }

        let issue = resolve_entry_key(&entry).into_result()?;
        let details = self.cache.get_or_fetch(&issue, &mut self.directory)?;

        let closed = details.is_closed();
        if closed && !(self.settings.reopen_closed && self.workflow.is_some()) {
            return Err(EntryError::IssueClosed {
                issue_key: details.issue_key,
                status: details.status,
            });
        }

        entry.payload = Some(build_payload(
            &entry,
            &details,
            &self.settings.author,
            &self.settings.comment_delimiter,
        ));
        entry.project_key = Some(details.project_key);
        entry.project_id = Some(details.project_id);
        entry.issue_key = Some(details.issue_key);
        entry.issue_id = Some(details.issue_id);

        Ok(Prepared { entry, closed })
    }

    fn submit(&mut self, item: Prepared) {
        let Prepared { mut entry, closed } = item;
        let Some(payload) = entry.payload.clone() else {
            self.failed_reqs.push(entry);
            return;
        };
        let issue_key = payload.issue.key.clone();
        debug!(issue = %issue_key, seconds = payload.seconds(), closed, "submitting worklog");

        println!(
            "POST: {issue_key} / {} / {} hrs",
            entry.date,
            format_hours(entry.duration_hours)
        );

        let resolution = match (closed, self.workflow.as_mut()) {
            (true, Some(workflow)) => {
                match workflow
                    .resolution(&issue_key)
                    .and_then(|resolution| workflow.reopen(&issue_key).map(|_| resolution))
                {
                    Ok(resolution) => Some(resolution),
                    Err(error) => {
                        warn!(issue = %issue_key, error = %error, "failed to reopen closed issue");
                        println!("FAILED: {issue_key}: {error}");
                        self.failed_reqs.push(entry);
                        return;
                    }
                }
            }
            _ => None,
        };

        let posted = self.sink.post(&payload);
        if let Err(error) = &posted {
            warn!(issue = %issue_key, error = %error, "worklog submission failed");
            println!("FAILED: {issue_key}: {error}");
        }

        // A reopened issue goes back to its resolution whether or not the post went through.
        if let (Some(resolution), Some(workflow)) = (resolution.as_deref(), self.workflow.as_mut()) {
            if let Err(error) = workflow.close(&issue_key, resolution) {
                warn!(issue = %issue_key, error = %error, "issue was not closed again");
            }
        }
        entry.issue_resolution = resolution;

        if posted.is_err() {
            self.failed_reqs.push(entry);
        }
    }
}

fn raw_label(raw: &RawEntry) -> String {
    format!(
        "{} \"{}\"",
        raw.year_month_day.as_deref().unwrap_or("?"),
        raw.activity_name.as_deref().unwrap_or_default()
    )
}

fn print_totals(day_seconds: &BTreeMap<NaiveDate, u64>) {
    for (date, seconds) in day_seconds {
        println!("  {date}: {} hrs", format_hours(*seconds as f64 / 3600.0));
    }
    let total_secs = day_seconds.values().sum::<u64>();
    println!(
        "total_secs: {total_secs} / total_hrs: {}",
        format_hours(total_secs as f64 / 3600.0)
    );
}

/// Output path derived from the input name with any earlier stamp removed:
/// `{base}-{YYYY-MM-DD}-{HHMMSS}.json`, or `{base}-{YYYY-MM-DD}-TESTMODE.json`.
pub fn recovery_path(input: &Path, now: NaiveDateTime, test_mode: bool) -> PathBuf {
    let input = input.to_string_lossy();
    let base = TESTMODE_SUFFIX.replace(&input, "");
    let base = STAMPED_SUFFIX.replace(&base, "");
    let base = JSON_SUFFIX.replace(&base, "");

    let stamp = if test_mode {
        "TESTMODE".to_string()
    } else {
        now.format("%H%M%S").to_string()
    };

    PathBuf::from(format!("{base}-{}-{stamp}.json", now.format("%Y-%m-%d")))
}

const MAX_RECOVERY_SUFFIX: u32 = 99;

/// Creates `path`, or `{stem}-1.json`, `{stem}-2.json`, ... when it is taken.
/// Existing files are never overwritten. Returns the path written.
fn write_new_file(path: &Path, content: &str) -> Result<PathBuf> {
    let stem = JSON_SUFFIX.replace(&path.to_string_lossy(), "").into_owned();

    for attempt in 0..=MAX_RECOVERY_SUFFIX {
        let candidate = if attempt == 0 {
            path.to_path_buf()
        } else {
            PathBuf::from(format!("{stem}-{attempt}.json"))
        };

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                debug!(path = %candidate.display(), "recovery file name taken");
                continue;
            }
            Err(error) => {
                return Err(error).with_context(|| {
                    format!("Failed to create recovery file: {}", candidate.display())
                });
            }
        };

        file.write_all(content.as_bytes())
            .with_context(|| format!("Failed to write recovery file: {}", candidate.display()))?;
        return Ok(candidate);
    }

    bail!("No free recovery file name next to {}", path.display())
}
