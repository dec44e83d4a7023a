mod brief;
mod cli;
mod config;
mod db;
mod error;
mod report;
mod tempo;

use crate::brief::batch_to_json;
use crate::brief::line::{LineLayout, parse_line};
use crate::cli::prompt::{AssumeYes, TerminalOperator};
use crate::cli::{Cli, Commands, ConfigCommands, ReportArgs, UploadArgs};
use crate::config::{Config, TEMPO_PASSWORD_ENV, is_secret_key, normalize_tempo_url};
use crate::db::queries::FactFilter;
use crate::db::{HamsterDb, now_local};
use crate::report::render::RenderOptions;
use crate::report::span::{ReportRequest, parse_report_time, parse_weekday, plan};
use crate::tempo::client::TempoClient;
use crate::tempo::http::{Credentials, build_client};
use crate::tempo::jira::JiraXmlDirectory;
use crate::tempo::payload::unescape_delimiter;
use crate::tempo::workflow::CommandWorkflow;
use crate::tempo::{Operator, UploadOutcome, UploadSettings, Uploader};
use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::process::ExitCode;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(error) = init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {error:#}");
    }

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("Error: {error:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.parse()?))
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .init();

    Ok(())
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Report(args) => handle_report(args).map(|_| ExitCode::SUCCESS),
        Commands::Read {
            file,
            with_fact_ids,
        } => handle_read(&file, with_fact_ids).map(|_| ExitCode::SUCCESS),
        Commands::Upload(args) => handle_upload(args),
        Commands::Config { command } => handle_config_command(command).map(|_| ExitCode::SUCCESS),
        Commands::Doctor => handle_doctor().map(|_| ExitCode::SUCCESS),
    }
}

fn handle_report(args: ReportArgs) -> Result<()> {
    let config = Config::load()?;

    let week_starts = match args.week_starts.as_deref() {
        Some(raw) => parse_weekday(raw)?,
        None => config.week_starts,
    };
    let request = ReportRequest {
        preset: args.preset,
        begin: args.begin.as_deref().map(parse_report_time).transpose()?,
        end: args.end.as_deref().map(parse_report_time).transpose()?,
        week_starts,
        quick_list: args.quick_list,
        aggregate: args.aggregate,
        split_days: args.split_days,
        selectors: args.report_types,
    };
    let plan = plan(&request, Local::now().date_naive());
    debug!(?plan, "report plan");

    let filter = FactFilter {
        categories: args.categories,
        activities: args.activities,
        tags: args.tags,
        match_all: args.match_all,
        begin: None,
        end: None,
    };
    let options = RenderOptions {
        week_starts,
        first_sprint_week_num: args
            .first_sprint_week_num
            .unwrap_or(config.first_sprint_week_num),
        split_days: plan.split_days,
        with_fact_ids: args.with_fact_ids,
        now: now_local(),
    };

    let db_path = args.hamster_db_path.unwrap_or(config.hamster_db_path);
    let db = HamsterDb::open(&db_path)?;

    for line in report::build_reports(&db, &filter, &plan, &options)? {
        println!("{line}");
    }

    Ok(())
}

fn handle_read(file: &Path, with_fact_ids: bool) -> Result<()> {
    let content = if file == Path::new("-") {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read aggregate lines from stdin")?;
        buffer
    } else {
        fs::read_to_string(file)
            .with_context(|| format!("Failed to read brief file: {}", file.display()))?
    };

    let layout = if with_fact_ids {
        LineLayout::BriefWithFacts
    } else {
        LineLayout::Brief
    };

    let entries = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            parse_line(line, layout).with_context(|| format!("line {}", index + 1))
        })
        .collect::<Result<Vec<_>>>()?;

    debug!(entries = entries.len(), "parsed brief lines");
    println!("{}", batch_to_json(&entries)?);

    Ok(())
}

fn handle_upload(args: UploadArgs) -> Result<ExitCode> {
    let config = Config::load()?;

    let tempo_url = match args.tempo_url.as_deref() {
        Some(raw) => normalize_tempo_url(raw)?,
        None => config.tempo_url.clone().context(
            "Tempo URL is not configured. Pass -T <URL> or run `hamster-briefs config set tempo.url <URL>`.",
        )?,
    };
    let user = args.user.or_else(|| config.tempo_user.clone()).context(
        "Tempo user is not configured. Pass -u <USER> or run `hamster-briefs config set tempo.user <USER>`.",
    )?;
    let password = args
        .password
        .or_else(|| config.resolved_tempo_password())
        .with_context(|| {
            format!("Tempo password is missing. Pass -p, set {TEMPO_PASSWORD_ENV}, or run `hamster-briefs config set tempo.password <PASSWORD>`.")
        })?;
    let credentials = Credentials {
        user: user.clone(),
        password,
    };

    let client = build_client(args.timeout.unwrap_or(config.request_timeout_seconds))?;
    let directory = JiraXmlDirectory::new(client.clone(), &tempo_url, credentials.clone());
    let sink = TempoClient::new(client, &tempo_url, credentials);
    let operator: Box<dyn Operator> = if args.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(TerminalOperator)
    };

    let reopen_closed = args.reopen_closed || config.reopen_closed;
    let settings = UploadSettings {
        author: user,
        comment_delimiter: unescape_delimiter(
            args.delimiter.as_deref().unwrap_or(&config.comment_delimiter),
        ),
        confirm_threshold: config.confirm_threshold,
        test_mode: args.test_mode,
        reopen_closed,
    };

    let mut uploader = Uploader::new(directory, sink, operator, settings);
    if reopen_closed {
        match config.workflow_command.as_deref() {
            Some(command) => {
                uploader = uploader.with_workflow(Box::new(CommandWorkflow::from_command_line(command)?));
            }
            None => warn!("reopen_closed is set but no workflow_command is configured; closed issues stay rejected"),
        }
    }

    let outcome = uploader.run(&args.file)?;
    let code = match outcome {
        UploadOutcome::Declined => {
            println!("Upload cancelled.");
            ExitCode::from(1)
        }
        UploadOutcome::Aborted { .. } | UploadOutcome::PartiallyFailed { .. } => ExitCode::from(2),
        UploadOutcome::DryRun { .. } => ExitCode::SUCCESS,
        UploadOutcome::Submitted { count } => {
            println!("Submitted {count} worklog(s).");
            println!("REMEMBER: Logon and submit your timesheet.");
            println!("  {tempo_url}/secure/TempoUserBoard!timesheet.jspa");
            ExitCode::SUCCESS
        }
    };

    Ok(code)
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set_value(&key, &value)?;
            config.save()?;

            let masked = if is_secret_key(&key) {
                "***hidden***".to_string()
            } else {
                value
            };
            println!("Config saved: {key} = {masked}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = Config::load()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn handle_doctor() -> Result<()> {
    let config_path = Config::config_path();
    let mut issues = Vec::new();

    if config_path.exists() {
        println!("[OK] config.json found: {}", config_path.display());
    } else {
        println!("[WARN] config.json not found: {}", config_path.display());
        issues.push("config missing");
    }

    let config = Config::load()?;

    match HamsterDb::open(&config.hamster_db_path).and_then(|db| db.check_integrity()) {
        Ok(()) => println!(
            "[OK] Hamster DB readable: {}",
            config.hamster_db_path.display()
        ),
        Err(error) => {
            println!("[WARN] Hamster DB check failed: {error:#}");
            issues.push("hamster db");
        }
    }

    let tempo_settings = [
        ("tempo.url", config.tempo_url.is_some()),
        ("tempo.user", config.tempo_user.is_some()),
        ("tempo.password", config.resolved_tempo_password().is_some()),
    ];
    for (key, present) in tempo_settings {
        if present {
            println!("[OK] {key} is configured");
        } else {
            println!("[WARN] {key} is not configured");
            issues.push(key);
        }
    }

    if config.reopen_closed {
        match config.workflow_command.as_deref() {
            Some(command) => println!("[OK] workflow command: {command}"),
            None => {
                println!("[WARN] reopen_closed is enabled but workflow_command is missing");
                issues.push("workflow command");
            }
        }
    }

    if issues.is_empty() {
        println!("doctor result: no issues");
    } else {
        println!("doctor result: {} warning(s)", issues.len());
    }

    Ok(())
}
