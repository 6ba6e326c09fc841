use anyhow::Context;
use clap::{Parser, Subcommand};
use omen_adapters::StdProcessRunner;
use omen_app::{
    build_report, github_annotations, outcomes_from_run_log, render_markdown, ReportRequest,
    ResolveRequest, ResolveUseCase, SystemClock,
};
use omen_store::ExpectationStore;
use omen_types::{Mode, ReportReceipt, RunLog, ToolInfo, VerdictStatus};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "omen",
    version,
    about = "Expected-outcome gating and noteworthy-result triage for CI"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resolve a run log against expectations and emit a resolve receipt (JSON).
    Resolve {
        /// Expectations file. Repeatable; files that don't exist are skipped.
        #[arg(long = "expectations", required = true)]
        expectations: Vec<PathBuf>,

        /// Run mode scoping which expectations apply.
        #[arg(long, default_value = "local")]
        mode: Mode,

        /// Run log to resolve.
        #[arg(long)]
        run: PathBuf,

        /// External bug-status command; all referenced bug ids are
        /// appended to its argv and it must print open ids one per line.
        #[arg(long)]
        bug_command: Option<String>,

        /// Output receipt path.
        #[arg(long, default_value = "omen-resolve.json")]
        out: PathBuf,

        /// Pretty-print JSON.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Build a noteworthy-outcome report from a run log and its history.
    Report {
        /// Expectations file. Repeatable; files that don't exist are skipped.
        #[arg(long = "expectations", required = true)]
        expectations: Vec<PathBuf>,

        /// Run mode scoping which expectations apply.
        #[arg(long, default_value = "local")]
        mode: Mode,

        /// Run log under report.
        #[arg(long)]
        run: PathBuf,

        /// Directory of prior run logs (*.json). Only runs recorded
        /// strictly before the current one count as history.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Baseline run log as NAME=PATH, e.g. release-7=tags/r7.json.
        #[arg(long, value_parser = parse_key_val_string)]
        tag: Option<(String, String)>,

        /// Output markdown path (default: stdout).
        #[arg(long)]
        out: Option<PathBuf>,

        /// Also write the report receipt (JSON).
        #[arg(long)]
        json_out: Option<PathBuf>,

        /// Pretty-print JSON.
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Emit GitHub Actions annotations from a report receipt.
    Annotations {
        #[arg(long)]
        report: PathBuf,
    },
}

fn main() -> ExitCode {
    init_tracing();
    if let Err(err) = real_main() {
        eprintln!("{err:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Command::Resolve {
            expectations,
            mode,
            run,
            bug_command,
            out,
            pretty,
        } => {
            let store = ExpectationStore::parse(&expectations, mode)?;

            if let Some(command) = bug_command {
                let argv = shell_words::split(&command)
                    .with_context(|| format!("invalid bug command: {command}"))?;
                store
                    .load_bug_statuses(&StdProcessRunner, &argv)
                    .context("loading bug statuses")?;
            }

            let log: RunLog = read_json(&run)?;
            let receipt = ResolveUseCase::new(SystemClock).execute(
                &store,
                ResolveRequest {
                    outcomes: outcomes_from_run_log(&log),
                    mode,
                    tool: tool_info(),
                },
            );

            write_json(&out, &receipt, pretty)?;

            match receipt.verdict.status {
                VerdictStatus::Pass => Ok(()),
                VerdictStatus::Fail => {
                    // The receipt artifact is written either way.
                    eprintln!("omen: {} failing outcome(s)", receipt.counts.fail);
                    std::process::exit(2)
                }
            }
        }

        Command::Report {
            expectations,
            mode,
            run,
            history,
            tag,
            out,
            json_out,
            pretty,
        } => {
            let store = ExpectationStore::parse(&expectations, mode)?;
            let current: RunLog = read_json(&run)?;

            let history = match history {
                Some(dir) => read_history(&dir, &run)?,
                None => Vec::new(),
            };

            let tag = tag
                .map(|(name, path)| {
                    let log: RunLog = read_json(Path::new(&path))?;
                    anyhow::Ok((name, log))
                })
                .transpose()?;

            let report = build_report(
                &store,
                &ReportRequest {
                    current,
                    history,
                    tag,
                    mode,
                    tool: tool_info(),
                },
                &SystemClock,
            );

            if let Some(path) = &json_out {
                write_json(path, &report, pretty)?;
            }

            let md = render_markdown(&report);
            match out {
                Some(path) => {
                    fs::write(&path, md).with_context(|| format!("write {}", path.display()))?;
                }
                None => print!("{md}"),
            }

            Ok(())
        }

        Command::Annotations { report } => {
            let report: ReportReceipt = read_json(&report)?;
            for line in github_annotations(&report) {
                println!("{line}");
            }
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn tool_info() -> ToolInfo {
    ToolInfo {
        name: "omen".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}

/// Loads every run log in the history directory. The run log under
/// report may live in the same directory; it is skipped by path here and
/// excluded by timestamp again in the app layer.
fn read_history(dir: &Path, current: &Path) -> anyhow::Result<Vec<RunLog>> {
    let pattern = dir.join("*.json");
    let pattern = pattern
        .to_str()
        .with_context(|| format!("history dir is not valid UTF-8: {}", dir.display()))?;

    let mut logs = Vec::new();
    for entry in glob::glob(pattern).context("globbing history dir")? {
        let path = entry.context("reading history dir")?;
        if let (Ok(a), Ok(b)) = (path.canonicalize(), current.canonicalize()) {
            if a == b {
                continue;
            }
        }
        let log: RunLog = read_json(&path)?;
        logs.push(log);
    }
    logs.sort_by(|a, b| a.recorded_at.cmp(&b.recorded_at));
    Ok(logs)
}

fn parse_key_val_string(s: &str) -> Result<(String, String), String> {
    let (k, v) = s
        .split_once('=')
        .ok_or_else(|| "expected NAME=PATH".to_string())?;
    Ok((k.to_string(), v.to_string()))
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let v =
        serde_json::from_slice(&bytes).with_context(|| format!("parse json {}", path.display()))?;
    Ok(v)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T, pretty: bool) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }
    }

    let bytes = if pretty {
        serde_json::to_vec_pretty(value)?
    } else {
        serde_json::to_vec(value)?
    };

    atomic_write(path, &bytes)
}

fn atomic_write(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    use std::io::Write;

    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = parent.to_path_buf();
    tmp.push(format!(".{}.tmp", uuid::Uuid::new_v4()));

    {
        let mut f =
            fs::File::create(&tmp).with_context(|| format!("create temp {}", tmp.display()))?;
        f.write_all(bytes)
            .with_context(|| format!("write temp {}", tmp.display()))?;
        f.sync_all().ok();
    }

    fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
