use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand, ValueHint};
use is_terminal::IsTerminal;
use serde_json::json;

mod convert;
mod entry;
mod history;
mod message;
mod process;
mod rule;
mod rulefile;
mod sanitize;
mod scan;
mod vfs;

use entry::{RenameEntry, RenameState};
use message::{Message, MessageSink, aggregate, drain};
use process::{CancelToken, CommitStats, commit_all, preview_all};
use rule::ReplaceRule;
use scan::ScanOptions;
use vfs::{RealFs, Vfs};

fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run(cmd) => handle_run(cmd)?,
        Command::Log(cmd) => handle_log(cmd)?,
    }

    Ok(())
}

fn handle_run(cmd: RunCommand) -> Result<()> {
    let (rules, rename_extension) = build_rules(&cmd)?;
    if rules.is_empty() {
        bail!("no rules given; provide --rule or --rules-file");
    }

    let options = ScanOptions {
        recursive: cmd.recursive,
        include_hidden: cmd.include_hidden,
        include_dirs: cmd.include_dirs,
        filters: cmd.filters.clone(),
        excludes: cmd.excludes.clone(),
    };
    let mut entries = scan::scan_targets(&cmd.targets, &options)?;
    print_command_summary(&cmd, &rules, rename_extension, &entries);
    if entries.is_empty() {
        println!("no entries to rename.");
        return Ok(());
    }

    let (sink, rx) = MessageSink::channel();
    let cancel = CancelToken::new();
    preview_all(&mut entries, &rules, rename_extension, &sink, &cancel, None);
    report_messages(&drain(&rx), cmd.json);

    let changed = entries.iter().filter(|entry| entry.is_changed()).count();
    for entry in &entries {
        if !entry.is_changed() {
            continue;
        }
        if cmd.json {
            println!(
                "{}",
                json!({
                    "directory": entry.directory().display().to_string(),
                    "from": entry.original_name(),
                    "to": entry.candidate_name()
                })
            );
        } else {
            println!(
                "{} -> {}",
                entry.input_path().display(),
                entry.candidate_name()
            );
        }
    }
    println!("preview: {changed} of {} entries change.", entries.len());

    if !cmd.apply {
        if changed > 0 {
            println!("dry-run: rerun with --apply to rename.");
        }
        return Ok(());
    }
    if changed == 0 {
        println!("nothing to rename.");
        return Ok(());
    }

    let fs = RealFs;
    let history_dir = PathBuf::from(history::HISTORY_DIR);
    let stats = if cmd.auto_apply {
        commit_approved(&mut entries, &fs, &sink, &cancel, &history_dir)
    } else {
        if !io::stdin().is_terminal() {
            bail!("interactive approval needs a terminal; rerun with --yes to auto-approve");
        }
        commit_with_approval(&mut entries, &fs, &sink, &history_dir, prompt_approval)?
    };
    report_messages(&drain(&rx), cmd.json);
    stats.print();
    Ok(())
}

fn commit_approved(
    entries: &mut [RenameEntry],
    fs: &dyn Vfs,
    sink: &MessageSink,
    cancel: &CancelToken,
    history_dir: &Path,
) -> RunStats {
    let snapshot: Vec<(String, String)> = entries
        .iter()
        .map(|entry| {
            (
                entry.original_name().to_string(),
                entry.candidate_name().to_string(),
            )
        })
        .collect();
    let commit_stats = commit_all(entries, fs, sink, cancel, None);
    for (entry, (from, to)) in entries.iter().zip(&snapshot) {
        record_outcome(history_dir, entry, from, to);
    }
    RunStats {
        commit: commit_stats,
        skipped: 0,
    }
}

/// Walks the changed entries in order, asking `approve` before each commit.
/// A quit answer leaves the rest of the changed entries counted as skipped.
fn commit_with_approval<F>(
    entries: &mut [RenameEntry],
    fs: &dyn Vfs,
    sink: &MessageSink,
    history_dir: &Path,
    mut approve: F,
) -> Result<RunStats>
where
    F: FnMut(&RenameEntry) -> Result<ApprovalDecision>,
{
    let total = entries.len();
    let mut stats = RunStats::default();
    let mut apply_all = false;
    for index in 0..total {
        let entry = &mut entries[index];
        if !entry.is_changed() {
            stats.commit.unchanged += 1;
            continue;
        }
        let decision = if apply_all {
            ApprovalDecision::Apply
        } else {
            approve(entry)?
        };
        match decision {
            ApprovalDecision::Apply | ApprovalDecision::ApplyAll => {
                if matches!(decision, ApprovalDecision::ApplyAll) {
                    apply_all = true;
                }
                let from = entry.original_name().to_string();
                let to = entry.candidate_name().to_string();
                entry.commit(fs, sink);
                match entry.state() {
                    RenameState::Renamed => stats.commit.renamed += 1,
                    RenameState::FailedToRename => stats.commit.failed += 1,
                    RenameState::None => {}
                }
                record_outcome(history_dir, entry, &from, &to);
            }
            ApprovalDecision::Skip => {
                println!("skipped {}", entry.input_path().display());
                stats.skipped += 1;
            }
            ApprovalDecision::Quit => {
                println!("stopping after user request.");
                for remaining in &entries[index..] {
                    if remaining.is_changed() {
                        stats.skipped += 1;
                    } else {
                        stats.commit.unchanged += 1;
                    }
                }
                break;
            }
        }
    }
    Ok(stats)
}

fn record_outcome(history_dir: &Path, entry: &RenameEntry, from: &str, to: &str) {
    let outcome = match entry.state() {
        RenameState::Renamed => "renamed",
        RenameState::FailedToRename => "failed",
        RenameState::None => return,
    };
    // the history file is best-effort; a failed append never aborts the run
    let _ = history::record_rename(history_dir, entry.directory(), from, to, outcome);
}

fn handle_log(cmd: LogCommand) -> Result<()> {
    let entries = history::read_recent(Path::new(history::HISTORY_DIR), cmd.tail)?;
    if entries.is_empty() {
        println!("rename history is empty.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "[{}] {:<8} {}  {} -> {}",
            entry.timestamp, entry.outcome, entry.directory, entry.from, entry.to
        );
    }
    Ok(())
}

fn build_rules(cmd: &RunCommand) -> Result<(Vec<ReplaceRule>, bool)> {
    let mut rules = Vec::new();
    let mut rename_extension = cmd.rename_extension;
    if let Some(path) = &cmd.rules_file {
        let file = rulefile::load_rules(path)?;
        rename_extension = rename_extension || file.rename_extension;
        rules.extend(file.compile()?);
    }
    for pair in cmd.rules.chunks(2) {
        let [pattern, replacement] = pair else {
            bail!("--rule expects PATTERN and REPLACEMENT");
        };
        rules.push(ReplaceRule::new(pattern, replacement)?);
    }
    Ok((rules, rename_extension))
}

fn report_messages(messages: &[Message], json: bool) {
    if messages.is_empty() {
        return;
    }
    for group in aggregate(messages) {
        if json {
            println!(
                "{}",
                json!({
                    "severity": group.severity.label(),
                    "head": group.head,
                    "body": group.body
                })
            );
        } else {
            println!("[{}] {}:", group.severity.label(), group.head);
            for line in group.body.split('\n') {
                println!("  {line}");
            }
        }
    }
}

fn print_command_summary(
    cmd: &RunCommand,
    rules: &[ReplaceRule],
    rename_extension: bool,
    entries: &[RenameEntry],
) {
    println!("command: run");
    println!(
        "mode: {}{}",
        if cmd.apply { "apply" } else { "dry-run" },
        if cmd.auto_apply {
            " (auto-approve)"
        } else {
            ""
        }
    );
    println!("targets:");
    for target in &cmd.targets {
        println!("  - {}", target.display());
    }
    println!("rules ({}):", rules.len());
    for rule in rules {
        println!("  - '{}' -> '{}'", rule.pattern(), rule.replacement());
    }
    println!("rename extension: {rename_extension}");
    println!("recursive: {}", cmd.recursive);
    println!("include dirs: {}", cmd.include_dirs);
    println!("include hidden: {}", cmd.include_hidden);
    if !cmd.filters.is_empty() {
        println!("name filters: {:?}", cmd.filters);
    }
    if !cmd.excludes.is_empty() {
        println!("exclude globs: {:?}", cmd.excludes);
    }

    if entries.is_empty() {
        println!("resolved entries: (none)");
    } else {
        println!("resolved entries ({}):", entries.len());
        for entry in entries.iter().take(10) {
            let dir_hint = if entry.is_dir() { " (dir)" } else { "" };
            println!("  - {}{dir_hint}", entry.input_path().display());
        }
        if entries.len() > 10 {
            println!("  ...");
        }
    }
    println!("---");
}

#[derive(Debug, Clone, Copy)]
enum ApprovalDecision {
    Apply,
    Skip,
    ApplyAll,
    Quit,
}

fn prompt_approval(entry: &RenameEntry) -> Result<ApprovalDecision> {
    loop {
        print_prompt(&format!(
            "Rename {} -> {}? [y]es/[n]o/[a]ll/[q]uit: ",
            entry.input_path().display(),
            entry.candidate_name()
        ))?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        match input.trim().to_lowercase().as_str() {
            "y" | "yes" | "" => return Ok(ApprovalDecision::Apply),
            "n" | "no" => return Ok(ApprovalDecision::Skip),
            "a" | "all" => return Ok(ApprovalDecision::ApplyAll),
            "q" | "quit" => return Ok(ApprovalDecision::Quit),
            _ => {
                println!("Please enter y, n, a, or q.");
            }
        }
    }
}

fn print_prompt(message: &str) -> Result<()> {
    print!("{message}");
    io::stdout().flush()?;
    Ok(())
}

#[derive(Debug, Default)]
struct RunStats {
    commit: CommitStats,
    skipped: usize,
}

impl RunStats {
    fn print(&self) {
        println!(
            "run summary: renamed={}, failed={}, unchanged={}, skipped={}",
            self.commit.renamed, self.commit.failed, self.commit.unchanged, self.skipped
        );
    }
}

#[derive(Debug, Parser)]
#[command(name = "massrename", version, about = "Batch filename renamer with preview")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Run(RunCommand),
    Log(LogCommand),
}

#[derive(Debug, Args)]
struct RunCommand {
    #[arg(
        long = "target",
        value_name = "DIR",
        value_hint = ValueHint::DirPath,
        required = true
    )]
    targets: Vec<PathBuf>,
    #[arg(
        long = "rule",
        value_names = ["PATTERN", "REPLACEMENT"],
        num_args = 2,
        action = ArgAction::Append
    )]
    rules: Vec<String>,
    #[arg(long = "rules-file", value_name = "FILE", value_hint = ValueHint::FilePath)]
    rules_file: Option<PathBuf>,
    #[arg(long = "rename-ext", action = ArgAction::SetTrue)]
    rename_extension: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    recursive: bool,
    #[arg(long = "dirs", action = ArgAction::SetTrue)]
    include_dirs: bool,
    #[arg(long = "include-hidden", action = ArgAction::SetTrue)]
    include_hidden: bool,
    #[arg(long = "filter", value_name = "GLOB")]
    filters: Vec<String>,
    #[arg(long = "exclude", value_name = "GLOB")]
    excludes: Vec<String>,
    #[arg(long, action = ArgAction::SetTrue)]
    apply: bool,
    #[arg(long = "yes", action = ArgAction::SetTrue)]
    auto_apply: bool,
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Debug, Args)]
struct LogCommand {
    #[arg(long = "tail", default_value_t = 20)]
    tail: usize,
}
