use anyhow::{bail, Context};
use colored::Colorize;

use gdmb_detect::{DecisionAggregator, EvidenceKind, MergeVerdict};
use gdmb_refs::{BranchRef, RefStore};
use gdmb_sdk::{
    execute, AssumeYes, BatchOutcome, Confirmation, DeletionPlan, DeletionPlanner, DeletionSink,
    DmbConfig, ExecutionReport, PlanSettings, RefStoreSink, Repository, SdkError,
};

use crate::cli::*;
use crate::sink::EchoSink;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Plan(args) => cmd_plan(args, cli.format),
        Command::Prune(args) => cmd_prune(args, cli.format),
        Command::Check(args) => cmd_check(args, cli.format),
    }
}

fn load_repo(args: &RepoArgs) -> anyhow::Result<Repository> {
    Repository::load(&args.repo).with_context(|| format!("cannot load {}", args.repo.display()))
}

fn load_settings(args: &SelectionArgs) -> anyhow::Result<PlanSettings> {
    let config = match &args.config {
        Some(path) => DmbConfig::load(path)?,
        None => DmbConfig::default(),
    };
    Ok(config.with_overrides(args.overrides()))
}

fn cmd_plan(args: PlanArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = load_repo(&args.repo)?;
    let plan = DeletionPlanner::new(&repo, load_settings(&args.selection)?).plan()?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&plan)?),
        OutputFormat::Text => print_plan(&plan),
    }
    Ok(())
}

fn cmd_prune(args: PruneArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = load_repo(&args.repo)?;
    let plan = DeletionPlanner::new(&repo, load_settings(&args.selection)?).plan()?;
    if format == OutputFormat::Text {
        print_plan(&plan);
        println!();
    }

    let mut confirmation: Box<dyn Confirmation> = if args.yes || args.dry_run {
        Box::new(AssumeYes)
    } else {
        Box::new(|description: &str| {
            println!("{description}");
            println!("{}", "Re-run with --yes to delete.".yellow());
            false
        })
    };
    let mut sink: Box<dyn DeletionSink + '_> = if args.dry_run {
        Box::new(EchoSink::default())
    } else {
        Box::new(RefStoreSink::new(&repo))
    };
    let report = execute(&plan, sink.as_mut(), confirmation.as_mut());
    drop(sink);

    match format {
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "plan": plan, "report": report }))?
        ),
        OutputFormat::Text => print_report(&report),
    }

    if !args.dry_run && report.deleted().next().is_some() {
        repo.save(&args.repo.repo)?;
    }
    if report.failed() {
        bail!("not every branch could be deleted");
    }
    Ok(())
}

fn cmd_check(args: CheckArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = load_repo(&args.repo)?;
    let branch = resolve_branch(&repo, &args.branch)?;
    let targets = args
        .targets
        .iter()
        .map(|name| resolve_branch(&repo, name))
        .collect::<anyhow::Result<Vec<_>>>()?;

    let verdicts = DecisionAggregator::new().decide(&repo, &[branch], &targets, args.effort)?;
    let Some(verdict) = verdicts.first() else {
        bail!("{} is one of its own targets", args.branch);
    };
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(verdict)?),
        OutputFormat::Text => {
            let summary = if verdict.is_deletable() {
                "merged into every target".green()
            } else {
                "not merged".red()
            };
            println!("{}: {}", verdict.branch.to_string().bold(), summary);
            print_evidence(verdict);
        }
    }
    Ok(())
}

/// `name` for a local branch, `remote/name` for a remote-tracking one.
fn resolve_branch(repo: &Repository, name: &str) -> anyhow::Result<BranchRef> {
    if let Some(branch) = repo.refs().local_branch(name)? {
        return Ok(branch);
    }
    if let Some((remote, rest)) = name.split_once('/') {
        if repo.remotes()?.iter().any(|r| r == remote) {
            if let Some(branch) = repo.refs().remote_branch(remote, rest)? {
                return Ok(branch);
            }
        }
    }
    Err(SdkError::NoSuchBranch(name.to_string()).into())
}

// ---- Output ----

fn paint(evidence: EvidenceKind) -> colored::ColoredString {
    match evidence {
        EvidenceKind::NotMerged => evidence.as_str().red(),
        EvidenceKind::Ancestor => evidence.as_str().green(),
        _ => evidence.as_str().cyan(),
    }
}

fn print_evidence(verdict: &MergeVerdict) {
    for entry in &verdict.per_target_evidence {
        println!("    {} {}", format!("{}:", entry.target).dimmed(), paint(entry.evidence));
    }
    for diagnostic in &verdict.diagnostics {
        println!("    {} {}", "warning:".red().bold(), diagnostic);
    }
}

fn print_plan(plan: &DeletionPlan) {
    for notice in &plan.notices {
        println!("{} {}", "note:".yellow().bold(), notice);
    }
    println!(
        "Targets: {} (effort {})",
        plan.targets.join(", ").bold(),
        plan.effort
    );

    for verdict in &plan.verdicts {
        let planned = plan.deletions().find(|d| d.branch.same_ref(&verdict.branch));
        let marker = match planned {
            Some(d) if d.force => "delete --force".red().bold(),
            Some(_) => "delete".red(),
            None => "keep".green(),
        };
        println!("  {:<16} {}", marker, verdict.branch.to_string().bold());
        print_evidence(verdict);
    }

    if plan.is_empty() {
        println!("{}", "Nothing to delete.".green());
    } else {
        println!("{} branch(es) to delete.", plan.len().to_string().bold());
    }
}

fn print_report(report: &ExecutionReport) {
    if report.batches.is_empty() {
        println!("No branches deleted.");
    }
    for batch in &report.batches {
        match &batch.outcome {
            BatchOutcome::Completed => println!("{} {}", "✓".green().bold(), batch),
            BatchOutcome::Declined => println!("{}", batch),
            BatchOutcome::Failed { error } => {
                println!("{} {}", "✗".red().bold(), batch);
                println!("  {} {}", "error:".red().bold(), error);
                for name in &batch.not_attempted {
                    println!("  not attempted: {}", name.yellow());
                }
            }
            BatchOutcome::Skipped => println!("{} {}", "✗".red(), batch),
        }
    }
}
