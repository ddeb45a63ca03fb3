//! `distenv apply` - make an environment hold the requested packages

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use super::{build_manager, can_prompt, display_plan, exit_code};
use crate::Context;
use crate::cli::ApplyArgs;
use crate::commands::plan::PlanRecord;
use crate::config::Config;
use crate::progress::InstallProgress;
use crate::request::{self, ReconcileResult, Tuning};
use crate::ui;

pub fn run(ctx: &Context, args: ApplyArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let tuning = Tuning {
        jobs: args.jobs,
        timeout_secs: args.timeout,
        retries: args.retries,
    };
    let resolved = request::resolve(&args.target, tuning, &config)?;
    let manager = build_manager(&config, resolved.retries)?;
    let json = args.target.json;

    let (current, plan) = reconcile::plan_only(&manager, &resolved.request)?;

    if !json && !ctx.quiet {
        display_plan(&resolved.request, &current, &plan);
    }

    if args.dry_run {
        if json {
            let record = PlanRecord::new(&resolved.request, &plan);
            println!("{}", serde_json::to_string_pretty(&record)?);
        } else {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let prompt = plan.has_changes() && !args.yes && !json && can_prompt();
    if prompt && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(ExitCode::SUCCESS);
    }

    let progress = InstallProgress::new(json || ctx.quiet);
    let result = reconcile::apply_plan(
        &manager,
        &resolved.request,
        &plan,
        &resolved.options,
        &progress,
    )?;

    if json {
        let record = ReconcileResult::new(&result, &resolved.request.env_dir);
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        print_summary(&result, ctx.verbose > 0);
    }

    Ok(exit_code(&result))
}

fn print_summary(result: &reconcile::ReconciliationResult, show_commands: bool) {
    println!();
    for message in &result.messages {
        ui::info(message);
    }
    if show_commands {
        for command in &result.commands {
            ui::dim(command);
        }
    }

    if result.changed {
        ui::success(&format!(
            "Installed {}",
            ui::count(result.installed.len(), "package")
        ));
    } else if result.failed.is_empty() {
        ui::success("Environment already up to date");
    }

    if !result.skipped.is_empty() {
        ui::dim(&format!("{} already installed", ui::count(result.skipped.len(), "package")));
    }

    if !result.failed.is_empty() {
        ui::warn(&format!("{} failed:", ui::count(result.failed.len(), "package")));
        for failure in &result.failed {
            ui::kv(failure.package.as_str(), &failure.reason.to_string());
        }
        if result.failed.iter().any(|f| f.reason.is_timeout()) {
            ui::dim("Slow builds can be given more time with --timeout or install_timeout_secs");
        }
    }
}

fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Continue?")
        .default(true)
        .interact()?;

    Ok(confirmed)
}
