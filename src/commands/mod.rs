pub mod apply;
pub mod plan;
pub mod status;

use anyhow::Result;
use colored::Colorize;
use distkit::{Client, RetryConfig};
use reconcile::{CurrentState, Plan, ReconciliationResult, Request};
use std::io::IsTerminal;
use std::process::ExitCode;
use std::time::Duration;

use crate::config::Config;
use crate::manager::LuaDistManager;
use crate::ui;

/// Exit status when some packages failed but the pass completed
pub const EXIT_PARTIAL_FAILURE: u8 = 2;

/// Build the LuaDist-backed manager from the user config
pub fn build_manager(config: &Config, retries: u32) -> Result<LuaDistManager> {
    let retry = RetryConfig::new(retries, Duration::from_secs(5), 2.0);
    let client = Client::new(config.backend_config()?).with_retry(retry);
    Ok(LuaDistManager::new(client))
}

/// Map a finished pass to an exit status
pub fn exit_code(result: &ReconciliationResult) -> ExitCode {
    if result.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_PARTIAL_FAILURE)
    }
}

/// Whether a confirmation prompt can be shown
pub fn can_prompt() -> bool {
    std::io::stdin().is_terminal() && std::io::stdout().is_terminal()
}

/// Print a plan in the boxed diff style
pub fn display_plan(request: &Request, current: &CurrentState, plan: &Plan) {
    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        "Package Plan".bold()
    );
    println!("│");
    println!("│ {} {}", "Environment:".dimmed(), request.env_dir.display());
    println!("│ {} {}", "Repository:".dimmed(), request.repo);
    println!("│ {} {}", "Allowed dists:".dimmed(), request.policy);
    println!("│");

    for name in &plan.already_satisfied {
        let detail = current
            .get(name)
            .map(|p| match &p.version {
                Some(v) => format!("{} {v}", p.kind),
                None => p.kind.to_string(),
            })
            .unwrap_or_default();
        println!("│   {} {name} {}", "=".dimmed(), format!("({detail})").dimmed());
    }
    for name in &plan.to_install {
        println!("│   {} {name} {}", "+".green(), "(not installed)".dimmed());
    }
    for failure in plan.rejected() {
        println!(
            "│   {} {} {}",
            "✗".red(),
            failure.package,
            format!("({})", failure.reason).dimmed()
        );
    }

    println!("│");
    println!("└───────────────────────────────────────────────────────┘");

    if !plan.has_changes() {
        println!();
        println!("  {} No changes needed", "✓".green());
    } else {
        ui::dim(&format!(
            "{} to install",
            ui::count(plan.to_install.len(), "package")
        ));
    }
}
