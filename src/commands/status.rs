//! `distenv status` - what an environment holds

use anyhow::Result;
use colored::Colorize;
use std::process::ExitCode;

use super::build_manager;
use crate::Context;
use crate::cli::StatusArgs;
use crate::config::{self, Config};
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, args: StatusArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let manager = build_manager(&config, config::DEFAULT_RETRIES)?;
    let env_dir = paths::expand_path(&args.path);

    let current = reconcile::inspect(&manager, &env_dir)?;
    let packages = current.sorted();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&packages)?);
        return Ok(ExitCode::SUCCESS);
    }

    ui::header(&format!("Environment {}", env_dir.display()));
    let deployed = manager.client().is_deployed(&env_dir);
    ui::kv(
        "LuaDist",
        &if deployed {
            "deployed".green().to_string()
        } else {
            "not deployed".yellow().to_string()
        },
    );
    ui::kv("Packages", &packages.len().to_string());

    if packages.is_empty() {
        if !ctx.quiet {
            println!();
            ui::dim("No packages installed");
        }
        return Ok(ExitCode::SUCCESS);
    }

    println!();
    let width = packages.iter().map(|p| p.name.as_str().len()).max().unwrap_or(0);
    for package in packages {
        println!(
            "  {:width$}  {:<7} {}",
            package.name.as_str(),
            package.kind.to_string().cyan(),
            package.version.as_deref().unwrap_or("-").dimmed(),
        );
    }

    Ok(ExitCode::SUCCESS)
}
