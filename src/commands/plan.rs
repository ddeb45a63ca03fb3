//! `distenv plan` - what apply would do, without doing it

use anyhow::Result;
use reconcile::{Plan, Request};
use serde::Serialize;
use std::process::ExitCode;

use super::{build_manager, display_plan};
use crate::Context;
use crate::cli::TargetArgs;
use crate::config::Config;
use crate::request::{self, FailureRecord, Tuning};

/// JSON form of a plan
#[derive(Debug, Serialize)]
pub struct PlanRecord {
    pub env_path: String,
    pub would_change: bool,
    pub to_install: Vec<String>,
    pub skipped: Vec<String>,
    pub rejected: Vec<FailureRecord>,
}

impl PlanRecord {
    pub fn new(request: &Request, plan: &Plan) -> Self {
        Self {
            env_path: request.env_dir.display().to_string(),
            would_change: plan.has_changes(),
            to_install: plan.to_install.iter().map(ToString::to_string).collect(),
            skipped: plan
                .already_satisfied
                .iter()
                .map(ToString::to_string)
                .collect(),
            rejected: plan
                .rejected()
                .map(|f| FailureRecord {
                    package: f.package.to_string(),
                    reason: f.reason.code(),
                    detail: Some(f.reason.detail()),
                })
                .collect(),
        }
    }
}

pub fn run(ctx: &Context, args: TargetArgs) -> Result<ExitCode> {
    let config = Config::load()?;
    let resolved = request::resolve(&args, Tuning::default(), &config)?;
    let manager = build_manager(&config, 1)?;

    let (current, plan) = reconcile::plan_only(&manager, &resolved.request)?;

    if args.json {
        let record = PlanRecord::new(&resolved.request, &plan);
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else if !ctx.quiet || plan.has_changes() {
        display_plan(&resolved.request, &current, &plan);
    }

    Ok(ExitCode::SUCCESS)
}
