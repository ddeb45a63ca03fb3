//! Reconciliation reporter - folds plan and install outcomes into a result

use crate::executor::InstallReport;
use crate::planner::Plan;
use crate::types::{DesiredState, Failure, InstallOutcome, PackageName, ReconciliationResult};
use std::collections::HashMap;

/// Build the result of a pass.
///
/// Every desired package lands in exactly one of `installed`, `skipped` or
/// `failed`, in desired order. `changed` follows `installed` alone, so a
/// partial failure never hides the packages that did get installed.
pub fn report(desired: &DesiredState, plan: &Plan, installs: InstallReport) -> ReconciliationResult {
    let mut outcomes: HashMap<PackageName, Outcome> = HashMap::new();

    for name in &plan.already_satisfied {
        outcomes.insert(name.clone(), Outcome::Skipped);
    }
    for failure in plan.rejected() {
        outcomes.insert(failure.package.clone(), Outcome::Failed(failure.clone()));
    }
    for (name, outcome) in installs.results {
        let outcome = match outcome {
            InstallOutcome::Success => Outcome::Installed,
            InstallOutcome::Failed(reason) => Outcome::Failed(Failure {
                package: name.clone(),
                reason,
            }),
        };
        outcomes.insert(name, outcome);
    }

    let mut result = ReconciliationResult::default();
    for name in desired.iter() {
        match outcomes.remove(name) {
            Some(Outcome::Installed) => result.installed.push(name.clone()),
            Some(Outcome::Skipped) => result.skipped.push(name.clone()),
            Some(Outcome::Failed(failure)) => result.failed.push(failure),
            None => log::debug!("{name}: planned but not attempted"),
        }
    }

    result.changed = !result.installed.is_empty();
    if installs.environment_created {
        result.messages.push("created package environment".to_string());
    }
    result.commands = installs.commands;
    result
}

enum Outcome {
    Installed,
    Skipped,
    Failed(Failure),
}
