//! Deploy command - the full pipeline.

use std::path::Path;
use tracing::info;

use crate::cli::{context, output, Overrides};
use crate::core::domain::{DnsOutcome, RunReport, StackAction};
use crate::core::pipeline::{Deployment, Options};
use crate::error::Result;

/// Deploy switches.
#[derive(Debug, Default)]
pub struct Flags {
    pub yes: bool,
    pub json: bool,
    pub image_ref: Option<String>,
    pub image_tag: Option<String>,
    pub skip_migration: bool,
    pub skip_verify: bool,
}

pub fn execute(path: &Path, overrides: &Overrides, flags: Flags) -> Result<()> {
    let mut config = context::load(path, overrides)?;
    if let Some(tag) = flags.image_tag {
        config.image.tag = tag;
    }

    let identity = context::preflight(&config, flags.image_ref.is_none())?;
    info!(identity = %identity, "deploying as");

    context::confirm(
        &format!(
            "deploy {} to {} in {}?",
            config.project.name, config.project.environment, config.project.region
        ),
        flags.yes,
    )?;

    let providers = context::connect(&config)?;
    let deployment = Deployment::new(&config, &providers).with_options(Options {
        image_ref: flags.image_ref,
        skip_migration: flags.skip_migration,
        skip_verify: flags.skip_verify,
    });

    let json = flags.json;
    let report = deployment.run_with(|stage| {
        if !json {
            output::step(stage);
        }
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    output::section("Deployed");
    output::kv("environment", &report.environment);
    output::kv("image", &report.image);
    output::kv(
        "stack",
        format!(
            "{} ({})",
            report.stack.name,
            match report.stack.action {
                StackAction::Created => "created",
                StackAction::Updated => "updated",
                StackAction::Unchanged => "unchanged",
            }
        ),
    );
    output::kv("cluster", &report.stack.outputs.cluster);
    output::kv("service", &report.stack.outputs.service);
    output::kv("endpoint", &report.stack.outputs.load_balancer_dns);

    match &report.dns {
        DnsOutcome::Skipped => {}
        DnsOutcome::CreatedByStack { fqdn } => output::kv("dns", format!("{} (stack)", fqdn)),
        DnsOutcome::Upserted { fqdn, target, .. } => {
            output::kv("dns", format!("{} → {}", fqdn, target))
        }
        DnsOutcome::UpsertFailed { fqdn, .. } => output::kv("dns", format!("{} (stale)", fqdn)),
    }

    output::section("Secrets");
    for secret in &report.secrets {
        output::kv(
            secret.name.purpose().slug(),
            format!("{:?} [{}]", secret.action, secret.fingerprint).to_lowercase(),
        );
    }

    if let Some(task) = &report.migration {
        output::success(&format!(
            "database initialized by task {} (admin: {})",
            task.task_id, task.admin_username
        ));
    }

    let passed = report.checks.iter().filter(|c| c.passed()).count();
    if !report.checks.is_empty() {
        output::kv("checks", format!("{}/{} passed", passed, report.checks.len()));
    }

    let follow_ups = report.follow_ups();
    if follow_ups.is_empty() {
        output::success("deploy complete");
    } else {
        output::section("Follow-up required");
        for item in &follow_ups {
            output::warn(item);
        }
    }
}
