//! Plan command - read-only probes.

use std::path::Path;

use crate::cli::{context, output, Overrides};
use crate::core::pipeline::Deployment;
use crate::core::stack::Verb;
use crate::error::Result;

/// Show the stack verb, DNS decision and secret actions a deploy would take.
pub fn execute(path: &Path, overrides: &Overrides, json: bool) -> Result<()> {
    let config = context::load(path, overrides)?;
    context::preflight(&config, false)?;
    let providers = context::connect(&config)?;

    let plan = Deployment::new(&config, &providers).plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    output::section("Topology");
    output::kv("network", &plan.topology.network_id);
    output::kv("subnets", plan.topology.subnet_ids.join(", "));
    output::kv("public", plan.topology.public_subnet_ids.join(", "));
    if plan.topology.network_fallback {
        output::warn("tagged network not found; using first network in region");
    }
    if plan.topology.public_fallback {
        output::warn("no public subnets flagged; using first subnets");
    }

    output::section("Stack");
    output::kv("name", &plan.stack);
    output::kv("status", &plan.probe.status);
    output::kv(
        "action",
        match plan.probe.verb {
            Verb::Create => "create",
            Verb::Update => "update",
        },
    );

    output::section("Secrets");
    for (name, action) in &plan.secrets {
        output::kv(name.purpose().slug(), format!("{:?}", action).to_lowercase());
    }

    if let Some(decision) = &plan.dns {
        output::section("DNS");
        output::kv("record", &decision.fqdn);
        output::kv("zone", &decision.zone);
        match decision.current_target() {
            Some(target) => output::kv("current", target),
            None => output::kv("current", "none"),
        }
        output::kv(
            "action",
            if decision.create_via_template() {
                "created by stack"
            } else {
                "upsert after stack"
            },
        );
    }
    Ok(())
}
