//! The deployment pipeline.
//!
//! Topology → secrets → image → DNS precheck → stack → DNS upsert →
//! service rollout → migration task → smoke checks. Strictly sequential; the
//! first stage error aborts everything after it and nothing earlier is undone.

use std::fmt;
use tracing::{info, warn};

use crate::core::config::Config;
use crate::core::domain::{
    Check, DnsDecision, DnsOutcome, NetworkPlacement, Purpose, RunReport, SecretAction,
    SecretName, StackAction, StackOutputs, StackResult, StackStatus, TaskOutcome, Topology,
};
use crate::core::migrate::{self, MigrationSpec};
use crate::core::provider::Providers;
use crate::core::stack::{self, Probe, StackInputs};
use crate::core::vault::{self, EnsuredSecret};
use crate::core::{dns, image, topology, verify};
use crate::error::{PreconditionError, Result, TopologyError};

/// Stage boundaries, announced as each begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Topology,
    Secrets,
    Image,
    DnsPrecheck,
    Stack,
    DnsUpsert,
    Rollout,
    Migration,
    Verify,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Topology => "resolving network topology",
            Stage::Secrets => "provisioning secrets",
            Stage::Image => "publishing image",
            Stage::DnsPrecheck => "checking dns",
            Stage::Stack => "applying stack",
            Stage::DnsUpsert => "updating dns",
            Stage::Rollout => "rolling service",
            Stage::Migration => "running migration task",
            Stage::Verify => "running smoke checks",
        })
    }
}

/// Switches for partial runs.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Deploy this image instead of building one.
    pub image_ref: Option<String>,
    pub skip_migration: bool,
    pub skip_verify: bool,
}

/// Read-only view of what a run would do.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Plan {
    pub stack: String,
    pub probe: Probe,
    pub topology: Topology,
    pub secrets: Vec<(SecretName, SecretAction)>,
    pub dns: Option<DnsDecision>,
}

/// One deployment of one environment.
pub struct Deployment<'a> {
    config: &'a Config,
    providers: &'a Providers,
    options: Options,
}

impl<'a> Deployment<'a> {
    pub fn new(config: &'a Config, providers: &'a Providers) -> Self {
        Self {
            config,
            providers,
            options: Options::default(),
        }
    }

    pub fn with_options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Probe everything a run reads, without mutating.
    pub fn plan(&self) -> Result<Plan> {
        let config = self.config;
        stack::check_template(&config.stack.template)?;

        let topology = self.topology()?;
        let stack_name = config.stack_name();
        let probe = stack::probe(self.providers.infra.as_ref(), &stack_name)?;

        let table = config.policy_table();
        let secrets = Purpose::ALL
            .iter()
            .map(|&purpose| {
                let name = self.secret_name(purpose)?;
                let action =
                    vault::decide(self.providers.secrets.as_ref(), &name, &table.policy(purpose))?;
                Ok((name, action))
            })
            .collect::<Result<Vec<_>>>()?;

        let dns = match config.domain_spec() {
            Some(spec) => Some(dns::precheck(self.providers.dns.as_ref(), &spec)?),
            None => None,
        };

        Ok(Plan {
            stack: stack_name,
            probe,
            topology,
            secrets,
            dns,
        })
    }

    /// Run every stage in order.
    pub fn run(&self) -> Result<RunReport> {
        self.run_with(|_| {})
    }

    /// Run every stage in order, calling `notify` as each begins.
    pub fn run_with(&self, mut notify: impl FnMut(Stage)) -> Result<RunReport> {
        let config = self.config;
        let p = self.providers;
        let environment = &config.project.environment;
        let stack_name = config.stack_name();

        stack::check_template(&config.stack.template)?;

        notify(Stage::Topology);
        let topology = self.topology()?;
        // The only existence probe of the run.
        let probe = stack::probe(p.infra.as_ref(), &stack_name)?;

        notify(Stage::Secrets);
        let secrets = vault::provision(
            p.secrets.as_ref(),
            &config.policy_table(),
            &config.project.name,
            environment,
        )?;

        notify(Stage::Image);
        let image = match &self.options.image_ref {
            Some(reference) => {
                info!(image = %reference, "using supplied image");
                reference.clone()
            }
            None => image::publish(p.registry.as_ref(), &config.image_spec())?,
        };

        let domain = config.domain_spec();
        let decision = match &domain {
            Some(spec) => {
                notify(Stage::DnsPrecheck);
                Some(dns::precheck(p.dns.as_ref(), spec)?)
            }
            None => None,
        };

        notify(Stage::Stack);
        let secret_names: Vec<SecretName> = secrets.iter().map(|s| s.name.clone()).collect();
        let params = stack::parameters(&StackInputs {
            environment,
            topology: &topology,
            image: &image,
            secrets: &secret_names,
            dns: decision.as_ref(),
            extra: &config.stack.parameters,
        });
        let tags = stack::tags(&config.project.name, environment, &config.stack.tags);
        let stack = stack::apply(
            p.infra.as_ref(),
            &stack_name,
            &probe,
            &config.stack.template,
            &params,
            &tags,
        )?;

        let dns_outcome = match (&decision, &domain) {
            (Some(decision), Some(spec)) => {
                notify(Stage::DnsUpsert);
                dns::reconcile(
                    p.dns.as_ref(),
                    decision,
                    &stack.outputs.load_balancer_dns,
                    spec.ttl,
                )
            }
            _ => DnsOutcome::Skipped,
        };

        let migration = if config.migration.enabled && !self.options.skip_migration {
            notify(Stage::Rollout);
            migrate::redeploy(p.compute.as_ref(), &stack.outputs.cluster, &stack.outputs.service)?;
            notify(Stage::Migration);
            Some(self.migrate(&topology, &stack)?)
        } else {
            info!("migration task skipped");
            None
        };

        let checks = if config.verify.enabled && !self.options.skip_verify {
            notify(Stage::Verify);
            self.verify_with(&stack, admin_password(&secrets))
        } else {
            Vec::new()
        };

        let report = RunReport {
            environment: environment.clone(),
            topology,
            secrets: secrets.iter().map(EnsuredSecret::report).collect(),
            image,
            stack,
            dns: dns_outcome,
            migration,
            checks,
        };
        for item in report.follow_ups() {
            warn!(follow_up = %item, "operator follow-up required");
        }
        Ok(report)
    }

    /// Run only the migration task against an existing stack.
    ///
    /// Waits for the service to settle first but never forces a new deployment.
    pub fn migrate_only(&self) -> Result<TaskOutcome> {
        let topology = self.topology()?;
        let stack = self.existing_stack()?;
        let outputs = &stack.outputs;
        info!(
            cluster = %outputs.cluster,
            service = %outputs.service,
            "waiting for service to settle"
        );
        self.providers
            .compute
            .wait_service_stable(&outputs.cluster, &outputs.service)?;
        self.migrate(&topology, &stack)
    }

    /// Run only the smoke checks against an existing stack.
    ///
    /// Reads the administrator password; never writes it.
    pub fn verify_only(&self) -> Result<Vec<Check>> {
        let stack = self.existing_stack()?;
        let name = self.secret_name(Purpose::AdminPassword)?;
        let password = self.providers.secrets.get(&name)?;
        Ok(self.verify_with(&stack, Some(password.as_str())))
    }

    /// Outputs of a stack that must already exist.
    pub fn existing_stack(&self) -> Result<StackResult> {
        let name = self.config.stack_name();
        let infra = self.providers.infra.as_ref();
        let status = infra.describe_stack(&name)?;
        if status == StackStatus::Absent {
            return Err(PreconditionError::StackMissing(name).into());
        }
        let outputs = StackOutputs::from_map(&name, infra.get_outputs(&name)?)?;
        Ok(StackResult {
            name,
            action: StackAction::Unchanged,
            status,
            outputs,
        })
    }

    fn topology(&self) -> Result<Topology> {
        topology::resolve(
            self.providers.network.as_ref(),
            &self.config.project.region,
            &self.config.network_preferences(),
        )
    }

    fn secret_name(&self, purpose: Purpose) -> Result<SecretName> {
        SecretName::new(
            &self.config.project.name,
            &self.config.project.environment,
            purpose,
        )
    }

    fn migrate(&self, topology: &Topology, stack: &StackResult) -> Result<TaskOutcome> {
        let config = self.config;
        if topology.subnet_ids.is_empty() {
            return Err(TopologyError::NoSubnets(topology.network_id.clone()).into());
        }
        let subnets = if config.network.assign_public_ip {
            topology.public_subnet_ids.clone()
        } else {
            topology.subnet_ids.clone()
        };
        let spec = MigrationSpec {
            container: config.service.container.clone(),
            command: config.migration.command.clone(),
            admin_username: config.migration.admin_username.clone(),
            log_group: config.migration.log_group.clone(),
            placement: NetworkPlacement {
                subnets,
                security_groups: vec![stack.outputs.security_group.clone()],
                assign_public_ip: config.network.assign_public_ip,
            },
        };
        migrate::run_once(
            self.providers.compute.as_ref(),
            &stack.outputs.cluster,
            &stack.outputs.service,
            &spec,
        )
    }

    fn verify_with(
        &self,
        stack: &StackResult,
        password: Option<&str>,
    ) -> Vec<Check> {
        let spec = self.config.verify_spec();
        let base = verify::base_url(&spec.scheme, &stack.outputs.load_balancer_dns);
        verify::smoke(
            self.providers.probe.as_ref(),
            &base,
            &spec,
            &self.config.migration.admin_username,
            password.unwrap_or_default(),
        )
    }
}

fn admin_password(secrets: &[EnsuredSecret]) -> Option<&str> {
    secrets
        .iter()
        .find(|s| s.name.purpose() == Purpose::AdminPassword)
        .map(|s| s.value.as_str())
}
