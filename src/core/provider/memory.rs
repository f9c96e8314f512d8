//! In-memory cloud for testing.
//!
//! Implements every provider trait over shared state and records each call in
//! a journal, so tests can assert which verbs were submitted and in what
//! order. Clones share state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::Rc;

use zeroize::Zeroizing;

use super::{
    ComputeOrchestrator, DnsProvider, HttpProbe, InfraProvider, NetworkProvider, Providers,
    Registry, SecretStore,
};
use crate::core::constants;
use crate::core::domain::{
    normalize_name, CommandOverride, DnsRecord, NetworkPlacement, SecretName, ServiceState,
    StackStatus, Subnet, TaskState, UpdateOutcome,
};
use crate::core::types::{Outputs, Parameters, Tags, TaskId};
use crate::error::{
    DnsError, ImageError, PreconditionError, ProviderError, Result, VaultError,
};

/// A recorded provider call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SecretDescribe(String),
    SecretGet(String),
    SecretPut(String),
    FindNetwork(String),
    ListNetworks,
    ListSubnets(String),
    DescribeStack(String),
    CreateStack { name: String, params: Parameters },
    UpdateStack { name: String, params: Parameters },
    WaitStack(String),
    GetOutputs(String),
    DescribeService { cluster: String, service: String },
    UpdateService { cluster: String, service: String, force: bool },
    WaitServiceStable { cluster: String, service: String },
    RunTask { cluster: String, task_definition: String, command: Vec<String> },
    WaitTaskStopped(String),
    DescribeTask(String),
    FindZone(String),
    ListRecords { zone: String, name: String },
    UpsertRecord { zone: String, record: DnsRecord },
    EnsureRepository(String),
    Login(String),
    Build(String),
    Push { local: String, remote: String },
    HttpGet(String),
    HttpPost(String),
}

/// Account id used in generated registry URIs.
pub const ACCOUNT: &str = "123456789012";

#[derive(Debug, Default)]
struct Stack {
    status: StackStatus,
    params: Parameters,
}

#[derive(Debug, Default)]
struct State {
    secrets: BTreeMap<String, Option<String>>,
    vault_down: bool,
    networks: Vec<(String, Tags)>,
    subnets: BTreeMap<String, Vec<Subnet>>,
    stacks: BTreeMap<String, Stack>,
    stack_fails: bool,
    stack_unchanged: bool,
    outputs: Outputs,
    service_unstable: bool,
    task_definition: String,
    task_exit: Option<i32>,
    tasks: BTreeMap<String, TaskState>,
    zones: BTreeMap<String, String>,
    records: BTreeMap<String, Vec<DnsRecord>>,
    upsert_fails: bool,
    push_fails: bool,
    http: BTreeMap<String, u16>,
    calls: Vec<Call>,
}

/// In-memory implementation of every provider.
#[derive(Debug, Clone, Default)]
pub struct MemoryCloud {
    state: Rc<RefCell<State>>,
}

impl MemoryCloud {
    /// An empty cloud: no networks, secrets, stacks, or zones.
    pub fn new() -> Self {
        Self::default()
    }

    /// A cloud shaped like a typical target account.
    ///
    /// - network `vpc-main` tagged `Name=main`, two public and two private subnets
    /// - zone `Z0EXAMPLE` for `example.com`
    /// - stacks expose cluster `prod-cluster`, service `api-service`,
    ///   load balancer `new-lb.elb.amazonaws.com`, security group `sg-ecs`
    /// - service stable, migration task exits 0, every probe answers 200
    pub fn standard() -> Self {
        let cloud = Self::new()
            .with_network("vpc-main", &[(constants::NETWORK_TAG_KEY, "main")])
            .with_subnets(
                "vpc-main",
                &[
                    ("subnet-pub-a", true),
                    ("subnet-pub-b", true),
                    ("subnet-priv-a", false),
                    ("subnet-priv-b", false),
                ],
            )
            .with_zone("example.com", "Z0EXAMPLE");
        {
            let mut s = cloud.state.borrow_mut();
            s.outputs = [
                (constants::OUTPUT_CLUSTER, "prod-cluster"),
                (constants::OUTPUT_SERVICE, "api-service"),
                (constants::OUTPUT_LOAD_BALANCER, "new-lb.elb.amazonaws.com"),
                (constants::OUTPUT_SECURITY_GROUP, "sg-ecs"),
            ]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
            s.task_definition = "api-task:1".to_string();
            s.task_exit = Some(0);
        }
        cloud
    }

    /// Boxed providers sharing this cloud's state.
    pub fn providers(&self) -> Providers {
        Providers {
            secrets: Box::new(self.clone()),
            network: Box::new(self.clone()),
            infra: Box::new(self.clone()),
            compute: Box::new(self.clone()),
            dns: Box::new(self.clone()),
            registry: Box::new(self.clone()),
            probe: Box::new(self.clone()),
        }
    }

    pub fn with_network(self, id: &str, tags: &[(&str, &str)]) -> Self {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state.borrow_mut().networks.push((id.to_string(), tags));
        self
    }

    pub fn with_subnets(self, network: &str, subnets: &[(&str, bool)]) -> Self {
        let subnets = subnets
            .iter()
            .map(|(id, public)| Subnet {
                id: id.to_string(),
                public: *public,
            })
            .collect();
        self.state
            .borrow_mut()
            .subnets
            .insert(network.to_string(), subnets);
        self
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .secrets
            .insert(name.to_string(), Some(value.to_string()));
        self
    }

    /// A secret that exists but cannot be read as text.
    pub fn with_malformed_secret(self, name: &str) -> Self {
        self.state.borrow_mut().secrets.insert(name.to_string(), None);
        self
    }

    pub fn vault_unreachable(self) -> Self {
        self.state.borrow_mut().vault_down = true;
        self
    }

    pub fn with_stack(self, name: &str, status: StackStatus) -> Self {
        self.state.borrow_mut().stacks.insert(
            name.to_string(),
            Stack {
                status,
                params: Parameters::new(),
            },
        );
        self
    }

    /// The next submitted change lands in a failed state.
    pub fn stack_fails(self) -> Self {
        self.state.borrow_mut().stack_fails = true;
        self
    }

    /// Updates report that nothing changed.
    pub fn stack_unchanged(self) -> Self {
        self.state.borrow_mut().stack_unchanged = true;
        self
    }

    pub fn without_output(self, key: &str) -> Self {
        self.state.borrow_mut().outputs.remove(key);
        self
    }

    pub fn with_zone(self, domain: &str, zone: &str) -> Self {
        self.state
            .borrow_mut()
            .zones
            .insert(normalize_name(domain), zone.to_string());
        self
    }

    pub fn with_record(self, zone: &str, name: &str, value: &str) -> Self {
        self.state
            .borrow_mut()
            .records
            .entry(zone.to_string())
            .or_default()
            .push(DnsRecord {
                name: normalize_name(name),
                record_type: constants::DNS_RECORD_TYPE.to_string(),
                value: value.to_string(),
                ttl: Some(constants::DNS_TTL),
            });
        self
    }

    pub fn upsert_fails(self) -> Self {
        self.state.borrow_mut().upsert_fails = true;
        self
    }

    pub fn service_unstable(self) -> Self {
        self.state.borrow_mut().service_unstable = true;
        self
    }

    /// Exit code the migration container reports; `None` for a container
    /// that never started.
    pub fn task_exit(self, code: Option<i32>) -> Self {
        self.state.borrow_mut().task_exit = code;
        self
    }

    pub fn push_fails(self) -> Self {
        self.state.borrow_mut().push_fails = true;
        self
    }

    /// Status returned for URLs ending in `suffix`.
    pub fn http_status(self, suffix: &str, status: u16) -> Self {
        self.state
            .borrow_mut()
            .http
            .insert(suffix.to_string(), status);
        self
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    /// Number of calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.borrow().calls.iter().filter(|c| pred(c)).count()
    }

    /// Position of the first call matching `pred`.
    pub fn position(&self, pred: impl Fn(&Call) -> bool) -> Option<usize> {
        self.state.borrow().calls.iter().position(pred)
    }

    pub fn secret(&self, name: &str) -> Option<String> {
        self.state.borrow().secrets.get(name).cloned().flatten()
    }

    pub fn stack_status(&self, name: &str) -> StackStatus {
        self.state
            .borrow()
            .stacks
            .get(name)
            .map(|s| s.status.clone())
            .unwrap_or(StackStatus::Absent)
    }

    pub fn records(&self, zone: &str) -> Vec<DnsRecord> {
        self.state
            .borrow()
            .records
            .get(zone)
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: Call) {
        self.state.borrow_mut().calls.push(call);
    }

    fn check_vault(&self, name: &str) -> Result<()> {
        if self.state.borrow().vault_down {
            return Err(VaultError::Unreachable {
                name: name.to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

impl SecretStore for MemoryCloud {
    fn describe(&self, name: &SecretName) -> Result<bool> {
        let id = name.to_string();
        self.record(Call::SecretDescribe(id.clone()));
        self.check_vault(&id)?;
        Ok(self.state.borrow().secrets.contains_key(&id))
    }

    fn get(&self, name: &SecretName) -> Result<Zeroizing<String>> {
        let id = name.to_string();
        self.record(Call::SecretGet(id.clone()));
        self.check_vault(&id)?;
        match self.state.borrow().secrets.get(&id) {
            Some(Some(value)) => Ok(Zeroizing::new(value.clone())),
            Some(None) => Err(VaultError::Malformed {
                name: id,
                reason: "binary secret".to_string(),
            }
            .into()),
            None => Err(VaultError::NotFound(id).into()),
        }
    }

    fn put(&self, name: &SecretName, value: &str, _description: &str) -> Result<()> {
        let id = name.to_string();
        self.record(Call::SecretPut(id.clone()));
        self.check_vault(&id)?;
        self.state
            .borrow_mut()
            .secrets
            .insert(id, Some(value.to_string()));
        Ok(())
    }
}

impl NetworkProvider for MemoryCloud {
    fn find_network(&self, key: &str, value: &str) -> Result<Option<String>> {
        self.record(Call::FindNetwork(format!("{}={}", key, value)));
        Ok(self
            .state
            .borrow()
            .networks
            .iter()
            .find(|(_, tags)| tags.get(key).map(String::as_str) == Some(value))
            .map(|(id, _)| id.clone()))
    }

    fn list_networks(&self) -> Result<Vec<String>> {
        self.record(Call::ListNetworks);
        Ok(self
            .state
            .borrow()
            .networks
            .iter()
            .map(|(id, _)| id.clone())
            .collect())
    }

    fn list_subnets(&self, network_id: &str) -> Result<Vec<Subnet>> {
        self.record(Call::ListSubnets(network_id.to_string()));
        Ok(self
            .state
            .borrow()
            .subnets
            .get(network_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl InfraProvider for MemoryCloud {
    fn describe_stack(&self, name: &str) -> Result<StackStatus> {
        self.record(Call::DescribeStack(name.to_string()));
        Ok(self.stack_status(name))
    }

    fn create_stack(
        &self,
        name: &str,
        _template: &Path,
        params: &Parameters,
        _tags: &Tags,
    ) -> Result<()> {
        self.record(Call::CreateStack {
            name: name.to_string(),
            params: params.clone(),
        });
        self.state.borrow_mut().stacks.insert(
            name.to_string(),
            Stack {
                status: StackStatus::Creating,
                params: params.clone(),
            },
        );
        Ok(())
    }

    fn update_stack(
        &self,
        name: &str,
        _template: &Path,
        params: &Parameters,
        _tags: &Tags,
    ) -> Result<UpdateOutcome> {
        self.record(Call::UpdateStack {
            name: name.to_string(),
            params: params.clone(),
        });
        let mut s = self.state.borrow_mut();
        if s.stack_unchanged {
            return Ok(UpdateOutcome::NoChanges);
        }
        let stack = s.stacks.entry(name.to_string()).or_default();
        stack.status = StackStatus::Updating;
        stack.params = params.clone();
        Ok(UpdateOutcome::Submitted)
    }

    fn wait_terminal(&self, name: &str) -> Result<StackStatus> {
        self.record(Call::WaitStack(name.to_string()));
        let mut s = self.state.borrow_mut();
        let fails = s.stack_fails;
        let lb = s.outputs.get(constants::OUTPUT_LOAD_BALANCER).cloned();

        let Some(stack) = s.stacks.get_mut(name) else {
            return Ok(StackStatus::Absent);
        };
        stack.status = match (&stack.status, fails) {
            (StackStatus::Creating, false) => StackStatus::CreateComplete,
            (StackStatus::Creating, true) => StackStatus::CreateFailed,
            (StackStatus::Updating, false) => StackStatus::UpdateComplete,
            (StackStatus::Updating, true) => StackStatus::UpdateFailed,
            (other, _) => other.clone(),
        };
        let status = stack.status.clone();

        // The template owns the record when asked to create it.
        let template_record = match (
            stack.params.get(constants::PARAM_CREATE_DNS).map(String::as_str),
            stack.params.get(constants::PARAM_ZONE),
            stack.params.get(constants::PARAM_DOMAIN),
        ) {
            (Some("true"), Some(zone), Some(domain)) if status.is_complete() => {
                Some((zone.clone(), domain.clone()))
            }
            _ => None,
        };
        if let (Some((zone, domain)), Some(lb)) = (template_record, lb) {
            s.records.entry(zone).or_default().push(DnsRecord {
                name: normalize_name(&domain),
                record_type: constants::DNS_RECORD_TYPE.to_string(),
                value: lb,
                ttl: Some(constants::DNS_TTL),
            });
        }
        Ok(status)
    }

    fn get_outputs(&self, name: &str) -> Result<Outputs> {
        self.record(Call::GetOutputs(name.to_string()));
        Ok(self.state.borrow().outputs.clone())
    }
}

impl MemoryCloud {
    fn service_state(&self) -> ServiceState {
        let s = self.state.borrow();
        ServiceState {
            running: if s.service_unstable { 1 } else { 2 },
            desired: 2,
            task_definition: s.task_definition.clone(),
        }
    }
}

impl ComputeOrchestrator for MemoryCloud {
    fn describe_service(&self, cluster: &str, service: &str) -> Result<ServiceState> {
        self.record(Call::DescribeService {
            cluster: cluster.to_string(),
            service: service.to_string(),
        });
        Ok(self.service_state())
    }

    fn update_service(
        &self,
        cluster: &str,
        service: &str,
        force_new_deployment: bool,
    ) -> Result<()> {
        self.record(Call::UpdateService {
            cluster: cluster.to_string(),
            service: service.to_string(),
            force: force_new_deployment,
        });
        Ok(())
    }

    fn wait_service_stable(&self, cluster: &str, service: &str) -> Result<()> {
        self.record(Call::WaitServiceStable {
            cluster: cluster.to_string(),
            service: service.to_string(),
        });
        let state = self.service_state();
        if !state.is_stable() {
            return Err(PreconditionError::ServiceUnstable {
                cluster: cluster.to_string(),
                service: service.to_string(),
                running: state.running,
                desired: state.desired,
            }
            .into());
        }
        Ok(())
    }

    fn run_task(
        &self,
        cluster: &str,
        task_definition: &str,
        command: &CommandOverride,
        _placement: &NetworkPlacement,
    ) -> Result<TaskId> {
        self.record(Call::RunTask {
            cluster: cluster.to_string(),
            task_definition: task_definition.to_string(),
            command: command.command.clone(),
        });
        let mut s = self.state.borrow_mut();
        let id = format!("task-{:04}", s.tasks.len() + 1);
        s.tasks.insert(id.clone(), TaskState::Running);
        Ok(id)
    }

    fn wait_task_stopped(&self, _cluster: &str, task_id: &str) -> Result<()> {
        self.record(Call::WaitTaskStopped(task_id.to_string()));
        let mut s = self.state.borrow_mut();
        let exit_code = s.task_exit;
        if let Some(task) = s.tasks.get_mut(task_id) {
            *task = TaskState::Stopped {
                exit_code,
                reason: exit_code
                    .is_none()
                    .then(|| "CannotPullContainerError".to_string()),
            };
        }
        Ok(())
    }

    fn describe_task(
        &self,
        _cluster: &str,
        task_id: &str,
        _container: &str,
    ) -> Result<TaskState> {
        self.record(Call::DescribeTask(task_id.to_string()));
        self.state
            .borrow()
            .tasks
            .get(task_id)
            .cloned()
            .ok_or_else(|| {
                ProviderError::Response {
                    command: "describe-task".to_string(),
                    reason: format!("task {} not found", task_id),
                }
                .into()
            })
    }
}

impl DnsProvider for MemoryCloud {
    fn find_zone(&self, domain: &str) -> Result<Option<String>> {
        self.record(Call::FindZone(domain.to_string()));
        let domain = normalize_name(domain);
        Ok(self
            .state
            .borrow()
            .zones
            .iter()
            .filter(|(name, _)| domain == **name || domain.ends_with(&format!(".{}", name)))
            .max_by_key(|(name, _)| name.len())
            .map(|(_, id)| id.clone()))
    }

    fn list_records(&self, zone: &str, name: &str) -> Result<Vec<DnsRecord>> {
        self.record(Call::ListRecords {
            zone: zone.to_string(),
            name: name.to_string(),
        });
        let wanted = normalize_name(name);
        Ok(self
            .records(zone)
            .into_iter()
            .filter(|r| r.name == wanted)
            .collect())
    }

    fn upsert_record(&self, zone: &str, record: &DnsRecord) -> Result<()> {
        self.record(Call::UpsertRecord {
            zone: zone.to_string(),
            record: record.clone(),
        });
        let mut s = self.state.borrow_mut();
        if s.upsert_fails {
            return Err(DnsError::UpsertFailed {
                zone: zone.to_string(),
                fqdn: record.name.clone(),
                reason: "Throttling: Rate exceeded".to_string(),
            }
            .into());
        }
        let records = s.records.entry(zone.to_string()).or_default();
        let name = normalize_name(&record.name);
        records.retain(|r| r.name != name);
        records.push(DnsRecord {
            name,
            ..record.clone()
        });
        Ok(())
    }
}

impl Registry for MemoryCloud {
    fn ensure_repository(&self, repository: &str) -> Result<String> {
        self.record(Call::EnsureRepository(repository.to_string()));
        Ok(format!(
            "{}.dkr.ecr.us-east-1.amazonaws.com/{}",
            ACCOUNT, repository
        ))
    }

    fn login(&self, registry: &str) -> Result<()> {
        self.record(Call::Login(registry.to_string()));
        Ok(())
    }

    fn build(
        &self,
        _context: &Path,
        _dockerfile: &Path,
        local_ref: &str,
        _platform: &str,
    ) -> Result<()> {
        self.record(Call::Build(local_ref.to_string()));
        Ok(())
    }

    fn push(&self, local_ref: &str, remote_ref: &str) -> Result<String> {
        self.record(Call::Push {
            local: local_ref.to_string(),
            remote: remote_ref.to_string(),
        });
        if self.state.borrow().push_fails {
            return Err(ImageError::Push {
                image: remote_ref.to_string(),
                reason: "denied: not authorized".to_string(),
            }
            .into());
        }
        let repository = remote_ref
            .rsplit_once(':')
            .filter(|(_, tag)| !tag.contains('/'))
            .map(|(repo, _)| repo)
            .unwrap_or(remote_ref);
        Ok(format!("{}@sha256:{}", repository, "ab".repeat(32)))
    }
}

impl MemoryCloud {
    fn status_for(&self, url: &str) -> u16 {
        self.state
            .borrow()
            .http
            .iter()
            .find(|(suffix, _)| url.ends_with(suffix.as_str()))
            .map(|(_, status)| *status)
            .unwrap_or(200)
    }
}

impl HttpProbe for MemoryCloud {
    fn get(&self, url: &str) -> Result<u16> {
        self.record(Call::HttpGet(url.to_string()));
        Ok(self.status_for(url))
    }

    fn post_json(&self, url: &str, _body: &serde_json::Value) -> Result<u16> {
        self.record(Call::HttpPost(url.to_string()));
        Ok(self.status_for(url))
    }
}
