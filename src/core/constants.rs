//! Constants used throughout bullpen.
//!
//! Centralizes magic strings and configuration values.

/// Configuration file name.
pub const CONFIG_FILE: &str = "bullpen.toml";

/// Environment variable that overrides the log filter.
pub const LOG_ENV: &str = "BULLPEN_LOG";

/// Tools every deployment shells out to.
pub const REQUIRED_TOOLS: &[&str] = &["aws", "docker"];

/// Platform images are built for. Must match the compute runtime.
pub const DEFAULT_PLATFORM: &str = "linux/amd64";

/// Default TTL for out-of-band DNS upserts, in seconds.
pub const DNS_TTL: u32 = 300;

/// Record type used for out-of-band DNS upserts.
pub const DNS_RECORD_TYPE: &str = "CNAME";

/// Tag used to locate the preferred network.
pub const NETWORK_TAG_KEY: &str = "Name";

/// Number of subnets taken when none are flagged public.
pub const PUBLIC_SUBNET_FALLBACK_COUNT: usize = 2;

// Secret generation
pub const SIGNING_KEY_LENGTH: usize = 64;
pub const DATABASE_PASSWORD_LENGTH: usize = 32;
pub const ADMIN_PASSWORD_LENGTH: usize = 20;
pub const ADMIN_PASSWORD_MIN_LENGTH: usize = 12;

/// Symbols allowed in mixed-class passwords. Kept free of quoting and URL
/// delimiter characters.
pub const PASSWORD_SYMBOLS: &[u8] = b"!#%*+-=?^_~";

// Stack parameter names
pub const PARAM_ENVIRONMENT: &str = "EnvironmentName";
pub const PARAM_NETWORK: &str = "VpcId";
pub const PARAM_SUBNETS: &str = "SubnetIds";
pub const PARAM_PUBLIC_SUBNETS: &str = "PublicSubnetIds";
pub const PARAM_IMAGE: &str = "ContainerImage";
pub const PARAM_CREATE_DNS: &str = "CreateDNSRecord";
pub const PARAM_DOMAIN: &str = "DomainName";
pub const PARAM_ZONE: &str = "HostedZoneId";

// Stack output names
pub const OUTPUT_CLUSTER: &str = "ClusterName";
pub const OUTPUT_SERVICE: &str = "ServiceName";
pub const OUTPUT_LOAD_BALANCER: &str = "LoadBalancerDNS";
pub const OUTPUT_SECURITY_GROUP: &str = "ECSSecurityGroupId";

/// Outputs every applied stack must expose.
pub const REQUIRED_OUTPUTS: &[&str] = &[
    OUTPUT_CLUSTER,
    OUTPUT_SERVICE,
    OUTPUT_LOAD_BALANCER,
    OUTPUT_SECURITY_GROUP,
];

/// CloudFormation's message when an update carries no changes.
pub const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

// Smoke checks
pub const HEALTH_PATH: &str = "/health";
pub const AUTH_PATH: &str = "/api/auth/login";
