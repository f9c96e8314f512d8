//! Secrets Manager through the AWS SDK.
//!
//! Enable with `--features aws` and select it in `bullpen.toml`:
//!
//! ```toml
//! [vault]
//! backend = "sdk"
//! ```
//!
//! Credentials come from the default provider chain. The SDK is async; each
//! call is driven to completion on a private current-thread runtime.

use aws_sdk_secretsmanager::Client;
use tracing::trace;
use zeroize::Zeroizing;

use super::SecretStore;
use crate::core::domain::SecretName;
use crate::error::{Result, VaultError};

/// Secrets Manager client bound to one region.
pub struct SecretsManager {
    runtime: tokio::runtime::Runtime,
    client: Client,
}

impl SecretsManager {
    pub fn new(region: &str) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| VaultError::Unreachable {
                name: String::new(),
                reason: format!("failed to create runtime: {}", e),
            })?;

        let region = aws_config::Region::new(region.to_string());
        let config = runtime.block_on(
            aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(region)
                .load(),
        );

        Ok(Self {
            runtime,
            client: Client::new(&config),
        })
    }
}

impl SecretStore for SecretsManager {
    fn describe(&self, name: &SecretName) -> Result<bool> {
        let id = name.to_string();
        trace!(secret = %id, "describing secret via sdk");

        let result = self
            .runtime
            .block_on(self.client.describe_secret().secret_id(&id).send());
        match result {
            Ok(_) => Ok(true),
            Err(e)
                if e.as_service_error()
                    .is_some_and(|s| s.is_resource_not_found_exception()) =>
            {
                Ok(false)
            }
            Err(e) => Err(VaultError::Unreachable {
                name: id,
                reason: e.to_string(),
            }
            .into()),
        }
    }

    fn get(&self, name: &SecretName) -> Result<Zeroizing<String>> {
        let id = name.to_string();
        trace!(secret = %id, "reading secret via sdk");

        let output = self
            .runtime
            .block_on(self.client.get_secret_value().secret_id(&id).send())
            .map_err(|e| {
                if e.as_service_error()
                    .is_some_and(|s| s.is_resource_not_found_exception())
                {
                    VaultError::NotFound(id.clone())
                } else {
                    VaultError::Unreachable {
                        name: id.clone(),
                        reason: e.to_string(),
                    }
                }
            })?;

        output
            .secret_string()
            .map(|s| Zeroizing::new(s.to_string()))
            .ok_or_else(|| {
                VaultError::Malformed {
                    name: id,
                    reason: "no string value".to_string(),
                }
                .into()
            })
    }

    fn put(&self, name: &SecretName, value: &str, description: &str) -> Result<()> {
        let id = name.to_string();
        let write_failed = |reason: String| VaultError::WriteFailed {
            name: id.clone(),
            reason,
        };

        if self.describe(name)? {
            trace!(secret = %id, "updating secret via sdk");
            self.runtime
                .block_on(
                    self.client
                        .put_secret_value()
                        .secret_id(&id)
                        .secret_string(value)
                        .send(),
                )
                .map_err(|e| write_failed(e.to_string()))?;
        } else {
            trace!(secret = %id, "creating secret via sdk");
            self.runtime
                .block_on(
                    self.client
                        .create_secret()
                        .name(&id)
                        .description(description)
                        .secret_string(value)
                        .send(),
                )
                .map_err(|e| write_failed(e.to_string()))?;
        }
        Ok(())
    }
}
