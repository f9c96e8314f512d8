//! Secrets Manager.

use serde_json::json;
use tracing::debug;
use zeroize::Zeroizing;

use super::{failed_with, str_field, AwsCli};
use crate::core::domain::SecretName;
use crate::core::provider::SecretStore;
use crate::error::{Error, Result, VaultError};

const NOT_FOUND: &str = "ResourceNotFoundException";

/// Read JSON input from stdin so values never reach argv.
const STDIN_INPUT: &str = "file:///dev/stdin";

impl SecretStore for AwsCli {
    fn describe(&self, name: &SecretName) -> Result<bool> {
        let id = name.to_string();
        match self.run(&["secretsmanager", "describe-secret", "--secret-id", id.as_str()]) {
            Ok(_) => Ok(true),
            Err(e) if failed_with(&e, NOT_FOUND) => Ok(false),
            Err(e) => Err(store_unreachable(&id, e)),
        }
    }

    fn get(&self, name: &SecretName) -> Result<Zeroizing<String>> {
        let id = name.to_string();
        let value = match self.json(&["secretsmanager", "get-secret-value", "--secret-id", id.as_str()]) {
            Ok(v) => v,
            Err(e) if failed_with(&e, NOT_FOUND) => return Err(VaultError::NotFound(id).into()),
            Err(e) => return Err(store_unreachable(&id, e)),
        };

        match str_field(&value, "SecretString") {
            Some(s) => Ok(Zeroizing::new(s)),
            None => Err(VaultError::Malformed {
                name: id,
                reason: "no string value (binary secret)".to_string(),
            }
            .into()),
        }
    }

    fn put(&self, name: &SecretName, value: &str, description: &str) -> Result<()> {
        let id = name.to_string();
        let (verb, input) = if self.describe(name)? {
            (
                "update-secret",
                json!({ "SecretId": id, "Description": description, "SecretString": value }),
            )
        } else {
            (
                "create-secret",
                json!({ "Name": id, "Description": description, "SecretString": value }),
            )
        };
        let input = Zeroizing::new(input.to_string());

        debug!(secret = %id, verb, "writing secret");
        self.exec
            .run_with_stdin(
                &["secretsmanager", verb, "--cli-input-json", STDIN_INPUT],
                &input,
            )
            .map_err(|e| VaultError::WriteFailed {
                name: id,
                reason: e.to_string(),
            })?;
        Ok(())
    }
}

fn store_unreachable(name: &str, err: Error) -> Error {
    VaultError::Unreachable {
        name: name.to_string(),
        reason: err.to_string(),
    }
    .into()
}
