//! Secrets Manager round trip through the SDK store.
//!
//! Runs only with `--features aws,test-aws` and real credentials. Writes under
//! `$BULLPEN_TEST_SECRET_SCOPE/test-<uuid>/...`.

#![cfg(all(feature = "aws", feature = "test-aws"))]

mod support;

use bullpen::core::domain::{PolicyTable, Purpose, SecretAction, SecretName};
use bullpen::core::provider::sdk::SecretsManager;
use bullpen::core::provider::SecretStore;
use bullpen::core::vault;

/// Fresh environment segment so runs never share secrets.
fn environment() -> String {
    format!("test-{}", uuid::Uuid::new_v4().simple())
}

fn store() -> SecretsManager {
    let region = std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string());
    SecretsManager::new(&region).expect("failed to build sdk client")
}

#[test]
fn test_db_password_is_reused_across_runs() {
    skip_without_aws!();
    let scope = std::env::var("BULLPEN_TEST_SECRET_SCOPE").unwrap();
    let store = store();
    let name = SecretName::new(&scope, &environment(), Purpose::DatabasePassword).unwrap();
    let policy = PolicyTable::new(12).policy(Purpose::DatabasePassword);

    let first = vault::ensure(&store, &name, None, &policy).unwrap();
    let second = vault::ensure(&store, &name, None, &policy).unwrap();

    assert_eq!(second.action, SecretAction::Reused);
    assert_eq!(first.value.as_str(), second.value.as_str());
    assert!(store.describe(&name).unwrap());
}

#[test]
fn test_signing_key_rotates() {
    skip_without_aws!();
    let scope = std::env::var("BULLPEN_TEST_SECRET_SCOPE").unwrap();
    let store = store();
    let name = SecretName::new(&scope, &environment(), Purpose::SigningKey).unwrap();
    let policy = PolicyTable::new(12).policy(Purpose::SigningKey);

    let first = vault::ensure(&store, &name, None, &policy).unwrap();
    let second = vault::ensure(&store, &name, None, &policy).unwrap();

    assert_eq!(second.action, SecretAction::Rotated);
    assert_ne!(first.value.as_str(), second.value.as_str());
    assert_eq!(store.get(&name).unwrap().as_str(), second.value.as_str());
}
