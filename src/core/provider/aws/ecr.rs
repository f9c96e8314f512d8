//! ECR repository and login token.

use tracing::info;
use zeroize::Zeroizing;

use super::{array, failed_with, str_field, unexpected, AwsCli};
use crate::error::Result;

const NOT_FOUND: &str = "RepositoryNotFoundException";

impl AwsCli {
    /// URI of `repository`, creating it with scan-on-push if missing.
    pub fn ensure_repository(&self, repository: &str) -> Result<String> {
        match self.json(&[
            "ecr",
            "describe-repositories",
            "--repository-names",
            repository,
        ]) {
            Ok(response) => array(&response, "repositories")
                .first()
                .and_then(|r| str_field(r, "repositoryUri"))
                .ok_or_else(|| unexpected("ecr describe-repositories", "no repository uri")),
            Err(e) if failed_with(&e, NOT_FOUND) => {
                info!(repository, "creating registry repository");
                let response = self.json(&[
                    "ecr",
                    "create-repository",
                    "--repository-name",
                    repository,
                    "--image-scanning-configuration",
                    "scanOnPush=true",
                ])?;
                response
                    .pointer("/repository/repositoryUri")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
                    .ok_or_else(|| unexpected("ecr create-repository", "no repository uri"))
            }
            Err(e) => Err(e),
        }
    }

    /// Short-lived registry password.
    pub fn ecr_login_password(&self) -> Result<Zeroizing<String>> {
        let token = self.run(&["ecr", "get-login-password"])?;
        Ok(Zeroizing::new(token.trim().to_string()))
    }
}
