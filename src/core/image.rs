//! Image publishing.

use std::path::PathBuf;
use tracing::info;

use crate::core::provider::docker::registry_host;
use crate::core::provider::Registry;
use crate::error::Result;

/// What to build and where to push it.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    pub repository: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
    pub platform: String,
    pub tag: String,
}

impl ImageSpec {
    /// Local reference used for the build.
    pub fn local_ref(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

/// Build for the pinned platform, push, and return the resolved reference.
///
/// Nothing in the infrastructure is touched; failures here abort before any
/// stack mutation.
pub fn publish(registry: &dyn Registry, spec: &ImageSpec) -> Result<String> {
    let uri = registry.ensure_repository(&spec.repository)?;
    registry.login(registry_host(&uri))?;

    let local = spec.local_ref();
    registry.build(&spec.context, &spec.dockerfile, &local, &spec.platform)?;

    let remote = format!("{}:{}", uri, spec.tag);
    let resolved = registry.push(&local, &remote)?;
    info!(image = %resolved, platform = %spec.platform, "image published");
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::provider::memory::{Call, MemoryCloud, ACCOUNT};
    use crate::error::{Error, ImageError};

    fn spec() -> ImageSpec {
        ImageSpec {
            repository: "patient-api".into(),
            context: PathBuf::from("."),
            dockerfile: PathBuf::from("Dockerfile"),
            platform: "linux/amd64".into(),
            tag: "v7".into(),
        }
    }

    #[test]
    fn test_publish_order_and_digest() {
        let cloud = MemoryCloud::new();
        let resolved = publish(&cloud, &spec()).unwrap();
        assert!(resolved.starts_with(&format!(
            "{}.dkr.ecr.us-east-1.amazonaws.com/patient-api@sha256:",
            ACCOUNT
        )));

        let calls = cloud.calls();
        assert!(matches!(&calls[0], Call::EnsureRepository(r) if r == "patient-api"));
        assert!(matches!(&calls[1], Call::Login(h) if h.ends_with("amazonaws.com")));
        assert!(matches!(&calls[2], Call::Build(l) if l == "patient-api:v7"));
        assert!(matches!(&calls[3], Call::Push { remote, .. } if remote.ends_with("/patient-api:v7")));
    }

    #[test]
    fn test_push_rejected_is_fatal() {
        let cloud = MemoryCloud::new().push_fails();
        let err = publish(&cloud, &spec()).unwrap_err();
        assert!(matches!(err, Error::Image(ImageError::Push { .. })));
    }
}
