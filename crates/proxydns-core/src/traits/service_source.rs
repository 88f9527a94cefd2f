// # Service Source Trait
//
// Turns a declarative input into the desired `ServiceSpec`s for one cycle.
//
// ## Implementations
//
// - `EnvServiceSource`: enumerated `SERVICE_<n>_*` environment variables
// - `ManifestServiceSource`: JSON manifest file
//
// Invalid individual entries are skipped with a warning inside the source.
// An `Err` means the whole input was unusable (e.g. unreadable manifest);
// the engine logs it and treats the cycle as having no services.

use async_trait::async_trait;

use crate::model::ServiceSpec;

/// Producer of desired services
#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// Load the desired services, in source order
    async fn load(&self) -> Result<Vec<ServiceSpec>, crate::Error>;

    /// Source name (for logging)
    fn source_name(&self) -> &'static str;
}
