//! Desired-state sources
//!
//! Each source turns a declarative input into a list of `ServiceSpec`s.
//! Entries that fail validation are skipped individually with a warning so
//! one bad entry never hides the rest.
//!
//! `nginx_scan` is the exception: it reads finished domains from the
//! proxy's own config files and feeds them to the engine as a proxy layer.

pub mod env;
pub mod manifest;
pub mod nginx_scan;

pub use env::EnvServiceSource;
pub use manifest::ManifestServiceSource;
pub use nginx_scan::NginxConfigDomainSource;
