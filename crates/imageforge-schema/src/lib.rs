//! Build manifest parsing, configuration resolution, and resource
//! identifiers for Imageforge.
//!
//! This crate defines the schema layer: TOML manifest parsing
//! (`BuildManifest`), configuration resolution with defaulting and
//! accumulated validation (`resolve`), platform-image and resource-id
//! parsers, the template renderer used for generated identifiers and
//! wrapped commands, and the process-wide secret-redaction registry.

pub mod destination;
pub mod env;
pub mod manifest;
pub mod redact;
pub mod resolve;
pub mod resource_id;
pub mod template;
pub mod urn;

pub use destination::{SharedImageDestination, TargetRegion};
pub use env::EnvironmentInfo;
pub use manifest::{
    parse_manifest_file, parse_manifest_str, BuildManifest, CredentialsSection, ManifestError,
};
pub use redact::{redact, register_secret};
pub use resolve::{
    resolve, BuildConfig, CacheType, ChrootMount, HyperVGeneration, ResolveError, Resolution,
    SourceMode, StorageAccountType, Violation,
};
pub use resource_id::{ResourceId, ResourceIdParseError};
pub use template::{render, wrap_command, TemplateError, TemplateVars};
pub use urn::{PlatformImage, UrnParseError};
