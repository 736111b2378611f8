use serde::{Deserialize, Serialize};

/// Read-only facts about the host performing the build, supplied by a
/// metadata collaborator before the run starts. Immutable for the
/// duration of one build.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnvironmentInfo {
    pub subscription_id: String,
    pub resource_group: String,
    pub location: String,
    /// Resource id of the VM the build is running on.
    pub vm_resource_id: String,
}
