use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0:?} is not a resource id (expected /subscriptions/<id>/resourceGroups/<group>/providers/<provider>/<type>/<name>)")]
pub struct ResourceIdParseError(pub String);

/// A hierarchical cloud resource identifier.
///
/// Path keywords (`subscriptions`, `resourceGroups`, `providers`) and
/// the provider/type segments compare case-insensitively, matching
/// how the cloud API treats them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    pub subscription_id: String,
    pub resource_group: String,
    pub provider: String,
    pub resource_type: String,
    pub name: String,
}

impl ResourceId {
    pub fn is_compute_disk(&self) -> bool {
        self.provider.eq_ignore_ascii_case("Microsoft.Compute")
            && self.resource_type.eq_ignore_ascii_case("disks")
    }

    pub fn is_compute_image(&self) -> bool {
        self.provider.eq_ignore_ascii_case("Microsoft.Compute")
            && self.resource_type.eq_ignore_ascii_case("images")
    }
}

impl FromStr for ResourceId {
    type Err = ResourceIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let ["", subscriptions, subscription_id, resource_groups, resource_group, providers, provider, resource_type, name] =
            parts.as_slice()
        else {
            return Err(ResourceIdParseError(s.to_owned()));
        };
        if !subscriptions.eq_ignore_ascii_case("subscriptions")
            || !resource_groups.eq_ignore_ascii_case("resourceGroups")
            || !providers.eq_ignore_ascii_case("providers")
        {
            return Err(ResourceIdParseError(s.to_owned()));
        }
        if [subscription_id, resource_group, provider, resource_type, name]
            .iter()
            .any(|p| p.is_empty())
        {
            return Err(ResourceIdParseError(s.to_owned()));
        }
        Ok(Self {
            subscription_id: (*subscription_id).to_owned(),
            resource_group: (*resource_group).to_owned(),
            provider: (*provider).to_owned(),
            resource_type: (*resource_type).to_owned(),
            name: (*name).to_owned(),
        })
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/{}/{}/{}",
            self.subscription_id, self.resource_group, self.provider, self.resource_type, self.name
        )
    }
}
