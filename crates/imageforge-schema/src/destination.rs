use serde::Deserialize;

/// A shared-image-gallery publication target for a build output.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SharedImageDestination {
    pub resource_group: String,
    pub gallery_name: String,
    pub image_name: String,
    /// Version to publish, `major.minor.patch` with numeric parts.
    pub image_version: String,
    #[serde(default)]
    pub target_regions: Vec<TargetRegion>,
    #[serde(default)]
    pub exclude_from_latest: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct TargetRegion {
    pub name: String,
    #[serde(default)]
    pub replicas: i32,
}

impl SharedImageDestination {
    /// Structural validation. Returns field-qualified errors and
    /// non-fatal warnings; `prefix` names the enclosing option.
    pub fn validate(&self, prefix: &str) -> (Vec<String>, Vec<String>) {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        for (field, value) in [
            ("resource_group", &self.resource_group),
            ("gallery_name", &self.gallery_name),
            ("image_name", &self.image_name),
            ("image_version", &self.image_version),
        ] {
            if value.trim().is_empty() {
                errors.push(format!("{prefix}.{field} is required"));
            }
        }

        if !self.image_version.trim().is_empty() && !is_semver_like(&self.image_version) {
            errors.push(format!(
                "{prefix}.image_version: {:?} must be <major>.<minor>.<patch> with numeric parts",
                self.image_version
            ));
        }

        for (i, region) in self.target_regions.iter().enumerate() {
            if region.name.trim().is_empty() {
                errors.push(format!("{prefix}.target_regions[{i}].name is required"));
            }
            if region.replicas < 0 {
                errors.push(format!(
                    "{prefix}.target_regions[{i}].replicas must not be negative"
                ));
            }
        }

        if self.target_regions.is_empty() {
            warnings.push(format!(
                "{prefix}.target_regions not set; the image version will only replicate to the build location"
            ));
        }

        (errors, warnings)
    }

    pub fn is_valid(&self) -> bool {
        self.validate("shared_image_destination").0.is_empty()
    }

    /// Resource id of the gallery image version this destination
    /// publishes, under the given subscription.
    pub fn resource_id(&self, subscription_id: &str) -> String {
        format!(
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Compute/galleries/{}/images/{}/versions/{}",
            subscription_id, self.resource_group, self.gallery_name, self.image_name, self.image_version
        )
    }
}

fn is_semver_like(version: &str) -> bool {
    let parts: Vec<&str> = version.split('.').collect();
    parts.len() == 3
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn destination() -> SharedImageDestination {
        SharedImageDestination {
            resource_group: "images-rg".to_owned(),
            gallery_name: "gallery".to_owned(),
            image_name: "base".to_owned(),
            image_version: "1.0.0".to_owned(),
            target_regions: vec![TargetRegion {
                name: "westus2".to_owned(),
                replicas: 1,
            }],
            exclude_from_latest: false,
        }
    }

    #[test]
    fn valid_destination_passes() {
        let (errors, warnings) = destination().validate("shared_image_destination");
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
        assert!(destination().is_valid());
    }

    #[test]
    fn empty_fields_are_errors() {
        let mut dest = destination();
        dest.gallery_name = String::new();
        dest.image_name = "  ".to_owned();
        let (errors, _) = dest.validate("shared_image_destination");
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("shared_image_destination.gallery_name"));
    }

    #[test]
    fn version_must_be_three_numeric_parts() {
        for bad in ["1.0", "1.0.0.0", "1.0.x", "latest", "v1.0.0"] {
            let mut dest = destination();
            dest.image_version = bad.to_owned();
            assert!(!dest.is_valid(), "{bad} should be rejected");
        }
    }

    #[test]
    fn missing_target_regions_is_only_a_warning() {
        let mut dest = destination();
        dest.target_regions.clear();
        let (errors, warnings) = dest.validate("shared_image_destination");
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("target_regions"));
    }

    #[test]
    fn resource_id_assembly() {
        assert_eq!(
            destination().resource_id("sub-1"),
            "/subscriptions/sub-1/resourceGroups/images-rg/providers/Microsoft.Compute/galleries/gallery/images/base/versions/1.0.0"
        );
    }
}
