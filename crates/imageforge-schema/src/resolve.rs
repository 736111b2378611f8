use crate::destination::SharedImageDestination;
use crate::env::EnvironmentInfo;
use crate::manifest::BuildManifest;
use crate::redact::register_secret;
use crate::resource_id::ResourceId;
use crate::template::{render, TemplateError, TemplateVars};
use crate::urn::PlatformImage;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

const DEFAULT_COMMAND_WRAPPER: &str = "{{ command }}";
const DEFAULT_MOUNT_PATH_TEMPLATE: &str = "/mnt/imageforge/{{ device }}";
const DEFAULT_MOUNT_PARTITION: &str = "1";
const DEFAULT_DISK_ID_TEMPLATE: &str = "/subscriptions/{{ subscription_id }}/resourceGroups/{{ resource_group }}/providers/Microsoft.Compute/disks/imageforge-osdisk-{{ timestamp }}";
const DEFAULT_SNAPSHOT_ID_TEMPLATE: &str = "/subscriptions/{{ subscription_id }}/resourceGroups/{{ resource_group }}/providers/Microsoft.Compute/snapshots/imageforge-osdisk-snapshot-{{ timestamp }}";

/// Which of the mutually exclusive source modes supplies the initial
/// disk content. Parsed payloads are carried here so later phases
/// never re-parse the raw specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceMode {
    FromScratch,
    PlatformImage(PlatformImage),
    ExistingDisk(ResourceId),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{value:?} is not a valid value, allowed: {allowed:?}")]
pub struct InvalidEnumValue {
    pub value: String,
    pub allowed: &'static [&'static str],
}

macro_rules! config_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [&'static str] = &[$($text),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = InvalidEnumValue;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(InvalidEnumValue {
                        value: s.to_owned(),
                        allowed: Self::ALL,
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

config_enum!(
    /// Disk cache type recorded in the resulting image.
    CacheType {
        None => "None",
        ReadOnly => "ReadOnly",
        ReadWrite => "ReadWrite",
    }
);

config_enum!(
    /// Storage SKU for the temporary OS disk.
    StorageAccountType {
        StandardLrs => "Standard_LRS",
        PremiumLrs => "Premium_LRS",
        StandardSsdLrs => "StandardSSD_LRS",
        UltraSsdLrs => "UltraSSD_LRS",
    }
);

config_enum!(
    /// Hypervisor generation of the produced image.
    HyperVGeneration {
        V1 => "V1",
        V2 => "V2",
    }
);

/// A filesystem mounted into the chroot before provisioning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChrootMount {
    pub fstype: String,
    pub source: String,
    pub target: String,
}

impl ChrootMount {
    fn new(fstype: &str, source: &str, target: &str) -> Self {
        Self {
            fstype: fstype.to_owned(),
            source: source.to_owned(),
            target: target.to_owned(),
        }
    }
}

fn default_chroot_mounts() -> Vec<ChrootMount> {
    vec![
        ChrootMount::new("proc", "proc", "/proc"),
        ChrootMount::new("sysfs", "sysfs", "/sys"),
        ChrootMount::new("bind", "/dev", "/dev"),
        ChrootMount::new("devpts", "devpts", "/dev/pts"),
        ChrootMount::new("binfmt_misc", "binfmt_misc", "/proc/sys/fs/binfmt_misc"),
    ]
}

/// The resolved, validated build configuration. Every field is
/// defaulted and checked; constructing one by hand bypasses those
/// guarantees, so downstream code should only accept values produced
/// by [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub source: SourceMode,
    pub os_disk_size_gb: i32,
    pub os_disk_storage_account_type: StorageAccountType,
    pub os_disk_cache_type: CacheType,
    pub image_hyperv_generation: HyperVGeneration,
    pub temporary_os_disk_id: String,
    pub temporary_os_disk_snapshot_id: String,
    pub command_wrapper: String,
    pub pre_mount_commands: Vec<String>,
    pub post_mount_commands: Vec<String>,
    /// Template; `{{ device }}` expands once the disk is attached.
    pub mount_path: String,
    pub mount_partition: String,
    pub mount_options: Vec<String>,
    pub chroot_mounts: Vec<ChrootMount>,
    pub copy_files: Vec<String>,
    pub skip_cleanup: bool,
    pub image_resource_id: Option<ResourceId>,
    pub shared_image_destination: Option<SharedImageDestination>,
}

/// A single validation rule violation. All violations found in one
/// resolution pass are reported together.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Violation {
    #[error("source cannot be specified when building from_scratch")]
    SourceWithFromScratch,
    #[error("os_disk_size_gb is required with from_scratch")]
    DiskSizeRequired,
    #[error("pre_mount_commands is required with from_scratch; nothing else creates the partition table and filesystem")]
    PreMountCommandsRequired,
    #[error("either source or from_scratch must be set")]
    SourceRequired,
    #[error("source: {0:?} is neither a platform image specifier nor a managed disk resource id")]
    UnrecognizedSource(String),
    #[error("os_disk_cache_type: {0}")]
    CacheType(InvalidEnumValue),
    #[error("os_disk_storage_account_type: {0}")]
    StorageAccountType(InvalidEnumValue),
    #[error("image_hyperv_generation: {0}")]
    HyperVGeneration(InvalidEnumValue),
    #[error("image_resource_id: {0:?} is not an image resource id")]
    InvalidImageResourceId(String),
    #[error("{0}")]
    Destination(String),
    #[error("image_resource_id or shared_image_destination is required")]
    OutputRequired,
    #[error("chroot_mounts[{0}]: expected [fstype, source, target] with non-empty entries")]
    InvalidChrootMount(usize),
    #[error(transparent)]
    Template(#[from] TemplateError),
}

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid build configuration:\n{}", list(.0))]
    Invalid(Vec<Violation>),
}

fn list(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  * {v}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Output of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub config: BuildConfig,
    pub warnings: Vec<String>,
}

/// Resolve a raw manifest into a validated [`BuildConfig`].
///
/// Defaults are applied only to fields left unset, the source mode is
/// classified, and every validation rule is checked; violations are
/// accumulated so the user sees all of them in one pass. On success,
/// secret-bearing credential fields are registered with the redaction
/// filter.
pub fn resolve(
    manifest: &BuildManifest,
    env: &EnvironmentInfo,
) -> Result<Resolution, ResolveError> {
    let mut violations = Vec::new();
    let mut warnings = Vec::new();

    let source = match classify_source(manifest) {
        Ok(mode) => Some(mode),
        Err(v) => {
            violations.push(v);
            None
        }
    };

    if manifest.from_scratch {
        if !manifest.source.is_empty() {
            violations.push(Violation::SourceWithFromScratch);
        }
        if manifest.os_disk_size_gb == 0 {
            violations.push(Violation::DiskSizeRequired);
        }
        if manifest.pre_mount_commands.is_empty() {
            violations.push(Violation::PreMountCommandsRequired);
        }
    }

    let os_disk_cache_type = parse_or_default(
        manifest.os_disk_cache_type.as_deref(),
        CacheType::ReadOnly,
        &mut violations,
        Violation::CacheType,
    );
    let os_disk_storage_account_type = parse_or_default(
        manifest.os_disk_storage_account_type.as_deref(),
        StorageAccountType::PremiumLrs,
        &mut violations,
        Violation::StorageAccountType,
    );
    let image_hyperv_generation = parse_or_default(
        manifest.image_hyperv_generation.as_deref(),
        HyperVGeneration::V1,
        &mut violations,
        Violation::HyperVGeneration,
    );

    let image_resource_id = match manifest.image_resource_id.as_deref() {
        Some(raw) => match raw.parse::<ResourceId>() {
            Ok(id) if id.is_compute_image() => Some(id),
            _ => {
                violations.push(Violation::InvalidImageResourceId(raw.to_owned()));
                None
            }
        },
        None => None,
    };

    let shared_image_destination = manifest.shared_image_destination.clone();
    if let Some(dest) = &shared_image_destination {
        let (errors, warns) = dest.validate("shared_image_destination");
        violations.extend(errors.into_iter().map(Violation::Destination));
        warnings.extend(warns);
    }

    if manifest.image_resource_id.is_none() && manifest.shared_image_destination.is_none() {
        violations.push(Violation::OutputRequired);
    }

    let chroot_mounts = match &manifest.chroot_mounts {
        None => default_chroot_mounts(),
        Some(raw) => {
            let mut mounts = Vec::with_capacity(raw.len());
            for (i, triple) in raw.iter().enumerate() {
                match triple.as_slice() {
                    [fstype, source, target]
                        if !fstype.is_empty() && !source.is_empty() && !target.is_empty() =>
                    {
                        mounts.push(ChrootMount::new(fstype, source, target));
                    }
                    _ => violations.push(Violation::InvalidChrootMount(i)),
                }
            }
            mounts
        }
    };

    let copy_files = match &manifest.copy_files {
        Some(files) => files.clone(),
        None if manifest.from_scratch => Vec::new(),
        None => vec!["/etc/resolv.conf".to_owned()],
    };

    let vars = TemplateVars::new()
        .with_env(env)
        .with_timestamp(chrono::Utc::now().timestamp());
    let temporary_os_disk_id = defaulted_id(
        manifest.temporary_os_disk_id.as_deref(),
        "temporary_os_disk_id",
        DEFAULT_DISK_ID_TEMPLATE,
        &vars,
        &mut violations,
    );
    let temporary_os_disk_snapshot_id = defaulted_id(
        manifest.temporary_os_disk_snapshot_id.as_deref(),
        "temporary_os_disk_snapshot_id",
        DEFAULT_SNAPSHOT_ID_TEMPLATE,
        &vars,
        &mut violations,
    );

    // classify_source pushed a violation in every None case, so both
    // arms below return the full aggregate
    let Some(source) = source else {
        return Err(ResolveError::Invalid(violations));
    };
    if !violations.is_empty() {
        return Err(ResolveError::Invalid(violations));
    }

    if let Some(credentials) = &manifest.credentials {
        register_secret(&credentials.client_secret);
        register_secret(&credentials.client_jwt);
    }

    Ok(Resolution {
        config: BuildConfig {
            source,
            os_disk_size_gb: manifest.os_disk_size_gb,
            os_disk_storage_account_type,
            os_disk_cache_type,
            image_hyperv_generation,
            temporary_os_disk_id,
            temporary_os_disk_snapshot_id,
            command_wrapper: manifest
                .command_wrapper
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMAND_WRAPPER.to_owned()),
            pre_mount_commands: manifest.pre_mount_commands.clone(),
            post_mount_commands: manifest.post_mount_commands.clone(),
            mount_path: manifest
                .mount_path
                .clone()
                .unwrap_or_else(|| DEFAULT_MOUNT_PATH_TEMPLATE.to_owned()),
            mount_partition: manifest
                .mount_partition
                .clone()
                .unwrap_or_else(|| DEFAULT_MOUNT_PARTITION.to_owned()),
            mount_options: manifest.mount_options.clone(),
            chroot_mounts,
            copy_files,
            skip_cleanup: manifest.skip_cleanup,
            image_resource_id,
            shared_image_destination,
        },
        warnings,
    })
}

fn classify_source(manifest: &BuildManifest) -> Result<SourceMode, Violation> {
    if manifest.from_scratch {
        return Ok(SourceMode::FromScratch);
    }
    if manifest.source.is_empty() {
        return Err(Violation::SourceRequired);
    }
    if let Ok(image) = manifest.source.parse::<PlatformImage>() {
        debug!("source is a platform image: {image}");
        return Ok(SourceMode::PlatformImage(image));
    }
    match manifest.source.parse::<ResourceId>() {
        Ok(id) if id.is_compute_disk() => {
            debug!("source is a managed disk: {id}");
            Ok(SourceMode::ExistingDisk(id))
        }
        _ => Err(Violation::UnrecognizedSource(manifest.source.clone())),
    }
}

fn parse_or_default<T: FromStr<Err = InvalidEnumValue> + Copy>(
    raw: Option<&str>,
    default: T,
    violations: &mut Vec<Violation>,
    wrap: fn(InvalidEnumValue) -> Violation,
) -> T {
    match raw {
        None => default,
        Some(s) => s.parse().unwrap_or_else(|e| {
            violations.push(wrap(e));
            default
        }),
    }
}

fn defaulted_id(
    explicit: Option<&str>,
    field: &str,
    template: &str,
    vars: &TemplateVars,
    violations: &mut Vec<Violation>,
) -> String {
    match explicit {
        Some(id) => id.to_owned(),
        None => render(field, template, vars).unwrap_or_else(|e| {
            violations.push(Violation::Template(e));
            String::new()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::parse_manifest_str;

    fn env() -> EnvironmentInfo {
        EnvironmentInfo {
            subscription_id: "sub-1".to_owned(),
            resource_group: "rg-1".to_owned(),
            location: "westus2".to_owned(),
            vm_resource_id: "/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Compute/virtualMachines/builder".to_owned(),
        }
    }

    const IMAGE_ID: &str =
        "/subscriptions/s/resourceGroups/g/providers/Microsoft.Compute/images/out";

    fn minimal(extra: &str) -> BuildManifest {
        parse_manifest_str(&format!(
            "source = \"Canonical:UbuntuServer:18.04-LTS:latest\"\nimage_resource_id = \"{IMAGE_ID}\"\n{extra}"
        ))
        .unwrap()
    }

    fn violations(manifest: &BuildManifest) -> Vec<Violation> {
        match resolve(manifest, &env()) {
            Err(ResolveError::Invalid(v)) => v,
            Ok(_) => panic!("expected resolution to fail"),
        }
    }

    #[test]
    fn minimal_manifest_resolves_with_defaults() {
        let resolution = resolve(&minimal(""), &env()).unwrap();
        let config = resolution.config;

        assert!(matches!(config.source, SourceMode::PlatformImage(_)));
        assert_eq!(config.os_disk_cache_type, CacheType::ReadOnly);
        assert_eq!(
            config.os_disk_storage_account_type,
            StorageAccountType::PremiumLrs
        );
        assert_eq!(config.image_hyperv_generation, HyperVGeneration::V1);
        assert_eq!(config.command_wrapper, "{{ command }}");
        assert_eq!(config.mount_path, "/mnt/imageforge/{{ device }}");
        assert_eq!(config.mount_partition, "1");
        assert_eq!(config.copy_files, vec!["/etc/resolv.conf"]);
        assert_eq!(config.chroot_mounts.len(), 5);
        assert_eq!(config.chroot_mounts[0].target, "/proc");
        assert!(config
            .temporary_os_disk_id
            .starts_with("/subscriptions/sub-1/resourceGroups/rg-1/providers/Microsoft.Compute/disks/imageforge-osdisk-"));
        assert!(config
            .temporary_os_disk_snapshot_id
            .contains("/snapshots/imageforge-osdisk-snapshot-"));
        assert!(!config.skip_cleanup);
    }

    #[test]
    fn source_and_from_scratch_are_mutually_exclusive() {
        let manifest = parse_manifest_str(&format!(
            "from_scratch = true\nsource = \"P:O:S:1\"\nos_disk_size_gb = 32\npre_mount_commands = [\"mkfs\"]\nimage_resource_id = \"{IMAGE_ID}\""
        ))
        .unwrap();
        assert_eq!(
            violations(&manifest),
            vec![Violation::SourceWithFromScratch]
        );
    }

    #[test]
    fn from_scratch_requires_size_and_pre_mount_commands() {
        let manifest = parse_manifest_str(&format!(
            "from_scratch = true\nimage_resource_id = \"{IMAGE_ID}\""
        ))
        .unwrap();
        let found = violations(&manifest);
        assert!(found.contains(&Violation::DiskSizeRequired));
        assert!(found.contains(&Violation::PreMountCommandsRequired));
    }

    #[test]
    fn neither_source_nor_from_scratch_fails() {
        let manifest =
            parse_manifest_str(&format!("image_resource_id = \"{IMAGE_ID}\"")).unwrap();
        assert_eq!(violations(&manifest), vec![Violation::SourceRequired]);
    }

    #[test]
    fn classification_is_total_and_exclusive() {
        let platform = minimal("");
        let resolved = resolve(&platform, &env()).unwrap();
        assert!(matches!(
            resolved.config.source,
            SourceMode::PlatformImage(_)
        ));

        let mut disk = minimal("");
        disk.source =
            "/subscriptions/x/resourceGroups/y/providers/Microsoft.Compute/disks/z".to_owned();
        let resolved = resolve(&disk, &env()).unwrap();
        assert!(matches!(resolved.config.source, SourceMode::ExistingDisk(_)));

        let mut invalid = minimal("");
        invalid.source = "not-a-valid-thing".to_owned();
        assert_eq!(
            violations(&invalid),
            vec![Violation::UnrecognizedSource("not-a-valid-thing".to_owned())]
        );
    }

    #[test]
    fn non_disk_resource_id_source_is_rejected() {
        let mut manifest = minimal("");
        // parses as a resource id, but not in the disks namespace
        manifest.source =
            "/subscriptions/x/resourceGroups/y/providers/Microsoft.Compute/images/z".to_owned();
        assert!(matches!(
            violations(&manifest).as_slice(),
            [Violation::UnrecognizedSource(_)]
        ));
    }

    #[test]
    fn enum_violations_list_allowed_values() {
        let manifest = minimal("os_disk_cache_type = \"Sideways\"");
        let found = violations(&manifest);
        let [Violation::CacheType(invalid)] = found.as_slice() else {
            panic!("unexpected violations: {found:?}");
        };
        assert_eq!(invalid.value, "Sideways");
        assert!(invalid.allowed.contains(&"ReadOnly"));

        let manifest = minimal("os_disk_storage_account_type = \"Tape\"");
        assert!(matches!(
            violations(&manifest).as_slice(),
            [Violation::StorageAccountType(_)]
        ));

        let manifest = minimal("image_hyperv_generation = \"V3\"");
        assert!(matches!(
            violations(&manifest).as_slice(),
            [Violation::HyperVGeneration(_)]
        ));
    }

    #[test]
    fn invalid_image_resource_id_is_accumulated_with_other_violations() {
        // the id violation must land in the aggregate alongside others
        let manifest = parse_manifest_str(
            "source = \"P:O:S:1\"\nimage_resource_id = \"not-an-image\"\nos_disk_cache_type = \"Sideways\"",
        )
        .unwrap();
        let found = violations(&manifest);
        assert!(found.contains(&Violation::InvalidImageResourceId(
            "not-an-image".to_owned()
        )));
        assert!(matches!(found.as_slice(), [_, _]));
    }

    #[test]
    fn disk_id_given_as_image_resource_id_is_rejected() {
        let manifest = parse_manifest_str(
            "source = \"P:O:S:1\"\nimage_resource_id = \"/subscriptions/x/resourceGroups/y/providers/Microsoft.Compute/disks/z\"",
        )
        .unwrap();
        assert!(matches!(
            violations(&manifest).as_slice(),
            [Violation::InvalidImageResourceId(_)]
        ));
    }

    #[test]
    fn missing_output_fails() {
        let manifest = parse_manifest_str("source = \"P:O:S:1\"").unwrap();
        assert_eq!(violations(&manifest), vec![Violation::OutputRequired]);
    }

    #[test]
    fn shared_image_destination_alone_is_a_valid_output() {
        let manifest = parse_manifest_str(
            r#"
source = "P:O:S:1"

[shared_image_destination]
resource_group = "rg"
gallery_name = "gal"
image_name = "img"
image_version = "0.1.0"
"#,
        )
        .unwrap();
        let resolution = resolve(&manifest, &env()).unwrap();
        assert!(resolution.config.image_resource_id.is_none());
        assert!(resolution.config.shared_image_destination.is_some());
        // empty target_regions surfaces as a warning, not an error
        assert_eq!(resolution.warnings.len(), 1);
    }

    #[test]
    fn destination_errors_are_merged_into_the_aggregate() {
        let manifest = parse_manifest_str(
            r#"
source = "P:O:S:1"

[shared_image_destination]
resource_group = "rg"
gallery_name = ""
image_name = "img"
image_version = "not.a.version"
"#,
        )
        .unwrap();
        let found = violations(&manifest);
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|v| matches!(v, Violation::Destination(_))));
    }

    #[test]
    fn from_scratch_defaults_to_no_copy_files() {
        let manifest = parse_manifest_str(&format!(
            "from_scratch = true\nos_disk_size_gb = 32\npre_mount_commands = [\"mkfs\"]\nimage_resource_id = \"{IMAGE_ID}\""
        ))
        .unwrap();
        let resolution = resolve(&manifest, &env()).unwrap();
        assert!(resolution.config.copy_files.is_empty());
        assert!(matches!(resolution.config.source, SourceMode::FromScratch));
    }

    #[test]
    fn explicit_empty_copy_files_stays_empty() {
        let resolution = resolve(&minimal("copy_files = []"), &env()).unwrap();
        assert!(resolution.config.copy_files.is_empty());
    }

    #[test]
    fn explicit_chroot_mounts_are_validated() {
        let manifest = minimal("chroot_mounts = [[\"proc\", \"proc\", \"/proc\"], [\"bind\", \"/dev\"]]");
        assert_eq!(
            violations(&manifest),
            vec![Violation::InvalidChrootMount(1)]
        );
    }

    #[test]
    fn explicit_temporary_ids_are_kept_verbatim() {
        let resolution = resolve(
            &minimal("temporary_os_disk_id = \"/custom/disk\"\ntemporary_os_disk_snapshot_id = \"/custom/snap\""),
            &env(),
        )
        .unwrap();
        assert_eq!(resolution.config.temporary_os_disk_id, "/custom/disk");
        assert_eq!(
            resolution.config.temporary_os_disk_snapshot_id,
            "/custom/snap"
        );
    }

    #[test]
    fn missing_environment_facts_fail_id_rendering() {
        let incomplete = EnvironmentInfo {
            subscription_id: String::new(),
            ..env()
        };
        match resolve(&minimal(""), &incomplete) {
            Err(ResolveError::Invalid(found)) => {
                assert_eq!(found.len(), 2, "{found:?}");
                assert!(found
                    .iter()
                    .all(|v| matches!(v, Violation::Template(_))));
                assert!(found[0].to_string().contains("temporary_os_disk_id"));
            }
            other => panic!("expected template violations, got {other:?}"),
        }
    }

    #[test]
    fn all_violations_reported_in_one_pass() {
        let manifest = parse_manifest_str(
            "from_scratch = true\nsource = \"P:O:S:1\"\nos_disk_cache_type = \"Sideways\"\nimage_hyperv_generation = \"V9\"",
        )
        .unwrap();
        let found = violations(&manifest);
        // mutual exclusion, missing size, missing pre-mount, two bad
        // enums, missing output: all in a single aggregate
        assert_eq!(found.len(), 6, "{found:?}");
    }

    #[test]
    fn successful_resolution_registers_credential_secrets() {
        let manifest = minimal(
            "[credentials]\nclient_id = \"app\"\nclient_secret = \"resolver-secret-under-test\"",
        );
        resolve(&manifest, &env()).unwrap();
        assert_eq!(
            crate::redact::redact("leaked resolver-secret-under-test"),
            "leaked <redacted>"
        );
    }
}
