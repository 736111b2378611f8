use std::fmt;
use std::process::Command;

/// A missing prerequisite with actionable install instructions.
#[derive(Debug)]
pub struct MissingPrereq {
    pub name: &'static str,
    pub purpose: &'static str,
    pub install_hint: &'static str,
}

impl fmt::Display for MissingPrereq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "  - {}: {} (install: {})",
            self.name, self.purpose, self.install_hint
        )
    }
}

fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Check everything a real (non-mock) build needs from the host.
/// Returns a list of missing items. Empty list means all prerequisites are met.
pub fn check_host_prereqs() -> Vec<MissingPrereq> {
    let mut missing = Vec::new();

    if !cfg!(target_os = "linux") {
        missing.push(MissingPrereq {
            name: "Linux host",
            purpose: "builds mutate the running host's devices and mounts",
            install_hint: "run on a Linux VM inside the target cloud",
        });
        return missing;
    }

    for (name, purpose) in [
        ("mount", "mounting the attached OS disk and chroot pseudo-filesystems"),
        ("umount", "tearing mounts back down during cleanup"),
        ("chroot", "running provisioning commands inside the image root"),
    ] {
        if !command_exists(name) {
            missing.push(MissingPrereq {
                name,
                purpose,
                install_hint: "part of util-linux/coreutils (usually pre-installed)",
            });
        }
    }

    missing
}

/// Format a list of missing prerequisites into a user-friendly error message.
pub fn format_missing(missing: &[MissingPrereq]) -> String {
    use std::fmt::Write as _;
    let mut msg = String::from("missing prerequisites:\n");
    for m in missing {
        let _ = writeln!(msg, "{m}");
    }
    msg.push_str("\nImageforge requires these tools to build images in a chroot.");
    msg
}
