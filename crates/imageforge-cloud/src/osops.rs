use thiserror::Error;

#[derive(Debug, Error)]
pub enum OsError {
    #[error("host I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("command exited with status {status}: {command}")]
    CommandFailed { command: String, status: i32 },
    #[error("device operation failed: {0}")]
    Device(String),
}

/// Host-side operations the pipeline performs on the machine it runs
/// on. Everything here mutates live OS state, which is why step
/// execution is strictly sequential.
pub trait OsOps: Send + Sync {
    /// Attach a managed disk to this host; returns the device path.
    fn attach_disk(&self, disk_resource_id: &str) -> Result<String, OsError>;
    fn detach_disk(&self, disk_resource_id: &str) -> Result<(), OsError>;

    /// Run a (already wrapped) shell command on the host.
    fn run_command(&self, command: &str) -> Result<(), OsError>;

    fn mount(
        &self,
        source: &str,
        target: &str,
        fstype: Option<&str>,
        options: &[String],
    ) -> Result<(), OsError>;
    fn unmount(&self, target: &str) -> Result<(), OsError>;

    fn create_dir(&self, path: &str) -> Result<(), OsError>;
    fn copy_file(&self, source: &str, destination: &str) -> Result<(), OsError>;
    fn remove_file(&self, path: &str) -> Result<(), OsError>;

    /// Invoke the externally supplied provisioning hook inside the
    /// chroot rooted at `mount_path`.
    fn provision(&self, mount_path: &str) -> Result<(), OsError>;
}
