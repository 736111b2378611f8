//! Build orchestration for Imageforge.
//!
//! This crate turns a validated `BuildConfig` into a linear sequence of
//! [`BuildStep`]s and runs them one at a time against the `CloudClient`
//! and `OsOps` collaborators. Steps communicate through a [`StateBag`];
//! when a step fails, every previously completed step is cleaned up in
//! reverse order before the error is reported.

pub mod bag;
pub mod cancel;
pub mod executor;
pub mod graph;
pub mod steps;

pub use bag::{keys, StateBag};
pub use cancel::{cancel_requested, install_signal_handler, request_cancel};
pub use executor::{run_build, Artifact, BuildError};
pub use graph::build_steps;
pub use steps::{BuildStep, RunContext};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("cloud error: {0}")]
    Cloud(#[from] imageforge_cloud::CloudError),
    #[error("host error: {0}")]
    Os(#[from] imageforge_cloud::OsError),
    #[error(transparent)]
    Template(#[from] imageforge_schema::TemplateError),
    #[error("internal error: state key {0:?} was never produced")]
    MissingState(&'static str),
    #[error("source disk {disk} is in {actual}, but this host builds in {expected}")]
    SourceDiskLocation {
        disk: String,
        actual: String,
        expected: String,
    },
    #[error("build cancelled")]
    Cancelled,
}
