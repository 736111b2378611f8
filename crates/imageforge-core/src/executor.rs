//! Sequential step execution with unconditional reverse-order cleanup.

use crate::bag::{keys, StateBag};
use crate::cancel::cancel_requested;
use crate::graph::build_steps;
use crate::steps::{BuildStep, RunContext};
use crate::CoreError;
use imageforge_cloud::{CloudClient, OsOps};
use imageforge_schema::{BuildConfig, EnvironmentInfo};
use thiserror::Error;
use tracing::{error, info};

/// What a successful build produced, and what it left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub image_resource_id: Option<String>,
    pub gallery_image_version_id: Option<String>,
    /// Resources retained by `skip_cleanup` or leaked by a failed
    /// deletion, for the caller to surface.
    pub retained_resources: Vec<String>,
}

#[derive(Debug, Error)]
#[error("build failed at step {step}: {source}")]
pub struct BuildError {
    pub step: &'static str,
    pub source: CoreError,
    /// Resources cleanup could not (or was told not to) remove.
    pub leftover_resources: Vec<String>,
}

/// Run a full build: construct the step sequence, execute it in order,
/// and clean up.
///
/// Cleanup always covers exactly the steps that completed, in reverse
/// order, on success and failure alike; a failed step is never cleaned
/// up, since its own side effects did not complete. Cancellation is
/// honored between steps, never mid-step.
pub fn run_build(
    config: &BuildConfig,
    env: &EnvironmentInfo,
    cloud: &dyn CloudClient,
    os: &dyn OsOps,
) -> Result<Artifact, BuildError> {
    let steps = build_steps(config, env);
    let mut bag = StateBag::new();
    let mut completed: Vec<&BuildStep> = Vec::new();
    let mut failure: Option<(&'static str, CoreError)> = None;

    for step in &steps {
        if cancel_requested() {
            info!("cancellation requested, stopping before {}", step.name());
            failure = Some((step.name(), CoreError::Cancelled));
            break;
        }
        info!("step {}/{}: {}", completed.len() + 1, steps.len(), step.name());
        let mut ctx = RunContext {
            bag: &mut bag,
            cloud,
            os,
            command_wrapper: &config.command_wrapper,
        };
        match step.run(&mut ctx) {
            Ok(()) => completed.push(step),
            Err(e) => {
                error!("step {} failed: {e}", step.name());
                failure = Some((step.name(), e));
                break;
            }
        }
    }

    let mut retained = Vec::new();
    for step in completed.iter().rev() {
        let mut ctx = RunContext {
            bag: &mut bag,
            cloud,
            os,
            command_wrapper: &config.command_wrapper,
        };
        retained.extend(step.cleanup(&mut ctx, config.skip_cleanup));
    }

    match failure {
        Some((step, source)) => Err(BuildError {
            step,
            source,
            leftover_resources: retained,
        }),
        None => Ok(Artifact {
            image_resource_id: config.image_resource_id.as_ref().map(ToString::to_string),
            gallery_image_version_id: bag.take(keys::GALLERY_VERSION_ID),
            retained_resources: retained,
        }),
    }
}
