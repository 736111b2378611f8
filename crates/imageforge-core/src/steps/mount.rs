//! Steps that run on the host: shell hooks, mounting the OS disk,
//! populating the chroot, and provisioning inside it.

use super::RunContext;
use crate::bag::keys;
use crate::CoreError;
use imageforge_schema::{render, wrap_command, ChrootMount, TemplateVars};
use tracing::{debug, info, warn};

fn run_commands(
    ctx: &mut RunContext<'_>,
    field: &str,
    commands: &[String],
    vars: &TemplateVars,
) -> Result<(), CoreError> {
    for command in commands {
        let rendered = render(field, command, vars)?;
        let wrapped = wrap_command(ctx.command_wrapper, &rendered)?;
        debug!("running {field} command: {wrapped}");
        ctx.os.run_command(&wrapped)?;
    }
    Ok(())
}

pub(super) fn pre_mount(ctx: &mut RunContext<'_>, commands: &[String]) -> Result<(), CoreError> {
    let device = ctx.bag.require(keys::DEVICE)?.to_owned();
    let vars = TemplateVars::new().with_device(&device);
    run_commands(ctx, "pre_mount_commands", commands, &vars)
}

pub(super) fn mount(
    ctx: &mut RunContext<'_>,
    path_template: &str,
    partition: &str,
    options: &[String],
) -> Result<(), CoreError> {
    let device = ctx.bag.require(keys::DEVICE)?.to_owned();
    let source = format!("{device}{partition}");
    let vars = TemplateVars::new().with_device(&device);
    let path = render("mount_path", path_template, &vars)?;

    ctx.os.create_dir(&path)?;
    info!("mounting {source} at {path}");
    ctx.os.mount(&source, &path, None, options)?;
    ctx.bag.put(keys::MOUNT_PATH, path);
    Ok(())
}

pub(super) fn post_mount(ctx: &mut RunContext<'_>, commands: &[String]) -> Result<(), CoreError> {
    let device = ctx.bag.require(keys::DEVICE)?.to_owned();
    let mount_path = ctx.bag.require(keys::MOUNT_PATH)?.to_owned();
    let vars = TemplateVars::new()
        .with_device(&device)
        .with_mount_path(&mount_path);
    run_commands(ctx, "post_mount_commands", commands, &vars)
}

pub(super) fn mount_extra(
    ctx: &mut RunContext<'_>,
    mounts: &[ChrootMount],
) -> Result<(), CoreError> {
    let mount_path = ctx.bag.require(keys::MOUNT_PATH)?.to_owned();
    for m in mounts {
        let target = format!("{mount_path}{}", m.target);
        ctx.os.create_dir(&target)?;
        debug!("mounting {} ({}) at {target}", m.source, m.fstype);
        if m.fstype == "bind" {
            ctx.os.mount(&m.source, &target, None, &["bind".to_owned()])?;
        } else {
            ctx.os.mount(&m.source, &target, Some(&m.fstype), &[])?;
        }
        // recorded per mount so a mid-list failure unwinds exactly
        // what was mounted
        ctx.bag.push_list(keys::EXTRA_MOUNTS, target);
    }
    Ok(())
}

pub(super) fn copy_files(ctx: &mut RunContext<'_>, files: &[String]) -> Result<(), CoreError> {
    let mount_path = ctx.bag.require(keys::MOUNT_PATH)?.to_owned();
    for file in files {
        let destination = format!("{mount_path}{file}");
        debug!("copying {file} to {destination}");
        ctx.os.copy_file(file, &destination)?;
        ctx.bag.push_list(keys::COPIED_FILES, destination);
    }
    Ok(())
}

pub(super) fn provision(ctx: &mut RunContext<'_>) -> Result<(), CoreError> {
    let mount_path = ctx.bag.require(keys::MOUNT_PATH)?.to_owned();
    info!("provisioning chroot at {mount_path}");
    ctx.os.provision(&mount_path)?;
    Ok(())
}

/// Undo the mount and copy steps on the success path, before capture.
/// Each undone item is removed from the bag first, so the unwind-phase
/// cleanups of the same steps become no-ops.
pub(super) fn early_cleanup(ctx: &mut RunContext<'_>) -> Result<(), CoreError> {
    let mut extra = ctx.bag.take_list(keys::EXTRA_MOUNTS);
    while let Some(target) = extra.pop() {
        if let Err(e) = ctx.os.unmount(&target) {
            extra.push(target);
            for t in extra {
                ctx.bag.push_list(keys::EXTRA_MOUNTS, t);
            }
            return Err(e.into());
        }
    }

    let mut copied = ctx.bag.take_list(keys::COPIED_FILES);
    while let Some(path) = copied.pop() {
        if let Err(e) = ctx.os.remove_file(&path) {
            copied.push(path);
            for p in copied {
                ctx.bag.push_list(keys::COPIED_FILES, p);
            }
            return Err(e.into());
        }
    }

    if let Some(path) = ctx.bag.take(keys::MOUNT_PATH) {
        info!("unmounting {path}");
        if let Err(e) = ctx.os.unmount(&path) {
            ctx.bag.put(keys::MOUNT_PATH, path);
            return Err(e.into());
        }
    }
    Ok(())
}

pub(super) fn cleanup_mount(ctx: &mut RunContext<'_>) -> Vec<String> {
    if let Some(path) = ctx.bag.take(keys::MOUNT_PATH) {
        if let Err(e) = ctx.os.unmount(&path) {
            warn!("failed to unmount {path}: {e}");
        }
    }
    Vec::new()
}

pub(super) fn cleanup_mount_extra(ctx: &mut RunContext<'_>) -> Vec<String> {
    let mut targets = ctx.bag.take_list(keys::EXTRA_MOUNTS);
    while let Some(target) = targets.pop() {
        if let Err(e) = ctx.os.unmount(&target) {
            warn!("failed to unmount {target}: {e}");
        }
    }
    Vec::new()
}

pub(super) fn cleanup_copy_files(ctx: &mut RunContext<'_>) -> Vec<String> {
    for path in ctx.bag.take_list(keys::COPIED_FILES) {
        if let Err(e) = ctx.os.remove_file(&path) {
            warn!("failed to remove {path}: {e}");
        }
    }
    Vec::new()
}
