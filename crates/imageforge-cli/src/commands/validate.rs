use super::{json_pretty, load_and_resolve, EXIT_SUCCESS};
use imageforge_schema::SourceMode;
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let (resolution, _env) = load_and_resolve(manifest)?;
    let config = &resolution.config;

    let source = match &config.source {
        SourceMode::FromScratch => "from-scratch".to_owned(),
        SourceMode::PlatformImage(image) => format!("platform image {image}"),
        SourceMode::ExistingDisk(disk) => format!("managed disk {disk}"),
    };

    if json {
        let payload = serde_json::json!({
            "valid": true,
            "source": source,
            "temporary_os_disk_id": config.temporary_os_disk_id,
            "image_resource_id": config.image_resource_id.as_ref().map(ToString::to_string),
            "shared_image_destination": config.shared_image_destination.is_some(),
            "warnings": resolution.warnings,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("manifest is valid");
        println!("source: {source}");
        println!("temporary OS disk: {}", config.temporary_os_disk_id);
        if let Some(id) = &config.image_resource_id {
            println!("managed image output: {id}");
        }
        if let Some(dest) = &config.shared_image_destination {
            println!(
                "gallery output: {}/{} version {}",
                dest.gallery_name, dest.image_name, dest.image_version
            );
        }
        for warning in &resolution.warnings {
            println!("warning: {warning}");
        }
    }
    Ok(EXIT_SUCCESS)
}
