use super::{json_pretty, EXIT_FAILURE, EXIT_SUCCESS};
use imageforge_cloud::{check_host_prereqs, format_missing, EnvMetadataProvider, MetadataProvider};

pub fn run(json: bool) -> Result<u8, String> {
    let missing = check_host_prereqs();
    let metadata = EnvMetadataProvider.compute_info();
    let healthy = missing.is_empty();

    if json {
        let payload = serde_json::json!({
            "healthy": healthy,
            "missing_prereqs": missing.iter().map(|m| m.name).collect::<Vec<_>>(),
            "environment": metadata.as_ref().ok().map(|env| serde_json::json!({
                "subscription_id": env.subscription_id,
                "resource_group": env.resource_group,
                "location": env.location,
            })),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        if missing.is_empty() {
            println!("host prerequisites satisfied");
        } else {
            println!("{}", format_missing(&missing));
        }
        match metadata {
            Ok(env) => println!(
                "environment: subscription {} / {} in {}",
                env.subscription_id, env.resource_group, env.location
            ),
            Err(e) => println!("environment: {e} (mock builds unaffected)"),
        }
    }
    Ok(if healthy { EXIT_SUCCESS } else { EXIT_FAILURE })
}
