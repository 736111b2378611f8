use super::{json_pretty, load_and_resolve, EXIT_SUCCESS};
use imageforge_core::{build_steps, BuildStep};
use std::path::Path;

pub fn run(manifest: &Path, json: bool) -> Result<u8, String> {
    let (resolution, env) = load_and_resolve(manifest)?;
    let steps = build_steps(&resolution.config, &env);
    let names: Vec<&str> = steps.iter().map(BuildStep::name).collect();

    if json {
        let payload = serde_json::json!({
            "location": env.location,
            "steps": names,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("build plan ({} steps, location {}):", names.len(), env.location);
        for (i, name) in names.iter().enumerate() {
            println!("  {}. {name}", i + 1);
        }
    }
    Ok(EXIT_SUCCESS)
}
