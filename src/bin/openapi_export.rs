use std::{fs, path::PathBuf};

use storefront_api::openapi::ApiDoc;
use utoipa::OpenApi;

/// Writes the OpenAPI document to the given path (default `openapi/storefront-api.json`)
/// so storefront clients can be generated without a running server.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi").join("storefront-api.json"));

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&output_path, ApiDoc::openapi().to_pretty_json()?)?;

    println!("OpenAPI document written to {}", output_path.display());
    Ok(())
}
