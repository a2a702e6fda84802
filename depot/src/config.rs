use anyhow::{Result, bail};
use depot_core::StoreConfig;

const DEFAULT_REGION: &str = "auto";

/// Reads the connection parameters for the object store. All of them are
/// required before any I/O happens; `.env` files are honored by the caller.
pub fn load_store_config() -> Result<StoreConfig> {
    from_lookup(|name| std::env::var(name).ok())
}

fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<StoreConfig> {
    Ok(StoreConfig {
        endpoint: required(&lookup, "DEPOT_ENDPOINT")?,
        bucket: required(&lookup, "DEPOT_BUCKET")?,
        region: lookup("DEPOT_REGION")
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string()),
        access_key_id: required(&lookup, "DEPOT_ACCESS_KEY_ID")?,
        access_key_secret: required(&lookup, "DEPOT_ACCESS_KEY_SECRET")?,
    })
}

fn required(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<String> {
    match lookup(name) {
        Some(value) if !value.is_empty() => Ok(value),
        _ => bail!("{name} is not set"),
    }
}
