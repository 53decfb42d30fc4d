use anyhow::{Context, Result};
use megamol_graph::{Catalog, Graph, GraphConfig, UncleanDeletionPolicy};
use megamol_protocol::{EditBatch, EditCommand};
use std::env;
use std::fs;
use std::path::Path;

pub(crate) const STRICT_ENV: &str = "MEGAMOL_GRAPH_STRICT";

pub(crate) fn load_config(path: Option<&Path>) -> Result<GraphConfig> {
    let mut config = match path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str::<GraphConfig>(&raw)
                .with_context(|| format!("Invalid config file {}", path.display()))?
        }
        None => GraphConfig::default(),
    };
    if env_truthy(STRICT_ENV) {
        log::debug!("{STRICT_ENV} set, using strict unclean-deletion policy");
        config.unclean_deletion = UncleanDeletionPolicy::Strict;
    }
    config
        .validate()
        .map_err(|msg| anyhow::anyhow!("Invalid configuration: {msg}"))?;
    Ok(config)
}

pub(crate) fn load_catalog(path: &Path) -> Result<Catalog> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read catalog from {}", path.display()))?;
    let catalog = Catalog::from_json_str(&raw)
        .with_context(|| format!("Failed to load catalog {}", path.display()))?;
    log::debug!(
        "Loaded catalog with {} module classes and {} call classes",
        catalog.modules().len(),
        catalog.calls().len()
    );
    Ok(catalog)
}

pub(crate) fn load_project(catalog: &Catalog, config: GraphConfig, path: &Path) -> Result<Graph> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read project from {}", path.display()))?;
    Graph::from_json_str(catalog, config, &raw)
        .with_context(|| format!("Failed to load project {}", path.display()))
}

/// Accepts `{"edits": [...]}` as well as a bare array of edits.
pub(crate) fn load_edits(path: &Path) -> Result<Vec<EditCommand>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read edits from {}", path.display()))?;
    if let Ok(batch) = serde_json::from_str::<EditBatch>(&raw) {
        return Ok(batch.edits);
    }
    serde_json::from_str::<Vec<EditCommand>>(&raw)
        .with_context(|| format!("Invalid edit batch {}", path.display()))
}

fn env_truthy(var: &str) -> bool {
    env::var(var)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn config_file_overrides_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("graph.toml");
        fs::write(&path, "group_name_prefix = \"Cluster_\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.group_name_prefix, "Cluster_");
    }

    #[test]
    fn invalid_config_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("graph.toml");
        fs::write(&path, "group_name_prefix = \"G1_\"\n").unwrap();

        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn edits_accept_bare_arrays() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("edits.json");
        fs::write(
            &path,
            r#"[{ "action": "add_group", "name": "render" }]"#,
        )
        .unwrap();

        let edits = load_edits(&path).unwrap();
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].action_name(), "add_group");
    }
}
