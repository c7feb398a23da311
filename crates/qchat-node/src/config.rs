//! Node configuration: a single JSON file holds every node's settings,
//! keyed by node name, so that a whole test topology ships as one file.

use crate::error::NodeError;
use qchat_types::Endpoint;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
struct RawEntry {
    host: String,
    port: u16,
    root: Option<String>,
}

/// One node's resolved settings: its own endpoint, the name of the node
/// that acts as registry, and that registry's endpoint. A node whose own
/// endpoint matches the registry's IS the registry.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub name: String,
    pub endpoint: Endpoint,
    pub registry_name: String,
    pub registry_endpoint: Endpoint,
}

impl NodeConfig {
    pub fn is_registry(&self) -> bool {
        self.name == self.registry_name
    }

    /// Loads `path` as a JSON object mapping node names to `{host, port,
    /// root?}` and resolves `name`'s entry (and its root's entry) out of
    /// it. A node with no `root` field declares itself the registry.
    pub fn load(path: impl AsRef<Path>, name: &str) -> Result<Self, NodeError> {
        let contents = std::fs::read_to_string(path)?;
        let table: HashMap<String, RawEntry> = serde_json::from_str(&contents)?;
        Self::from_table(&table, name)
    }

    fn from_table(table: &HashMap<String, RawEntry>, name: &str) -> Result<Self, NodeError> {
        let own = table.get(name).ok_or_else(|| NodeError::UnknownNode(name.to_string()))?;
        let registry_name = own.root.clone().unwrap_or_else(|| name.to_string());
        let registry_entry =
            table.get(&registry_name).ok_or_else(|| NodeError::UnknownNode(registry_name.clone()))?;

        Ok(Self {
            name: name.to_string(),
            endpoint: Endpoint::new(own.host.clone(), own.port),
            registry_name,
            registry_endpoint: Endpoint::new(registry_entry.host.clone(), registry_entry.port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_a_node_without_root_is_its_own_registry() {
        let file = write_config(r#"{"Eve": {"host": "127.0.0.1", "port": 33000}}"#);
        let config = NodeConfig::load(file.path(), "Eve").unwrap();
        assert!(config.is_registry());
        assert_eq!(config.registry_endpoint.port, 33000);
    }

    #[test]
    fn test_a_node_with_root_resolves_the_registry_endpoint() {
        let file = write_config(
            r#"{
                "Eve": {"host": "127.0.0.1", "port": 33000},
                "Alice": {"host": "127.0.0.1", "port": 33001, "root": "Eve"}
            }"#,
        );
        let config = NodeConfig::load(file.path(), "Alice").unwrap();
        assert!(!config.is_registry());
        assert_eq!(config.registry_name, "Eve");
        assert_eq!(config.registry_endpoint.port, 33000);
    }

    #[test]
    fn test_unknown_node_name_fails() {
        let file = write_config(r#"{"Eve": {"host": "127.0.0.1", "port": 33000}}"#);
        assert!(matches!(NodeConfig::load(file.path(), "Ghost"), Err(NodeError::UnknownNode(_))));
    }
}
