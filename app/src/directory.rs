//! Node registry and link snapshots on disk.

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use sui_presets::write_atomic;
use sui_subscribe::ConnectionLink;
use sui_types::{validate_node_id, LinkSource, NodeDirectory, NodeRecord};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("node registry {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("node registry {} is malformed: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// `nodes.json`: a JSON object of node records keyed by node id.
#[derive(Debug)]
pub struct JsonNodeDirectory {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonNodeDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, NodeRecord>, DirectoryError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(source) => {
                return Err(DirectoryError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        let mut nodes: BTreeMap<String, NodeRecord> =
            serde_json::from_slice(&raw).map_err(|source| DirectoryError::Json {
                path: self.path.clone(),
                source,
            })?;
        // the map key is authoritative; older registries omit `id` in the value
        for (id, node) in nodes.iter_mut() {
            if node.id != *id {
                node.id.clone_from(id);
            }
        }
        Ok(nodes)
    }

    fn write_all(&self, nodes: &BTreeMap<String, NodeRecord>) -> Result<(), DirectoryError> {
        let body = serde_json::to_vec_pretty(nodes).map_err(|source| DirectoryError::Json {
            path: self.path.clone(),
            source,
        })?;
        write_atomic(&self.path, &body).map_err(|source| DirectoryError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl NodeDirectory for JsonNodeDirectory {
    type Error = DirectoryError;

    fn get(&self, id: &str) -> Result<Option<NodeRecord>, Self::Error> {
        Ok(self.read_all()?.remove(id))
    }

    fn list(&self) -> Result<Vec<NodeRecord>, Self::Error> {
        Ok(self.read_all()?.into_values().collect())
    }

    fn put(&self, id: &str, record: NodeRecord) -> Result<(), Self::Error> {
        let _guard = self.write_lock.lock();
        let mut nodes = self.read_all()?;
        nodes.insert(id.to_string(), record);
        self.write_all(&nodes)?;
        tracing::info!(node = %id, "node saved");
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, Self::Error> {
        let _guard = self.write_lock.lock();
        let mut nodes = self.read_all()?;
        let removed = nodes.remove(id).is_some();
        if removed {
            self.write_all(&nodes)?;
            tracing::info!(node = %id, "node removed");
        }
        Ok(removed)
    }
}

/// Link snapshots, one `{node_id}.json` per node, as written by
/// `sui links --save` on each agent.
#[derive(Debug, Clone)]
pub struct LinkSnapshots {
    dir: PathBuf,
}

impl LinkSnapshots {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, node_id: &str) -> Option<PathBuf> {
        validate_node_id(node_id)
            .ok()
            .map(|id| self.dir.join(format!("{id}.json")))
    }

    pub fn save(&self, node_id: &str, links: &[ConnectionLink]) -> anyhow::Result<PathBuf> {
        let path = self
            .file_for(node_id)
            .ok_or_else(|| anyhow::anyhow!("node {node_id:?}: invalid node id"))?;
        write_atomic(&path, &serde_json::to_vec_pretty(links)?)?;
        Ok(path)
    }
}

impl LinkSource for LinkSnapshots {
    type Links = Vec<ConnectionLink>;
    type Error = String;

    fn fetch_links(&self, node: &NodeRecord) -> Result<Self::Links, Self::Error> {
        let path = self
            .file_for(&node.id)
            .ok_or_else(|| format!("node {:?}: invalid node id", node.id))?;
        let raw = std::fs::read(&path).map_err(|e| format!("{}: {e}", path.display()))?;
        serde_json::from_slice(&raw).map_err(|e| format!("{}: {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sui_types::PresetKind;

    fn record(name: &str, domain: &str) -> NodeRecord {
        NodeRecord::new(name, domain, true).unwrap()
    }

    #[test]
    fn missing_file_is_empty_registry() {
        let dir = tempfile::tempdir().unwrap();
        let d = JsonNodeDirectory::new(dir.path().join("nodes.json"));
        assert!(d.list().unwrap().is_empty());
        assert_eq!(d.get("5ababd60").unwrap(), None);
        assert!(!d.delete("5ababd60").unwrap());
    }

    #[test]
    fn put_get_delete() {
        let dir = tempfile::tempdir().unwrap();
        let d = JsonNodeDirectory::new(dir.path().join("nodes.json"));
        let r = record("tokyo", "example.com");
        d.put(&r.id, r.clone()).unwrap();

        assert_eq!(d.get("5ababd60").unwrap(), Some(r));
        assert_eq!(d.list().unwrap().len(), 1);

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(d.path()).unwrap()).unwrap();
        assert_eq!(raw["5ababd60"]["domain"], "example.com");

        assert!(d.delete("5ababd60").unwrap());
        assert!(d.list().unwrap().is_empty());
    }

    #[test]
    fn reads_registry_keyed_by_id_with_naive_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(
            &path,
            br#"{"5ababd60":{"name":"tokyo","domain":"example.com","https":true,"added_at":"2024-05-01T12:00:00.123456","status":"unknown"}}"#,
        )
        .unwrap();
        let d = JsonNodeDirectory::new(&path);

        let nodes = d.list().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, "5ababd60");
        assert_eq!(nodes[0].name, "tokyo");
        assert!(nodes[0].added_at.is_some());

        let mut node = d.get("5ababd60").unwrap().unwrap();
        node.mark_checked(true, chrono::Utc::now());
        d.put("5ababd60", node).unwrap();
        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(raw["5ababd60"]["id"], "5ababd60");
        assert_eq!(raw["5ababd60"]["status"], "online");
    }

    #[test]
    fn malformed_registry_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodes.json");
        std::fs::write(&path, b"[1,2").unwrap();
        let err = JsonNodeDirectory::new(&path).list().unwrap_err();
        assert!(err.to_string().contains("malformed"));
    }

    #[test]
    fn snapshots_round_trip_and_reject_bad_ids() {
        let dir = tempfile::tempdir().unwrap();
        let snaps = LinkSnapshots::new(dir.path());
        let links = vec![ConnectionLink {
            protocol: PresetKind::Hysteria2,
            uri: "hysteria2://pw@example.com:10002?sni=example.com".into(),
            port: 10002,
        }];
        let r = record("tokyo", "example.com");
        snaps.save(&r.id, &links).unwrap();
        assert_eq!(snaps.fetch_links(&r).unwrap(), links);

        let missing = record("paris", "paris.example.com");
        assert!(snaps.fetch_links(&missing).is_err());
        assert!(snaps.file_for("../../etc").is_none());
    }
}
