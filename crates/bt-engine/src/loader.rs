//! Loaders for reading behavior graphs and engine configuration from files.
//!
//! Graphs are stored as RON ([`GraphAsset`]); engine configuration as TOML
//! ([`EngineConfig`]).

use std::path::Path;

use crate::config::EngineConfig;
use crate::graph::{GraphAsset, LeafRegistry};
use crate::Tree;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}

/// Loader for behavior graphs saved as RON.
pub struct GraphLoader;

impl GraphLoader {
    /// Parses a graph asset from RON text.
    pub fn parse(source: &str) -> LoadResult<GraphAsset> {
        ron::from_str(source).map_err(|e| anyhow::anyhow!("Failed to parse graph RON: {}", e))
    }

    /// Loads a graph asset from a RON file.
    pub fn load(path: &Path) -> LoadResult<GraphAsset> {
        let content = read_file(path)?;
        Self::parse(&content)
    }

    /// Loads a RON file and builds a template tree from it.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the RON file containing a `GraphAsset`
    /// * `registry` - Constructors for the leaf names the graph uses
    /// * `config` - Defaults for composites without an explicit cascade flag
    pub fn load_tree<C: 'static>(
        path: &Path,
        registry: &LeafRegistry<C>,
        config: &EngineConfig,
    ) -> LoadResult<Tree<C>> {
        let asset = Self::load(path)?;
        let tree = asset.build_tree(registry, config).map_err(|e| {
            anyhow::anyhow!("Invalid behavior graph {}: {}", path.display(), e)
        })?;

        tracing::debug!(path = %path.display(), nodes = tree.len(), "loaded behavior graph");
        Ok(tree)
    }

    /// Serializes a graph asset to pretty RON.
    pub fn to_string(asset: &GraphAsset) -> LoadResult<String> {
        ron::ser::to_string_pretty(asset, ron::ser::PrettyConfig::default())
            .map_err(|e| anyhow::anyhow!("Failed to serialize graph RON: {}", e))
    }
}

/// Loader for engine configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Parses engine configuration from TOML text. Missing keys keep their
    /// defaults.
    pub fn parse(source: &str) -> LoadResult<EngineConfig> {
        toml::from_str(source).map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))
    }

    /// Load config data from a TOML file.
    pub fn load(path: &Path) -> LoadResult<EngineConfig> {
        let content = read_file(path)?;
        Self::parse(&content)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::{NodeId, Status};

    const GRAPH: &str = r#"
        GraphAsset(
            nodes: [
                NodeSpec(id: 1, kind: Root(child: Some(2)), layout: Some((0.0, 0.0))),
                NodeSpec(
                    id: 2,
                    kind: Composite(kind: Selector, children: [3, 5], cascade: Some(true)),
                ),
                NodeSpec(
                    id: 3,
                    kind: Decorator(
                        rule: Compare(key: "armies", op: Greater, threshold: 3),
                        child: Some(4),
                    ),
                ),
                NodeSpec(id: 4, kind: Leaf(name: "succeed")),
                NodeSpec(id: 5, kind: Decorator(rule: Invert, child: Some(6))),
                NodeSpec(id: 6, kind: Leaf(name: "succeed")),
            ],
        )
    "#;

    #[test]
    fn parses_graph_ron() {
        let asset = GraphLoader::parse(GRAPH).unwrap();
        assert_eq!(asset.nodes.len(), 6);
        assert_eq!(asset.node(NodeId(1)).unwrap().layout, Some((0.0, 0.0)));
        assert_eq!(asset.node(NodeId(5)).unwrap().layout, None);
    }

    #[test]
    fn loads_tree_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(GRAPH.as_bytes()).unwrap();

        let template: Tree<()> =
            GraphLoader::load_tree(file.path(), &LeafRegistry::new(), &EngineConfig::default())
                .unwrap();
        let mut tree = template.instantiate();
        tree.start();

        // Gate fails (no armies) and the inverted leaf fails too.
        assert_eq!(tree.update(&mut ()), Status::Failure);
    }

    #[test]
    fn serialized_asset_parses_back() {
        let asset = GraphLoader::parse(GRAPH).unwrap();
        let text = GraphLoader::to_string(&asset).unwrap();
        assert_eq!(GraphLoader::parse(&text).unwrap(), asset);
    }

    #[test]
    fn reports_parse_and_io_errors() {
        let err = GraphLoader::parse("GraphAsset(nodes: [").unwrap_err();
        assert!(err.to_string().contains("Failed to parse graph RON"));

        let err = GraphLoader::load(Path::new("/definitely/not/here.ron")).unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }

    #[test]
    fn invalid_graph_mentions_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"GraphAsset(nodes: [])").unwrap();

        let err = GraphLoader::load_tree::<()>(
            file.path(),
            &LeafRegistry::new(),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("graph has no root node"));
    }

    #[test]
    fn config_toml_keeps_defaults_for_missing_keys() {
        let config = ConfigLoader::parse(
            r#"
            default_cascade = false

            [brain]
            think_every_ticks = 30
            "#,
        )
        .unwrap();
        assert!(!config.default_cascade);
        assert_eq!(config.brain.think_every_ticks, 30);
        assert_eq!(config.brain.think_offset_ticks, 0);

        assert_eq!(ConfigLoader::parse("").unwrap(), EngineConfig::default());
    }
}
