//! Infrastructure implementation of the `TopologySource` port.

use std::path::{Path, PathBuf};

use crate::application::ports::TopologySource;
use crate::domain::topology::{ClusterTopology, tile_config_path};
use crate::domain::TopologyError;

/// Reads the tile configuration named by the display service's
/// configuration file. Both files are re-read on every `load`.
#[derive(Debug, Clone)]
pub struct TileConfigSource {
    display_conf: PathBuf,
}

impl TileConfigSource {
    #[must_use]
    pub fn new(display_conf: PathBuf) -> Self {
        Self { display_conf }
    }
}

fn read(path: &Path) -> Result<String, TopologyError> {
    std::fs::read_to_string(path).map_err(|e| TopologyError::Unreadable {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

impl TopologySource for TileConfigSource {
    fn load(&self) -> Result<ClusterTopology, TopologyError> {
        let conf = read(&self.display_conf)?;
        let conf_dir = self.display_conf.parent().unwrap_or(Path::new("."));
        let tile_path = tile_config_path(&conf, conf_dir)?;
        tracing::debug!(path = %tile_path.display(), "reading tile configuration");
        ClusterTopology::parse(&read(&tile_path)?)
    }
}
