//! Tile-configuration parsing.
//!
//! The display service's configuration file names the tile configuration on
//! a `tileConfiguration <path>` line. The tile configuration describes the
//! wall geometry and one `DisplayNode` block per machine:
//!
//! ```text
//! TileDisplay
//!     Dimensions 2 1
//!     Mullions 0.75 0.75 0.75 0.75
//!     Resolution 1600 1200
//!     PPI 100
//!     Machines 2
//! DisplayNode
//!     Name left
//!     IP 10.0.0.1:22
//!     Monitors 1 (0,0)
//! ```
//!
//! `#` starts a comment anywhere on a line.

use std::path::{Path, PathBuf};

use crate::domain::error::TopologyError;
use crate::domain::kill::LOOPBACK;

/// One machine driving part of the wall.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tile {
    pub name: String,
    /// Network address without a port suffix.
    pub address: Option<String>,
    /// Monitor grid positions driven by this machine.
    pub monitors: Vec<(u32, u32)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterTopology {
    /// Columns × rows of tiles.
    pub dimensions: (u32, u32),
    /// Top, bottom, left, right, in inches.
    pub mullions: [f64; 4],
    /// Per-tile resolution in pixels.
    pub resolution: (u32, u32),
    pub ppi: u32,
    pub machines: u32,
    /// Tiles in file order. A later block with an address already seen
    /// replaces the earlier one in place.
    pub tiles: Vec<Tile>,
}

impl Default for ClusterTopology {
    fn default() -> Self {
        Self {
            dimensions: (1, 1),
            mullions: [0.75; 4],
            resolution: (800, 600),
            ppi: 72,
            machines: 1,
            tiles: Vec::new(),
        }
    }
}

impl ClusterTopology {
    /// Parse the contents of a tile-configuration file.
    pub fn parse(text: &str) -> Result<Self, TopologyError> {
        let mut topology = ClusterTopology::default();
        let mut current: Option<Tile> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.split('#').next().unwrap_or_default().trim();
            let Some((keyword, rest)) = split_keyword(line) else {
                continue;
            };
            let malformed = |reason: &'static str| TopologyError::Malformed {
                line: line_no,
                text: line.to_string(),
                reason,
            };

            match keyword {
                "TileDisplay" => {}
                "Dimensions" => {
                    topology.dimensions = parse_pair(rest).ok_or(malformed("expected two integers"))?;
                }
                "Mullions" => {
                    let values: Vec<f64> = rest
                        .split_whitespace()
                        .map(str::parse)
                        .collect::<Result<_, _>>()
                        .map_err(|_| malformed("expected four numbers"))?;
                    topology.mullions = values
                        .try_into()
                        .map_err(|_| malformed("expected four numbers"))?;
                }
                "Resolution" => {
                    topology.resolution = parse_pair(rest).ok_or(malformed("expected two integers"))?;
                }
                "PPI" => {
                    let ppi: f64 = rest.parse().map_err(|_| malformed("expected a number"))?;
                    topology.ppi = whole_ppi(ppi);
                }
                "Machines" => {
                    topology.machines = rest.parse().map_err(|_| malformed("expected an integer"))?;
                }
                "DisplayNode" => {
                    if let Some(tile) = current.replace(Tile::default()) {
                        topology.push_tile(tile);
                    }
                }
                "Name" => {
                    let tile = current.as_mut().ok_or(malformed("outside a DisplayNode block"))?;
                    tile.name = rest.to_string();
                }
                "IP" => {
                    let tile = current.as_mut().ok_or(malformed("outside a DisplayNode block"))?;
                    let host = rest.split(':').next().unwrap_or_default().trim();
                    if host.is_empty() {
                        return Err(malformed("empty address"));
                    }
                    tile.address = Some(host.to_string());
                }
                "Monitors" => {
                    let tile = current.as_mut().ok_or(malformed("outside a DisplayNode block"))?;
                    tile.monitors = parse_monitors(rest).ok_or(malformed("bad monitor position"))?;
                }
                _ => {}
            }
        }

        if let Some(tile) = current {
            topology.push_tile(tile);
        }
        Ok(topology)
    }

    fn push_tile(&mut self, tile: Tile) {
        let existing = tile.address.as_ref().and_then(|addr| {
            self.tiles
                .iter()
                .position(|t| t.address.as_ref() == Some(addr))
        });
        match existing {
            Some(pos) => self.tiles[pos] = tile,
            None => self.tiles.push(tile),
        }
    }

    /// Distinct tile addresses in file order.
    #[must_use]
    pub fn hosts(&self) -> Vec<String> {
        let mut hosts: Vec<String> = Vec::new();
        for addr in self.tiles.iter().filter_map(|t| t.address.as_ref()) {
            if !hosts.contains(addr) {
                hosts.push(addr.clone());
            }
        }
        hosts
    }

    /// Nodes targeted by a cluster-wide kill: every tile host, then loopback.
    #[must_use]
    pub fn kill_targets(&self) -> Vec<String> {
        with_loopback(self.hosts())
    }
}

/// Append the loopback node unless it is already listed.
#[must_use]
pub fn with_loopback(mut hosts: Vec<String>) -> Vec<String> {
    if !hosts.iter().any(|h| h == LOOPBACK) {
        hosts.push(LOOPBACK.to_string());
    }
    hosts
}

fn split_keyword(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    Some(match line.split_once(char::is_whitespace) {
        Some((keyword, rest)) => (keyword, rest.trim()),
        None => (line, ""),
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_ppi(ppi: f64) -> u32 {
    ppi.max(0.0) as u32
}

fn parse_pair(rest: &str) -> Option<(u32, u32)> {
    let mut parts = rest.split_whitespace().map(str::parse::<u32>);
    let first = parts.next()?.ok()?;
    let second = parts.next()?.ok()?;
    Some((first, second))
}

/// `<count> (x,y) (x,y) ...`. The count is informational.
fn parse_monitors(rest: &str) -> Option<Vec<(u32, u32)>> {
    let (_count, positions) = rest.split_once(char::is_whitespace)?;
    let numbers: Vec<u32> = positions
        .split(|c: char| c == '(' || c == ')' || c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    Some(numbers.chunks_exact(2).map(|p| (p[0], p[1])).collect())
}

/// Resolve the tile-configuration path named by the display service's
/// configuration file. The last `tileConfiguration` line wins. A relative
/// path resolves against `conf_dir`.
pub fn tile_config_path(conf_text: &str, conf_dir: &Path) -> Result<PathBuf, TopologyError> {
    let named = conf_text
        .lines()
        .map(str::trim)
        .filter(|line| line.starts_with("tileConfiguration"))
        .filter_map(|line| line.split_whitespace().nth(1))
        .last()
        .ok_or(TopologyError::MissingTileConfiguration)?;
    let path = Path::new(named);
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        conf_dir.join(path)
    })
}
