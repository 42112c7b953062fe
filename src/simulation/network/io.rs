use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::simulation::network::Network;

#[derive(Debug, Error)]
pub enum NetworkLoadError {
    #[error("failed to read network file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse network file: {0}")]
    Parse(#[from] serde_path_to_error::Error<serde_yaml::Error>),
    #[error("link {link} references unknown node {node}")]
    UnknownNode { link: String, node: String },
}

#[derive(Serialize, Deserialize, Debug)]
struct IONetwork {
    #[serde(default = "default_cell_size")]
    effective_cell_size: f32,
    nodes: Vec<IONode>,
    links: Vec<IOLink>,
}

fn default_cell_size() -> f32 {
    7.5
}

#[derive(Serialize, Deserialize, Debug)]
struct IONode {
    id: String,
    #[serde(default)]
    x: f32,
    #[serde(default)]
    y: f32,
}

#[derive(Serialize, Deserialize, Debug)]
struct IOLink {
    id: String,
    from: String,
    to: String,
    length: f64,
    capacity: f32,
    freespeed: f32,
    permlanes: f32,
    #[serde(default)]
    transit_stop: bool,
}

impl Network {
    pub fn from_file(path: &Path) -> Result<Network, NetworkLoadError> {
        let content = fs::read_to_string(path)?;
        let deserializer = serde_yaml::Deserializer::from_str(&content);
        let io_network: IONetwork = serde_path_to_error::deserialize(deserializer)?;

        let mut network = Network::new();
        network.effective_cell_size = io_network.effective_cell_size;
        for node in &io_network.nodes {
            network.create_node(&node.id, node.x, node.y);
        }
        for link in &io_network.links {
            let from = network.node_ids.try_get_from_ext(&link.from).ok_or_else(|| {
                NetworkLoadError::UnknownNode {
                    link: link.id.clone(),
                    node: link.from.clone(),
                }
            })?;
            let to = network.node_ids.try_get_from_ext(&link.to).ok_or_else(|| {
                NetworkLoadError::UnknownNode {
                    link: link.id.clone(),
                    node: link.to.clone(),
                }
            })?;
            network.create_link(
                &link.id,
                &from,
                &to,
                link.length,
                link.capacity,
                link.freespeed,
                link.permlanes,
                link.transit_stop,
            );
        }

        info!(
            "Loaded network with {} nodes and {} links from {path:?}",
            network.nodes.len(),
            network.links.len()
        );
        Ok(network)
    }
}
