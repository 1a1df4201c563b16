use crate::{BusId, Network, Node};
use petgraph::graph::NodeIndex;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};

/// Degree and component summary over the bus/line topology.
#[derive(Debug, Clone, Serialize)]
pub struct GraphStats {
    pub bus_count: usize,
    pub line_count: usize,
    pub islands: usize,
    pub min_degree: usize,
    pub avg_degree: f64,
    pub max_degree: usize,
    /// Buses with no line at all
    pub isolated_buses: usize,
}

/// A synchronous island: buses reachable from each other through lines.
#[derive(Debug, Clone, Serialize)]
pub struct Island {
    pub island_id: usize,
    pub buses: Vec<BusId>,
}

fn bus_indices(network: &Network) -> Vec<NodeIndex> {
    network
        .graph
        .node_indices()
        .filter(|idx| matches!(network.graph[*idx], Node::Bus(_)))
        .collect()
}

pub fn graph_stats(network: &Network) -> GraphStats {
    let buses = bus_indices(network);
    let degrees: Vec<usize> = buses
        .iter()
        .map(|idx| network.graph.edges(*idx).count())
        .collect();
    let bus_count = buses.len();
    let avg_degree = if bus_count == 0 {
        0.0
    } else {
        degrees.iter().sum::<usize>() as f64 / bus_count as f64
    };
    GraphStats {
        bus_count,
        line_count: network.graph.edge_count(),
        islands: bus_islands(network).len(),
        min_degree: degrees.iter().copied().min().unwrap_or(0),
        avg_degree,
        max_degree: degrees.iter().copied().max().unwrap_or(0),
        isolated_buses: degrees.iter().filter(|d| **d == 0).count(),
    }
}

/// Breadth-first labelling of bus islands, in graph insertion order.
pub fn bus_islands(network: &Network) -> Vec<Island> {
    let mut visited = HashSet::new();
    let mut islands = Vec::new();
    for start in bus_indices(network) {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        let mut members = Vec::new();
        while let Some(node) = queue.pop_front() {
            if !visited.insert(node) {
                continue;
            }
            if let Node::Bus(bus) = &network.graph[node] {
                members.push(bus.id);
            }
            for neighbor in network.graph.neighbors(node) {
                if !visited.contains(&neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }
        islands.push(Island {
            island_id: islands.len(),
            buses: members,
        });
    }
    islands
}
