// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Flow and pressure propagation.
//!
//! Every root-to-leaf path carries the per-terminal flow share of the space
//! its leaf terminal serves. The share is added to every node from the
//! air-handling unit down to the leaf, so a trunk shared by several paths
//! ends up with the sum of all flows below it. Path pressure loss is a
//! running sum of element losses from the unit to each node.

use ifc_lite_hvac_model::{ElementKind, GlobalId};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::airflow::SpaceAirFlow;
use crate::clash::SpaceTerminalMap;
use crate::direction::FlowDirection;
use crate::tree::{ConnectivityTree, NodeKey};

/// Index from terminal to the space it serves and its flow share
#[derive(Debug, Clone, Default)]
pub struct TerminalShares {
    shares: FxHashMap<GlobalId, (GlobalId, f64)>,
}

impl TerminalShares {
    /// Build the index from the clash result and the space estimates.
    pub fn new(map: &SpaceTerminalMap, flows: &[SpaceAirFlow]) -> Self {
        let by_space: FxHashMap<&GlobalId, &SpaceAirFlow> =
            flows.iter().map(|flow| (&flow.space, flow)).collect();

        let mut shares = FxHashMap::default();
        for entry in map.spaces() {
            let Some(flow) = by_space.get(&entry.space) else {
                continue;
            };
            for direction in FlowDirection::ALL {
                for terminal in entry.terminals.get(direction) {
                    shares.insert(terminal.clone(), (entry.space.clone(), flow.share(direction)));
                }
            }
        }
        Self { shares }
    }

    /// Space and flow share of a terminal
    pub fn get(&self, terminal: &GlobalId) -> Option<(&GlobalId, f64)> {
        self.shares.get(terminal).map(|(space, share)| (space, *share))
    }

    pub fn len(&self) -> usize {
        self.shares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

/// Counts from one propagation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationSummary {
    /// Root-to-leaf paths walked
    pub paths: usize,
    /// Paths whose leaf terminal was matched to a space
    pub matched_paths: usize,
    /// Leaf terminals without a space
    pub unmatched_terminals: Vec<GlobalId>,
}

/// Number of leading path nodes that carry no flow: the root and the
/// system node.
const LABEL_DEPTH: usize = 2;

/// Propagate terminal flow shares through the tree.
///
/// Flow accumulates, so propagating twice doubles every flow. Run it once
/// on a freshly built tree.
pub fn propagate(tree: &mut ConnectivityTree, shares: &TerminalShares) -> PropagationSummary {
    let mut summary = PropagationSummary::default();

    for path in tree.paths_to_leaves() {
        summary.paths += 1;
        let Some(&leaf) = path.last() else {
            continue;
        };

        let share = match leaf_share(tree, leaf, shares) {
            LeafShare::Matched(share) => {
                summary.matched_paths += 1;
                share
            }
            LeafShare::UnmatchedTerminal(terminal) => {
                tracing::debug!(
                    terminal = %terminal,
                    "terminal has no space, path carries no flow"
                );
                summary.unmatched_terminals.push(terminal);
                0.0
            }
            LeafShare::NotTerminal => 0.0,
        };

        for &key in path.iter().skip(LABEL_DEPTH) {
            let parent_path_loss = tree
                .parent(key)
                .and_then(|p| tree.node(p))
                .map_or(0.0, |p| p.path_pressure_loss);
            if let Some(node) = tree.node_mut(key) {
                node.add_flow(share);
                node.path_pressure_loss =
                    parent_path_loss + node.element_pressure_loss.unwrap_or(0.0);
            }
        }
    }

    refresh_path_losses(tree);

    tracing::info!(
        paths = summary.paths,
        matched = summary.matched_paths,
        unmatched = summary.unmatched_terminals.len(),
        "propagated air flow"
    );

    summary
}

enum LeafShare {
    Matched(f64),
    UnmatchedTerminal(GlobalId),
    NotTerminal,
}

fn leaf_share(tree: &ConnectivityTree, leaf: NodeKey, shares: &TerminalShares) -> LeafShare {
    let Some(node) = tree.node(leaf) else {
        return LeafShare::NotTerminal;
    };
    let Some(element) = node.element.as_ref() else {
        return LeafShare::NotTerminal;
    };
    match shares.get(element) {
        Some((_, share)) => LeafShare::Matched(share),
        None if node.kind == ElementKind::AirTerminal => {
            LeafShare::UnmatchedTerminal(element.clone())
        }
        None => LeafShare::NotTerminal,
    }
}

/// Recompute every path pressure loss top-down from the final flows.
///
/// During the path walk a node's path loss is computed from its parent's
/// value at that moment; later paths through the parent change it.
pub fn refresh_path_losses(tree: &mut ConnectivityTree) {
    for key in tree.pre_order() {
        let parent_path_loss = tree
            .parent(key)
            .and_then(|p| tree.node(p))
            .map_or(0.0, |p| p.path_pressure_loss);
        if let Some(node) = tree.node_mut(key) {
            node.refresh_pressure_loss();
            node.path_pressure_loss = parent_path_loss + node.element_pressure_loss.unwrap_or(0.0);
        }
    }
}
