// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Downstream connectivity trees.
//!
//! One tree holds every identified system:
//!
//! ```text
//! SystemsRoot
//! ├── 360.VI.01                    system node
//! │   └── 360.VI.01_<unit id>      air-handling unit
//! │       └── <duct id>            physical elements in flow order
//! │           └── ...
//! └── 360.VU.01
//!     └── 360.VU.01_<unit id>
//! ```
//!
//! Nodes are keyed by element GlobalId. The unit node is namespaced by its
//! system so that a unit serving a supply and a return system appears under
//! both. Supply systems are walked along `connected_from` (away from the
//! unit), return systems along `connected_to` (towards the unit), following
//! only neighbours grouped by the same system. A visited set makes every
//! element appear at most once per system, so cyclic duct networks terminate.

use std::fmt::Write as _;
use std::str::FromStr;

use ifc_lite_hvac_model::{ElementKind, GlobalId, ModelStore};
use nalgebra::Vector3;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};

use crate::classifier::{Classification, SystemInfo};
use crate::direction::{FlowDirection, NamingConvention};
use crate::error::{Error, Result};
use crate::geometry::{
    classify_fitting, port_orientation, DuctGeometry, FittingShape, GeometryAdapter,
};
use crate::pressure::element_pressure_loss;

new_key_type! {
    /// Key for a node of a [`ConnectivityTree`].
    pub struct NodeKey;
}

/// Identifier of the virtual root node
pub const ROOT_IDENTIFIER: &str = "SystemsRoot";

/// Position of a node in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// The shared virtual root
    Root,
    /// One per system, labels the subtree
    System,
    /// A physical element, the air-handling unit included
    Element,
}

/// A node of the connectivity tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub identifier: String,
    pub role: NodeRole,
    /// Element behind the node (element nodes only)
    pub element: Option<GlobalId>,
    pub kind: ElementKind,
    pub system: Option<String>,
    pub direction: Option<FlowDirection>,
    pub duct: Option<DuctGeometry>,
    /// Rounded unit vector between the two ports of two-port elements
    pub orientation: Option<Vector3<f64>>,
    /// Straight or bend, two-port duct fittings only
    pub fitting: Option<FittingShape>,
    /// Accumulated air flow (l/s)
    pub air_flow: f64,
    /// Own pressure loss at the current flow (Pa), `None` when not modelled
    pub element_pressure_loss: Option<f64>,
    /// Own loss plus the parent's path loss (Pa)
    pub path_pressure_loss: f64,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

impl TreeNode {
    fn label(identifier: String, role: NodeRole, kind: ElementKind) -> Self {
        Self {
            identifier,
            role,
            element: None,
            kind,
            system: None,
            direction: None,
            duct: None,
            orientation: None,
            fitting: None,
            air_flow: 0.0,
            element_pressure_loss: None,
            path_pressure_loss: 0.0,
            parent: None,
            children: Vec::new(),
        }
    }

    /// IFC type name of the node's element
    pub fn ifc_type(&self) -> &str {
        self.kind.ifc_name()
    }

    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> &[NodeKey] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Add flow and recompute the element's own pressure loss.
    pub fn add_flow(&mut self, flow: f64) {
        self.air_flow += flow;
        self.refresh_pressure_loss();
    }

    /// Recompute the element's own pressure loss at the current flow.
    pub fn refresh_pressure_loss(&mut self) {
        if self.role == NodeRole::Element {
            self.element_pressure_loss =
                element_pressure_loss(&self.kind, self.duct.as_ref(), self.air_flow);
        }
    }
}

/// Node property shown by [`ConnectivityTree::render`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeProperty {
    AirFlow,
    ElementPressureLoss,
    PathPressureLoss,
}

impl TreeProperty {
    pub fn value(&self, node: &TreeNode) -> Option<f64> {
        match self {
            TreeProperty::AirFlow => Some(node.air_flow),
            TreeProperty::ElementPressureLoss => node.element_pressure_loss,
            TreeProperty::PathPressureLoss => Some(node.path_pressure_loss),
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            TreeProperty::AirFlow => "l/s",
            TreeProperty::ElementPressureLoss | TreeProperty::PathPressureLoss => "Pa",
        }
    }
}

impl FromStr for TreeProperty {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "air_flow" | "flow" => Ok(TreeProperty::AirFlow),
            "element_pressure_loss" | "pressure_loss" => Ok(TreeProperty::ElementPressureLoss),
            "path_pressure_loss" | "path_loss" => Ok(TreeProperty::PathPressureLoss),
            other => Err(format!("unknown tree property: {}", other)),
        }
    }
}

/// Rooted tree of all identified systems
#[derive(Debug, Clone)]
pub struct ConnectivityTree {
    nodes: SlotMap<NodeKey, TreeNode>,
    root: NodeKey,
    identifiers: FxHashMap<String, NodeKey>,
    /// System nodes in insertion order
    systems: Vec<(String, NodeKey)>,
}

impl Default for ConnectivityTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityTree {
    /// Creates a tree holding only the virtual root.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(TreeNode::label(
            ROOT_IDENTIFIER.to_string(),
            NodeRole::Root,
            ElementKind::Other(ROOT_IDENTIFIER.to_string()),
        ));
        let mut identifiers = FxHashMap::default();
        identifiers.insert(ROOT_IDENTIFIER.to_string(), root);
        Self {
            nodes,
            root,
            identifiers,
            systems: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeKey {
        self.root
    }

    pub fn node(&self, key: NodeKey) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    pub(crate) fn node_mut(&mut self, key: NodeKey) -> Option<&mut TreeNode> {
        self.nodes.get_mut(key)
    }

    /// Node by identifier
    pub fn find(&self, identifier: &str) -> Option<NodeKey> {
        self.identifiers.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.identifiers.contains_key(identifier)
    }

    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key)?.parent
    }

    /// System node by system name
    pub fn system_root(&self, system: &str) -> Option<NodeKey> {
        self.systems
            .iter()
            .find(|(name, _)| name == system)
            .map(|(_, key)| *key)
    }

    /// System names with their system nodes, in build order
    pub fn systems(&self) -> impl Iterator<Item = (&str, NodeKey)> + '_ {
        self.systems.iter().map(|(name, key)| (name.as_str(), *key))
    }

    /// Number of nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always holds its root
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Number of edges between the root and `key`
    pub fn depth(&self, key: NodeKey) -> usize {
        let mut depth = 0;
        let mut current = self.parent(key);
        while let Some(parent) = current {
            depth += 1;
            current = self.parent(parent);
        }
        depth
    }

    /// Node identifier that is not yet taken, namespacing with the system
    /// name on collision.
    fn free_identifier(&self, system: &str, id: &GlobalId) -> String {
        if !self.contains(id.as_str()) {
            return id.to_string();
        }
        let namespaced = format!("{}_{}", system, id);
        if !self.contains(&namespaced) {
            return namespaced;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", namespaced, n);
            if !self.contains(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Insert `node` under `parent`.
    pub(crate) fn add_child(&mut self, parent: NodeKey, mut node: TreeNode) -> NodeKey {
        node.parent = Some(parent);
        let identifier = node.identifier.clone();
        let key = self.nodes.insert(node);
        if let Some(parent) = self.nodes.get_mut(parent) {
            parent.children.push(key);
        }
        self.identifiers.insert(identifier, key);
        key
    }

    /// All nodes in pre-order, children in insertion order
    pub fn pre_order(&self) -> Vec<NodeKey> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(key) = stack.pop() {
            order.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        order
    }

    /// Nodes without children, in pre-order
    pub fn leaves(&self) -> Vec<NodeKey> {
        self.pre_order()
            .into_iter()
            .filter(|&key| self.children(key).is_empty())
            .collect()
    }

    /// Every root-to-leaf path, in pre-order of the leaves
    pub fn paths_to_leaves(&self) -> Vec<Vec<NodeKey>> {
        let mut paths = Vec::new();
        let mut stack = vec![vec![self.root]];
        while let Some(path) = stack.pop() {
            let Some(&last) = path.last() else {
                continue;
            };
            let children = self.children(last);
            if children.is_empty() {
                paths.push(path);
                continue;
            }
            for &child in children.iter().rev() {
                let mut next = path.clone();
                next.push(child);
                stack.push(next);
            }
        }
        paths
    }

    /// Nodes of one system below its system node, in pre-order
    pub fn system_nodes(&self, system: &str) -> Vec<NodeKey> {
        let Some(start) = self.system_root(system) else {
            return Vec::new();
        };
        let mut order = Vec::new();
        let mut stack: Vec<NodeKey> = self.children(start).iter().rev().copied().collect();
        while let Some(key) = stack.pop() {
            order.push(key);
            stack.extend(self.children(key).iter().rev().copied());
        }
        order
    }

    /// Draw the tree with one property per node.
    pub fn render(&self, property: TreeProperty) -> String {
        let mut out = String::new();
        // (node, indentation inherited from the parent, own connector)
        let mut stack: Vec<(NodeKey, String, &str)> = vec![(self.root, String::new(), "")];
        while let Some((key, prefix, connector)) = stack.pop() {
            let Some(node) = self.nodes.get(key) else {
                continue;
            };
            let value = match property.value(node) {
                Some(v) => format!("{:.2} {}", v, property.unit()),
                None => "-".to_string(),
            };
            let _ = writeln!(out, "{}{}{} [{}]", prefix, connector, node.identifier, value);

            let child_prefix = match connector {
                "" => String::new(),
                "└── " => format!("{}    ", prefix),
                _ => format!("{}│   ", prefix),
            };
            let count = node.children.len();
            for (i, &child) in node.children.iter().enumerate().rev() {
                let connector = if i + 1 == count { "└── " } else { "├── " };
                stack.push((child, child_prefix.clone(), connector));
            }
        }
        out
    }
}

/// Outcome of building the trees of all identified systems
#[derive(Debug)]
pub struct TreeBuild {
    pub tree: ConnectivityTree,
    /// Systems whose traversal failed, with the reason
    pub failures: Vec<(String, Error)>,
}

struct Frame {
    node: NodeKey,
    neighbours: Vec<GlobalId>,
    next: usize,
}

/// Mutable state of one system traversal
struct TraversalContext<'t> {
    system: String,
    direction: FlowDirection,
    visited: FxHashSet<GlobalId>,
    tree: &'t mut ConnectivityTree,
    stack: Vec<Frame>,
}

impl<'t> TraversalContext<'t> {
    fn new(system: &str, direction: FlowDirection, tree: &'t mut ConnectivityTree) -> Self {
        Self {
            system: system.to_string(),
            direction,
            visited: FxHashSet::default(),
            tree,
            stack: Vec::new(),
        }
    }

    /// Same-system neighbours of `id` in flow direction
    fn neighbours(&self, store: &dyn ModelStore, id: &GlobalId) -> Vec<GlobalId> {
        let candidates = match self.direction {
            FlowDirection::Supply => store.connected_from(id),
            FlowDirection::Return => store.connected_to(id),
        };
        candidates
            .into_iter()
            .filter(|n| store.systems_of(n).iter().any(|s| *s == self.system))
            .collect()
    }

    fn element_node(
        &self,
        geometry: &mut GeometryAdapter<'_>,
        id: &GlobalId,
        identifier: String,
    ) -> TreeNode {
        let store = geometry.store();
        let kind = store.element(id).map(|e| e.kind.clone()).unwrap_or_default();
        let duct = geometry.duct_geometry(id);
        let orientation = port_orientation(store, id);
        let fitting = match kind {
            ElementKind::DuctFitting => orientation.as_ref().map(classify_fitting),
            _ => None,
        };

        let mut node = TreeNode::label(identifier, NodeRole::Element, kind);
        node.element = Some(id.clone());
        node.system = Some(self.system.clone());
        node.direction = Some(self.direction);
        node.duct = duct;
        node.orientation = orientation;
        node.fitting = fitting;
        node.refresh_pressure_loss();
        node
    }

    /// Depth-first walk from the unit node, in recursive pre-order.
    fn walk(&mut self, geometry: &mut GeometryAdapter<'_>, unit: &GlobalId, unit_node: NodeKey) {
        let store = geometry.store();
        self.visited.insert(unit.clone());
        let neighbours = self.neighbours(store, unit);
        self.stack.push(Frame {
            node: unit_node,
            neighbours,
            next: 0,
        });

        loop {
            let Some(frame) = self.stack.last_mut() else {
                break;
            };
            let Some(next) = frame.neighbours.get(frame.next).cloned() else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;
            let parent = frame.node;

            if !self.visited.insert(next.clone()) {
                continue;
            }

            let identifier = self.tree.free_identifier(&self.system, &next);
            let node = self.element_node(geometry, &next, identifier);
            let key = self.tree.add_child(parent, node);
            let neighbours = self.neighbours(store, &next);
            tracing::trace!(
                system = %self.system,
                element = %next,
                neighbours = neighbours.len(),
                "visited"
            );
            self.stack.push(Frame {
                node: key,
                neighbours,
                next: 0,
            });
        }
    }
}

/// Build the subtree of one system under the virtual root.
///
/// Fails without touching the tree when the system's flow direction or its
/// air-handling unit cannot be determined.
pub fn build_system_tree(
    tree: &mut ConnectivityTree,
    geometry: &mut GeometryAdapter<'_>,
    info: &SystemInfo,
    convention: &NamingConvention,
) -> Result<NodeKey> {
    let direction = convention
        .direction_of(&info.name)
        .ok_or_else(|| Error::UndeterminedFlowDirection {
            system: info.name.clone(),
        })?;
    let unit = info
        .primary_unit()
        .ok_or_else(|| Error::MissingAirHandlingUnit {
            system: info.name.clone(),
        })?
        .clone();
    if info.air_handling_units.len() > 1 {
        tracing::debug!(
            system = %info.name,
            unit = %unit,
            "system has several air-handling units, starting at the first"
        );
    }

    let store = geometry.store();
    let unit_kind = store
        .element(&unit)
        .map(|e| e.kind.clone())
        .unwrap_or(ElementKind::AirHandlingUnit);

    let root = tree.root();
    let mut system_node = TreeNode::label(info.name.clone(), NodeRole::System, unit_kind);
    system_node.system = Some(info.name.clone());
    system_node.direction = Some(direction);
    let system_key = tree.add_child(root, system_node);
    tree.systems.push((info.name.clone(), system_key));

    let mut context = TraversalContext::new(&info.name, direction, tree);
    let unit_identifier = format!("{}_{}", info.name, unit);
    let unit_node = context.element_node(geometry, &unit, unit_identifier);
    let unit_key = context.tree.add_child(system_key, unit_node);
    context.walk(geometry, &unit, unit_key);

    tracing::debug!(
        system = %info.name,
        direction = %direction,
        elements = context.visited.len(),
        "built system tree"
    );
    Ok(system_key)
}

/// Build the connectivity tree of every identified system.
///
/// A system that fails is logged and recorded in [`TreeBuild::failures`];
/// the other systems are still built.
pub fn build_trees(
    geometry: &mut GeometryAdapter<'_>,
    classification: &Classification,
    convention: &NamingConvention,
) -> TreeBuild {
    let mut tree = ConnectivityTree::new();
    let mut failures = Vec::new();

    for info in classification.identified.values() {
        if let Err(error) = build_system_tree(&mut tree, geometry, info, convention) {
            tracing::warn!(system = %info.name, %error, "skipping system tree");
            failures.push((info.name.clone(), error));
        }
    }

    tracing::info!(
        systems = tree.systems.len(),
        nodes = tree.len(),
        failures = failures.len(),
        "built connectivity trees"
    );

    TreeBuild { tree, failures }
}
