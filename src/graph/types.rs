//! Node, edge, and property types for the property graph

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Kind of entity a node represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    Object,
    Force,
    Quantity,
    Concept,
    Region,
    Label,
    Custom(String),
}

impl NodeKind {
    /// Label and annotation nodes are placed last and may be the only
    /// free nodes when everything else arrives pre-positioned.
    pub fn is_annotation(&self) -> bool {
        matches!(self, NodeKind::Label)
    }
}

/// Kind of relationship an edge represents
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    RelatedTo,
    ActsOn,
    ConnectedTo,
    Contains,
    LocatedAt,
    AlignedWith,
    SymmetricTo,
    Custom(String),
}

impl EdgeKind {
    /// Stable lowercase name, used in diagnostics
    pub fn name(&self) -> &str {
        match self {
            EdgeKind::RelatedTo => "related-to",
            EdgeKind::ActsOn => "acts-on",
            EdgeKind::ConnectedTo => "connected-to",
            EdgeKind::Contains => "contains",
            EdgeKind::LocatedAt => "located-at",
            EdgeKind::AlignedWith => "aligned-with",
            EdgeKind::SymmetricTo => "symmetric-to",
            EdgeKind::Custom(name) => name,
        }
    }

    /// True for relationship kinds that carry layout meaning. Custom
    /// edges opt in through a `spatial` flag property on the edge.
    pub fn is_spatial(&self) -> bool {
        matches!(
            self,
            EdgeKind::ConnectedTo
                | EdgeKind::Contains
                | EdgeKind::LocatedAt
                | EdgeKind::AlignedWith
                | EdgeKind::SymmetricTo
        )
    }
}

/// An arbitrary property value attached to a node or edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            PropertyValue::Flag(b) => Some(*b),
            _ => None,
        }
    }
}

/// Where a node's position comes from.
///
/// `Locked` positions are set by an upstream interpreter and are never
/// moved by the solver or the refiner; `Free` nodes are positioned here.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Placement {
    Locked(Point),
    #[default]
    Free,
}

impl Placement {
    pub fn is_locked(&self) -> bool {
        matches!(self, Placement::Locked(_))
    }

    pub fn locked_position(&self) -> Option<Point> {
        match self {
            Placement::Locked(p) => Some(*p),
            Placement::Free => None,
        }
    }
}

/// An entity in the property graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    /// Declared (width, height), when the upstream extractor knows it
    #[serde(default)]
    pub size: Option<(f64, f64)>,
    #[serde(default)]
    pub placement: Placement,
}

impl GraphNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        let id = id.into();
        Self {
            label: id.clone(),
            id,
            kind,
            properties: BTreeMap::new(),
            size: None,
            placement: Placement::Free,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_size(mut self, width: f64, height: f64) -> Self {
        self.size = Some((width, height));
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Pin the node at an upstream-chosen position (top-left corner)
    pub fn locked_at(mut self, x: f64, y: f64) -> Self {
        self.placement = Placement::Locked(Point::new(x, y));
        self
    }
}

/// A directed, typed relationship between two nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    pub kind: EdgeKind,
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl GraphEdge {
    pub fn new(kind: EdgeKind, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            target: target.into(),
            properties: BTreeMap::new(),
            weight: None,
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: PropertyValue) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Spatial either by kind or by an explicit `spatial` flag property
    pub fn is_spatial(&self) -> bool {
        self.kind.is_spatial()
            || self
                .properties
                .get("spatial")
                .and_then(PropertyValue::as_flag)
                .unwrap_or(false)
    }

    pub fn number_property(&self, key: &str) -> Option<f64> {
        self.properties.get(key).and_then(PropertyValue::as_number)
    }

    pub fn text_property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(PropertyValue::as_text)
    }
}

/// Flat node/edge-list representation for persistence and handoff
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlatGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_spatial() {
        assert!(EdgeKind::ConnectedTo.is_spatial());
        assert!(EdgeKind::Contains.is_spatial());
        assert!(EdgeKind::LocatedAt.is_spatial());
        assert!(!EdgeKind::RelatedTo.is_spatial());
        assert!(!EdgeKind::ActsOn.is_spatial());
        assert!(!EdgeKind::Custom("depends-on".into()).is_spatial());
    }

    #[test]
    fn test_custom_edge_spatial_flag() {
        let edge = GraphEdge::new(EdgeKind::Custom("orbits".into()), "moon", "planet")
            .with_property("spatial", PropertyValue::Flag(true));
        assert!(edge.is_spatial());
    }

    #[test]
    fn test_placement_default_is_free() {
        let node = GraphNode::new("a", NodeKind::Object);
        assert!(!node.placement.is_locked());
        assert!(node.placement.locked_position().is_none());
    }

    #[test]
    fn test_locked_placement() {
        let node = GraphNode::new("a", NodeKind::Object).locked_at(10.0, 20.0);
        let pos = node.placement.locked_position().unwrap();
        assert_eq!(pos.x, 10.0);
        assert_eq!(pos.y, 20.0);
    }

    #[test]
    fn test_node_label_defaults_to_id() {
        let node = GraphNode::new("spring", NodeKind::Object);
        assert_eq!(node.label, "spring");
        let labeled = GraphNode::new("spring", NodeKind::Object).with_label("Spring k=5");
        assert_eq!(labeled.label, "Spring k=5");
    }

    #[test]
    fn test_property_value_accessors() {
        assert_eq!(PropertyValue::Number(4.0).as_number(), Some(4.0));
        assert_eq!(PropertyValue::Text("x".into()).as_number(), None);
        assert_eq!(PropertyValue::Flag(true).as_flag(), Some(true));
    }
}
