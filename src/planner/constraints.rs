//! Constraint formulation
//!
//! Walks the graph and emits the constraint set for a plan: canvas bounds
//! and pairwise no-overlap for every node the solver will position, then
//! one constraint per spatial edge. Every constraint carries an explicit
//! priority; edge properties (`min`, `max`, `axis`, `priority`) override
//! the defaults.

use std::collections::HashSet;

use log::debug;

use crate::config::EngineConfig;
use crate::graph::{EdgeKind, GraphEdge, PropertyGraph};

use super::types::{Axis, ConstraintKind, LayoutConstraint, Priority, Strategy};

/// Emit the full constraint set for `graph` under `strategy`.
pub fn formulate_constraints(
    graph: &PropertyGraph,
    strategy: Strategy,
    config: &EngineConfig,
) -> Vec<LayoutConstraint> {
    let mut constraints = Vec::new();
    let spacing = config.planner.node_spacing;

    // Ids the solver will position. Under Symbolic only annotations are
    // free; locked nodes are constants but still participate in
    // no-overlap against free nodes.
    let free: Vec<&str> = graph
        .get_nodes(None)
        .iter()
        .filter(|n| !n.placement.is_locked())
        .filter(|n| strategy != Strategy::Symbolic || n.kind.is_annotation())
        .map(|n| n.id.as_str())
        .collect();
    let free_set: HashSet<&str> = free.iter().copied().collect();

    // 1. Canvas bounds for every positioned node
    for id in &free {
        constraints.push(LayoutConstraint::bounds(*id));
    }

    // 2. Pairwise no-overlap. Pairs related by containment overlap by
    //    design and are skipped, matching the containment constraint
    //    emitted below.
    let contained_pairs = containment_pairs(graph);
    let all_ids = graph.node_ids();
    for (i, a) in all_ids.iter().enumerate() {
        for b in &all_ids[i + 1..] {
            // At least one side must be solver-positioned
            if !free_set.contains(a) && !free_set.contains(b) {
                continue;
            }
            if contained_pairs.contains(&(a.to_string(), b.to_string()))
                || contained_pairs.contains(&(b.to_string(), a.to_string()))
            {
                continue;
            }
            constraints.push(LayoutConstraint::no_overlap(*a, *b, spacing));
        }
    }

    // 3. One constraint per spatial edge
    for edge in graph.spatial_edges() {
        let both_locked = !free_set.contains(edge.source.as_str())
            && !free_set.contains(edge.target.as_str());
        if both_locked {
            continue;
        }
        if let Some(constraint) = constraint_for_edge(edge, config) {
            constraints.push(constraint);
        }
    }

    debug!(
        "formulated {} constraints for {} free node(s)",
        constraints.len(),
        free.len()
    );
    constraints
}

/// Direct (container, contained) id pairs from Contains edges
fn containment_pairs(graph: &PropertyGraph) -> HashSet<(String, String)> {
    graph
        .get_edges(None, None, Some(&EdgeKind::Contains))
        .iter()
        .map(|e| (e.source.clone(), e.target.clone()))
        .collect()
}

fn parse_priority(edge: &GraphEdge) -> Option<Priority> {
    match edge.text_property("priority") {
        Some("required") => Some(Priority::Required),
        Some("high") => Some(Priority::High),
        Some("medium") => Some(Priority::Medium),
        Some("low") => Some(Priority::Low),
        _ => None,
    }
}

fn parse_axis(edge: &GraphEdge) -> Option<Axis> {
    match edge.text_property("axis") {
        Some("x") => Some(Axis::X),
        Some("y") => Some(Axis::Y),
        _ => None,
    }
}

fn constraint_for_edge(edge: &GraphEdge, config: &EngineConfig) -> Option<LayoutConstraint> {
    let spacing = config.planner.node_spacing;
    let canvas = &config.canvas;

    match edge.kind {
        EdgeKind::Contains => {
            let padding = edge.number_property("padding").unwrap_or(spacing / 2.0);
            Some(LayoutConstraint::new(
                ConstraintKind::Containment { padding },
                vec![edge.source.clone(), edge.target.clone()],
                parse_priority(edge).unwrap_or(Priority::Required),
            ))
        }
        EdgeKind::AlignedWith => {
            let axis = parse_axis(edge).unwrap_or(Axis::Y);
            Some(LayoutConstraint::new(
                ConstraintKind::Alignment {
                    axis,
                    tolerance: edge.number_property("tolerance").unwrap_or(1.0),
                },
                vec![edge.source.clone(), edge.target.clone()],
                parse_priority(edge).unwrap_or(Priority::High),
            ))
        }
        EdgeKind::SymmetricTo => {
            // Default mirror line: the vertical center of the canvas
            let axis = parse_axis(edge).unwrap_or(Axis::X);
            let position = edge.number_property("position").unwrap_or(match axis {
                Axis::X => canvas.width / 2.0,
                Axis::Y => canvas.height / 2.0,
            });
            Some(LayoutConstraint::new(
                ConstraintKind::Symmetry { axis, position },
                vec![edge.source.clone(), edge.target.clone()],
                parse_priority(edge).unwrap_or(Priority::Medium),
            ))
        }
        EdgeKind::LocatedAt | EdgeKind::ConnectedTo | EdgeKind::Custom(_) => {
            // Proximity: keep related nodes near each other. Explicit
            // min/max bounds make the requirement hard.
            let explicit = edge.number_property("min").is_some()
                || edge.number_property("max").is_some();
            let min = edge.number_property("min").unwrap_or(spacing);
            let max = edge
                .number_property("max")
                .unwrap_or(canvas.width.max(canvas.height) / 2.0);
            let default_priority = if explicit {
                Priority::Required
            } else {
                Priority::High
            };
            Some(LayoutConstraint::new(
                ConstraintKind::Distance {
                    min,
                    max,
                    axis: parse_axis(edge),
                },
                vec![edge.source.clone(), edge.target.clone()],
                parse_priority(edge).unwrap_or(default_priority),
            ))
        }
        // Non-spatial kinds reach here only via an explicit `spatial`
        // flag; treat them as proximity too.
        EdgeKind::RelatedTo | EdgeKind::ActsOn => {
            let min = edge.number_property("min").unwrap_or(spacing);
            let max = edge
                .number_property("max")
                .unwrap_or(canvas.width.max(canvas.height) / 2.0);
            Some(LayoutConstraint::new(
                ConstraintKind::Distance {
                    min,
                    max,
                    axis: parse_axis(edge),
                },
                vec![edge.source.clone(), edge.target.clone()],
                parse_priority(edge).unwrap_or(Priority::Low),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphNode, NodeKind, PropertyValue};

    fn config() -> EngineConfig {
        EngineConfig::default()
    }

    fn three_objects() -> PropertyGraph {
        let mut g = PropertyGraph::new();
        for id in ["a", "b", "c"] {
            g.add_node(GraphNode::new(id, NodeKind::Object)).unwrap();
        }
        g
    }

    #[test]
    fn test_bounds_and_no_overlap_always_present() {
        let g = three_objects();
        let constraints = formulate_constraints(&g, Strategy::Heuristic, &config());

        let bounds = constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Bounds))
            .count();
        let overlaps = constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::NoOverlap { .. }))
            .count();
        assert_eq!(bounds, 3);
        assert_eq!(overlaps, 3); // 3 choose 2
    }

    #[test]
    fn test_connected_edge_yields_distance() {
        let mut g = three_objects();
        g.add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "a", "b"))
            .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());
        let distance = constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::Distance { .. }))
            .expect("distance constraint");
        assert_eq!(distance.nodes, vec!["a", "b"]);
        assert_eq!(distance.priority, Priority::High);
    }

    #[test]
    fn test_explicit_range_makes_distance_required() {
        let mut g = three_objects();
        g.add_edge(
            GraphEdge::new(EdgeKind::LocatedAt, "a", "b")
                .with_property("min", PropertyValue::Number(150.0))
                .with_property("max", PropertyValue::Number(200.0)),
        )
        .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());
        let distance = constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::Distance { .. }))
            .unwrap();
        assert_eq!(distance.priority, Priority::Required);
        match distance.kind {
            ConstraintKind::Distance { min, max, .. } => {
                assert_eq!(min, 150.0);
                assert_eq!(max, 200.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_contains_edge_suppresses_pair_overlap() {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("box", NodeKind::Region)).unwrap();
        g.add_node(GraphNode::new("item", NodeKind::Object)).unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::Contains, "box", "item"))
            .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());

        assert!(constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::Containment { .. })));
        assert!(!constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::NoOverlap { .. })
                && c.nodes.contains(&"box".to_string())
                && c.nodes.contains(&"item".to_string())));
    }

    #[test]
    fn test_aligned_edge_priority_and_axis() {
        let mut g = three_objects();
        g.add_edge(
            GraphEdge::new(EdgeKind::AlignedWith, "a", "c")
                .with_property("axis", PropertyValue::Text("x".into())),
        )
        .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());
        let alignment = constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::Alignment { .. }))
            .unwrap();
        assert_eq!(alignment.priority, Priority::High);
        assert!(matches!(
            alignment.kind,
            ConstraintKind::Alignment { axis: Axis::X, .. }
        ));
    }

    #[test]
    fn test_priority_property_override() {
        let mut g = three_objects();
        g.add_edge(
            GraphEdge::new(EdgeKind::ConnectedTo, "a", "b")
                .with_property("priority", PropertyValue::Text("low".into())),
        )
        .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());
        let distance = constraints
            .iter()
            .find(|c| matches!(c.kind, ConstraintKind::Distance { .. }))
            .unwrap();
        assert_eq!(distance.priority, Priority::Low);
    }

    #[test]
    fn test_locked_nodes_get_no_bounds_but_keep_overlap() {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("pinned", NodeKind::Object).locked_at(100.0, 100.0))
            .unwrap();
        g.add_node(GraphNode::new("free", NodeKind::Object)).unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());

        let bounds: Vec<_> = constraints
            .iter()
            .filter(|c| matches!(c.kind, ConstraintKind::Bounds))
            .collect();
        assert_eq!(bounds.len(), 1);
        assert_eq!(bounds[0].nodes, vec!["free"]);

        // The free node must still avoid the pinned one
        assert!(constraints
            .iter()
            .any(|c| matches!(c.kind, ConstraintKind::NoOverlap { .. })));
    }

    #[test]
    fn test_fully_locked_pair_emits_nothing_between_them() {
        let mut g = PropertyGraph::new();
        g.add_node(GraphNode::new("a", NodeKind::Object).locked_at(0.0, 0.0))
            .unwrap();
        g.add_node(GraphNode::new("b", NodeKind::Object).locked_at(200.0, 0.0))
            .unwrap();
        g.add_edge(GraphEdge::new(EdgeKind::ConnectedTo, "a", "b"))
            .unwrap();
        let constraints = formulate_constraints(&g, Strategy::ConstraintBased, &config());
        assert!(constraints.is_empty());
    }

    #[test]
    fn test_empty_graph_yields_no_constraints() {
        let g = PropertyGraph::new();
        assert!(formulate_constraints(&g, Strategy::Heuristic, &config()).is_empty());
    }
}
