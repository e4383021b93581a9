//! Linearization of the flow graph.

use std::collections::BTreeSet;

use campanile_types::NodeId;

use crate::graph::{QuestionNode, QuestionType, SurveyGraph};

/// The questions of a survey in traversal order: depth-first from the
/// start node, following edges in insertion order. Each branch stops at
/// the end node it reaches; sibling branches are still walked, so every
/// reachable question appears exactly once. The start node itself is
/// excluded; end nodes are included.
///
/// The visited set guards against re-visiting on diamond shapes (and
/// against cycles, which the edit layer already prevents).
pub fn linearize(graph: &SurveyGraph) -> Vec<&QuestionNode> {
    let mut result = Vec::new();
    let mut visited: BTreeSet<NodeId> = BTreeSet::new();
    let mut stack = vec![SurveyGraph::start_id()];

    while let Some(id) = stack.pop() {
        if !visited.insert(id.clone()) {
            continue;
        }
        let Some(node) = graph.node(&id) else {
            continue;
        };
        if node.question_type != QuestionType::Start {
            result.push(node);
        }
        // This branch is done, but siblings on the stack are not.
        if node.question_type == QuestionType::End {
            continue;
        }
        // Reverse so the first edge out is visited first.
        let targets: Vec<NodeId> = graph.outgoing(&id).map(|e| e.target.clone()).collect();
        for target in targets.into_iter().rev() {
            stack.push(target);
        }
    }
    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{HandleId, Position, QuestionType};

    #[test]
    fn test_linearize_excludes_start_and_stops_at_end() {
        let mut g = SurveyGraph::new();
        let a = g.add_node(QuestionType::Text, Position::new(0.0, 100.0)).unwrap();
        let b = g.add_node(QuestionType::Number, Position::new(0.0, 200.0)).unwrap();
        let end = g.end_node().unwrap().id.clone();
        g.connect(&SurveyGraph::start_id(), None, &a, None).unwrap();
        g.connect(&a, None, &b, None).unwrap();
        g.connect(&b, None, &end, None).unwrap();

        let order: Vec<&NodeId> = linearize(&g).iter().map(|n| &n.id).collect();
        assert_eq!(order, vec![&a, &b, &end]);
    }

    #[test]
    fn test_linearize_follows_first_branch_first() {
        let mut g = SurveyGraph::new();
        let radio = g.add_node(QuestionType::Radio, Position::new(0.0, 100.0)).unwrap();
        g.add_option(&radio).unwrap();
        let x = g.add_node(QuestionType::Text, Position::new(-100.0, 200.0)).unwrap();
        let y = g.add_node(QuestionType::Text, Position::new(100.0, 200.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &radio, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 0)), &x, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 1)), &y, None).unwrap();

        let order: Vec<&NodeId> = linearize(&g).iter().map(|n| &n.id).collect();
        assert_eq!(order, vec![&radio, &x, &y]);
    }

    #[test]
    fn test_linearize_keeps_siblings_after_an_end_branch() {
        // Option 0 goes straight to the end node; option 1's branch must
        // still appear in the ordered list.
        let mut g = SurveyGraph::new();
        let radio = g.add_node(QuestionType::Radio, Position::new(0.0, 100.0)).unwrap();
        g.add_option(&radio).unwrap();
        let end = g.end_node().unwrap().id.clone();
        let y = g.add_node(QuestionType::Text, Position::new(100.0, 200.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &radio, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 0)), &end, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 1)), &y, None).unwrap();

        let order: Vec<&NodeId> = linearize(&g).iter().map(|n| &n.id).collect();
        assert_eq!(order, vec![&radio, &end, &y]);
    }

    #[test]
    fn test_linearize_empty_flow() {
        // Nothing is connected to start on a fresh canvas.
        let g = SurveyGraph::new();
        assert!(linearize(&g).is_empty());
    }

    #[test]
    fn test_linearize_is_deterministic() {
        let mut g = SurveyGraph::new();
        let a = g.add_node(QuestionType::Text, Position::new(0.0, 100.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &a, None).unwrap();
        let first: Vec<NodeId> = linearize(&g).iter().map(|n| n.id.clone()).collect();
        let second: Vec<NodeId> = linearize(&g).iter().map(|n| n.id.clone()).collect();
        assert_eq!(first, second);
    }
}
