//! Structural edits on the survey graph.
//!
//! Every operation validates before touching state: a failed edit leaves
//! the graph exactly as it was, and no intermediate state with a cycle,
//! a second start node, or an under-optioned choice question is ever
//! observable.

use campanile_types::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{
    Direction, FlowEdge, HandleId, Position, QuestionNode, QuestionType, SurveyGraph,
};

/// How far an inserted neighbor is placed from its anchor node.
const DIRECTION_OFFSET: f64 = 250.0;

/// Errors produced by graph edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The connection would close a cycle. (`from`/`to` rather than
    /// source/target: thiserror reserves a `source` field for error
    /// chaining.)
    #[error("connecting '{from}' to '{to}' would create a cycle")]
    WouldCycle { from: NodeId, to: NodeId },

    /// A node cannot connect to itself.
    #[error("node '{node}' cannot connect to itself")]
    SelfLoop { node: NodeId },

    /// A graph holds exactly one start node.
    #[error("the graph already has a start node")]
    StartExists,

    /// The start node cannot be edited, deleted, or targeted by an edge.
    #[error("the start node cannot be modified")]
    StartImmutable,

    /// The referenced node does not exist.
    #[error("node '{node}' not found")]
    NodeNotFound { node: NodeId },

    /// The referenced edge does not exist.
    #[error("edge '{edge}' not found")]
    EdgeNotFound { edge: EdgeId },

    /// Option-bearing types have a minimum option count.
    #[error("{question_type} questions need at least {minimum} option(s)")]
    MinimumOptions {
        question_type: QuestionType,
        minimum: usize,
    },

    /// Option edits only apply to radio and checkbox nodes.
    #[error("node '{node}' does not carry options")]
    NotAnOptionNode { node: NodeId },

    /// The referenced option index is out of range.
    #[error("option index {index} out of range (node has {len})")]
    OptionOutOfRange { index: usize, len: usize },
}

type Result<T> = std::result::Result<T, GraphError>;

/// Partial update applied to a node by [`SurveyGraph::update_node`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodePatch {
    pub label: Option<String>,
    pub description: Option<String>,
    pub required: Option<bool>,
    pub question_type: Option<QuestionType>,
}

impl NodePatch {
    pub fn label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = Some(required);
        self
    }

    pub fn question_type(mut self, question_type: QuestionType) -> Self {
        self.question_type = Some(question_type);
        self
    }
}

/// What [`SurveyGraph::insert_on_edge`] created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedOnEdge {
    pub node: NodeId,
    pub edge_in: EdgeId,
    pub edge_out: EdgeId,
}

/// What [`SurveyGraph::insert_at_direction`] created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertedAtDirection {
    pub node: NodeId,
    pub edge: EdgeId,
}

impl SurveyGraph {
    // ------------------------------------------------------------------
    // Nodes
    // ------------------------------------------------------------------

    /// Adds an unconnected node at a position. Rejects a second start
    /// node; option-bearing types are seeded with their default options.
    pub fn add_node(
        &mut self,
        question_type: QuestionType,
        position: Position,
    ) -> Result<NodeId> {
        let id = self.create_node(question_type, position)?;
        debug!(node = %id, kind = %question_type, "added node");
        Ok(id)
    }

    fn create_node(
        &mut self,
        question_type: QuestionType,
        position: Position,
    ) -> Result<NodeId> {
        if question_type == QuestionType::Start {
            return Err(GraphError::StartExists);
        }
        let id = NodeId::generate();
        let description = if question_type == QuestionType::End {
            "Thank you for completing the survey!".to_string()
        } else {
            String::new()
        };
        self.nodes.push(QuestionNode {
            id: id.clone(),
            position,
            label: question_type.default_label().to_string(),
            question_type,
            required: false,
            description,
            options: question_type.default_options(),
        });
        Ok(id)
    }

    /// Applies a partial update to a node. The start node is immutable.
    ///
    /// Type changes keep the graph consistent: leaving radio prunes that
    /// node's option-handle edges, leaving an option-bearing type clears
    /// the options, entering one seeds (or tops up to) the minimum.
    pub fn update_node(&mut self, id: &NodeId, patch: NodePatch) -> Result<()> {
        if id.as_str() == Self::START_ID {
            return Err(GraphError::StartImmutable);
        }
        let old_type = self
            .node(id)
            .ok_or_else(|| GraphError::NodeNotFound { node: id.clone() })?
            .question_type;

        if let Some(new_type) = patch.question_type {
            if new_type == QuestionType::Start {
                return Err(GraphError::StartExists);
            }
            if new_type != old_type {
                if old_type == QuestionType::Radio {
                    // Option edges only mean something on a radio node.
                    self.edges
                        .retain(|e| !(e.source == *id && edge_uses_option_handle(e, id)));
                }
                let node = self.node_mut(id).ok_or_else(|| GraphError::NodeNotFound {
                    node: id.clone(),
                })?;
                node.question_type = new_type;
                match (old_type.has_options(), new_type.has_options()) {
                    (_, false) => node.options = None,
                    (false, true) => node.options = new_type.default_options(),
                    (true, true) => {
                        // Radio -> checkbox may be under the new minimum.
                        let minimum = new_type.min_options().unwrap_or(0);
                        let options = node.options.get_or_insert_with(Vec::new);
                        while options.len() < minimum {
                            options.push(format!("Option {}", options.len() + 1));
                        }
                    }
                }
            }
        }

        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound { node: id.clone() })?;
        if let Some(label) = patch.label {
            node.label = label;
        }
        if let Some(description) = patch.description {
            node.description = description;
        }
        if let Some(required) = patch.required {
            node.required = required;
        }
        Ok(())
    }

    /// Deletes nodes, reconnecting each deleted node's predecessors to its
    /// successors (cartesian product, handles carried over from the
    /// original edges). The start node is silently skipped. Returns the
    /// ids of the reconnection edges.
    pub fn delete_nodes(&mut self, ids: &[NodeId]) -> Vec<EdgeId> {
        let doomed: Vec<NodeId> = ids
            .iter()
            .filter(|id| id.as_str() != Self::START_ID && self.contains_node(id))
            .cloned()
            .collect();
        if doomed.is_empty() {
            return Vec::new();
        }

        // Reconnections pair each deleted node's surviving predecessors
        // with its surviving successors, all computed on the pre-deletion
        // snapshot. Deleting a whole sub-path in one batch severs it.
        let mut reconnections = Vec::new();
        for id in &doomed {
            let incomers: Vec<FlowEdge> = self
                .incoming(id)
                .filter(|e| !doomed.contains(&e.source))
                .cloned()
                .collect();
            let outgoers: Vec<FlowEdge> = self
                .outgoing(id)
                .filter(|e| !doomed.contains(&e.target))
                .cloned()
                .collect();
            for edge_in in &incomers {
                for edge_out in &outgoers {
                    reconnections.push(FlowEdge {
                        id: EdgeId::generate(),
                        source: edge_in.source.clone(),
                        source_handle: edge_in.source_handle.clone(),
                        target: edge_out.target.clone(),
                        target_handle: edge_out.target_handle.clone(),
                    });
                }
            }
        }

        self.nodes.retain(|n| !doomed.contains(&n.id));
        self.edges
            .retain(|e| !doomed.contains(&e.source) && !doomed.contains(&e.target));

        let created: Vec<EdgeId> = reconnections.iter().map(|e| e.id.clone()).collect();
        debug!(
            deleted = doomed.len(),
            reconnected = created.len(),
            "deleted nodes"
        );
        self.edges.extend(reconnections);
        created
    }

    // ------------------------------------------------------------------
    // Edges
    // ------------------------------------------------------------------

    /// Whether connecting `source` to `target` is allowed: both exist,
    /// no self-loop, the target is not the start node, and the edge would
    /// not close a cycle. Editors call this during the drag gesture.
    pub fn is_valid_connection(&self, source: &NodeId, target: &NodeId) -> bool {
        self.contains_node(source)
            && self.contains_node(target)
            && source != target
            && target.as_str() != Self::START_ID
            && !self.is_reachable(target, source)
    }

    /// Connects two nodes, replacing whatever previously left the same
    /// handle:
    /// - from a radio option handle, only that option's edge is replaced;
    /// - from anything else (the start node included), all of the source's
    ///   outgoing edges are replaced, keeping a single path.
    pub fn connect(
        &mut self,
        source: &NodeId,
        source_handle: Option<HandleId>,
        target: &NodeId,
        target_handle: Option<HandleId>,
    ) -> Result<EdgeId> {
        if !self.contains_node(source) {
            return Err(GraphError::NodeNotFound { node: source.clone() });
        }
        if !self.contains_node(target) {
            return Err(GraphError::NodeNotFound { node: target.clone() });
        }
        if source == target {
            return Err(GraphError::SelfLoop { node: source.clone() });
        }
        if target.as_str() == Self::START_ID {
            return Err(GraphError::StartImmutable);
        }
        if self.is_reachable(target, source) {
            return Err(GraphError::WouldCycle {
                from: source.clone(),
                to: target.clone(),
            });
        }

        let is_option = source_handle
            .as_ref()
            .is_some_and(|h| h.is_option_of(source));
        if is_option {
            self.edges
                .retain(|e| !(e.source == *source && e.source_handle == source_handle));
        } else {
            self.edges.retain(|e| e.source != *source);
        }

        let id = EdgeId::generate();
        debug!(edge = %id, source = %source, target = %target, "connected nodes");
        self.edges.push(FlowEdge {
            id: id.clone(),
            source: source.clone(),
            source_handle,
            target: target.clone(),
            target_handle,
        });
        Ok(id)
    }

    /// Splits the edge A→B into A→C→B, placing the new node C at the
    /// midpoint. The inbound edge reuses A's original source handle; the
    /// outbound edge leaves C through its default handle (option 0 for a
    /// radio) into B's original target handle.
    pub fn insert_on_edge(
        &mut self,
        edge_id: &EdgeId,
        question_type: QuestionType,
    ) -> Result<InsertedOnEdge> {
        let edge = self
            .edge(edge_id)
            .ok_or_else(|| GraphError::EdgeNotFound { edge: edge_id.clone() })?
            .clone();
        let source_pos = self
            .node(&edge.source)
            .ok_or_else(|| GraphError::NodeNotFound { node: edge.source.clone() })?
            .position;
        let target_pos = self
            .node(&edge.target)
            .ok_or_else(|| GraphError::NodeNotFound { node: edge.target.clone() })?
            .position;

        let node = self.create_node(question_type, source_pos.midpoint(target_pos))?;
        self.edges.retain(|e| e.id != *edge_id);

        let edge_in = EdgeId::generate();
        self.edges.push(FlowEdge {
            id: edge_in.clone(),
            source: edge.source,
            source_handle: edge.source_handle,
            target: node.clone(),
            target_handle: None,
        });

        let out_handle = (question_type == QuestionType::Radio)
            .then(|| HandleId::option(&node, 0));
        let edge_out = EdgeId::generate();
        self.edges.push(FlowEdge {
            id: edge_out.clone(),
            source: node.clone(),
            source_handle: out_handle,
            target: edge.target,
            target_handle: edge.target_handle,
        });

        debug!(node = %node, "inserted node on edge");
        Ok(InsertedOnEdge {
            node,
            edge_in,
            edge_out,
        })
    }

    /// Creates a node next to `anchor` (a fixed offset in the given
    /// direction) and connects anchor → new node.
    ///
    /// With `option_index`, the edge leaves the anchor's option handle
    /// (radio branching); otherwise it leaves the directional handle. The
    /// edge enters the new node from the opposite direction. Replacement
    /// semantics are those of [`SurveyGraph::connect`].
    pub fn insert_at_direction(
        &mut self,
        anchor: &NodeId,
        direction: Direction,
        question_type: QuestionType,
        option_index: Option<usize>,
    ) -> Result<InsertedAtDirection> {
        let anchor_node = self
            .node(anchor)
            .ok_or_else(|| GraphError::NodeNotFound { node: anchor.clone() })?;
        let anchor_pos = anchor_node.position;

        let source_handle = match option_index {
            Some(index) => {
                let options = anchor_node
                    .options
                    .as_ref()
                    .filter(|_| anchor_node.question_type == QuestionType::Radio)
                    .ok_or_else(|| GraphError::NotAnOptionNode { node: anchor.clone() })?;
                if index >= options.len() {
                    return Err(GraphError::OptionOutOfRange {
                        index,
                        len: options.len(),
                    });
                }
                Some(HandleId::option(anchor, index))
            }
            None => Some(HandleId::source(anchor, direction)),
        };

        let node = self.create_node(
            question_type,
            anchor_pos.shifted(direction, DIRECTION_OFFSET),
        )?;
        let target_handle = Some(HandleId::target(&node, direction.opposite()));

        let edge = match self.connect(anchor, source_handle, &node, target_handle) {
            Ok(edge) => edge,
            Err(err) => {
                // Connect cannot fail here (fresh node, no cycle), but do
                // not leave an orphan behind if it ever does.
                self.nodes.retain(|n| n.id != node);
                return Err(err);
            }
        };

        Ok(InsertedAtDirection { node, edge })
    }

    // ------------------------------------------------------------------
    // Options
    // ------------------------------------------------------------------

    /// Appends an option to a radio/checkbox node. Returns its index.
    pub fn add_option(&mut self, id: &NodeId) -> Result<usize> {
        let node = self.option_node_mut(id)?;
        let options = node
            .options
            .get_or_insert_with(Vec::new);
        options.push(format!("Option {}", options.len() + 1));
        Ok(options.len() - 1)
    }

    /// Rewrites the option text at `index`.
    pub fn update_option(&mut self, id: &NodeId, index: usize, text: &str) -> Result<()> {
        let node = self.option_node_mut(id)?;
        let options = node.options.get_or_insert_with(Vec::new);
        let len = options.len();
        let slot = options
            .get_mut(index)
            .ok_or(GraphError::OptionOutOfRange { index, len })?;
        *slot = text.to_string();
        Ok(())
    }

    /// Removes the option at `index`, enforcing the type's minimum (radio
    /// 1, checkbox 2). The removed option's edge is pruned and higher
    /// option handles are renumbered so edges keep pointing at the same
    /// choices.
    pub fn remove_option(&mut self, id: &NodeId, index: usize) -> Result<()> {
        let node = self.option_node_mut(id)?;
        let question_type = node.question_type;
        let minimum = question_type.min_options().unwrap_or(0);
        let options = node.options.get_or_insert_with(Vec::new);
        let len = options.len();
        if index >= len {
            return Err(GraphError::OptionOutOfRange { index, len });
        }
        if len <= minimum {
            return Err(GraphError::MinimumOptions {
                question_type,
                minimum,
            });
        }
        options.remove(index);

        self.edges.retain(|e| {
            !(e.source == *id
                && e.source_handle
                    .as_ref()
                    .and_then(|h| h.option_index(id))
                    == Some(index))
        });
        for edge in &mut self.edges {
            if edge.source != *id {
                continue;
            }
            let shifted = edge
                .source_handle
                .as_ref()
                .and_then(|h| h.option_index(id))
                .filter(|i| *i > index);
            if let Some(i) = shifted {
                edge.source_handle = Some(HandleId::option(id, i - 1));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Whether `to` is reachable from `from` following edge direction.
    /// Iterative DFS; the visited set guards against malformed input.
    pub(crate) fn is_reachable(&self, from: &NodeId, to: &NodeId) -> bool {
        let mut stack = vec![from.clone()];
        let mut visited = std::collections::BTreeSet::new();
        while let Some(current) = stack.pop() {
            if current == *to {
                return true;
            }
            if !visited.insert(current.clone()) {
                continue;
            }
            for edge in self.outgoing(&current) {
                stack.push(edge.target.clone());
            }
        }
        false
    }

    fn option_node_mut(&mut self, id: &NodeId) -> Result<&mut QuestionNode> {
        let node = self
            .node_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound { node: id.clone() })?;
        if !node.question_type.has_options() {
            return Err(GraphError::NotAnOptionNode { node: id.clone() });
        }
        Ok(node)
    }
}

fn edge_uses_option_handle(edge: &FlowEdge, node: &NodeId) -> bool {
    edge.source_handle
        .as_ref()
        .is_some_and(|h| h.is_option_of(node))
}

// ============================================================================
// Tests
// ============================================================================
