//! Survey flow graph data model.
//!
//! A survey is a directed acyclic graph of question nodes. Edges leave a
//! node through a *handle*: radio questions have one source handle per
//! option (branching), every node has directional handles for canvas
//! placement, and plain edges carry no handle at all.

use std::fmt::{self, Display};

use campanile_types::{EdgeId, NodeId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Question Type
// ============================================================================

/// The type of a survey node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// The single entry point. Not a question; exactly one per graph.
    Start,
    /// A terminal node. A survey may have several.
    End,
    Text,
    Textarea,
    Radio,
    Checkbox,
    Email,
    Number,
    Date,
    Scale,
    Rating,
}

impl QuestionType {
    /// Whether nodes of this type carry an option list.
    pub fn has_options(self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Checkbox)
    }

    /// Minimum number of options: radios branch so one suffices, a
    /// checkbox with fewer than two choices is meaningless.
    pub fn min_options(self) -> Option<usize> {
        match self {
            QuestionType::Radio => Some(1),
            QuestionType::Checkbox => Some(2),
            _ => None,
        }
    }

    /// The options seeded when a node of this type is created.
    pub fn default_options(self) -> Option<Vec<String>> {
        match self {
            QuestionType::Radio => Some(vec!["Option 1".to_string()]),
            QuestionType::Checkbox => {
                Some(vec!["Option 1".to_string(), "Option 2".to_string()])
            }
            _ => None,
        }
    }

    /// The label a freshly created node gets.
    pub fn default_label(self) -> &'static str {
        match self {
            QuestionType::Start => "Start",
            QuestionType::End => "End",
            QuestionType::Text => "Text question",
            QuestionType::Textarea => "Long text question",
            QuestionType::Radio => "Single choice question",
            QuestionType::Checkbox => "Multiple choice question",
            QuestionType::Email => "Email question",
            QuestionType::Number => "Number question",
            QuestionType::Date => "Date question",
            QuestionType::Scale => "Scale question",
            QuestionType::Rating => "Rating question",
        }
    }
}

impl Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            QuestionType::Start => "start",
            QuestionType::End => "end",
            QuestionType::Text => "text",
            QuestionType::Textarea => "textarea",
            QuestionType::Radio => "radio",
            QuestionType::Checkbox => "checkbox",
            QuestionType::Email => "email",
            QuestionType::Number => "number",
            QuestionType::Date => "date",
            QuestionType::Scale => "scale",
            QuestionType::Rating => "rating",
        };
        write!(f, "{s}")
    }
}

// ============================================================================
// Handles & Directions
// ============================================================================

/// A canvas direction, used for directional handles and for placing nodes
/// inserted next to an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Top,
    Bottom,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Top => "top",
            Direction::Bottom => "bottom",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// The direction an inserted node is entered from.
    pub fn opposite(self) -> Direction {
        match self {
            Direction::Top => Direction::Bottom,
            Direction::Bottom => Direction::Top,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An edge attachment point on a node.
///
/// Three wire formats exist: `"{node}-option-{index}"` for radio options,
/// `"{node}-source-{direction}"` and `"{node}-target-{direction}"` for
/// canvas placement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleId(String);

impl HandleId {
    /// The source handle of a radio option.
    pub fn option(node: &NodeId, index: usize) -> Self {
        Self(format!("{node}-option-{index}"))
    }

    /// A directional source handle.
    pub fn source(node: &NodeId, direction: Direction) -> Self {
        Self(format!("{node}-source-{direction}"))
    }

    /// A directional target handle.
    pub fn target(node: &NodeId, direction: Direction) -> Self {
        Self(format!("{node}-target-{direction}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// If this is an option handle of `node`, the option index.
    pub fn option_index(&self, node: &NodeId) -> Option<usize> {
        let rest = self.0.strip_prefix(node.as_str())?;
        let index = rest.strip_prefix("-option-")?;
        index.parse().ok()
    }

    /// Whether this is an option handle of `node`.
    pub fn is_option_of(&self, node: &NodeId) -> bool {
        self.option_index(node).is_some()
    }
}

impl Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for HandleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Nodes & Edges
// ============================================================================

/// A canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Midpoint between two positions, where a node inserted on an edge
    /// lands.
    pub fn midpoint(self, other: Position) -> Position {
        Position {
            x: (self.x + other.x) / 2.0,
            y: (self.y + other.y) / 2.0,
        }
    }

    /// This position shifted by `offset` units in a direction.
    pub fn shifted(self, direction: Direction, offset: f64) -> Position {
        match direction {
            Direction::Top => Position { x: self.x, y: self.y - offset },
            Direction::Bottom => Position { x: self.x, y: self.y + offset },
            Direction::Left => Position { x: self.x - offset, y: self.y },
            Direction::Right => Position { x: self.x + offset, y: self.y },
        }
    }
}

/// One node of the survey graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionNode {
    pub id: NodeId,
    pub position: Position,
    pub label: String,
    pub question_type: QuestionType,
    pub required: bool,
    pub description: String,
    /// `Some` only for option-bearing types (radio, checkbox).
    pub options: Option<Vec<String>>,
}

/// One edge of the survey graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    pub id: EdgeId,
    pub source: NodeId,
    pub source_handle: Option<HandleId>,
    pub target: NodeId,
    pub target_handle: Option<HandleId>,
}

// ============================================================================
// Survey Graph
// ============================================================================

/// The survey flow graph. Mutations live in the `edit` module; every one
/// validates before touching state, so the acyclicity and start-node
/// invariants hold between any two calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyGraph {
    pub(crate) nodes: Vec<QuestionNode>,
    pub(crate) edges: Vec<FlowEdge>,
}

impl SurveyGraph {
    /// The reserved id of the start node.
    pub const START_ID: &'static str = "start";

    /// Creates the initial canvas: a start node and one unconnected end
    /// node below it.
    pub fn new() -> Self {
        let start = QuestionNode {
            id: NodeId::new(Self::START_ID),
            position: Position::new(250.0, 50.0),
            label: "Start".to_string(),
            question_type: QuestionType::Start,
            required: false,
            description: String::new(),
            options: None,
        };
        let end = QuestionNode {
            id: NodeId::generate(),
            position: Position::new(250.0, 350.0),
            label: "End".to_string(),
            question_type: QuestionType::End,
            required: false,
            description: "Thank you for completing the survey!".to_string(),
            options: None,
        };
        Self {
            nodes: vec![start, end],
            edges: Vec::new(),
        }
    }

    /// The start node's id.
    pub fn start_id() -> NodeId {
        NodeId::new(Self::START_ID)
    }

    /// All nodes, in insertion order.
    pub fn nodes(&self) -> &[QuestionNode] {
        &self.nodes
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> &[FlowEdge] {
        &self.edges
    }

    /// Looks up a node by id.
    pub fn node(&self, id: &NodeId) -> Option<&QuestionNode> {
        self.nodes.iter().find(|n| n.id == *id)
    }

    /// Looks up an edge by id.
    pub fn edge(&self, id: &EdgeId) -> Option<&FlowEdge> {
        self.edges.iter().find(|e| e.id == *id)
    }

    /// Whether a node with this id exists.
    pub fn contains_node(&self, id: &NodeId) -> bool {
        self.node(id).is_some()
    }

    /// Edges leaving a node, in insertion order.
    pub fn outgoing<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a FlowEdge> {
        self.edges.iter().filter(move |e| e.source == *id)
    }

    /// Edges entering a node, in insertion order.
    pub fn incoming<'a>(&'a self, id: &'a NodeId) -> impl Iterator<Item = &'a FlowEdge> {
        self.edges.iter().filter(move |e| e.target == *id)
    }

    /// The first end node, if any.
    pub fn end_node(&self) -> Option<&QuestionNode> {
        self.nodes
            .iter()
            .find(|n| n.question_type == QuestionType::End)
    }

    pub(crate) fn node_mut(&mut self, id: &NodeId) -> Option<&mut QuestionNode> {
        self.nodes.iter_mut().find(|n| n.id == *id)
    }
}

impl Default for SurveyGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
