//! # campanile-survey: Survey flow graphs
//!
//! A survey is a directed acyclic graph of question nodes edited on a
//! canvas. This crate holds the whole engine behind that editor:
//!
//! - **Model** ([`graph`]) - nodes, edges, handles, positions
//! - **Edits** ([`edit`]) - invariant-preserving mutations: connect with
//!   cycle rejection and replacement, delete with reconnection, insert on
//!   an edge or next to a node, option edits with minimum counts
//! - **Traversal** ([`traverse`]) - deterministic linearization
//! - **Preview** ([`preview`]) - a respondent walk with answer validation
//!   and radio branching
//! - **Document** ([`document`]) - the persisted survey shape
//!
//! ## Example
//!
//! ```
//! use campanile_survey::{Position, PreviewSession, QuestionType, SurveyGraph};
//!
//! let mut graph = SurveyGraph::new();
//! let q = graph
//!     .add_node(QuestionType::Text, Position::new(250.0, 200.0))
//!     .unwrap();
//! let end = graph.end_node().unwrap().id.clone();
//! graph.connect(&SurveyGraph::start_id(), None, &q, None).unwrap();
//! graph.connect(&q, None, &end, None).unwrap();
//!
//! let session = PreviewSession::start(&graph).unwrap();
//! assert_eq!(session.current().id, q);
//! ```

pub mod document;
pub mod edit;
pub mod graph;
pub mod preview;
pub mod traverse;


pub use document::{SurveyDocument, SurveySettings};
pub use edit::{GraphError, InsertedAtDirection, InsertedOnEdge, NodePatch};
pub use graph::{
    Direction, FlowEdge, HandleId, Position, QuestionNode, QuestionType, SurveyGraph,
};
pub use preview::{Advance, Answer, PreviewError, PreviewSession};
pub use traverse::linearize;
