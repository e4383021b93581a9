//! Preview runtime.
//!
//! Walks a respondent through the flow graph the way the published survey
//! would: answers are validated per question type, radio answers pick the
//! branch, and navigation history is append-only so "previous" never
//! loses answers.

use std::collections::BTreeMap;

use campanile_types::NodeId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::graph::{HandleId, QuestionNode, QuestionType, SurveyGraph};
use crate::traverse::linearize;

/// Errors produced by the preview runtime.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PreviewError {
    /// A required question has no (usable) answer.
    #[error("question '{node}' requires an answer")]
    AnswerRequired { node: NodeId },

    /// The answer fails the question's format rules.
    #[error("invalid answer for '{node}': {reason}")]
    InvalidAnswer { node: NodeId, reason: String },

    /// Nothing is connected to the start node yet.
    #[error("the start node has no outgoing connection")]
    StartNotConnected,

    /// The referenced node does not exist.
    #[error("node '{node}' not found")]
    NodeNotFound { node: NodeId },

    /// The answer variant does not fit the question type.
    #[error("answer kind does not fit question '{node}'")]
    WrongAnswerKind { node: NodeId },
}

type Result<T> = std::result::Result<T, PreviewError>;

/// A respondent's answer to one question.
///
/// Text-like questions (text, textarea, email, number, date) carry the
/// raw string; format validation happens when advancing past the
/// question, matching how a form validates on submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Answer {
    Text(String),
    /// Selected option index of a radio question.
    Choice(usize),
    /// Selected option indices of a checkbox question.
    Multi(Vec<usize>),
    /// Scale or rating value.
    Scale(u8),
}

/// The outcome of advancing past the current question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next question.
    Moved(NodeId),
    /// Reached an end node; the survey is complete.
    Finished(NodeId),
    /// No outgoing edge and no end node to fall back to.
    Blocked,
}

// ============================================================================
// Preview Session
// ============================================================================

/// A live walk through a survey graph.
#[derive(Debug, Clone)]
pub struct PreviewSession<'a> {
    graph: &'a SurveyGraph,
    /// Every node visited, in order; never truncated.
    history: Vec<NodeId>,
    /// Index of the current node within `history`.
    cursor: usize,
    answers: BTreeMap<NodeId, Answer>,
}

impl<'a> PreviewSession<'a> {
    /// Starts a session at the first question (the start node's sole
    /// outgoing target).
    pub fn start(graph: &'a SurveyGraph) -> Result<Self> {
        let first = graph
            .outgoing(&SurveyGraph::start_id())
            .next()
            .map(|e| e.target.clone())
            .ok_or(PreviewError::StartNotConnected)?;
        Ok(Self {
            graph,
            history: vec![first],
            cursor: 0,
            answers: BTreeMap::new(),
        })
    }

    /// The node the respondent is looking at.
    pub fn current(&self) -> &QuestionNode {
        // The constructor and every navigation keep history entries valid.
        self.graph
            .node(&self.history[self.cursor])
            .unwrap_or_else(|| unreachable!("history holds only existing nodes"))
    }

    /// Records an answer for the current question. Only the variant/type
    /// fit is checked here; content rules apply on [`PreviewSession::advance`].
    pub fn set_answer(&mut self, answer: Answer) -> Result<()> {
        let node = self.current();
        let fits = match node.question_type {
            QuestionType::Text
            | QuestionType::Textarea
            | QuestionType::Email
            | QuestionType::Number
            | QuestionType::Date => matches!(answer, Answer::Text(_)),
            QuestionType::Radio => matches!(answer, Answer::Choice(_)),
            QuestionType::Checkbox => matches!(answer, Answer::Multi(_)),
            QuestionType::Scale | QuestionType::Rating => matches!(answer, Answer::Scale(_)),
            QuestionType::Start | QuestionType::End => false,
        };
        if !fits {
            return Err(PreviewError::WrongAnswerKind {
                node: node.id.clone(),
            });
        }
        let id = node.id.clone();
        self.answers.insert(id, answer);
        Ok(())
    }

    /// The recorded answer for a node, if any.
    pub fn answer(&self, node: &NodeId) -> Option<&Answer> {
        self.answers.get(node)
    }

    /// Validates the current answer and moves on.
    ///
    /// Radio questions branch through the answered option's handle. A
    /// question without a matching outgoing edge falls through to the
    /// graph's end node when one exists, otherwise the session is blocked.
    pub fn advance(&mut self) -> Result<Advance> {
        let node = self.current().clone();
        if node.question_type == QuestionType::End {
            return Ok(Advance::Finished(node.id));
        }
        self.validate_answer(&node)?;

        let next = self.next_target(&node);
        match next {
            Some(target) => {
                debug!(from = %node.id, to = %target, "preview advanced");
                self.move_to(target.clone());
                if self
                    .graph
                    .node(&target)
                    .is_some_and(|n| n.question_type == QuestionType::End)
                {
                    Ok(Advance::Finished(target))
                } else {
                    Ok(Advance::Moved(target))
                }
            }
            None => match self.graph.end_node() {
                Some(end) => {
                    let end_id = end.id.clone();
                    debug!(from = %node.id, to = %end_id, "no edge, falling through to end");
                    self.move_to(end_id.clone());
                    Ok(Advance::Finished(end_id))
                }
                None => Ok(Advance::Blocked),
            },
        }
    }

    /// Steps back to the previously visited question. Answers are kept.
    pub fn previous(&mut self) -> Option<&QuestionNode> {
        if self.cursor == 0 {
            return None;
        }
        self.cursor -= 1;
        Some(self.current())
    }

    /// Jumps to an arbitrary node without validation (the preview's
    /// sidebar navigation).
    pub fn jump_to(&mut self, node: &NodeId) -> Result<()> {
        if !self.graph.contains_node(node) {
            return Err(PreviewError::NodeNotFound { node: node.clone() });
        }
        self.move_to(node.clone());
        Ok(())
    }

    /// Progress as (answered, total questions on the linearized path).
    /// End nodes are not questions and do not count.
    pub fn progress(&self) -> (usize, usize) {
        let total = linearize(self.graph)
            .iter()
            .filter(|n| n.question_type != QuestionType::End)
            .count();
        (self.answers.len(), total)
    }

    fn move_to(&mut self, target: NodeId) {
        self.history.push(target);
        self.cursor = self.history.len() - 1;
    }

    fn next_target(&self, node: &QuestionNode) -> Option<NodeId> {
        // A radio node branches exclusively through its option handles:
        // an unanswered radio, or an option nobody wired up, must not
        // ride a sibling option's edge.
        if node.question_type == QuestionType::Radio {
            let Some(Answer::Choice(index)) = self.answers.get(&node.id) else {
                return None;
            };
            let handle = HandleId::option(&node.id, *index);
            return self
                .graph
                .outgoing(&node.id)
                .find(|e| e.source_handle.as_ref() == Some(&handle))
                .map(|e| e.target.clone());
        }
        self.graph
            .outgoing(&node.id)
            .next()
            .map(|e| e.target.clone())
    }

    fn validate_answer(&self, node: &QuestionNode) -> Result<()> {
        let answer = self.answers.get(&node.id);

        let answered = match answer {
            None => false,
            Some(Answer::Text(s)) => !s.trim().is_empty(),
            Some(Answer::Multi(selected)) => !selected.is_empty(),
            Some(Answer::Choice(_) | Answer::Scale(_)) => true,
        };
        if node.required && !answered {
            return Err(PreviewError::AnswerRequired {
                node: node.id.clone(),
            });
        }

        // Content rules apply only to a present, non-empty answer.
        let Some(answer) = answer else {
            return Ok(());
        };
        let invalid = |reason: &str| PreviewError::InvalidAnswer {
            node: node.id.clone(),
            reason: reason.to_string(),
        };
        match (node.question_type, answer) {
            (QuestionType::Email, Answer::Text(s)) if answered => {
                if !is_plausible_email(s.trim()) {
                    return Err(invalid("not a valid email address"));
                }
            }
            (QuestionType::Number, Answer::Text(s)) if answered => {
                if s.trim().parse::<f64>().is_err() {
                    return Err(invalid("not a number"));
                }
            }
            (QuestionType::Date, Answer::Text(s)) if answered => {
                if NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").is_err() {
                    return Err(invalid("expected a date in YYYY-MM-DD form"));
                }
            }
            (QuestionType::Radio, Answer::Choice(index)) => {
                let len = node.options.as_ref().map_or(0, Vec::len);
                if *index >= len {
                    return Err(invalid("selected option no longer exists"));
                }
            }
            (QuestionType::Checkbox, Answer::Multi(selected)) => {
                let len = node.options.as_ref().map_or(0, Vec::len);
                if selected.iter().any(|i| *i >= len) {
                    return Err(invalid("selected option no longer exists"));
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Minimal email shape check: one `@` with a non-empty local part and a
/// dotted domain. Deliverability is out of scope for a preview.
fn is_plausible_email(s: &str) -> bool {
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || s.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Position;
    use test_case::test_case;

    /// start → email → end, email required.
    fn email_survey() -> (SurveyGraph, NodeId) {
        let mut g = SurveyGraph::new();
        let q = g.add_node(QuestionType::Email, Position::new(0.0, 100.0)).unwrap();
        g.update_node(&q, crate::edit::NodePatch::default().required(true))
            .unwrap();
        let end = g.end_node().unwrap().id.clone();
        g.connect(&SurveyGraph::start_id(), None, &q, None).unwrap();
        g.connect(&q, None, &end, None).unwrap();
        (g, q)
    }

    /// start → radio(2 options), option 0 → X, option 1 → Y.
    fn branching_survey() -> (SurveyGraph, NodeId, NodeId, NodeId) {
        let mut g = SurveyGraph::new();
        let radio = g.add_node(QuestionType::Radio, Position::new(0.0, 100.0)).unwrap();
        g.add_option(&radio).unwrap();
        let x = g.add_node(QuestionType::Text, Position::new(-100.0, 200.0)).unwrap();
        let y = g.add_node(QuestionType::Text, Position::new(100.0, 200.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &radio, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 0)), &x, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 1)), &y, None).unwrap();
        (g, radio, x, y)
    }

    #[test]
    fn test_start_requires_a_connection() {
        let g = SurveyGraph::new();
        assert_eq!(
            PreviewSession::start(&g).unwrap_err(),
            PreviewError::StartNotConnected
        );
    }

    #[test]
    fn test_required_answer_blocks_advance() {
        let (g, q) = email_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        assert_eq!(
            session.advance().unwrap_err(),
            PreviewError::AnswerRequired { node: q }
        );
    }

    #[test_case("alice@example.edu", true)]
    #[test_case("a@b.co", true)]
    #[test_case("not-an-email", false)]
    #[test_case("@example.edu", false)]
    #[test_case("alice@nodot", false)]
    #[test_case("alice smith@example.edu", false)]
    fn test_email_validation(input: &str, valid: bool) {
        let (g, q) = email_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Text(input.to_string())).unwrap();
        let result = session.advance();
        if valid {
            assert!(matches!(result, Ok(Advance::Finished(_))));
        } else {
            assert_eq!(
                result.unwrap_err(),
                PreviewError::InvalidAnswer {
                    node: q,
                    reason: "not a valid email address".to_string()
                }
            );
        }
    }

    #[test]
    fn test_radio_branches_by_selected_option() {
        let (g, _, x, y) = branching_survey();

        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(0)).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Moved(x));

        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(1)).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Moved(y));
    }

    #[test]
    fn test_unwired_radio_option_falls_through_to_end() {
        // Only option 1 is wired up; selecting option 0 must complete the
        // survey rather than ride option 1's edge.
        let mut g = SurveyGraph::new();
        let radio = g.add_node(QuestionType::Radio, Position::new(0.0, 100.0)).unwrap();
        g.add_option(&radio).unwrap();
        let y = g.add_node(QuestionType::Text, Position::new(100.0, 200.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &radio, None).unwrap();
        g.connect(&radio, Some(HandleId::option(&radio, 1)), &y, None).unwrap();
        let end = g.end_node().unwrap().id.clone();

        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(0)).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Finished(end));
    }

    #[test]
    fn test_unanswered_optional_radio_falls_through_to_end() {
        // An optional radio with no answer has no branch to take; it must
        // not follow some option's edge by accident.
        let (g, _, _, _) = branching_survey();
        let end = g.end_node().unwrap().id.clone();

        let mut session = PreviewSession::start(&g).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Finished(end));
    }

    #[test]
    fn test_dead_end_falls_through_to_end_node() {
        // X has no outgoing edge but the graph has an end node.
        let (g, _, x, _) = branching_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(0)).unwrap();
        session.advance().unwrap();
        assert_eq!(session.current().id, x);

        let end = g.end_node().unwrap().id.clone();
        assert_eq!(session.advance().unwrap(), Advance::Finished(end));
    }

    #[test]
    fn test_wrong_answer_kind_rejected() {
        let (g, q) = email_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        assert_eq!(
            session.set_answer(Answer::Choice(0)).unwrap_err(),
            PreviewError::WrongAnswerKind { node: q }
        );
    }

    #[test]
    fn test_previous_keeps_answers() {
        let (g, radio, x, _) = branching_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(0)).unwrap();
        session.advance().unwrap();
        assert_eq!(session.current().id, x);

        let back = session.previous().unwrap();
        assert_eq!(back.id, radio);
        assert_eq!(session.answer(&radio), Some(&Answer::Choice(0)));

        // No further back than the first question.
        assert!(session.previous().is_none());
    }

    #[test]
    fn test_jump_to_is_unconditional() {
        let (g, _, _, y) = branching_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        session.jump_to(&y).unwrap();
        assert_eq!(session.current().id, y);

        let ghost = NodeId::new("ghost");
        assert_eq!(
            session.jump_to(&ghost).unwrap_err(),
            PreviewError::NodeNotFound { node: ghost }
        );
    }

    #[test]
    fn test_progress_counts_questions_not_ends() {
        let (g, radio, _, _) = branching_survey();
        let mut session = PreviewSession::start(&g).unwrap();
        assert_eq!(session.progress(), (0, 3));
        session.set_answer(Answer::Choice(0)).unwrap();
        assert_eq!(session.progress().0, 1);
        let _ = radio;
    }

    #[test]
    fn test_number_and_date_validation() {
        let mut g = SurveyGraph::new();
        let q = g.add_node(QuestionType::Number, Position::new(0.0, 100.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &q, None).unwrap();

        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Text("abc".to_string())).unwrap();
        assert!(matches!(
            session.advance(),
            Err(PreviewError::InvalidAnswer { .. })
        ));
        session.set_answer(Answer::Text("42.5".to_string())).unwrap();
        assert!(session.advance().is_ok());

        let mut g = SurveyGraph::new();
        let q = g.add_node(QuestionType::Date, Position::new(0.0, 100.0)).unwrap();
        g.connect(&SurveyGraph::start_id(), None, &q, None).unwrap();
        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Text("2026-13-40".to_string())).unwrap();
        assert!(matches!(
            session.advance(),
            Err(PreviewError::InvalidAnswer { .. })
        ));
        session.set_answer(Answer::Text("2026-08-23".to_string())).unwrap();
        assert!(session.advance().is_ok());
    }

    #[test]
    fn test_optional_question_advances_unanswered() {
        let mut g = SurveyGraph::new();
        let q = g.add_node(QuestionType::Text, Position::new(0.0, 100.0)).unwrap();
        let end = g.end_node().unwrap().id.clone();
        g.connect(&SurveyGraph::start_id(), None, &q, None).unwrap();
        g.connect(&q, None, &end, None).unwrap();

        let mut session = PreviewSession::start(&g).unwrap();
        assert_eq!(session.advance().unwrap(), Advance::Finished(end));
    }

    #[test]
    fn test_stale_choice_rejected_after_option_removal() {
        let (mut g, radio, _, _) = branching_survey();
        // Drop option 1 so only option 0 remains.
        g.remove_option(&radio, 1).unwrap();

        let mut session = PreviewSession::start(&g).unwrap();
        session.set_answer(Answer::Choice(1)).unwrap();
        assert!(matches!(
            session.advance(),
            Err(PreviewError::InvalidAnswer { .. })
        ));
    }
}
