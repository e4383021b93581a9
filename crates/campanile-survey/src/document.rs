//! The persisted survey document.

use serde::{Deserialize, Serialize};

use crate::graph::SurveyGraph;

/// Presentation and submission settings of a survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveySettings {
    pub description: String,
    pub welcome_message: String,
    pub thank_you_message: String,
    pub allow_anonymous: bool,
    pub show_progress_bar: bool,
    pub randomize_questions: bool,
    pub allow_multiple_submissions: bool,
}

impl Default for SurveySettings {
    fn default() -> Self {
        Self {
            description: String::new(),
            welcome_message: "Welcome to the survey".to_string(),
            thank_you_message: "Thank you for completing the survey!".to_string(),
            allow_anonymous: true,
            show_progress_bar: true,
            randomize_questions: false,
            allow_multiple_submissions: false,
        }
    }
}

/// A complete survey: title, settings, and the flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurveyDocument {
    pub title: String,
    pub settings: SurveySettings,
    pub graph: SurveyGraph,
}

impl SurveyDocument {
    /// Creates an untitled survey with the initial canvas and default
    /// settings.
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            settings: SurveySettings::default(),
            graph: SurveyGraph::new(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
