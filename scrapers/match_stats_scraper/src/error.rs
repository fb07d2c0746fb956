use serde::Serialize;
use thiserror::Error;

/// Flags describing what a document looked like, so callers can tell an
/// unrendered page from a page that simply lists nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostics {
    pub html_length: usize,
    pub body_length: usize,
    pub has_script: bool,
    pub has_sports_event: bool,
    pub has_graph: bool,
    pub has_event_markup: bool,
    pub has_table: bool,
    pub has_skeleton: bool,
    pub has_loading: bool,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("page is a client-rendered shell; copy the HTML again after the page finishes rendering")]
    SpaShell { diagnostics: Diagnostics },

    #[error("no matches found in document")]
    NoMatches { diagnostics: Diagnostics },

    #[error("could not identify both teams of the match")]
    MissingMatchInfo { diagnostics: Diagnostics },

    #[error("invalid JSON payload: {0}")]
    InvalidPayload(String),
}

impl ExtractError {
    pub fn diagnostics(&self) -> Option<&Diagnostics> {
        match self {
            ExtractError::SpaShell { diagnostics }
            | ExtractError::NoMatches { diagnostics }
            | ExtractError::MissingMatchInfo { diagnostics } => Some(diagnostics),
            ExtractError::InvalidPayload(_) => None,
        }
    }

    pub fn needs_rendered_html(&self) -> bool {
        matches!(self, ExtractError::SpaShell { .. })
    }
}

impl From<serde_json::Error> for ExtractError {
    fn from(err: serde_json::Error) -> Self {
        ExtractError::InvalidPayload(err.to_string())
    }
}
