//! Slide Workflow Context

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::catalog::{SetList, Song};
use super::WORKFLOW_NAME;
use crate::workflow::{ContextHeader, FinalContent, WorkflowContext, DEFAULT_CONTENT_TYPE};

/// State of one slide deck build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSlidesContext {
    header: ContextHeader,

    /// Set list requested by the caller.
    pub set_list_name: String,

    /// Filled by `find-set-list`.
    #[serde(default)]
    pub set_list: Option<SetList>,

    /// Song title to song, filled by `find-songs-for-set-list`.
    #[serde(default)]
    pub songs: BTreeMap<String, Song>,

    /// Rendered deck, filled by `build-slide-show`.
    #[serde(default)]
    pub content: Vec<u8>,

    #[serde(default)]
    pub content_type: Option<String>,
}

impl BuildSlidesContext {
    /// Creates a context for `set_list_name` with a fresh claim ticket.
    pub fn new(set_list_name: impl Into<String>) -> Self {
        Self::from_header(ContextHeader::new(WORKFLOW_NAME), set_list_name)
    }

    /// Creates a context with a caller-supplied claim ticket.
    pub fn with_claim_ticket(
        claim_ticket: impl Into<String>,
        set_list_name: impl Into<String>,
    ) -> Self {
        Self::from_header(
            ContextHeader::with_claim_ticket(WORKFLOW_NAME, claim_ticket),
            set_list_name,
        )
    }

    /// Creates a context addressed to another registered name (an alias).
    pub fn for_workflow(
        workflow_name: impl Into<String>,
        set_list_name: impl Into<String>,
    ) -> Self {
        Self::from_header(ContextHeader::new(workflow_name), set_list_name)
    }

    fn from_header(header: ContextHeader, set_list_name: impl Into<String>) -> Self {
        Self {
            header,
            set_list_name: set_list_name.into(),
            set_list: None,
            songs: BTreeMap::new(),
            content: Vec::new(),
            content_type: None,
        }
    }
}

impl WorkflowContext for BuildSlidesContext {
    const TYPE_TAG: &'static str = "build-slides";

    fn header(&self) -> &ContextHeader {
        &self.header
    }

    fn header_mut(&mut self) -> &mut ContextHeader {
        &mut self.header
    }
}

impl FinalContent for BuildSlidesContext {
    fn final_content(&self) -> &[u8] {
        &self.content
    }

    fn final_content_type(&self) -> &str {
        self.content_type.as_deref().unwrap_or(DEFAULT_CONTENT_TYPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context() {
        let ctx = BuildSlidesContext::new("easter");
        assert_eq!(ctx.workflow_name(), "build-slides");
        assert_eq!(ctx.set_list_name, "easter");
        assert!(ctx.status().is_none());
        assert!(!ctx.claim_ticket().is_empty());
    }

    #[test]
    fn test_final_content_defaults() {
        let ctx = BuildSlidesContext::with_claim_ticket("T1", "easter");
        assert!(ctx.final_content().is_empty());
        assert_eq!(ctx.final_content_type(), "text/plain");
    }

    #[test]
    fn test_serialized_field_names() {
        let ctx = BuildSlidesContext::with_claim_ticket("T1", "easter");
        let value = serde_json::to_value(&ctx).unwrap();

        assert_eq!(value["setListName"], "easter");
        assert_eq!(value["header"]["claimTicket"], "T1");
        assert_eq!(value["header"]["workflowName"], "build-slides");
    }
}
