//! Patent landscape analysis.
//!
//! One LLM pass over the patent digest after fetching: key technologies,
//! competitor groups and patent barriers. The text feeds synthesis. A
//! failed analysis is logged and synthesis falls back to the digest alone.

use std::sync::Arc;
use tracing::{debug, info};
use windowscout_core::evidence::EvidenceSlot;
use windowscout_core::provider::{Provider, ProviderRequest};
use windowscout_core::session::Session;

use crate::error::AnalysisError;
use crate::settings::WorkflowSettings;
use crate::synthesis::{patent_digest, unique_patents};

const ANALYSIS_SYSTEM: &str = "You are a patent analyst. Answer only from the records supplied.";
const ANALYSIS_MAX_TOKENS: u32 = 2048;

pub struct PatentAnalyst {
    provider: Arc<dyn Provider>,
    settings: WorkflowSettings,
}

impl PatentAnalyst {
    pub fn new(provider: Arc<dyn Provider>, settings: WorkflowSettings) -> Self {
        Self { provider, settings }
    }

    /// Analyse the patent evidence. `Ok(None)` when there are no patents
    /// to analyse or the model returned nothing.
    pub async fn analyze(
        &self,
        session: &Session,
        evidence: &[EvidenceSlot],
    ) -> Result<Option<String>, AnalysisError> {
        let patents = unique_patents(evidence).len();
        if patents == 0 {
            debug!(session_id = %session.id, "No patents to analyse");
            return Ok(None);
        }

        let prompt = analysis_prompt(&session.query, evidence);
        let request = ProviderRequest::prompt(&self.settings.model, ANALYSIS_SYSTEM, prompt)
            .with_temperature(self.settings.temperature)
            .with_max_tokens(ANALYSIS_MAX_TOKENS.min(self.settings.max_tokens))
            .with_context("stage", "patent_analysis".into())
            .with_context("session_id", session.id.to_string().into());

        let response = self.provider.complete(request).await?;
        let text = response.message.content.trim().to_string();
        if text.is_empty() {
            return Ok(None);
        }
        info!(session_id = %session.id, patents, chars = text.len(), "Patent landscape analysed");
        Ok(Some(text))
    }
}

pub fn analysis_prompt(query: &str, evidence: &[EvidenceSlot]) -> String {
    format!(
        "Analyse the patents below, retrieved for \"{query}\".\n\n\
         {digest}\n\
         Reply in Markdown with these parts:\n\
         ### Key technologies\nThe core technical points of each filing, grouped by direction.\n\
         ### Competitor groups\nAssignees grouped by technology category, with their filings.\n\
         ### Patent barriers\nAreas where existing claims block a new entrant.\n\
         ### Summary\nTwo or three sentences on the overall patent landscape.\n",
        digest = patent_digest(evidence)
    )
}
