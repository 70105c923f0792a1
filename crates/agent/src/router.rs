use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use rolobot_core::intent::ActionDecision;

use crate::llm::{LlmClient, LlmError};
use crate::prompt;

#[derive(Debug, Error)]
pub enum ClassifyError {
    /// The classification call itself failed. Distinct from malformed
    /// output, which is absorbed into `ActionDecision::Unrecognized`.
    #[error(transparent)]
    Llm(#[from] LlmError),
}

/// Pure text-to-decision boundary. Holds no state so a scripted double can
/// stand in for the live model under test.
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<ActionDecision, ClassifyError>;
}

pub struct IntentRouter<L> {
    llm: L,
    temperature: f64,
    max_output_tokens: u32,
}

impl<L> IntentRouter<L>
where
    L: LlmClient,
{
    pub fn new(llm: L, temperature: f64, max_output_tokens: u32) -> Self {
        Self { llm, temperature, max_output_tokens }
    }
}

#[async_trait]
impl<L> IntentClassifier for IntentRouter<L>
where
    L: LlmClient,
{
    async fn classify(&self, text: &str) -> Result<ActionDecision, ClassifyError> {
        let request =
            prompt::classification_request(text, self.temperature, self.max_output_tokens);
        let raw = self.llm.complete(&request).await?;

        let decision = ActionDecision::from_classifier_output(&raw);
        if decision.is_unrecognized() {
            warn!(raw_output = %raw, "classifier output failed validation");
        } else {
            debug!(decision = ?decision, "classifier output validated");
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use rolobot_core::intent::ActionDecision;

    use crate::llm::{LlmError, ScriptedLlmClient};

    use super::{ClassifyError, IntentClassifier, IntentRouter};

    fn router(llm: ScriptedLlmClient) -> IntentRouter<ScriptedLlmClient> {
        IntentRouter::new(llm, 0.1, 128)
    }

    #[tokio::test]
    async fn valid_output_becomes_a_typed_decision() {
        let router = router(ScriptedLlmClient::replying([r#"[1, ["VC", "fintech"]]"#]));

        let decision = router.classify("find a VC who invests in fintech").await.expect("ok");

        match decision {
            ActionDecision::Search(params) => assert_eq!(params.terms, vec!["VC", "fintech"]),
            other => panic!("expected search, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fenced_output_is_tolerated() {
        let router =
            router(ScriptedLlmClient::replying(["```json\n[5, {\"period\": \"daily\"}]\n```"]));

        let decision = router.classify("today's tasks").await.expect("ok");
        assert!(matches!(decision, ActionDecision::ListTasks(_)));
    }

    #[tokio::test]
    async fn malformed_output_is_absorbed_not_errored() {
        let router = router(ScriptedLlmClient::replying(["the user wants to search, probably"]));

        let decision = router.classify("hmm").await.expect("ok");
        assert!(decision.is_unrecognized());
    }

    #[tokio::test]
    async fn transport_failure_surfaces_as_an_error() {
        let llm = ScriptedLlmClient::default();
        llm.push_err(LlmError::Status(503));
        let router = router(llm);

        let outcome = router.classify("find people").await;
        assert!(matches!(outcome, Err(ClassifyError::Llm(_))));
    }

    #[tokio::test]
    async fn raw_user_text_reaches_the_model_untouched() {
        let llm = ScriptedLlmClient::replying([r#"[7, null]"#]);
        let router = IntentRouter::new(llm, 0.1, 128);

        router.classify("show my meetings").await.expect("ok");

        let requests = router.llm.seen_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].user, "show my meetings");
        assert!(requests[0].system.contains("Reply with ONLY a JSON array"));
    }
}
