//! Contract tests for the scripted `LlmClient` double.

use cahier_llm::fakes::ScriptedLlm;
use cahier_llm::{LlmClient, LlmError};

#[tokio::test]
async fn scripted_replies_are_returned_in_order() {
    let llm = ScriptedLlm::with_replies(["first", "second"]);

    assert_eq!(llm.complete("a", None).await.unwrap(), "first");
    assert_eq!(llm.complete("b", None).await.unwrap(), "second");
    assert_eq!(llm.remaining(), 0);
}

#[tokio::test]
async fn scripted_errors_surface_to_caller() {
    let llm = ScriptedLlm::new();
    llm.push_error(LlmError::Transient("connection reset".into()));

    let err = llm.complete("a", None).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn exhausted_script_is_content_error() {
    let llm = ScriptedLlm::new();
    let err = llm.complete("a", None).await.unwrap_err();
    assert!(matches!(err, LlmError::Content(_)));
}

#[tokio::test]
async fn calls_are_recorded_with_system_prompt() {
    let llm = ScriptedLlm::with_replies(["ok"]);
    llm.complete("describe the site", Some("you are a writer"))
        .await
        .unwrap();

    let calls = llm.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].prompt, "describe the site");
    assert_eq!(calls[0].system_prompt.as_deref(), Some("you are a writer"));
}

#[tokio::test]
async fn scripted_client_is_usable_as_trait_object() {
    let llm: std::sync::Arc<dyn LlmClient> = std::sync::Arc::new(ScriptedLlm::with_replies(["x"]));
    assert_eq!(llm.model_name(), "scripted");
    assert_eq!(llm.complete("p", None).await.unwrap(), "x");
}
