//! Integration tests for the chatboard library.
//! These tests require a live completion endpoint in the environment to run.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chatboard::{
        ChatConfig, HttpCompletionClient, MemorySnapshotStore, NullRenderer, SessionController,
        SessionStore, StaticProfileSource,
    };

    #[tokio::test]
    async fn test_streaming_send_against_live_endpoint() {
        // This test requires CHATBOARD_ENDPOINT to point at an
        // OpenAI-compatible /v1/chat/completions endpoint.
        let Ok(endpoint) = std::env::var("CHATBOARD_ENDPOINT") else {
            eprintln!("Skipping test: CHATBOARD_ENDPOINT not set");
            return;
        };
        let model =
            std::env::var("CHATBOARD_MODEL").unwrap_or_else(|_| "meta-llama-3.1-8b-instruct".to_string());

        let config = ChatConfig::new()
            .with_endpoint(endpoint)
            .with_model(model)
            .with_max_tokens(Some(32));
        let client = Arc::new(HttpCompletionClient::new(&config).expect("Failed to create client"));
        let store = SessionStore::new(Box::new(MemorySnapshotStore::new()));
        let controller = SessionController::new(store, client);

        let session = controller.create_session().expect("Failed to create session");
        let profile = StaticProfileSource::plain();
        let mut renderer = NullRenderer;

        let result = controller
            .send_message(&session.id, "Say 'test passed'", &profile, &mut renderer)
            .await;
        assert!(result.is_ok(), "Send should succeed against a live endpoint");

        let session = controller.session(&session.id).expect("Session should exist");
        assert_eq!(session.messages.len(), 2);
        assert!(
            !session.messages[1].content.is_empty(),
            "Assistant reply should not be empty"
        );
    }
}
