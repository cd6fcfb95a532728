//! One chat turn: style profile -> tweaks -> run request -> flow -> reply text.
//!
//! Only transport-level failures are errors; an undecodable body or a response without the
//! reply path yields the fallback sentence.

use serde_json::Value;

use crate::config::{resolve_api_key, Config, StyleConfig};
use crate::flow::{extract_message, FlowError, FlowRunner, RunRequest};
use crate::session::{Transcript, TranscriptMessage};
use crate::tweaks::{StyleProfile, Tweaks};

/// Per-request settings resolved from config (and CLI overrides) once per session.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub endpoint: String,
    pub output_type: String,
    pub input_type: String,
    pub api_key: Option<String>,
    /// Tweaks every request starts from before the style profile is applied.
    pub base_tweaks: Tweaks,
    pub style: StyleConfig,
}

impl TurnSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            endpoint: config.flow.endpoint.clone(),
            output_type: config.flow.output_type.clone(),
            input_type: config.flow.input_type.clone(),
            api_key: resolve_api_key(config),
            base_tweaks: config.flow.tweaks.clone(),
            style: config.style.clone(),
        }
    }

    /// Fresh request for this turn; tweaks are rebuilt from the base map every time.
    pub fn build_request(&self, message: &str, profile: &StyleProfile) -> RunRequest {
        RunRequest::new(message, self.endpoint.clone())
            .with_types(self.output_type.clone(), self.input_type.clone())
            .with_tweaks(profile.apply(&self.base_tweaks, &self.style))
            .with_api_key(self.api_key.clone())
    }
}

/// A conversation against one flow: settings, runner and the display transcript.
pub struct ChatSession<R: FlowRunner> {
    runner: R,
    settings: TurnSettings,
    transcript: Transcript,
}

impl<R: FlowRunner> ChatSession<R> {
    pub fn new(runner: R, settings: TurnSettings) -> Self {
        Self {
            runner,
            settings,
            transcript: Transcript::new(),
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.settings
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Drop the displayed history. The flow keeps its own memory, so this only affects display.
    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
    }

    /// Record the user message and build the request for it. Pair with [`finish_turn`](Self::finish_turn)
    /// when the flow call happens elsewhere (e.g. on a worker thread).
    pub fn begin_turn(&mut self, message: &str, profile: &StyleProfile) -> RunRequest {
        self.transcript.push(TranscriptMessage::user(message));
        self.settings.build_request(message, profile)
    }

    /// Record the reply extracted from a flow result and return it.
    /// On error nothing is added, so the user message stays last in the transcript.
    pub fn finish_turn(&mut self, result: Result<Value, FlowError>) -> Result<String, FlowError> {
        let reply = extract_message(&result?);
        self.transcript.push(TranscriptMessage::assistant(reply.clone()));
        Ok(reply)
    }

    /// Record the user message, run the flow, record and return the reply.
    pub async fn turn(&mut self, message: &str, profile: &StyleProfile) -> Result<String, FlowError> {
        let request = self.begin_turn(message, profile);
        let result = self.runner.run(&request).await;
        self.finish_turn(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::NO_MESSAGE_FALLBACK;
    use crate::session::Role;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Returns a canned response and records every request it sees.
    struct FakeRunner {
        response: Result<Value, ()>,
        seen: Mutex<Vec<Value>>,
    }

    impl FakeRunner {
        fn replying(response: Value) -> Self {
            Self {
                response: Ok(response),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn unreachable() -> Self {
            Self {
                response: Err(()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl FlowRunner for FakeRunner {
        async fn run(&self, request: &RunRequest) -> Result<Value, FlowError> {
            self.seen
                .lock()
                .unwrap()
                .push(serde_json::to_value(request.payload()).unwrap());
            match &self.response {
                Ok(v) => Ok(v.clone()),
                Err(()) => {
                    // Port 1 on loopback is closed; gives a genuine reqwest transport error.
                    let err = reqwest::Client::new()
                        .get("http://127.0.0.1:1/")
                        .send()
                        .await
                        .unwrap_err();
                    Err(FlowError::Transport(err))
                }
            }
        }
    }

    fn hello(text: &str) -> Value {
        json!({"outputs":[{"outputs":[{"results":{"message":{"text": text}}}]}]})
    }

    #[test]
    fn settings_follow_config() {
        let mut config = Config::default();
        config.flow.endpoint = "6ae668ee".to_string();
        let s = TurnSettings::from_config(&config);
        assert_eq!(s.endpoint, "6ae668ee");
        assert_eq!(s.base_tweaks.len(), 8);
    }

    #[test]
    fn build_request_applies_profile_to_fresh_tweaks() {
        let s = TurnSettings::from_config(&Config::default());
        let req = s.build_request("date night outfit", &StyleProfile::new("apple", "warm"));
        let tweaks = req.tweaks.as_ref().unwrap();
        assert_eq!(
            tweaks.component("TextInput-GBnao").and_then(|m| m.get("input_value")),
            Some(&json!("apple"))
        );
        assert!(s
            .base_tweaks
            .component("TextInput-GBnao")
            .map(|m| m.is_empty())
            .unwrap_or(false));
        let next = s.build_request("again", &StyleProfile::default());
        assert_eq!(next.tweaks.as_ref(), Some(&s.base_tweaks));
    }

    #[tokio::test]
    async fn turn_records_both_sides() {
        let mut chat = ChatSession::new(
            FakeRunner::replying(hello("Try a belted coat.")),
            TurnSettings::from_config(&Config::default()),
        );
        let reply = chat
            .turn("what for winter?", &StyleProfile::new("rectangle", ""))
            .await
            .unwrap();
        assert_eq!(reply, "Try a belted coat.");
        let roles: Vec<Role> = chat.transcript().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);

        let seen = chat.runner.seen.lock().unwrap();
        assert_eq!(seen[0]["input_value"], "what for winter?");
        assert_eq!(seen[0]["tweaks"]["TextInput-GBnao"]["input_value"], "rectangle");
        assert_eq!(seen[0]["tweaks"]["TextInput-KwRKr"], json!({}));
    }

    #[tokio::test]
    async fn empty_response_shows_fallback() {
        let mut chat = ChatSession::new(
            FakeRunner::replying(json!({})),
            TurnSettings::from_config(&Config::default()),
        );
        let reply = chat.turn("hi", &StyleProfile::default()).await.unwrap();
        assert_eq!(reply, NO_MESSAGE_FALLBACK);
        assert_eq!(chat.transcript().len(), 2);
    }

    #[test]
    fn split_turn_matches_single_call() {
        let mut chat = ChatSession::new(
            FakeRunner::replying(json!({})),
            TurnSettings::from_config(&Config::default()),
        );
        let request = chat.begin_turn("a look for a gala", &StyleProfile::new("pear", ""));
        assert_eq!(request.message, "a look for a gala");
        assert_eq!(chat.transcript().len(), 1);

        let reply = chat.finish_turn(Ok(hello("A column gown."))).unwrap();
        assert_eq!(reply, "A column gown.");
        let roles: Vec<Role> = chat.transcript().messages().iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
    }

    #[test]
    fn finish_turn_with_empty_body_records_fallback() {
        let mut chat = ChatSession::new(
            FakeRunner::replying(json!({})),
            TurnSettings::from_config(&Config::default()),
        );
        chat.begin_turn("hi", &StyleProfile::default());
        assert_eq!(chat.finish_turn(Ok(json!({}))).unwrap(), NO_MESSAGE_FALLBACK);
        assert_eq!(chat.transcript().messages()[1].content, NO_MESSAGE_FALLBACK);
    }

    #[tokio::test]
    async fn transport_error_keeps_user_message_only() {
        let mut chat = ChatSession::new(
            FakeRunner::unreachable(),
            TurnSettings::from_config(&Config::default()),
        );
        let err = chat.turn("hi", &StyleProfile::default()).await.unwrap_err();
        assert!(matches!(err, FlowError::Transport(_)));
        assert_eq!(chat.transcript().len(), 1);
        assert_eq!(chat.transcript().messages()[0].role, Role::User);
    }
}
