use crate::core::command::{
    failure_text, help_text, progress_text, summary_text, unknown_text, Command, ECHO_TEXT,
    START_TEXT, UNAUTHORIZED_TEXT,
};
use crate::domain::model::{IncomingMessage, DEFAULT_POST_COUNT, MAX_POST_COUNT};
use crate::domain::ports::{ChatTransport, Pipeline};
use crate::utils::error::Result;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub default_count: usize,
    pub max_count: usize,
    /// Empty means everyone may issue commands.
    pub allowed_user_ids: Vec<i64>,
    pub poll_retry_delay: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_count: DEFAULT_POST_COUNT,
            max_count: MAX_POST_COUNT,
            allowed_user_ids: Vec::new(),
            poll_retry_delay: Duration::from_secs(5),
        }
    }
}

/// Runs operator commands one at a time; a pipeline run finishes before the next
/// message is looked at.
pub struct BotEngine<T: ChatTransport, P: Pipeline> {
    transport: T,
    pipeline: P,
    settings: EngineSettings,
}

impl<T: ChatTransport, P: Pipeline> BotEngine<T, P> {
    pub fn new(transport: T, pipeline: P, settings: EngineSettings) -> Self {
        Self {
            transport,
            pipeline,
            settings,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    fn is_authorized(&self, message: &IncomingMessage) -> bool {
        if self.settings.allowed_user_ids.is_empty() {
            return true;
        }
        message
            .user_id
            .map(|id| self.settings.allowed_user_ids.contains(&id))
            .unwrap_or(false)
    }

    async fn say(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.transport.reply(chat_id, text).await {
            tracing::error!("Error sending reply to chat {}: {}", chat_id, e);
        }
    }

    pub async fn handle_message(&mut self, message: &IncomingMessage) {
        if !self.is_authorized(message) {
            tracing::warn!(
                "🚫 Ignoring message from unauthorized user {:?} in chat {}",
                message.user_id,
                message.chat_id
            );
            self.say(message.chat_id, UNAUTHORIZED_TEXT).await;
            return;
        }

        let command = match Command::parse(
            &message.text,
            self.settings.default_count,
            self.settings.max_count,
        ) {
            Ok(command) => command,
            Err(e) => {
                tracing::info!("Rejected command '{}': {}", message.text, e);
                self.say(message.chat_id, &e.user_friendly_message()).await;
                return;
            }
        };

        match command {
            Command::Start => self.say(message.chat_id, START_TEXT).await,
            Command::Help => {
                let text = help_text(self.settings.default_count, self.settings.max_count);
                self.say(message.chat_id, &text).await;
            }
            Command::Text => self.say(message.chat_id, ECHO_TEXT).await,
            Command::Unknown(name) => self.say(message.chat_id, &unknown_text(&name)).await,
            Command::Post(request) => {
                self.say(message.chat_id, &progress_text(&request)).await;

                let reply = match self.pipeline.run(request).await {
                    Ok(result) => summary_text(&result),
                    Err(e) => {
                        tracing::error!(
                            "❌ Post run failed: {} (Category: {:?}, Severity: {:?})",
                            e,
                            e.category(),
                            e.severity()
                        );
                        failure_text(&e)
                    }
                };
                self.say(message.chat_id, &reply).await;
            }
        }
    }

    /// Polls for commands until `shutdown` resolves. Returns an error only when
    /// polling can never succeed, such as another instance using the same token.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!("🤖 Bot started, waiting for commands");

        loop {
            let batch = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("Received shutdown signal");
                    break;
                }
                batch = self.transport.next_messages() => batch,
            };

            match batch {
                Ok(messages) => {
                    for message in messages {
                        self.handle_message(&message).await;
                    }
                }
                Err(e) if e.is_conflict() => {
                    tracing::error!(
                        "Bot conflict detected. Please ensure only one instance is running."
                    );
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!(
                        "Polling for updates failed: {}, retrying in {:?}",
                        e,
                        self.settings.poll_retry_delay
                    );
                    tokio::time::sleep(self.settings.poll_retry_delay).await;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{PipelineResult, PostRequest};
    use crate::utils::error::DealError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        batches: VecDeque<Result<Vec<IncomingMessage>>>,
        replies: Mutex<Vec<(i64, String)>>,
    }

    impl ScriptedTransport {
        fn new(batches: Vec<Result<Vec<IncomingMessage>>>) -> Self {
            Self {
                batches: batches.into(),
                replies: Mutex::new(Vec::new()),
            }
        }

        fn replies(&self) -> Vec<(i64, String)> {
            self.replies.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn next_messages(&mut self) -> Result<Vec<IncomingMessage>> {
            self.batches.pop_front().unwrap_or_else(|| {
                Err(DealError::TelegramApi {
                    code: 409,
                    description: "Conflict".to_string(),
                })
            })
        }

        async fn reply(&self, chat_id: i64, text: &str) -> Result<()> {
            self.replies.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingPipeline {
        requests: Vec<usize>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Pipeline for RecordingPipeline {
        async fn run(&mut self, request: PostRequest) -> Result<PipelineResult> {
            self.requests.push(request.count());
            if self.fail {
                return Err(DealError::SourceUnavailable {
                    reason: "HTTP 503".to_string(),
                });
            }
            let mut result = PipelineResult::new(request.count(), request.count());
            result.posted = (0..request.count()).map(|i| format!("P{}", i)).collect();
            Ok(result)
        }
    }

    fn message(user_id: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id: 100,
            user_id: Some(user_id),
            text: text.to_string(),
        }
    }

    fn settings() -> EngineSettings {
        EngineSettings {
            poll_retry_delay: Duration::from_millis(0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_post_command_runs_pipeline_and_reports() {
        let transport = ScriptedTransport::new(vec![]);
        let mut engine = BotEngine::new(transport, RecordingPipeline::default(), settings());

        engine.handle_message(&message(1, "/post")).await;

        assert_eq!(engine.pipeline().requests, vec![5]);
        let replies = engine.transport().replies();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].1, "Searching for 5 products. Please wait...");
        assert_eq!(replies[1].1, "Successfully posted 5 products to the channel!");
    }

    #[tokio::test]
    async fn test_invalid_count_never_reaches_pipeline() {
        let transport = ScriptedTransport::new(vec![]);
        let mut engine = BotEngine::new(transport, RecordingPipeline::default(), settings());

        engine.handle_message(&message(1, "/post_count 25")).await;

        assert!(engine.pipeline().requests.is_empty());
        let replies = engine.transport().replies();
        assert_eq!(replies.len(), 1);
        assert!(replies[0].1.contains("between 1 and 10"));
    }

    #[tokio::test]
    async fn test_source_failure_is_reported_to_operator() {
        let transport = ScriptedTransport::new(vec![]);
        let pipeline = RecordingPipeline {
            fail: true,
            ..Default::default()
        };
        let mut engine = BotEngine::new(transport, pipeline, settings());

        engine.handle_message(&message(1, "/post_count 2")).await;

        let replies = engine.transport().replies();
        assert!(replies[1].1.starts_with("Failed to fetch products"));
        assert!(replies[1].1.contains("HTTP 503"));
    }

    #[tokio::test]
    async fn test_unauthorized_users_are_refused() {
        let transport = ScriptedTransport::new(vec![]);
        let mut engine = BotEngine::new(
            transport,
            RecordingPipeline::default(),
            EngineSettings {
                allowed_user_ids: vec![42],
                ..settings()
            },
        );

        engine.handle_message(&message(7, "/post")).await;
        engine.handle_message(&message(42, "/post 1")).await;

        assert_eq!(engine.pipeline().requests, vec![1]);
        assert_eq!(engine.transport().replies()[0].1, UNAUTHORIZED_TEXT);
    }

    #[tokio::test]
    async fn test_run_handles_batches_in_order_and_stops_on_conflict() {
        let transport = ScriptedTransport::new(vec![
            Ok(vec![message(1, "/start"), message(1, "/post_count 3")]),
            Err(DealError::TelegramApi {
                code: 502,
                description: "Bad Gateway".to_string(),
            }),
            Ok(vec![message(1, "/post 2")]),
        ]);
        let mut engine = BotEngine::new(transport, RecordingPipeline::default(), settings());

        let err = engine.run(std::future::pending::<()>()).await.unwrap_err();

        assert!(err.is_conflict());
        assert_eq!(engine.pipeline().requests, vec![3, 2]);
        assert_eq!(engine.transport().replies()[0].1, START_TEXT);
    }

    #[tokio::test]
    async fn test_run_returns_when_shutdown_resolves() {
        let transport = ScriptedTransport::new(vec![]);
        let mut engine = BotEngine::new(transport, RecordingPipeline::default(), settings());

        tokio_test::assert_ok!(engine.run(async {}).await);
    }
}
