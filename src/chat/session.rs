use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use sitecraft_common::{
    AssistantReply, DEFAULT_FRAGMENT_NAME, Fragment, Message, PLANNING_APPROVED, PLANNING_PROPOSED,
};
use tokio_util::sync::CancellationToken;

use super::intent::{IntentMatcher, TurnPlan};
use super::prompts::{
    BUILDER_PROMPT, ERROR_ENTRY, PLAN_FALLBACK, PLANNER_PROMPT, REPLY_FALLBACK, UPDATE_DEFAULT,
};
use super::state::ConversationState;
use crate::errors::{ChatError, ProviderError, StoreError};
use crate::notify::Notifier;
use crate::patch::{RenamedId, uniquify_data_ids};
use crate::promote::promote;
use crate::provider::{AiProvider, ChatRequest, complete_with_timeout};
use crate::store::{GREETING, Project, ProjectStore};
use crate::util::truncate_chars;

const FRAGMENT_NAME_MAX: usize = 80;

/// Result of one user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The planner proposed a structure.
    Planned { plan: String },
    /// A new fragment was appended to the page.
    Generated {
        fragment_id: String,
        fragment_name: String,
        message: String,
        approved_now: bool,
        renamed_ids: Vec<RenamedId>,
    },
    /// The builder answered with text only.
    Replied { message: String, approved_now: bool },
    /// The reply was empty or unusable; the fallback entry was appended.
    Unprocessable { message: String },
    /// The provider call failed; nothing but the transcript changed.
    Failed { error: String },
    /// The turn was cancelled before the provider answered.
    Cancelled,
}

/// One conversation over one project.
///
/// Owns the project for the duration of the session; the caller gets it back
/// with [`ChatSession::into_project`].
pub struct ChatSession {
    project: Project,
    state: ConversationState,
    provider: Arc<dyn AiProvider>,
    matcher: Arc<IntentMatcher>,
    notifier: Notifier,
    store: Option<ProjectStore>,
    model: String,
    timeout: Duration,
    save_error: Option<StoreError>,
}

impl ChatSession {
    pub fn new(mut project: Project, provider: Arc<dyn AiProvider>, notifier: Notifier) -> Self {
        if project.transcript.is_empty() {
            project.transcript.push(Message::assistant(GREETING));
        }
        let state = ConversationState::from_transcript(&project.transcript);
        Self {
            project,
            state,
            provider,
            matcher: Arc::new(IntentMatcher::default()),
            notifier,
            store: None,
            model: String::new(),
            timeout: Duration::from_secs(30),
            save_error: None,
        }
    }

    /// Persist the project through `store` after every turn.
    pub fn with_store(mut self, store: ProjectStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<IntentMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    /// Failure of the most recent save, if it did not reach the store.
    pub fn save_error(&self) -> Option<&StoreError> {
        self.save_error.as_ref()
    }

    pub fn take_save_error(&mut self) -> Option<StoreError> {
        self.save_error.take()
    }

    pub fn into_project(self) -> Project {
        self.project
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    /// Process one user message.
    ///
    /// Provider failures are absorbed into the returned outcome; only an
    /// empty message is an error. A failed save is recorded in
    /// [`ChatSession::save_error`] and announced as a warning.
    pub async fn send(
        &mut self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        let plan = self.matcher.decide(&self.state, text);
        tracing::info!(project = %self.project.id, ?plan, "chat turn");
        self.project.transcript.push(Message::user(text));

        let outcome = match plan {
            TurnPlan::Plan => self.plan_turn(cancel).await,
            TurnPlan::ApproveThenGenerate => self.generate_turn(true, cancel).await,
            TurnPlan::Generate => self.generate_turn(false, cancel).await,
        };

        if outcome == TurnOutcome::Cancelled {
            self.project.transcript.discard_last_user();
            tracing::info!(project = %self.project.id, "turn cancelled");
        } else {
            self.persist().await;
        }
        Ok(outcome)
    }

    async fn call(&self, system_prompt: &str, cancel: &CancellationToken) -> Result<AssistantReply, ProviderError> {
        let request = ChatRequest::new(system_prompt, self.project.transcript.messages(), &self.model);
        complete_with_timeout(self.provider.as_ref(), &request, self.timeout, cancel).await
    }

    async fn plan_turn(&mut self, cancel: &CancellationToken) -> TurnOutcome {
        let reply = match self.call(PLANNER_PROMPT, cancel).await {
            Ok(reply) => reply,
            Err(ProviderError::Cancelled) => return TurnOutcome::Cancelled,
            Err(e) => {
                self.notifier.error("Erro ao sugerir estrutura", e.to_string());
                return TurnOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        let plan = match reply {
            AssistantReply::Message { content } if !content.trim().is_empty() => content,
            AssistantReply::HtmlUpdate {
                explanation: Some(text),
                ..
            } if !text.trim().is_empty() => text,
            _ => PLAN_FALLBACK.to_string(),
        };
        self.project.transcript.push(Message::assistant(plan.clone()));
        self.project.transcript.push(Message::system(PLANNING_PROPOSED));
        self.state.proposed = true;
        TurnOutcome::Planned { plan }
    }

    async fn generate_turn(&mut self, approve: bool, cancel: &CancellationToken) -> TurnOutcome {
        let result = self.call(BUILDER_PROMPT, cancel).await;
        if matches!(result, Err(ProviderError::Cancelled)) {
            return TurnOutcome::Cancelled;
        }

        if approve {
            self.project.transcript.push(Message::system(PLANNING_APPROVED));
            self.state.approved = true;
        }

        let reply = match result {
            Ok(reply) => promote(reply),
            Err(e) => {
                tracing::warn!(project = %self.project.id, error = %e, "generation failed");
                self.project.transcript.push(Message::assistant_error(ERROR_ENTRY));
                self.notifier.error("Erro na comunicação com a IA", e.to_string());
                return TurnOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        match reply {
            AssistantReply::HtmlUpdate { html, explanation } if !html.trim().is_empty() => {
                let (html, renamed_ids) = uniquify_data_ids(&self.project.page, &html);
                if !renamed_ids.is_empty() {
                    tracing::warn!(count = renamed_ids.len(), "renamed colliding data-ids in new fragment");
                }
                let fragment_name = fragment_name(explanation.as_deref());
                let fragment_id = self
                    .project
                    .page
                    .push(Fragment::new(fragment_name.clone(), html))
                    .id
                    .clone();
                let message = explanation
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| UPDATE_DEFAULT.to_string());
                self.project.transcript.push(Message::assistant(message.clone()));
                self.notifier.success("Página atualizada");
                TurnOutcome::Generated {
                    fragment_id,
                    fragment_name,
                    message,
                    approved_now: approve,
                    renamed_ids,
                }
            }
            AssistantReply::Message { content } if !content.trim().is_empty() => {
                self.project.transcript.push(Message::assistant(content.clone()));
                TurnOutcome::Replied {
                    message: content,
                    approved_now: approve,
                }
            }
            _ => {
                self.project.transcript.push(Message::assistant(REPLY_FALLBACK));
                TurnOutcome::Unprocessable {
                    message: REPLY_FALLBACK.to_string(),
                }
            }
        }
    }

    async fn persist(&mut self) {
        self.save_error = None;
        let Some(store) = self.store.clone() else {
            return;
        };
        let dir = store.dir().to_path_buf();
        let mut project = self.project.clone();
        let saved = tokio::task::spawn_blocking(move || store.save(&mut project).map(|()| project))
            .await
            .unwrap_or_else(|e| {
                Err(StoreError::Io {
                    path: dir,
                    source: std::io::Error::other(e.to_string()),
                })
            });

        match saved {
            Ok(project) => self.project = project,
            Err(e) => {
                tracing::warn!(project = %self.project.id, error = %e, "chat turn not saved");
                self.notifier
                    .warning("Erro ao salvar histórico do chat.", e.to_string());
                self.save_error = Some(e);
            }
        }
    }
}

/// Display name for a generated fragment: the first prose line of the
/// explanation, or the default label. Code fences and markup are skipped.
fn fragment_name(explanation: Option<&str>) -> String {
    explanation
        .and_then(|e| {
            e.lines()
                .map(str::trim)
                .find(|l| !l.is_empty() && !l.starts_with("```") && !l.starts_with('<'))
        })
        .map(|line| truncate_chars(line, FRAGMENT_NAME_MAX).to_string())
        .unwrap_or_else(|| DEFAULT_FRAGMENT_NAME.to_string())
}
