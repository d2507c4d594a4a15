//! Application context built once at startup and passed explicitly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::sync::OwnedMutexGuard;

use crate::chat::{ChatSession, IntentMatcher};
use crate::config::SitecraftConfig;
use crate::notify::Notifier;
use crate::provider::{AiProvider, build_provider};
use crate::store::{Project, ProjectStore};
use crate::video::VideoTools;

pub struct AppContext {
    pub config: SitecraftConfig,
    pub provider: Arc<dyn AiProvider>,
    pub store: ProjectStore,
    pub video: Arc<VideoTools>,
    pub notifier: Notifier,
    pub matcher: Arc<IntentMatcher>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

/// Exclusive turn on one project. The lock entry is dropped from the
/// context once no other request holds or waits for it.
pub struct ProjectGuard<'a> {
    ctx: &'a AppContext,
    id: String,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for ProjectGuard<'_> {
    fn drop(&mut self) {
        let mut locks = self.ctx.lock_table();
        // One reference in the table, one held by this guard
        if locks.get(&self.id).is_some_and(|lock| Arc::strong_count(lock) <= 2) {
            locks.remove(&self.id);
        }
    }
}

impl AppContext {
    pub fn new(config: SitecraftConfig) -> Result<Self> {
        let provider =
            build_provider(&config.toml.provider).context("Failed to build AI provider client")?;
        Ok(Self::with_provider(config, provider))
    }

    /// Context around an already built provider.
    pub fn with_provider(config: SitecraftConfig, provider: Arc<dyn AiProvider>) -> Self {
        Self {
            store: ProjectStore::new(config.projects_dir()),
            video: Arc::new(VideoTools::from_config(&config)),
            matcher: Arc::new(IntentMatcher::from_config(&config.toml.chat)),
            notifier: Notifier::default(),
            provider,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// A chat session over `project` wired to this context.
    pub fn session(&self, project: Project) -> ChatSession {
        let provider = &self.config.toml.provider;
        ChatSession::new(project, self.provider.clone(), self.notifier.clone())
            .with_store(self.store.clone())
            .with_matcher(self.matcher.clone())
            .with_model(provider.model.clone())
            .with_timeout(provider.timeout())
    }

    /// Wait for exclusive access to project `id`, serializing turns on the
    /// same project. Callers check that the project exists first.
    pub async fn lock_project(&self, id: &str) -> ProjectGuard<'_> {
        let lock = self.lock_table().entry(id.to_string()).or_default().clone();
        ProjectGuard {
            ctx: self,
            id: id.to_string(),
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of projects with a live lock entry.
    pub fn locked_projects(&self) -> usize {
        self.lock_table().len()
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<tokio::sync::Mutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::mock::ScriptedProvider;
    use sitecraft_common::AssistantReply;
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    fn context(dir: &std::path::Path) -> AppContext {
        let config = SitecraftConfig::new(dir.to_path_buf()).unwrap();
        AppContext::with_provider(config, Arc::new(ScriptedProvider::new(vec![])))
    }

    #[tokio::test]
    async fn same_project_turns_are_serialized() {
        let dir = tempdir().unwrap();
        let ctx = Arc::new(context(dir.path()));

        let first = ctx.lock_project("p1").await;
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move {
                let _turn = ctx.lock_project("p1").await;
            })
        };
        // Other projects are not blocked
        drop(ctx.lock_project("p2").await);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(first);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn lock_entries_are_released_after_the_turn() {
        let dir = tempdir().unwrap();
        let ctx = context(dir.path());
        for i in 0..10 {
            let _turn = ctx.lock_project(&format!("p{}", i)).await;
            assert_eq!(ctx.locked_projects(), 1);
        }
        assert_eq!(ctx.locked_projects(), 0);
    }

    #[tokio::test]
    async fn session_persists_into_context_store() {
        let dir = tempdir().unwrap();
        let config = SitecraftConfig::new(dir.path().to_path_buf()).unwrap();
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(AssistantReply::message("Plano"))]));
        let ctx = AppContext::with_provider(config, provider);

        let project = ctx.store.create("Academia").unwrap();
        let id = project.id.clone();
        let mut session = ctx.session(project);
        session.send("Quero uma landing page", &CancellationToken::new()).await.unwrap();

        assert_eq!(ctx.store.load(&id).unwrap().revision, 2);
    }
}
