//! Application state: the roadmap being viewed and the user actions on it.
//!
//! Every action that changes the current roadmap replaces it with a new value
//! and pushes that value into the history store. Values handed out earlier
//! (including the ones stored in history) are never modified.

use std::sync::Arc;

use crate::history::HistoryStore;
use crate::model::{Chapter, ChapterToggleMode, ResourceFlag, Roadmap};
use crate::provider::{ProviderError, ProviderKind, ProviderSet, RoadmapProvider};

pub const EMPTY_TOPIC_MESSAGE: &str = "Please enter a topic to generate a roadmap.";
pub const NO_ROADMAP_MESSAGE: &str = "No roadmap was produced for this topic. Try another topic.";
pub const GENERIC_ERROR_MESSAGE: &str = "An unexpected error occurred. Please try again.";

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("{}", EMPTY_TOPIC_MESSAGE)]
    EmptyTopic,

    #[error("{}", NO_ROADMAP_MESSAGE)]
    NoRoadmap,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// A newer request (or a reset) replaced the one this outcome belongs to.
    #[error("generation request {request_id} was superseded")]
    Superseded { request_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Generating { request_id: u64 },
    Viewing,
}

/// A started generation request. Running it does not borrow the controller.
pub struct GenerationTicket {
    request_id: u64,
    topic: String,
    provider: Arc<dyn RoadmapProvider>,
}

impl GenerationTicket {
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub async fn run(self) -> GenerationOutcome {
        tracing::debug!(
            request_id = self.request_id,
            provider = %self.provider.kind(),
            "calling provider"
        );
        let result = self.provider.generate_roadmap(&self.topic).await;
        GenerationOutcome {
            request_id: self.request_id,
            result,
        }
    }
}

pub struct GenerationOutcome {
    request_id: u64,
    result: Result<Roadmap, ProviderError>,
}

pub struct Controller<'a> {
    providers: ProviderSet,
    history: &'a mut HistoryStore,
    toggle_mode: ChapterToggleMode,

    current_topic: String,
    selected_provider: ProviderKind,
    current_roadmap: Option<Roadmap>,
    last_error: Option<String>,
    selected_chapter_id: Option<String>,

    phase: Phase,
    last_request_id: u64,
}

impl<'a> Controller<'a> {
    pub fn new(
        providers: ProviderSet,
        history: &'a mut HistoryStore,
        toggle_mode: ChapterToggleMode,
    ) -> Self {
        Self {
            providers,
            history,
            toggle_mode,
            current_topic: String::new(),
            selected_provider: ProviderKind::default(),
            current_roadmap: None,
            last_error: None,
            selected_chapter_id: None,
            phase: Phase::Idle,
            last_request_id: 0,
        }
    }

    pub fn current_topic(&self) -> &str {
        &self.current_topic
    }

    pub fn set_topic(&mut self, topic: impl Into<String>) {
        self.current_topic = topic.into();
    }

    pub fn selected_provider(&self) -> ProviderKind {
        self.selected_provider
    }

    pub fn current_roadmap(&self) -> Option<&Roadmap> {
        self.current_roadmap.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_chapter_id(&self) -> Option<&str> {
        self.selected_chapter_id.as_deref()
    }

    /// `None` when nothing is selected or the selected id is not in the roadmap.
    pub fn selected_chapter(&self) -> Option<&Chapter> {
        let id = self.selected_chapter_id.as_deref()?;
        self.current_roadmap.as_ref()?.chapter(id)
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn history(&self) -> &HistoryStore {
        &*self.history
    }

    pub async fn generate(
        &mut self,
        topic: &str,
        provider: ProviderKind,
    ) -> Result<(), GenerateError> {
        let ticket = self.begin_generate(topic, provider)?;
        let outcome = ticket.run().await;
        self.complete_generate(outcome).await
    }

    /// Validates the topic and moves to `Generating`. An empty topic sets the
    /// error and never reaches a provider.
    pub fn begin_generate(
        &mut self,
        topic: &str,
        provider: ProviderKind,
    ) -> Result<GenerationTicket, GenerateError> {
        self.current_topic = topic.to_owned();
        self.selected_provider = provider;

        let topic = topic.trim();
        if topic.is_empty() {
            self.last_error = Some(GenerateError::EmptyTopic.to_string());
            return Err(GenerateError::EmptyTopic);
        }

        self.last_error = None;
        self.current_roadmap = None;
        self.selected_chapter_id = None;
        self.last_request_id += 1;
        self.phase = Phase::Generating {
            request_id: self.last_request_id,
        };

        tracing::debug!(
            request_id = self.last_request_id,
            %provider,
            topic,
            "generation started"
        );
        Ok(GenerationTicket {
            request_id: self.last_request_id,
            topic: topic.to_owned(),
            provider: self.providers.get(provider),
        })
    }

    /// Applies an outcome if it belongs to the request still in flight.
    pub async fn complete_generate(
        &mut self,
        outcome: GenerationOutcome,
    ) -> Result<(), GenerateError> {
        let GenerationOutcome { request_id, result } = outcome;
        if self.phase != (Phase::Generating { request_id }) {
            tracing::info!(
                request_id,
                latest = self.last_request_id,
                "dropping stale generation result"
            );
            return Err(GenerateError::Superseded { request_id });
        }

        match result {
            Ok(roadmap) if !roadmap.chapters.is_empty() => {
                self.selected_chapter_id = roadmap.first_chapter_id().map(str::to_owned);
                self.push_history(&roadmap).await;
                tracing::info!(
                    topic = %roadmap.topic,
                    chapters = roadmap.chapters.len(),
                    "roadmap generated"
                );
                self.current_roadmap = Some(roadmap);
                self.last_error = None;
                self.phase = Phase::Viewing;
                Ok(())
            }
            Ok(roadmap) => {
                tracing::warn!(topic = %roadmap.topic, "provider returned no chapters");
                self.fail(GenerateError::NoRoadmap)
            }
            Err(err) => self.fail(GenerateError::Provider(err)),
        }
    }

    fn fail(&mut self, err: GenerateError) -> Result<(), GenerateError> {
        let message = err.to_string();
        self.last_error = Some(if message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_owned()
        } else {
            message
        });
        self.current_roadmap = None;
        self.phase = Phase::Idle;
        Err(err)
    }

    /// Returns `false` when there is no roadmap or no chapter with that id.
    pub async fn toggle_chapter_complete(&mut self, chapter_id: &str) -> bool {
        let Some(current) = &self.current_roadmap else {
            return false;
        };
        let Some(next) = current.with_chapter_toggled(chapter_id, self.toggle_mode) else {
            tracing::debug!(chapter_id, "toggle chapter: unknown chapter");
            return false;
        };
        self.replace_current(next).await;
        true
    }

    pub async fn toggle_resource_complete(
        &mut self,
        chapter_id: &str,
        resource_url: &str,
    ) -> bool {
        self.toggle_resource(chapter_id, resource_url, ResourceFlag::Completed)
            .await
    }

    pub async fn toggle_resource_helpful(
        &mut self,
        chapter_id: &str,
        resource_url: &str,
    ) -> bool {
        self.toggle_resource(chapter_id, resource_url, ResourceFlag::Helpful)
            .await
    }

    async fn toggle_resource(
        &mut self,
        chapter_id: &str,
        resource_url: &str,
        flag: ResourceFlag,
    ) -> bool {
        let Some(current) = &self.current_roadmap else {
            return false;
        };
        let Some(next) = current.with_resource_toggled(chapter_id, resource_url, flag) else {
            tracing::debug!(chapter_id, resource_url, ?flag, "toggle resource: unknown target");
            return false;
        };
        self.replace_current(next).await;
        true
    }

    /// Back to idle. History is kept; an in-flight request becomes stale.
    pub fn reset(&mut self) {
        self.current_topic.clear();
        self.current_roadmap = None;
        self.last_error = None;
        self.selected_chapter_id = None;
        self.phase = Phase::Idle;
    }

    /// Views a stored snapshot without re-inserting it into history.
    pub fn load_from_history(&mut self, roadmap: Roadmap) {
        self.selected_chapter_id = roadmap.first_chapter_id().map(str::to_owned);
        self.current_roadmap = Some(roadmap);
        self.last_error = None;
        self.phase = Phase::Viewing;
    }

    /// Loads the history entry for `topic` (case-insensitive). Returns `false`
    /// if there is none.
    pub fn load_topic_from_history(&mut self, topic: &str) -> bool {
        let Some(roadmap) = self.history.find(topic).cloned() else {
            return false;
        };
        self.load_from_history(roadmap);
        true
    }

    pub fn select_chapter(&mut self, chapter_id: impl Into<String>) {
        self.selected_chapter_id = Some(chapter_id.into());
    }

    async fn replace_current(&mut self, next: Roadmap) {
        self.push_history(&next).await;
        self.current_roadmap = Some(next);
    }

    async fn push_history(&mut self, roadmap: &Roadmap) {
        if let Err(err) = self.history.add_roadmap_to_history(roadmap.clone()).await {
            tracing::error!(topic = %roadmap.topic, error = %err, "save history failed");
        }
    }
}
