//! Editor session: the client-side controller for one page.
//!
//! An [`EditorSession`] owns the editing state (body snapshot, annotations,
//! active annotation, loading flag, user-visible notices) and is the only
//! thing that mutates it. It talks to persistence through [`PageStore`] and
//! to fact-checking through [`FactChecker`], so it runs the same against the
//! SQLite store, a remote server via [`HttpPageStore`](crate::client::HttpPageStore),
//! or the in-memory store in tests.
//!
//! # Operations
//!
//! | Method | Effect |
//! |--------|--------|
//! | [`load`](EditorSession::load) | Replace body and annotations from the store |
//! | [`request_fact_check`](EditorSession::request_fact_check) | Ask the checker, append a `fact-check` annotation |
//! | [`add_comment`](EditorSession::add_comment) | Append a `general` annotation |
//! | [`edit`](EditorSession::edit) | Replace the body snapshot |
//! | [`save`](EditorSession::save) | Persist now (creates the page if no id is bound) |
//!
//! `edit`, `add_comment` and a successful fact-check all schedule an
//! autosave through the session's [`Debouncer`]. Called off a Tokio runtime
//! they cannot schedule one and push an error notice instead.
//!
//! # Concurrency
//!
//! State sits behind a `std::sync::Mutex` that is never held across an
//! `.await`, so a fact-check in flight does not block edits. Writes to the
//! store are serialized by an async write lock and always send the state
//! as of the moment the lock is taken.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use pagecheck_core::error::StoreError;
use pagecheck_core::factcheck::{FactCheckError, FactChecker};
use pagecheck_core::format::RichText;
use pagecheck_core::models::{
    now_millis, Annotation, AnnotationError, ContentError, DocumentBody, Page, PageContent,
};
use pagecheck_core::store::PageStore;

use crate::autosave::{Debouncer, Ticket};
use crate::config::EditorConfig;

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub autosave_interval: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave_interval: Duration::from_millis(1000),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            autosave_interval: config.autosave_interval(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient, user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("select some text first")]
    EmptySelection,

    #[error("no annotation with id {0}")]
    UnknownAnnotation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    FactCheck(#[from] FactCheckError),

    #[error(transparent)]
    Content(#[from] ContentError),

    #[error("fact-check produced an invalid annotation: {0}")]
    InvalidAnnotation(#[from] AnnotationError),
}

#[derive(Debug, Default)]
struct SessionState {
    page_id: Option<String>,
    body: DocumentBody,
    annotations: Vec<Annotation>,
    active_annotation_id: Option<String>,
    loading: bool,
    /// Bumped by every local mutation; a save clears `dirty` only if no
    /// mutation happened while it was in flight.
    revision: u64,
    saved_revision: u64,
    last_saved_at: Option<DateTime<Utc>>,
    last_annotation_ms: i64,
    notices: Vec<Notice>,
}

impl SessionState {
    fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.push(Notice {
            level,
            message: message.into(),
        });
    }

    /// Time-based id, bumped past the previous one when the clock has not
    /// moved.
    fn next_annotation_id(&mut self) -> String {
        let ms = Utc::now()
            .timestamp_millis()
            .max(self.last_annotation_ms + 1);
        self.last_annotation_ms = ms;
        ms.to_string()
    }

    fn append(&mut self, annotation: Annotation) {
        self.active_annotation_id = Some(annotation.id.clone());
        self.annotations.push(annotation);
        self.revision += 1;
    }
}

struct Inner {
    store: Arc<dyn PageStore>,
    checker: Arc<dyn FactChecker>,
    state: Mutex<SessionState>,
    write_lock: tokio::sync::Mutex<()>,
    autosave: Debouncer,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Writes the current state. Caller holds `write_lock`.
    async fn write_locked(&self) -> Result<Page, SessionError> {
        let (page_id, content, revision) = {
            let state = self.state();
            (
                state.page_id.clone(),
                PageContent::new(state.body.clone(), state.annotations.clone()),
                state.revision,
            )
        };
        let value = content.to_value()?;

        let page = match &page_id {
            Some(id) => self.store.update(id, Some(value)).await?,
            None => self.store.create(Some(value)).await?,
        };

        let mut state = self.state();
        if state.page_id.is_none() {
            tracing::info!(id = %page.id, "page created on first save");
            state.page_id = Some(page.id.clone());
        }
        state.saved_revision = state.saved_revision.max(revision);
        state.last_saved_at = Some(page.updated_at);
        Ok(page)
    }

    async fn save(&self) -> Result<Page, SessionError> {
        let _write = self.write_lock.lock().await;
        self.write_locked().await
    }

    /// Skips the write if a newer autosave or an explicit save superseded
    /// this one while it waited for the lock.
    async fn autosave(&self, ticket: Ticket) {
        let _write = self.write_lock.lock().await;
        if !ticket.is_current() {
            tracing::debug!("autosave superseded");
            return;
        }
        match self.write_locked().await {
            Ok(page) => tracing::debug!(id = %page.id, "autosaved"),
            Err(e) => {
                tracing::warn!(error = %e, "autosave failed");
                self.state()
                    .notify(NoticeLevel::Error, format!("Autosave failed: {}", e));
            }
        }
    }
}

/// Controller for one page. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct EditorSession {
    inner: Arc<Inner>,
}

impl EditorSession {
    /// A session with no page bound yet; the first save creates one.
    pub fn new(
        store: Arc<dyn PageStore>,
        checker: Arc<dyn FactChecker>,
        options: SessionOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                checker,
                state: Mutex::new(SessionState::default()),
                write_lock: tokio::sync::Mutex::new(()),
                autosave: Debouncer::new(options.autosave_interval),
            }),
        }
    }

    /// A session bound to `page_id`. Call [`load`](Self::load) to fetch it.
    pub fn for_page(
        page_id: impl Into<String>,
        store: Arc<dyn PageStore>,
        checker: Arc<dyn FactChecker>,
        options: SessionOptions,
    ) -> Self {
        let session = Self::new(store, checker, options);
        session.inner.state().page_id = Some(page_id.into());
        session
    }

    pub fn page_id(&self) -> Option<String> {
        self.inner.state().page_id.clone()
    }

    pub fn body(&self) -> DocumentBody {
        self.inner.state().body.clone()
    }

    /// Annotations in insertion order.
    pub fn annotations(&self) -> Vec<Annotation> {
        self.inner.state().annotations.clone()
    }

    pub fn active_annotation_id(&self) -> Option<String> {
        self.inner.state().active_annotation_id.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state().loading
    }

    /// `true` when local changes have not been persisted yet.
    pub fn is_dirty(&self) -> bool {
        let state = self.inner.state();
        state.revision > state.saved_revision
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.state().last_saved_at
    }

    pub fn autosave_pending(&self) -> bool {
        self.inner.autosave.is_pending()
    }

    /// The content a save would send right now.
    pub fn content(&self) -> PageContent {
        let state = self.inner.state();
        PageContent::new(state.body.clone(), state.annotations.clone())
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.inner.state().notices.clone()
    }

    /// Drains pending notices, oldest first.
    pub fn take_notices(&self) -> Vec<Notice> {
        std::mem::take(&mut self.inner.state().notices)
    }

    /// Fetches `id` and replaces the body and annotations with its content.
    ///
    /// On failure the previous state is kept and an error notice is pushed.
    pub async fn load(&self, id: &str) -> Result<(), SessionError> {
        self.inner.state().loading = true;
        let result = self.fetch(id).await;

        let mut state = self.inner.state();
        state.loading = false;
        match result {
            Ok((page, content)) => {
                self.inner.autosave.cancel();
                state.page_id = Some(page.id);
                state.body = content.body();
                state.annotations = content.annotations;
                state.active_annotation_id = None;
                state.revision += 1;
                state.saved_revision = state.revision;
                state.last_saved_at = Some(page.updated_at);
                state.notify(NoticeLevel::Info, "Content loaded");
                tracing::info!(id = %id, annotations = state.annotations.len(), "page loaded");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "page load failed");
                state.notify(NoticeLevel::Error, format!("Failed to load content: {}", e));
                Err(e)
            }
        }
    }

    async fn fetch(&self, id: &str) -> Result<(Page, PageContent), SessionError> {
        let page = self.inner.store.get(id).await?;
        let content = PageContent::from_value(&page.content)?;
        Ok((page, content))
    }

    /// Fact-checks `selected` and appends the verdict as the active
    /// annotation.
    ///
    /// Blank selections are rejected without calling the checker. A failed
    /// check leaves the annotation list untouched.
    pub async fn request_fact_check(&self, selected: &str) -> Result<Annotation, SessionError> {
        if selected.trim().is_empty() {
            self.inner.state().notify(
                NoticeLevel::Error,
                "Please select some text to fact-check",
            );
            return Err(SessionError::EmptySelection);
        }

        let checked = self.inner.checker.check(selected).await;
        let result = match checked {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(checker = self.inner.checker.name(), error = %e, "fact-check failed");
                self.inner
                    .state()
                    .notify(NoticeLevel::Error, "Failed to perform fact-check");
                return Err(e.into());
            }
        };

        let annotation = {
            let mut state = self.inner.state();
            let annotation = Annotation::fact_check(state.next_annotation_id(), &result, now_millis());
            if let Err(e) = annotation.validate() {
                state.notify(NoticeLevel::Error, "Failed to perform fact-check");
                return Err(e.into());
            }
            state.append(annotation.clone());
            state.notify(NoticeLevel::Info, "Fact-check completed");
            annotation
        };
        tracing::info!(
            id = %annotation.id,
            is_factual = result.is_factual,
            confidence = result.confidence,
            "fact-check annotation added"
        );
        self.schedule_autosave();
        Ok(annotation)
    }

    /// Appends a free-form comment on `selected` as the active annotation.
    pub fn add_comment(&self, selected: &str, comment: &str) -> Result<Annotation, SessionError> {
        if selected.trim().is_empty() {
            self.inner
                .state()
                .notify(NoticeLevel::Error, "Please select some text to comment on");
            return Err(SessionError::EmptySelection);
        }

        let annotation = {
            let mut state = self.inner.state();
            let annotation =
                Annotation::general(state.next_annotation_id(), selected, comment, now_millis());
            state.append(annotation.clone());
            annotation
        };
        self.schedule_autosave();
        Ok(annotation)
    }

    /// Marks an existing annotation as active (sidebar selection).
    pub fn set_active(&self, annotation_id: &str) -> Result<(), SessionError> {
        let mut state = self.inner.state();
        if !state.annotations.iter().any(|a| a.id == annotation_id) {
            return Err(SessionError::UnknownAnnotation(annotation_id.to_string()));
        }
        state.active_annotation_id = Some(annotation_id.to_string());
        Ok(())
    }

    /// Replaces the body snapshot and schedules an autosave.
    pub fn edit(&self, body: DocumentBody) {
        {
            let mut state = self.inner.state();
            state.body = body;
            state.revision += 1;
        }
        self.schedule_autosave();
    }

    /// [`edit`](Self::edit) with a snapshot of a rich-text surface.
    pub fn edit_rich_text(&self, doc: &RichText) {
        self.edit(doc.snapshot());
    }

    /// Persists the current state now, superseding any pending autosave.
    ///
    /// With no page bound the page is created and its id bound to the
    /// session. `is_loading` is `true` while the write is in flight. On
    /// failure local state is kept and an error notice is pushed.
    pub async fn save(&self) -> Result<Page, SessionError> {
        self.inner.autosave.cancel();
        self.inner.state().loading = true;
        let result = self.inner.save().await;
        self.inner.state().loading = false;
        match result {
            Ok(page) => {
                self.inner
                    .state()
                    .notify(NoticeLevel::Info, "Content saved");
                tracing::info!(id = %page.id, "page saved");
                Ok(page)
            }
            Err(e) => {
                tracing::warn!(error = %e, "save failed");
                self.inner
                    .state()
                    .notify(NoticeLevel::Error, format!("Failed to save content: {}", e));
                Err(e)
            }
        }
    }

    fn schedule_autosave(&self) {
        let inner = Arc::clone(&self.inner);
        let scheduled = self
            .inner
            .autosave
            .schedule(move |ticket| async move { inner.autosave(ticket).await });
        if !scheduled {
            self.inner.state().notify(
                NoticeLevel::Error,
                "Autosave unavailable, save manually to keep changes",
            );
        }
    }
}
