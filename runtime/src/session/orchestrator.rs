// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! The session actor and its handle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::details::{self, DetailRequest};
use super::state::{AuthState, DetailFlow, PageFlow};
use super::{login, page, Completion, FlowContext};
use crate::catalog::{
    CatalogCache, CatalogFilters, CatalogItem, CatalogPage, InstallStatus, ItemDetails,
};
use crate::config::ScoutConfig;
use crate::error::{AuthFailure, ScoutError, ScoutResult};
use crate::events::{EventBus, Operation, ScoutEvent};
use crate::extraction::{BrowseResult, Extractors};
use crate::renderer::RenderContext;
use crate::trust::{CredentialProvider, EnvCredentials};

enum Command {
    EnsureAuthenticated {
        account_index: u32,
    },
    LoadPage {
        filters: CatalogFilters,
        use_cache: bool,
    },
    LoadDetails {
        item_id: String,
        use_cache: bool,
    },
    CachedItem {
        id: String,
        reply: oneshot::Sender<Option<CatalogItem>>,
    },
    CurrentPage {
        reply: oneshot::Sender<Option<CatalogPage>>,
    },
    AuthState {
        reply: oneshot::Sender<AuthState>,
    },
    IsLoading {
        reply: oneshot::Sender<bool>,
    },
    ClearCache,
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to a running catalog session.
///
/// Cloning yields another handle onto the same actor. Flow entry points
/// (`ensure_authenticated`, `load_page`, `load_details`) return at once;
/// their results arrive on the [`EventBus`].
#[derive(Clone)]
pub struct CatalogSession {
    tx: mpsc::UnboundedSender<Command>,
    events: EventBus,
}

impl CatalogSession {
    pub fn builder(browser: Box<dyn RenderContext>) -> CatalogSessionBuilder {
        CatalogSessionBuilder::new(browser)
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Sign in with the credentials of `account_index`.
    ///
    /// A no-op while an attempt is underway. When already signed in,
    /// `LoginSucceeded` is emitted again.
    pub fn ensure_authenticated(&self, account_index: u32) {
        self.post(Command::EnsureAuthenticated { account_index });
    }

    /// Load one catalog page. Ignored while another page load is in flight.
    pub fn load_page(&self, filters: CatalogFilters, use_cache: bool) {
        self.post(Command::LoadPage { filters, use_cache });
    }

    /// Load one item's detail record, superseding any detail load in flight.
    pub fn load_details(&self, item_id: impl Into<String>, use_cache: bool) {
        self.post(Command::LoadDetails {
            item_id: item_id.into(),
            use_cache,
        });
    }

    pub fn clear_cache(&self) {
        self.post(Command::ClearCache);
    }

    /// The cached record for `id`, if any. Does not promote it.
    pub async fn cached_item(&self, id: impl Into<String>) -> Option<CatalogItem> {
        let id = id.into();
        self.query(|reply| Command::CachedItem { id, reply })
            .await
            .flatten()
    }

    /// The most recently loaded page.
    pub async fn current_page(&self) -> Option<CatalogPage> {
        self.query(|reply| Command::CurrentPage { reply })
            .await
            .flatten()
    }

    pub async fn auth_state(&self) -> AuthState {
        self.query(|reply| Command::AuthState { reply })
            .await
            .unwrap_or_default()
    }

    /// A page or detail load is in flight.
    pub async fn is_loading(&self) -> bool {
        self.query(|reply| Command::IsLoading { reply })
            .await
            .unwrap_or(false)
    }

    /// Stop the actor, abort running flows and close the browser.
    pub async fn shutdown(&self) {
        if self.query(|reply| Command::Shutdown { reply }).await.is_none() {
            debug!("catalog session already stopped");
        }
    }

    fn post(&self, command: Command) {
        if self.tx.send(command).is_err() {
            warn!("catalog session stopped; command dropped");
        }
    }

    async fn query<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Command) -> Option<T> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(build(reply)).ok()?;
        rx.await.ok()
    }
}

/// Configures and spawns a [`CatalogSession`].
pub struct CatalogSessionBuilder {
    browser: Box<dyn RenderContext>,
    config: ScoutConfig,
    credentials: Option<Arc<dyn CredentialProvider>>,
    install_status: Option<Arc<dyn InstallStatus>>,
    extractors: Extractors,
    events: Option<EventBus>,
}

impl CatalogSessionBuilder {
    pub fn new(browser: Box<dyn RenderContext>) -> Self {
        Self {
            browser,
            config: ScoutConfig::default(),
            credentials: None,
            install_status: None,
            extractors: Extractors::default(),
            events: None,
        }
    }

    pub fn config(mut self, config: ScoutConfig) -> Self {
        self.config = config;
        self
    }

    /// Defaults to [`EnvCredentials`].
    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    pub fn install_status(mut self, status: Arc<dyn InstallStatus>) -> Self {
        self.install_status = Some(status);
        self
    }

    pub fn extractors(mut self, extractors: Extractors) -> Self {
        self.extractors = extractors;
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Spawn the actor on the current tokio runtime.
    pub fn spawn(self) -> CatalogSession {
        let events = self.events.unwrap_or_default();
        let (tx, commands) = mpsc::unbounded_channel();
        let (completions_tx, completions) = mpsc::unbounded_channel();

        let actor = Actor {
            flow: FlowContext {
                browser: Arc::new(Mutex::new(self.browser)),
                endpoints: self.config.endpoints,
                timings: self.config.timings,
                completions: completions_tx,
            },
            events: events.clone(),
            extractors: self.extractors,
            credentials: self
                .credentials
                .unwrap_or_else(|| Arc::new(EnvCredentials) as Arc<dyn CredentialProvider>),
            install_status: self.install_status,
            cache: CatalogCache::new(self.config.catalog_cache),
            auth: AuthState::Unauthenticated,
            page_flow: PageFlow::Idle,
            detail_flow: DetailFlow::Idle,
            current_page: None,
            detail_request: Arc::new(AtomicU64::new(0)),
            tasks: JoinSet::new(),
        };
        tokio::spawn(actor.run(commands, completions));

        CatalogSession { tx, events }
    }
}

struct Actor {
    flow: FlowContext,
    events: EventBus,
    extractors: Extractors,
    credentials: Arc<dyn CredentialProvider>,
    install_status: Option<Arc<dyn InstallStatus>>,
    cache: CatalogCache,
    auth: AuthState,
    page_flow: PageFlow,
    detail_flow: DetailFlow,
    current_page: Option<CatalogPage>,
    detail_request: Arc<AtomicU64>,
    tasks: JoinSet<()>,
}

impl Actor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        info!("catalog session started");
        let mut shutdown_reply = None;

        loop {
            tokio::select! {
                biased;
                command = commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        shutdown_reply = Some(reply);
                        break;
                    }
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(completion) = completions.recv() => self.handle_completion(completion),
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            warn!("session flow panicked: {e}");
                        }
                    }
                }
            }
        }

        self.finish().await;
        if let Some(reply) = shutdown_reply {
            let _ = reply.send(());
        }
    }

    async fn finish(self) {
        let Actor {
            flow, mut tasks, ..
        } = self;

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        match Arc::try_unwrap(flow.browser) {
            Ok(browser) => {
                if let Err(e) = browser.into_inner().close().await {
                    warn!("failed to close browser context: {e:#}");
                }
            }
            Err(_) => debug!("browser context still shared; leaving it open"),
        }
        info!("catalog session stopped");
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::EnsureAuthenticated { account_index } => self.ensure_authenticated(account_index),
            Command::LoadPage { filters, use_cache } => self.load_page(filters, use_cache),
            Command::LoadDetails { item_id, use_cache } => self.load_details(item_id, use_cache),
            Command::CachedItem { id, reply } => {
                let _ = reply.send(self.cache.peek_item(&id).cloned());
            }
            Command::CurrentPage { reply } => {
                let _ = reply.send(self.current_page.clone());
            }
            Command::AuthState { reply } => {
                let _ = reply.send(self.auth.clone());
            }
            Command::IsLoading { reply } => {
                let _ = reply.send(self.page_flow.is_loading() || self.detail_flow.is_fetching());
            }
            Command::ClearCache => {
                self.cache.clear();
                info!("catalog cache cleared");
            }
            Command::Shutdown { .. } => {}
        }
    }

    fn handle_completion(&mut self, completion: Completion) {
        match completion {
            Completion::AuthProgress(state) => {
                if self.auth.is_in_progress() {
                    self.set_auth(state);
                }
            }
            Completion::AuthFinished(result) => self.finish_auth(result),
            Completion::PageFinished { query_url, result } => self.finish_page(query_url, result),
            Completion::DetailsFinished {
                item_id,
                request_id,
                result,
            } => self.finish_details(item_id, request_id, result),
        }
    }

    // ── Auth ────────────────────────────────────────────────────────────

    fn ensure_authenticated(&mut self, account_index: u32) {
        if self.auth.is_authenticated() {
            self.events.emit(ScoutEvent::LoginSucceeded);
            return;
        }
        if self.auth.is_in_progress() {
            debug!("sign-in already in progress; ignoring");
            return;
        }

        self.set_auth(AuthState::CheckingSession);
        let flow = self.flow.clone();
        let provider = Arc::clone(&self.credentials);
        self.tasks.spawn(async move {
            let result = login::authenticate(&flow, provider.as_ref(), account_index).await;
            flow.complete(Completion::AuthFinished(result));
        });
    }

    fn finish_auth(&mut self, result: Result<(), AuthFailure>) {
        if !self.auth.is_in_progress() {
            return;
        }
        match result {
            Ok(()) => {
                self.set_auth(AuthState::Authenticated);
                self.events.emit(ScoutEvent::LoginSucceeded);
            }
            Err(failure) => {
                warn!("sign-in failed: {failure}");
                self.set_auth(AuthState::Failed(failure.clone()));
                self.events
                    .emit(ScoutEvent::failed(Operation::Authenticate, &failure.into()));
            }
        }
    }

    fn set_auth(&mut self, state: AuthState) {
        if self.auth == state {
            return;
        }
        debug!("auth state {:?} -> {:?}", self.auth, state);
        self.auth = state.clone();
        self.events.emit(ScoutEvent::AuthStateChanged { state });
    }

    // ── Pages ───────────────────────────────────────────────────────────

    fn load_page(&mut self, filters: CatalogFilters, use_cache: bool) {
        if self.page_flow.is_loading() {
            debug!("page load already in progress; ignoring");
            return;
        }

        let query_url = filters.query_url(&self.flow.endpoints);
        if use_cache {
            if let Some(page) = self.cache.get_page(&query_url).cloned() {
                self.current_page = Some(page.clone());
                let page = self.annotate_page(page);
                self.events.emit(ScoutEvent::PageLoaded {
                    page,
                    from_cache: true,
                });
                return;
            }
        }

        info!("loading catalog page: {query_url}");
        self.page_flow = PageFlow::Loading {
            query_url: query_url.clone(),
            filters,
        };
        self.events.emit(ScoutEvent::PageLoadingStarted {
            query_url: query_url.clone(),
        });

        let flow = self.flow.clone();
        let extractors = self.extractors.clone();
        self.tasks.spawn(async move {
            let result = page::load(&flow, &extractors, &query_url).await;
            flow.complete(Completion::PageFinished { query_url, result });
        });
    }

    fn finish_page(&mut self, query_url: String, result: ScoutResult<BrowseResult>) {
        let Some(filters) = self.page_flow.matching(&query_url).cloned() else {
            debug!("discarding stale page result for {query_url}");
            return;
        };
        self.page_flow = PageFlow::Idle;

        let browse = match result {
            Ok(browse) => browse,
            Err(e) => {
                warn!("page load failed: {e}");
                self.events.emit(ScoutEvent::failed(Operation::LoadPage, &e));
                return;
            }
        };

        for item in &browse.items {
            self.cache.merge_summary(item);
        }
        let page = CatalogPage {
            items: browse.items,
            current_page: browse.current_page,
            total_pages: browse.total_pages,
            total_items: browse.total_items,
            filters,
        };
        info!(
            "catalog page {}/{} loaded ({} items of {})",
            page.current_page,
            page.total_pages,
            page.items.len(),
            page.total_items
        );

        self.cache.set_page(query_url, page.clone());
        self.current_page = Some(page.clone());
        let page = self.annotate_page(page);
        self.events.emit(ScoutEvent::PageLoaded {
            page,
            from_cache: false,
        });
    }

    // ── Details ─────────────────────────────────────────────────────────

    fn load_details(&mut self, item_id: String, use_cache: bool) {
        if use_cache {
            let cached = self
                .cache
                .get_item(&item_id)
                .filter(|item| item.has_details())
                .cloned();
            if let Some(item) = cached {
                debug!("detail cache hit: {item_id}");
                let item = self.annotate_item(item);
                self.events.emit(ScoutEvent::DetailsLoaded {
                    item,
                    from_cache: true,
                });
                return;
            }
        }

        let request_id = self.detail_request.fetch_add(1, Ordering::SeqCst) + 1;
        if let DetailFlow::Fetching { item_id: previous, .. } = &self.detail_flow {
            debug!("detail request for {previous} superseded by {item_id}");
        }
        self.detail_flow = DetailFlow::Fetching {
            item_id: item_id.clone(),
            request_id,
        };
        self.events.emit(ScoutEvent::DetailsLoadingStarted {
            item_id: item_id.clone(),
            request_id,
        });

        let request = DetailRequest {
            item_id,
            request_id,
            current: Arc::clone(&self.detail_request),
            page_idle: !self.page_flow.is_loading(),
        };
        let flow = self.flow.clone();
        let extractors = self.extractors.clone();
        self.tasks.spawn(async move {
            let result = details::fetch(&flow, &extractors, &request).await;
            flow.complete(Completion::DetailsFinished {
                item_id: request.item_id,
                request_id: request.request_id,
                result,
            });
        });
    }

    fn finish_details(
        &mut self,
        item_id: String,
        request_id: u64,
        result: ScoutResult<Option<ItemDetails>>,
    ) {
        if !self.detail_flow.is_current(request_id) {
            debug!("discarding stale detail result {request_id} for {item_id}");
            return;
        }
        self.detail_flow = DetailFlow::Idle;

        match result {
            Ok(Some(details)) => {
                let item =
                    CatalogItem::with_details(&item_id, details, self.cache.peek_item(&item_id));
                self.cache.set_item(item.clone());
                info!("details loaded for {item_id}");
                let item = self.annotate_item(item);
                self.events.emit(ScoutEvent::DetailsLoaded {
                    item,
                    from_cache: false,
                });
            }
            Ok(None) => debug!("detail request {request_id} was cancelled"),
            Err(e) => self.fail_details(&item_id, e),
        }
    }

    fn fail_details(&self, item_id: &str, error: ScoutError) {
        warn!("details load failed for {item_id}: {error}");
        self.events
            .emit(ScoutEvent::failed(Operation::LoadDetails, &error));
    }

    // ── Annotation ──────────────────────────────────────────────────────

    fn annotate_page(&self, mut page: CatalogPage) -> CatalogPage {
        if let Some(status) = &self.install_status {
            for item in &mut page.items {
                item.annotate(status.as_ref());
            }
        }
        page
    }

    fn annotate_item(&self, mut item: CatalogItem) -> CatalogItem {
        if let Some(status) = &self.install_status {
            item.annotate(status.as_ref());
        }
        item
    }
}
