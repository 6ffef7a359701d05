//! Page data loading.
//!
//! # Responsibilities
//! - Run a matched route's optional data and metadata callbacks
//! - Give loaders a dispatch handle bound to the state tree and the
//!   external service client
//! - Track in-flight fetches so the renderer can refuse to ship a page
//!   frozen mid-load
//!
//! # Design Decisions
//! - Concurrent fetches join fail-fast: the first rejection wins, errors
//!   are not aggregated
//! - `mark_not_found()` steers the outcome without an error and
//!   short-circuits metadata resolution
//! - An explicit redirect raised during loading outranks NotFound
//! - Metadata runs after data commits, so it may read fetched values

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{try_join_all, BoxFuture};
use serde_json::Value;

use crate::error::{RenderError, ServiceError};
use crate::routing::{RouteMatch, RouteParams};
use crate::state::StateTree;

/// External collaborator invoked for data fetches (CRUD/business
/// services, generated API client).
pub trait ServiceClient: Send + Sync {
    fn fetch(
        &self,
        resource: String,
        params: RouteParams,
    ) -> BoxFuture<'static, Result<Value, ServiceError>>;
}

/// One fetch a data loader wants performed and stored.
#[derive(Debug, Clone)]
pub struct FetchSpec {
    /// State path the fetched value lands at; doubles as the tracked
    /// operation id.
    pub state_path: String,
    pub resource: String,
}

impl FetchSpec {
    pub fn new(state_path: impl Into<String>, resource: impl Into<String>) -> Self {
        Self {
            state_path: state_path.into(),
            resource: resource.into(),
        }
    }
}

/// Dispatch handle bound to the request's state tree and the external
/// service client.
#[derive(Clone)]
pub struct Dispatch {
    state: Arc<Mutex<StateTree>>,
    services: Arc<dyn ServiceClient>,
}

impl Dispatch {
    pub fn new(state: Arc<Mutex<StateTree>>, services: Arc<dyn ServiceClient>) -> Self {
        Self { state, services }
    }

    fn locked(&self) -> MutexGuard<'_, StateTree> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read a committed value out of the state tree.
    pub fn get(&self, path: &str) -> Option<Value> {
        self.locked().get(path).cloned()
    }

    /// Queue a mutation.
    pub fn set(&self, path: &str, value: Value) {
        self.locked().set(path, value);
    }

    /// Apply queued mutations.
    pub fn commit(&self) {
        self.locked().commit();
    }

    /// Clone of the committed tree.
    pub fn snapshot(&self) -> Value {
        self.locked().snapshot()
    }

    /// Record the start of manually tracked background work. Work tracked
    /// here must be finished before the renderer will return Success.
    pub fn track_start(&self, id: &str) {
        self.locked().track_start(id);
    }

    /// Record completion of manually tracked background work.
    pub fn track_finish(&self, id: &str) {
        self.locked().track_finish(id);
    }

    /// Ids of tracked operations still in flight.
    pub fn pending_operations(&self) -> Vec<String> {
        self.locked().pending_operations()
    }

    /// Run all fetches concurrently, failing fast on the first rejection,
    /// then store the results and commit.
    ///
    /// Each fetch is tracked under `$pending`; markers are only cleared on
    /// success. A failed join leaves them in place — the error outcome
    /// never reaches the pending check.
    pub async fn fetch_all(
        &self,
        specs: Vec<FetchSpec>,
        params: &RouteParams,
    ) -> Result<(), RenderError> {
        {
            let mut tree = self.locked();
            for spec in &specs {
                tree.track_start(&spec.state_path);
            }
        }

        let futures: Vec<_> = specs
            .iter()
            .map(|spec| self.services.fetch(spec.resource.clone(), params.clone()))
            .collect();
        let values = try_join_all(futures).await?;

        let mut tree = self.locked();
        for (spec, value) in specs.iter().zip(values) {
            tree.set(&spec.state_path, value);
            tree.track_finish(&spec.state_path);
        }
        tree.commit();
        Ok(())
    }

    /// Single-fetch convenience over [`Dispatch::fetch_all`].
    pub async fn fetch_into(
        &self,
        state_path: &str,
        resource: &str,
        params: &RouteParams,
    ) -> Result<(), RenderError> {
        self.fetch_all(vec![FetchSpec::new(state_path, resource)], params)
            .await
    }
}

/// What a data loader receives: the dispatch handle, extracted params,
/// and the outcome controls.
#[derive(Clone)]
pub struct LoadContext {
    pub dispatch: Dispatch,
    pub params: RouteParams,
    not_found: Arc<AtomicBool>,
    redirect: Arc<Mutex<Option<String>>>,
}

impl LoadContext {
    pub fn new(dispatch: Dispatch, params: RouteParams) -> Self {
        Self {
            dispatch,
            params,
            not_found: Arc::new(AtomicBool::new(false)),
            redirect: Arc::new(Mutex::new(None)),
        }
    }

    /// Steer the outcome to NotFound without raising an error.
    pub fn mark_not_found(&self) {
        self.not_found.store(true, Ordering::SeqCst);
    }

    pub fn is_not_found(&self) -> bool {
        self.not_found.load(Ordering::SeqCst)
    }

    /// Raise an explicit redirect. Outranks NotFound.
    pub fn redirect_to(&self, url: impl Into<String>) {
        *self
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(url.into());
    }

    pub fn redirect(&self) -> Option<String> {
        self.redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// A route's data callback.
pub trait DataLoader: Send + Sync {
    fn load(&self, ctx: LoadContext) -> BoxFuture<'static, Result<(), RenderError>>;
}

/// Wrap an async closure as a data loader.
pub fn data_loader<F, Fut>(f: F) -> Arc<dyn DataLoader>
where
    F: Fn(LoadContext) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<(), RenderError>> + Send + 'static,
{
    struct FnLoader<F>(F);

    impl<F, Fut> DataLoader for FnLoader<F>
    where
        F: Fn(LoadContext) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<(), RenderError>> + Send + 'static,
    {
        fn load(&self, ctx: LoadContext) -> BoxFuture<'static, Result<(), RenderError>> {
            Box::pin((self.0)(ctx))
        }
    }

    Arc::new(FnLoader(f))
}

/// A route's metadata callback. Runs after data resolves and receives the
/// committed state snapshot.
pub trait MetadataLoader: Send + Sync {
    fn load(
        &self,
        state: Value,
        params: RouteParams,
    ) -> BoxFuture<'static, Result<Value, RenderError>>;
}

/// Wrap an async closure as a metadata loader.
pub fn metadata_loader<F, Fut>(f: F) -> Arc<dyn MetadataLoader>
where
    F: Fn(Value, RouteParams) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = Result<Value, RenderError>> + Send + 'static,
{
    struct FnLoader<F>(F);

    impl<F, Fut> MetadataLoader for FnLoader<F>
    where
        F: Fn(Value, RouteParams) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Value, RenderError>> + Send + 'static,
    {
        fn load(
            &self,
            state: Value,
            params: RouteParams,
        ) -> BoxFuture<'static, Result<Value, RenderError>> {
            Box::pin((self.0)(state, params))
        }
    }

    Arc::new(FnLoader(f))
}

/// Non-error outcomes of the loading phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Loaded,
    NotFound,
    Redirect(String),
}

/// Run the matched route's loaders. State path `page/metadata` receives
/// the metadata loader's value.
pub async fn load_page(route: &RouteMatch, dispatch: &Dispatch) -> Result<PageOutcome, RenderError> {
    let ctx = LoadContext::new(dispatch.clone(), route.params.clone());

    if let Some(data_loader) = &route.descriptor.data_loader {
        data_loader.load(ctx.clone()).await?;
    }

    if let Some(url) = ctx.redirect() {
        return Ok(PageOutcome::Redirect(url));
    }
    if ctx.is_not_found() || route.is_not_found {
        return Ok(PageOutcome::NotFound);
    }

    if let Some(metadata_loader) = &route.descriptor.metadata_loader {
        let metadata = metadata_loader
            .load(dispatch.snapshot(), route.params.clone())
            .await?;
        dispatch.set("page/metadata", metadata);
        dispatch.commit();
    }

    Ok(PageOutcome::Loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::render::renderer::ViewHandler;
    use crate::routing::RouteDescriptor;
    use serde_json::json;
    use std::time::Duration;

    struct NullView;

    impl ViewHandler for NullView {
        fn render(&self, _state: &Value, _params: &RouteParams) -> Result<String, RenderError> {
            Ok(String::new())
        }
    }

    /// Service stub: `user` and `feed` resolve, `slow` hangs, anything
    /// else rejects.
    struct StubServices;

    impl StubServices {
        fn new() -> Arc<Self> {
            Arc::new(Self)
        }
    }

    impl ServiceClient for StubServices {
        fn fetch(
            &self,
            resource: String,
            _params: RouteParams,
        ) -> BoxFuture<'static, Result<Value, ServiceError>> {
            Box::pin(async move {
                match resource.as_str() {
                    "user" => Ok(json!({ "id": 42, "name": "Ada" })),
                    "feed" => Ok(json!([1, 2, 3])),
                    "slow" => {
                        tokio::time::sleep(Duration::from_secs(30)).await;
                        Ok(Value::Null)
                    }
                    other => Err(ServiceError {
                        resource: other.to_string(),
                        message: "unavailable".to_string(),
                    }),
                }
            })
        }
    }

    fn dispatch(services: Arc<dyn ServiceClient>) -> Dispatch {
        Dispatch::new(Arc::new(Mutex::new(StateTree::new())), services)
    }

    fn matched(descriptor: RouteDescriptor) -> RouteMatch {
        RouteMatch {
            descriptor: Arc::new(descriptor),
            params: RouteParams::new(),
            is_not_found: false,
        }
    }

    #[tokio::test]
    async fn fetch_all_stores_and_clears_tracking() {
        let dispatch = dispatch(StubServices::new());
        dispatch
            .fetch_all(
                vec![
                    FetchSpec::new("page/user", "user"),
                    FetchSpec::new("page/feed", "feed"),
                ],
                &RouteParams::new(),
            )
            .await
            .unwrap();

        assert_eq!(dispatch.get("page/user/name"), Some(json!("Ada")));
        assert_eq!(dispatch.get("page/feed"), Some(json!([1, 2, 3])));
        assert!(dispatch.pending_operations().is_empty());
    }

    #[tokio::test]
    async fn fetch_all_fails_fast_on_first_rejection() {
        let dispatch = dispatch(StubServices::new());
        let result = tokio::time::timeout(
            Duration::from_secs(2),
            dispatch.fetch_all(
                vec![
                    FetchSpec::new("page/slow", "slow"),
                    FetchSpec::new("page/broken", "broken"),
                ],
                &RouteParams::new(),
            ),
        )
        .await
        .expect("join must not wait out the slow fetch");

        match result {
            Err(RenderError::Loader { details, .. }) => {
                assert_eq!(details, Some(json!({ "resource": "broken" })));
            }
            other => panic!("expected loader error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mark_not_found_short_circuits_metadata() {
        let metadata_ran = Arc::new(AtomicBool::new(false));
        let metadata_flag = metadata_ran.clone();

        let descriptor = RouteDescriptor::new("user", "/users/:id", Arc::new(NullView))
            .with_data_loader(data_loader(|ctx: LoadContext| async move {
                ctx.mark_not_found();
                Ok(())
            }))
            .with_metadata_loader(metadata_loader(move |_state, _params| {
                let flag = metadata_flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(Value::Null)
                }
            }));

        let outcome = load_page(&matched(descriptor), &dispatch(StubServices::new()))
            .await
            .unwrap();
        assert_eq!(outcome, PageOutcome::NotFound);
        assert!(!metadata_ran.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn redirect_outranks_not_found() {
        let descriptor = RouteDescriptor::new("legacy", "/legacy", Arc::new(NullView))
            .with_data_loader(data_loader(|ctx: LoadContext| async move {
                ctx.mark_not_found();
                ctx.redirect_to("/replacement");
                Ok(())
            }));

        let outcome = load_page(&matched(descriptor), &dispatch(StubServices::new()))
            .await
            .unwrap();
        assert_eq!(outcome, PageOutcome::Redirect("/replacement".to_string()));
    }

    #[tokio::test]
    async fn metadata_reads_fetched_data() {
        let descriptor = RouteDescriptor::new("user", "/users/:id", Arc::new(NullView))
            .with_data_loader(data_loader(|ctx: LoadContext| async move {
                ctx.dispatch
                    .fetch_into("page/user", "user", &ctx.params)
                    .await
            }))
            .with_metadata_loader(metadata_loader(|state: Value, _params| async move {
                let name = state
                    .pointer("/page/user/name")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string();
                Ok(json!({ "title": name }))
            }));

        let dispatch = dispatch(StubServices::new());
        let outcome = load_page(&matched(descriptor), &dispatch).await.unwrap();
        assert_eq!(outcome, PageOutcome::Loaded);
        assert_eq!(dispatch.get("page/metadata/title"), Some(json!("Ada")));
    }
}
