//! Template catalog, asynchronous content loading, and stale-result
//! cancellation.
//!
//! Metadata is synchronous and immutable; only content loading suspends.
//! Every content request carries a monotonically increasing token, and any
//! completion whose token is no longer the newest one is dropped silently,
//! so the visible state always matches the most recent selection.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::sync::{Mutex, OnceCell};

use crate::error::BeamError;

// ── Descriptors ──────────────────────────────────────────────────

/// Immutable template metadata, listable without touching content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateMeta {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Ordered highlight strings shown in the template picker.
    pub highlights: Vec<String>,
}

/// Metadata plus fetched content, ready for the display surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTemplate {
    pub meta: TemplateMeta,
    pub content: String,
}

// ── Store contract ───────────────────────────────────────────────

/// Fixed interface of the external template asset store.
///
/// `load` must be idempotent and safe to call concurrently for one id:
/// the second caller observes the first caller's in-flight result rather
/// than triggering a duplicate underlying fetch.
#[async_trait]
pub trait TemplateStore: Send + Sync {
    /// Finite listing of all known templates.
    fn list(&self) -> Vec<TemplateMeta>;

    /// Metadata for one template, or `None` if the id is unknown.
    fn get_metadata(&self, id: &str) -> Option<TemplateMeta>;

    /// Fetch metadata plus content. `Ok(None)` means the id is unknown;
    /// a fetch failure is an error and must leave nothing cached.
    async fn load(&self, id: &str) -> Result<Option<ResolvedTemplate>, BeamError>;
}

// ── StaticTemplateStore ──────────────────────────────────────────

/// Async closure that fetches the raw content for a template id.
pub type ContentFetcher =
    Box<dyn Fn(&str) -> BoxFuture<'static, Result<String, String>> + Send + Sync>;

struct Entry {
    meta: TemplateMeta,
    cell: OnceCell<ResolvedTemplate>,
}

/// A store over a fixed descriptor table with pluggable content fetching.
///
/// Per-id `OnceCell`s give the required concurrency behavior: one fetch
/// per id at a time, later callers waiting on the winner, and a failed
/// fetch leaving the cell unset so the next call retries from scratch.
pub struct StaticTemplateStore {
    entries: Vec<Entry>,
    fetch: ContentFetcher,
}

impl StaticTemplateStore {
    pub fn new(descriptors: Vec<TemplateMeta>, fetch: ContentFetcher) -> Self {
        Self {
            entries: descriptors
                .into_iter()
                .map(|meta| Entry {
                    meta,
                    cell: OnceCell::new(),
                })
                .collect(),
            fetch,
        }
    }

    fn entry(&self, id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.meta.id == id)
    }
}

#[async_trait]
impl TemplateStore for StaticTemplateStore {
    fn list(&self) -> Vec<TemplateMeta> {
        self.entries.iter().map(|e| e.meta.clone()).collect()
    }

    fn get_metadata(&self, id: &str) -> Option<TemplateMeta> {
        self.entry(id).map(|e| e.meta.clone())
    }

    async fn load(&self, id: &str) -> Result<Option<ResolvedTemplate>, BeamError> {
        let Some(entry) = self.entry(id) else {
            return Ok(None);
        };
        let resolved = entry
            .cell
            .get_or_try_init(|| async {
                let content =
                    (self.fetch)(id)
                        .await
                        .map_err(|reason| BeamError::TemplateLoad {
                            id: id.to_string(),
                            reason,
                        })?;
                Ok::<_, BeamError>(ResolvedTemplate {
                    meta: entry.meta.clone(),
                    content,
                })
            })
            .await?;
        Ok(Some(resolved.clone()))
    }
}

/// The stock template catalog shipped with the control panel.
pub fn builtin_catalog() -> Vec<TemplateMeta> {
    let meta = |id: &str, name: &str, description: &str, highlights: &[&str]| TemplateMeta {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        highlights: highlights.iter().map(|h| h.to_string()).collect(),
    };
    vec![
        meta(
            "session-intro",
            "Session intro",
            "Simple opening layout for pre-show titles and announcements.",
            &[
                "Title and subtitle centered",
                "Soft gradient background",
                "Short supporting line underneath",
            ],
        ),
        meta(
            "today-schedule",
            "Run of show",
            "Lists the timed agenda for the session.",
            &[
                "Three time slots as a list",
                "Footnote area at the bottom",
                "Calm blue background",
            ],
        ),
        meta(
            "thanks-message",
            "Closing message",
            "Thanks the audience and points at the next action.",
            &[
                "Main and sub title for the sign-off",
                "Callout box for a survey URL",
                "Aurora-style background",
            ],
        ),
    ]
}

// ── Request tokens ───────────────────────────────────────────────

/// Monotonic token identifying one content request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

/// A content request: the token plus the template id it refers to.
/// Only the context's latest token is authoritative.
#[derive(Debug, Clone)]
pub struct PendingRequest {
    pub token: RequestToken,
    pub id: String,
}

/// What became of one content request.
#[derive(Debug)]
pub enum ResolveOutcome {
    Resolved(Arc<ResolvedTemplate>),
    /// The id is unknown to the store.
    NotFound,
    /// A newer request superseded this one; drop without surfacing anything.
    Stale,
    Failed(BeamError),
}

// ── TemplateResolver ─────────────────────────────────────────────

/// Cache-backed resolver with last-request-wins cancellation.
pub struct TemplateResolver {
    store: Arc<dyn TemplateStore>,
    cache: Mutex<HashMap<String, Arc<ResolvedTemplate>>>,
    next_token: AtomicU64,
    current: AtomicU64,
}

impl TemplateResolver {
    pub fn new(store: Arc<dyn TemplateStore>) -> Self {
        Self {
            store,
            cache: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(0),
            current: AtomicU64::new(0),
        }
    }

    pub fn list(&self) -> Vec<TemplateMeta> {
        self.store.list()
    }

    pub fn get_metadata(&self, id: &str) -> Option<TemplateMeta> {
        self.store.get_metadata(id)
    }

    /// Allocate a token strictly greater than every earlier one and make
    /// it the context's current request, superseding all outstanding ones.
    pub fn request(&self, id: &str) -> PendingRequest {
        let token = self.next_token.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.store(token, Ordering::SeqCst);
        PendingRequest {
            token: RequestToken(token),
            id: id.to_string(),
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.current.load(Ordering::SeqCst) == token.0
    }

    /// Drive one request to completion.
    ///
    /// The token is compared at every asynchronous resumption point; a
    /// superseded completion comes back as [`ResolveOutcome::Stale`] with
    /// no cache mutation and no error. Failed fetches are never cached.
    pub async fn resolve(&self, request: &PendingRequest) -> ResolveOutcome {
        if let Some(hit) = self.cache.lock().await.get(&request.id).cloned() {
            if !self.is_current(request.token) {
                return ResolveOutcome::Stale;
            }
            tracing::trace!(id = %request.id, "template cache hit");
            return ResolveOutcome::Resolved(hit);
        }

        let loaded = self.store.load(&request.id).await;

        if !self.is_current(request.token) {
            tracing::trace!(id = %request.id, "discarding stale template result");
            return ResolveOutcome::Stale;
        }
        match loaded {
            Ok(Some(resolved)) => {
                let resolved = Arc::new(resolved);
                self.cache
                    .lock()
                    .await
                    .insert(request.id.clone(), resolved.clone());
                ResolveOutcome::Resolved(resolved)
            }
            Ok(None) => ResolveOutcome::NotFound,
            Err(e) => {
                // The store left its in-flight slot unset; the next
                // request for this id retries the fetch from scratch.
                ResolveOutcome::Failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    fn catalog() -> Vec<TemplateMeta> {
        builtin_catalog()
    }

    fn counting_store(fetches: Arc<AtomicUsize>) -> Arc<StaticTemplateStore> {
        Arc::new(StaticTemplateStore::new(
            catalog(),
            Box::new(move |id| {
                let id = id.to_string();
                let fetches = fetches.clone();
                Box::pin(async move {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(format!("<content of {id}>"))
                })
            }),
        ))
    }

    #[test]
    fn metadata_is_synchronous() {
        let store = counting_store(Arc::new(AtomicUsize::new(0)));
        let resolver = TemplateResolver::new(store);
        assert_eq!(resolver.list().len(), 3);
        assert_eq!(
            resolver.get_metadata("session-intro").unwrap().name,
            "Session intro"
        );
        assert!(resolver.get_metadata("nope").is_none());
    }

    #[test]
    fn tokens_are_strictly_increasing() {
        let resolver = TemplateResolver::new(counting_store(Arc::new(AtomicUsize::new(0))));
        let a = resolver.request("session-intro");
        let b = resolver.request("today-schedule");
        assert!(b.token > a.token);
        assert!(!resolver.is_current(a.token));
        assert!(resolver.is_current(b.token));
    }

    #[test]
    fn cache_prevents_refetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let resolver = TemplateResolver::new(counting_store(fetches.clone()));
        tokio_test::block_on(async {
            let first = resolver.request("session-intro");
            assert!(matches!(
                resolver.resolve(&first).await,
                ResolveOutcome::Resolved(_)
            ));
            let second = resolver.request("session-intro");
            assert!(matches!(
                resolver.resolve(&second).await,
                ResolveOutcome::Resolved(_)
            ));
        });
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn superseded_completion_is_stale() {
        let gate = Arc::new(Notify::new());
        let release = gate.clone();
        let store = Arc::new(StaticTemplateStore::new(
            catalog(),
            Box::new(move |id| {
                let id = id.to_string();
                let gate = gate.clone();
                Box::pin(async move {
                    if id == "session-intro" {
                        // Hold A's fetch until B has finished.
                        gate.notified().await;
                    }
                    Ok(format!("<{id}>"))
                })
            }),
        ));
        let resolver = Arc::new(TemplateResolver::new(store));

        let a = resolver.request("session-intro");
        let slow = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(&a).await })
        };

        let b = resolver.request("today-schedule");
        let fast = resolver.resolve(&b).await;
        let ResolveOutcome::Resolved(resolved) = fast else {
            panic!("B should resolve");
        };
        assert_eq!(resolved.meta.id, "today-schedule");

        release.notify_one();
        let late = slow.await.unwrap();
        assert!(matches!(late, ResolveOutcome::Stale));
    }

    #[tokio::test]
    async fn failed_fetch_is_retryable() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let store = Arc::new(StaticTemplateStore::new(
            catalog(),
            Box::new(move |id| {
                let id = id.to_string();
                let counter = counter.clone();
                Box::pin(async move {
                    if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err("network down".to_string())
                    } else {
                        Ok(format!("<{id}>"))
                    }
                })
            }),
        ));
        let resolver = TemplateResolver::new(store);

        let first = resolver.request("thanks-message");
        let outcome = resolver.resolve(&first).await;
        let ResolveOutcome::Failed(e) = outcome else {
            panic!("first attempt should fail");
        };
        assert!(e.to_string().contains("thanks-message"));

        // Nothing negative was cached; the retry fetches again and wins.
        let second = resolver.request("thanks-message");
        assert!(matches!(
            resolver.resolve(&second).await,
            ResolveOutcome::Resolved(_)
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn concurrent_loads_share_one_fetch() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let store = counting_store(fetches.clone());

        let (a, b) = tokio::join!(store.load("session-intro"), store.load("session-intro"));
        assert!(a.unwrap().is_some());
        assert!(b.unwrap().is_some());
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let resolver = TemplateResolver::new(counting_store(Arc::new(AtomicUsize::new(0))));
        let req = resolver.request("missing");
        assert!(matches!(
            resolver.resolve(&req).await,
            ResolveOutcome::NotFound
        ));
    }
}
