//! Route table and lookup.
//!
//! # Responsibilities
//! - Hold the compiled, declaration-ordered route list
//! - Resolve a path to a descriptor plus extracted parameters
//! - Fall back to the wildcard only when nothing specific matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Single O(n) ordered scan; first specific match wins
//! - Explicit `None` rather than a silent default when no wildcard exists

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::render::{DataLoader, MetadataLoader, ViewHandler};
use crate::routing::matcher::{compile_pattern, CompiledPattern, RoutePatternError};

/// Parameters extracted from `:name` segments.
pub type RouteParams = BTreeMap<String, String>;

/// One declared route: a pattern, the view that renders it, and its
/// optional data/metadata loaders.
pub struct RouteDescriptor {
    /// Stable identifier used for logging, metrics and lazy code loading.
    pub id: String,
    pub pattern: String,
    pub handler: Arc<dyn ViewHandler>,
    pub data_loader: Option<Arc<dyn DataLoader>>,
    pub metadata_loader: Option<Arc<dyn MetadataLoader>>,
}

impl RouteDescriptor {
    pub fn new(
        id: impl Into<String>,
        pattern: impl Into<String>,
        handler: Arc<dyn ViewHandler>,
    ) -> Self {
        Self {
            id: id.into(),
            pattern: pattern.into(),
            handler,
            data_loader: None,
            metadata_loader: None,
        }
    }

    pub fn with_data_loader(mut self, loader: Arc<dyn DataLoader>) -> Self {
        self.data_loader = Some(loader);
        self
    }

    pub fn with_metadata_loader(mut self, loader: Arc<dyn MetadataLoader>) -> Self {
        self.metadata_loader = Some(loader);
        self
    }
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("id", &self.id)
            .field("pattern", &self.pattern)
            .field("data_loader", &self.data_loader.is_some())
            .field("metadata_loader", &self.metadata_loader.is_some())
            .finish()
    }
}

/// A resolved route.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub descriptor: Arc<RouteDescriptor>,
    pub params: RouteParams,
    /// True when only the wildcard matched.
    pub is_not_found: bool,
}

struct CompiledRoute {
    descriptor: Arc<RouteDescriptor>,
    pattern: CompiledPattern,
}

/// The immutable, declaration-ordered route table.
pub struct RouteTable {
    routes: Vec<CompiledRoute>,
}

impl RouteTable {
    /// Compile all patterns. Fails on the first malformed declaration.
    pub fn new(descriptors: Vec<RouteDescriptor>) -> Result<Self, RoutePatternError> {
        let mut routes = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            let pattern = compile_pattern(&descriptor.pattern)?;
            routes.push(CompiledRoute {
                descriptor: Arc::new(descriptor),
                pattern,
            });
        }
        Ok(Self { routes })
    }

    /// Resolve `path` against the table.
    ///
    /// Scans the list once, remembering the wildcard if present; the
    /// wildcard is only returned after the scan completes with no
    /// specific match. `None` means no match and no wildcard.
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        let mut wildcard: Option<&CompiledRoute> = None;
        for route in &self.routes {
            match &route.pattern {
                CompiledPattern::Wildcard => {
                    if wildcard.is_none() {
                        wildcard = Some(route);
                    }
                }
                specific => {
                    if let Some(pairs) = specific.capture(path) {
                        return Some(RouteMatch {
                            descriptor: route.descriptor.clone(),
                            params: pairs.into_iter().collect(),
                            is_not_found: false,
                        });
                    }
                }
            }
        }
        wildcard.map(|route| RouteMatch {
            descriptor: route.descriptor.clone(),
            params: RouteParams::new(),
            is_not_found: true,
        })
    }

    /// The wildcard descriptor, when one is declared.
    pub fn wildcard(&self) -> Option<Arc<RouteDescriptor>> {
        self.routes
            .iter()
            .find(|r| matches!(r.pattern, CompiledPattern::Wildcard))
            .map(|r| r.descriptor.clone())
    }

    /// Look a route up by id (used by the client resume step).
    pub fn find_by_id(&self, id: &str) -> Option<Arc<RouteDescriptor>> {
        self.routes
            .iter()
            .find(|r| r.descriptor.id == id)
            .map(|r| r.descriptor.clone())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
