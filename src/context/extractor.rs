//! Initial state extraction.
//!
//! # Responsibilities
//! - Build the per-request `RequestContext` from raw request data
//! - Mint or resume the analytics session
//! - Decide whether a new tracking session starts
//! - Merge the finished context onto a fresh `StateTree`
//!
//! # Design Decisions
//! - Cookie names and the session window come from configuration; the
//!   clock is an explicit argument
//! - The analytics cookie is written only when the id was newly minted;
//!   the last-visit cookie is refreshed on every request
//! - A last-visit timestamp that fails to parse counts as absent

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;
use uuid::Uuid;

use crate::config::CookieConfig;
use crate::context::cookies::{queue_json_cookie, read_json_cookie, CookieJar};
use crate::context::user_agent::{parse_user_agent, UserAgentProfile};
use crate::context::utm::{resolve_utm, UtmValues};
use crate::state::StateTree;

/// Raw request inputs the extractor consumes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RequestParts<'a> {
    pub query: Option<&'a str>,
    pub user_agent: Option<&'a str>,
    pub forwarded_for: Option<&'a str>,
}

/// Per-request derived bag. Created at request start, merged into the
/// state tree, discarded after the response.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub analytics_session_id: String,
    pub utm: UtmValues,
    pub user_agent: UserAgentProfile,
    pub request_ip: Option<String>,
    pub experiment_active_variants: BTreeMap<String, String>,
    pub should_track_new_session: bool,
}

/// Initial state extractor.
#[derive(Debug, Clone)]
pub struct Extractor {
    cookies: CookieConfig,
    new_session_window: Duration,
}

impl Extractor {
    pub fn new(cookies: CookieConfig, new_session_window: Duration) -> Self {
        Self {
            cookies,
            new_session_window,
        }
    }

    /// Build the request context, queueing any needed cookie writes.
    ///
    /// Experiment variants are reconciled separately and filled in by the
    /// caller before the context is merged onto the state tree.
    pub fn extract(
        &self,
        parts: &RequestParts<'_>,
        jar: &mut CookieJar,
        now: SystemTime,
    ) -> RequestContext {
        let analytics_session_id = self.resolve_analytics_session(jar);

        let stored_utm: Option<UtmValues> = read_json_cookie(jar, &self.cookies.utm);
        let utm = resolve_utm(parts.query, stored_utm.as_ref());
        if utm.write_cookie {
            queue_json_cookie(jar, &self.cookies.utm, &utm.values);
        }

        let should_track_new_session = self.resolve_session_tracking(jar, now);

        RequestContext {
            analytics_session_id,
            utm: utm.values,
            user_agent: parse_user_agent(parts.user_agent),
            request_ip: client_ip(parts.forwarded_for),
            experiment_active_variants: BTreeMap::new(),
            should_track_new_session,
        }
    }

    fn resolve_analytics_session(&self, jar: &mut CookieJar) -> String {
        if let Some(existing) = jar.get(&self.cookies.analytics) {
            return existing.to_string();
        }
        let minted = Uuid::new_v4().to_string();
        jar.queue_write(&self.cookies.analytics, minted.clone());
        minted
    }

    fn resolve_session_tracking(&self, jar: &mut CookieJar, now: SystemTime) -> bool {
        let now_secs = now
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let last_visit = jar
            .get(&self.cookies.last_visit)
            .and_then(|raw| raw.parse::<u64>().ok());

        let should_track = match last_visit {
            Some(then) if then <= now_secs => {
                now_secs - then > self.new_session_window.as_secs()
            }
            // clock skew or garbage: start fresh
            _ => true,
        };

        // refreshed unconditionally
        jar.queue_write(&self.cookies.last_visit, now_secs.to_string());
        should_track
    }
}

fn client_ip(forwarded_for: Option<&str>) -> Option<String> {
    let first = forwarded_for?.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_string())
}

/// Merge a finished context onto the state tree and commit.
///
/// The request ip lands under a dynamic key so it never reaches the
/// serialized payload.
pub fn apply_to_state(context: &RequestContext, state: &mut StateTree) {
    state.set(
        "context/analytics_session_id",
        json!(context.analytics_session_id),
    );
    state.set("context/utm", json!(context.utm));
    state.set("context/user_agent", json!(context.user_agent));
    state.set("context/$request_ip", json!(context.request_ip));
    state.set(
        "context/experiments",
        json!(context.experiment_active_variants),
    );
    state.set(
        "context/should_track_new_session",
        json!(context.should_track_new_session),
    );
    state.commit();
}
