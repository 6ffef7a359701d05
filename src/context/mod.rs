//! Per-request context extraction subsystem.
//!
//! # Data Flow
//! ```text
//! Raw request (headers, cookies, query)
//!     → cookies.rs (parse Cookie header, queue Set-Cookie writes)
//!     → utm.rs (query vs. cookie resolution, de-duplication)
//!     → user_agent.rs (structured classification, bot flag)
//!     → extractor.rs (RequestContext assembly, session tracking)
//!     → merged onto a fresh StateTree, forwarded to the renderer
//! ```
//!
//! # Design Decisions
//! - Every input is untrusted: malformed values fall back to safe
//!   defaults, extraction never fails a request
//! - Cookie writes are queued, not sent; the gateway flushes them onto
//!   the final response in one place
//! - The clock is an explicit argument, no ambient time reads

pub mod cookies;
pub mod extractor;
pub mod user_agent;
pub mod utm;

pub use cookies::CookieJar;
pub use extractor::{Extractor, RequestContext, RequestParts};
pub use user_agent::{parse_user_agent, DeviceClass, UserAgentProfile};
pub use utm::{resolve_utm, UtmValues};
