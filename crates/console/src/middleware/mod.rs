//! HTTP middleware stack for the console.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, added in `main`)
//! 2. `TraceLayer` (request span with method, uri, status, latency)
//! 3. Request ID (recorded on the span, returned in `x-request-id`)
//! 4. Session layer (tower-sessions with the in-memory store)
//! 5. Session expiry (flushes the session when the API rejected the token)

pub mod auth;
pub mod request_id;
pub mod session;

pub use auth::{
    LoginRejection, RequireLogin, Viewer, end_session, expire_on_unauthorized, save_preferences,
    set_company, start_session,
};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::{SESSION_COOKIE_NAME, create_session_layer};
