//! HTTP middleware stack.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions, OAuth state only)
//! 4. Security headers (`frame-ancestors` for the embedded admin)
//!
//! Embedded routes authenticate per request with the [`ShopContext`]
//! extractor instead of a guard layer.

pub mod security_headers;
pub mod session;
pub mod shop;

pub use security_headers::{frame_ancestors, security_headers_middleware};
pub use session::{SessionLayerError, create_session_layer, session_layer};
pub use shop::{ShopContext, ShopRejection};
