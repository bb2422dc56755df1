//! HTTP API handlers
//!
//! REST control surface for the batch pipeline plus an SSE progress stream.

pub mod batch;
pub mod clips;
pub mod health;
pub mod sse;

pub use batch::batch_routes;
pub use clips::clip_routes;
pub use health::health_routes;
pub use sse::batch_event_stream;
