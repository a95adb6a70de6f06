//! HTTP messaging boundary
//!
//! The presentation layer talks to the pipeline through two stateless
//! requests: translate a caption, transcribe (and translate) an audio
//! chunk. Each request is independent; failures come back as an inline
//! error string for the overlay to display.

mod handlers;
mod routes;

pub use routes::create_router;
