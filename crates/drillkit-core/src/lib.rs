//! drillkit-core: Session engine, clocks, scoring, and content for drillkit.
//!
//! Every game variant runs through the same [`session::Session`] state
//! machine. Variants differ only in their [`model::SessionConfig`]: which
//! [`traits::ContentSource`] supplies items, how answers are scored, and
//! which clock (per item or per session) bounds the run.
//! [`engine::AssessmentEngine`] drives sessions asynchronously and hands
//! results to a [`traits::ResultSink`].

pub mod clock;
pub mod content;
pub mod engine;
pub mod error;
pub mod history;
pub mod item;
pub mod model;
pub mod presets;
pub mod scoring;
pub mod session;
pub mod sink;
pub mod traits;
