//! Call-tree aggregation engine.
//!
//! A [`model::CaptureForest`] of recorded invocations is presented as two
//! navigable views: [`aggregate::TopDown`] (caller to callee) and
//! [`aggregate::BottomUp`] (callee to caller). Child lists are built on first
//! access and cached, so exploring a large capture costs only what is
//! actually expanded.

pub mod aggregate;
pub mod clock;
pub mod details;
pub mod model;
