//! Best-effort page-view beacon for statically generated blogs.
//!
//! A host signals DOM-ready through [`application::beacon::PageViewBeacon::on_dom_ready`];
//! the beacon reads the page context, flags likely crawlers and fires a single
//! GET at the collector without waiting for it.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
