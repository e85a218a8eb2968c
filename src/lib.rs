//! tabpool — tab lifecycle management for a memory-constrained browser.
//!
//! Keeps an ordered pair of tab collections (normal and incognito), caps
//! how many tabs hold live engine views at once, freeze-dries the rest
//! into saved-state blobs, and persists per-tab state to disk (encrypted
//! for incognito). The native content engine is abstracted behind
//! [`engine::RenderEngine`]; [`app::BrowserSession`] is the embedder
//! entry point.

pub mod app;
pub mod engine;
pub mod managers;
pub mod services;
pub mod types;
