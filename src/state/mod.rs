/// State management module
///
/// This module handles all application state, including:
/// - Database connection and queries (store.rs)
/// - Shared data structures (data.rs)
/// - Folder scanning and pagination (catalog.rs)
/// - Cursor movement with save-before-move (navigator.rs)
/// - Pending keep/delete and rotation for the active image (annotation.rs)
/// - Batch deletion of marked images (discard.rs)
/// - User settings (settings.rs)

pub mod annotation;
pub mod catalog;
pub mod data;
pub mod discard;
pub mod error;
pub mod navigator;
pub mod settings;
pub mod store;
