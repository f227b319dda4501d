//! Voicenote - voice-driven note taking
//!
//! This library exports the core components: the recording session state
//! machine, transcript assembly, autosave coordination, and the local note
//! store. Speech recognition itself is an external capability injected
//! through a trait.

/// Debounced autosave coordination
pub mod autosave;
/// Configuration management
pub mod config;
/// Note export to JSON
pub mod export;
/// Note entity and language catalog
pub mod note;
/// Session and device state
pub mod session;
/// Speech capability interface and event model
pub mod speech;
/// Local note store
pub mod store;
/// Mock AI summarization
pub mod summary;
/// Telemetry and logging
pub mod telemetry;
/// Transcript assembly from recognition events
pub mod transcript;
