//! Core traits for the seismometer monitor
//!
//! These are the seams where external collaborators plug in.
//!
//! - [`DocumentLoader`]: retrieve a remote JSON document
//! - [`Confirmer`], [`Notifier`], [`Clipboard`]: talk to the human operator
//! - [`TraceLog`]: durable append-only record of accepted changes

pub mod document_loader;
pub mod operator;
pub mod trace_log;

pub use document_loader::DocumentLoader;
pub use operator::{Clipboard, Confirmer, Notifier};
pub use trace_log::{TraceEntry, TraceLog};
