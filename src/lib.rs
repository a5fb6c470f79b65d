//! Airtrain Patcher: idempotent telemetry patch for airtrain installs
//!
//! Airtrain reads `AIRTRAIN_TELEMETRY_ENABLED=false` but does not fully
//! honor it: its telemetry service still initializes a PostHog reporting
//! client. This crate applies a targeted, pattern-anchored source patch to
//! `airtrain/telemetry/service.py` inside a virtualenv so the flag disables
//! reporting for real.
//!
//! # Behavior
//!
//! - Two independent edits: an early-return guard when telemetry is
//!   disabled, and a `_posthog_client` pre-initialization so the early
//!   return never leaves the attribute unassigned.
//! - Idempotent: each edit checks an applied-marker first; running the
//!   patcher repeatedly yields byte-identical content.
//! - Safe to run anywhere: an environment without airtrain installed is a
//!   successful no-op, and anchors that no longer match (upstream drift)
//!   leave the file untouched.
//! - Atomic persistence: the file is rewritten via tempfile + fsync +
//!   rename, and only when the content actually changed.
//!
//! # Example
//!
//! ```no_run
//! use airtrain_patcher::{patch_environment, PatchOutcome};
//! use std::path::Path;
//!
//! match patch_environment(Path::new(".venv")) {
//!     Ok(PatchOutcome::Patched { file }) => println!("patched {}", file.display()),
//!     Ok(_) => println!("nothing to do"),
//!     Err(e) => eprintln!("patch failed: {}", e),
//! }
//! ```

pub mod edits;
pub mod locate;
pub mod patcher;

// Re-exports
pub use edits::{apply_edits, insert_client_preinit, insert_disabled_guard, DISABLED_SENTINEL};
pub use locate::{service_file, site_packages, LocateError};
pub use patcher::{patch_environment, plan, PatchError, PatchOutcome, PatchPlan};
