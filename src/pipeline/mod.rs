//! Pipeline stages for note generation.
//!
//! Each submodule implements one transformation step so it can be tested on
//! its own. Only [`llm`] touches the network.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ input ──▶ llm ──▶ postprocess ──▶ parse
//! (PDF→text)  (pages)   (API)   (cleanup)       (5 sections)
//! ```
//!
//! 1. [`extract`]     — PDF → cleaned, page-marked text
//! 2. [`input`]       — page-marked text (or a PDF) → ordered pages
//! 3. [`llm`]         — one chat-completion call per page
//! 4. [`postprocess`] — deterministic cleanup of model quirks
//! 5. [`parse`]       — response → the five report sections

pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod postprocess;
