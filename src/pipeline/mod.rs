//! Pipeline stages for PDF-to-CSV preprocessing.
//!
//! Each submodule implements one transformation step and is testable on its
//! own. Only [`layout::read_page_blocks`] touches pdfium; everything after it
//! works on plain data.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ layout ──▶ rank ──▶ csv
//! (path)   (pdfium)   (density)  (rows)
//! ```
//!
//! 1. [`input`]  — list a directory's inputs and validate PDF magic bytes
//! 2. [`layout`] — group pdfium text spans into lines and blocks; runs in
//!    `spawn_blocking` because pdfium is not async-safe
//! 3. [`rank`]   — page-local density percentiles and content normalization
//! 4. [`csv`]    — `page,priority,content` files, written and read back

pub mod csv;
pub mod input;
pub mod layout;
pub mod rank;
