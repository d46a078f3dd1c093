//! Paragraph vectors for ranked segments.
//!
//! ```text
//! CSV content ──▶ tokenize ──▶ ParagraphModel (fit / infer) ──▶ output.h5
//! ```
//!
//! - [`tokenize`] — word and punctuation tokens
//! - [`model`]    — PV-DBOW training, inference and the bincode model file
//! - [`store`]    — HDF5 datasets, one per CSV (feature `h5`)

pub mod model;
pub mod store;
pub mod tokenize;

pub use model::ParagraphModel;
pub use store::{load_vectors, stack_vectors, write_vectors, VectorSet};
pub use tokenize::tokenize;
