//! Letter template generator.
//!
//! A template body carries `{placeholder}` tokens; field mappings decide
//! where each value comes from (a selected resident, operator input, or a
//! system value). [`draft::LetterDraft`] resolves them into one flat map
//! that drives both the local preview and the remote rendering call.

pub mod draft;
pub mod generator;
pub mod letter_number;
pub mod number_format;
pub mod placeholder;
pub mod roman;
pub mod terbilang;

pub use draft::LetterDraft;
pub use generator::{search_roster, FinalizedLetter, LetterService, Numbering};
pub use letter_number::{LetterNumberParts, SequenceInput, DEFAULT_FORMAT};
pub use placeholder::Substitution;
pub use roman::to_roman;
pub use terbilang::terbilang;
