//! Text utilities: markup normalization, query keywords and
//! query-focused extraction.

pub mod extract;
pub mod keywords;
pub mod normalize;

pub use extract::{extract_relevant, split_sentences, truncate_words, ELLIPSIS};
pub use keywords::{extract_keywords, STOP_WORDS};
pub use normalize::{clean_chat_markup, normalize};
