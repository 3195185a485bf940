//! Concrete skills the Herald router dispatches to.

mod web_search;

pub use web_search::{extract_result_text, BraveSearch, SUMMARIZE_PREFIX};
