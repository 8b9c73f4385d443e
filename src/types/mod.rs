pub mod completions;
pub mod recommendation;
