//! Output for the terminal and for files.

pub mod generator;
pub mod progress;

pub use generator::{generate_json_comparison, generate_markdown_comparison, generate_text_comparison};
pub use progress::ProgressPrinter;
