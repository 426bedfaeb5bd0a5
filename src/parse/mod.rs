pub mod document_parser;
pub mod line;
pub mod serializer;
pub mod tree_builder;
pub mod week_title;

pub use document_parser::parse_document;
pub use serializer::{render_project, render_tasks};
pub use tree_builder::{TaskForest, build_forest, parse_task_node, pool_window, week_body_end};
pub use week_title::{format_week_title, resolve_range};
