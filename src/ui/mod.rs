pub mod editor;
pub mod layout;
pub mod markdown;
pub mod render;
pub mod segments;
pub mod text_metrics;
