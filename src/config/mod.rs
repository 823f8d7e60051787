//! Service configuration

pub mod settings;

pub use settings::{BpmRange, Settings, TitleCase, ToolCommand};
