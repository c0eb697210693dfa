mod loader;

pub use loader::{Config, EditorConfig, JiraConfig};
