mod config;
mod session;

pub use config::{find_project_root, ProjectConfig, ProjectLayout, ProjectPaths, CONFIG_FILENAME};
pub use session::ProjectSession;
