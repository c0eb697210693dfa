mod actions;
mod dispatch;
mod expand;
mod lifecycle;
mod look;
mod registry;
mod render;
mod window;

pub use lifecycle::{Session, SessionOptions};
pub use look::MINE_TITLE;
pub use registry::{RegistryError, WindowRegistry};
pub use window::{Behavior, IssueView, Window, WindowAction};
