pub mod jukebox;

pub use jukebox::config::JukeboxConfig;
pub use jukebox::error::{JukeboxError, JukeboxResult};
pub use jukebox::{AppState, SharedState, create_jukebox_router, init_jukebox_state};
