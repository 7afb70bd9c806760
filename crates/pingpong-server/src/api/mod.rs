pub mod chat;

use pingpong_core::AppCore;
use std::sync::Arc;

pub type AppState = Arc<AppCore>;
