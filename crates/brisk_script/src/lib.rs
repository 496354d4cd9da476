//! Brisk Scripting System
//!
//! JavaScript game logic via QuickJS.
//!
//! ## Surface
//!
//! - `Actor`: name, position, move, set_position, flip_x, flip_y,
//!   set_animation, destroy
//! - `Scene.spawn(name, x, y)`, `Scene.find(name)`, `Scene.name`,
//!   `Scene.camera`, `Scene.set_camera(x, y)`, `Scene.bounds`
//! - `Game.load_scene(name)`, `Game.quit()`
//! - `print(msg)`
//!
//! Optional callbacks a script may define: `tick()`, `on_spawned(actor)`,
//! `on_destroyed(id)`, `on_collision(actor, other)`, `on_scene_changed(name)`.

mod host;

pub use host::{ScriptHost, SharedWorld};
pub use rquickjs;

use rquickjs::Ctx;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("failed to read script {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("uncaught exception: {message}")]
    Exception {
        message: String,
        stack: Option<String>,
    },

    #[error("script engine error: {0}")]
    Engine(#[from] rquickjs::Error),
}

impl ScriptError {
    /// Turn a failed call into an error, taking the pending exception off the
    /// context when there is one.
    pub(crate) fn from_js(ctx: &Ctx<'_>, err: rquickjs::Error) -> Self {
        if !matches!(err, rquickjs::Error::Exception) {
            return Self::Engine(err);
        }
        let value = ctx.catch();
        match value.as_exception() {
            Some(exception) => Self::Exception {
                message: exception.message().unwrap_or_default(),
                stack: exception.stack(),
            },
            None => Self::Exception {
                message: format!("{value:?}"),
                stack: None,
            },
        }
    }
}
