pub mod animation_loop;
pub mod camera;
pub mod cli;
pub mod config;
pub mod context;
pub mod controller;
pub mod graphics;
pub mod scene;
pub mod snapshot;
pub mod user_input;
pub mod windowing;

pub use windowing::Windowing;

/// Engine-level error type.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config: {0}")]
    Config(#[from] toml::de::Error),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("renderer: {0}")]
    Renderer(String),
}

impl EngineError {
    /// Wrap a renderer-internal error (those stay `Box<dyn Error>` inside the backend).
    pub fn renderer(e: Box<dyn std::error::Error>) -> Self {
        EngineError::Renderer(e.to_string())
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
