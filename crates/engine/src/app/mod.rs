mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod session;

pub use loop_runner::{
    run_app, run_app_with_metrics, AppError, InputMode, LoopConfig, SLOW_FRAME_ENV_VAR,
};
pub use metrics::{LoopMetricsSnapshot, MetricsHandle};
pub use rendering::{Renderer, Viewport};
pub use session::SessionObserver;
