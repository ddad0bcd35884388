use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::WindowBuilder;

use crate::content::{write_replay, RecordingInput, Replay, ReplayInput};
use crate::sim::{
    fixed_step_for_rate, normalize_non_zero_duration, AdvanceReport, SharedSimulator, SimConfig,
};

use super::input::InputCollector;
use super::metrics::MetricsAccumulator;
use super::{MetricsHandle, Renderer, SessionObserver};

pub const SLOW_FRAME_ENV_VAR: &str = "RAGEFALL_SLOW_FRAME_MS";

/// Where per-step input comes from.
#[derive(Debug, Clone, Default)]
pub enum InputMode {
    #[default]
    Live,
    /// Drive the actor from a recorded session; the keyboard only quits and mutes.
    Replay(Replay),
}

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_steps_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    pub input_mode: InputMode,
    /// Live sessions write their input log here on exit.
    pub record_replay_path: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Ragefall".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_steps_per_frame: 16,
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            input_mode: InputMode::Live,
            record_replay_path: None,
        }
    }
}

impl LoopConfig {
    /// Simulator settings implied by the loop timing and the initial window size.
    pub fn sim_config(&self) -> SimConfig {
        let defaults = SimConfig::default();
        SimConfig {
            fixed_step: fixed_step_for_rate(self.target_tps.max(1)),
            max_frame_delta: normalize_non_zero_duration(
                self.max_frame_delta,
                defaults.max_frame_delta,
            ),
            max_steps_per_advance: self.max_steps_per_frame.max(1),
            viewport_width: self.window_width as f32,
            viewport_height: self.window_height as f32,
            ..defaults
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

enum StepInput {
    Live(InputCollector),
    Recording {
        recorder: RecordingInput<InputCollector>,
        path: PathBuf,
    },
    Playback {
        collector: InputCollector,
        playback: ReplayInput,
        finish_logged: bool,
    },
}

impl StepInput {
    fn from_config(config: &LoopConfig, simulator: &SharedSimulator) -> Self {
        match (&config.input_mode, &config.record_replay_path) {
            (InputMode::Replay(replay), record_path) => {
                if record_path.is_some() {
                    warn!("replay_recording_ignored_during_playback");
                }
                info!(steps = replay.len(), "replay_playback_started");
                Self::Playback {
                    collector: InputCollector::new(),
                    playback: ReplayInput::new(replay),
                    finish_logged: false,
                }
            }
            (InputMode::Live, Some(path)) => {
                info!(path = %path.display(), "replay_recording_started");
                Self::Recording {
                    recorder: RecordingInput::new(
                        InputCollector::new(),
                        simulator.with(Replay::for_simulator),
                    ),
                    path: path.clone(),
                }
            }
            (InputMode::Live, None) => Self::Live(InputCollector::new()),
        }
    }

    fn collector_mut(&mut self) -> &mut InputCollector {
        match self {
            Self::Live(collector) => collector,
            Self::Recording { recorder, .. } => recorder.inner_mut(),
            Self::Playback { collector, .. } => collector,
        }
    }

    /// Playback follows the replayed input, so live keys do not count as activity there.
    fn take_activity(&mut self) -> bool {
        match self {
            Self::Live(collector) => collector.take_activity(),
            Self::Recording { recorder, .. } => recorder.inner_mut().take_activity(),
            Self::Playback {
                collector,
                playback,
                ..
            } => {
                collector.take_activity();
                playback.take_activity()
            }
        }
    }

    fn advance(
        &mut self,
        simulator: &SharedSimulator,
        frame_dt: Duration,
        observer: &mut dyn SessionObserver,
    ) -> AdvanceReport {
        match self {
            Self::Live(collector) => simulator.advance(frame_dt, collector, observer),
            Self::Recording { recorder, .. } => simulator.advance(frame_dt, recorder, observer),
            Self::Playback {
                playback,
                finish_logged,
                ..
            } => {
                let report = simulator.advance(frame_dt, playback, observer);
                if playback.is_finished() && !*finish_logged {
                    *finish_logged = true;
                    info!(
                        step = simulator.with(|sim| sim.step_index()),
                        "replay_playback_finished"
                    );
                }
                report
            }
        }
    }

    fn finish(&self) {
        let Self::Recording { recorder, path } = self else {
            return;
        };
        if let Err(error) = write_replay(path, recorder.replay()) {
            warn!(path = %path.display(), error = %error, "replay_write_failed");
        }
    }
}

pub fn run_app(
    config: LoopConfig,
    simulator: SharedSimulator,
    observer: Box<dyn SessionObserver>,
) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, simulator, observer, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    simulator: SharedSimulator,
    mut observer: Box<dyn SessionObserver>,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;
    let viewport = renderer.viewport();
    simulator.with_mut(|sim| sim.set_viewport(viewport.width as f32, viewport.height as f32));

    event_loop.set_control_flow(ControlFlow::Poll);

    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut step_input = StepInput::from_config(&config, &simulator);

    simulator.with(|sim| {
        info!(
            fixed_step_ns = sim.fixed_step().as_nanos() as u64,
            step_scale = sim.step_scale(),
            max_frame_delta_ms = sim.config().max_frame_delta.as_millis() as u64,
            max_steps_per_advance = sim.config().max_steps_per_advance,
            metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
            slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
            render_fps_cap = %format_render_cap(effective_render_cap),
            "loop_config"
        );
    });

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    step_input.collector_mut().mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                    let viewport = renderer.viewport();
                    simulator.with_mut(|sim| {
                        sim.set_viewport(viewport.width as f32, viewport.height as f32)
                    });
                }
                WindowEvent::Focused(false) => {
                    step_input.collector_mut().release_all();
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    let collector = step_input.collector_mut();
                    collector.handle_keyboard_input(&event);
                    if collector.quit_requested() {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if step_input.collector_mut().take_mute_pressed() {
                        observer.toggle_mute();
                    }

                    if slow_frame_delay > Duration::ZERO {
                        // Explicit debug perturbation only; this is not the FPS cap.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let report = step_input.advance(&simulator, raw_frame_dt, observer.as_mut());
                    metrics_accumulator.record_advance(
                        report.steps_run,
                        report.clamped,
                        report.dropped_backlog,
                    );
                    let input_activity = step_input.take_activity();
                    observer.on_frame(raw_frame_dt, input_activity);

                    // Single authoritative FPS cap sleep point for render pacing.
                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    let view = simulator.render_view();
                    if let Err(error) = renderer.render_view(&view) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let deaths = simulator.with(|sim| sim.deaths());
                    let next_title = format_window_title(
                        &config.window_title,
                        deaths,
                        observer.status_line().as_deref(),
                    );
                    if last_applied_title.as_deref() != Some(next_title.as_str()) {
                        window.set_title(&next_title);
                        last_applied_title = Some(next_title);
                    }
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) = metrics_accumulator.maybe_snapshot(now) {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            clamped_frames = snapshot.clamped_frames,
                            dropped_backlog_ms = snapshot.dropped_backlog_ms,
                            step = view.step,
                            deaths,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                step_input.finish();
                observer.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn format_window_title(base: &str, deaths: u32, status: Option<&str>) -> String {
    match status {
        Some(line) if !line.is_empty() => format!("{base} | deaths: {deaths} | {line}"),
        _ => format!("{base} | deaths: {deaths}"),
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    parse_slow_frame_delay(env::var(SLOW_FRAME_ENV_VAR), config_slow_frame_ms)
}

fn parse_slow_frame_delay(
    value: Result<String, env::VarError>,
    config_slow_frame_ms: u64,
) -> Duration {
    match value {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                warn!(
                    env_var = SLOW_FRAME_ENV_VAR,
                    value = value.as_str(),
                    "invalid slow-frame env var value; falling back to config"
                );
                Duration::from_millis(config_slow_frame_ms)
            }
        },
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}
