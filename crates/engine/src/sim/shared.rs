use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use tracing::warn;

use super::events::EventSink;
use super::input::InputSource;
use super::simulator::{AdvanceReport, RenderView, Simulator};

static SIMULATOR_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_simulator_lock_poison_once(operation: &'static str) {
    if SIMULATOR_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "simulator lock poisoned; recovered inner value");
    }
}

/// Simulator shared between a stepping thread and render-side readers.
///
/// Each `advance` holds the write lock for all the steps it runs, so readers never observe a
/// half-finished step.
#[derive(Clone, Debug)]
pub struct SharedSimulator {
    inner: Arc<RwLock<Simulator>>,
}

impl SharedSimulator {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            inner: Arc::new(RwLock::new(simulator)),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Simulator> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_simulator_lock_poison_once("read");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Simulator> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_simulator_lock_poison_once("write");
                poisoned.into_inner()
            }
        }
    }

    pub fn advance<I, S>(&self, frame_dt: Duration, input: &mut I, sink: &mut S) -> AdvanceReport
    where
        I: InputSource + ?Sized,
        S: EventSink + ?Sized,
    {
        self.write().advance(frame_dt, input, sink)
    }

    pub fn render_view(&self) -> RenderView {
        self.read().render_view()
    }

    /// Runs `f` against the simulator under the read lock.
    pub fn with<R>(&self, f: impl FnOnce(&Simulator) -> R) -> R {
        f(&self.read())
    }

    /// Runs `f` against the simulator under the write lock.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Simulator) -> R) -> R {
        f(&mut self.write())
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::sim::input::ScriptedInput;
    use crate::sim::simulator::SimConfig;
    use crate::sim::tuning::PhysicsTuning;
    use crate::sim::world::LevelData;

    fn shared() -> SharedSimulator {
        SharedSimulator::new(Simulator::new(
            LevelData::fallback(),
            PhysicsTuning::default(),
            SimConfig::default(),
        ))
    }

    #[test]
    fn stepping_thread_and_reader_see_consistent_steps() {
        let handle = shared();
        let stepper = handle.clone();
        let fixed_step = handle.with(Simulator::fixed_step);

        let worker = thread::spawn(move || {
            let mut input = ScriptedInput::default();
            for _ in 0..30 {
                stepper.advance(fixed_step, &mut input, &mut ());
            }
        });
        for _ in 0..30 {
            let view = handle.render_view();
            assert!(view.step <= 30);
        }
        worker.join().expect("stepping thread");
        assert_eq!(handle.with(Simulator::step_index), 30);
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let handle = shared();
        let poisoner = handle.clone();
        let _ = thread::spawn(move || {
            poisoner.with_mut(|_| panic!("poison simulator lock"));
        })
        .join();

        let report = handle.advance(
            handle.with(Simulator::fixed_step),
            &mut ScriptedInput::default(),
            &mut (),
        );
        assert_eq!(report.steps_run, 1);
    }
}
