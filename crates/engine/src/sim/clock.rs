use std::time::Duration;

/// How many fixed steps one `advance` call owes, and what is left over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StepPlan {
    pub steps_to_run: u32,
    pub remaining_accumulator: Duration,
    pub dropped_backlog: Duration,
}

pub(crate) fn plan_steps(
    mut accumulator: Duration,
    fixed_step: Duration,
    max_steps_per_advance: u32,
) -> StepPlan {
    let mut steps_to_run = 0u32;

    while accumulator >= fixed_step && steps_to_run < max_steps_per_advance {
        accumulator = accumulator.saturating_sub(fixed_step);
        steps_to_run = steps_to_run.saturating_add(1);
    }

    if accumulator >= fixed_step {
        StepPlan {
            steps_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            steps_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

pub(crate) fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

pub(crate) fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

/// Wall-clock accumulator feeding fixed steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FixedStepClock {
    fixed_step: Duration,
    max_frame_delta: Duration,
    max_steps_per_advance: u32,
    accumulator: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ClockTick {
    pub steps_to_run: u32,
    pub clamped: bool,
    pub dropped_backlog: Duration,
}

impl FixedStepClock {
    pub(crate) fn new(
        fixed_step: Duration,
        max_frame_delta: Duration,
        max_steps_per_advance: u32,
    ) -> Self {
        Self {
            fixed_step,
            max_frame_delta,
            max_steps_per_advance: max_steps_per_advance.max(1),
            accumulator: Duration::ZERO,
        }
    }

    pub(crate) fn fixed_step(&self) -> Duration {
        self.fixed_step
    }

    pub(crate) fn accumulator(&self) -> Duration {
        self.accumulator
    }

    pub(crate) fn reset(&mut self) {
        self.accumulator = Duration::ZERO;
    }

    pub(crate) fn tick(&mut self, frame_dt: Duration) -> ClockTick {
        let clamped_dt = clamp_frame_delta(frame_dt, self.max_frame_delta);
        let plan = plan_steps(
            self.accumulator.saturating_add(clamped_dt),
            self.fixed_step,
            self.max_steps_per_advance,
        );
        self.accumulator = plan.remaining_accumulator;
        ClockTick {
            steps_to_run: plan.steps_to_run,
            clamped: clamped_dt < frame_dt,
            dropped_backlog: plan.dropped_backlog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_steps_runs_expected_steps_without_drop() {
        let result = plan_steps(Duration::from_millis(48), Duration::from_millis(16), 5);
        assert_eq!(result.steps_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_steps_drops_backlog_when_step_cap_hit() {
        let result = plan_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.steps_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn clock_carries_remainder_between_ticks() {
        let mut clock = FixedStepClock::new(
            Duration::from_millis(10),
            Duration::from_millis(250),
            16,
        );
        assert_eq!(clock.tick(Duration::from_millis(15)).steps_to_run, 1);
        assert_eq!(clock.accumulator(), Duration::from_millis(5));
        assert_eq!(clock.tick(Duration::from_millis(5)).steps_to_run, 1);
        assert_eq!(clock.accumulator(), Duration::ZERO);
    }

    #[test]
    fn long_pause_is_clamped_to_the_frame_cap() {
        let mut clock = FixedStepClock::new(
            Duration::from_millis(10),
            Duration::from_millis(250),
            100,
        );
        let tick = clock.tick(Duration::from_secs(5));
        assert!(tick.clamped);
        assert_eq!(tick.steps_to_run, 25);
        assert_eq!(tick.dropped_backlog, Duration::ZERO);
    }
}
