//! Stick-to-velocity curve and sub-pixel accumulation.

use std::time::Duration;

use super::sample::StickSample;

/// Tuning for the cursor emulation loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorSettings {
    /// Ticks per second of the sampling loop.
    pub update_rate_hz: u32,
    pub deadzone: f32,
    /// Exponent of the velocity curve.
    pub power: f32,
    /// Pixels per tick at full deflection, before the curve is applied.
    pub speed: f32,
    /// Idle time after which clicks stop being intercepted. Should match the
    /// pointer fade-out time of the display stack.
    pub fade: Duration,
}

impl Default for CursorSettings {
    fn default() -> Self {
        Self {
            update_rate_hz: 60,
            deadzone: 0.1,
            power: 3.0,
            speed: 27.0,
            fade: Duration::from_secs(15),
        }
    }
}

impl CursorSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(1) / self.update_rate_hz.max(1)
    }
}

/// Push values inside the deadzone out to its edge, keeping their sign.
/// Zero goes to the positive edge.
pub fn apply_deadzone(value: f32, deadzone: f32) -> f32 {
    if (0.0..deadzone).contains(&value) {
        return deadzone;
    }
    if value < 0.0 && value > -deadzone {
        return -deadzone;
    }
    value
}

/// Distance of `value` past the deadzone edge; zero anywhere inside it.
pub fn adjusted_magnitude(value: f32, deadzone: f32) -> f32 {
    let value = if value.is_finite() { value } else { 0.0 };
    apply_deadzone(value, deadzone).abs() - deadzone
}

/// Per-axis fractional pixel residue.
///
/// Velocities are accumulated in full precision and only the change in the
/// rounded total is emitted, so rounding never biases the cursor in one
/// direction.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MotionTracker {
    accum_x: f64,
    accum_y: f64,
}

impl MotionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one tick and return the whole-pixel `(dx, dy)` to emit.
    pub fn step(&mut self, sample: StickSample, settings: &CursorSettings) -> (i32, i32) {
        let deadzone = settings.deadzone;
        let adjusted_x = adjusted_magnitude(sample.x, deadzone);
        let adjusted_y = adjusted_magnitude(sample.y, deadzone);

        let combined = (adjusted_x + adjusted_y).min(1.0 - deadzone);
        let combined_pow = combined.powf(settings.power);

        let mut dx = 0;
        if adjusted_x != 0.0 {
            let velocity = axis_velocity(sample.x, adjusted_x, combined_pow, settings.speed);
            dx = advance(&mut self.accum_x, velocity);
        }

        let mut dy = 0;
        if adjusted_y != 0.0 {
            let velocity = axis_velocity(sample.y, adjusted_y, combined_pow, settings.speed);
            dy = advance(&mut self.accum_y, velocity);
        }

        (dx, dy)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn accumulated(&self) -> (f64, f64) {
        (self.accum_x, self.accum_y)
    }
}

fn axis_velocity(raw: f32, adjusted: f32, combined_pow: f32, speed: f32) -> f32 {
    let speed = if raw > 0.0 { speed } else { -speed };
    combined_pow * adjusted * speed
}

fn advance(accum: &mut f64, velocity: f32) -> i32 {
    let next = *accum + f64::from(velocity);
    let delta = next.round() as i32 - accum.round() as i32;
    *accum = next;
    delta
}
