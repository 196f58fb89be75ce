//! Feeds a local gamepad's evdev stream into an [`InputHook`].
//!
//! The gamepad is read passively (not grabbed), so a `Skip` decision only
//! means the click was also delivered through the virtual mouse.

use std::io;
use std::path::Path;

use evdevil::event::InputEvent;
use evdevil::Evdev;

use crate::config::Config;
use crate::cursor::{Response, StickSample};
use crate::hook::{InputHook, InputIdentifier};
use crate::input::event::{code_name, ABS_RX, ABS_RY, EV_ABS, EV_SYN, SYN_REPORT};

/// Id the bridged gamepad is registered under.
pub const DEVICE_ID: i32 = 1;

/// Collects right-stick axis updates until the frame's `SYN_REPORT`.
#[derive(Debug, Default)]
pub struct StickFrame {
    x: f32,
    y: f32,
    dirty: bool,
}

impl StickFrame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw event; returns the stick position when a frame that
    /// moved the stick is complete.
    pub fn push(&mut self, ty: u16, code: u16, value: i32, config: &Config) -> Option<StickSample> {
        match (ty, code) {
            (EV_ABS, ABS_RX) => {
                self.x = config.normalize_axis(value);
                self.dirty = true;
                None
            }
            (EV_ABS, ABS_RY) => {
                self.y = config.normalize_axis(value);
                self.dirty = true;
                None
            }
            (EV_SYN, SYN_REPORT) if self.dirty => {
                self.dirty = false;
                Some(StickSample::new(self.x, self.y))
            }
            _ => None,
        }
    }
}

pub fn run(config: &Config, hook: &InputHook) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let path = config.device.to_string_lossy();

    let (device, identifier) = match open_gamepad(&config.device) {
        Ok(opened) => opened,
        Err(e) => {
            hook.filter_new_device(DEVICE_ID, &path, None);
            return Err(format!("{}: {}", config.device.display(), e).into());
        }
    };

    if !hook.filter_new_device(DEVICE_ID, &path, Some(&identifier)) {
        return Err(format!("{} was rejected", config.device.display()).into());
    }

    log::info!("Forwarding {} ({})", identifier.name, config.device.display());
    let result = forward_events(device.raw_events(), config, hook);
    hook.filter_close_device(DEVICE_ID);
    result
}

/// Open an evdev node and read its identity.
pub fn open_gamepad(path: &Path) -> io::Result<(Evdev, InputIdentifier)> {
    let device = Evdev::open(path)?;
    let identifier = identify(&device)?;
    Ok((device, identifier))
}

pub fn identify(device: &Evdev) -> io::Result<InputIdentifier> {
    let id = device.input_id()?;
    Ok(InputIdentifier {
        name: device.name()?,
        vendor: id.vendor(),
        product: id.product(),
        unique_id: device.unique_id()?.unwrap_or_default(),
    })
}

/// Pass every event to the hook until the stream ends or fails.
pub fn forward_events(
    events: impl IntoIterator<Item = io::Result<InputEvent>>,
    config: &Config,
    hook: &InputHook,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut frame = StickFrame::new();
    let mut event_count: u64 = 0;

    for ev in events {
        let ev = ev?;
        let ty = ev.event_type().raw();
        let code = ev.raw_code();
        let value = ev.raw_value();

        if hook.filter_event(&ev, DEVICE_ID) == Response::Skip {
            log::trace!("Consumed {} value={}", code_name(ty, code), value);
        }

        if let Some(sample) = frame.push(ty, code, value, config) {
            hook.notify_motion_state(DEVICE_ID, sample, false);
        }

        if event_count == 0 {
            log::info!("Gamepad events flowing");
        }
        event_count += 1;
        if event_count.is_multiple_of(10_000) {
            log::debug!("Gamepad events read: {}", event_count);
        }
    }

    log::info!("Gamepad stream ended after {} events", event_count);
    Ok(())
}
