//! Right analog stick as a relative mouse.
//!
//! [`StickMouse`] owns a virtual pointer device and a background thread
//! that turns the latest stick sample into `REL_X`/`REL_Y` motion at a
//! fixed rate. While the cursor has moved recently, the right trigger and
//! right shoulder button are turned into left and right clicks.

mod curve;
mod sample;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use evdevil::event::InputEvent;

pub use curve::{adjusted_magnitude, apply_deadzone, CursorSettings, MotionTracker};
pub use sample::{AtomicStickSample, StickSample};

use crate::injector::{EvdevInjector, InjectorError};
use crate::input::event::{
    ABS_RZ, BTN_LEFT, BTN_RIGHT, BTN_TR, BUS_BLUETOOTH, EV_ABS, EV_KEY, INPUT_PROP_POINTER,
    KEY_PRESS, KEY_RELEASE, REL_X, REL_Y,
};

pub const DEVICE_NAME: &str = "Right-Stick Mouse";
/// Some apps ignore devices on the virtual bus.
const DEVICE_BUS: u16 = BUS_BLUETOOTH;
/// 0/0 marks internal devices.
const DEVICE_VENDOR: u16 = 0;
const DEVICE_PRODUCT: u16 = 0;
const DEVICE_VERSION: u16 = 1;

/// What the caller should do with an inbound event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Response {
    /// Deliver the event unmodified.
    Default,
    /// The event was consumed; drop it.
    Skip,
}

/// State touched by both the event path and the cursor thread.
struct Shared {
    stick: AtomicStickSample,
    can_click: AtomicBool,
    exiting: AtomicBool,
    injector: Mutex<EvdevInjector>,
}

impl Shared {
    fn new(injector: EvdevInjector) -> Self {
        Self {
            stick: AtomicStickSample::default(),
            can_click: AtomicBool::new(false),
            exiting: AtomicBool::new(false),
            injector: Mutex::new(injector),
        }
    }

    fn injector(&self) -> MutexGuard<'_, EvdevInjector> {
        self.injector.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn can_click(&self) -> bool {
        self.can_click.load(Ordering::Relaxed)
    }

    fn filter_event(&self, event: &InputEvent) -> Response {
        if !self.can_click() {
            return Response::Default;
        }

        let (button, value) = match (event.event_type().raw(), event.raw_code()) {
            (EV_ABS, ABS_RZ) => {
                let value = if event.raw_value() > 0 { KEY_PRESS } else { KEY_RELEASE };
                (BTN_LEFT, value)
            }
            (EV_KEY, BTN_TR) => (BTN_RIGHT, event.raw_value()),
            _ => return Response::Default,
        };

        let result = {
            let mut injector = self.injector();
            injector
                .send_key(button, value)
                .and_then(|()| injector.send_syn_report())
        };
        if let Err(e) = result {
            log::warn!("Failed to send click: {}", e);
        }

        Response::Skip
    }

    fn notify_motion_state(&self, sample: StickSample, handled: bool) {
        // Whoever handled the motion owns the stick now.
        if handled {
            self.can_click.store(false, Ordering::Relaxed);
        } else {
            self.stick.store(sample);
        }
    }
}

/// Per-thread state of the sampling loop.
struct CursorLoop {
    settings: CursorSettings,
    tracker: MotionTracker,
    active_time: Instant,
    last_error: Option<InjectorError>,
}

impl CursorLoop {
    fn new(settings: CursorSettings, now: Instant) -> Self {
        Self {
            settings,
            tracker: MotionTracker::new(),
            active_time: now,
            last_error: None,
        }
    }

    fn tick(&mut self, shared: &Shared, now: Instant) {
        let sample = shared.stick.load();
        let (dx, dy) = self.tracker.step(sample, &self.settings);

        if dx != 0 || dy != 0 {
            let result = send_motion(&mut shared.injector(), dx, dy);
            self.report(result);
            self.active_time = now;
            shared.can_click.store(true, Ordering::Relaxed);
        }

        if shared.can_click() && now.saturating_duration_since(self.active_time) > self.settings.fade {
            log::debug!("Cursor idle, releasing clicks");
            shared.can_click.store(false, Ordering::Relaxed);
            self.tracker.reset();
        }
    }

    /// Send failures are not escalated; each distinct one is logged once.
    fn report(&mut self, result: Result<(), InjectorError>) {
        if let Err(e) = result {
            if self.last_error != Some(e) {
                log::warn!("Failed to send cursor motion: {}", e);
                self.last_error = Some(e);
            }
        }
    }
}

fn send_motion(injector: &mut EvdevInjector, dx: i32, dy: i32) -> Result<(), InjectorError> {
    if dx != 0 {
        injector.send_rel(REL_X, dx)?;
    }
    if dy != 0 {
        injector.send_rel(REL_Y, dy)?;
    }
    injector.send_syn_report()
}

fn configure_device(injector: &mut EvdevInjector) -> Result<(), InjectorError> {
    injector.configure_begin(DEVICE_NAME, DEVICE_BUS, DEVICE_VENDOR, DEVICE_PRODUCT, DEVICE_VERSION)?;
    injector.configure_input_property(INPUT_PROP_POINTER)?;
    injector.configure_key(BTN_LEFT)?;
    injector.configure_key(BTN_RIGHT)?;
    injector.configure_rel(REL_X)?;
    injector.configure_rel(REL_Y)?;
    injector.configure_end()
}

fn run(shared: Arc<Shared>, settings: CursorSettings) {
    let interval = settings.tick_interval();
    let mut cursor = CursorLoop::new(settings, Instant::now());
    let mut next_tick = Instant::now();

    while !shared.exiting.load(Ordering::Relaxed) {
        cursor.tick(&shared, Instant::now());

        next_tick += interval;
        let now = Instant::now();
        if next_tick > now {
            thread::sleep(next_tick - now);
        } else {
            // Fell behind; don't try to catch up with a burst of ticks.
            next_tick = now;
        }
    }

    log::debug!("Cursor thread exiting");
}

pub struct StickMouse {
    shared: Arc<Shared>,
    settings: CursorSettings,
    registered: AtomicBool,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl StickMouse {
    /// Engine backed by a real uinput device.
    pub fn new(settings: CursorSettings) -> Self {
        Self::with_injector(EvdevInjector::new(), settings)
    }

    /// Engine over a caller-supplied injector, which must be unconfigured.
    pub fn with_injector(injector: EvdevInjector, settings: CursorSettings) -> Self {
        Self {
            shared: Arc::new(Shared::new(injector)),
            settings,
            registered: AtomicBool::new(false),
            thread: Mutex::new(None),
        }
    }

    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Whether trigger events are currently being turned into clicks.
    pub fn can_click(&self) -> bool {
        self.shared.can_click()
    }

    /// Create the virtual mouse and start the cursor thread.
    ///
    /// Failure is logged and leaves the engine unregistered.
    ///
    /// # Panics
    ///
    /// If the engine is already registered.
    pub fn register(&self) {
        let mut thread_slot = self.thread.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_registered() {
            panic!("Cannot register StickMouse twice");
        }

        if let Err(e) = configure_device(&mut self.shared.injector()) {
            log::error!("Failed to register {}: {} ({})", DEVICE_NAME, e, e.code());
            return;
        }

        let shared = Arc::clone(&self.shared);
        let settings = self.settings;
        let spawned = thread::Builder::new()
            .name("stick-mouse".into())
            .spawn(move || run(shared, settings));

        match spawned {
            Ok(handle) => {
                *thread_slot = Some(handle);
                self.registered.store(true, Ordering::Release);
                log::info!(
                    "{} registered ({} Hz, deadzone {}, speed {})",
                    DEVICE_NAME,
                    settings.update_rate_hz,
                    settings.deadzone,
                    settings.speed
                );
            }
            Err(e) => {
                log::error!("Failed to start cursor thread: {}", e);
                self.shared.injector().close();
            }
        }
    }

    /// Turn trigger events into clicks while the cursor is active.
    pub fn filter_event(&self, event: &InputEvent) -> Response {
        if !self.is_registered() {
            return Response::Default;
        }
        self.shared.filter_event(event)
    }

    /// Accept a new stick sample, or give the stick back to its original
    /// consumer when `handled` is set. Returns `false` while unregistered.
    pub fn notify_motion_state(&self, sample: StickSample, handled: bool) -> bool {
        if !self.is_registered() {
            return false;
        }
        self.shared.notify_motion_state(sample, handled);
        true
    }
}

impl Drop for StickMouse {
    fn drop(&mut self) {
        self.shared.exiting.store(true, Ordering::Relaxed);

        let handle = self
            .thread
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Cursor thread panicked");
            }
        }

        // Only after the thread is gone, so nothing writes to a closed device.
        self.shared.injector().close();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::injector::testing::RecordingUInput;
    use crate::injector::InjectorState;
    use crate::input::event::{abs_event, key_event, EV_REL, EV_SYN, SYN_REPORT};

    const TICK: Duration = Duration::from_millis(16);

    fn ready_shared() -> (Shared, RecordingUInput) {
        let fake = RecordingUInput::new();
        let mut injector = EvdevInjector::with_uinput(Box::new(fake.clone()));
        configure_device(&mut injector).unwrap();
        (Shared::new(injector), fake)
    }

    fn mouse() -> (StickMouse, RecordingUInput) {
        let fake = RecordingUInput::new();
        let injector = EvdevInjector::with_uinput(Box::new(fake.clone()));
        (StickMouse::with_injector(injector, CursorSettings::default()), fake)
    }

    #[test]
    fn test_sustained_full_deflection_emits_x_motion_with_sync() {
        let (shared, fake) = ready_shared();
        let start = Instant::now();
        let mut cursor = CursorLoop::new(CursorSettings::default(), start);
        shared.notify_motion_state(StickSample::new(1.0, 0.0), false);

        for n in 1..=17u32 {
            cursor.tick(&shared, start + TICK * n);
        }

        let events = fake.events();
        assert_eq!(events.len(), 34);
        let mut position = 0;
        for pair in events.chunks(2) {
            let (ty, code, dx) = pair[0];
            assert_eq!((ty, code), (EV_REL, REL_X));
            assert!(dx == 17 || dx == 18, "dx = {}", dx);
            assert!(position + dx > position);
            position += dx;
            assert_eq!(pair[1], (EV_SYN, SYN_REPORT, 0));
        }
        assert!(shared.can_click());
    }

    #[test]
    fn test_diagonal_motion_is_one_frame() {
        let (shared, fake) = ready_shared();
        let start = Instant::now();
        let mut cursor = CursorLoop::new(CursorSettings::default(), start);
        shared.notify_motion_state(StickSample::new(0.6, 0.6), false);

        cursor.tick(&shared, start + TICK);

        let batches = fake.batches();
        assert_eq!(batches.len(), 1);
        let frame = &batches[0];
        assert_eq!(frame.len(), 3);
        assert_eq!((frame[0].0, frame[0].1), (EV_REL, REL_X));
        assert_eq!((frame[1].0, frame[1].1), (EV_REL, REL_Y));
        assert_eq!(frame[2], (EV_SYN, SYN_REPORT, 0));
    }

    #[test]
    fn test_click_eligibility_fades_after_idle() {
        let (shared, fake) = ready_shared();
        let start = Instant::now();
        let mut cursor = CursorLoop::new(CursorSettings::default(), start);

        shared.notify_motion_state(StickSample::new(1.0, 0.0), false);
        cursor.tick(&shared, start);
        assert!(shared.can_click());

        shared.notify_motion_state(StickSample::new(0.0, 0.0), false);
        cursor.tick(&shared, start + Duration::from_secs(10));
        assert!(shared.can_click());

        cursor.tick(&shared, start + Duration::from_secs(16));
        assert!(!shared.can_click());
        assert_eq!(cursor.tracker.accumulated(), (0.0, 0.0));

        let before = fake.events().len();
        assert_eq!(shared.filter_event(&abs_event(ABS_RZ, 255)), Response::Default);
        assert_eq!(fake.events().len(), before);
    }

    #[test]
    fn test_fade_boundary_is_exclusive() {
        let (shared, _) = ready_shared();
        let start = Instant::now();
        let mut cursor = CursorLoop::new(CursorSettings::default(), start);

        shared.notify_motion_state(StickSample::new(1.0, 0.0), false);
        cursor.tick(&shared, start);
        shared.notify_motion_state(StickSample::default(), false);
        cursor.tick(&shared, start + Duration::from_secs(15));
        assert!(shared.can_click());
    }

    #[test]
    fn test_triggers_become_clicks_while_active() {
        let (shared, fake) = ready_shared();
        shared.can_click.store(true, Ordering::Relaxed);

        assert_eq!(shared.filter_event(&abs_event(ABS_RZ, 200)), Response::Skip);
        assert_eq!(shared.filter_event(&abs_event(ABS_RZ, 0)), Response::Skip);
        assert_eq!(shared.filter_event(&key_event(BTN_TR, 1)), Response::Skip);
        assert_eq!(shared.filter_event(&key_event(BTN_TR, 0)), Response::Skip);

        assert_eq!(
            fake.events(),
            vec![
                (EV_KEY, BTN_LEFT, 1),
                (EV_SYN, SYN_REPORT, 0),
                (EV_KEY, BTN_LEFT, 0),
                (EV_SYN, SYN_REPORT, 0),
                (EV_KEY, BTN_RIGHT, 1),
                (EV_SYN, SYN_REPORT, 0),
                (EV_KEY, BTN_RIGHT, 0),
                (EV_SYN, SYN_REPORT, 0),
            ]
        );
    }

    #[test]
    fn test_other_events_pass_through() {
        let (shared, fake) = ready_shared();
        shared.can_click.store(true, Ordering::Relaxed);

        assert_eq!(shared.filter_event(&abs_event(0x02, 255)), Response::Default);
        assert_eq!(shared.filter_event(&key_event(0x130, 1)), Response::Default);
        assert!(fake.events().is_empty());
    }

    #[test]
    fn test_handled_motion_clears_clicks_and_keeps_sample() {
        let (shared, _) = ready_shared();
        shared.notify_motion_state(StickSample::new(0.5, -0.5), false);
        shared.can_click.store(true, Ordering::Relaxed);

        shared.notify_motion_state(StickSample::new(1.0, 1.0), true);
        assert!(!shared.can_click());
        assert_eq!(shared.stick.load(), StickSample::new(0.5, -0.5));
    }

    #[test]
    fn test_send_failure_does_not_stop_the_loop() {
        let (shared, fake) = ready_shared();
        fake.fail_write(5);
        let start = Instant::now();
        let mut cursor = CursorLoop::new(CursorSettings::default(), start);
        shared.notify_motion_state(StickSample::new(1.0, 0.0), false);

        for n in 0..5u32 {
            cursor.tick(&shared, start + TICK * n);
        }

        assert!(fake.events().is_empty());
        assert_eq!(cursor.last_error, Some(InjectorError::Io(5)));
        assert!(shared.can_click());
    }

    #[test]
    fn test_register_declares_pointer_device() {
        let (mouse, fake) = mouse();
        mouse.register();
        assert!(mouse.is_registered());

        let created = fake.created().unwrap();
        assert_eq!(created.name, DEVICE_NAME);
        assert_eq!(created.bus, BUS_BLUETOOTH);
        assert_eq!((created.vendor, created.product, created.version), (0, 0, 1));
        assert!(created.props.contains(&(INPUT_PROP_POINTER as u8)));
        assert_eq!(created.keys.iter().copied().collect::<Vec<_>>(), vec![BTN_LEFT, BTN_RIGHT]);
        assert_eq!(created.rel_axes.iter().copied().collect::<Vec<_>>(), vec![REL_X, REL_Y]);

        drop(mouse);
        assert_eq!(fake.close_count(), 1);
    }

    #[test]
    #[should_panic(expected = "twice")]
    fn test_double_register_panics() {
        let (mouse, _) = mouse();
        mouse.register();
        mouse.register();
    }

    #[test]
    fn test_failed_register_stays_unregistered() {
        let (mouse, fake) = mouse();
        fake.fail_create(13);
        mouse.register();

        assert!(!mouse.is_registered());
        assert_eq!(mouse.shared.injector().state(), InjectorState::Closed);
        assert!(!mouse.notify_motion_state(StickSample::new(1.0, 0.0), false));
        assert_eq!(mouse.filter_event(&abs_event(ABS_RZ, 255)), Response::Default);

        // Retrying is harmless: the sticky error is logged again.
        mouse.register();
        assert!(!mouse.is_registered());
    }

    #[test]
    fn test_unregistered_engine_ignores_everything() {
        let (mouse, fake) = mouse();
        assert!(!mouse.notify_motion_state(StickSample::new(1.0, 0.0), false));
        assert_eq!(mouse.filter_event(&key_event(BTN_TR, 1)), Response::Default);
        assert!(fake.events().is_empty());
        assert_eq!(mouse.shared.stick.load(), StickSample::default());
    }

    #[test]
    fn test_registered_engine_accepts_motion() {
        let (mouse, _) = mouse();
        mouse.register();
        assert!(mouse.notify_motion_state(StickSample::new(0.05, 0.0), false));
        assert_eq!(mouse.shared.stick.load(), StickSample::new(0.05, 0.0));
        assert!(mouse.notify_motion_state(StickSample::new(0.9, 0.9), true));
        assert!(!mouse.can_click());
    }
}
