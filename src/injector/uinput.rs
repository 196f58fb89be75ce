//! The kernel side of the injector.
//!
//! [`UInput`] sits just above `/dev/uinput` so tests can observe exactly
//! what would reach the kernel without creating a real device.
//!
//! Records are written one at a time but published per frame: nothing
//! reaches readers until the `SYN_REPORT` that ends it, and each frame is
//! handed to the kernel as a single batch.

use std::io;

use evdevil::event::{Abs, InputEvent, Key, Rel};
use evdevil::uinput::{AbsSetup, UinputDevice};
use evdevil::{AbsInfo, Bus, InputId, InputProp};

use super::VirtualDeviceConfig;
use crate::input::event::{EV_SYN, SYN_REPORT};

pub trait UInput: Send {
    /// Create the device from a fully declared configuration.
    fn create(&mut self, config: &VirtualDeviceConfig) -> io::Result<()>;

    /// Write raw event records to the created device. Records are held
    /// back until a `SYN_REPORT` completes their frame.
    fn write(&mut self, events: &[InputEvent]) -> io::Result<()>;

    /// Destroy the device. Must be safe to call repeatedly.
    fn close(&mut self);
}

/// Collects records until the `SYN_REPORT` that closes their frame.
#[derive(Debug, Default)]
pub struct FrameBatcher {
    pending: Vec<InputEvent>,
}

impl FrameBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `events`. Each completed frame is passed to `flush` without its
    /// terminating `SYN_REPORT`; the sink is expected to append one.
    /// A frame whose flush fails is dropped.
    pub fn feed(
        &mut self,
        events: &[InputEvent],
        mut flush: impl FnMut(&[InputEvent]) -> io::Result<()>,
    ) -> io::Result<()> {
        for ev in events {
            if ev.event_type().raw() == EV_SYN && ev.raw_code() == SYN_REPORT {
                let result = flush(&self.pending);
                self.pending.clear();
                result?;
            } else {
                self.pending.push(*ev);
            }
        }
        Ok(())
    }

    /// Records written since the last `SYN_REPORT`.
    pub fn pending(&self) -> &[InputEvent] {
        &self.pending
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

/// Production [`UInput`] backed by evdevil's uinput support.
#[derive(Default)]
pub struct EvdevilUInput {
    device: Option<UinputDevice>,
    batcher: FrameBatcher,
}

impl EvdevilUInput {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UInput for EvdevilUInput {
    fn create(&mut self, config: &VirtualDeviceConfig) -> io::Result<()> {
        let mut builder = UinputDevice::builder()?.with_input_id(InputId::new(
            Bus::from_raw(config.bus),
            config.vendor,
            config.product,
            config.version,
        ))?;

        if !config.props.is_empty() {
            builder = builder.with_props(config.props.iter().map(|&p| InputProp::from_raw(p.into())))?;
        }
        if !config.keys.is_empty() {
            builder = builder.with_keys(config.keys.iter().map(|&k| Key::from_raw(k)))?;
        }
        if !config.rel_axes.is_empty() {
            builder = builder.with_rel_axes(config.rel_axes.iter().map(|&r| Rel::from_raw(r)))?;
        }
        if !config.abs_axes.is_empty() {
            let axes: Vec<AbsSetup> = config
                .abs_axes
                .iter()
                .map(|(&code, range)| {
                    AbsSetup::new(
                        Abs::from_raw(code),
                        AbsInfo::new(range.min, range.max)
                            .with_fuzz(range.fuzz)
                            .with_flat(range.flat),
                    )
                })
                .collect();
            builder = builder.with_abs_axes(axes)?;
        }

        let device = builder.build(&config.name)?;
        if let Ok(name) = device.sysname() {
            log::info!(
                "{} ready: /sys/devices/virtual/input/{}",
                config.name,
                name.to_string_lossy()
            );
        }

        self.device = Some(device);
        Ok(())
    }

    fn write(&mut self, events: &[InputEvent]) -> io::Result<()> {
        let Some(device) = &self.device else {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "uinput device not created"));
        };
        // write_events terminates the batch with its own SYN_REPORT.
        self.batcher.feed(events, |frame| device.write_events(frame))
    }

    fn close(&mut self) {
        // Dropping the handle issues UI_DEV_DESTROY.
        self.device = None;
        self.batcher.clear();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn raw(ev: &InputEvent) -> (u16, u16, i32) {
        (ev.event_type().raw(), ev.raw_code(), ev.raw_value())
    }

    #[derive(Default)]
    struct Recorded {
        created: Option<VirtualDeviceConfig>,
        events: Vec<(u16, u16, i32)>,
        batcher: FrameBatcher,
        batches: Vec<Vec<(u16, u16, i32)>>,
        close_count: usize,
        fail_create: Option<i32>,
        fail_write: Option<i32>,
    }

    /// [`UInput`] that records everything instead of touching the kernel.
    /// Clones share the same record.
    #[derive(Clone, Default)]
    pub struct RecordingUInput {
        inner: Arc<Mutex<Recorded>>,
    }

    impl RecordingUInput {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn created(&self) -> Option<VirtualDeviceConfig> {
            self.inner.lock().unwrap().created.clone()
        }

        pub fn events(&self) -> Vec<(u16, u16, i32)> {
            self.inner.lock().unwrap().events.clone()
        }

        /// Frames as the kernel would publish them, each ending in one
        /// `SYN_REPORT`.
        pub fn batches(&self) -> Vec<Vec<(u16, u16, i32)>> {
            self.inner.lock().unwrap().batches.clone()
        }

        pub fn close_count(&self) -> usize {
            self.inner.lock().unwrap().close_count
        }

        pub fn fail_create(&self, errno: i32) {
            self.inner.lock().unwrap().fail_create = Some(errno);
        }

        pub fn fail_write(&self, errno: i32) {
            self.inner.lock().unwrap().fail_write = Some(errno);
        }

        pub fn clear_failures(&self) {
            let mut inner = self.inner.lock().unwrap();
            inner.fail_create = None;
            inner.fail_write = None;
        }
    }

    impl UInput for RecordingUInput {
        fn create(&mut self, config: &VirtualDeviceConfig) -> io::Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(errno) = inner.fail_create {
                return Err(io::Error::from_raw_os_error(errno));
            }
            inner.created = Some(config.clone());
            Ok(())
        }

        fn write(&mut self, events: &[InputEvent]) -> io::Result<()> {
            let mut inner = self.inner.lock().unwrap();
            if let Some(errno) = inner.fail_write {
                return Err(io::Error::from_raw_os_error(errno));
            }
            inner.events.extend(events.iter().map(raw));

            let Recorded { batcher, batches, .. } = &mut *inner;
            batcher.feed(events, |frame| {
                let mut batch: Vec<_> = frame.iter().map(raw).collect();
                batch.push((EV_SYN, SYN_REPORT, 0));
                batches.push(batch);
                Ok(())
            })
        }

        fn close(&mut self) {
            self.inner.lock().unwrap().close_count += 1;
        }
    }
}
