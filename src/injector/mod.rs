//! Simulated evdev input device.
//!
//! [`EvdevInjector`] wraps a uinput device behind a strict two-phase
//! protocol: declare capabilities between [`configure_begin`] and
//! [`configure_end`], then send events. Calls made in the wrong phase fail
//! with [`InjectorError::Sequencing`] instead of reaching the kernel.
//!
//! The injector keeps a sticky error, similar to `errno`: the first
//! failure is recorded and every later configure/send call becomes a no-op
//! returning that same error until [`reset_error`] is called. Callers can
//! run a batch of operations and check [`error`] once at the end.
//!
//! [`configure_begin`]: EvdevInjector::configure_begin
//! [`configure_end`]: EvdevInjector::configure_end
//! [`reset_error`]: EvdevInjector::reset_error
//! [`error`]: EvdevInjector::error

mod error;
mod uinput;

use std::collections::{BTreeMap, BTreeSet};

pub use error::InjectorError;
pub use uinput::{EvdevilUInput, UInput};

#[cfg(test)]
pub(crate) use uinput::testing;

use crate::input::event::{
    raw_event, ABS_MAX, ABS_MT_POSITION_X, ABS_MT_POSITION_Y, ABS_MT_SLOT, ABS_MT_TRACKING_ID,
    EV_ABS, EV_KEY, EV_REL, EV_SYN, INPUT_PROP_MAX, KEY_MAX, REL_MAX, SYN_REPORT,
    UINPUT_MAX_NAME_SIZE,
};

/// Lifecycle phase of an [`EvdevInjector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectorState {
    Uninitialized,
    Configuring,
    Ready,
    Closed,
}

/// Value range declared for one absolute axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbsRange {
    pub min: i32,
    pub max: i32,
    pub fuzz: i32,
    pub flat: i32,
}

/// Everything the kernel is told about the device at creation time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualDeviceConfig {
    pub name: String,
    pub bus: u16,
    pub vendor: u16,
    pub product: u16,
    pub version: u16,
    /// `EV_*` categories enabled so far.
    pub event_types: BTreeSet<u16>,
    pub props: BTreeSet<u8>,
    pub keys: BTreeSet<u16>,
    pub rel_axes: BTreeSet<u16>,
    pub abs_axes: BTreeMap<u16, AbsRange>,
}

pub struct EvdevInjector {
    uinput: Box<dyn UInput>,
    state: InjectorState,
    error: Option<InjectorError>,
    config: VirtualDeviceConfig,
    latest_slot: Option<i32>,
}

impl Default for EvdevInjector {
    fn default() -> Self {
        Self::new()
    }
}

impl EvdevInjector {
    /// Injector that talks to the real `/dev/uinput`.
    pub fn new() -> Self {
        Self::with_uinput(Box::new(EvdevilUInput::new()))
    }

    /// Injector over a caller-supplied [`UInput`].
    pub fn with_uinput(uinput: Box<dyn UInput>) -> Self {
        Self {
            uinput,
            state: InjectorState::Uninitialized,
            error: None,
            config: VirtualDeviceConfig::default(),
            latest_slot: None,
        }
    }

    pub fn state(&self) -> InjectorState {
        self.state
    }

    /// The first error recorded since the last reset.
    pub fn error(&self) -> Option<InjectorError> {
        self.error
    }

    pub fn reset_error(&mut self) {
        self.error = None;
    }

    /// Device declaration accumulated so far.
    pub fn config(&self) -> &VirtualDeviceConfig {
        &self.config
    }

    /// Release the device. Safe from any state, any number of times.
    pub fn close(&mut self) {
        if self.state != InjectorState::Closed {
            self.uinput.close();
            self.state = InjectorState::Closed;
        }
    }

    /// Set the basic device identity; must be the first configure call.
    pub fn configure_begin(
        &mut self,
        device_name: &str,
        bus: u16,
        vendor: u16,
        product: u16,
        version: u16,
    ) -> Result<(), InjectorError> {
        log::debug!(
            "configure_begin: {} bus={:#x} vendor={:#06x} product={:#06x} version={}",
            device_name,
            bus,
            vendor,
            product,
            version
        );
        self.require_state(InjectorState::Uninitialized)?;

        // The kernel field is NUL-terminated.
        if device_name.is_empty()
            || device_name.len() >= UINPUT_MAX_NAME_SIZE
            || device_name.contains('\0')
        {
            return Err(self.record(InjectorError::DeviceName));
        }

        self.config.name = device_name.to_string();
        self.config.bus = bus;
        self.config.vendor = vendor;
        self.config.product = product;
        self.config.version = version;
        self.state = InjectorState::Configuring;
        Ok(())
    }

    /// Declare an `INPUT_PROP_*` property.
    pub fn configure_input_property(&mut self, property: u16) -> Result<(), InjectorError> {
        self.check_configure(property <= INPUT_PROP_MAX, InjectorError::PropertyRange)?;
        self.config.props.insert(property as u8);
        Ok(())
    }

    /// Declare a `KEY_*` or `BTN_*` code.
    pub fn configure_key(&mut self, key: u16) -> Result<(), InjectorError> {
        self.check_configure(key <= KEY_MAX, InjectorError::KeyRange)?;
        self.enable_event_type(EV_KEY);
        self.config.keys.insert(key);
        Ok(())
    }

    /// Declare an `ABS_*` axis with its value range.
    pub fn configure_abs(
        &mut self,
        abs_type: u16,
        min: i32,
        max: i32,
        fuzz: i32,
        flat: i32,
    ) -> Result<(), InjectorError> {
        self.check_configure(abs_type <= ABS_MAX, InjectorError::AbsRange)?;
        self.enable_event_type(EV_ABS);
        self.config
            .abs_axes
            .insert(abs_type, AbsRange { min, max, fuzz, flat });
        Ok(())
    }

    /// Declare the number of multitouch slots.
    pub fn configure_abs_slots(&mut self, slots: i32) -> Result<(), InjectorError> {
        self.configure_abs(ABS_MT_SLOT, 0, slots, 0, 0)
    }

    /// Declare the multitouch coordinate rectangle.
    pub fn configure_multi_touch_xy(
        &mut self,
        x0: i32,
        y0: i32,
        x1: i32,
        y1: i32,
    ) -> Result<(), InjectorError> {
        self.configure_abs(ABS_MT_POSITION_X, x0, x1, 0, 0)?;
        self.configure_abs(ABS_MT_POSITION_Y, y0, y1, 0, 0)
    }

    /// Declare a `REL_*` axis.
    pub fn configure_rel(&mut self, rel_type: u16) -> Result<(), InjectorError> {
        self.check_configure(rel_type <= REL_MAX, InjectorError::RelRange)?;
        self.enable_event_type(EV_REL);
        self.config.rel_axes.insert(rel_type);
        Ok(())
    }

    /// Create the device in the kernel.
    ///
    /// On failure the injector is closed; nothing further will succeed.
    pub fn configure_end(&mut self) -> Result<(), InjectorError> {
        self.require_state(InjectorState::Configuring)?;

        if let Err(e) = self.uinput.create(&self.config) {
            self.uinput.close();
            self.state = InjectorState::Closed;
            return Err(self.record(e.into()));
        }

        log::debug!("{} created", self.config.name);
        self.state = InjectorState::Ready;
        Ok(())
    }

    /// Write a single event record. Nothing is visible to readers until
    /// the next [`send_syn_report`](Self::send_syn_report).
    pub fn send(&mut self, ty: u16, code: u16, value: i32) -> Result<(), InjectorError> {
        self.require_state(InjectorState::Ready)?;
        self.uinput
            .write(&[raw_event(ty, code, value)])
            .map_err(|e| self.record(e.into()))
    }

    pub fn send_syn_report(&mut self) -> Result<(), InjectorError> {
        self.send(EV_SYN, SYN_REPORT, 0)
    }

    pub fn send_key(&mut self, code: u16, value: i32) -> Result<(), InjectorError> {
        self.send(EV_KEY, code, value)
    }

    pub fn send_abs(&mut self, code: u16, value: i32) -> Result<(), InjectorError> {
        self.send(EV_ABS, code, value)
    }

    pub fn send_rel(&mut self, code: u16, value: i32) -> Result<(), InjectorError> {
        self.send(EV_REL, code, value)
    }

    /// Select a multitouch slot, skipping the write if already selected.
    pub fn send_multi_touch_slot(&mut self, slot: i32) -> Result<(), InjectorError> {
        if self.latest_slot != Some(slot) {
            self.send_abs(ABS_MT_SLOT, slot)?;
            self.latest_slot = Some(slot);
        }
        Ok(())
    }

    pub fn send_multi_touch_xy(
        &mut self,
        slot: i32,
        id: i32,
        x: i32,
        y: i32,
    ) -> Result<(), InjectorError> {
        self.send_multi_touch_slot(slot)?;
        self.send_abs(ABS_MT_TRACKING_ID, id)?;
        self.send_abs(ABS_MT_POSITION_X, x)?;
        self.send_abs(ABS_MT_POSITION_Y, y)
    }

    pub fn send_multi_touch_lift(&mut self, slot: i32) -> Result<(), InjectorError> {
        self.send_multi_touch_slot(slot)?;
        self.send_abs(ABS_MT_TRACKING_ID, -1)
    }

    /// Store `e` unless an earlier error is already held.
    fn record(&mut self, e: InjectorError) -> InjectorError {
        *self.error.get_or_insert(e)
    }

    fn require_state(&mut self, state: InjectorState) -> Result<(), InjectorError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        if self.state != state {
            return Err(self.record(InjectorError::Sequencing));
        }
        Ok(())
    }

    fn check_configure(&mut self, in_range: bool, range_error: InjectorError) -> Result<(), InjectorError> {
        self.require_state(InjectorState::Configuring)?;
        if !in_range {
            return Err(self.record(range_error));
        }
        Ok(())
    }

    fn enable_event_type(&mut self, ty: u16) {
        if self.config.event_types.insert(ty) {
            log::trace!("enabled event type {:#x}", ty);
        }
    }
}

impl Drop for EvdevInjector {
    fn drop(&mut self) {
        self.close();
    }
}
