//! Entry points called by whatever delivers input to this process.
//!
//! [`InputHook`] checks each request against the [`DeviceDb`] and forwards
//! the rest to the [`StickMouse`]. All methods take `&self` and may be
//! called concurrently.

use evdevil::event::InputEvent;

use crate::cursor::{Response, StickMouse, StickSample};
use crate::device_db::DeviceDb;

/// Identity of a physical input device as reported on arrival.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputIdentifier {
    pub name: String,
    pub vendor: u16,
    pub product: u16,
    pub unique_id: String,
}

pub struct InputHook {
    devices: DeviceDb,
    mouse: StickMouse,
}

impl InputHook {
    pub fn new(mouse: StickMouse) -> Self {
        Self {
            devices: DeviceDb::new(),
            mouse,
        }
    }

    /// Create the virtual devices. Call once before feeding events.
    pub fn register_devices(&self) {
        log::info!("Registering devices");
        self.mouse.register();
    }

    /// Record a newly attached device. Returns whether it was accepted.
    ///
    /// `identifier` is `None` when the device could not be opened or
    /// queried; such a device is rejected and any earlier device under the
    /// same id is forgotten.
    pub fn filter_new_device(&self, id: i32, path: &str, identifier: Option<&InputIdentifier>) -> bool {
        let Some(identifier) = identifier else {
            log::warn!("Rejecting device {} at {}: no usable handle", id, path);
            self.devices.remove_device(id);
            return false;
        };

        log::info!(
            "New device {}: {} ({:04x}:{:04x}) at {}",
            id,
            identifier.name,
            identifier.vendor,
            identifier.product,
            path
        );
        self.devices.add_device(id, identifier.vendor, identifier.product);
        true
    }

    pub fn filter_close_device(&self, id: i32) {
        log::info!("Device {} closed", id);
        self.devices.remove_device(id);
    }

    pub fn filter_event(&self, event: &InputEvent, device_id: i32) -> Response {
        if self.devices.get(device_id).blacklisted {
            return Response::Default;
        }
        self.mouse.filter_event(event)
    }

    /// Key state notifications are not used.
    pub fn notify_key_state(&self, _device_id: i32, _key_code: i32, _handled: bool) -> bool {
        false
    }

    pub fn notify_motion_state(&self, device_id: i32, sample: StickSample, handled: bool) -> bool {
        if self.devices.get(device_id).blacklisted {
            return false;
        }
        self.mouse.notify_motion_state(sample, handled)
    }

    pub fn treat_mouse_as_touch(&self) -> bool {
        false
    }

    pub fn mouse(&self) -> &StickMouse {
        &self.mouse
    }
}
