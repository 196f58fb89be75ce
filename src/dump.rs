//! Dump raw input events from the gamepad for debugging.
//! Run: stick-mouse dump  to stream and print events.

use std::path::Path;

use evdevil::Evdev;

use crate::input::event::code_name;

pub fn run_dump(device: &Path) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let evdev = Evdev::open(device)?;
    eprintln!(
        "Dumping events from {} ({}) (Ctrl+C to stop):\n",
        evdev.name()?,
        device.display()
    );
    for (n, ev) in evdev.raw_events().enumerate() {
        let ev = ev?;
        let name = code_name(ev.event_type().raw(), ev.raw_code());
        println!("{:6}  {}  value={}", n + 1, name, ev.raw_value());
    }
    Ok(())
}
