use evdevil::event::{EventType, InputEvent};

pub const EV_SYN: u16 = 0x00;
pub const EV_KEY: u16 = 0x01;
pub const EV_REL: u16 = 0x02;
pub const EV_ABS: u16 = 0x03;
pub const SYN_REPORT: u16 = 0;

pub const REL_X: u16 = 0x00;
pub const REL_Y: u16 = 0x01;
pub const REL_MAX: u16 = 0x0f;

pub const ABS_RX: u16 = 0x03;
pub const ABS_RY: u16 = 0x04;
pub const ABS_RZ: u16 = 0x05;
pub const ABS_MT_SLOT: u16 = 0x2f;
pub const ABS_MT_POSITION_X: u16 = 0x35;
pub const ABS_MT_POSITION_Y: u16 = 0x36;
pub const ABS_MT_TRACKING_ID: u16 = 0x39;
pub const ABS_MAX: u16 = 0x3f;

pub const BTN_LEFT: u16 = 0x110;
pub const BTN_RIGHT: u16 = 0x111;
pub const BTN_TR: u16 = 0x137;
pub const BTN_THUMBR: u16 = 0x13e;
pub const KEY_MAX: u16 = 0x2ff;

pub const INPUT_PROP_POINTER: u16 = 0x00;
pub const INPUT_PROP_MAX: u16 = 0x1f;

pub const BUS_BLUETOOTH: u16 = 0x05;

/// `UINPUT_MAX_NAME_SIZE` including the trailing NUL.
pub const UINPUT_MAX_NAME_SIZE: usize = 80;

/// Key event values; `<linux/input.h>` leaves these unnamed.
pub const KEY_RELEASE: i32 = 0;
pub const KEY_PRESS: i32 = 1;

pub fn raw_event(ty: u16, code: u16, value: i32) -> InputEvent {
    InputEvent::new(EventType::from_raw(ty), code, value)
}

pub fn key_event(code: u16, value: i32) -> InputEvent {
    raw_event(EV_KEY, code, value)
}

pub fn abs_event(code: u16, value: i32) -> InputEvent {
    raw_event(EV_ABS, code, value)
}

/// Human-readable name for the event codes this tool cares about.
pub fn code_name(ty: u16, code: u16) -> String {
    match ty {
        EV_SYN => "SYN_REPORT".to_string(),
        EV_KEY => match code {
            BTN_LEFT => "BTN_LEFT".to_string(),
            BTN_RIGHT => "BTN_RIGHT".to_string(),
            BTN_TR => "BTN_TR".to_string(),
            BTN_THUMBR => "BTN_THUMBR".to_string(),
            _ => format!("KEY/{}", code),
        },
        EV_REL => match code {
            REL_X => "REL_X".to_string(),
            REL_Y => "REL_Y".to_string(),
            _ => format!("REL/{}", code),
        },
        EV_ABS => {
            let abs = match code {
                0x00 => "X",
                0x01 => "Y",
                0x02 => "Z",
                ABS_RX => "RX",
                ABS_RY => "RY",
                ABS_RZ => "RZ",
                0x10 => "HAT0X",
                0x11 => "HAT0Y",
                _ => "?",
            };
            format!("ABS_{}({})", abs, code)
        }
        _ => format!("type{} code{}", ty, code),
    }
}
