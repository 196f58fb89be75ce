use std::io;

use thiserror::Error;

/// Reported when an I/O error carries no OS code.
const EIO: i32 = 5;

/// Errors recorded by [`EvdevInjector`](super::EvdevInjector).
///
/// The injector keeps the first one in a sticky register; see
/// [`EvdevInjector::error`](super::EvdevInjector::error).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InjectorError {
    #[error("invalid device name")]
    DeviceName,
    #[error("INPUT_PROP_* code out of range")]
    PropertyRange,
    #[error("KEY_*/BTN_* code out of range")]
    KeyRange,
    #[error("ABS_* code out of range")]
    AbsRange,
    #[error("configure/send called out of order")]
    Sequencing,
    #[error("REL_* code out of range")]
    RelRange,
    #[error("uinput I/O error (errno {0})")]
    Io(i32),
}

impl InjectorError {
    /// Integer form: negative for injector errors, the errno for I/O.
    pub fn code(&self) -> i32 {
        match self {
            InjectorError::DeviceName => -1,
            InjectorError::PropertyRange => -2,
            InjectorError::KeyRange => -3,
            InjectorError::AbsRange => -4,
            InjectorError::Sequencing => -5,
            InjectorError::RelRange => -6,
            InjectorError::Io(errno) => *errno,
        }
    }
}

impl From<io::Error> for InjectorError {
    fn from(e: io::Error) -> Self {
        InjectorError::Io(e.raw_os_error().unwrap_or(EIO))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_legacy_values() {
        assert_eq!(InjectorError::DeviceName.code(), -1);
        assert_eq!(InjectorError::Sequencing.code(), -5);
        assert_eq!(InjectorError::RelRange.code(), -6);
        assert_eq!(InjectorError::Io(13).code(), 13);
    }

    #[test]
    fn test_from_io_error_keeps_errno() {
        let e: InjectorError = io::Error::from_raw_os_error(19).into();
        assert_eq!(e, InjectorError::Io(19));

        let e: InjectorError = io::Error::new(io::ErrorKind::Other, "boom").into();
        assert_eq!(e, InjectorError::Io(5));
    }
}
