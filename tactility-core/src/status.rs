//! Kernel status codes returned by the port layer.
//!
//! The port reports every operation with a [`Status`]. The public wrappers
//! translate it into `bool`, `Option` or a typed error at their boundary, so
//! raw codes rarely escape this crate.
//!
//! # Usage
//!
//! ```
//! use tactility_core::status::{KernelResult, Status};
//!
//! fn check(code: i32) -> KernelResult<()> {
//!     Status::from_code(code).into_result()
//! }
//!
//! assert!(check(0).is_ok());
//! assert_eq!(check(-2), Err(Status::ErrorTimeout));
//! ```
//!
//! # Codes
//!
//! | Code | Variant        | Description                                  |
//! |------|----------------|----------------------------------------------|
//! | 0    | Ok             | Operation completed successfully             |
//! | -1   | Error          | Unspecified error                            |
//! | -2   | ErrorTimeout   | Timeout elapsed before the operation succeeded |
//! | -3   | ErrorResource  | Resource not available (non-blocking attempt) |
//! | -4   | ErrorParameter | Invalid parameter                            |
//! | -5   | ErrorNoMemory  | Out of memory or queue capacity              |
//! | -6   | ErrorIsr       | Not allowed in interrupt context             |

/// Kernel status codes.
///
/// The discriminants match the `TtStatus` values used by the C API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Operation completed successfully
    Ok = 0,
    /// Unspecified error
    Error = -1,
    /// Timeout elapsed before the operation could complete
    ErrorTimeout = -2,
    /// Resource not available
    ErrorResource = -3,
    /// Invalid parameter
    ErrorParameter = -4,
    /// Out of memory or queue capacity
    ErrorNoMemory = -5,
    /// Operation not allowed in interrupt context
    ErrorIsr = -6,
    /// Unknown code (forward compatibility)
    Unknown = 0x7FFF_FFFF,
}

impl Status {
    /// Convert a raw status code to `Status`.
    ///
    /// Unknown codes map to [`Status::Unknown`].
    #[inline]
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Status::Ok,
            -1 => Status::Error,
            -2 => Status::ErrorTimeout,
            -3 => Status::ErrorResource,
            -4 => Status::ErrorParameter,
            -5 => Status::ErrorNoMemory,
            -6 => Status::ErrorIsr,
            _ => Status::Unknown,
        }
    }

    /// Returns `true` if this status indicates success.
    #[inline]
    pub const fn is_ok(self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Returns `true` if this status indicates an error.
    #[inline]
    pub const fn is_error(self) -> bool {
        !self.is_ok()
    }

    /// Convert to `Result<(), Status>`.
    #[inline]
    pub const fn into_result(self) -> KernelResult<()> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Get the raw numeric code.
    #[inline]
    pub const fn code(self) -> i32 {
        self as i32
    }

    /// Get a human-readable description of the status.
    pub const fn description(self) -> &'static str {
        match self {
            Status::Ok => "operation completed successfully",
            Status::Error => "unspecified error",
            Status::ErrorTimeout => "timeout elapsed",
            Status::ErrorResource => "resource not available",
            Status::ErrorParameter => "invalid parameter",
            Status::ErrorNoMemory => "out of memory",
            Status::ErrorIsr => "not allowed in interrupt context",
            Status::Unknown => "unknown status code",
        }
    }
}

impl From<i32> for Status {
    #[inline]
    fn from(code: i32) -> Self {
        Status::from_code(code)
    }
}

impl From<Status> for i32 {
    #[inline]
    fn from(status: Status) -> Self {
        status.code()
    }
}

impl core::fmt::Display for Status {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.description())
    }
}

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, Status>;

/// Status of a blocking attempt that did not succeed.
///
/// A zero timeout means the caller only polled, so the resource was simply
/// unavailable; any other timeout means the wait ran out.
#[inline]
pub(crate) const fn unavailable(timeout: crate::kernel::TickType) -> Status {
    if timeout == 0 {
        Status::ErrorResource
    } else {
        Status::ErrorTimeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_code() {
        assert_eq!(Status::from_code(0), Status::Ok);
        assert_eq!(Status::from_code(-2), Status::ErrorTimeout);
        assert_eq!(Status::from_code(-3), Status::ErrorResource);
        assert_eq!(Status::from_code(-6), Status::ErrorIsr);
        assert_eq!(Status::from_code(42), Status::Unknown);
    }

    #[test]
    fn test_is_ok() {
        assert!(Status::Ok.is_ok());
        assert!(!Status::ErrorTimeout.is_ok());
        assert!(Status::Unknown.is_error());
    }

    #[test]
    fn test_into_result() {
        assert!(Status::Ok.into_result().is_ok());
        assert_eq!(
            Status::ErrorNoMemory.into_result(),
            Err(Status::ErrorNoMemory)
        );
    }

    #[test]
    fn test_unavailable_depends_on_timeout() {
        assert_eq!(unavailable(0), Status::ErrorResource);
        assert_eq!(unavailable(5), Status::ErrorTimeout);
    }
}
