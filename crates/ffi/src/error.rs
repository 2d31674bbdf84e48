use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;
use std::ptr;

/// Common interface for errors that cross the FFI boundary.
///
/// - `code()` is what the C caller receives as the return value
/// - `msg()` is what `flood_sim_get_last_error` hands back afterwards
pub(crate) trait FloodSimError {
    /// Returns the error code to be returned across the FFI boundary.
    fn code(&self) -> FloodSimErrorCode;

    /// Returns the human-readable error message.
    fn msg(&self) -> &str;
}

/// Error code plus message, built through the constructors below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultFloodSimError {
    code: FloodSimErrorCode,
    msg: String,
}

impl DefaultFloodSimError {
    /// Create error for null pointer passed where non-null required.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter that was null (e.g., `"out_instance"`, `"ptr"`)
    pub fn null_pointer(param_name: &str) -> Self {
        Self {
            code: FloodSimErrorCode::NullPointer,
            msg: format!("Parameter '{param_name}' cannot be null"),
        }
    }

    /// Create error for poisoned lock.
    ///
    /// # Arguments
    /// * `lock_name` - The name of the lock that was poisoned (e.g., `"simulation"`)
    pub fn lock_poisoned(lock_name: &str) -> Self {
        Self {
            code: FloodSimErrorCode::LockPoisoned,
            msg: format!("Lock '{lock_name}' was poisoned by a panic in another thread"),
        }
    }

    /// Create error for invalid terrain parameters with a custom message.
    ///
    /// # Arguments
    /// * `param_name` - The name of the invalid parameter (e.g., `"width"`, `"nx"`)
    /// * `message` - A description of the validation error
    pub fn invalid_terrain_parameter_msg(param_name: &str, message: &str) -> Self {
        Self {
            code: FloodSimErrorCode::InvalidTerrainParameters,
            msg: format!("Terrain parameter {param_name}: {message}"),
        }
    }

    /// Create error for a non-positive or non-finite terrain dimension.
    pub fn invalid_terrain_parameter(param_name: &str, value: f32) -> Self {
        Self::invalid_terrain_parameter_msg(
            param_name,
            &format!("must be finite and positive, got {value}"),
        )
    }

    /// Create error for invalid heightmap sample counts.
    pub fn invalid_heightmap_dimensions(nx: usize, ny: usize) -> Self {
        Self::invalid_terrain_parameter_msg(
            "nx/ny",
            &format!("need at least 2x2 samples without overflow, got {nx}x{ny}"),
        )
    }

    /// Create error for a grid or config the core rejected.
    pub fn invalid_grid(message: String) -> Self {
        Self {
            code: FloodSimErrorCode::InvalidGrid,
            msg: message,
        }
    }

    /// Create error for invalid parameter.
    ///
    /// # Arguments
    /// * `message` - Description of the error
    pub fn invalid_parameter(message: String) -> Self {
        Self {
            code: FloodSimErrorCode::InvalidParameter,
            msg: message,
        }
    }

    /// Create error for a query that needs an output the current mode does not build.
    pub fn output_unavailable(wanted: &str) -> Self {
        Self {
            code: FloodSimErrorCode::OutputUnavailable,
            msg: format!("No {wanted} output available; switch the output mode first"),
        }
    }

    /// Create error for a caller buffer shorter than the data.
    pub fn buffer_too_small(param_name: &str, needed: usize, given: usize) -> Self {
        Self {
            code: FloodSimErrorCode::BufferTooSmall,
            msg: format!("Buffer '{param_name}' holds {given} values, {needed} needed"),
        }
    }
}

impl FloodSimError for DefaultFloodSimError {
    fn code(&self) -> FloodSimErrorCode {
        self.code
    }

    fn msg(&self) -> &str {
        &self.msg
    }
}

/// FFI error codes returned by flood simulation functions.
/// Follows standard C convention: 0 = success, non-zero = error.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodSimErrorCode {
    /// Operation succeeded.
    Ok = 0,
    /// A required pointer argument was null.
    NullPointer = 1,
    /// The simulation lock was poisoned by a panic on another thread.
    LockPoisoned = 2,
    /// Terrain description rejected (dimensions, heightmap size).
    InvalidTerrainParameters = 3,
    /// A scalar argument was out of range.
    InvalidParameter = 4,
    /// Grid specification or JSON configuration rejected.
    InvalidGrid = 5,
    /// Requested mesh data while in image mode, or the reverse.
    OutputUnavailable = 6,
    /// Caller buffer too short; nothing was written.
    BufferTooSmall = 7,
}

impl From<DefaultFloodSimError> for FloodSimErrorCode {
    fn from(err: DefaultFloodSimError) -> Self {
        err.code
    }
}

thread_local! {
    static LAST_ERROR: RefCell<(Option<CString>, FloodSimErrorCode)> =
        const { RefCell::new((None, FloodSimErrorCode::Ok)) };
}

/// Run `f` with a shared borrow of this thread's last error.
pub(crate) fn with_last_error<R>(f: impl FnOnce(&(Option<CString>, FloodSimErrorCode)) -> R) -> R {
    LAST_ERROR.with(|cell| f(&cell.borrow()))
}

/// Run `f` with a mutable borrow of this thread's last error.
pub(crate) fn with_last_error_mut<R>(
    f: impl FnOnce(&mut (Option<CString>, FloodSimErrorCode)) -> R,
) -> R {
    LAST_ERROR.with(|cell| f(&mut cell.borrow_mut()))
}

/// Retrieve the most recent FFI error message.
///
/// Returns a borrowed pointer to a null-terminated string, or null if the last
/// call on this thread succeeded. **DO NOT FREE THIS POINTER**. It stays valid
/// until the next `flood_sim_*` call on the same thread.
///
/// # Thread Safety
/// Error state is thread-local; each thread sees only its own failures.
///
/// Example:
/// ```cpp
/// FloodSimInstance* sim = nullptr;
/// FloodSimErrorCode err = flood_sim_new(grid, terrain, &sim);
/// if (err != FloodSimErrorCode::Ok) {
///     const char* error = flood_sim_get_last_error();
///     if (error) {
///         printf("Flood sim creation failed: %s\n", error);
///     }
/// }
/// ```
#[no_mangle]
pub extern "C" fn flood_sim_get_last_error() -> *const c_char {
    with_last_error(|(cstring, _code)| cstring.as_ref().map_or(ptr::null(), |cs| cs.as_ptr()))
}

/// Retrieve the most recent FFI error code.
///
/// Returns `FloodSimErrorCode::Ok` (0) if the last call on this thread
/// succeeded, otherwise the code that call returned.
#[no_mangle]
pub extern "C" fn flood_sim_get_last_error_code() -> FloodSimErrorCode {
    with_last_error(|(_cstring, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helpers::{clear_last_error, track_error};
    use std::ffi::CStr;

    #[test]
    fn test_null_pointer_message() {
        let err = DefaultFloodSimError::null_pointer("ptr");
        assert_eq!(err.code(), FloodSimErrorCode::NullPointer);
        assert_eq!(err.msg(), "Parameter 'ptr' cannot be null");
    }

    #[test]
    fn test_last_error_round_trip() {
        let code = track_error(&DefaultFloodSimError::buffer_too_small("out", 10, 4));
        assert_eq!(code, FloodSimErrorCode::BufferTooSmall);
        assert_eq!(flood_sim_get_last_error_code(), FloodSimErrorCode::BufferTooSmall);

        let msg = unsafe { CStr::from_ptr(flood_sim_get_last_error()) };
        assert_eq!(msg.to_str().unwrap(), "Buffer 'out' holds 4 values, 10 needed");

        clear_last_error();
        assert!(flood_sim_get_last_error().is_null());
        assert_eq!(flood_sim_get_last_error_code(), FloodSimErrorCode::Ok);
    }

    #[test]
    fn test_errors_are_per_thread() {
        track_error(&DefaultFloodSimError::invalid_parameter("bad".into()));
        let other = std::thread::spawn(|| flood_sim_get_last_error_code())
            .join()
            .unwrap();
        assert_eq!(other, FloodSimErrorCode::Ok);
        assert_eq!(flood_sim_get_last_error_code(), FloodSimErrorCode::InvalidParameter);
    }
}
