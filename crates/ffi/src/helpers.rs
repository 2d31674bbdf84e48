use crate::error::{with_last_error_mut, DefaultFloodSimError, FloodSimError, FloodSimErrorCode};
use crate::instance::FloodSimInstance;
use flood_sim_core::SimulationController;
use std::ffi::CString;

/// Set the thread-local error message and code.
/// Accepts any type implementing `FloodSimError` trait.
pub(crate) fn set_last_error(error: &impl FloodSimError) {
    with_last_error_mut(|(cstring, code)| {
        *cstring = CString::new(error.msg()).ok();
        *code = error.code();
    });
}

/// Track an error by setting it in thread-local storage and returning its code.
#[inline]
pub(crate) fn track_error(error: &impl FloodSimError) -> FloodSimErrorCode {
    set_last_error(error);
    error.code()
}

/// Clear the thread-local error message and code.
/// Called on every successful operation.
pub(crate) fn clear_last_error() {
    with_last_error_mut(|(cstring, code)| {
        *cstring = None;
        *code = FloodSimErrorCode::Ok;
    });
}

/// Run `f` and translate its result into an FFI return code, recording the
/// message on failure and clearing it on success.
pub(crate) fn handle_ffi_result_error<F>(f: F) -> FloodSimErrorCode
where
    F: FnOnce() -> Result<(), DefaultFloodSimError>,
{
    match f() {
        Ok(()) => {
            clear_last_error();
            FloodSimErrorCode::Ok
        }
        Err(e) => track_error(&e),
    }
}

/// Borrow the instance behind `ptr`.
///
/// The pointer must come from `flood_sim_new` and not yet be destroyed; only
/// null is detected.
pub(crate) fn instance_from_ptr<'a>(
    ptr: *const FloodSimInstance,
) -> Result<&'a FloodSimInstance, DefaultFloodSimError> {
    // SAFETY: non-null pointers are owned instances handed out by flood_sim_new
    unsafe { ptr.as_ref() }.ok_or_else(|| DefaultFloodSimError::null_pointer("ptr"))
}

/// Run `f` under a shared read lock on the controller.
pub(crate) fn with_flood_sim<T>(
    instance: &FloodSimInstance,
    f: impl FnOnce(&SimulationController) -> T,
) -> Result<T, DefaultFloodSimError> {
    let sim = instance
        .sim
        .read()
        .map_err(|_| DefaultFloodSimError::lock_poisoned("simulation"))?;
    Ok(f(&sim))
}

/// Run `f` under the exclusive write lock on the controller.
pub(crate) fn with_flood_sim_mut<T>(
    instance: &FloodSimInstance,
    f: impl FnOnce(&mut SimulationController) -> T,
) -> Result<T, DefaultFloodSimError> {
    let mut sim = instance
        .sim
        .write()
        .map_err(|_| DefaultFloodSimError::lock_poisoned("simulation"))?;
    Ok(f(&mut sim))
}

/// Write `value` through an out-parameter.
pub(crate) fn write_out<T>(
    out: *mut T,
    param_name: &str,
    value: T,
) -> Result<(), DefaultFloodSimError> {
    if out.is_null() {
        return Err(DefaultFloodSimError::null_pointer(param_name));
    }
    // SAFETY: caller guarantees a non-null out-pointer is valid for writes
    unsafe { out.write(value) };
    Ok(())
}

/// Copy `src` into a caller-owned buffer of `len` elements.
///
/// Fails without writing anything when the buffer is shorter than `src`.
pub(crate) fn copy_to_buffer<T: Copy>(
    src: &[T],
    out: *mut T,
    len: usize,
    param_name: &str,
) -> Result<(), DefaultFloodSimError> {
    if out.is_null() {
        return Err(DefaultFloodSimError::null_pointer(param_name));
    }
    if len < src.len() {
        return Err(DefaultFloodSimError::buffer_too_small(
            param_name,
            src.len(),
            len,
        ));
    }
    // SAFETY: caller guarantees `out` is valid for `len` writes, and len >= src.len()
    unsafe { std::ptr::copy_nonoverlapping(src.as_ptr(), out, src.len()) };
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copy_rejects_short_buffer() {
        let src = [1.0_f32, 2.0, 3.0];
        let mut dst = [0.0_f32; 2];
        let err = copy_to_buffer(&src, dst.as_mut_ptr(), dst.len(), "out").unwrap_err();
        assert_eq!(err.code(), FloodSimErrorCode::BufferTooSmall);
        assert_eq!(dst, [0.0, 0.0]);
    }

    #[test]
    fn test_copy_fills_prefix() {
        let src = [1_u32, 2, 3];
        let mut dst = [9_u32; 5];
        copy_to_buffer(&src, dst.as_mut_ptr(), dst.len(), "out").unwrap();
        assert_eq!(dst, [1, 2, 3, 9, 9]);
    }

    #[test]
    fn test_null_out_pointer() {
        let err = write_out(std::ptr::null_mut::<f32>(), "out_depth", 1.0).unwrap_err();
        assert_eq!(err.code(), FloodSimErrorCode::NullPointer);
        assert!(instance_from_ptr(std::ptr::null()).is_err());
    }
}
