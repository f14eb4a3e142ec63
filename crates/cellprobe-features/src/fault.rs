//! Fault boundary around individual extractors.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Run `f`, turning a panic into its message.
///
/// Extractors only read their inputs, so no state can be observed half-updated
/// after an unwind.
pub(crate) fn guard<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_values_through() {
        assert_eq!(guard(|| 41 + 1), Ok(42));
    }

    #[test]
    fn captures_panic_message() {
        let r: Result<(), String> = guard(|| panic!("bad index {}", 7));
        assert_eq!(r, Err("bad index 7".to_string()));

        let r: Result<(), String> = guard(|| panic!("static message"));
        assert_eq!(r, Err("static message".to_string()));
    }
}
