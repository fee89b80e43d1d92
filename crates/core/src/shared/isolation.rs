use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

/// Runs `f`, converting a panic into `Err` with the panic message.
///
/// Nothing `f` touches is observed after a panic, so asserting unwind
/// safety is sound for the callers in this crate.
pub fn run_isolated<T>(f: impl FnOnce() -> T) -> Result<T, String> {
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| panic_message(payload.as_ref()))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_returns_value_when_no_panic() {
        assert_eq!(run_isolated(|| 41 + 1), Ok(42));
    }

    #[test]
    fn test_catches_str_panic() {
        let result: Result<(), String> = run_isolated(|| panic!("boom"));
        assert_eq!(result, Err("panicked: boom".to_string()));
    }

    #[test]
    fn test_catches_formatted_panic() {
        let n = 3;
        let result: Result<(), String> = run_isolated(|| panic!("bad item {n}"));
        assert_eq!(result, Err("panicked: bad item 3".to_string()));
    }

    #[test]
    fn test_catches_non_string_payload() {
        let result: Result<(), String> = run_isolated(|| std::panic::panic_any(7u8));
        assert_eq!(result, Err("panicked".to_string()));
    }
}
