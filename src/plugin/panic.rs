//! Panic capture for the plugin terminator
//!
//! A process-wide hook is installed once. While a thread is running guarded
//! code the hook records the backtrace instead of printing to stderr;
//! everywhere else it defers to the previously installed hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;

thread_local! {
    static GUARDED: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<String>> = const { RefCell::new(None) };
}

static INSTALL_HOOK: Once = Once::new();

/// A recovered panic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedPanic {
    pub message: String,
    pub backtrace: String,
}

fn install_hook() {
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if GUARDED.with(Cell::get) {
                let trace = Backtrace::force_capture().to_string();
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(trace));
            } else {
                previous(info);
            }
        }));
    });
}

/// Best-effort text of a panic payload
pub fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `f`, converting a panic into a [`CapturedPanic`]
pub fn catch<R>(f: impl FnOnce() -> R) -> Result<R, CapturedPanic> {
    install_hook();
    let was_guarded = GUARDED.with(|g| g.replace(true));
    CAPTURED.with(|slot| slot.borrow_mut().take());

    let outcome = panic::catch_unwind(AssertUnwindSafe(f));

    GUARDED.with(|g| g.set(was_guarded));
    outcome.map_err(|payload| CapturedPanic {
        message: payload_message(payload.as_ref()),
        backtrace: CAPTURED
            .with(|slot| slot.borrow_mut().take())
            .unwrap_or_else(|| "backtrace unavailable".to_string()),
    })
}
