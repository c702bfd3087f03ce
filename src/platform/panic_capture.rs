//! Process panic hook that captures render panics for fault boundaries.
//!
//! The hook is installed once and chains to whatever hook was active before.
//! While a thread is inside [`catch_render`], panics on that thread are
//! recorded (message, location, backtrace) and the default report is
//! suppressed. Panics anywhere else reach the previous hook unchanged.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe, PanicHookInfo};
use std::sync::Once;

/// Panic details recorded during a captured render.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CapturedPanic {
    pub message: String,
    /// `file:line:column` of the panic site, when known.
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

impl CapturedPanic {
    fn from_hook(info: &PanicHookInfo<'_>) -> Self {
        Self {
            message: payload_message(info.payload()),
            location: info.location().map(|location| {
                format!(
                    "{}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                )
            }),
            backtrace: Some(Backtrace::force_capture().to_string()),
        }
    }

    /// Used when the hook did not run for this panic (another hook replaced it).
    fn from_payload(payload: &(dyn Any + Send)) -> Self {
        Self {
            message: payload_message(payload),
            location: None,
            backtrace: None,
        }
    }
}

thread_local! {
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<CapturedPanic>> = const { RefCell::new(None) };
}

static HOOK_INSTALLED: Once = Once::new();

fn install_capture_hook() {
    HOOK_INSTALLED.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if capture_depth() == 0 {
                previous(info);
                return;
            }
            let record = CapturedPanic::from_hook(info);
            let _ = CAPTURED.try_with(|slot| *slot.borrow_mut() = Some(record));
        }));
    });
}

fn capture_depth() -> usize {
    CAPTURE_DEPTH.try_with(Cell::get).unwrap_or(0)
}

struct CaptureScope;

impl CaptureScope {
    fn enter() -> Self {
        CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        let _ = CAPTURE_DEPTH.try_with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Runs `render`, converting a panic into a [`CapturedPanic`].
///
/// Nested calls are supported; the innermost call receives the panic.
pub fn catch_render<R>(render: impl FnOnce() -> R) -> Result<R, CapturedPanic> {
    install_capture_hook();
    let _scope = CaptureScope::enter();

    match panic::catch_unwind(AssertUnwindSafe(render)) {
        Ok(output) => Ok(output),
        Err(payload) => {
            let captured = CAPTURED.with(|slot| slot.borrow_mut().take());
            Err(captured.unwrap_or_else(|| CapturedPanic::from_payload(payload.as_ref())))
        }
    }
}

fn payload_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic with a non-string payload".to_string()
    }
}
