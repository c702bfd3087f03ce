//! Render-fault containment for a component subtree.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::error;

use crate::core::component::Component;
use crate::core::width::fit_to_width;
use crate::logging::TARGET_FAULT;
use crate::platform::panic_capture::{catch_render, CapturedPanic};

/// Process-unique boundary identifier; never reused.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BoundaryId(u64);

impl BoundaryId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BoundaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "boundary#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BoundaryState {
    Healthy,
    Faulted,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{message}")]
pub struct RenderError {
    pub message: String,
    pub location: Option<String>,
    pub backtrace: Option<String>,
}

impl From<CapturedPanic> for RenderError {
    fn from(captured: CapturedPanic) -> Self {
        Self {
            message: captured.message,
            location: captured.location,
            backtrace: captured.backtrace,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FaultRecord {
    pub error: RenderError,
    pub contained_at: BoundaryId,
    pub label: String,
}

/// Content rendered in place of a faulted subtree.
///
/// A panic raised by a fallback is not contained by its own boundary.
pub trait FallbackView {
    fn render(&mut self, fault: &FaultRecord, width: usize) -> Vec<String>;

    /// Toggle technical details, if the view has any.
    fn set_show_details(&mut self, _show: bool) {}
}

impl<F> FallbackView for F
where
    F: FnMut(&FaultRecord, usize) -> Vec<String>,
{
    fn render(&mut self, fault: &FaultRecord, width: usize) -> Vec<String> {
        self(fault, width)
    }
}

pub const GENERIC_FALLBACK_MESSAGE: &str = "Something went wrong while displaying this section.";

/// Generic message with optional technical details.
#[derive(Clone, Debug, Default)]
pub struct GenericFallback {
    show_details: bool,
}

impl GenericFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_details(mut self, show: bool) -> Self {
        self.show_details = show;
        self
    }

    pub fn show_details(&self) -> bool {
        self.show_details
    }
}

impl FallbackView for GenericFallback {
    fn render(&mut self, fault: &FaultRecord, width: usize) -> Vec<String> {
        let mut lines = vec![GENERIC_FALLBACK_MESSAGE.to_string()];
        if self.show_details {
            lines.push(format!("error: {}", fault.error.message));
            if let Some(location) = &fault.error.location {
                lines.push(format!("at: {location}"));
            }
            if let Some(backtrace) = &fault.error.backtrace {
                lines.extend(backtrace.lines().map(str::to_string));
            }
        }
        lines
            .iter()
            .map(|line| fit_to_width(line, width))
            .collect()
    }

    fn set_show_details(&mut self, show: bool) {
        self.show_details = show;
    }
}

/// Renders `child` until its first render panic, then renders the fallback.
///
/// A faulted boundary never renders its child again; [`FaultBoundary::remount`]
/// yields a fresh healthy boundary.
pub struct FaultBoundary {
    id: BoundaryId,
    label: String,
    child: Box<dyn Component>,
    fallback: Box<dyn FallbackView>,
    fault: Option<FaultRecord>,
}

impl FaultBoundary {
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        child: Box<dyn Component>,
        fallback: Box<dyn FallbackView>,
    ) -> Self {
        Self {
            id: BoundaryId::next(),
            label: label.into(),
            child,
            fallback,
            fault: None,
        }
    }

    #[must_use]
    pub fn with_generic_fallback(label: impl Into<String>, child: Box<dyn Component>) -> Self {
        Self::new(label, child, Box::new(GenericFallback::new()))
    }

    pub fn id(&self) -> BoundaryId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> BoundaryState {
        if self.fault.is_some() {
            BoundaryState::Faulted
        } else {
            BoundaryState::Healthy
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }

    pub fn fault(&self) -> Option<&FaultRecord> {
        self.fault.as_ref()
    }

    pub fn set_show_details(&mut self, show: bool) {
        self.fallback.set_show_details(show);
    }

    /// Replaces this boundary with a healthy one around the same child.
    #[must_use]
    pub fn remount(self) -> Self {
        let mut child = self.child;
        child.invalidate();
        Self::new(self.label, child, self.fallback)
    }

    fn contain(&mut self, captured: CapturedPanic) -> &FaultRecord {
        let record = FaultRecord {
            error: captured.into(),
            contained_at: self.id,
            label: self.label.clone(),
        };
        error!(
            target: TARGET_FAULT,
            boundary = %record.contained_at,
            label = %record.label,
            error = %record.error,
            location = record.error.location.as_deref().unwrap_or("unknown"),
            "render fault contained"
        );
        self.fault.insert(record)
    }
}

impl Component for FaultBoundary {
    fn render(&mut self, width: usize) -> Vec<String> {
        if let Some(fault) = &self.fault {
            return self.fallback.render(fault, width);
        }

        let child = &mut self.child;
        match catch_render(|| child.render(width)) {
            Ok(lines) => lines,
            Err(captured) => {
                let fault = self.contain(captured).clone();
                self.fallback.render(&fault, width)
            }
        }
    }

    fn invalidate(&mut self) {
        if self.fault.is_none() {
            self.child.invalidate();
        }
    }
}

impl fmt::Debug for FaultBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FaultBoundary")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state())
            .finish()
    }
}
