//! Composition widgets.

pub mod container;
pub mod fault_boundary;

pub use container::Container;
pub use fault_boundary::{
    BoundaryId, BoundaryState, FallbackView, FaultBoundary, FaultRecord, GenericFallback,
    RenderError, GENERIC_FALLBACK_MESSAGE,
};
