//! Render contract for subtrees wrapped by a fault boundary.

/// Renderable component interface.
pub trait Component {
    /// Render to a list of lines at the given width.
    ///
    /// A panic raised here is a render fault; the nearest enclosing
    /// [`FaultBoundary`](crate::widgets::FaultBoundary) contains it.
    fn render(&mut self, width: usize) -> Vec<String>;

    /// Invalidate any cached state.
    fn invalidate(&mut self) {}
}
