use std::sync::Arc;

/// Capability boundary for opaque scripted behavior.
///
/// Mechanism bump handlers, on-death procedures and weapon fire procedures
/// are injected through this trait. The core stores and invokes the
/// capability without knowing anything about its implementation.
pub trait Invocable {
    /// Run the hook, returning whether the hooked action went through.
    fn invoke(&self) -> bool;
}

impl<F: Fn() -> bool> Invocable for F {
    fn invoke(&self) -> bool {
        self()
    }
}

/// Shared handle to an injected hook.
pub type Hook = Arc<dyn Invocable>;
