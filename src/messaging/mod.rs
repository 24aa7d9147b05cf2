pub mod event;
pub mod reconcile;
pub mod router;

pub use event::SessionEvent;
pub use reconcile::{MessageReconciler, Reconciliation, TypingChange, TypingTracker};
pub use router::MessageRouter;
