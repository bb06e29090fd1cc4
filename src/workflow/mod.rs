//! Upload-and-reconcile workflow.
//!
//! The dispatcher sends a batch, the view controller refreshes what is on
//! screen, and for batches left to AI classification the processing monitor
//! polls until it can report where the files went.

pub mod dispatcher;
pub mod monitor;
pub mod signal;
pub mod view;

pub use dispatcher::{UploadDispatcher, UploadOutcome};
pub use monitor::{
    attribute, MonitorPhase, MonitorReport, MonitorStateMachine, ProcessingMonitor,
    ReconcileOutcome,
};
pub use signal::{BackoffPoll, CompletionSignal, FixedDelayPoll};
pub use view::{UploadReceipt, ViewController, ViewSnapshot};
