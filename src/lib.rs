//! DocuIntel client.
//!
//! Talks to the DocuIntel document backend: uploads files, browses folders,
//! surfaces AI summaries, and reconciles where the backend's asynchronous
//! classification put newly uploaded files.

pub mod api;
pub mod config;
pub mod confirm;
pub mod error;
pub mod library;
pub mod logging;
pub mod notify;
pub mod retry;
pub mod workflow;

pub use api::{DocumentApi, HttpDocumentApi};
pub use config::{ClientConfig, ConfigError, PollStrategy};
pub use confirm::{AutoConfirm, Confirm, ConfirmPrompt, DialoguerConfirm};
pub use error::{classify_http_status, ClientError, ClientResult, ErrorCategory};
pub use notify::{ConsoleNotifier, Notice, NoticeBoard, NoticeLevel, NotificationCenter};
pub use retry::RetryPolicy;
pub use workflow::{
    BackoffPoll, CompletionSignal, FixedDelayPoll, ReconcileOutcome, ViewController, ViewSnapshot,
};
