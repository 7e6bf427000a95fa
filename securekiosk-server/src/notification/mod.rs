//! Subscription lifecycle notifications.
//!
//! ## Processing Flow
//!
//! ```text
//! signedPayload → PayloadVerifier::verify() → Notification → Dispatcher::dispatch() → handler
//! ```

pub mod dispatcher;
pub mod signature;
pub mod types;

pub use dispatcher::{DispatchError, Dispatched, Dispatcher, LoggingHandler, NotificationHandler};
pub use signature::{PayloadVerifier, VerifyError};
pub use types::{Environment, Notification, NotificationData, NotificationType};
