//! Events emitted by domain operations

mod notification;

pub use notification::{Notification, NotificationKind, NotificationRoute};
