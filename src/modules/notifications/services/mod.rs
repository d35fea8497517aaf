pub mod notification_sink;

pub use notification_sink::{
    BroadcastNotificationSink, LoanNotification, LogNotificationSink, NotificationSink,
};
