pub mod services;

pub use services::{
    BroadcastNotificationSink, LoanNotification, LogNotificationSink, NotificationSink,
};
