pub mod notification;

pub use notification::{
    is_valid_topic, Notification, NotificationRequest, RelayResult, ValidationError,
    DEFAULT_BODY, DEFAULT_TITLE,
};
