/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Identifier assigned to every decision record.
pub type NotificationId = uuid::Uuid;
