/// Hosts allowed to serve signing certificates and subscription endpoints.
pub const SNS_HOST_PATTERN: &str = r"^sns\.[a-z0-9-]+\.amazonaws\.com$";

/// Header SNS sets on every webhook delivery.
pub const X_AMZ_SNS_MESSAGE_TYPE: &str = "x-amz-sns-message-type";

// SNS message types.
pub const NOTIFICATION: &str = "Notification";
pub const SUBSCRIPTION_CONFIRMATION: &str = "SubscriptionConfirmation";
pub const UNSUBSCRIBE_CONFIRMATION: &str = "UnsubscribeConfirmation";

/// SES event types published through SNS.
pub const SES_EVENT_TYPES: &[&str] = &["send", "delivery", "open", "click", "bounce", "complaint"];
