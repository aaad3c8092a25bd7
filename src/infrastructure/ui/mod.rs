pub mod channel_notifier;

pub use channel_notifier::{ChannelVisibilityNotifier, ObserverCommand};
