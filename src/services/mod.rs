//! Fanout services: change notification, viewer windows and the realtime channel.

pub mod fanout;
pub mod notifier;
pub mod websocket;

pub use fanout::{ClientWindow, Merge};
pub use notifier::{ChangeNotifier, PublishReport, Subscription};
