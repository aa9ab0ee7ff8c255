pub mod notifiers;
pub mod senders;
