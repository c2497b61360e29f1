pub mod core;
pub mod events;
pub mod store;
pub mod watch;
