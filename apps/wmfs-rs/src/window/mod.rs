pub mod client;
pub mod cursors;
pub mod draw;
pub mod error;
pub mod events;
pub mod frame;
pub mod manager;
pub mod mouse;
pub mod registry;
