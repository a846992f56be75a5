pub mod context;
pub mod display;
pub mod event;
pub mod x11;

#[cfg(test)]
pub mod mock;
