//! Core of a tag-based tiling window manager for X11.

pub mod commands;
pub mod core;
pub mod ewmh;
pub mod geometry;
pub mod layout;
pub mod screen;
pub mod tag;
pub mod window;
