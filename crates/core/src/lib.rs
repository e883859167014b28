//! Core library for reading frames from capture-station sessions.
//!
//! A station session is backed by either a directory of pre-extracted
//! still images or a single video file. The [`source`] module exposes one
//! [`source::domain::frame_source::FrameSource`] contract over both and a
//! selector that picks the populated variant per session.

pub mod config;
pub mod shared;
pub mod source;
