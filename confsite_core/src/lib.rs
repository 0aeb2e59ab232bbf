//! This crate builds the schedule document of a conference website.
//!
//! Talks and rooms are read from a Pretalx instance, placed on a grid of fixed-width
//! time slots and written as one JSON file that the site renders.

pub mod config;
pub mod document;
pub mod error;
pub mod model;
pub mod pretalx;
pub mod schedule;

pub use error::{Error, Result};
