//! Pieces shared by the data panel crates: the common error type and the
//! properties that steer SQL rewriting.

#![warn(rust_2018_idioms)]

pub mod common;
pub mod config;
