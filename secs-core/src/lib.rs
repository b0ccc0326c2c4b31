//! Core types and utilities for SECS-I communicators
//!
//! This crate provides the error taxonomy and the SECS-I control byte
//! alphabet shared by the transport and link layers.

pub mod control;
pub mod error;

pub use error::{SecsError, SecsResult};
