//! Common test utilities for triage job integration tests
//!
//! This module provides an in-memory Spotify stand-in, token providers and
//! helpers for building playlist items.

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod fakes;

pub use fakes::*;
