//! # Workflows Module
//!
//! High-level entry points that tie the `core` and `engine` layers together.
//!
//! - **Stack Alignment** ([`align`]) - Superposes every structure of a stack onto a
//!   common target and collects transforms, moved structures and scores.

pub mod align;
