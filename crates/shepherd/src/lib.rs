//! Shepherd - bulk workflow transitions for issues on a project board.
//!
//! Given a set of issues, shepherd optionally expands them into their
//! sub-issue trees, resolves the requested field values, validates every
//! issue against the workflow rules and, only if all of them pass, applies
//! the updates in one batch.
//!
//! The board itself sits behind the [`board::ProjectBoard`] trait. This crate
//! ships an in-memory board and a JSON snapshot board built on it.

#![forbid(unsafe_code)]

// Public modules for library usage
pub mod board;
pub mod domain;
pub mod error;
pub mod executor;
pub mod expand;
pub mod fields;
pub mod index;
pub mod reference;
pub mod transition;
pub mod workflow;

// Terminal interaction
pub mod output;
pub mod prompt;

// Public CLI module (needed by binary)
pub mod cli;

// Command implementations
pub mod commands;

pub mod app;
pub mod config;
