//! Command implementations that do not fit the transition pipeline.

pub mod init;
