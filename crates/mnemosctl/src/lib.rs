//! Mnemos Control - terminal client for the Mnemos analysis assistant
//!
//! Library half of `mnemosctl` so the command plumbing can be tested
//! without spawning the binary.

pub mod cli;
pub mod commands;
pub mod errors;
pub mod progress;
pub mod repl;
