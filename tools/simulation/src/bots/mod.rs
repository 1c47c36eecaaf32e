//! Simulated participants

pub mod punter;
