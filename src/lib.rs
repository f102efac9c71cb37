//! Hexarena - Server-Authoritative Hex Battlefield Combat Simulator

pub mod combat;
pub mod core;
pub mod hex;
