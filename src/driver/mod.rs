// src/driver/mod.rs
pub mod display;
