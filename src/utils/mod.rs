// src/utils/mod.rs

pub mod net;
