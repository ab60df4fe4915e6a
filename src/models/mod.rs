// src/models/mod.rs

pub mod result_entry;
