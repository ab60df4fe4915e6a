// src/utils/mod.rs

pub mod fs;
pub mod html;
pub mod token;
