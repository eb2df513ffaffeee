// src/models/mod.rs

pub mod question;
pub mod survey;
pub mod user;
