// src/models/mod.rs

pub mod ledger;
pub mod matches;
pub mod prediction;
pub mod quiz;
pub mod settings;
pub mod user;
