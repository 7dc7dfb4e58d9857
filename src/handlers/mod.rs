// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod matches;
pub mod predictions;
pub mod profile;
pub mod quiz;
pub mod scoreboard;
