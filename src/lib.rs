// Swole Tracker core service library

pub mod api;
pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
