pub mod config;
pub mod geo;
pub mod replay;
pub mod report;
pub mod route;
pub mod session;
pub mod tracker;
pub mod web;
