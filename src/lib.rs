pub mod conditions;
pub mod config;
pub mod dashboard;
pub mod defense;
pub mod error;
pub mod export;
pub mod feeds;
pub mod parlay;
pub mod projection;
pub mod session;
pub mod slate;
pub mod stat_config;
pub mod teams;
