pub mod config;
pub mod domain;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod repository;
pub mod services;
pub mod workers;
