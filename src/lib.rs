pub mod analytics;
pub mod config;
pub mod error;
pub mod models;
pub mod poller;
pub mod redis;
pub mod repository;
pub mod series;
pub mod service;
pub mod services;
pub mod transport;

pub use crate::error::{Result, WorkchatError};
pub use crate::service::AssistantService;
