pub mod audit;
pub mod client;
pub mod config;
pub mod db;
pub mod domain;
pub mod dto;
pub mod emails;
pub mod entity;
pub mod error;
pub mod integrations;
pub mod middleware;
pub mod models;
pub mod outbox;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
