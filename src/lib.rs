#![warn(missing_docs)]
//! Aptos Guardian is a health-monitoring service for Aptos fullnode RPC
//! endpoints and user-facing dApp URLs. It probes every configured endpoint
//! on a fixed interval, persists each outcome, derives incidents from
//! sequences of outcomes, ranks RPC providers by recent behavior, and exposes
//! a read API, Prometheus metrics, and Discord alerts.

pub mod config;
pub mod discord;
pub mod engine;
pub mod http_server;
pub mod metrics;
pub mod models;
pub mod notification;
pub mod persistence;
pub mod probers;
pub mod scheduler;
pub mod supervisor;
pub mod version;
