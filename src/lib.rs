//! Task Tracker Library
//!
//! Personal task tracking with one level of subtasks, scoped per user.
//! This module exports the core components for testing and integration.

pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
pub mod web;
