//! HTTP-controlled synthetic CPU load generator.
//!
//! A [`cpu_stress::LoadGenerator`] runs one blocking worker per core that
//! alternates busy computation and sleep to approximate a target CPU
//! percentage. [`routes`] exposes start, stop and status over HTTP.

pub mod config;
pub mod cpu_stress;
pub mod error;
pub mod flash;
pub mod pages;
pub mod routes;
pub mod sys_info;
pub mod thread_manager;
