// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Shared records, enums, config, and id/retry helpers for the token
//! booking engine.

pub mod catalog;
pub mod config;
pub mod retry;
pub mod types;
pub mod uid;
