// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Resilience primitives used by the HTTP transport.
//!
//! - [`retry`]: exponential backoff for connection failures and timeouts
//! - [`circuit_breaker`]: per-endpoint breakers so dead nodes fail fast

pub mod circuit_breaker;
pub mod retry;
