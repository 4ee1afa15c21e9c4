// ABOUTME: HTTP middleware for authentication, cross-origin access and response hardening
// ABOUTME: Bearer token guard with role checks, the CORS layer and security headers
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

/// Bearer token authentication and role checks
pub mod auth;
/// CORS layer configuration
pub mod cors;
/// Security response headers
pub mod security;

pub use auth::{bearer_token, AuthResult, BearerAuthMiddleware};
pub use cors::setup_cors;
pub use security::{with_security_headers, SECURITY_HEADERS};
