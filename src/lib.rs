//! Sandboxed file and script tools for an autonomous coding agent.
//!
//! Every tool call is confined to a working-directory boundary by
//! [`security::path::PathGuard`] and answered with a [`dispatch::Envelope`].

pub mod config;
pub mod dispatch;
pub mod sandbox;
pub mod security;
pub mod tools;
