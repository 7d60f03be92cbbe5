//! # Context Relay
//!
//! A command-line client for a shared team context backend.
//!
//! Context Relay talks to the backend's REST API: authentication with
//! bearer-token refresh, project CRUD with contributor management,
//! semantic context search and retrieval, and the analytics graph
//! overview. All state besides the credential cache lives on the backend;
//! this crate is a consumer of that API, not an implementation of it.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐    ┌───────────┐    ┌─────────────┐
//! │   CLI    │───▶│  Session  │───▶│  ApiClient  │───▶ backend REST API
//! │  (ctxr)  │    │  (state)  │    │ (401+retry) │
//! └──────────┘    └───────────┘    └──────┬──────┘
//!                                         │
//!                                  ┌──────▼────────┐
//!                                  │ CredentialStore│
//!                                  │  (token cache) │
//!                                  └───────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! ctxr register "Ada" ada@example.com     # one-time API key printed once
//! ctxr login ada@example.com
//! ctxr project create "platform" "Team platform docs"
//! ctxr context save "Deploys go through the staging gate first." --project <id>
//! ctxr context search "how do deploys work"
//! ctxr graphs overview
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Wire types shared with the backend |
//! | [`credentials`] | On-disk bearer credential cache |
//! | [`client`] | Authenticated HTTP client with single-flight token refresh |
//! | [`session`] | Session state machine (hydrate, login, register, logout) |
//! | [`guard`] | Authenticated-command gate |
//! | [`account`] | whoami and API-key rotation commands |
//! | [`projects`] | Project CRUD and contributor commands |
//! | [`context`] | Context save/search/retrieve commands |
//! | [`graphs`] | Analytics overview and tag-graph commands |
//! | [`error`] | Error taxonomy |

pub mod account;
pub mod client;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod graphs;
pub mod guard;
pub mod models;
pub mod projects;
pub mod session;
