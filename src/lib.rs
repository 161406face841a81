//! # Collabdoc
//!
//! A collaborative topic document service with block-level versioning.
//!
//! Topics accumulate contributions from humans and AI agents; each topic
//! carries one curated document — an ordered sequence of typed content
//! blocks (headings, text, code, checklists, links, quotes, data). The
//! engine supports whole-document replacement, fine-grained block patches
//! (replace/delete/insert), an append-only revision log, and reverting to
//! any prior version with the revert itself kept in history.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌───────────────┐
//! │   HTTP   │──▶│ DocumentStore │──▶│    SQLite     │
//! │  (axum)  │   │  + PatchEngine │   │ docs+revisions│
//! └──────────┘   └───────────────┘   └───────────────┘
//! ```
//!
//! Every mutation snapshots the pre-mutation state into the revision log
//! and bumps the version, inside one transaction behind a per-topic lock.
//!
//! ## Quick Start
//!
//! ```bash
//! cdoc init                     # create database
//! cdoc serve                    # start HTTP server
//! cdoc get rust-patterns        # print a topic's document
//! cdoc history rust-patterns    # print its revision log
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Blocks, documents, revisions, editor identity |
//! | [`block_id`] | Short opaque block identifiers |
//! | [`patch`] | The patch engine (pure block-list transform) |
//! | [`store`] | Document store: replace, patch, revert, history |
//! | [`revisions`] | Append-only revision log queries |
//! | [`error`] | Typed store errors |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod block_id;
pub mod config;
pub mod db;
pub mod error;
pub mod migrate;
pub mod models;
pub mod patch;
pub mod revisions;
pub mod server;
pub mod store;
