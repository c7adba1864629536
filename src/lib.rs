//! # modfetch
//!
//! Install tagged module snapshots from remote Git repositories.
//!
//! modfetch registers repository sources, discovers their published tags
//! without cloning, and deterministically installs a chosen tag into a
//! destination directory — recording every install in a SQLite ledger so it
//! can be cleaned up later. It is the one component of its host system that
//! shells out to external tools and touches the filesystem, so every
//! operator-supplied value is validated before it reaches an argument
//! vector.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────┐   ┌───────────────┐   ┌────────────┐   ┌──────────┐
//! │ Validator │──▶│ Tag Discovery │──▶│ Installer   │──▶│  Ledger  │
//! │ (URLs,    │   │ (ls-remote)   │   │ (shallow    │   │ (SQLite) │
//! │  tags)    │   └───────────────┘   │  clone)     │   └────┬─────┘
//! └───────────┘                       └──────┬──────┘        │
//!                                            ▼               ▼
//!                                      ┌───────────┐   ┌──────────┐
//!                                      │ Ownership │   │ Notifier │
//!                                      │ (chown -R)│   │ (hooks)  │
//!                                      └───────────┘   └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! modfetch init                                  # create the ledger
//! modfetch validate https://github.com/org/web.git
//! modfetch tags https://github.com/org/web.git
//! modfetch install https://github.com/org/web.git 16.0.1.0.0
//! modfetch snapshots
//! modfetch remove <snapshot-id>
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`validate`] | URL / tag / name validation (the injection boundary) |
//! | [`runner`] | Bounded external process execution |
//! | [`tags`] | Remote tag discovery |
//! | [`install`] | Shallow single-tag snapshot installation |
//! | [`ownership`] | Recursive ownership enforcement |
//! | [`ledger`] | Persisted install records and source registry |
//! | [`notify`] | Best-effort post-install hooks |
//! | [`service`] | The orchestrated call surface |

pub mod config;
pub mod db;
pub mod error;
pub mod install;
pub mod ledger;
pub mod migrate;
pub mod models;
pub mod notify;
pub mod ownership;
pub mod runner;
pub mod service;
pub mod tags;
pub mod validate;
