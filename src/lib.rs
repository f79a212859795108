//! # Project Context
//!
//! Aggregated rules, commands, skills, and project artifacts from developer
//! workspaces.
//!
//! Project Context scans workspaces for Cursor artifacts (`.cursor/rules`,
//! `.cursor/commands`, `.cursor/skills`) and project artifacts (an
//! `AGENTS.md` constitution, per-feature specifications under `specs/`, and
//! JSON schemas under `schemas/`), parses them into typed records, and
//! exposes the aggregate as a tree, a JSON HTTP API, and an MCP endpoint.
//!
//! Scanning never fails loudly: a missing artifact yields its empty value,
//! a malformed file yields a placeholder record, and only infrastructure
//! failures are logged.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌─────────────┐
//! │  Workspaces  │──▶│  Scanners    │──▶│  Aggregate   │
//! │ .cursor/ etc │   │ rules/cmds/ │   │ per project │
//! └──────────────┘   │ skills/arts │   └──────┬──────┘
//!                    └─────────────┘          │
//!                        ┌────────────────────┤
//!                        ▼                    ▼
//!                   ┌──────────┐       ┌───────────┐
//!                   │   CLI    │       │   HTTP    │
//!                   │  (pctx)  │       │ REST+MCP  │
//!                   └──────────┘       └───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! pctx scan                     # scan the current workspace
//! pctx tree                     # render the context tree
//! pctx rule new code-style      # create a rule file
//! pctx serve mcp                # start the MCP endpoint
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and project registration |
//! | [`models`] | Typed records for every scanned artifact |
//! | [`fs`] | Filesystem port with real and in-memory adapters |
//! | [`markdown`] | Heading, section, and frontmatter helpers |
//! | [`scanner_rules`] | `.cursor/rules` scanner and rule creation |
//! | [`scanner_commands`] | `.cursor/commands` scanner (workspace + global) |
//! | [`scanner_skills`] | `.cursor/skills` scanner (workspace + global) |
//! | [`scanner_artifacts`] | Constitution, specification, and schema scanner |
//! | [`aggregate`] | Per-project aggregation and the context map |
//! | [`tree`] | Tree consumer with explicit empty states |
//! | [`watch`] | Command directory change watching |
//! | [`tools`] | Query tools served over HTTP and MCP |
//! | [`server`] | JSON HTTP server |
//! | [`mcp`] | MCP JSON-RPC bridge |

pub mod aggregate;
pub mod config;
pub mod fs;
pub mod markdown;
pub mod mcp;
pub mod models;
pub mod scanner_artifacts;
pub mod scanner_commands;
pub mod scanner_rules;
pub mod scanner_skills;
pub mod server;
pub mod tools;
pub mod tree;
pub mod watch;
