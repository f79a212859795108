//! # Project Context CLI (`pctx`)
//!
//! The `pctx` binary is the primary interface for Project Context. It
//! provides commands for scanning workspaces, rendering the context tree,
//! creating rule files, managing registered projects, watching command
//! directories, and starting the HTTP / MCP servers.
//!
//! ## Usage
//!
//! ```bash
//! pctx --config ./pctx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pctx scan` | Scan registered projects and print a summary |
//! | `pctx scan --json` | Scan and print the full context map as JSON |
//! | `pctx tree` | Render the context tree for all registered projects |
//! | `pctx rule new <name>` | Create a rule file with a frontmatter template |
//! | `pctx projects add <path>` | Register a project root |
//! | `pctx projects remove <path>` | Unregister a project root |
//! | `pctx projects list` | List registered project roots |
//! | `pctx watch` | Watch command directories and print changes |
//! | `pctx serve http` | Start the JSON HTTP server |
//! | `pctx serve mcp` | Start the MCP Streamable HTTP endpoint |
//!
//! ## Examples
//!
//! ```bash
//! # Scan the current workspace
//! pctx scan
//!
//! # Register projects and render their combined tree
//! pctx projects add ~/work/app
//! pctx projects add ~/work/api
//! pctx tree
//!
//! # Create an always-on rule
//! pctx rule new code-style --description "House style" --always-apply
//!
//! # Start the MCP endpoint for Cursor integration
//! pctx serve mcp
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use project_context::aggregate::ContextAggregator;
use project_context::config::{self, DEFAULT_CONFIG_FILE};
use project_context::fs::RealFileSystem;
use project_context::scanner_rules::NewRuleOptions;
use project_context::{mcp, server, tree};

/// Project Context CLI — aggregated rules, commands, skills, and project
/// artifacts from developer workspaces.
#[derive(Parser)]
#[command(
    name = "pctx",
    about = "Project Context — aggregated rules, commands, skills, and artifacts from developer workspaces",
    version,
    long_about = "Project Context scans developer workspaces for Cursor rules, commands, and \
    skills alongside project artifacts (an AGENTS.md constitution, per-feature specifications, \
    and JSON schemas), aggregates them per project, and exposes the result as a tree, a JSON \
    HTTP API, and an MCP endpoint for AI tools."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// A missing file is fine: defaults apply and the current directory is
    /// scanned.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Scan registered projects and print what was found.
    ///
    /// Uses the project roots from the config file, falling back to the
    /// current directory when none are registered. Missing artifacts are
    /// reported as empty, never as errors.
    Scan {
        /// Print the full context map as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },

    /// Render the context tree for all registered projects.
    ///
    /// Shows rules, commands, skills, and artifacts per project with
    /// explicit empty-state entries for anything absent.
    Tree,

    /// Manage rule files.
    Rule {
        #[command(subcommand)]
        action: RuleAction,
    },

    /// Manage registered project roots.
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Watch command directories and print changed files.
    ///
    /// Watches `.cursor/commands` in the project and the global
    /// `~/.cursor/commands`, printing each changed markdown file until
    /// interrupted.
    Watch {
        /// Project root to watch. Defaults to the current directory.
        #[arg(long)]
        project: Option<PathBuf>,
    },

    /// Start a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Rule management subcommands.
#[derive(Subcommand)]
enum RuleAction {
    /// Create a new rule file with a frontmatter template.
    ///
    /// Writes `.cursor/rules/<name>.mdc`, creating the directory if
    /// needed. Refuses to overwrite an existing rule.
    New {
        /// Rule name. `.mdc` is appended unless an extension is given.
        name: String,

        /// Rule description for the frontmatter.
        #[arg(long)]
        description: Option<String>,

        /// Glob pattern the rule attaches to (repeatable).
        #[arg(long = "glob")]
        globs: Vec<String>,

        /// Mark the rule as always applied.
        #[arg(long)]
        always_apply: bool,

        /// Project root to create the rule in. Defaults to the current
        /// directory.
        #[arg(long)]
        project: Option<PathBuf>,
    },
}

/// Project registration subcommands.
#[derive(Subcommand)]
enum ProjectsAction {
    /// Register a project root in the config file.
    Add {
        /// Project root path.
        path: PathBuf,
    },
    /// Unregister a project root from the config file.
    Remove {
        /// Project root path.
        path: PathBuf,
    },
    /// List registered project roots.
    List,
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the JSON HTTP server (tools + resource routes).
    Http,
    /// Start the MCP Streamable HTTP endpoint.
    Mcp,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Scan { json } => {
            let roots = cfg.project_roots(&std::env::current_dir()?);
            let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
            let map = aggregator.scan_projects(&roots).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&map)?);
            } else {
                for (root, context) in &map {
                    println!("{}", root);
                    println!("  rules: {}", context.rules.len());
                    println!(
                        "  commands: {} workspace, {} global",
                        context.workspace_commands.len(),
                        context.global_commands.len()
                    );
                    println!(
                        "  skills: {} workspace, {} global",
                        context.workspace_skills.len(),
                        context.global_skills.len()
                    );
                    println!(
                        "  artifacts: constitution {}, {} specs, {} schemas",
                        if context.artifacts.constitution.exists {
                            "present"
                        } else {
                            "absent"
                        },
                        context.artifacts.specs.specs.len(),
                        context.artifacts.schemas.schemas.len()
                    );
                }
            }
        }
        Commands::Tree => {
            let roots = cfg.project_roots(&std::env::current_dir()?);
            let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
            let map = aggregator.scan_projects(&roots).await;
            print!("{}", tree::render(&tree::build_tree(&map)));
        }
        Commands::Rule { action } => match action {
            RuleAction::New {
                name,
                description,
                globs,
                always_apply,
                project,
            } => {
                let root = match project {
                    Some(root) => root,
                    None => std::env::current_dir()?,
                };
                let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
                let options = NewRuleOptions {
                    description,
                    globs,
                    always_apply,
                };
                let path = aggregator
                    .rule_scanner()
                    .create_rule(&root, &name, &options)
                    .await?;
                println!("Created {}", path.display());
            }
        },
        Commands::Projects { action } => {
            let mut cfg = cfg;
            match action {
                ProjectsAction::Add { path } => {
                    if cfg.add_project(path.clone()) {
                        config::save_config(&cfg, &cli.config)?;
                        println!("Added {}", path.display());
                    } else {
                        println!("Already registered: {}", path.display());
                    }
                }
                ProjectsAction::Remove { path } => {
                    if cfg.remove_project(&path) {
                        config::save_config(&cfg, &cli.config)?;
                        println!("Removed {}", path.display());
                    } else {
                        println!("Not registered: {}", path.display());
                    }
                }
                ProjectsAction::List => {
                    if cfg.projects.is_empty() {
                        println!("No projects registered.");
                    } else {
                        for root in &cfg.projects {
                            println!("{}", root.display());
                        }
                    }
                }
            }
        }
        Commands::Watch { project } => {
            let root = match project {
                Some(root) => root,
                None => std::env::current_dir()?,
            };
            let aggregator = ContextAggregator::new(Arc::new(RealFileSystem));
            let mut watch = aggregator.command_scanner().watch(&root)?;
            println!(
                "Watching {} command director{} (Ctrl-C to stop)",
                watch.watched_dirs(),
                if watch.watched_dirs() == 1 { "y" } else { "ies" }
            );
            while let Some(path) = watch.next_change().await {
                println!("changed: {}", path.display());
            }
        }
        Commands::Serve { service } => match service {
            ServeService::Http => {
                server::run_server(&cfg).await?;
            }
            ServeService::Mcp => {
                mcp::run_mcp_server(&cfg).await?;
            }
        },
    }

    Ok(())
}
