//! Command-line interface for scroll-scene.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Clone, PartialEq, Subcommand)]
pub enum CliCommand {
    /// Open the window and run the scene (default).
    Run,
    /// Run the scene headlessly and print the resulting transforms as JSON.
    Snapshot {
        /// Scroll offset (page top, in pixels; negative is scrolled down). Clamped to the page.
        #[arg(long, allow_negative_numbers = true, default_value_t = 0.0)]
        scroll: f32,
        /// Number of animation frames to advance after the scroll.
        #[arg(long, default_value_t = 0)]
        frames: u32,
        /// Write to this file instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Parser)]
#[command(name = "scroll-scene", version, about = "Scroll-driven 3D scene")]
pub struct CLI {
    /// TOML scene configuration.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Seed for the star field (overrides the config).
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    #[command(subcommand)]
    command: Option<CliCommand>,
}

impl CLI {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    pub fn command(&self) -> CliCommand {
        self.command.clone().unwrap_or(CliCommand::Run)
    }
}
