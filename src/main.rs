mod engine;
mod utils;

use std::fs::File;
use std::io::{self, BufWriter, Write};

use engine::EngineResult;
use engine::cli::{CLI, CliCommand};
use engine::config::SceneConfig;
use engine::scene::init::{build_scene, star_rng};

fn main() {
    let cli = CLI::parse_args();
    utils::logger::init();

    if let Err(e) = run(&cli) {
        log::error!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: &CLI) -> EngineResult<()> {
    let mut config = SceneConfig::load(cli.config.as_deref())?;
    if let Some(seed) = cli.seed {
        config.stars.seed = Some(seed);
    }

    let mut ctx = build_scene(&config, &mut star_rng(&config));

    match cli.command() {
        CliCommand::Run => {
            let renderer = engine::graphics::Renderer::new();
            engine::Windowing::run_app(ctx, renderer, &config)
        }
        CliCommand::Snapshot {
            scroll,
            frames,
            out,
        } => {
            let snapshot = engine::snapshot::run(&mut ctx, &config.scroll, scroll, frames);
            match out {
                Some(path) => {
                    let mut file = BufWriter::new(File::create(&path)?);
                    engine::snapshot::write_json(&snapshot, &mut file)?;
                    file.flush()?;
                    log::info!("snapshot written to {}", path.display());
                }
                None => engine::snapshot::write_json(&snapshot, &mut io::stdout().lock())?,
            }
            Ok(())
        }
    }
}
