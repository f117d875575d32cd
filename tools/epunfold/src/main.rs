use std::fs;
use std::fs::File;
use std::path::Path;
use std::path::PathBuf;
use std::process::Command;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use log::warn;

use epunfold_driver::DriverEvent;
use epunfold_driver::viz;
use epunfold_game::io::load_game;
use epunfold_tools::Version;
use epunfold_tools::VersionFlag;
use epunfold_tools::verbosity::VerbosityFlag;
use epunfold_tools::verbosity::Verbosity;
use epunfold_utilities::EpunfoldError;
use epunfold_utilities::Timing;

#[derive(clap::Parser, Debug)]
#[command(
    about = "Perform epistemic unfolding up to homomorphic cores on a game",
    arg_required_else_help = true
)]
struct Cli {
    #[command(flatten)]
    version: VersionFlag,

    #[command(flatten)]
    verbosity: VerbosityFlag,

    /// The filepath of the game to unfold.
    file: PathBuf,

    // No short flag: `-d` is already claimed by VerbosityFlag's debug level.
    #[arg(long = "dir", default_value = "main", value_name = "DIR", help = "Write the results to DIR")]
    output_dir: PathBuf,

    #[arg(short = 'c', long = "skip-core", default_value_t = false, help = "Skip finding the homomorphic core of each model")]
    skip_core: bool,

    #[arg(long, global = true)]
    timings: bool,
}

fn main() -> Result<ExitCode, EpunfoldError> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .parse_default_env()
        .init();

    if cli.version.into() {
        eprintln!("{}", Version);
        return Ok(ExitCode::SUCCESS);
    }

    let mut timing = Timing::new();
    let show_models = !matches!(cli.verbosity.verbosity(), Verbosity::Quiet);

    let mut time_read = timing.start("load_game");
    let game = load_game(File::open(&cli.file)?)?;
    time_read.finish();
    info!("Game successfully loaded");

    fs::create_dir_all(&cli.output_dir)?;
    let models_dir = cli.output_dir.join("models");
    fs::create_dir_all(&models_dir)?;

    fs::write(cli.output_dir.join("input_game.dot"), viz::render_game_dot(&game))?;
    render_png(&cli.output_dir.join("input_game.dot"), &cli.output_dir.join("input_game.png"));
    info!("Input game visualized");

    let mut time_unfold = timing.start("unfold");
    let graph = epunfold_driver::run(&game, !cli.skip_core, |event| {
        if show_models {
            print_event(&event, &game);
        }
    });
    time_unfold.finish();

    let mut model_image_paths = Vec::with_capacity(graph.locations.len());
    for (index, model) in graph.locations.iter().enumerate() {
        let dot_path = models_dir.join(format!("model{index}.dot"));
        let png_path = models_dir.join(format!("model{index}.png"));
        fs::write(&dot_path, viz::render_model_dot(model, &game))?;
        render_png(&dot_path, &png_path);
        model_image_paths.push(format!("models/model{index}.png"));
    }

    let unfolded_dot = viz::render_location_graph_dot(&graph, 0, &model_image_paths);
    fs::write(cli.output_dir.join("unfolded_game.dot"), unfolded_dot)?;
    render_png(&cli.output_dir.join("unfolded_game.dot"), &cli.output_dir.join("unfolded_game.png"));

    info!("Unfolded game visualized, {} models discovered", graph.locations.len());

    if cli.timings {
        timing.print();
    }

    Ok(ExitCode::SUCCESS)
}

fn print_event(event: &DriverEvent, game: &epunfold_game::DistributedGame) {
    match event {
        DriverEvent::Expanding { model, successor_count } => {
            println!("considering model:");
            println!("{}", model.describe(game));
            println!("unfolded to {successor_count} successors");
        }
        DriverEvent::Discovered { model, .. } => {
            println!("successor model:");
            println!("{}", model.describe(game));
        }
        DriverEvent::Repetition { model } => {
            println!("isomorphic to already-discovered model:");
            println!("{}", model.describe(game));
        }
    }
}

/// Shells out to `dot -Tpng` to render `dot_path` to `png_path`. Best
/// effort: a missing `dot` binary or a failed render only logs a warning,
/// since the DOT output is the crate's real deliverable.
fn render_png(dot_path: &Path, png_path: &Path) {
    let result = Command::new("dot").arg("-Tpng").arg(dot_path).arg("-o").arg(png_path).status();
    match result {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("dot exited with {status} rendering {}", dot_path.display()),
        Err(error) => warn!("could not run 'dot' to render {}: {error}", dot_path.display()),
    }
}
