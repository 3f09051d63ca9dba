use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::Verbosity;

use slide48::{Direction, Engine, Outcome, Profile};

/// Plays a game of 2048 from a list of commands.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Board size; defaults to the size last played in the profile, or 4.
    #[arg(short, long)]
    size: Option<usize>,

    /// Seed for the tile spawner. The same seed and commands always give the same game.
    #[arg(long)]
    seed: Option<u64>,

    /// JSON profile to resume from and write back to.
    #[arg(short, long)]
    profile: Option<PathBuf>,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    verbose: Verbosity,

    /// Commands to run in order: up, down, left, right (or u, d, l, r), undo, new.
    commands: Vec<Command>,
}

#[derive(Clone, Debug)]
enum Command {
    Shift(Direction),
    Undo,
    New,
}

impl std::str::FromStr for Command {
    type Err = slide48::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "undo" | "z" => Ok(Command::Undo),
            "new" => Ok(Command::New),
            s => s.parse().map(Command::Shift),
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message,
            ))
        })
        .level(args.verbose.log_level_filter());
    let dispatch = match &args.log_file {
        Some(path) => dispatch.chain(fern::log_file(path)?),
        None => dispatch.chain(std::io::stderr()),
    };
    dispatch.apply()?;

    let mut profile = match &args.profile {
        Some(path) => read_profile(path)?,
        None => Profile::default(),
    };
    let size = args.size.unwrap_or_else(|| profile.playable_size());

    let mut engine = Engine::new(size, args.seed)?;
    engine.set_best_score(size, profile.best_score(size));
    if let Some(save) = profile.save(size) {
        if let Err(e) = save.and_then(|data| engine.load_save(data).map(|_| ())) {
            if !e.is_malformed_save() {
                return Err(e.into());
            }
            log::warn!("discarding saved {size}x{size} game: {e}");
        }
    }

    let mut last = None;
    for command in &args.commands {
        let outcome = match command {
            Command::Shift(direction) => engine.shift(*direction),
            Command::Undo => engine.undo(),
            Command::New => {
                engine.new_game(size)?;
                continue;
            }
        };
        if !outcome.changed {
            log::info!("{command:?} had no effect");
        }
        last = Some(outcome);
    }

    print(&engine, last.as_ref());

    if let Some(path) = &args.profile {
        profile.board_size = size;
        profile.store(&engine.serialize_save())?;
        profile.record_best(size, engine.best_score());
        std::fs::write(path, profile.to_json()?)
            .with_context(|| format!("writing profile {}", path.display()))?;
    }
    Ok(())
}

fn read_profile(path: &Path) -> Result<Profile> {
    if !path.exists() {
        return Ok(Profile::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    match Profile::from_json(&text) {
        Ok(profile) => Ok(profile),
        Err(e) => {
            log::warn!("ignoring unreadable profile {}: {e}", path.display());
            Ok(Profile::default())
        }
    }
}

fn print(engine: &Engine, last: Option<&Outcome>) {
    let state = engine.state();
    print!("{state}");
    println!(
        "score {0}  best {1}  undo {2}",
        state.score,
        engine.best_score(),
        engine.history().len()
    );
    if state.game_won {
        println!("you reached 2048!");
    }
    if state.game_over {
        println!("game over");
    }
    if let Some(outcome) = last.filter(|o| !o.delta.is_empty()) {
        print!("last change:\n{0}", outcome.delta);
    }
}
