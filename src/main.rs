use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reversi_mdp::ai::{Agent, AgentData, AgentRegistry};
use reversi_mdp::backend::{build_backend, Backend, BackendKind, ExhaustiveBackend};
use reversi_mdp::config::AppConfig;
use reversi_mdp::env::Environment;
use reversi_mdp::error::ConfigError;
use reversi_mdp::game::{Board, BoardSize, CanonicalBoard, Color, Outcome};
use reversi_mdp::gameplay::{PacedGameplay, Phase, Tournament, TournamentResults};

/// Longest sleep between render frames while watching.
const FRAME: Duration = Duration::from_millis(10);

/// Play Reversi between two agents, optionally letting them learn.
#[derive(Parser)]
#[command(name = "reversi", about = "Play Reversi between tabular agents")]
struct Cli {
    /// Agent for the first seat (Black in the first game)
    first: String,

    /// Agent for the second seat
    second: String,

    /// Let the first agent learn
    #[arg(short = '1', long)]
    learn1: bool,

    /// Let the second agent learn
    #[arg(short = '2', long)]
    learn2: bool,

    /// Override board rows
    #[arg(long)]
    rows: Option<usize>,

    /// Override board columns
    #[arg(long)]
    cols: Option<usize>,

    /// Number of games to play
    #[arg(short = 'n', long)]
    number: Option<usize>,

    /// Backend: live or exhaustive
    #[arg(long)]
    backend: Option<String>,

    /// Path to TOML configuration file
    #[arg(long, default_value = "reversi.toml")]
    config: PathBuf,

    /// Override the random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Directory holding saved agent data and enumerated boards
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Show every move, paced by `gameplay.delay_ms`
    #[arg(short = 'w', long)]
    watch: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    apply_overrides(&mut config, &cli)?;
    config.validate().context("validating configuration")?;

    let size = config.board.size()?;
    let backend = prepare_backend(config.backend.kind, size, config.backend.max_states, &cli.data_dir)
        .context("building backend")?;
    let env = Arc::new(Environment::new(backend, config.reward.policy));

    let registry = AgentRegistry::with_builtin();
    let seed = config.gameplay.seed;
    let first = prepare_agent(&registry, &config, &cli.first, Color::Black, seed, cli.learn1, &cli.data_dir, size)?;
    let second = prepare_agent(
        &registry,
        &config,
        &cli.second,
        Color::White,
        seed.wrapping_add(1),
        cli.learn2,
        &cli.data_dir,
        size,
    )?;

    info!(
        first = %cli.first,
        second = %cli.second,
        rows = size.rows(),
        cols = size.cols(),
        games = config.gameplay.games,
        "Starting games"
    );
    let (results, first, second) = if cli.watch {
        watch_games(env, first, second, config.gameplay.games, config.gameplay.delay())?
    } else {
        let mut tournament = Tournament::new(env, first, second).context("seating players")?;
        let results = tournament.play(config.gameplay.games)?;
        let (first, second) = tournament.into_players();
        (results, first, second)
    };
    println!("{} vs {}: {}", cli.first, cli.second, results);

    for agent in [first, second].into_iter().flatten() {
        if agent.is_learning() {
            save_agent(agent.as_ref(), &cli.data_dir, size)?;
        }
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, cli: &Cli) -> Result<()> {
    if let Some(rows) = cli.rows {
        config.board.rows = rows;
    }
    if let Some(cols) = cli.cols {
        config.board.cols = cols;
    }
    if let Some(games) = cli.number {
        config.gameplay.games = games;
    }
    if let Some(seed) = cli.seed {
        config.gameplay.seed = seed;
    }
    if let Some(kind) = cli.backend.as_deref() {
        config.backend.kind = match kind {
            "live" => BackendKind::Live,
            "exhaustive" => BackendKind::Exhaustive,
            other => bail!("unknown backend '{}' (expected 'live' or 'exhaustive')", other),
        };
    }
    Ok(())
}

/// Build the backend. The exhaustive backend reuses the boards saved under
/// `<data-dir>/<rows>x<cols>/boards.json` and saves them there after a fresh
/// enumeration.
fn prepare_backend(
    kind: BackendKind,
    size: BoardSize,
    max_states: usize,
    data_dir: &Path,
) -> Result<Arc<dyn Backend>> {
    if kind == BackendKind::Live {
        return Ok(build_backend(kind, size, max_states)?);
    }

    let path = size_dir(data_dir, size).join("boards.json");
    if let Some(boards) = load_json::<Vec<CanonicalBoard>>(&path)? {
        let backend = ExhaustiveBackend::from_boards(size, boards.into_iter().collect(), max_states)
            .with_context(|| format!("loading boards from {}", path.display()))?;
        return Ok(Arc::new(backend));
    }

    let backend = ExhaustiveBackend::new(size, max_states)?;
    write_json(&path, &backend.sorted_boards())?;
    info!(boards = backend.len(), path = %path.display(), "Saved reachable boards");
    Ok(Arc::new(backend))
}

/// Play `games` paced games, printing each board as it changes. Colors
/// alternate as in a tournament, with `first` opening as Black.
fn watch_games(
    env: Arc<Environment>,
    first: Box<dyn Agent>,
    second: Box<dyn Agent>,
    games: usize,
    delay: Duration,
) -> Result<(TournamentResults, Option<Box<dyn Agent>>, Option<Box<dyn Agent>>)> {
    let mut gameplay = PacedGameplay::new(env, delay);
    gameplay.set_players(Some(first), Some(second)).context("seating players")?;
    let mut results = TournamentResults::default();
    let mut first_is_black = true;
    let frame = delay.min(FRAME);

    for game in 0..games {
        if game > 0 {
            gameplay.reset();
            gameplay.swap_players();
            first_is_black = !first_is_black;
        }
        println!("Game {}", game + 1);

        let mut shown: Option<Board> = None;
        let outcome = gameplay.play(|view| {
            if shown.as_ref() != Some(view.board) {
                if let Some(mv) = view.last_move {
                    println!("move ({}, {})", mv.row, mv.col);
                }
                println!("{}\n", view.board);
                shown = Some(view.board.clone());
            }
            if view.phase != Phase::Done && !frame.is_zero() {
                thread::sleep(frame);
            }
            None
        })?;

        let Some(outcome) = outcome else {
            warn!(game = game + 1, "Game stopped before the end");
            break;
        };
        results.games += 1;
        match outcome {
            Outcome::Draw => results.draws += 1,
            Outcome::Winner(color) if (color == Color::Black) == first_is_black => results.first_wins += 1,
            Outcome::Winner(_) => results.second_wins += 1,
        }
        info!(game = game + 1, ?outcome, "Game finished");
    }

    let (black, white) = gameplay.dispose();
    Ok(if first_is_black {
        (results, black, white)
    } else {
        (results, white, black)
    })
}

#[allow(clippy::too_many_arguments)]
fn prepare_agent(
    registry: &AgentRegistry,
    config: &AppConfig,
    name: &str,
    seat: Color,
    seed: u64,
    learning: bool,
    data_dir: &Path,
    size: BoardSize,
) -> Result<Box<dyn Agent>> {
    let mut agent = registry
        .construct(name, config, seed)?
        .ok_or(ConfigError::HumanNotAllowed { seat })?;
    agent.set_learning(learning);

    let path = data_path(data_dir, size, name);
    if let Some(data) = load_json::<AgentData>(&path)? {
        agent
            .set_saved_data(data)
            .with_context(|| format!("restoring {}", path.display()))?;
        info!(agent = name, path = %path.display(), "Loaded saved data");
    }
    Ok(agent)
}

/// `<data-dir>/<rows>x<cols>`
fn size_dir(data_dir: &Path, size: BoardSize) -> PathBuf {
    data_dir.join(format!("{}x{}", size.rows(), size.cols()))
}

/// `<data-dir>/<rows>x<cols>/<agent>.json`
fn data_path(data_dir: &Path, size: BoardSize, name: &str) -> PathBuf {
    size_dir(data_dir, size).join(format!("{name}.json"))
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let data = serde_json::from_str(&json).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(data))
}

fn save_agent(agent: &dyn Agent, data_dir: &Path, size: BoardSize) -> Result<()> {
    let Some(data) = agent.get_data_to_save() else {
        warn!(agent = agent.name(), "Nothing to save");
        return Ok(());
    };
    let path = data_path(data_dir, size, agent.name());
    write_json(&path, &data)?;
    info!(agent = agent.name(), path = %path.display(), "Saved agent data");
    Ok(())
}

/// Write through a temporary file so a crash never leaves half a table.
fn write_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string(data)?)
        .with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reversi_mdp::env::State;
    use reversi_mdp::game::{Board, Move};

    #[test]
    fn test_data_path_layout() {
        let size = BoardSize::new(6, 6).unwrap();
        assert_eq!(
            data_path(Path::new("data"), size, "q_learning"),
            PathBuf::from("data/6x6/q_learning.json")
        );
    }

    #[test]
    fn test_agent_data_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let size = BoardSize::new(4, 4).unwrap();
        let state = State::from_board(&Board::initial(size), Color::Black);
        let data = AgentData::ActionValues(vec![(state, Move::new(0, 1), 0.25)]);

        let path = data_path(dir.path(), size, "sarsa");
        write_json(&path, &data).unwrap();
        assert_eq!(load_json::<AgentData>(&path).unwrap(), Some(data));
    }

    #[test]
    fn test_missing_data_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(load_json::<AgentData>(&dir.path().join("none.json")).unwrap(), None);
    }

    #[test]
    fn test_exhaustive_boards_are_saved_then_reused() {
        let dir = tempfile::tempdir().unwrap();
        let size = BoardSize::new(3, 4).unwrap();
        let path = dir.path().join("3x4").join("boards.json");

        let fresh = prepare_backend(BackendKind::Exhaustive, size, 1_000_000, dir.path()).unwrap();
        assert!(path.exists());
        let loaded = prepare_backend(BackendKind::Exhaustive, size, 1_000_000, dir.path()).unwrap();
        assert_eq!(loaded.kind(), BackendKind::Exhaustive);
        assert_eq!(
            fresh.reachable_boards().unwrap(),
            loaded.reachable_boards().unwrap()
        );
    }

    #[test]
    fn test_saved_boards_for_another_size_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let small = BoardSize::new(2, 4).unwrap();
        let large = BoardSize::new(3, 4).unwrap();
        let saved = ExhaustiveBackend::new(small, 1_000_000).unwrap();
        let path = dir.path().join("3x4").join("boards.json");
        write_json(&path, &saved.sorted_boards()).unwrap();

        assert!(prepare_backend(BackendKind::Exhaustive, large, 1_000_000, dir.path()).is_err());
    }

    #[test]
    fn test_live_backend_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let size = BoardSize::new(3, 4).unwrap();
        let backend = prepare_backend(BackendKind::Live, size, 1_000_000, dir.path()).unwrap();
        assert_eq!(backend.kind(), BackendKind::Live);
        assert!(!dir.path().join("3x4").exists());
    }

    #[test]
    fn test_watched_games_alternate_and_tally() {
        let size = BoardSize::new(3, 4).unwrap();
        let env = Arc::new(Environment::new(
            build_backend(BackendKind::Live, size, 1_000_000).unwrap(),
            reversi_mdp::env::RewardPolicy::WinLoss,
        ));
        let registry = AgentRegistry::with_builtin();
        let config = AppConfig::default();
        let first = registry.construct("random", &config, 1).unwrap().unwrap();
        let second = registry.construct("q_learning", &config, 2).unwrap().unwrap();

        let (results, first, second) = watch_games(env, first, second, 3, Duration::ZERO).unwrap();
        assert_eq!(results.games, 3);
        assert_eq!(results.first_wins + results.second_wins + results.draws, 3);
        assert_eq!(first.unwrap().name(), "random");
        assert_eq!(second.unwrap().name(), "q_learning");
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::try_parse_from([
            "reversi", "sarsa", "random", "-1", "--rows", "4", "--cols", "4", "-n", "10",
            "--backend", "exhaustive",
        ])
        .unwrap();
        assert!(cli.learn1);
        assert!(!cli.learn2);
        assert!(!cli.watch);
        assert_eq!(cli.number, Some(10));

        let mut config = AppConfig::default();
        apply_overrides(&mut config, &cli).unwrap();
        assert_eq!(config.board.rows, 4);
        assert_eq!(config.backend.kind, BackendKind::Exhaustive);
        assert_eq!(config.gameplay.games, 10);
    }

    #[test]
    fn test_cli_parses_watch() {
        let cli = Cli::try_parse_from(["reversi", "mcts", "random", "--watch"]).unwrap();
        assert!(cli.watch);
        let cli = Cli::try_parse_from(["reversi", "mcts", "random", "-w"]).unwrap();
        assert!(cli.watch);
    }

    #[test]
    fn test_human_seat_is_refused() {
        let registry = AgentRegistry::with_builtin();
        let dir = tempfile::tempdir().unwrap();
        let size = BoardSize::new(4, 4).unwrap();
        let result = prepare_agent(
            &registry,
            &AppConfig::default(),
            "human",
            Color::White,
            0,
            false,
            dir.path(),
            size,
        );
        assert!(result.is_err());
    }
}
