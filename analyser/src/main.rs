//! chess-analyser: fetch, browse and analyse chess games from the terminal.
//!
//! Games are stored as JSON files under the data directory (see [`config`]).
//! `analyse` replays a game to the requested move and streams a local UCI
//! engine's multi-PV lines until the search completes.

use std::path::PathBuf;

use anyhow::Context;
use chess::{GameResult, PositionHistory};
use chess_analyser::analysis::{AnalysisEvent, AnalysisLine};
use chess_analyser::{config, spawn_analysis, GameViewer, SessionSettings};
use clap::{Args, Parser, Subcommand};
use engine::StockfishLauncher;
use games::{ChessComClient, Game, GameStore, JsonGameStore, Player, RemoteGameSource};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "chess-analyser", about = "Chess game viewer with local engine analysis")]
struct Cli {
    /// Game store directory (default: $ANALYSER_DATA_DIR or ~/.config/chess-analyser/data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download a player's games for one month from chess.com.
    Fetch {
        username: String,
        year: i32,
        /// 1-12
        month: u32,
    },
    /// List stored games, newest first.
    List {
        /// Only starred games.
        #[arg(long)]
        starred: bool,
    },
    /// Mark a game as a favourite.
    Star { id: String },
    /// Remove the favourite mark.
    Unstar { id: String },
    /// Print a game's moves with clock times.
    Show { id: String },
    /// Store a game from a PGN file under a new id.
    Import { file: PathBuf },
    /// Analyse a position from a stored game or a PGN file.
    Analyse(AnalyseArgs),
}

#[derive(Args)]
struct AnalyseArgs {
    /// Id of a stored game.
    #[arg(required_unless_present = "pgn", conflicts_with = "pgn")]
    id: Option<String>,

    /// Read the game from a PGN file instead.
    #[arg(long)]
    pgn: Option<PathBuf>,

    /// Half-moves to play before analysing (0 = initial position).
    #[arg(long = "move", default_value_t = 0)]
    ply: usize,

    /// Search depth (1-24, default: $ANALYSER_DEPTH or 18).
    #[arg(long)]
    depth: Option<u32>,

    /// Number of lines (1-8, default: $ANALYSER_MULTIPV or 3).
    #[arg(long)]
    multipv: Option<usize>,

    /// Engine executable (default: $ANALYSER_ENGINE_PATH or a discovered Stockfish).
    #[arg(long)]
    engine: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("no game with id {0} in the local store")]
    GameNotFound(String),

    #[error("no chess engine found; install stockfish or set ANALYSER_ENGINE_PATH")]
    EngineNotFound,

    #[error("analysis stopped: {0}")]
    AnalysisEnded(String),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_dir = config::get_log_dir();
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "chess-analyser");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let data_dir = cli.data_dir.unwrap_or_else(config::get_data_dir);
    tracing::info!("Using data directory: {}", data_dir.display());
    let store = JsonGameStore::new(data_dir);

    match cli.command {
        Commands::Fetch {
            username,
            year,
            month,
        } => fetch(&store, &username, year, month).await,
        Commands::List { starred } => list(&store, starred).await,
        Commands::Star { id } => set_starred(&store, &id, true).await,
        Commands::Unstar { id } => set_starred(&store, &id, false).await,
        Commands::Show { id } => show(&store, &id).await,
        Commands::Import { file } => import(&store, &file).await,
        Commands::Analyse(args) => analyse(&store, args).await,
    }
}

async fn fetch(store: &JsonGameStore, username: &str, year: i32, month: u32) -> anyhow::Result<()> {
    let client = ChessComClient::new(config::get_fetch_retries())?;
    let games = client
        .fetch_games(username, year, month)
        .await
        .with_context(|| format!("fetching {} games for {}-{:02}", username, year, month))?;

    for mut game in games.iter().cloned() {
        if let Some(existing) = store.get(&game.uuid).await? {
            game.starred = existing.starred;
        }
        store.put(&game).await?;
    }
    println!("Stored {} games for {} ({}-{:02})", games.len(), username, year, month);
    Ok(())
}

async fn list(store: &JsonGameStore, starred: bool) -> anyhow::Result<()> {
    let games = if starred {
        store.starred().await?
    } else {
        store.list().await?
    };
    if games.is_empty() {
        println!("No games stored. Try `chess-analyser fetch <username> <year> <month>`.");
        return Ok(());
    }
    for game in &games {
        println!("{}", list_row(game));
    }
    Ok(())
}

async fn set_starred(store: &JsonGameStore, id: &str, starred: bool) -> anyhow::Result<()> {
    store.set_starred(id, starred).await.map_err(|e| match e {
        games::StoreError::NotFound(id) => anyhow::Error::new(CliError::GameNotFound(id)),
        other => other.into(),
    })?;
    println!("{} {}", if starred { "Starred" } else { "Unstarred" }, id);
    Ok(())
}

async fn show(store: &JsonGameStore, id: &str) -> anyhow::Result<()> {
    let game = load_game(store, id).await?;
    let history = PositionHistory::load(&game.pgn).context("replaying stored PGN")?;

    println!("{}  {}", game.players_label(), game.score_label());
    if let Some(ended) = game.ended_at() {
        println!("{}  {} {}", ended.format("%Y-%m-%d %H:%M"), game.time_class, game.time_control);
    }
    if let Some(acc) = game.accuracies {
        println!("Accuracy: {:.1} / {:.1}", acc.white, acc.black);
    }
    println!();
    for row in move_rows(&history) {
        println!("{}", row);
    }
    Ok(())
}

async fn import(store: &JsonGameStore, file: &std::path::Path) -> anyhow::Result<()> {
    let pgn = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let id = uuid::Uuid::new_v4().to_string();
    let game = game_from_pgn(&pgn, id, chrono::Utc::now().timestamp())?;
    store.put(&game).await?;
    println!("Imported {} as {}", game.players_label(), game.uuid);
    Ok(())
}

async fn analyse(store: &JsonGameStore, args: AnalyseArgs) -> anyhow::Result<()> {
    let pgn = match (&args.pgn, &args.id) {
        (Some(path), _) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, Some(id)) => load_game(store, id).await?.pgn,
        (None, None) => anyhow::bail!("give a game id or --pgn <file>"),
    };

    let depth = args.depth.map_or_else(config::get_depth, config::clamp_depth);
    let multipv = args.multipv.map_or_else(config::get_multipv, config::clamp_multipv);
    let engine_path = args
        .engine
        .or_else(config::get_engine_path)
        .ok_or(CliError::EngineNotFound)?;

    let mut viewer = GameViewer::new(SessionSettings::new(false, depth));
    let loaded = viewer.load_pgn(&pgn).context("replaying game")?;
    let position = args
        .ply
        .checked_sub(1)
        .and_then(|index| viewer.go_to_move(Some(index)))
        .unwrap_or(loaded);

    println!("Position: {}", viewer.current_fen());
    if let Some(last) = viewer.last_move() {
        println!("After {} ({})", last.san, viewer.ply());
    }
    println!("Engine: {} (depth {}, {} lines)", engine_path.display(), depth, multipv);

    let handle = spawn_analysis(StockfishLauncher::new(engine_path), multipv);
    let (_, mut events) = handle.subscribe().await?;
    handle.apply(position).await?;
    if let Some(enable) = viewer.set_settings(SessionSettings::new(true, depth)) {
        handle.apply(enable).await?;
    }

    let fullmove = fullmove_number(viewer.current_fen());
    let mut latest = Vec::new();
    let outcome = loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                handle.stop().await?;
                continue;
            }
        };
        match event {
            Ok(AnalysisEvent::Ready) => tracing::info!("Engine ready"),
            Ok(AnalysisEvent::Lines(lines)) => {
                if let Some(block) = next_block(&mut latest, lines) {
                    print_block(&block, fullmove);
                }
            }
            Ok(AnalysisEvent::BestMove { best_move, ponder }) => {
                print_block(&latest, fullmove);
                println!();
                println!(
                    "{}",
                    best_move_text(viewer.current_fen(), &best_move, ponder.as_deref())
                );
                break Ok(());
            }
            Ok(AnalysisEvent::Unavailable(reason)) => break Err(CliError::AnalysisEnded(reason)),
            Ok(AnalysisEvent::Error(e)) => {
                tracing::warn!("Analysis error: {}", e);
                eprintln!("warning: {}", e);
            }
            Err(RecvError::Lagged(skipped)) => tracing::debug!(skipped, "Dropped analysis events"),
            Err(RecvError::Closed) => break Err(CliError::AnalysisEnded("actor closed".into())),
        }
    };

    handle.shutdown().await;
    outcome.map_err(Into::into)
}

async fn load_game(store: &JsonGameStore, id: &str) -> anyhow::Result<Game> {
    let game = store
        .get(id)
        .await
        .with_context(|| format!("reading game {}", id))?
        .ok_or_else(|| CliError::GameNotFound(id.to_string()))?;
    Ok(game)
}

fn list_row(game: &Game) -> String {
    let date = game
        .ended_at()
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!(
        "{} {}  {}  {:<7} {:<7} {:>3} moves  {}",
        if game.starred { '*' } else { ' ' },
        game.uuid,
        date,
        game.time_class,
        game.score_label(),
        game.move_count(),
        game.players_label()
    )
}

/// One row per full move: `  1. e4 (0:02:59)    e5 (0:02:58)`.
fn move_rows(history: &PositionHistory) -> Vec<String> {
    let black_first =
        chess::analysis::side_to_move(history.initial_fen()) == Some(chess::Color::Black);
    let mut number = fullmove_number(history.initial_fen());
    let mut rows = Vec::new();
    let mut row = String::new();

    for (i, entry) in history.entries().iter().enumerate() {
        let cell = match &entry.clock {
            Some(clock) => format!("{} ({})", entry.san, clock),
            None => entry.san.clone(),
        };
        let white_move = (i % 2 == 0) != black_first;
        if white_move {
            row = format!("{:>3}. {:<16}", number, cell);
        } else {
            if row.is_empty() {
                row = format!("{:>3}. {:<16}", number, "...");
            }
            row.push_str(&cell);
            rows.push(std::mem::take(&mut row).trim_end().to_string());
            number += 1;
        }
    }
    if !row.is_empty() {
        rows.push(row.trim_end().to_string());
    }
    rows
}

fn format_line(line: &AnalysisLine, fullmove: u32) -> String {
    let mut out = format!("{:>2}. {:>7}  {}", line.rank, line.score_text(), line.numbered_pv(fullmove));
    if let Some(wdl) = line.wdl {
        out.push_str(&format!(
            "  [W {:.1}% D {:.1}% L {:.1}%]",
            wdl.win as f64 / 10.0,
            wdl.draw as f64 / 10.0,
            wdl.loss as f64 / 10.0
        ));
    }
    out
}

/// Keep the newest multi-PV lines in `latest`. The engine sends one rank at a
/// time, so a block is complete only once rank 1 of a deeper search arrives;
/// that finished block is returned.
fn next_block(latest: &mut Vec<AnalysisLine>, incoming: Vec<AnalysisLine>) -> Option<Vec<AnalysisLine>> {
    let deeper = latest
        .first()
        .zip(incoming.first())
        .is_some_and(|(old, new)| new.depth > old.depth);
    let previous = std::mem::replace(latest, incoming);
    deeper.then_some(previous)
}

fn print_block(lines: &[AnalysisLine], fullmove: u32) {
    let Some(first) = lines.first() else {
        return;
    };
    println!();
    match first.white_score() {
        Some(score) => println!("depth {}  {}", first.depth, eval_bar(score.eval_bar_percent())),
        None => println!("depth {}", first.depth),
    }
    for line in lines {
        println!("{}", format_line(line, fullmove));
    }
}

fn best_move_text(fen: &str, best_move: &str, ponder: Option<&str>) -> String {
    let mut pv = vec![best_move];
    pv.extend(ponder);
    match chess::translate_pv(fen, &pv).as_slice() {
        [best, ponder, ..] => format!("Best move: {} (ponder {})", best, ponder),
        [best] => format!("Best move: {}", best),
        [] => format!("No legal move ({})", best_move),
    }
}

/// `[#########-----------] 45%`, filled from White's side.
fn eval_bar(percent: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((percent / 100.0) * WIDTH as f64).round() as usize;
    let filled = filled.min(WIDTH);
    format!(
        "[{}{}] {:.0}%",
        "#".repeat(filled),
        "-".repeat(WIDTH - filled),
        percent
    )
}

fn fullmove_number(fen: &str) -> u32 {
    fen.split_whitespace()
        .nth(5)
        .and_then(|n| n.parse().ok())
        .unwrap_or(1)
}

/// A locally imported game. Players and time control come from the PGN tags.
fn game_from_pgn(pgn: &str, uuid: String, end_time: i64) -> anyhow::Result<Game> {
    let history = PositionHistory::load(pgn).context("not a playable PGN game")?;
    let (white_result, black_result) = match history.result() {
        GameResult::WhiteWins => ("win", "lose"),
        GameResult::BlackWins => ("lose", "win"),
        GameResult::Draw => ("agreed", "agreed"),
        GameResult::Ongoing => ("", ""),
    };
    let player = |name_tag: &str, elo_tag: &str, result: &str| Player {
        username: history.tag(name_tag).unwrap_or("?").to_string(),
        rating: history
            .tag(elo_tag)
            .and_then(|elo| elo.parse().ok())
            .unwrap_or(0),
        result: result.to_string(),
        uuid: String::new(),
    };

    Ok(Game {
        uuid,
        url: String::new(),
        pgn: pgn.to_string(),
        tcn: None,
        fen: history
            .fen_at_ply(history.len())
            .unwrap_or(history.initial_fen())
            .to_string(),
        time_class: String::new(),
        time_control: history.tag("TimeControl").unwrap_or_default().to_string(),
        rules: "chess".to_string(),
        rated: false,
        end_time,
        accuracies: None,
        white: player("White", "WhiteElo", white_result),
        black: player("Black", "BlackElo", black_result),
        starred: false,
    })
}
