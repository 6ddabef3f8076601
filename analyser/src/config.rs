//! Runtime configuration.
//!
//! Every tunable has a compile-time default and can be overridden through an
//! environment variable. Command-line flags take precedence over both.

use std::path::PathBuf;

/// Default number of engine lines.
pub const DEFAULT_MULTIPV: usize = engine::DEFAULT_MULTIPV;

/// Upper bound for the number of engine lines.
pub const MAX_MULTIPV: usize = 8;

/// Default search depth.
pub const DEFAULT_DEPTH: u32 = 18;

/// Default number of retries for remote fetches.
pub const DEFAULT_FETCH_RETRIES: u32 = 3;

const DEFAULT_CONFIG_DIR: &str = ".config/chess-analyser/data";
const DEV_DATA_DIR: &str = "./data";
const DEFAULT_LOG_DIR: &str = "logs";

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Engine executable.
///
/// Priority:
/// 1. `ANALYSER_ENGINE_PATH` env variable if set
/// 2. the first Stockfish found in the usual install locations or on `PATH`
pub fn get_engine_path() -> Option<PathBuf> {
    env_value("ANALYSER_ENGINE_PATH")
        .map(PathBuf::from)
        .or_else(engine::find_stockfish_path)
}

/// Number of multi-PV lines, from `ANALYSER_MULTIPV` (default 3).
pub fn get_multipv() -> usize {
    parse_multipv(env_value("ANALYSER_MULTIPV").as_deref())
}

/// Default search depth, from `ANALYSER_DEPTH` (default 18).
pub fn get_depth() -> u32 {
    parse_depth(env_value("ANALYSER_DEPTH").as_deref())
}

/// Directory of the game store.
///
/// Priority:
/// 1. `ANALYSER_DATA_DIR` env variable if set
/// 2. `$HOME/.config/chess-analyser/data` if HOME is set
/// 3. `./data` as fallback
pub fn get_data_dir() -> PathBuf {
    resolve_data_dir(env_value("ANALYSER_DATA_DIR"), env_value("HOME"))
}

fn resolve_data_dir(data_dir: Option<String>, home: Option<String>) -> PathBuf {
    if let Some(dir) = data_dir {
        return PathBuf::from(dir);
    }

    if let Some(home) = home {
        return PathBuf::from(home).join(DEFAULT_CONFIG_DIR);
    }

    PathBuf::from(DEV_DATA_DIR)
}

/// Directory for rolling log files, from `ANALYSER_LOG_DIR` (default `logs`).
pub fn get_log_dir() -> PathBuf {
    resolve_log_dir(env_value("ANALYSER_LOG_DIR"))
}

fn resolve_log_dir(log_dir: Option<String>) -> PathBuf {
    PathBuf::from(log_dir.unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()))
}

/// Retry count for remote fetches, from `ANALYSER_FETCH_RETRIES` (default 3).
pub fn get_fetch_retries() -> u32 {
    env_value("ANALYSER_FETCH_RETRIES")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(DEFAULT_FETCH_RETRIES)
}

/// Clamp to `1..=MAX_MULTIPV`; unparseable values fall back to the default.
pub fn parse_multipv(value: Option<&str>) -> usize {
    value
        .and_then(|v| v.trim().parse::<usize>().ok())
        .map_or(DEFAULT_MULTIPV, clamp_multipv)
}

pub fn clamp_multipv(lines: usize) -> usize {
    lines.clamp(1, MAX_MULTIPV)
}

/// Clamp to `1..=24`; unparseable values fall back to the default.
pub fn parse_depth(value: Option<&str>) -> u32 {
    value
        .and_then(|v| v.trim().parse::<u32>().ok())
        .map_or(DEFAULT_DEPTH, clamp_depth)
}

pub fn clamp_depth(depth: u32) -> u32 {
    depth.clamp(1, engine::MAX_DEPTH as u32)
}
