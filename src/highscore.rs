use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

use crate::error::Result;
use crate::mode::GameMode;

/// Per-mode best scores. Callers treat failures as "no new highscore".
pub trait HighscoreStore {
    fn get_highscore(&self, mode: GameMode) -> Result<u32>;
    /// Record `score`; true when it beats the stored best.
    fn report_score(&mut self, mode: GameMode, score: u32) -> Result<bool>;
    /// Finished games reported for `mode`
    fn games_played(&self, mode: GameMode) -> Result<u32>;
}

/// Highscores kept in a local SQLite database
#[derive(Debug)]
pub struct SqliteHighscoreStore {
    conn: Connection,
}

impl SqliteHighscoreStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS highscores (
                mode TEXT PRIMARY KEY,
                score INTEGER NOT NULL,
                achieved_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS games (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                mode TEXT NOT NULL,
                score INTEGER NOT NULL,
                played_at TEXT NOT NULL
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_games_mode ON games(mode)",
            [],
        )?;

        Ok(Self { conn })
    }
}

impl HighscoreStore for SqliteHighscoreStore {
    fn get_highscore(&self, mode: GameMode) -> Result<u32> {
        let score = self
            .conn
            .query_row(
                "SELECT score FROM highscores WHERE mode = ?1",
                [mode.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(score.unwrap_or(0))
    }

    fn report_score(&mut self, mode: GameMode, score: u32) -> Result<bool> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.transaction()?;

        tx.execute(
            "INSERT INTO games (mode, score, played_at) VALUES (?1, ?2, ?3)",
            params![mode.to_string(), score, now],
        )?;

        let current: Option<u32> = tx
            .query_row(
                "SELECT score FROM highscores WHERE mode = ?1",
                [mode.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        let is_new = score > current.unwrap_or(0);
        if is_new {
            tx.execute(
                r#"
                INSERT INTO highscores (mode, score, achieved_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(mode) DO UPDATE SET score = excluded.score, achieved_at = excluded.achieved_at
                "#,
                params![mode.to_string(), score, now],
            )?;
        }

        tx.commit()?;
        Ok(is_new)
    }

    fn games_played(&self, mode: GameMode) -> Result<u32> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM games WHERE mode = ?1",
            [mode.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

/// Highscores that live as long as the process
#[derive(Debug, Clone, Default)]
pub struct MemoryHighscoreStore {
    scores: HashMap<GameMode, u32>,
    played: HashMap<GameMode, u32>,
}

impl MemoryHighscoreStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HighscoreStore for MemoryHighscoreStore {
    fn get_highscore(&self, mode: GameMode) -> Result<u32> {
        Ok(self.scores.get(&mode).copied().unwrap_or(0))
    }

    fn report_score(&mut self, mode: GameMode, score: u32) -> Result<bool> {
        *self.played.entry(mode).or_insert(0) += 1;
        let best = self.scores.entry(mode).or_insert(0);
        if score > *best {
            *best = score;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn games_played(&self, mode: GameMode) -> Result<u32> {
        Ok(self.played.get(&mode).copied().unwrap_or(0))
    }
}
