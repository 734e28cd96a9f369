//! Table definitions for the score store.

use sqlx::PgPool;
use tracing::info;

/// Idempotent DDL, one statement per entry.
pub const SCHEMA: &[&str] = &[
    r#"
CREATE TABLE IF NOT EXISTS team (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    name TEXT NOT NULL,
    abbreviation TEXT NOT NULL UNIQUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
)"#,
    r#"
CREATE TABLE IF NOT EXISTS game (
    id TEXT PRIMARY KEY,
    game_time TIMESTAMPTZ NOT NULL,
    quarter TEXT NOT NULL DEFAULT '',
    game_clock TEXT NOT NULL DEFAULT '',
    away_team UUID NOT NULL REFERENCES team(id),
    home_team UUID NOT NULL REFERENCES team(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ
)"#,
    "CREATE INDEX IF NOT EXISTS idx_game_game_time ON game(game_time)",
    r#"
CREATE TABLE IF NOT EXISTS game_quarter_score (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    game_id TEXT NOT NULL REFERENCES game(id),
    team_id UUID NOT NULL REFERENCES team(id),
    quarter TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    deleted_at TIMESTAMPTZ,
    UNIQUE (game_id, team_id, quarter)
)"#,
];

pub async fn apply_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    info!("Schema applied ({} statements)", SCHEMA.len());
    Ok(())
}
