use sqlx::postgres::{PgPool, PgPoolOptions};

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await
}

/// Run the full Postgres schema migration inline.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(SCHEMA_SQL).execute(pool).await?;
    Ok(())
}

const SCHEMA_SQL: &str = r#"
-- Accounts table (app authentication + game ownership)
CREATE TABLE IF NOT EXISTS accounts (
    id            BIGSERIAL PRIMARY KEY,
    username      TEXT UNIQUE NOT NULL,
    email         TEXT UNIQUE NOT NULL,
    password_hash TEXT NOT NULL,
    display_name  TEXT,
    created_at    TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Uploaded games (owned by accounts)
CREATE TABLE IF NOT EXISTS games (
    id          BIGSERIAL PRIMARY KEY,
    owner_id    BIGINT NOT NULL REFERENCES accounts(id),
    event       TEXT,
    white       TEXT NOT NULL,
    black       TEXT NOT NULL,
    date        TEXT,
    result      TEXT NOT NULL,
    moves       JSONB NOT NULL DEFAULT '[]'::jsonb,
    status      TEXT NOT NULL DEFAULT 'uploaded'
                CHECK (status IN ('uploaded', 'analyzed')),
    game_hash   TEXT NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW(),
    updated_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

CREATE INDEX IF NOT EXISTS idx_games_owner_created ON games (owner_id, created_at DESC);

-- Re-uploading the same game is rejected per owner
CREATE UNIQUE INDEX IF NOT EXISTS idx_games_owner_hash ON games (owner_id, game_hash);

-- One analysis per game; the UNIQUE constraint settles concurrent saves
CREATE TABLE IF NOT EXISTS game_analysis (
    id          BIGSERIAL PRIMARY KEY,
    game_id     BIGINT NOT NULL UNIQUE REFERENCES games(id) ON DELETE CASCADE,
    owner_id    BIGINT NOT NULL REFERENCES accounts(id),
    moves       JSONB NOT NULL,
    created_at  TIMESTAMPTZ NOT NULL DEFAULT NOW()
);
"#;
