use rusqlite::{Connection, Result};

/// Initialise room, memory and knowledge tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_rooms_table(conn)?;
    create_memories_table(conn)?;
    create_knowledge_table(conn)?;
    Ok(())
}

fn create_rooms_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS rooms (
            id          TEXT PRIMARY KEY,
            account_id  TEXT,
            artist_id   TEXT,
            topic       TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_rooms_artist
            ON rooms(artist_id);",
    )
}

/// One row per stored chat turn. `content` holds the message envelope as JSON
/// exactly as the chat layer handed it over.
fn create_memories_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS memories (
            id          TEXT PRIMARY KEY,
            room_id     TEXT NOT NULL,
            artist_id   TEXT,
            content     TEXT NOT NULL,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_memories_room
            ON memories(room_id, created_at);",
    )
}

/// Artist knowledge files. Either `content` is stored inline or `url`
/// points at the file to fetch when a prompt is assembled.
fn create_knowledge_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS artist_knowledge (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            artist_id   TEXT NOT NULL,
            name        TEXT NOT NULL,
            mime_type   TEXT NOT NULL,
            url         TEXT,
            content     TEXT,
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_knowledge_artist
            ON artist_knowledge(artist_id);",
    )
}
