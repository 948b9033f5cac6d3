use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use recoup_core::{ArtistId, RoomId};
use rusqlite::{types::Type, Connection, OptionalExtension};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::error::MemoryError;
use crate::types::*;

/// SQLite-backed store for rooms, chat memories and artist knowledge.
///
/// Thread-safe: wraps the connection in a Mutex. Every method takes the lock
/// for the duration of one statement group and releases it before returning,
/// so callers may freely use it from async code.
pub struct MemoryManager {
    db: Mutex<Connection>,
}

impl MemoryManager {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, MemoryError> {
        self.db.lock().map_err(|_| MemoryError::LockPoisoned)
    }

    /// Insert a room. An existing room with the same id is left untouched.
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn create_room(&self, room: &Room) -> Result<(), MemoryError> {
        let db = self.conn()?;
        db.execute(
            "INSERT OR IGNORE INTO rooms (id, account_id, artist_id, topic, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                room.id.as_str(),
                room.account_id,
                room.artist_id.as_ref().map(|a| a.as_str()),
                room.topic,
                format_ts(&room.created_at),
            ],
        )?;
        Ok(())
    }

    #[instrument(skip(self), fields(room_id = %room_id))]
    pub fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, MemoryError> {
        let db = self.conn()?;
        let room = db
            .query_row(
                "SELECT id, account_id, artist_id, topic, created_at
                 FROM rooms WHERE id = ?1",
                rusqlite::params![room_id.as_str()],
                row_to_room,
            )
            .optional()?;
        Ok(room)
    }

    /// Store one chat turn for a room. The envelope is kept verbatim.
    #[instrument(skip(self, content), fields(room_id = %room_id))]
    pub fn save_memory(
        &self,
        room_id: &RoomId,
        artist_id: Option<&ArtistId>,
        content: &serde_json::Value,
    ) -> Result<Memory, MemoryError> {
        let memory = Memory {
            id: Uuid::now_v7().to_string(),
            room_id: room_id.clone(),
            artist_id: artist_id.cloned(),
            content: content.clone(),
            created_at: Utc::now(),
        };
        self.insert_memory(&memory)?;
        Ok(memory)
    }

    /// Insert a fully-formed memory row, keeping its id and timestamp.
    pub fn insert_memory(&self, memory: &Memory) -> Result<(), MemoryError> {
        let content = serde_json::to_string(&memory.content)
            .map_err(|e| MemoryError::Serialization(e.to_string()))?;
        let db = self.conn()?;
        db.execute(
            "INSERT INTO memories (id, room_id, artist_id, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                memory.id,
                memory.room_id.as_str(),
                memory.artist_id.as_ref().map(|a| a.as_str()),
                content,
                format_ts(&memory.created_at),
            ],
        )?;
        debug!(memory_id = %memory.id, "memory stored");
        Ok(())
    }

    /// All memories of a room, oldest first. A row whose content or timestamp
    /// can't be decoded is skipped with a warning; the rest of the room loads.
    #[instrument(skip(self), fields(room_id = %room_id))]
    pub fn list_memories(&self, room_id: &RoomId) -> Result<Vec<Memory>, MemoryError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT id, room_id, artist_id, content, created_at
             FROM memories
             WHERE room_id = ?1
             ORDER BY created_at ASC, rowid ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![room_id.as_str()], row_to_memory)?;
        let mut memories = Vec::new();
        for row in rows {
            match row {
                Ok(memory) => memories.push(memory),
                Err(rusqlite::Error::FromSqlConversionFailure(column, _, e)) => {
                    warn!(column, error = %e, "skipping undecodable memory row");
                }
                Err(e) => return Err(e.into()),
            }
        }
        debug!(count = memories.len(), "memories loaded");
        Ok(memories)
    }

    /// Memories of a room, but only if the room belongs to `artist_id`.
    /// A room owned by another artist (or no room at all) yields an empty list.
    #[instrument(skip(self), fields(room_id = %room_id, artist_id = %artist_id))]
    pub fn list_memories_for_artist(
        &self,
        room_id: &RoomId,
        artist_id: &ArtistId,
    ) -> Result<Vec<Memory>, MemoryError> {
        let owned = {
            let db = self.conn()?;
            db.query_row(
                "SELECT 1 FROM rooms WHERE id = ?1 AND artist_id = ?2",
                rusqlite::params![room_id.as_str(), artist_id.as_str()],
                |_| Ok(()),
            )
            .optional()?
            .is_some()
        };
        if !owned {
            debug!("room not owned by artist, returning no memories");
            return Ok(Vec::new());
        }
        self.list_memories(room_id)
    }

    /// Attach a knowledge file to an artist. Returns the new row id.
    #[instrument(skip(self, entry), fields(artist_id = %entry.artist_id, name = %entry.name))]
    pub fn add_knowledge(&self, entry: &NewKnowledgeEntry) -> Result<i64, MemoryError> {
        let db = self.conn()?;
        let now = format_ts(&Utc::now());
        db.execute(
            "INSERT INTO artist_knowledge (artist_id, name, mime_type, url, content, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![
                entry.artist_id.as_str(),
                entry.name,
                entry.mime_type,
                entry.url,
                entry.content,
                now,
            ],
        )?;
        Ok(db.last_insert_rowid())
    }

    /// Knowledge files of an artist in insertion order.
    #[instrument(skip(self), fields(artist_id = %artist_id))]
    pub fn knowledge_entries(
        &self,
        artist_id: &ArtistId,
    ) -> Result<Vec<KnowledgeEntry>, MemoryError> {
        let db = self.conn()?;
        let mut stmt = db.prepare(
            "SELECT id, artist_id, name, mime_type, url, content, created_at
             FROM artist_knowledge
             WHERE artist_id = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(rusqlite::params![artist_id.as_str()], |row| {
            Ok(KnowledgeEntry {
                id: row.get(0)?,
                artist_id: ArtistId(row.get(1)?),
                name: row.get(2)?,
                mime_type: row.get(3)?,
                url: row.get(4)?,
                content: row.get(5)?,
                created_at: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_room(row: &rusqlite::Row<'_>) -> rusqlite::Result<Room> {
    let created_at: String = row.get(4)?;
    Ok(Room {
        id: RoomId(row.get(0)?),
        account_id: row.get(1)?,
        artist_id: row.get::<_, Option<String>>(2)?.map(ArtistId),
        topic: row.get(3)?,
        created_at: parse_ts(4, &created_at)?,
    })
}

fn row_to_memory(row: &rusqlite::Row<'_>) -> rusqlite::Result<Memory> {
    let raw_content: String = row.get(3)?;
    let content = serde_json::from_str(&raw_content)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?;
    let created_at: String = row.get(4)?;
    Ok(Memory {
        id: row.get(0)?,
        room_id: RoomId(row.get(1)?),
        artist_id: row.get::<_, Option<String>>(2)?.map(ArtistId),
        content,
        created_at: parse_ts(4, &created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn manager() -> MemoryManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        MemoryManager::new(conn)
    }

    fn memory_at(id: &str, room: &str, secs: i64) -> Memory {
        Memory {
            id: id.to_string(),
            room_id: RoomId::from(room),
            artist_id: None,
            content: json!({"id": id, "role": "user", "content": id}),
            created_at: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
        }
    }

    #[test]
    fn list_returns_oldest_first_regardless_of_insert_order() {
        let mgr = manager();
        mgr.insert_memory(&memory_at("m3", "r1", 30)).unwrap();
        mgr.insert_memory(&memory_at("m1", "r1", 10)).unwrap();
        mgr.insert_memory(&memory_at("m2", "r1", 20)).unwrap();
        mgr.insert_memory(&memory_at("other", "r2", 5)).unwrap();

        let ids: Vec<_> = mgr
            .list_memories(&RoomId::from("r1"))
            .unwrap()
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
    }

    #[test]
    fn save_memory_keeps_envelope_verbatim() {
        let mgr = manager();
        let room = RoomId::from("r1");
        let envelope = json!({"id": "abc", "role": "assistant", "content": "hi", "parts": [1, 2]});
        mgr.save_memory(&room, Some(&ArtistId::from("a1")), &envelope)
            .unwrap();

        let stored = mgr.list_memories(&room).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].content, envelope);
        assert_eq!(stored[0].artist_id, Some(ArtistId::from("a1")));
    }

    #[test]
    fn corrupt_row_is_skipped_not_fatal() {
        let m = manager();
        m.insert_memory(&memory_at("a", "r1", 1)).unwrap();
        m.insert_memory(&memory_at("c", "r1", 3)).unwrap();
        {
            let db = m.conn().unwrap();
            db.execute(
                "INSERT INTO memories (id, room_id, artist_id, content, created_at)
                 VALUES ('bad-json', 'r1', NULL, '{not json', '2023-11-14T22:13:21.000000Z')",
                [],
            )
            .unwrap();
            db.execute(
                "INSERT INTO memories (id, room_id, artist_id, content, created_at)
                 VALUES ('bad-ts', 'r1', NULL, '{}', 'yesterday')",
                [],
            )
            .unwrap();
        }

        let ids: Vec<_> = m
            .list_memories(&RoomId::from("r1"))
            .unwrap()
            .into_iter()
            .map(|mem| mem.id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn empty_room_lists_nothing() {
        let mgr = manager();
        assert!(mgr.list_memories(&RoomId::from("nope")).unwrap().is_empty());
    }

    #[test]
    fn room_round_trips_with_artist() {
        let mgr = manager();
        let room = Room::new(RoomId::from("r1")).with_artist(ArtistId::from("a1"));
        mgr.create_room(&room).unwrap();
        // second insert is ignored
        mgr.create_room(&Room::new(RoomId::from("r1"))).unwrap();

        let loaded = mgr.get_room(&RoomId::from("r1")).unwrap().unwrap();
        assert_eq!(loaded.artist_id, Some(ArtistId::from("a1")));
        assert!(mgr.get_room(&RoomId::from("missing")).unwrap().is_none());
    }

    #[test]
    fn artist_scoped_listing_checks_room_owner() {
        let mgr = manager();
        mgr.create_room(&Room::new(RoomId::from("r1")).with_artist(ArtistId::from("a1")))
            .unwrap();
        mgr.insert_memory(&memory_at("m1", "r1", 1)).unwrap();

        let own = mgr
            .list_memories_for_artist(&RoomId::from("r1"), &ArtistId::from("a1"))
            .unwrap();
        assert_eq!(own.len(), 1);

        let foreign = mgr
            .list_memories_for_artist(&RoomId::from("r1"), &ArtistId::from("a2"))
            .unwrap();
        assert!(foreign.is_empty());
    }

    #[test]
    fn knowledge_entries_are_scoped_to_artist() {
        let mgr = manager();
        for (artist, name) in [("a1", "bio.md"), ("a1", "tour.txt"), ("a2", "other.md")] {
            mgr.add_knowledge(&NewKnowledgeEntry {
                artist_id: ArtistId::from(artist),
                name: name.to_string(),
                mime_type: "text/markdown".to_string(),
                url: None,
                content: Some(format!("{name} body")),
            })
            .unwrap();
        }

        let names: Vec<_> = mgr
            .knowledge_entries(&ArtistId::from("a1"))
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["bio.md", "tour.txt"]);
    }
}
