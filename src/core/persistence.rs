//! Flat-file chat persistence.
//!
//! Each saved conversation is one JSON array in the chat-history directory,
//! named after the local time of the save (`YYYY-MM-DD_HH-MM-SS.json`). The
//! first element is a [`ConversationMetaHeader`]; every following element is
//! a [`Message`]. Saves never append: every save creates a new file.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::cmp::Ordering;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::core::message::Message;
use crate::core::session::GenerationParams;

const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";
const STAMP_LEN: usize = 19;
const MAX_COLLISION_SUFFIX: u32 = 999;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMetaHeader {
    pub model: String,
    #[serde(default)]
    pub meta: GenerationParams,
    #[serde(default)]
    pub system_prompt: String,
}

impl ConversationMetaHeader {
    /// Human-readable description of the model and settings.
    pub fn summary_lines(&self) -> Vec<String> {
        let model = if self.model.is_empty() {
            "unknown"
        } else {
            self.model.as_str()
        };
        vec![
            format!("Model: {model}"),
            format!("Temperature: {}", self.meta.temperature),
            format!("Top-p: {}", self.meta.top_p),
            format!("Presence penalty: {}", self.meta.presence_penalty),
            format!("Frequency penalty: {}", self.meta.frequency_penalty),
            format!("Max tokens: {}", self.meta.max_tokens),
        ]
    }
}

/// One element of a persisted conversation file.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Header(ConversationMetaHeader),
    Turn(Message),
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Record::Header(header) => header.serialize(serializer),
            Record::Turn(message) => message.serialize(serializer),
        }
    }
}

/// Prefix `messages` with `header`.
pub fn with_header(header: ConversationMetaHeader, messages: &[Message]) -> Vec<Record> {
    std::iter::once(Record::Header(header))
        .chain(messages.iter().cloned().map(Record::Turn))
        .collect()
}

/// Split a loaded conversation into its header (position zero only) and
/// its messages.
pub fn split_header(records: Vec<Record>) -> (Option<ConversationMetaHeader>, Vec<Message>) {
    let mut header = None;
    let mut messages = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match record {
            Record::Header(found) if index == 0 => header = Some(found),
            Record::Header(_) => debug!(index, "ignoring header outside position zero"),
            Record::Turn(message) => messages.push(message),
        }
    }
    (header, messages)
}

fn parse_records(value: Value) -> Result<Vec<Record>, String> {
    let Value::Array(items) = value else {
        return Err("expected a JSON array".to_string());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let is_header = index == 0 && item.get("model").is_some();
            if is_header {
                serde_json::from_value(item)
                    .map(Record::Header)
                    .map_err(|err| format!("invalid header: {err}"))
            } else {
                serde_json::from_value(item)
                    .map(Record::Turn)
                    .map_err(|err| format!("invalid message at position {index}: {err}"))
            }
        })
        .collect()
}

/// Identifier of a saved conversation: the file stem, i.e. the save time,
/// plus a collision counter when two saves land in the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    raw: String,
    stamp: NaiveDateTime,
    seq: u32,
}

impl SessionId {
    pub fn parse(raw: &str) -> Option<Self> {
        let stamp_text = raw.get(..STAMP_LEN)?;
        let stamp = NaiveDateTime::parse_from_str(stamp_text, STAMP_FORMAT).ok()?;
        let seq = match &raw[STAMP_LEN..] {
            "" => 0,
            rest => {
                let digits = rest.strip_prefix('-')?;
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return None;
                }
                digits.parse().ok()?
            }
        };
        Some(Self {
            raw: raw.to_string(),
            stamp,
            seq,
        })
    }

    fn at(stamp: NaiveDateTime, seq: u32) -> Self {
        let base = stamp.format(STAMP_FORMAT).to_string();
        let raw = if seq == 0 {
            base
        } else {
            format!("{base}-{seq}")
        };
        Self { raw, stamp, seq }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn file_name(&self) -> String {
        format!("{}.json", self.raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Ord for SessionId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.stamp, self.seq).cmp(&(other.stamp, other.seq))
    }
}

impl PartialOrd for SessionId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A listed session with the model named in its header.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub model: Option<String>,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({})",
            self.id,
            self.model.as_deref().unwrap_or("unknown")
        )
    }
}

#[derive(Debug)]
pub enum PersistenceError {
    /// Reading, writing, or removing a file failed.
    Io { path: PathBuf, source: io::Error },

    /// The conversation could not be encoded as JSON.
    Serialize(serde_json::Error),

    /// A session file exists but is not a valid conversation.
    Corrupt { path: PathBuf, detail: String },

    /// Every collision suffix for this second is already taken.
    Exhausted { stamp: String },
}

impl PersistenceError {
    fn io(path: &Path, source: io::Error) -> Self {
        PersistenceError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistenceError::Io { path, source } => {
                write!(f, "Chat history I/O failed at {}: {source}", path.display())
            }
            PersistenceError::Serialize(err) => write!(f, "Failed to encode chat: {err}"),
            PersistenceError::Corrupt { path, detail } => {
                write!(f, "Corrupt chat file {}: {detail}", path.display())
            }
            PersistenceError::Exhausted { stamp } => {
                write!(f, "Too many chats saved at {stamp}")
            }
        }
    }
}

impl StdError for PersistenceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            PersistenceError::Io { source, .. } => Some(source),
            PersistenceError::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatStore {
    dir: PathBuf,
}

impl ChatStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    /// Saved sessions, most recent first. A missing directory is empty.
    pub fn try_list_sessions(&self) -> Result<Vec<SessionId>, PersistenceError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PersistenceError::io(&self.dir, err)),
        };

        let mut ids: Vec<SessionId> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let stem = name.to_str()?.strip_suffix(".json")?;
                SessionId::parse(stem)
            })
            .collect();
        ids.sort_by(|a, b| b.cmp(a));
        Ok(ids)
    }

    pub fn list_sessions(&self) -> Vec<SessionId> {
        self.try_list_sessions().unwrap_or_else(|err| {
            warn!("listing chat history failed: {err}");
            Vec::new()
        })
    }

    pub fn try_load(&self, id: &SessionId) -> Result<Vec<Record>, PersistenceError> {
        let path = self.path_for(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(PersistenceError::io(&path, err)),
        };

        let value: Value =
            serde_json::from_str(&contents).map_err(|err| PersistenceError::Corrupt {
                path: path.clone(),
                detail: err.to_string(),
            })?;
        parse_records(value).map_err(|detail| PersistenceError::Corrupt { path, detail })
    }

    /// Records of a session; absent, unreadable, or corrupt files load as empty.
    pub fn load(&self, id: &SessionId) -> Vec<Record> {
        self.try_load(id).unwrap_or_else(|err| {
            warn!("loading chat {id} failed: {err}");
            Vec::new()
        })
    }

    /// The most recent session and its records, if any exist.
    pub fn latest(&self) -> Option<(SessionId, Vec<Record>)> {
        let id = self.list_sessions().into_iter().next()?;
        let records = self.load(&id);
        Some((id, records))
    }

    pub fn summaries(&self) -> Vec<SessionSummary> {
        self.list_sessions()
            .into_iter()
            .map(|id| {
                let model = match self.load(&id).into_iter().next() {
                    Some(Record::Header(header)) => Some(header.model),
                    _ => None,
                };
                SessionSummary { id, model }
            })
            .collect()
    }

    /// Write `records` to a new file stamped with the current local time.
    /// A header in position zero is first stamped with `system_prompt`.
    /// Returns `None` without touching disk when `records` is empty.
    pub fn save(
        &self,
        records: &mut [Record],
        system_prompt: &str,
    ) -> Result<Option<SessionId>, PersistenceError> {
        self.save_at(records, system_prompt, Local::now().naive_local())
    }

    pub fn save_at(
        &self,
        records: &mut [Record],
        system_prompt: &str,
        now: NaiveDateTime,
    ) -> Result<Option<SessionId>, PersistenceError> {
        if records.is_empty() {
            return Ok(None);
        }

        if let Some(Record::Header(header)) = records.first_mut() {
            header.system_prompt = system_prompt.to_string();
        }

        fs::create_dir_all(&self.dir).map_err(|err| PersistenceError::io(&self.dir, err))?;
        let contents = serde_json::to_vec_pretty(&*records).map_err(PersistenceError::Serialize)?;

        let mut temp_file =
            NamedTempFile::new_in(&self.dir).map_err(|err| PersistenceError::io(&self.dir, err))?;
        let written = temp_file
            .write_all(&contents)
            .and_then(|()| temp_file.as_file_mut().sync_all());
        if let Err(err) = written {
            return Err(PersistenceError::io(temp_file.path(), err));
        }

        // Same-second saves get a numeric suffix instead of overwriting.
        for seq in 0..=MAX_COLLISION_SUFFIX {
            let id = SessionId::at(now, seq);
            let path = self.path_for(&id);
            match temp_file.persist_noclobber(&path) {
                Ok(_) => {
                    debug!(session = %id, records = records.len(), "saved chat");
                    return Ok(Some(id));
                }
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    temp_file = err.file;
                }
                Err(err) => return Err(PersistenceError::io(&path, err.error)),
            }
        }

        Err(PersistenceError::Exhausted {
            stamp: now.format(STAMP_FORMAT).to_string(),
        })
    }

    /// Remove one session; a missing file is not an error.
    pub fn delete(&self, id: &SessionId) -> Result<(), PersistenceError> {
        let path = self.path_for(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistenceError::io(&path, err)),
        }
    }

    /// Remove every saved session. Individual failures are logged and
    /// skipped; returns how many files were removed.
    pub fn clear_all(&self) -> Result<usize, PersistenceError> {
        let mut removed = 0;
        for id in self.try_list_sessions()? {
            match self.delete(&id) {
                Ok(()) => removed += 1,
                Err(err) => warn!("could not remove chat {id}: {err}"),
            }
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn header(model: &str) -> ConversationMetaHeader {
        ConversationMetaHeader {
            model: model.to_string(),
            meta: GenerationParams::default(),
            system_prompt: String::new(),
        }
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message::user("Hello"),
            Message::assistant("Hi there!"),
            Message::user_with_images("and this?", vec!["data:image/png;base64,AA".into()]),
        ]
    }

    #[test]
    fn saving_nothing_creates_no_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path().join("chats"));
        assert_eq!(store.save(&mut [], "prompt").unwrap(), None);
        assert!(!store.dir().exists());
    }

    #[test]
    fn missing_and_corrupt_sessions_load_empty() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());

        let missing = SessionId::parse("2025-01-01_00-00-00").unwrap();
        assert!(store.load(&missing).is_empty());

        let corrupt = SessionId::parse("2025-01-01_00-00-01").unwrap();
        fs::write(store.path_for(&corrupt), "{not json").unwrap();
        assert!(store.load(&corrupt).is_empty());
        assert!(matches!(
            store.try_load(&corrupt),
            Err(PersistenceError::Corrupt { .. })
        ));

        let wrong_shape = SessionId::parse("2025-01-01_00-00-02").unwrap();
        fs::write(store.path_for(&wrong_shape), r#"[{"model":"m"},{"role":"robot","content":"x"}]"#)
            .unwrap();
        assert!(store.load(&wrong_shape).is_empty());
    }

    #[test]
    fn round_trip_preserves_messages() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        let messages = conversation();

        let mut records = with_header(header("vendor/alpha"), &messages);
        let id = store
            .save_at(&mut records, "be helpful", at(9, 0, 0))
            .unwrap()
            .expect("saved");
        assert_eq!(id.as_str(), "2025-03-14_09-00-00");

        let (loaded_header, loaded) = split_header(store.load(&id));
        assert_eq!(loaded, messages);
        let loaded_header = loaded_header.expect("header");
        assert_eq!(loaded_header.model, "vendor/alpha");
        assert_eq!(loaded_header.system_prompt, "be helpful");
    }

    #[test]
    fn save_stamps_header_in_place() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        let mut records = with_header(header("m"), &[Message::user("x")]);
        store.save_at(&mut records, "custom", at(1, 2, 3)).unwrap();
        match &records[0] {
            Record::Header(header) => assert_eq!(header.system_prompt, "custom"),
            other => panic!("unexpected record {other:?}"),
        }
    }

    #[test]
    fn file_layout_matches_wire_format() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        let mut records = with_header(header("m"), &[Message::user("x")]);
        let id = store.save_at(&mut records, "", at(1, 2, 3)).unwrap().unwrap();

        let raw: Value = serde_json::from_str(&fs::read_to_string(store.path_for(&id)).unwrap())
            .unwrap();
        assert_eq!(raw[0]["model"], "m");
        assert_eq!(raw[0]["meta"]["max_tokens"], 2048);
        assert_eq!(raw[0]["system_prompt"], "");
        assert_eq!(raw[1]["role"], "user");
        assert_eq!(raw[1]["content"], "x");
    }

    #[test]
    fn sequential_saves_create_distinct_loadable_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());

        let mut first = with_header(header("a"), &[Message::user("one")]);
        let mut second = with_header(header("b"), &[Message::user("two")]);
        let first_id = store.save_at(&mut first, "", at(10, 0, 0)).unwrap().unwrap();
        let second_id = store.save_at(&mut second, "", at(10, 0, 1)).unwrap().unwrap();

        assert_ne!(first_id, second_id);
        assert_eq!(store.list_sessions(), vec![second_id.clone(), first_id.clone()]);
        assert_eq!(split_header(store.load(&first_id)).1, vec![Message::user("one")]);
        assert_eq!(split_header(store.load(&second_id)).1, vec![Message::user("two")]);
    }

    #[test]
    fn same_second_saves_get_suffixes_and_sort_newest_first() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        let now = at(12, 30, 0);

        let ids: Vec<SessionId> = (0..3)
            .map(|n| {
                let mut records = vec![Record::Turn(Message::user(format!("msg {n}")))];
                store.save_at(&mut records, "", now).unwrap().unwrap()
            })
            .collect();

        let names: Vec<&str> = ids.iter().map(SessionId::as_str).collect();
        assert_eq!(
            names,
            vec!["2025-03-14_12-30-00", "2025-03-14_12-30-00-1", "2025-03-14_12-30-00-2"]
        );
        let listed = store.list_sessions();
        assert_eq!(listed.first(), ids.last());
        assert_eq!(listed.len(), 3);
    }

    #[test]
    fn listing_ignores_foreign_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        fs::write(temp_dir.path().join("notes.json"), "[]").unwrap();
        fs::write(temp_dir.path().join("2025-03-14_12-30-00.txt"), "[]").unwrap();
        fs::write(temp_dir.path().join("2025-13-14_12-30-00.json"), "[]").unwrap();
        fs::write(temp_dir.path().join("2025-03-14_12-30-00.json"), "[]").unwrap();

        let ids = store.list_sessions();
        assert_eq!(ids.len(), 1);
        assert_eq!(ids[0].as_str(), "2025-03-14_12-30-00");
    }

    #[test]
    fn session_ids_reject_traversal_and_garbage() {
        assert!(SessionId::parse("../../etc/passwd").is_none());
        assert!(SessionId::parse("2025-03-14_12-30-00/../x").is_none());
        assert!(SessionId::parse("2025-03-14_12-30-00-").is_none());
        assert!(SessionId::parse("2025-03-14_12-30").is_none());
        let suffixed = SessionId::parse("2025-03-14_12-30-00-10").unwrap();
        let plain = SessionId::parse("2025-03-14_12-30-00-9").unwrap();
        assert!(suffixed > plain);
    }

    #[test]
    fn delete_and_clear_are_quiet_about_missing_files() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path().join("chats"));
        let ghost = SessionId::parse("2025-01-01_00-00-00").unwrap();
        assert!(store.delete(&ghost).is_ok());
        assert_eq!(store.clear_all().unwrap(), 0);

        for second in 0..3 {
            let mut records = vec![Record::Turn(Message::user("x"))];
            store.save_at(&mut records, "", at(8, 0, second)).unwrap();
        }
        let newest = store.list_sessions().remove(0);
        store.delete(&newest).unwrap();
        assert_eq!(store.list_sessions().len(), 2);
        assert_eq!(store.clear_all().unwrap(), 2);
        assert!(store.list_sessions().is_empty());
    }

    #[test]
    fn summaries_report_header_models() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = ChatStore::new(temp_dir.path());
        let mut with = with_header(header("vendor/alpha"), &[Message::user("x")]);
        let mut without = vec![Record::Turn(Message::user("y"))];
        store.save_at(&mut with, "", at(7, 0, 0)).unwrap();
        store.save_at(&mut without, "", at(7, 0, 1)).unwrap();

        let lines: Vec<String> = store.summaries().iter().map(ToString::to_string).collect();
        assert_eq!(
            lines,
            vec![
                "2025-03-14_07-00-01 (unknown)".to_string(),
                "2025-03-14_07-00-00 (vendor/alpha)".to_string()
            ]
        );
    }

    #[test]
    fn header_summary_lists_settings() {
        let lines = header("").summary_lines();
        assert_eq!(lines[0], "Model: unknown");
        assert_eq!(lines[5], "Max tokens: 2048");
    }
}
