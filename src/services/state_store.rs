//! Per-tab persistent state files.
//!
//! Each tab's serialized engine state plus session metadata is written to
//! a file named deterministically from the tab id. Incognito files use a
//! disjoint name prefix and are encrypted with the session key from
//! [`CryptoContext`]. Every read-side failure — missing file, truncation,
//! version or key-checker mismatch, decryption failure — yields "no
//! state" rather than an error; only writes surface failures.

use std::fs;
use std::path::{Path, PathBuf};

use crate::services::crypto::CryptoContext;
use crate::types::errors::StateError;
use crate::types::state::TabState;
use crate::types::tab::TabId;

/// Name prefix of plain (non-incognito) state files.
pub const SAVED_STATE_FILE_PREFIX: &str = "tab";

/// Name prefix of encrypted incognito state files.
pub const SAVED_STATE_FILE_PREFIX_INCOGNITO: &str = "cryptonito";

/// On-disk format version. Bumped on any layout change so corrupt files
/// and old-format files are distinguishable.
const FORMAT_VERSION: u8 = 1;

/// Sentinel written at the head of the encrypted payload. Decrypting with
/// the wrong key that somehow passes authentication still fails this
/// check and is treated as "no state".
const KEY_CHECKER: u64 = 0;

/// File-backed store for per-tab state.
pub struct StateStore {
    dir: PathBuf,
    crypto: CryptoContext,
}

impl StateStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StateError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| StateError::Io(e.to_string()))?;
        Ok(Self {
            dir,
            crypto: CryptoContext::new(),
        })
    }

    /// Deterministic file name for `(incognito, id)`.
    pub fn filename(incognito: bool, id: TabId) -> String {
        if incognito {
            format!("{}{}", SAVED_STATE_FILE_PREFIX_INCOGNITO, id)
        } else {
            format!("{}{}", SAVED_STATE_FILE_PREFIX, id)
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Starts incognito key generation early so the first incognito write
    /// does not pay for it.
    pub fn trigger_key_generation(&mut self) {
        self.crypto.trigger_key_generation();
    }

    fn path(&self, incognito: bool, id: TabId) -> PathBuf {
        self.dir.join(Self::filename(incognito, id))
    }

    /// Writes a tab's state. Incognito state is encrypted with the
    /// session key. I/O and encryption failures propagate; the caller
    /// keeps the in-memory state dirty and may retry.
    pub fn write(&mut self, id: TabId, state: &TabState) -> Result<(), StateError> {
        let mut payload = Vec::with_capacity(state.state.len() + 64);
        if state.is_incognito {
            payload.extend_from_slice(&KEY_CHECKER.to_be_bytes());
        }
        payload.extend_from_slice(&state.last_shown_timestamp.to_be_bytes());
        payload.extend_from_slice(&(state.state.len() as u32).to_be_bytes());
        payload.extend_from_slice(&state.state);
        payload.extend_from_slice(&state.parent_id.to_be_bytes());
        let opener = state.opener_app_id.as_deref().unwrap_or("");
        payload.extend_from_slice(&(opener.len() as u16).to_be_bytes());
        payload.extend_from_slice(opener.as_bytes());

        let body = if state.is_incognito {
            self.crypto
                .encrypt(&payload)
                .map_err(|e| StateError::Crypto(e.to_string()))?
        } else {
            payload
        };

        let mut file_bytes = Vec::with_capacity(body.len() + 1);
        file_bytes.push(FORMAT_VERSION);
        file_bytes.extend_from_slice(&body);
        fs::write(self.path(state.is_incognito, id), file_bytes)
            .map_err(|e| StateError::Io(e.to_string()))
    }

    /// Reads back a tab's state, trying the plain file first and the
    /// encrypted one second.
    pub fn read(&mut self, id: TabId) -> Option<TabState> {
        self.read_file(id, false).or_else(|| self.read_file(id, true))
    }

    fn read_file(&mut self, id: TabId, encrypted: bool) -> Option<TabState> {
        let bytes = fs::read(self.path(encrypted, id)).ok()?;
        let (version, body) = bytes.split_first()?;
        if *version != FORMAT_VERSION {
            log::warn!("Unknown tab state format version {} for tab {}", version, id);
            return None;
        }
        let payload = if encrypted {
            self.crypto.decrypt(body)?
        } else {
            body.to_vec()
        };
        Self::parse_payload(&payload, encrypted)
    }

    fn parse_payload(payload: &[u8], encrypted: bool) -> Option<TabState> {
        let mut input = payload;
        if encrypted && read_u64(&mut input)? != KEY_CHECKER {
            // Got the wrong key, skip the file.
            return None;
        }
        let last_shown_timestamp = read_u64(&mut input)? as i64;
        let blob_len = read_u32(&mut input)? as usize;
        if input.len() < blob_len {
            return None;
        }
        let state = input[..blob_len].to_vec();
        input = &input[blob_len..];
        let parent_id = read_u32(&mut input)? as i32;
        // An absent opener string is tolerated for forward compatibility.
        let opener_app_id = read_utf(&mut input).filter(|s| !s.is_empty());
        Some(TabState {
            last_shown_timestamp,
            state,
            parent_id,
            opener_app_id,
            is_incognito: encrypted,
        })
    }

    /// Removes the state file for a permanently closed tab.
    pub fn delete(&mut self, id: TabId, incognito: bool) {
        let _ = fs::remove_file(self.path(incognito, id));
    }
}

fn read_u64(input: &mut &[u8]) -> Option<u64> {
    if input.len() < 8 {
        return None;
    }
    let (head, rest) = input.split_at(8);
    *input = rest;
    Some(u64::from_be_bytes(head.try_into().ok()?))
}

fn read_u32(input: &mut &[u8]) -> Option<u32> {
    if input.len() < 4 {
        return None;
    }
    let (head, rest) = input.split_at(4);
    *input = rest;
    Some(u32::from_be_bytes(head.try_into().ok()?))
}

fn read_utf(input: &mut &[u8]) -> Option<String> {
    if input.len() < 2 {
        return None;
    }
    let len = u16::from_be_bytes([input[0], input[1]]) as usize;
    let rest = &input[2..];
    if rest.len() < len {
        return None;
    }
    *input = &rest[len..];
    String::from_utf8(rest[..len].to_vec()).ok()
}
