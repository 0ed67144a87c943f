use super::error::{JukeboxError, JukeboxResult};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: String) -> JukeboxResult<Self> {
        uuid::Uuid::parse_str(&id).map_err(|_| {
            JukeboxError::InvalidSessionId(format!(
                "Session ID must be a valid UUID, got: {}",
                id
            ))
        })?;
        Ok(SessionId(id))
    }

    /// Mints a fresh random session id
    pub fn generate() -> Self {
        SessionId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

// Implement Display so we can use it in format strings
impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Trims a submitted song identifier and rejects it when nothing is left.
pub fn validate_song_id(raw: &str) -> JukeboxResult<&str> {
    let song = raw.trim();
    if song.is_empty() {
        return Err(JukeboxError::InvalidInput(
            "Error in this song, choose another".to_string(),
        ));
    }
    Ok(song)
}

/// Trims a submitted theme name and rejects it when nothing is left.
pub fn validate_folder_name(raw: &str) -> JukeboxResult<&str> {
    let folder = raw.trim();
    if folder.is_empty() {
        return Err(JukeboxError::InvalidInput("No folder specified".to_string()));
    }
    Ok(folder)
}
