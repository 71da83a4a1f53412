//! Mojang account services: offline UUID resolution (with an on-disk
//! response cache) and online-mode session verification.

use std::path::PathBuf;

use galena_util::{UUID, uuid::UUIDParseError};
use serde::Deserialize;
use thiserror::Error;

/// Namespace for deterministic offline UUIDs when the profile lookup is
/// unavailable.
pub const OFFLINE_UUID_NAMESPACE: UUID = UUID([
    0xA7, 0x1D, 0xCA, 0x7E, 0xC0, 0xF6, 0x43, 0x99, 0x93, 0x5F, 0xA8, 0x18, 0x65, 0x1F, 0x6A,
    0x36,
]);

const PROFILE_URL: &str = "https://api.mojang.com/users/profiles/minecraft";
const HAS_JOINED_URL: &str = "https://sessionserver.mojang.com/session/minecraft/hasJoined";

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    HttpError(#[from] reqwest::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
    #[error(transparent)]
    InvalidUuid(#[from] UUIDParseError),
    #[error("Profile lookup for {0:?} returned status {1}")]
    ProfileUnavailable(String, u16),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
}

impl Profile {
    pub fn uuid(&self) -> Result<UUID, UUIDParseError> {
        UUID::try_from(self.id.as_str())
    }
}

#[derive(Debug)]
pub struct SessionService {
    cache_dir: PathBuf,
}

impl SessionService {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: data_dir.into().join("profiles"),
        }
    }

    /// Offline-mode UUID for a username. Tries the cached Mojang profile,
    /// then the live endpoint; any failure falls back to the deterministic
    /// name-based UUID.
    pub fn resolve_uuid(&self, name: &str) -> UUID {
        match self.lookup_profile(name) {
            Ok(uuid) => uuid,
            Err(err) => {
                log::debug!("Profile lookup for {:?} failed ({}), using offline UUID", name, err);
                UUID::new_v5(&OFFLINE_UUID_NAMESPACE, name)
            }
        }
    }

    fn lookup_profile(&self, name: &str) -> Result<UUID, SessionError> {
        let cache_path = self.cache_dir.join(format!("{}.json", name));
        if let Ok(cached) = std::fs::read_to_string(&cache_path) {
            let profile: Profile = serde_json::from_str(&cached)?;
            return Ok(profile.uuid()?);
        }

        let response = reqwest::blocking::get(format!("{}/{}", PROFILE_URL, name))?;
        if !response.status().is_success() {
            return Err(SessionError::ProfileUnavailable(
                name.to_owned(),
                response.status().as_u16(),
            ));
        }
        let body = response.text()?;
        let profile: Profile = serde_json::from_str(&body)?;
        let uuid = profile.uuid()?;

        if std::fs::create_dir_all(&self.cache_dir).is_ok() {
            let _ = std::fs::write(&cache_path, &body);
        }
        Ok(uuid)
    }

    /// Online-mode session check. `Ok(None)` means the session server
    /// answered 204: the user is not logged in.
    pub fn has_joined(
        &self,
        username: &str,
        server_id: &str,
    ) -> Result<Option<Profile>, SessionError> {
        let url = reqwest::Url::parse_with_params(
            HAS_JOINED_URL,
            &[("username", username), ("serverId", server_id)],
        )
        .expect("static session url");
        let response = reqwest::blocking::get(url)?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let response = response.error_for_status()?;
        Ok(Some(response.json()?))
    }
}

#[cfg(test)]
mod test {
    use galena_util::UUID;

    use super::{OFFLINE_UUID_NAMESPACE, SessionService};

    #[test]
    fn offline_uuid_is_deterministic() {
        let a = UUID::new_v5(&OFFLINE_UUID_NAMESPACE, "player_one");
        assert_eq!(a, UUID::new_v5(&OFFLINE_UUID_NAMESPACE, "player_one"));
        assert_ne!(a, UUID::new_v5(&OFFLINE_UUID_NAMESPACE, "player_two"));
    }

    #[test]
    fn cached_profile_short_circuits_http() {
        let dir = std::env::temp_dir().join(format!("galena-session-{}", UUID::new_v4()));
        let service = SessionService::new(&dir);
        std::fs::create_dir_all(dir.join("profiles")).unwrap();
        std::fs::write(
            dir.join("profiles").join("Notch.json"),
            r#"{"id": "069a79f444e94726a5befca90e38aaf5", "name": "Notch"}"#,
        )
        .unwrap();
        assert_eq!(
            service.resolve_uuid("Notch"),
            UUID::try_from("069a79f4-44e9-4726-a5be-fca90e38aaf5").unwrap()
        );
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
