//! Typed per-user profile and premium lookups.
//!
//! The profile is one JSON record under `profile:{id}`. Premium is a bare
//! presence flag whose TTL is the remaining premium time; the engine only
//! reads it; [`ProfileDirectory::grant_premium`] exists for the admin
//! console, standing in for an external payment system.

use super::UserId;
use crate::error::{EngineError, EngineResult, Rejection};
use crate::security::TrustLevel;
use crate::store::{SharedStore, keys};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const MAX_INTERESTS: usize = 3;

const SECS_PER_DAY: u64 = 86_400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            _ => Err(Rejection::InvalidGender(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interest {
    Gaming,
    Movies,
    Music,
    Sports,
}

impl Interest {
    pub const ALL: [Interest; 4] = [Self::Gaming, Self::Movies, Self::Music, Self::Sports];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gaming => "gaming",
            Self::Movies => "movies",
            Self::Music => "music",
            Self::Sports => "sports",
        }
    }

    /// Keep the known interests among `tokens`, deduplicated.
    ///
    /// Unknown tokens are ignored; nothing known is `InvalidInterest`, more
    /// than [`MAX_INTERESTS`] is `TooManyInterests`.
    pub fn parse_selection<'a>(
        tokens: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<Interest>, Rejection> {
        let selected: BTreeSet<Interest> = tokens
            .into_iter()
            .filter_map(|t| t.parse().ok())
            .collect();
        if selected.is_empty() {
            return Err(Rejection::InvalidInterest);
        }
        if selected.len() > MAX_INTERESTS {
            return Err(Rejection::TooManyInterests);
        }
        Ok(selected.into_iter().collect())
    }
}

impl fmt::Display for Interest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interest {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|i| i.as_str() == lower)
            .ok_or(Rejection::InvalidInterest)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Id,
    En,
}

impl Language {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::En => "en",
        }
    }
}

impl FromStr for Language {
    type Err = Rejection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "id" => Ok(Self::Id),
            "en" => Ok(Self::En),
            _ => Err(Rejection::InvalidLanguage(s.to_string())),
        }
    }
}

/// Stored profile, `profile:{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    #[serde(default)]
    pub language: Language,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub interests: Vec<Interest>,
}

/// Snapshot returned by the `/stats` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub total_chats: i64,
    pub premium: bool,
    /// Whole days of premium left; `None` for free users.
    pub premium_days_left: Option<u64>,
    pub gender: Option<Gender>,
    pub interests: Vec<Interest>,
    pub trust_score: i64,
    pub trust_level: TrustLevel,
}

pub struct ProfileDirectory {
    store: SharedStore,
}

impl ProfileDirectory {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Stored profile, or the default one for users who never set anything.
    pub async fn get(&self, user: UserId) -> EngineResult<ProfileRecord> {
        let key = keys::profile(user);
        match self.store.get(&key).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| EngineError::corrupt(key, e)),
            None => Ok(ProfileRecord::default()),
        }
    }

    async fn update(
        &self,
        user: UserId,
        edit: impl FnOnce(&mut ProfileRecord),
    ) -> EngineResult<ProfileRecord> {
        let mut profile = self.get(user).await?;
        edit(&mut profile);
        let key = keys::profile(user);
        let raw = serde_json::to_string(&profile).map_err(|e| EngineError::corrupt(&key, e))?;
        self.store.set(&key, &raw, None).await?;
        Ok(profile)
    }

    pub async fn set_gender(&self, user: UserId, gender: Option<Gender>) -> EngineResult<()> {
        self.update(user, |p| p.gender = gender).await?;
        debug!(user = %user, gender = ?gender, "Gender updated");
        Ok(())
    }

    pub async fn set_interests(&self, user: UserId, interests: Vec<Interest>) -> EngineResult<()> {
        debug!(user = %user, count = interests.len(), "Interests updated");
        self.update(user, |p| p.interests = interests).await?;
        Ok(())
    }

    pub async fn set_language(&self, user: UserId, language: Language) -> EngineResult<()> {
        self.update(user, |p| p.language = language).await?;
        Ok(())
    }

    pub async fn language(&self, user: UserId) -> EngineResult<Language> {
        Ok(self.get(user).await?.language)
    }

    /// Interests both users selected, in vocabulary order.
    pub async fn common_interests(&self, a: UserId, b: UserId) -> EngineResult<Vec<Interest>> {
        let mine = self.get(a).await?.interests;
        let theirs = self.get(b).await?.interests;
        let mut common: Vec<Interest> = mine.into_iter().filter(|i| theirs.contains(i)).collect();
        common.sort();
        Ok(common)
    }

    pub async fn is_premium(&self, user: UserId) -> EngineResult<bool> {
        Ok(self.store.exists(&keys::premium(user)).await?)
    }

    /// Whole days of premium left, `None` when the user is free.
    pub async fn premium_days_left(&self, user: UserId) -> EngineResult<Option<u64>> {
        let key = keys::premium(user);
        if !self.store.exists(&key).await? {
            return Ok(None);
        }
        let ttl = self.store.ttl(&key).await?;
        Ok(Some(ttl.map_or(0, |t| t.as_secs() / SECS_PER_DAY)))
    }

    /// Set (or overwrite) the premium flag for `days` days.
    pub async fn grant_premium(&self, user: UserId, days: u64) -> EngineResult<()> {
        let ttl = Duration::from_secs(days.saturating_mul(SECS_PER_DAY));
        self.store.set(&keys::premium(user), "1", Some(ttl)).await?;
        Ok(())
    }

    pub async fn increment_total_chats(&self, user: UserId) -> EngineResult<i64> {
        Ok(self.store.incr_by(&keys::total_chats(user), 1).await?)
    }

    pub async fn total_chats(&self, user: UserId) -> EngineResult<i64> {
        let key = keys::total_chats(user);
        match self.store.get(&key).await? {
            Some(raw) => raw.parse().map_err(|e| EngineError::corrupt(key, e)),
            None => Ok(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;
    use std::sync::Arc;

    fn directory() -> (Arc<ManualClock>, ProfileDirectory) {
        let clock = Arc::new(ManualClock::default());
        let store: SharedStore = Arc::new(MemoryStore::new(clock.clone()));
        (clock, ProfileDirectory::new(store))
    }

    #[test]
    fn interest_selection_ignores_unknown_and_dedupes() {
        let picked = Interest::parse_selection(["Music", "cooking", "music", "gaming"]).unwrap();
        assert_eq!(picked, vec![Interest::Gaming, Interest::Music]);
    }

    #[test]
    fn interest_selection_limits() {
        assert_eq!(
            Interest::parse_selection(["cooking"]),
            Err(Rejection::InvalidInterest)
        );
        assert_eq!(
            Interest::parse_selection(["gaming", "movies", "music", "sports"]),
            Err(Rejection::TooManyInterests)
        );
    }

    #[test]
    fn language_and_gender_parse() {
        assert_eq!("EN".parse::<Language>(), Ok(Language::En));
        assert!(matches!(
            "fr".parse::<Language>(),
            Err(Rejection::InvalidLanguage(_))
        ));
        assert_eq!("Female".parse::<Gender>(), Ok(Gender::Female));
        assert_eq!(Gender::Male.opposite(), Gender::Female);
    }

    #[tokio::test]
    async fn profile_defaults_and_updates() {
        let (_clock, dir) = directory();
        let user = UserId(1);
        assert_eq!(dir.get(user).await.unwrap(), ProfileRecord::default());
        assert_eq!(dir.language(user).await.unwrap(), Language::Id);

        dir.set_gender(user, Some(Gender::Female)).await.unwrap();
        dir.set_interests(user, vec![Interest::Music]).await.unwrap();
        dir.set_language(user, Language::En).await.unwrap();

        let profile = dir.get(user).await.unwrap();
        assert_eq!(profile.gender, Some(Gender::Female));
        assert_eq!(profile.interests, vec![Interest::Music]);
        assert_eq!(profile.language, Language::En);
    }

    #[tokio::test]
    async fn common_interests_intersect() {
        let (_clock, dir) = directory();
        dir.set_interests(UserId(1), vec![Interest::Sports, Interest::Gaming])
            .await
            .unwrap();
        dir.set_interests(UserId(2), vec![Interest::Gaming, Interest::Music, Interest::Sports])
            .await
            .unwrap();
        assert_eq!(
            dir.common_interests(UserId(1), UserId(2)).await.unwrap(),
            vec![Interest::Gaming, Interest::Sports]
        );
    }

    #[tokio::test]
    async fn premium_expires_with_its_ttl() {
        let (clock, dir) = directory();
        let user = UserId(5);
        assert!(!dir.is_premium(user).await.unwrap());
        assert_eq!(dir.premium_days_left(user).await.unwrap(), None);

        dir.grant_premium(user, 7).await.unwrap();
        assert!(dir.is_premium(user).await.unwrap());
        assert_eq!(dir.premium_days_left(user).await.unwrap(), Some(7));

        clock.advance(Duration::from_secs(86_400 + 60));
        assert_eq!(dir.premium_days_left(user).await.unwrap(), Some(5));

        clock.advance(Duration::from_secs(6 * 86_400));
        assert!(!dir.is_premium(user).await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_profile_is_reported() {
        let (_clock, dir) = directory();
        dir.store.set("profile:9", "not json", None).await.unwrap();
        let err = dir.get(UserId(9)).await.unwrap_err();
        assert_eq!(err.error_code(), "corrupt_record");
    }
}
