// SPDX-FileCopyrightText: 2026 Relay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The repository: single choke point for persistence.
//!
//! Read paths for profiles and models consult the TTL caches before the
//! store; every profile write invalidates the touched keys, and a catalog
//! sync clears the entire model cache. Nothing else in the workspace issues
//! SQL.

use std::sync::Arc;
use std::time::Duration;

use relay_cache::{CacheStats, TtlCache};
use relay_core::types::{
    Message, ModelFilter, ModelRow, ModelSync, ModelUsage, Profile, ProfileDraft, Role,
    SearchHit, SearchQuery, Session, SessionDraft, SessionUpdate, UsageDraft, UsageGroup,
    UsageLog, UsagePeriod, UsageStats,
};
use relay_core::RelayError;

use crate::database::Database;
use crate::queries;

/// Cached entries for the `profiles` cache: either a single profile or the
/// full list.
#[derive(Clone)]
enum ProfileEntry {
    One(Profile),
    All(Vec<Profile>),
}

const PROFILES_TTL: Duration = Duration::from_secs(60);
const MODELS_TTL: Duration = Duration::from_secs(300);

const PROFILES_ALL_KEY: &str = "profiles:all";

pub struct Repository {
    db: Database,
    profile_cache: Arc<TtlCache<ProfileEntry>>,
    model_cache: Arc<TtlCache<Vec<ModelRow>>>,
}

impl Repository {
    /// Wraps a database with fresh caches at the standard TTLs
    /// (profiles 60 s, models 300 s).
    pub fn new(db: Database) -> Self {
        Self::with_ttls(db, PROFILES_TTL, MODELS_TTL)
    }

    /// Constructor with explicit TTLs so tests can force expiry.
    pub fn with_ttls(db: Database, profiles_ttl: Duration, models_ttl: Duration) -> Self {
        Self {
            db,
            profile_cache: Arc::new(TtlCache::new("profiles", profiles_ttl)),
            model_cache: Arc::new(TtlCache::new("models", models_ttl)),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    // --- Models ---

    /// Bulk-upserts the catalog and clears the model cache.
    pub async fn sync_models(&self, rows: Vec<ModelSync>) -> Result<usize, RelayError> {
        let count = queries::models::upsert_models(&self.db, rows).await?;
        self.model_cache.clear();
        Ok(count)
    }

    pub async fn list_models(&self, filter: ModelFilter) -> Result<Vec<ModelRow>, RelayError> {
        let key = format!(
            "models:r{:?}:c{:?}:p{:?}",
            filter.reasoning, filter.min_context, filter.max_price
        );
        if let Some(cached) = self.model_cache.get(&key) {
            return Ok(cached);
        }
        let models = queries::models::list_models(&self.db, filter).await?;
        self.model_cache.set(key, models.clone());
        Ok(models)
    }

    pub async fn get_model(&self, id: &str) -> Result<Option<ModelRow>, RelayError> {
        queries::models::get_model(&self.db, id).await
    }

    // --- Profiles ---

    pub async fn create_profile(&self, draft: ProfileDraft) -> Result<Profile, RelayError> {
        let profile = queries::profiles::create_profile(&self.db, draft).await?;
        self.profile_cache.invalidate(PROFILES_ALL_KEY);
        Ok(profile)
    }

    pub async fn get_profile(&self, id: i64) -> Result<Option<Profile>, RelayError> {
        let key = format!("profile:{id}");
        if let Some(ProfileEntry::One(profile)) = self.profile_cache.get(&key) {
            return Ok(Some(profile));
        }
        let profile = queries::profiles::get_profile(&self.db, id).await?;
        if let Some(profile) = &profile {
            self.profile_cache.set(key, ProfileEntry::One(profile.clone()));
        }
        Ok(profile)
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, RelayError> {
        if let Some(ProfileEntry::All(profiles)) = self.profile_cache.get(PROFILES_ALL_KEY) {
            return Ok(profiles);
        }
        let profiles = queries::profiles::list_profiles(&self.db).await?;
        self.profile_cache
            .set(PROFILES_ALL_KEY, ProfileEntry::All(profiles.clone()));
        Ok(profiles)
    }

    pub async fn update_profile(&self, id: i64, draft: ProfileDraft) -> Result<bool, RelayError> {
        let updated = queries::profiles::update_profile(&self.db, id, draft).await?;
        self.profile_cache.invalidate(&format!("profile:{id}"));
        self.profile_cache.invalidate(PROFILES_ALL_KEY);
        Ok(updated)
    }

    pub async fn delete_profile(&self, id: i64) -> Result<bool, RelayError> {
        let deleted = queries::profiles::delete_profile(&self.db, id).await?;
        self.profile_cache.invalidate(&format!("profile:{id}"));
        self.profile_cache.invalidate(PROFILES_ALL_KEY);
        Ok(deleted)
    }

    // --- Sessions ---

    pub async fn create_session(&self, draft: SessionDraft) -> Result<Session, RelayError> {
        queries::sessions::create_session(&self.db, draft).await
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<Session>, RelayError> {
        queries::sessions::get_session(&self.db, id).await
    }

    pub async fn list_sessions(&self, limit: i64) -> Result<Vec<Session>, RelayError> {
        queries::sessions::list_sessions(&self.db, limit).await
    }

    pub async fn update_session(
        &self,
        id: &str,
        update: SessionUpdate,
    ) -> Result<bool, RelayError> {
        queries::sessions::update_session(&self.db, id, update).await
    }

    pub async fn delete_session(&self, id: &str) -> Result<bool, RelayError> {
        queries::sessions::delete_session(&self.db, id).await
    }

    // --- Messages ---

    pub async fn append_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
    ) -> Result<Message, RelayError> {
        queries::messages::append_message(&self.db, session_id, role, content).await
    }

    pub async fn list_messages(&self, session_id: &str) -> Result<Vec<Message>, RelayError> {
        queries::messages::list_messages(&self.db, session_id).await
    }

    pub async fn search_messages(&self, query: SearchQuery) -> Result<Vec<SearchHit>, RelayError> {
        queries::messages::search_messages(&self.db, query).await
    }

    // --- Usage ---

    pub async fn insert_usage(&self, draft: UsageDraft) -> Result<UsageLog, RelayError> {
        queries::usage::insert_usage(&self.db, draft).await
    }

    pub async fn list_usage_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<UsageLog>, RelayError> {
        queries::usage::list_usage_for_session(&self.db, session_id).await
    }

    pub async fn usage_by_model(&self) -> Result<Vec<ModelUsage>, RelayError> {
        queries::usage::usage_by_model(&self.db).await
    }

    pub async fn usage_timeline(
        &self,
        group: UsageGroup,
        start_date: Option<String>,
        end_date: Option<String>,
    ) -> Result<Vec<UsagePeriod>, RelayError> {
        queries::usage::usage_timeline(&self.db, group, start_date, end_date).await
    }

    pub async fn usage_stats(&self) -> Result<UsageStats, RelayError> {
        queries::usage::usage_stats(&self.db).await
    }

    // --- Caches ---

    pub fn cache_stats(&self) -> Vec<CacheStats> {
        vec![self.profile_cache.stats(), self.model_cache.stats()]
    }

    pub fn clear_caches(&self) {
        self.profile_cache.clear();
        self.model_cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn repo() -> Repository {
        Repository::new(Database::open_in_memory().await.unwrap())
    }

    fn profile_draft(name: &str) -> ProfileDraft {
        ProfileDraft {
            name: name.to_string(),
            system_prompt: None,
            temperature: 0.7,
            max_tokens: 2048,
            preset: None,
        }
    }

    #[tokio::test]
    async fn profile_reads_are_served_from_cache() {
        let repo = repo().await;
        let created = repo.create_profile(profile_draft("cached")).await.unwrap();

        repo.get_profile(created.id).await.unwrap();
        repo.get_profile(created.id).await.unwrap();

        let stats = &repo.cache_stats()[0];
        assert_eq!(stats.name, "profiles");
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn profile_update_invalidates_cached_entry() {
        let repo = repo().await;
        let created = repo.create_profile(profile_draft("before")).await.unwrap();
        repo.get_profile(created.id).await.unwrap();

        repo.update_profile(created.id, profile_draft("after"))
            .await
            .unwrap();

        let fetched = repo.get_profile(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "after");
    }

    #[tokio::test]
    async fn profile_list_cache_invalidated_on_create_and_delete() {
        let repo = repo().await;
        assert!(repo.list_profiles().await.unwrap().is_empty());

        let created = repo.create_profile(profile_draft("p1")).await.unwrap();
        assert_eq!(repo.list_profiles().await.unwrap().len(), 1);

        repo.delete_profile(created.id).await.unwrap();
        assert!(repo.list_profiles().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_sync_clears_list_cache() {
        let repo = repo().await;
        assert!(repo.list_models(ModelFilter::default()).await.unwrap().is_empty());

        repo.sync_models(vec![ModelSync {
            id: "m".to_string(),
            name: "Model".to_string(),
            context_length: None,
            pricing_prompt: None,
            pricing_completion: None,
            is_reasoning: false,
        }])
        .await
        .unwrap();

        assert_eq!(repo.list_models(ModelFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn expired_profile_cache_refetches() {
        let db = Database::open_in_memory().await.unwrap();
        let repo = Repository::with_ttls(db, Duration::from_millis(5), Duration::from_millis(5));
        let created = repo.create_profile(profile_draft("ttl")).await.unwrap();
        repo.get_profile(created.id).await.unwrap();
        tokio::time::sleep(Duration::from_millis(15)).await;
        // Served from the store again, not the expired entry.
        let fetched = repo.get_profile(created.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "ttl");
    }

    #[tokio::test]
    async fn deleting_referenced_profile_nulls_session_reference() {
        let repo = repo().await;
        let profile = repo.create_profile(profile_draft("linked")).await.unwrap();
        let session = repo
            .create_session(SessionDraft {
                profile_id: Some(profile.id),
                ..Default::default()
            })
            .await
            .unwrap();

        repo.delete_profile(profile.id).await.unwrap();

        let fetched = repo.get_session(&session.id).await.unwrap().unwrap();
        assert!(fetched.profile_id.is_none());
    }

    #[tokio::test]
    async fn deleting_session_cascades_to_messages_and_usage() {
        let repo = repo().await;
        let session = repo.create_session(SessionDraft::default()).await.unwrap();
        repo.append_message(&session.id, Role::User, "hi").await.unwrap();
        repo.insert_usage(UsageDraft {
            session_id: session.id.clone(),
            model_id: None,
            profile_id: None,
            prompt_tokens: 1,
            completion_tokens: 1,
        })
        .await
        .unwrap();

        repo.delete_session(&session.id).await.unwrap();

        assert!(repo.list_messages(&session.id).await.unwrap().is_empty());
        assert!(repo.list_usage_for_session(&session.id).await.unwrap().is_empty());
    }
}
