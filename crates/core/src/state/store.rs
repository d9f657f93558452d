//! # Record Store
//!
//! Persistence seam for idea snapshots and feedback. Every version of an
//! idea is kept; `get` and `list` see the latest one.

use super::snapshot::{Feedback, IdeaSnapshot};
use crate::error::StoreError;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// Filter and page for [`IdeaStore::list`]
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    /// 1-based
    pub page: usize,
    pub page_size: usize,
    /// Case-insensitive substring match on the topic
    pub topic_filter: Option<String>,
    pub min_score: Option<f64>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
            topic_filter: None,
            min_score: None,
        }
    }
}

impl ListQuery {
    pub fn page(page: usize, page_size: usize) -> Self {
        Self {
            page,
            page_size,
            ..Self::default()
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic_filter = Some(topic.into());
        self
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = Some(min_score);
        self
    }

    pub fn matches(&self, snapshot: &IdeaSnapshot) -> bool {
        let topic_ok = self.topic_filter.as_ref().map_or(true, |filter| {
            snapshot
                .topic
                .to_lowercase()
                .contains(&filter.to_lowercase())
        });
        let score_ok = self
            .min_score
            .map_or(true, |min| snapshot.overall_score >= min);
        topic_ok && score_ok
    }

    pub(crate) fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1) * self.page_size
    }
}

/// Apply 1-based paging to an ordered list.
pub(crate) fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Vec<T> {
    let offset = page.max(1).saturating_sub(1) * page_size;
    items.into_iter().skip(offset).take(page_size).collect()
}

/// Storage for snapshots and feedback.
#[async_trait]
pub trait IdeaStore: Send + Sync {
    /// Persist a snapshot version, replacing an existing row for the same
    /// `(id, version)`.
    async fn save(&self, snapshot: &IdeaSnapshot) -> Result<IdeaSnapshot, StoreError>;

    /// Latest version of an idea.
    async fn get(&self, id: &str) -> Result<Option<IdeaSnapshot>, StoreError>;

    async fn get_version(&self, id: &str, version: u32)
        -> Result<Option<IdeaSnapshot>, StoreError>;

    /// All versions, oldest first.
    async fn history(&self, id: &str) -> Result<Vec<IdeaSnapshot>, StoreError>;

    /// Latest versions, newest idea first.
    async fn list(&self, query: &ListQuery) -> Result<Vec<IdeaSnapshot>, StoreError>;

    /// Delete every version. `false` when the idea did not exist.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;

    async fn save_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError>;

    async fn get_feedback(&self, id: &str) -> Result<Option<Feedback>, StoreError>;

    /// Feedback for an idea, oldest first.
    async fn feedback_for_idea(
        &self,
        idea_id: &str,
        page: usize,
        page_size: usize,
        feedback_type: Option<&str>,
    ) -> Result<Vec<Feedback>, StoreError>;

    async fn delete_feedback(&self, id: &str) -> Result<bool, StoreError>;
}

/// Process-local store
#[derive(Default)]
pub struct InMemoryStore {
    ideas: RwLock<HashMap<String, BTreeMap<u32, IdeaSnapshot>>>,
    feedback: RwLock<Vec<Feedback>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdeaStore for InMemoryStore {
    async fn save(&self, snapshot: &IdeaSnapshot) -> Result<IdeaSnapshot, StoreError> {
        self.ideas
            .write()
            .await
            .entry(snapshot.id.clone())
            .or_default()
            .insert(snapshot.version, snapshot.clone());
        Ok(snapshot.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<IdeaSnapshot>, StoreError> {
        Ok(self
            .ideas
            .read()
            .await
            .get(id)
            .and_then(|versions| versions.values().next_back().cloned()))
    }

    async fn get_version(
        &self,
        id: &str,
        version: u32,
    ) -> Result<Option<IdeaSnapshot>, StoreError> {
        Ok(self
            .ideas
            .read()
            .await
            .get(id)
            .and_then(|versions| versions.get(&version).cloned()))
    }

    async fn history(&self, id: &str) -> Result<Vec<IdeaSnapshot>, StoreError> {
        Ok(self
            .ideas
            .read()
            .await
            .get(id)
            .map(|versions| versions.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn list(&self, query: &ListQuery) -> Result<Vec<IdeaSnapshot>, StoreError> {
        let mut latest: Vec<IdeaSnapshot> = self
            .ideas
            .read()
            .await
            .values()
            .filter_map(|versions| versions.values().next_back())
            .filter(|snapshot| query.matches(snapshot))
            .cloned()
            .collect();
        latest.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(paginate(latest, query.page, query.page_size))
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.ideas.write().await.remove(id).is_some())
    }

    async fn save_feedback(&self, feedback: &Feedback) -> Result<Feedback, StoreError> {
        let mut all = self.feedback.write().await;
        match all.iter_mut().find(|existing| existing.id == feedback.id) {
            Some(existing) => *existing = feedback.clone(),
            None => all.push(feedback.clone()),
        }
        Ok(feedback.clone())
    }

    async fn get_feedback(&self, id: &str) -> Result<Option<Feedback>, StoreError> {
        Ok(self
            .feedback
            .read()
            .await
            .iter()
            .find(|feedback| feedback.id == id)
            .cloned())
    }

    async fn feedback_for_idea(
        &self,
        idea_id: &str,
        page: usize,
        page_size: usize,
        feedback_type: Option<&str>,
    ) -> Result<Vec<Feedback>, StoreError> {
        let matching: Vec<Feedback> = self
            .feedback
            .read()
            .await
            .iter()
            .filter(|feedback| feedback.idea_id == idea_id)
            .filter(|feedback| feedback_type.map_or(true, |kind| feedback.feedback_type == kind))
            .cloned()
            .collect();
        Ok(paginate(matching, page, page_size))
    }

    async fn delete_feedback(&self, id: &str) -> Result<bool, StoreError> {
        let mut all = self.feedback.write().await;
        let before = all.len();
        all.retain(|feedback| feedback.id != id);
        Ok(all.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::{Constraints, IdeaDraft, MarketAnalysis};
    use pretty_assertions::assert_eq;

    fn snapshot(topic: &str, score: f64) -> IdeaSnapshot {
        let mut snapshot = IdeaSnapshot::draft(
            topic,
            Constraints::new(),
            IdeaDraft::placeholder(0, topic),
            MarketAnalysis::default(),
        );
        snapshot.overall_score = score;
        snapshot
    }

    #[tokio::test]
    async fn test_versions_are_kept() {
        let store = InMemoryStore::new();
        let v1 = snapshot("pets", 0.5);
        let mut v2 = v1.clone();
        v2.version = 2;
        v2.description = "changed".into();

        store.save(&v1).await.unwrap();
        store.save(&v2).await.unwrap();

        assert_eq!(store.get(&v1.id).await.unwrap().unwrap().version, 2);
        assert_eq!(store.get_version(&v1.id, 1).await.unwrap(), Some(v1.clone()));
        let versions: Vec<u32> = store
            .history(&v1.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.version)
            .collect();
        assert_eq!(versions, vec![1, 2]);
        assert_eq!(store.list(&ListQuery::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_filters_and_pages() {
        let store = InMemoryStore::new();
        for (topic, score) in [("Pet care", 0.9), ("pet food", 0.2), ("fintech", 0.8)] {
            store.save(&snapshot(topic, score)).await.unwrap();
        }

        let pets = store
            .list(&ListQuery::default().with_topic("PET"))
            .await
            .unwrap();
        assert_eq!(pets.len(), 2);

        let good = store
            .list(&ListQuery::default().with_min_score(0.75))
            .await
            .unwrap();
        assert_eq!(good.len(), 2);

        assert_eq!(store.list(&ListQuery::page(2, 2)).await.unwrap().len(), 1);
        assert!(store.list(&ListQuery::page(3, 2)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_all_versions() {
        let store = InMemoryStore::new();
        let v1 = snapshot("pets", 0.5);
        store.save(&v1).await.unwrap();
        assert!(store.delete(&v1.id).await.unwrap());
        assert!(!store.delete(&v1.id).await.unwrap());
        assert!(store.history(&v1.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_feedback_by_idea_and_type() {
        let store = InMemoryStore::new();
        let a = Feedback::new("idea-1", "market", "bigger market");
        let b = Feedback::new("idea-1", "feature", "add chat");
        let c = Feedback::new("idea-2", "market", "other idea");
        for feedback in [&a, &b, &c] {
            store.save_feedback(feedback).await.unwrap();
        }

        assert_eq!(store.feedback_for_idea("idea-1", 1, 10, None).await.unwrap().len(), 2);
        let market = store
            .feedback_for_idea("idea-1", 1, 10, Some("market"))
            .await
            .unwrap();
        assert_eq!(market, vec![a.clone()]);

        assert!(store.delete_feedback(&a.id).await.unwrap());
        assert_eq!(store.get_feedback(&a.id).await.unwrap(), None);
        assert_eq!(store.get_feedback(&b.id).await.unwrap(), Some(b));
    }

    #[test]
    fn test_offset() {
        assert_eq!(ListQuery::page(0, 10).offset(), 0);
        assert_eq!(ListQuery::page(3, 10).offset(), 20);
    }
}
