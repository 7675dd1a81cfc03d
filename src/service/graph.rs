//! Follow graph
//!
//! Keeps every account's `followers` and `following` sets mirror images of
//! each other. Each mutation goes through the store's atomic add/remove
//! primitives, one account at a time; this module decides which two (or,
//! for deletion, which many) updates make up an operation and how to react
//! when a peer has vanished in between.
//!
//! Operations by the same actor are serialized: the actor's lock is held
//! across both halves of a follow/unfollow and across the whole cascade, so
//! a follow and an unfollow of the same pair can never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::config::GraphConfig;
use crate::data::{AccountStore, Relation, SetUpdate};
use crate::error::{AppError, GraphError};
use crate::metrics::{
    CASCADE_PEERS_PRUNED_TOTAL, CASCADE_STALE_REFERENCES_TOTAL, record_graph_outcome,
};

/// Result of deleting an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletionSummary {
    /// ID of the deleted account
    pub id: String,
    /// Peers whose mirrored reference was removed
    pub pruned: usize,
    /// Peers that no longer existed and were skipped
    pub stale_references: Vec<String>,
}

/// Async locks keyed by actor id
///
/// Entries are dropped once nobody holds or waits on them.
#[derive(Default)]
struct ActorLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ActorLocks {
    async fn lock(&self, actor_id: &str) -> ActorGuard<'_> {
        let mutex = self.locks.entry(actor_id.to_string()).or_default().clone();
        let guard = mutex.lock_owned().await;
        ActorGuard {
            locks: self,
            actor_id: actor_id.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.len()
    }
}

struct ActorGuard<'a> {
    locks: &'a ActorLocks,
    actor_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ActorGuard<'_> {
    fn drop(&mut self) {
        // Release before the count check so only the map's handle remains.
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.actor_id, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

/// Follow-graph manager
pub struct FollowGraph {
    store: Arc<dyn AccountStore>,
    cascade_concurrency: usize,
    locks: ActorLocks,
}

impl FollowGraph {
    pub fn new(store: Arc<dyn AccountStore>, config: &GraphConfig) -> Self {
        Self {
            store,
            cascade_concurrency: config.cascade_concurrency.max(1),
            locks: ActorLocks::default(),
        }
    }

    /// Make `actor_id` follow `target_id`
    ///
    /// # Returns
    /// The actor's ID
    ///
    /// # Errors
    /// - `SelfReference` if both IDs are equal
    /// - `NotFound` if the target does not exist
    /// - `AlreadyFollowing` if the target is already followed
    pub async fn follow(&self, actor_id: &str, target_id: &str) -> Result<String, AppError> {
        let _guard = self.locks.lock(actor_id).await;
        let result = self.link(actor_id, target_id).await;
        record_graph_outcome("follow", outcome_label(&result));
        result
    }

    /// Make `actor_id` stop following `target_id`
    ///
    /// # Errors
    /// - `SelfReference` if both IDs are equal
    /// - `NotFound` if the target does not exist
    /// - `NotFollowing` if the target is not followed
    pub async fn unfollow(&self, actor_id: &str, target_id: &str) -> Result<String, AppError> {
        let _guard = self.locks.lock(actor_id).await;
        let result = self.unlink(actor_id, target_id).await;
        record_graph_outcome("unfollow", outcome_label(&result));
        result
    }

    /// Delete `actor_id` and prune every peer's reference to it
    ///
    /// Both relationship sets are snapshotted before any peer is touched.
    /// Peer updates run concurrently and in no particular order. A peer that
    /// no longer exists is skipped. The actor's own record is removed last,
    /// so a failed run can simply be repeated.
    pub async fn delete_account(&self, actor_id: &str) -> Result<DeletionSummary, AppError> {
        let _guard = self.locks.lock(actor_id).await;
        let result = self.cascade_delete(actor_id).await;
        record_graph_outcome("delete", outcome_label(&result));
        result
    }

    async fn link(&self, actor_id: &str, target_id: &str) -> Result<String, AppError> {
        if actor_id == target_id {
            return Err(GraphError::SelfReference.into());
        }
        if self.store.find_by_id(target_id).await?.is_none() {
            return Err(GraphError::NotFound.into());
        }

        match self
            .store
            .add_to_relation(actor_id, Relation::Following, target_id)
            .await?
        {
            SetUpdate::Applied => {}
            SetUpdate::Unchanged => return Err(GraphError::AlreadyFollowing.into()),
            SetUpdate::MissingAccount => return Err(AppError::Unauthorized),
        }

        let mirrored = self
            .store
            .add_to_relation(target_id, Relation::Followers, actor_id)
            .await;

        match mirrored {
            Ok(SetUpdate::Applied) => {}
            Ok(SetUpdate::Unchanged) => {
                tracing::warn!(
                    actor = %actor_id,
                    target = %target_id,
                    "target already listed actor as follower before this follow"
                );
            }
            Ok(SetUpdate::MissingAccount) => {
                // Target was deleted after the existence check.
                self.revert(actor_id, Relation::Following, target_id, true)
                    .await;
                return Err(GraphError::NotFound.into());
            }
            Err(error) => {
                self.revert(actor_id, Relation::Following, target_id, true)
                    .await;
                return Err(error);
            }
        }

        tracing::info!(actor = %actor_id, target = %target_id, "Followed account");
        Ok(actor_id.to_string())
    }

    async fn unlink(&self, actor_id: &str, target_id: &str) -> Result<String, AppError> {
        if actor_id == target_id {
            return Err(GraphError::SelfReference.into());
        }
        if self.store.find_by_id(target_id).await?.is_none() {
            // Drop a dangling entry left by an interrupted deletion.
            let pruned = self
                .store
                .remove_from_relation(actor_id, Relation::Following, target_id)
                .await?;
            if pruned == SetUpdate::Applied {
                CASCADE_STALE_REFERENCES_TOTAL.inc();
                tracing::warn!(
                    actor = %actor_id,
                    target = %target_id,
                    "pruned stale reference to deleted account"
                );
            }
            return Err(GraphError::NotFound.into());
        }

        match self
            .store
            .remove_from_relation(actor_id, Relation::Following, target_id)
            .await?
        {
            SetUpdate::Applied => {}
            SetUpdate::Unchanged => return Err(GraphError::NotFollowing.into()),
            SetUpdate::MissingAccount => return Err(AppError::Unauthorized),
        }

        let mirrored = self
            .store
            .remove_from_relation(target_id, Relation::Followers, actor_id)
            .await;

        match mirrored {
            Ok(SetUpdate::Applied) => {}
            Ok(SetUpdate::Unchanged) => {
                tracing::warn!(
                    actor = %actor_id,
                    target = %target_id,
                    "target did not list actor as follower before this unfollow"
                );
            }
            Ok(SetUpdate::MissingAccount) => {
                tracing::debug!(
                    actor = %actor_id,
                    target = %target_id,
                    "target deleted during unfollow"
                );
            }
            Err(error) => {
                self.revert(actor_id, Relation::Following, target_id, false)
                    .await;
                return Err(error);
            }
        }

        tracing::info!(actor = %actor_id, target = %target_id, "Unfollowed account");
        Ok(actor_id.to_string())
    }

    /// Undo the actor-side half of a follow/unfollow whose mirror failed.
    async fn revert(&self, actor_id: &str, relation: Relation, peer_id: &str, was_insert: bool) {
        let undo = if was_insert {
            self.store
                .remove_from_relation(actor_id, relation, peer_id)
                .await
        } else {
            self.store.add_to_relation(actor_id, relation, peer_id).await
        };

        if let Err(error) = undo {
            tracing::error!(
                actor = %actor_id,
                peer = %peer_id,
                relation = relation.as_str(),
                %error,
                "failed to revert half-applied relationship change"
            );
        }
    }

    async fn cascade_delete(&self, actor_id: &str) -> Result<DeletionSummary, AppError> {
        let actor = self
            .store
            .find_by_id(actor_id)
            .await?
            .ok_or(GraphError::NotFound)?;

        // Each entry in the actor's `relation` set must be removed from the
        // peer's inverse set.
        let snapshot: Vec<(String, Relation)> = [Relation::Followers, Relation::Following]
            .into_iter()
            .flat_map(|relation| {
                actor
                    .relation(relation)
                    .iter()
                    .filter(|peer_id| peer_id.as_str() != actor_id)
                    .map(move |peer_id| (peer_id.clone(), relation.inverse()))
            })
            .collect();

        tracing::info!(
            account = %actor_id,
            followers = actor.followers.len(),
            following = actor.following.len(),
            "Deleting account"
        );

        let outcomes: Vec<(String, Relation, Result<SetUpdate, AppError>)> =
            stream::iter(snapshot)
                .map(|(peer_id, relation)| async move {
                    let update = self
                        .store
                        .remove_from_relation(&peer_id, relation, actor_id)
                        .await;
                    (peer_id, relation, update)
                })
                .buffer_unordered(self.cascade_concurrency)
                .collect()
                .await;

        let mut pruned = 0;
        let mut stale_references = Vec::new();
        let mut first_error = None;

        for (peer_id, relation, update) in outcomes {
            match update {
                Ok(SetUpdate::Applied) => pruned += 1,
                Ok(SetUpdate::Unchanged) => {
                    tracing::warn!(
                        account = %actor_id,
                        peer = %peer_id,
                        relation = relation.as_str(),
                        "peer did not reference deleted account"
                    );
                }
                Ok(SetUpdate::MissingAccount) => {
                    tracing::warn!(
                        account = %actor_id,
                        peer = %peer_id,
                        "skipping stale reference to missing account"
                    );
                    stale_references.push(peer_id);
                }
                Err(error) => {
                    tracing::error!(
                        account = %actor_id,
                        peer = %peer_id,
                        %error,
                        "failed to prune peer reference"
                    );
                    first_error.get_or_insert(error);
                }
            }
        }

        CASCADE_PEERS_PRUNED_TOTAL.inc_by(pruned as u64);
        CASCADE_STALE_REFERENCES_TOTAL.inc_by(stale_references.len() as u64);

        if let Some(error) = first_error {
            return Err(error);
        }

        if !self.store.delete(actor_id).await? {
            return Err(GraphError::NotFound.into());
        }

        stale_references.sort();
        tracing::info!(
            account = %actor_id,
            pruned,
            stale = stale_references.len(),
            "Account deleted"
        );

        Ok(DeletionSummary {
            id: actor_id.to_string(),
            pruned,
            stale_references,
        })
    }
}

fn outcome_label<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(AppError::Graph(GraphError::SelfReference)) => "self_reference",
        Err(AppError::Graph(GraphError::NotFound)) => "not_found",
        Err(AppError::Graph(GraphError::AlreadyFollowing)) => "already_following",
        Err(AppError::Graph(GraphError::NotFollowing)) => "not_following",
        Err(AppError::Unauthorized) => "unauthorized",
        Err(_) => "error",
    }
}
