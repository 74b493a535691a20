//! Project cache.
//!
//! Owns the in-memory working set of the selected project (candidate
//! project list, current selection, milestones, financial records),
//! orchestrates loads, and keeps exactly one change-feed subscription
//! live for the current project.
//!
//! Supersession: a detail load targets the project id captured at call
//! start and is discarded if a newer selection committed while it was in
//! flight. There is no cancellation primitive; stale results are simply
//! computed and dropped.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use sitedesk_core::config::SyncConfig;
use sitedesk_core::feed::{ChangeFeed, EntityKind, FeedSubscription, SubscriptionHandle, project_topic};
use sitedesk_core::project::FinancialRecordDraft;
use sitedesk_core::store::RecordStore;

use crate::snapshot::SnapshotStore;

/// Entity kinds every project topic subscription registers for.
const SUBSCRIBED_KINDS: [EntityKind; 3] = [
    EntityKind::Project,
    EntityKind::Milestone,
    EntityKind::Communication,
];

#[derive(Default)]
struct SubscriptionState {
    handle: Option<SubscriptionHandle>,
    pump: Option<JoinHandle<()>>,
}

/// Manages the project working set and its change subscription.
pub struct ProjectService {
    store: Arc<dyn RecordStore>,
    feed: Arc<dyn ChangeFeed>,
    snapshot: Arc<SnapshotStore>,
    config: SyncConfig,
    /// At most one subscription is live per process; guarded so that
    /// unsubscribe always happens-before the next subscribe.
    subscription: Mutex<SubscriptionState>,
}

impl ProjectService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn ChangeFeed>,
        snapshot: Arc<SnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            feed,
            snapshot,
            config,
            subscription: Mutex::new(SubscriptionState::default()),
        }
    }

    /// Fetches the accessible project set.
    ///
    /// On the first successful non-empty result, selects the store's
    /// first entry (most recently created) as current. A selection that
    /// no longer appears in the refreshed list (access revoked) is
    /// evicted and replaced the same way. On failure the working set
    /// fails empty: stale data must never be presented as current.
    pub async fn load_projects(self: &Arc<Self>) {
        self.snapshot.update(|s| {
            s.loading = true;
            s.error = None;
        });

        match self.store.list_projects().await {
            Ok(projects) => {
                tracing::info!("[ProjectService] Loaded {} projects", projects.len());
                let first = projects.first().cloned();
                let current = self.snapshot.get().current_project;
                let revoked = current
                    .as_ref()
                    .is_some_and(|c| !projects.iter().any(|p| p.id == c.id));
                if revoked {
                    tracing::info!("[ProjectService] Current project left the accessible set");
                    self.teardown_subscription().await;
                }
                let select = current.is_none() || revoked;
                self.snapshot.update(|s| {
                    s.projects = projects;
                    s.loading = false;
                    if revoked {
                        s.current_project = None;
                        s.milestones.clear();
                        s.financial_records.clear();
                    }
                });
                if select && let Some(first) = first {
                    self.select_project(&first.id).await;
                }
            }
            Err(e) => {
                tracing::warn!("[ProjectService] Project load failed: {}", e);
                self.teardown_subscription().await;
                self.snapshot.update(|s| {
                    s.projects.clear();
                    s.current_project = None;
                    s.milestones.clear();
                    s.financial_records.clear();
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    /// Switches the current project.
    ///
    /// The milestone and financial-record sets are replaced in the same
    /// snapshot publication that commits the new selection, so no reader
    /// can observe the previous project's children alongside the new
    /// project's identifier.
    pub async fn select_project(self: &Arc<Self>, project_id: &str) {
        let project = self
            .snapshot
            .get()
            .projects
            .iter()
            .find(|p| p.id == project_id)
            .cloned();

        let Some(project) = project else {
            tracing::warn!("[ProjectService] Unknown project '{}'", project_id);
            self.snapshot.update(|s| {
                s.error = Some(format!("Unknown project '{project_id}'"));
            });
            return;
        };

        tracing::info!("[ProjectService] Selecting project {}", project.id);
        let id = project.id.clone();
        self.snapshot.update(|s| {
            s.current_project = Some(project);
            s.milestones.clear();
            s.financial_records.clear();
            s.error = None;
        });

        self.resubscribe(&id).await;
        self.load_project_detail(&id).await;
    }

    /// Concurrently fetches milestones and financial records for a
    /// project and applies them if that project is still current.
    pub async fn load_project_detail(&self, project_id: &str) {
        let (milestones, records) = tokio::join!(
            self.store.list_milestones(project_id),
            self.store.list_financial_records(project_id),
        );

        match (milestones, records) {
            (Ok(mut milestones), Ok(mut records)) => {
                for milestone in &mut milestones {
                    milestone.normalize();
                }
                // Scheduled start ascending, undated milestones last
                milestones.sort_by_key(|m| (m.scheduled_start.is_none(), m.scheduled_start));
                records.sort_by(|a, b| b.date.cmp(&a.date));
                records.truncate(self.config.financial_record_cap);

                let applied = self.snapshot.update_if(|s| {
                    if s.current_project_id() == Some(project_id) {
                        s.milestones = milestones;
                        s.financial_records = records;
                        s.error = None;
                        true
                    } else {
                        false
                    }
                });
                if !applied {
                    tracing::debug!(
                        "[ProjectService] Discarding superseded detail load for {}",
                        project_id
                    );
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                tracing::warn!("[ProjectService] Detail load for {} failed: {}", project_id, e);
                // Retain the last-known-good children; only surface the error
                let applied = self.snapshot.update_if(|s| {
                    if s.current_project_id() == Some(project_id) {
                        s.error = Some(e.to_string());
                        true
                    } else {
                        false
                    }
                });
                if !applied {
                    tracing::debug!(
                        "[ProjectService] Dropping error from superseded detail load for {}",
                        project_id
                    );
                }
            }
        }
    }

    /// Re-fetches the project set (and the current project's detail via
    /// auto-selection when nothing is selected yet).
    pub async fn refresh(self: &Arc<Self>) {
        self.load_projects().await;
    }

    /// Creates a financial record, then reloads detail so the snapshot
    /// reflects the store's ordering and cap.
    pub async fn add_financial_record(&self, draft: FinancialRecordDraft) {
        match self.store.insert_financial_record(draft).await {
            Ok(record) => {
                tracing::info!(
                    "[ProjectService] Created financial record {} for {}",
                    record.id,
                    record.project_id
                );
                self.load_project_detail(&record.project_id).await;
            }
            Err(e) => {
                tracing::warn!("[ProjectService] Financial record insert failed: {}", e);
                self.snapshot.update(|s| {
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    /// Evicts the whole working set and tears down the subscription.
    ///
    /// Called when the session ends: project data must not outlive the
    /// identity it was loaded for.
    pub async fn clear(&self) {
        self.teardown_subscription().await;
        self.snapshot.update(|s| {
            s.projects.clear();
            s.current_project = None;
            s.milestones.clear();
            s.financial_records.clear();
            s.error = None;
        });
    }

    /// Swaps the live subscription over to a new project topic.
    ///
    /// The old topic is unsubscribed and its pump stopped before the new
    /// subscribe, so stale-project events can never be delivered into
    /// the new project's reload path.
    async fn resubscribe(self: &Arc<Self>, project_id: &str) {
        let mut subscription = self.subscription.lock().await;

        if let Some(handle) = subscription.handle.take()
            && let Err(e) = self.feed.unsubscribe(&handle).await
        {
            tracing::warn!("[ProjectService] Unsubscribe of '{}' failed: {}", handle.topic, e);
        }
        if let Some(pump) = subscription.pump.take() {
            pump.abort();
        }

        let topic = project_topic(project_id);
        match self.feed.subscribe(&topic, &SUBSCRIBED_KINDS).await {
            Ok(feed_subscription) => {
                subscription.handle = Some(feed_subscription.handle.clone());
                subscription.pump = Some(self.spawn_event_pump(feed_subscription));
            }
            Err(e) => {
                tracing::warn!("[ProjectService] Subscribe to '{}' failed: {}", topic, e);
                self.snapshot.update(|s| {
                    s.error = Some(e.to_string());
                });
            }
        }
    }

    async fn teardown_subscription(&self) {
        let mut subscription = self.subscription.lock().await;
        if let Some(handle) = subscription.handle.take()
            && let Err(e) = self.feed.unsubscribe(&handle).await
        {
            tracing::warn!("[ProjectService] Unsubscribe of '{}' failed: {}", handle.topic, e);
        }
        if let Some(pump) = subscription.pump.take() {
            pump.abort();
        }
    }

    /// Drains a subscription's event queue.
    ///
    /// Any event on the current project's topic triggers a full detail
    /// reload rather than a diff; change volume is low and a wholesale
    /// reload cannot drift from the store. Events whose topic no longer
    /// matches the current project are dropped.
    fn spawn_event_pump(self: &Arc<Self>, subscription: FeedSubscription) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            let FeedSubscription { handle, mut events } = subscription;
            while let Some(event) = events.recv().await {
                let current = service.snapshot.get().current_project;
                match current {
                    Some(project) if project_topic(&project.id) == event.topic => {
                        tracing::debug!(
                            "[ProjectService] Change event ({:?} {}) on '{}', reloading",
                            event.kind,
                            event.entity_id,
                            event.topic
                        );
                        service.load_project_detail(&project.id).await;
                    }
                    _ => {
                        tracing::debug!(
                            "[ProjectService] Ignoring event on stale topic '{}'",
                            event.topic
                        );
                    }
                }
            }
            tracing::debug!("[ProjectService] Event pump for '{}' stopped", handle.topic);
        })
    }
}
