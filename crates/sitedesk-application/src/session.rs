//! Session manager.
//!
//! Owns the authentication lifecycle state machine independent of any
//! particular screen. All auth-state writes are stamped with a
//! monotonically increasing sequence number and applied last-write-wins,
//! so a change-feed event always supersedes an in-flight bootstrap
//! result regardless of resolution order.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::time::timeout;

use sitedesk_core::config::SyncConfig;
use sitedesk_core::session::{AuthEvent, AuthState, Session};
use sitedesk_core::store::RecordStore;
use sitedesk_core::user::{Profile, ProfileSource};

use crate::snapshot::{DashboardSnapshot, SnapshotStore};

/// Manages the authentication lifecycle.
///
/// `SessionService` is responsible for:
/// - Bootstrapping the session from the record store at process start
/// - Applying session-changed notifications pushed by the change feed
/// - Signing out (local-first, never rolled back)
/// - Resolving the provisional vs. authoritative profile
pub struct SessionService {
    store: Arc<dyn RecordStore>,
    snapshot: Arc<SnapshotStore>,
    config: SyncConfig,
    /// Next sequence stamp to hand out
    seq: AtomicU64,
    /// Highest stamp applied so far
    applied: AtomicU64,
}

impl SessionService {
    pub fn new(
        store: Arc<dyn RecordStore>,
        snapshot: Arc<SnapshotStore>,
        config: SyncConfig,
    ) -> Self {
        Self {
            store,
            snapshot,
            config,
            seq: AtomicU64::new(0),
            applied: AtomicU64::new(0),
        }
    }

    fn next_stamp(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Applies an auth-state write if `stamp` is still current.
    ///
    /// `>=` rather than `>`: a bootstrap finalizes under the same stamp
    /// it was started with, while any event stamped later wins over it.
    /// The stamp check and the write share the snapshot store's
    /// serialization, so they are atomic together.
    fn apply(&self, stamp: u64, f: impl FnOnce(&mut DashboardSnapshot)) -> bool {
        self.snapshot.update_if(|snapshot| {
            if stamp < self.applied.load(Ordering::SeqCst) {
                return false;
            }
            self.applied.store(stamp, Ordering::SeqCst);
            f(snapshot);
            true
        })
    }

    /// Queries the session endpoint once and settles the auth state.
    ///
    /// A bounded failsafe forces the machine out of `Authenticating`
    /// even if the query never resolves; the UI must never be stuck
    /// loading. Returns true if a live session was found and its result
    /// was applied (a concurrent auth event may supersede it).
    ///
    /// The profile load is scheduled on a background task and does not
    /// block the state transition.
    pub async fn bootstrap(self: &Arc<Self>) -> bool {
        tracing::info!("[SessionService] Bootstrapping session");
        let stamp = self.next_stamp();
        self.apply(stamp, |s| {
            s.auth_state = AuthState::Authenticating;
            s.loading = true;
        });

        match timeout(self.config.bootstrap_failsafe(), self.store.get_session()).await {
            Ok(Ok(Some(session))) if !session.is_expired(chrono::Utc::now()) => {
                let profile = Profile::provisional_from_session(&session);
                let user_id = session.user_id.clone();
                let applied = self.apply(stamp, |s| {
                    s.auth_state = AuthState::Authenticated;
                    s.session = Some(session);
                    s.profile = Some(profile);
                    s.loading = false;
                });
                if applied {
                    tracing::info!("[SessionService] Session restored for {}", user_id);
                    self.spawn_profile_load(user_id);
                } else {
                    tracing::debug!("[SessionService] Bootstrap result superseded by auth event");
                }
                applied
            }
            Ok(Ok(_)) => {
                tracing::info!("[SessionService] No live session");
                self.apply(stamp, Self::clear_to_unauthenticated);
                false
            }
            Ok(Err(e)) => {
                tracing::warn!("[SessionService] Session query failed: {}", e);
                self.apply(stamp, Self::clear_to_unauthenticated);
                false
            }
            Err(_) => {
                tracing::warn!(
                    "[SessionService] Bootstrap failsafe elapsed after {:?}, forcing unauthenticated",
                    self.config.bootstrap_failsafe()
                );
                self.apply(stamp, Self::clear_to_unauthenticated);
                false
            }
        }
    }

    /// Applies a session-changed notification pushed by the change feed.
    ///
    /// Session and profile are re-derived from the event payload rather
    /// than re-queried, avoiding the race where a query result arrives
    /// after a newer push event.
    pub fn handle_auth_event(&self, event: AuthEvent) {
        let stamp = self.next_stamp();
        match event {
            AuthEvent::SignedIn { session } | AuthEvent::TokenRefreshed { session } => {
                tracing::info!("[SessionService] Auth event for {}", session.user_id);
                let profile = Profile::provisional_from_session(&session);
                self.apply(stamp, |s| {
                    s.auth_state = AuthState::Authenticated;
                    s.session = Some(session);
                    s.profile = Some(profile);
                    s.loading = false;
                });
            }
            AuthEvent::SignedOut => {
                tracing::info!("[SessionService] External sign-out");
                self.apply(stamp, Self::clear_to_unauthenticated);
            }
        }
    }

    /// Signs out.
    ///
    /// Local state is cleared before any network confirmation so the UI
    /// reflects the logged-out state immediately. Backend invalidation
    /// failure is logged only; sign-out is never rolled back.
    pub async fn sign_out(&self) {
        let stamp = self.next_stamp();
        self.apply(stamp, |s| {
            s.auth_state = AuthState::SigningOut;
            s.session = None;
            s.profile = None;
            s.loading = false;
        });

        if let Err(e) = self.store.invalidate_session().await {
            tracing::warn!(
                "[SessionService] Backend invalidation failed (local state stays cleared): {}",
                e
            );
        }

        // Same stamp: a newer auth event that arrived during invalidation wins
        self.apply(stamp, |s| {
            s.auth_state = AuthState::Unauthenticated;
        });
    }

    /// Fetches the authoritative profile in the background.
    ///
    /// The provisional profile stays in place until the store row
    /// arrives; the replacement is dropped if the session's user changed
    /// while the query was in flight.
    fn spawn_profile_load(self: &Arc<Self>, user_id: String) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            match service.store.fetch_profile(&user_id).await {
                Ok(Some(mut profile)) => {
                    profile.source = ProfileSource::Authoritative;
                    let applied = service.snapshot.update_if(|s| match &s.session {
                        Some(session) if session.user_id == user_id => {
                            s.profile = Some(profile.clone());
                            true
                        }
                        _ => false,
                    });
                    if applied {
                        tracing::debug!("[SessionService] Authoritative profile loaded for {}", user_id);
                    } else {
                        tracing::debug!(
                            "[SessionService] Discarding profile for {}: session changed",
                            user_id
                        );
                    }
                }
                Ok(None) => {
                    tracing::debug!(
                        "[SessionService] No stored profile for {}, keeping provisional",
                        user_id
                    );
                }
                Err(e) => {
                    tracing::warn!("[SessionService] Profile query failed for {}: {}", user_id, e);
                }
            }
        });
    }

    fn clear_to_unauthenticated(snapshot: &mut DashboardSnapshot) {
        snapshot.auth_state = AuthState::Unauthenticated;
        snapshot.session = None;
        snapshot.profile = None;
        snapshot.loading = false;
    }
}
