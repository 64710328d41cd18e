use std::{collections::HashSet, future::Future, sync::Arc, time::Duration};

use futures::future::join_all;
use shared::domain::{Decision, Profile, ProfileId};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

use crate::{
    config::{
        QueueSettings, DEFAULT_LOOKAHEAD_THRESHOLD, DEFAULT_PAGE_SIZE, DEFAULT_REQUEST_TIMEOUT,
    },
    error::ServiceError,
    gesture::{
        card_visuals, fly_out_offset, resolve_release, CardVisuals, DragState, GestureConfig,
        ReleaseAction,
    },
    profiles::placeholder_profiles,
    service::ProfileService,
};

#[derive(Debug, Clone, Copy)]
pub struct QueueOptions {
    pub page_size: usize,
    /// Top up once this many or fewer profiles remain after the cursor.
    pub lookahead_threshold: usize,
    pub request_timeout: Duration,
    pub gesture: GestureConfig,
}

impl Default for QueueOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            lookahead_threshold: DEFAULT_LOOKAHEAD_THRESHOLD,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            gesture: GestureConfig::default(),
        }
    }
}

impl QueueOptions {
    pub fn from_settings(settings: &QueueSettings) -> Self {
        Self {
            page_size: settings.page_size,
            lookahead_threshold: settings.lookahead_threshold,
            request_timeout: settings.request_timeout,
            gesture: settings.gesture_config(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    TopUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    /// No session started yet.
    Idle,
    /// The session's first page is in flight.
    Loading,
    Ready { topping_up: bool },
    /// Cursor is at the end but the server may still have more.
    Starved { topping_up: bool },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Appended { added: usize },
    Exhausted,
    FellBack,
    Failed,
    /// A reset happened while this load was in flight; its result was dropped.
    Stale,
    /// Another load was in flight or pagination is exhausted.
    Skipped,
}

#[derive(Debug)]
pub enum AdvanceOutcome {
    Advanced {
        cursor: usize,
        /// Offset the departing card animates to.
        fly_out_offset: f32,
        top_up: Option<JoinHandle<LoadOutcome>>,
    },
    Ignored,
}

#[derive(Debug)]
pub enum ReleaseOutcome {
    SpringBack,
    Decided(AdvanceOutcome),
    Ignored,
}

#[derive(Debug, Clone)]
pub enum QueueEvent {
    PageAppended {
        session: u64,
        added: usize,
        offset: usize,
    },
    FellBackToPlaceholders {
        session: u64,
    },
    Exhausted {
        session: u64,
    },
    TopUpFailed {
        session: u64,
        error: String,
    },
    DecisionRecorded {
        target: ProfileId,
        decision: Decision,
    },
    DecisionFailed {
        target: ProfileId,
        decision: Decision,
        error: String,
    },
}

#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub phase: QueuePhase,
    pub session: u64,
    pub cursor: usize,
    pub len: usize,
    pub offset: usize,
    pub more_available: bool,
    pub current: Option<Profile>,
    pub next: Option<Profile>,
}

#[derive(Default)]
struct QueueState {
    profiles: Vec<Profile>,
    ids: HashSet<ProfileId>,
    cursor: usize,
    offset: usize,
    more_available: bool,
    loading: Option<LoadKind>,
    session: u64,
    drag: DragState,
}

impl QueueState {
    fn begin_session(&mut self) -> u64 {
        self.session += 1;
        self.profiles.clear();
        self.ids.clear();
        self.cursor = 0;
        self.offset = 0;
        self.more_available = true;
        self.loading = Some(LoadKind::Initial);
        self.drag.reset();
        self.session
    }

    fn remaining(&self) -> usize {
        self.profiles.len().saturating_sub(self.cursor)
    }

    fn current(&self) -> Option<&Profile> {
        self.profiles.get(self.cursor)
    }

    /// Appends profiles whose ids are not queued yet, keeping their order.
    fn append_unique(&mut self, profiles: Vec<Profile>) -> usize {
        let before = self.profiles.len();
        for profile in profiles {
            if self.ids.insert(profile.id.clone()) {
                self.profiles.push(profile);
            }
        }
        self.profiles.len() - before
    }

    fn install_placeholders(&mut self) {
        self.profiles.clear();
        self.ids.clear();
        self.cursor = 0;
        self.append_unique(placeholder_profiles());
        self.more_available = false;
    }

    fn phase(&self) -> QueuePhase {
        if self.session == 0 {
            return QueuePhase::Idle;
        }
        let topping_up = self.loading == Some(LoadKind::TopUp);
        if self.loading == Some(LoadKind::Initial) {
            QueuePhase::Loading
        } else if self.cursor < self.profiles.len() {
            QueuePhase::Ready { topping_up }
        } else if self.more_available {
            QueuePhase::Starved { topping_up }
        } else {
            QueuePhase::Exhausted
        }
    }
}

/// Owns the candidate sequence for one viewer.
///
/// All state changes go through the operations below; network calls never
/// run while the state lock is held.
pub struct QueueController {
    service: Arc<dyn ProfileService>,
    viewer: ProfileId,
    options: QueueOptions,
    inner: Mutex<QueueState>,
    events: broadcast::Sender<QueueEvent>,
}

impl QueueController {
    pub fn new(
        service: Arc<dyn ProfileService>,
        viewer: ProfileId,
        options: QueueOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            service,
            viewer,
            options,
            inner: Mutex::new(QueueState::default()),
            events,
        })
    }

    pub fn viewer(&self) -> &ProfileId {
        &self.viewer
    }

    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<QueueEvent> {
        self.events.subscribe()
    }

    /// Starts a new session and loads its first page.
    pub async fn reset(&self) -> LoadOutcome {
        self.load_page(true).await
    }

    /// Loads the next page.
    ///
    /// With `reset` the queue is cleared first and every load started before
    /// is invalidated. Without it the call is a top-up and is skipped while
    /// another load is in flight or pagination is exhausted.
    pub async fn load_page(&self, reset: bool) -> LoadOutcome {
        let (session, offset, kind) = {
            let mut state = self.inner.lock().await;
            if reset {
                let session = state.begin_session();
                info!(session, viewer = %self.viewer, "queue: session reset");
                (session, 0, LoadKind::Initial)
            } else {
                if state.loading.is_some() || !state.more_available || state.session == 0 {
                    return LoadOutcome::Skipped;
                }
                state.loading = Some(LoadKind::TopUp);
                (state.session, state.offset, LoadKind::TopUp)
            }
        };
        self.run_load(session, offset, kind).await
    }

    /// Starts a background top-up when few profiles remain after the cursor.
    ///
    /// Callers in [`QueuePhase::Starved`] use this to retry after a failed
    /// top-up, since no further advance can trigger one.
    pub async fn ensure_lookahead(self: &Arc<Self>) -> Option<JoinHandle<LoadOutcome>> {
        let (session, offset) = self.claim_lookahead(None).await?;
        debug!(session, offset, "queue: look-ahead top-up started");
        let controller = Arc::clone(self);
        Some(tokio::spawn(async move {
            controller.run_lookahead(session, offset).await
        }))
    }

    /// Marks a top-up in flight when few profiles remain, returning the
    /// session and offset to load from.
    async fn claim_lookahead(&self, session: Option<u64>) -> Option<(u64, usize)> {
        let mut state = self.inner.lock().await;
        if state.session == 0
            || session.is_some_and(|session| session != state.session)
            || state.loading.is_some()
            || !state.more_available
            || state.remaining() > self.options.lookahead_threshold
        {
            return None;
        }
        state.loading = Some(LoadKind::TopUp);
        Some((state.session, state.offset))
    }

    /// Loads pages until the look-ahead window is filled again.
    ///
    /// A page whose details all failed leaves the window as short as before,
    /// so the next page is requested straight away. A failed request ends the
    /// run.
    async fn run_lookahead(&self, session: u64, mut offset: usize) -> LoadOutcome {
        let mut added_total = 0;
        loop {
            let added = match self.run_load(session, offset, LoadKind::TopUp).await {
                LoadOutcome::Appended { added } => added,
                outcome => return outcome,
            };
            added_total += added;
            match self.claim_lookahead(Some(session)).await {
                Some((_, next)) => {
                    debug!(session, offset = next, added, "queue: look-ahead window still short");
                    offset = next;
                }
                None => return LoadOutcome::Appended { added: added_total },
            }
        }
    }

    async fn run_load(&self, session: u64, offset: usize, kind: LoadKind) -> LoadOutcome {
        let limit = self.options.page_size;
        let ids = match self
            .with_timeout(self.service.profile_queue(&self.viewer, offset, limit))
            .await
        {
            Ok(ids) => ids,
            Err(err) => return self.finish_failed(session, kind, err).await,
        };
        if ids.is_empty() {
            return self.finish_empty(session, kind).await;
        }

        // join_all yields results in input order whatever order they complete in.
        let results = join_all(
            ids.iter()
                .map(|id| async move { (id, self.with_timeout(self.service.profile(id)).await) }),
        )
        .await;
        let mut profiles = Vec::with_capacity(results.len());
        for (id, result) in results {
            match result {
                Ok(profile) => profiles.push(profile),
                Err(err) => {
                    warn!(
                        session,
                        profile_id = %id,
                        "queue: dropping profile after detail fetch failed: {err:#}"
                    );
                }
            }
        }

        self.finish_page(session, kind, ids, profiles).await
    }

    async fn finish_failed(
        &self,
        session: u64,
        kind: LoadKind,
        err: anyhow::Error,
    ) -> LoadOutcome {
        let mut state = self.inner.lock().await;
        if state.session != session {
            debug!(session, current = state.session, "queue: discarding stale page failure");
            return LoadOutcome::Stale;
        }
        state.loading = None;
        match kind {
            LoadKind::Initial => {
                warn!(session, "queue: initial page failed, using placeholder profiles: {err:#}");
                state.install_placeholders();
                let _ = self
                    .events
                    .send(QueueEvent::FellBackToPlaceholders { session });
                LoadOutcome::FellBack
            }
            LoadKind::TopUp => {
                warn!(session, offset = state.offset, "queue: top-up failed: {err:#}");
                let _ = self.events.send(QueueEvent::TopUpFailed {
                    session,
                    error: err.to_string(),
                });
                LoadOutcome::Failed
            }
        }
    }

    async fn finish_empty(&self, session: u64, kind: LoadKind) -> LoadOutcome {
        let mut state = self.inner.lock().await;
        if state.session != session {
            debug!(session, current = state.session, "queue: discarding stale empty page");
            return LoadOutcome::Stale;
        }
        state.loading = None;
        state.more_available = false;
        if kind == LoadKind::Initial && state.profiles.is_empty() {
            info!(session, "queue: no candidates, using placeholder profiles");
            state.install_placeholders();
            let _ = self
                .events
                .send(QueueEvent::FellBackToPlaceholders { session });
            return LoadOutcome::FellBack;
        }
        info!(session, offset = state.offset, "queue: no more candidates");
        let _ = self.events.send(QueueEvent::Exhausted { session });
        LoadOutcome::Exhausted
    }

    async fn finish_page(
        &self,
        session: u64,
        kind: LoadKind,
        ids: Vec<ProfileId>,
        profiles: Vec<Profile>,
    ) -> LoadOutcome {
        let mut state = self.inner.lock().await;
        if state.session != session {
            debug!(session, current = state.session, "queue: discarding stale page");
            return LoadOutcome::Stale;
        }
        state.loading = None;
        state.offset += ids.len();

        let fresh_ids = ids
            .iter()
            .filter(|id| !state.ids.contains(*id))
            .collect::<HashSet<_>>()
            .len();
        let added = state.append_unique(profiles);

        if kind == LoadKind::Initial && state.profiles.is_empty() {
            warn!(
                session,
                requested = ids.len(),
                "queue: every profile in the first page failed, using placeholder profiles"
            );
            state.install_placeholders();
            let _ = self
                .events
                .send(QueueEvent::FellBackToPlaceholders { session });
            return LoadOutcome::FellBack;
        }

        if fresh_ids == 0 {
            // The server keeps returning what is already queued.
            state.more_available = false;
            info!(session, offset = state.offset, "queue: page had no new candidates");
            let _ = self.events.send(QueueEvent::Exhausted { session });
            return LoadOutcome::Exhausted;
        }

        info!(
            session,
            added,
            returned = ids.len(),
            offset = state.offset,
            len = state.profiles.len(),
            "queue: page appended"
        );
        let _ = self.events.send(QueueEvent::PageAppended {
            session,
            added,
            offset: state.offset,
        });
        LoadOutcome::Appended { added }
    }

    async fn with_timeout<T>(
        &self,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> anyhow::Result<T> {
        match tokio::time::timeout(self.options.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ServiceError::Timeout(self.options.request_timeout).into()),
        }
    }

    /// Records `decision` for the current profile and moves past it.
    ///
    /// The backend call is dispatched in the background; the cursor moves
    /// regardless of its outcome. A `target` other than the current profile
    /// is ignored.
    pub async fn advance(
        self: &Arc<Self>,
        decision: Decision,
        target: &ProfileId,
    ) -> AdvanceOutcome {
        let cursor = {
            let mut state = self.inner.lock().await;
            match state.current() {
                Some(current) if current.id == *target => {}
                Some(current) => {
                    warn!(
                        expected = %current.id,
                        got = %target,
                        "queue: ignoring decision for a profile that is not on top"
                    );
                    return AdvanceOutcome::Ignored;
                }
                None => {
                    debug!(profile_id = %target, "queue: ignoring decision with no profile on top");
                    return AdvanceOutcome::Ignored;
                }
            }
            state.cursor += 1;
            state.drag.reset();
            state.cursor
        };

        self.dispatch_decision(target.clone(), decision);
        let top_up = self.ensure_lookahead().await;
        AdvanceOutcome::Advanced {
            cursor,
            fly_out_offset: fly_out_offset(&self.options.gesture, decision),
            top_up,
        }
    }

    fn dispatch_decision(&self, target: ProfileId, decision: Decision) {
        let service = Arc::clone(&self.service);
        let viewer = self.viewer.clone();
        let events = self.events.clone();
        let timeout = self.options.request_timeout;
        tokio::spawn(async move {
            let result = match tokio::time::timeout(
                timeout,
                service.record_decision(&viewer, &target, decision),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => Err(ServiceError::Timeout(timeout).into()),
            };
            match result {
                Ok(()) => {
                    debug!(profile_id = %target, %decision, "queue: decision recorded");
                    let _ = events.send(QueueEvent::DecisionRecorded { target, decision });
                }
                Err(err) => {
                    warn!(
                        profile_id = %target,
                        %decision,
                        "queue: failed to record decision: {err:#}"
                    );
                    let _ = events.send(QueueEvent::DecisionFailed {
                        target,
                        decision,
                        error: err.to_string(),
                    });
                }
            }
        });
    }

    /// Steps back to the previous profile; `false` at the start of the queue.
    pub async fn go_back(&self) -> bool {
        let mut state = self.inner.lock().await;
        if state.cursor == 0 {
            debug!("queue: no previous profile");
            return false;
        }
        state.cursor -= 1;
        state.drag.reset();
        true
    }

    /// Feeds a drag move on the top card, returning visuals once claimed.
    pub async fn drag_moved(&self, dx: f32, dy: f32) -> Option<CardVisuals> {
        let mut state = self.inner.lock().await;
        state.current()?;
        let gesture = self.options.gesture;
        if state.drag.on_move(&gesture, dx, dy) {
            Some(card_visuals(&gesture, state.drag.offset_x()))
        } else {
            None
        }
    }

    /// Resolves a released drag into a decision or a spring-back.
    pub async fn drag_released(self: &Arc<Self>, dx: f32) -> ReleaseOutcome {
        let (action, target) = {
            let mut state = self.inner.lock().await;
            let claimed = state.drag.is_claimed();
            let target = state.current().map(|profile| profile.id.clone());
            let Some(target) = target else {
                state.drag.reset();
                return ReleaseOutcome::Ignored;
            };
            if !claimed {
                return ReleaseOutcome::Ignored;
            }
            let action = resolve_release(&self.options.gesture, dx);
            if action == ReleaseAction::SpringBack {
                state.drag.reset();
            }
            (action, target)
        };
        match action {
            ReleaseAction::SpringBack => ReleaseOutcome::SpringBack,
            ReleaseAction::Decide(decision) => {
                ReleaseOutcome::Decided(self.advance(decision, &target).await)
            }
        }
    }

    /// Card visuals for the current drag offset.
    pub async fn card_visuals(&self) -> CardVisuals {
        let state = self.inner.lock().await;
        card_visuals(&self.options.gesture, state.drag.offset_x())
    }

    pub async fn phase(&self) -> QueuePhase {
        self.inner.lock().await.phase()
    }

    pub async fn snapshot(&self) -> QueueSnapshot {
        let state = self.inner.lock().await;
        QueueSnapshot {
            phase: state.phase(),
            session: state.session,
            cursor: state.cursor,
            len: state.profiles.len(),
            offset: state.offset,
            more_available: state.more_available,
            current: state.current().cloned(),
            next: state.profiles.get(state.cursor + 1).cloned(),
        }
    }

    /// Ids in queue order, including consumed ones.
    pub async fn profile_ids(&self) -> Vec<ProfileId> {
        let state = self.inner.lock().await;
        state.profiles.iter().map(|p| p.id.clone()).collect()
    }
}

#[cfg(test)]
#[path = "tests/queue_tests.rs"]
mod tests;
