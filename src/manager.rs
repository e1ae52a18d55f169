use crate::catalog::MediaCatalog;
use crate::config::{ConfigStore, HubConfig, PlayerConfig};
use crate::controls::ControlRegistry;
use crate::error::{HubError, Result};
use crate::hierarchy::{active_queue_owner, GroupIndex};
use crate::jobs::{Job, JobQueue};
use crate::notify::{self, ChangeOutcome};
use crate::provider::PlayerProvider;
use crate::queue::{PlayerQueue, QueueFactory};
use crate::reconcile::{changed_fields, reconcile, ReconcileInput};
use crate::scheduler::{Background, PollCounter};
use crate::subscription::{EventBus, PlayerEvent};
use crate::types::{
    Control, ControlState, ControlType, EffectivePlayer, PlayerId, ProviderId, RawPlayer,
};
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// External collaborators the manager depends on
pub struct Collaborators {
    pub config: Arc<dyn ConfigStore>,
    pub catalog: Arc<dyn MediaCatalog>,
    pub queues: Arc<dyn QueueFactory>,
    pub events: Arc<dyn EventBus>,
}

/// Registry and command router for all players of all providers
///
/// The `PlayerManager` keeps the raw record each provider reported and the
/// effective record callers observe. Every add or update reconciles the
/// effective record, diffs it against the previous snapshot and publishes
/// the resulting events. Follow-up work (child reconciliation, control
/// updates, queue refreshes) is queued and executed in FIFO order, either by
/// the background worker started with [`start`](Self::start) or by
/// [`settle`](Self::settle).
///
/// Cloning is cheap; all clones share the same registry.
#[derive(Clone)]
pub struct PlayerManager {
    inner: Arc<Inner>,
}

struct Inner {
    settings: HubConfig,
    config: Arc<dyn ConfigStore>,
    catalog: Arc<dyn MediaCatalog>,
    queue_factory: Arc<dyn QueueFactory>,
    events: Arc<dyn EventBus>,
    jobs: JobQueue,
    state: Mutex<HubState>,
    background: Mutex<Option<Background>>,
}

/// Registry contents, only touched while holding the state lock
struct HubState {
    raw: HashMap<PlayerId, RawPlayer>,
    players: HashMap<PlayerId, EffectivePlayer>,
    providers: HashMap<ProviderId, Arc<dyn PlayerProvider>>,
    /// Queues outlive player removal and are reused on re-registration
    queues: HashMap<PlayerId, Arc<dyn PlayerQueue>>,
    controls: ControlRegistry,
    groups: GroupIndex,
    poll: PollCounter,
}

/// Events and jobs collected under the lock, released after it
#[derive(Default)]
struct Effects {
    events: Vec<PlayerEvent>,
    jobs: Vec<Job>,
}

/// Everything a device command needs about its target
pub(crate) struct CommandTarget {
    pub player: EffectivePlayer,
    pub provider: Arc<dyn PlayerProvider>,
    pub config: PlayerConfig,
}

impl PlayerManager {
    /// Create a manager with no players, providers or controls
    pub fn new(settings: HubConfig, collaborators: Collaborators) -> Self {
        let state = HubState {
            raw: HashMap::new(),
            players: HashMap::new(),
            providers: HashMap::new(),
            queues: HashMap::new(),
            controls: ControlRegistry::default(),
            groups: GroupIndex::default(),
            poll: PollCounter::new(settings.poll_ticks),
        };
        Self {
            inner: Arc::new(Inner {
                settings,
                config: collaborators.config,
                catalog: collaborators.catalog,
                queue_factory: collaborators.queues,
                events: collaborators.events,
                jobs: JobQueue::new(),
                state: Mutex::new(state),
                background: Mutex::new(None),
            }),
        }
    }

    /// Get the hub settings
    pub fn settings(&self) -> &HubConfig {
        &self.inner.settings
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.inner.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ========== Lifecycle ==========

    /// Start the poll loop and the job worker
    ///
    /// Must be called from within a tokio runtime. Does nothing if the
    /// background tasks are already running.
    pub fn start(&self) {
        let mut background = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if background.is_none() {
            tracing::info!(
                "Starting player polling every {:?}",
                self.inner.settings.poll_interval()
            );
            *background = Some(Background::spawn(
                self.clone(),
                self.inner.settings.poll_interval(),
            ));
        }
    }

    /// Stop the poll loop and the job worker
    ///
    /// Jobs still queued stay queued and can be run with `settle`.
    pub async fn stop(&self) {
        let background = self
            .inner
            .background
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(background) = background {
            background.stop().await;
        }
    }

    /// Stop background work and close every player queue
    pub async fn close(&self) {
        self.stop().await;
        let queues: Vec<(PlayerId, Arc<dyn PlayerQueue>)> = self
            .state()
            .queues
            .iter()
            .map(|(id, queue)| (id.clone(), queue.clone()))
            .collect();
        let results = join_all(queues.iter().map(|(_, queue)| queue.close())).await;
        for ((player_id, _), result) in queues.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!("Failed to close queue of {}: {}", player_id, e);
            }
        }
    }

    // ========== Players ==========

    /// Register a new player or update an existing one
    pub fn add_player(&self, raw: RawPlayer) {
        self.upsert(raw);
    }

    /// Store a provider's latest snapshot of a player and reconcile it
    ///
    /// Unknown players are registered.
    pub fn update_player(&self, raw: RawPlayer) {
        self.upsert(raw);
    }

    /// Remove a player from the registry
    pub fn remove_player(&self, player_id: &str) {
        let mut effects = Effects::default();
        {
            let mut guard = self.state();
            let state = &mut *guard;
            let existed = state.players.remove(player_id).is_some();
            state.raw.remove(player_id);
            if !existed {
                tracing::debug!("Ignoring removal of unknown player {}", player_id);
                return;
            }
            // Members of a removed group fall back to their own queue
            for child in state.groups.children_of(player_id) {
                if state.players.contains_key(child) {
                    effects.jobs.push(Job::Reconcile(child.clone()));
                }
            }
            state.groups.remove(player_id);
            tracing::info!("Player removed: {}", player_id);
            effects.events.push(PlayerEvent::PlayerRemoved {
                player_id: player_id.to_string(),
            });
        }
        self.apply(effects);
    }

    /// Get the effective record of a player
    pub fn get_player(&self, player_id: &str) -> Option<EffectivePlayer> {
        self.state().players.get(player_id).cloned()
    }

    /// Get all players in registration order
    pub fn players(&self) -> Vec<EffectivePlayer> {
        let state = self.state();
        let mut players: Vec<EffectivePlayer> = state.players.values().cloned().collect();
        players.sort_by_key(|player| state.groups.seq_of(&player.player_id));
        players
    }

    // ========== Providers ==========

    /// Register a player provider, replacing one with the same id
    pub fn register_provider(&self, provider: Arc<dyn PlayerProvider>) {
        tracing::info!("Player provider registered: {}", provider.id());
        self.state()
            .providers
            .insert(provider.id().to_string(), provider);
    }

    /// Get all registered providers
    pub fn providers(&self) -> Vec<Arc<dyn PlayerProvider>> {
        self.state().providers.values().cloned().collect()
    }

    /// Get the provider of a player
    pub fn get_provider(&self, player_id: &str) -> Option<Arc<dyn PlayerProvider>> {
        let state = self.state();
        let player = state.players.get(player_id)?;
        state.providers.get(&player.provider_id).cloned()
    }

    /// Get the queue the player currently follows
    ///
    /// This is the queue of the active queue owner, which is a group parent
    /// while that group is powered.
    pub fn get_queue(&self, player_id: &str) -> Option<Arc<dyn PlayerQueue>> {
        let state = self.state();
        let player = state.players.get(player_id)?;
        state.queues.get(&player.active_queue).cloned()
    }

    pub(crate) fn own_queue(&self, player_id: &str) -> Option<Arc<dyn PlayerQueue>> {
        self.state().queues.get(player_id).cloned()
    }

    // ========== Controls ==========

    /// Register a power or volume control, replacing one with the same id
    ///
    /// Every player is reconciled again since any of them may reference it.
    pub fn register_control(&self, control: Control) {
        let mut effects = Effects::default();
        {
            let mut state = self.state();
            tracing::info!(
                "New {:?} control registered: {}",
                control.control_type(),
                control.name
            );
            let control_id = control.id.clone();
            state.controls.register(control);
            effects
                .events
                .push(PlayerEvent::ControlRegistered(control_id));
            let mut player_ids: Vec<&PlayerId> = state.players.keys().collect();
            player_ids.sort_by_key(|id| state.groups.seq_of(id));
            effects
                .jobs
                .extend(player_ids.into_iter().map(|id| Job::Reconcile(id.clone())));
        }
        self.apply(effects);
    }

    /// Store a new control value and reconcile the players using it
    ///
    /// Unknown controls and unchanged values are ignored.
    pub fn update_control_state(&self, control_id: &str, new_state: ControlState) {
        let mut effects = Effects::default();
        {
            let mut state = self.state();
            if !state.controls.update_state(control_id, new_state) {
                return;
            }
            effects
                .events
                .push(PlayerEvent::ControlUpdated(control_id.to_string()));
            let mut player_ids: Vec<&PlayerId> = state
                .players
                .keys()
                .filter(|id| {
                    self.inner
                        .config
                        .player_config(id)
                        .references_control(control_id)
                })
                .collect();
            player_ids.sort_by_key(|id| state.groups.seq_of(id));
            effects
                .jobs
                .extend(player_ids.into_iter().map(|id| Job::Reconcile(id.clone())));
        }
        self.apply(effects);
    }

    /// Get a control, logging a warning when it does not exist
    pub fn get_control(&self, control_id: &str) -> Option<Control> {
        match self.state().controls.get(control_id) {
            Ok(control) => Some(control.clone()),
            Err(e) => {
                tracing::warn!("{}", e);
                None
            }
        }
    }

    /// Get all controls, optionally only those of one type
    pub fn controls(&self, filter: Option<ControlType>) -> Vec<Control> {
        self.state().controls.list(filter)
    }

    // ========== Jobs ==========

    /// Run queued follow-up jobs until the queue is empty
    ///
    /// Jobs dispatched while settling run too. Returns immediately while the
    /// background worker owns the queue.
    pub async fn settle(&self) {
        while let Some(job) = self.inner.jobs.try_next() {
            self.execute(job).await;
        }
    }

    pub(crate) fn dispatch(&self, job: Job) {
        self.inner.jobs.dispatch(job);
    }

    pub(crate) async fn next_job(&self) -> Option<Job> {
        self.inner.jobs.next().await
    }

    pub(crate) async fn execute(&self, job: Job) {
        match job {
            Job::Reconcile(player_id) => self.refresh_player(&player_id),
            Job::SetControlState { control_id, state } => {
                self.update_control_state(&control_id, state)
            }
            Job::RefreshQueue(player_id) => {
                let Some(queue) = self.own_queue(&player_id) else {
                    return;
                };
                if let Err(e) = queue.update_state().await {
                    tracing::warn!("Failed to refresh queue of {}: {}", player_id, e);
                }
            }
        }
    }

    // ========== Polling ==========

    /// Run one poll tick
    ///
    /// Players that need polling are refreshed on every full poll, and on
    /// every tick while playing.
    pub async fn poll_once(&self) {
        let due: Vec<(PlayerId, Option<Arc<dyn PlayerProvider>>)> = {
            let mut guard = self.state();
            let state = &mut *guard;
            let mut due: Vec<&RawPlayer> = state
                .raw
                .values()
                .filter(|raw| state.poll.should_poll(raw))
                .collect();
            due.sort_by_key(|raw| state.groups.seq_of(&raw.player_id));
            let due = due
                .into_iter()
                .map(|raw| {
                    (
                        raw.player_id.clone(),
                        state.providers.get(&raw.provider_id).cloned(),
                    )
                })
                .collect();
            state.poll.advance();
            due
        };

        for (player_id, provider) in due {
            let Some(provider) = provider else {
                self.refresh_player(&player_id);
                continue;
            };
            match provider.poll_player(&player_id).await {
                Ok(Some(raw)) => self.update_player(raw),
                Ok(None) => self.refresh_player(&player_id),
                Err(e) => tracing::warn!("Failed to poll player {}: {}", player_id, e),
            }
        }
    }

    // ========== Command helpers ==========

    pub(crate) fn command_target(&self, player_id: &str) -> Result<CommandTarget> {
        let (player, provider) = {
            let state = self.state();
            let player = state
                .players
                .get(player_id)
                .cloned()
                .ok_or_else(|| HubError::PlayerNotFound(player_id.to_string()))?;
            let provider = state
                .providers
                .get(&player.provider_id)
                .cloned()
                .ok_or_else(|| HubError::ProviderNotFound(player.provider_id.clone()))?;
            (player, provider)
        };
        Ok(CommandTarget {
            player,
            provider,
            config: self.player_config(player_id),
        })
    }

    pub(crate) fn player_config(&self, player_id: &str) -> PlayerConfig {
        self.inner.config.player_config(player_id)
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn MediaCatalog> {
        &self.inner.catalog
    }

    // ========== Reconciliation ==========

    fn upsert(&self, raw: RawPlayer) {
        let mut effects = Effects::default();
        {
            let mut guard = self.state();
            let state = &mut *guard;
            let player_id = raw.player_id.clone();
            if !state.players.contains_key(&player_id) {
                state.groups.register(&player_id);
                if !state.queues.contains_key(&player_id) {
                    let queue = self.inner.queue_factory.create(&player_id);
                    state.queues.insert(player_id.clone(), queue);
                }
            }
            if raw.is_group_player {
                for child in raw.group_children.iter().filter(|c| state.groups.is_group(c)) {
                    tracing::warn!(
                        "Group {} contains group player {}, which keeps its own queue",
                        player_id,
                        child
                    );
                }
            }
            state
                .groups
                .set_children(&player_id, raw.is_group_player, &raw.group_children);
            state.raw.insert(player_id.clone(), raw);
            self.reconcile_locked(state, &player_id, &mut effects);
        }
        self.apply(effects);
    }

    /// Reconcile a player from its stored raw record
    fn refresh_player(&self, player_id: &str) {
        let mut effects = Effects::default();
        {
            let mut guard = self.state();
            self.reconcile_locked(&mut guard, player_id, &mut effects);
        }
        self.apply(effects);
    }

    fn reconcile_locked(&self, state: &mut HubState, player_id: &str, effects: &mut Effects) {
        let Some(raw) = state.raw.get(player_id) else {
            return;
        };
        let config = self.inner.config.player_config(player_id);
        let resolve = |control_id: Option<&str>| {
            let control_id = control_id?;
            match state.controls.get(control_id) {
                Ok(control) => Some(control),
                Err(e) => {
                    tracing::warn!("{}, ignoring overlay of {}", e, player_id);
                    None
                }
            }
        };
        let power_control = resolve(config.power_control.as_deref());
        let volume_control = resolve(config.volume_control.as_deref());

        let parents = state.groups.parents_of(player_id, raw.is_group_player);
        let active_queue = active_queue_owner(player_id, parents, |id| {
            state.players.get(id).is_some_and(|parent| parent.powered)
        });
        let queue_owner = if active_queue != player_id {
            state.players.get(&active_queue)
        } else {
            None
        };
        let children: Vec<&EffectivePlayer> = if raw.is_group_player {
            state
                .groups
                .children_of(player_id)
                .iter()
                .filter_map(|child| state.players.get(child))
                .collect()
        } else {
            Vec::new()
        };
        let cur_queue_item_id = state
            .queues
            .get(&active_queue)
            .and_then(|queue| queue.cur_item_id());
        let prior = state.players.get(player_id);

        let mut next = reconcile(ReconcileInput {
            raw,
            prior,
            config: &config,
            power_control,
            volume_control,
            children,
            active_queue,
            queue_owner,
            cur_queue_item_id,
            control_entries: state.controls.config_entries(),
        });

        let has_queue = state.queues.contains_key(player_id);
        let is_new = prior.is_none();
        let outcome = match prior {
            None => ChangeOutcome::added(&next, has_queue),
            Some(prior) => notify::evaluate(&next, &changed_fields(prior, &next), has_queue),
        };
        if outcome.touch {
            next.updated_at = Utc::now();
        }

        if is_new {
            tracing::info!("New player added: {}/{}", next.provider_id, next.name);
            effects
                .events
                .push(PlayerEvent::PlayerAdded(Box::new(next.clone())));
        } else if outcome.emit_changed {
            effects
                .events
                .push(PlayerEvent::PlayerChanged(Box::new(next.clone())));
        }
        if outcome.cascade_children {
            for child in state.groups.children_of(player_id) {
                if state.players.get(child).is_some_and(|c| c.available) {
                    effects.jobs.push(Job::Reconcile(child.clone()));
                }
            }
        }
        if outcome.refresh_queue {
            effects.jobs.push(Job::RefreshQueue(player_id.to_string()));
        }
        state.players.insert(player_id.to_string(), next);
    }

    fn apply(&self, effects: Effects) {
        for event in effects.events {
            self.inner.events.publish(event);
        }
        for job in effects.jobs {
            self.inner.jobs.dispatch(job);
        }
    }
}
