//! Reminder scheduler.
//!
//! Keeps a table of pending notification triggers, one per reminder offset
//! (by default one hour and five minutes before the reminder instant), and
//! fires them through a [`Notifier`] when the driving loop reaches their
//! deadline. Nothing is persisted: the table lives as long as the scheduler.
//!
//! The scheduler never returns errors to its caller. Bad reminder input,
//! refused permission and display failures are logged and reported back as
//! outcome values so the host can inspect them.

use log::{debug, error, info, warn};
use std::collections::{BTreeMap, HashMap};

use crate::clock::Clock;
use crate::config::{ReminderOffset, ReminderSettings};
use crate::models::{EntityId, Remindable};
use crate::notify::{Alert, Notifier, Permission};
use crate::reminder::{ReminderError, ReminderSpec};
use crate::timer::{TimerHandle, TimerQueue};

/// Identifies one trigger: the entity it belongs to and when it fires.
/// Ordering by entity first lets all of an entity's triggers be found with a range scan.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerKey {
    pub entity_id: EntityId,
    pub fire_at: i64,
}

/// A pending notification
#[derive(Debug, Clone)]
pub struct ScheduledTrigger {
    pub entity_id: EntityId,
    pub fire_at: i64,
    /// Offset label, e.g. "1-hour-before"
    pub kind: String,
    pub handle: TimerHandle,
    alert: Alert,
}

impl ScheduledTrigger {
    pub fn alert(&self) -> &Alert {
        &self.alert
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedTrigger {
    pub kind: String,
    pub fire_at: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScheduleOutcome {
    /// The reminder could not be turned into an instant
    Invalid(ReminderError),
    /// The reminder instant is not in the future
    Elapsed { target: i64 },
    /// Offsets whose fire instant was still ahead were armed, the rest skipped
    Scheduled {
        target: i64,
        armed: Vec<ArmedTrigger>,
        skipped: Vec<String>,
    },
}

impl ScheduleOutcome {
    pub fn armed_count(&self) -> usize {
        match self {
            ScheduleOutcome::Scheduled { armed, .. } => armed.len(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    Displayed,
    /// Permission was not granted; nothing was shown
    Suppressed(Permission),
    /// The notifier rejected the alert
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerEvent {
    Fired {
        entity_id: EntityId,
        kind: String,
        fire_at: i64,
        outcome: FireOutcome,
    },
    AutoDismissed { tag: String },
    Swept { removed: usize },
}

#[derive(Debug)]
enum TimerTask {
    Fire(TriggerKey),
    Dismiss(String),
    Sweep,
}

pub struct ReminderScheduler<C: Clock, N: Notifier> {
    clock: C,
    notifier: N,
    settings: ReminderSettings,
    triggers: BTreeMap<TriggerKey, ScheduledTrigger>,
    timers: TimerQueue<TimerTask>,
    /// Auto-dismiss timer per visible alert tag
    dismissals: HashMap<String, TimerHandle>,
    sweep: Option<TimerHandle>,
}

impl<C: Clock, N: Notifier> ReminderScheduler<C, N> {
    pub fn new(clock: C, notifier: N, settings: ReminderSettings) -> Self {
        info!(
            "Reminder scheduler ready with {} offset(s)",
            settings.offsets.len()
        );
        Self {
            clock,
            notifier,
            settings,
            triggers: BTreeMap::new(),
            timers: TimerQueue::new(),
            dismissals: HashMap::new(),
            sweep: None,
        }
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Ask for notification permission unless the answer is already known.
    /// Returns whether alerts may be shown.
    pub fn request_permission(&mut self) -> bool {
        match self.notifier.permission() {
            Permission::Granted => true,
            Permission::Denied => {
                debug!("Notification permission was denied previously");
                false
            }
            Permission::Unsupported => {
                warn!("Notifications are not supported on this platform");
                false
            }
            Permission::Default => {
                let answer = self.notifier.prompt_permission();
                info!("Notification permission result: {:?}", answer);
                answer == Permission::Granted
            }
        }
    }

    /// Arm one trigger per configured offset that still lies in the future
    pub fn schedule_reminder<E: Remindable + ?Sized>(
        &mut self,
        entity: &E,
        spec: &ReminderSpec,
    ) -> ScheduleOutcome {
        let entity_id = entity.entity_id();
        let now = self.clock.now_ms();

        let target = match spec.target_instant() {
            Ok(target) => target,
            Err(e) => {
                warn!("Skipping reminder for {}: {}", entity_id, e);
                return ScheduleOutcome::Invalid(e);
            }
        };

        if target <= now {
            debug!("Reminder for {} already passed", entity_id);
            return ScheduleOutcome::Elapsed { target };
        }

        let mut armed = Vec::new();
        let mut skipped = Vec::new();
        for (fire_at, offset) in self.candidates(target) {
            if fire_at <= now {
                debug!("{} alert for {} skipped (in past)", offset.kind, entity_id);
                skipped.push(offset.kind.clone());
                continue;
            }

            let key = TriggerKey {
                entity_id: entity_id.clone(),
                fire_at,
            };
            // Re-scheduling the same instant replaces the old timer
            if let Some(previous) = self.triggers.remove(&key) {
                self.timers.disarm(previous.handle);
            }

            let alert = self.render_alert(entity, &offset);
            let handle = self.timers.arm(fire_at, TimerTask::Fire(key.clone()));
            debug!(
                "Scheduling '{}' in {} minutes",
                alert.title,
                (fire_at - now) / 60_000
            );
            self.triggers.insert(
                key,
                ScheduledTrigger {
                    entity_id: entity_id.clone(),
                    fire_at,
                    kind: offset.kind.clone(),
                    handle,
                    alert,
                },
            );
            armed.push(ArmedTrigger {
                kind: offset.kind,
                fire_at,
            });
        }

        info!(
            "Scheduled {} alert(s) for {} ({})",
            armed.len(),
            entity_id,
            entity.title()
        );
        ScheduleOutcome::Scheduled {
            target,
            armed,
            skipped,
        }
    }

    /// Schedule whatever reminder the entity carries; `None` if it has none
    pub fn schedule_entity<E: Remindable + ?Sized>(&mut self, entity: &E) -> Option<ScheduleOutcome> {
        let spec = entity.reminder()?;
        Some(self.schedule_reminder(entity, &spec))
    }

    /// Drop an edited entity's old triggers and schedule its current reminder
    pub fn reschedule_entity<E: Remindable + ?Sized>(&mut self, entity: &E) -> Option<ScheduleOutcome> {
        self.cancel_for_entity(&entity.entity_id());
        self.schedule_entity(entity)
    }

    /// Replace the whole table after the entity list was reloaded
    pub fn reschedule_all<'a, I>(&mut self, entities: I) -> Vec<(EntityId, ScheduleOutcome)>
    where
        I: IntoIterator<Item = &'a dyn Remindable>,
    {
        self.cancel_all();
        entities
            .into_iter()
            .filter_map(|entity| {
                self.schedule_entity(entity)
                    .map(|outcome| (entity.entity_id(), outcome))
            })
            .collect()
    }

    /// Disarm and remove every trigger of one entity; returns how many were removed
    pub fn cancel_for_entity(&mut self, entity_id: &EntityId) -> usize {
        let keys: Vec<TriggerKey> = self
            .triggers
            .range(Self::entity_range(entity_id))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &keys {
            if let Some(trigger) = self.triggers.remove(key) {
                self.timers.disarm(trigger.handle);
            }
        }

        info!("Cancelled {} alert(s) for {}", keys.len(), entity_id);
        keys.len()
    }

    /// Disarm and remove every trigger
    pub fn cancel_all(&mut self) -> usize {
        let count = self.triggers.len();
        for trigger in std::mem::take(&mut self.triggers).into_values() {
            self.timers.disarm(trigger.handle);
        }
        info!("Cancelled all {} alert(s)", count);
        count
    }

    /// Arm the periodic cleanup pass. Calling it again restarts the interval.
    pub fn start_background_sweep(&mut self) {
        if let Some(handle) = self.sweep.take() {
            self.timers.disarm(handle);
        }
        let deadline = self.clock.now_ms().saturating_add(self.settings.sweep_interval_ms());
        self.sweep = Some(self.timers.arm(deadline, TimerTask::Sweep));
        debug!(
            "Background sweep every {}s",
            self.settings.sweep_interval_secs
        );
    }

    /// Remove triggers whose fire instant has passed without firing
    pub fn sweep(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.sweep_before(now)
    }

    /// Stop the sweep, cancel every trigger and drop pending auto-dismissals
    pub fn stop(&mut self) {
        if let Some(handle) = self.sweep.take() {
            self.timers.disarm(handle);
        }
        self.cancel_all();
        for (_, handle) in self.dismissals.drain() {
            self.timers.disarm(handle);
        }
        info!("Reminder scheduler stopped");
    }

    /// Handle a click on a displayed alert: focus the app, close the alert
    /// and drop its auto-dismiss timer. Called by the host's click handler.
    pub fn on_alert_clicked(&mut self, tag: &str) {
        debug!("Alert {} clicked", tag);
        self.notifier.focus_app();
        self.notifier.dismiss(tag);
        if let Some(handle) = self.dismissals.remove(tag) {
            self.timers.disarm(handle);
        }
    }

    /// Run every timer that is due at the current time, in deadline order
    pub fn tick(&mut self) -> Vec<SchedulerEvent> {
        let now = self.clock.now_ms();
        let mut events = Vec::new();

        while let Some((deadline, task)) = self.timers.pop_due(now) {
            match task {
                TimerTask::Fire(key) => {
                    let Some(trigger) = self.triggers.remove(&key) else {
                        continue;
                    };
                    let outcome = self.fire(&trigger);
                    events.push(SchedulerEvent::Fired {
                        entity_id: trigger.entity_id,
                        kind: trigger.kind,
                        fire_at: trigger.fire_at,
                        outcome,
                    });
                }
                TimerTask::Dismiss(tag) => {
                    self.dismissals.remove(&tag);
                    self.notifier.dismiss(&tag);
                    events.push(SchedulerEvent::AutoDismissed { tag });
                }
                TimerTask::Sweep => {
                    // Judge staleness by when the sweep was due, so a late
                    // tick cannot discard triggers that are merely queued behind it
                    let removed = self.sweep_before(deadline);
                    let next = now.saturating_add(self.settings.sweep_interval_ms());
                    self.sweep = Some(self.timers.arm(next, TimerTask::Sweep));
                    events.push(SchedulerEvent::Swept { removed });
                }
            }
        }

        events
    }

    /// Drive the scheduler until no triggers or visible alerts remain
    pub fn run_until_idle(&mut self) -> Vec<SchedulerEvent> {
        let mut events = Vec::new();
        self.run_until_idle_with(|event| events.push(event.clone()));
        events
    }

    /// Like `run_until_idle`, reporting each event as it happens
    pub fn run_until_idle_with<F: FnMut(&SchedulerEvent)>(&mut self, mut on_event: F) {
        while !self.is_idle() {
            let Some(deadline) = self.timers.next_deadline() else {
                break;
            };
            self.clock.sleep_until(deadline);
            for event in self.tick() {
                on_event(&event);
            }
        }
    }

    pub fn is_idle(&self) -> bool {
        self.triggers.is_empty() && self.dismissals.is_empty()
    }

    pub fn next_deadline(&mut self) -> Option<i64> {
        self.timers.next_deadline()
    }

    pub fn scheduled_count(&self) -> usize {
        self.triggers.len()
    }

    /// Pending triggers ordered by entity, then fire instant
    pub fn triggers(&self) -> impl Iterator<Item = &ScheduledTrigger> {
        self.triggers.values()
    }

    pub fn triggers_for(&self, entity_id: &EntityId) -> impl Iterator<Item = &ScheduledTrigger> {
        self.triggers
            .range(Self::entity_range(entity_id))
            .map(|(_, trigger)| trigger)
    }

    // The trigger has already been taken out of the table
    fn fire(&mut self, trigger: &ScheduledTrigger) -> FireOutcome {
        info!("Showing alert: {}", trigger.alert.title);

        if !self.request_permission() {
            let permission = self.notifier.permission();
            info!(
                "Alert for {} suppressed, permission {:?}",
                trigger.entity_id, permission
            );
            return FireOutcome::Suppressed(permission);
        }

        match self.notifier.show(&trigger.alert) {
            Ok(()) => {
                self.arm_dismissal(&trigger.alert.tag);
                FireOutcome::Displayed
            }
            Err(e) => {
                error!("Error showing alert for {}: {}", trigger.entity_id, e);
                FireOutcome::Failed(e.to_string())
            }
        }
    }

    // A newer alert with the same tag replaces the visible one, so it also
    // takes over the dismissal deadline
    fn arm_dismissal(&mut self, tag: &str) {
        if let Some(previous) = self.dismissals.remove(tag) {
            self.timers.disarm(previous);
        }
        let deadline = self.clock.now_ms().saturating_add(self.settings.display_ms());
        let handle = self.timers.arm(deadline, TimerTask::Dismiss(tag.to_string()));
        self.dismissals.insert(tag.to_string(), handle);
    }

    fn sweep_before(&mut self, cutoff: i64) -> usize {
        let stale: Vec<TriggerKey> = self
            .triggers
            .iter()
            .filter(|(key, _)| key.fire_at < cutoff)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &stale {
            if let Some(trigger) = self.triggers.remove(key) {
                self.timers.disarm(trigger.handle);
            }
        }

        if !stale.is_empty() {
            warn!("Cleaned up {} expired alert(s)", stale.len());
        }
        stale.len()
    }

    /// Fire instants for each offset, earliest first; offsets landing on
    /// the same instant collapse into the first configured one
    fn candidates(&self, target: i64) -> Vec<(i64, ReminderOffset)> {
        let mut candidates: Vec<(i64, ReminderOffset)> = self
            .settings
            .offsets
            .iter()
            .map(|offset| (target.saturating_sub(offset.lead_ms()), offset.clone()))
            .collect();
        candidates.sort_by_key(|(fire_at, _)| *fire_at);
        candidates.dedup_by_key(|(fire_at, _)| *fire_at);
        candidates
    }

    fn render_alert<E: Remindable + ?Sized>(&self, entity: &E, offset: &ReminderOffset) -> Alert {
        Alert {
            title: format!("{} lagi: {}", offset.title_prefix, entity.title()),
            body: format!(
                "{}: {}\n{}",
                offset.body_prefix,
                entity.title(),
                entity.summary()
            ),
            tag: entity.entity_id().to_string(),
            icon: self.settings.icon.clone(),
            require_interaction: true,
        }
    }

    fn entity_range(entity_id: &EntityId) -> std::ops::RangeInclusive<TriggerKey> {
        TriggerKey {
            entity_id: entity_id.clone(),
            fire_at: i64::MIN,
        }..=TriggerKey {
            entity_id: entity_id.clone(),
            fire_at: i64::MAX,
        }
    }
}
