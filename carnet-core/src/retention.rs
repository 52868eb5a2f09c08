/*!
Retention policy and the local variant's snapshot scheduler.

The local archive keeps a bounded rotating history: after each store the
catalog is trimmed to the newest slots, and an explicit maintenance call
evicts entries older than the configured window regardless of count.

The scheduler is an owned task handle, not an ambient flag: `start` returns a
[`SchedulerHandle`] whose cancellation is the only way to stop the timer.
A failed scheduled snapshot is logged and simply retried at the next tick;
the scheduler tracks no backoff and no failure counts.
*/

use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::archive::ArchiveEntry;
use crate::engine::BackupOps;
use crate::model::TenantId;
use crate::Result;

/// Bounds on the rotating local history.
#[derive(Debug, Clone, Copy)]
pub struct RetentionPolicy {
    /// Newest entries kept after each rotation
    pub max_slots: usize,
    /// Age beyond which entries are pruned on maintenance
    pub max_age: ChronoDuration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_slots: 3,
            max_age: ChronoDuration::days(7),
        }
    }
}

impl RetentionPolicy {
    /// Evict entries beyond the `max_slots` newest. Returns the number
    /// evicted.
    pub fn rotate<O>(&self, ops: &O, tenant: &TenantId) -> Result<usize>
    where
        O: BackupOps + ?Sized,
    {
        let entries = ops.list_backups(tenant)?;
        let mut evicted = 0;
        for entry in entries.iter().skip(self.max_slots) {
            if ops.delete_backup(&entry.id, tenant)? {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(tenant = %tenant, evicted, kept = self.max_slots, "rotated local archive");
        }
        Ok(evicted)
    }

    /// Evict entries older than `max_age` regardless of count. Returns the
    /// number evicted.
    pub fn prune_expired<O>(&self, ops: &O, tenant: &TenantId) -> Result<usize>
    where
        O: BackupOps + ?Sized,
    {
        let cutoff = Utc::now() - self.max_age;
        let entries = ops.list_backups(tenant)?;
        let mut evicted = 0;
        for entry in entries.iter().filter(|e| e.created_at < cutoff) {
            if ops.delete_backup(&entry.id, tenant)? {
                evicted += 1;
            }
        }
        if evicted > 0 {
            debug!(tenant = %tenant, evicted, "pruned expired archive entries");
        }
        Ok(evicted)
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    /// Interval between scheduled snapshots
    pub interval: Duration,
    pub policy: RetentionPolicy,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30 * 60),
            policy: RetentionPolicy::default(),
        }
    }
}

/// One snapshot-and-rotate cycle, shared by the timer tick, the teardown
/// trigger and manual requests.
fn run_cycle<O>(ops: &O, tenant: &TenantId, policy: &RetentionPolicy) -> Result<ArchiveEntry>
where
    O: BackupOps + ?Sized,
{
    let entry = ops.create_backup(tenant)?;
    policy.rotate(ops, tenant)?;
    Ok(entry)
}

/// Starts the repeating snapshot timer for one tenant.
pub struct RetentionScheduler;

impl RetentionScheduler {
    /// Spawn the timer task. Must be called from within a tokio runtime.
    ///
    /// Each tick captures a snapshot and rotates the archive; a failed tick
    /// is logged at `warn` and absorbed, to be retried at the next tick.
    pub fn start<O>(ops: Arc<O>, tenant: TenantId, config: SchedulerConfig) -> SchedulerHandle
    where
        O: BackupOps + 'static,
    {
        let tick_ops = Arc::clone(&ops);
        let tick_tenant = tenant.clone();
        let policy = config.policy;

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(config.interval);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately; the first snapshot
            // belongs one full interval out.
            timer.tick().await;
            loop {
                timer.tick().await;
                match run_cycle(tick_ops.as_ref(), &tick_tenant, &policy) {
                    Ok(entry) => {
                        debug!(tenant = %tick_tenant, entry_id = %entry.id, "scheduled snapshot stored")
                    }
                    Err(e) => {
                        warn!(tenant = %tick_tenant, error = %e, "scheduled snapshot failed; retrying at next tick")
                    }
                }
            }
        });

        let flush_ops = ops;
        SchedulerHandle {
            task,
            flush: Box::new(move || run_cycle(flush_ops.as_ref(), &tenant, &policy)),
        }
    }
}

/// Owned handle on the running timer task.
///
/// Dropping the handle cancels the task; there is no other way to stop it.
pub struct SchedulerHandle {
    task: JoinHandle<()>,
    flush: Box<dyn Fn() -> Result<ArchiveEntry> + Send + Sync>,
}

impl SchedulerHandle {
    /// The session-teardown trigger: capture one snapshot and rotate, now.
    /// Unlike a timer tick, failures are surfaced to the caller.
    pub fn flush(&self) -> Result<ArchiveEntry> {
        (self.flush)()
    }

    /// Whether the timer task is still alive.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the timer task.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{local_engine, LocalBackupEngine};
    use crate::model::OwnerProfile;
    use crate::records::MemoryRecordStore;

    fn engine(tenant: &str) -> LocalBackupEngine {
        let records = MemoryRecordStore::new();
        records.register_owner(OwnerProfile {
            id: TenantId::new(tenant),
            email: format!("{tenant}@example.org"),
        });
        local_engine(records)
    }

    #[test]
    fn test_rotation_keeps_newest_three() {
        let engine = engine("t1");
        let tenant = TenantId::new("t1");
        let policy = RetentionPolicy::default();

        let mut ids = Vec::new();
        for _ in 0..5 {
            ids.push(engine.create_backup(&tenant).unwrap().id);
            policy.rotate(&engine, &tenant).unwrap();
        }

        let remaining = engine.list_backups(&tenant).unwrap();
        assert_eq!(remaining.len(), 3);
        let remaining_ids: Vec<&String> = remaining.iter().map(|e| &e.id).collect();
        // The three newest survive; the two oldest are gone
        assert!(remaining_ids.contains(&&ids[4]));
        assert!(remaining_ids.contains(&&ids[3]));
        assert!(remaining_ids.contains(&&ids[2]));
        assert!(!remaining_ids.contains(&&ids[0]));
        assert!(!remaining_ids.contains(&&ids[1]));
    }

    #[test]
    fn test_prune_expired_ignores_count() {
        let engine = engine("t1");
        let tenant = TenantId::new("t1");

        engine.create_backup(&tenant).unwrap();
        let policy = RetentionPolicy {
            max_slots: 3,
            // Everything is already "too old"
            max_age: ChronoDuration::zero(),
        };

        let evicted = policy.prune_expired(&engine, &tenant).unwrap();
        assert_eq!(evicted, 1);
        assert!(engine.list_backups(&tenant).unwrap().is_empty());
    }

    #[test]
    fn test_prune_keeps_recent_entries() {
        let engine = engine("t1");
        let tenant = TenantId::new("t1");
        engine.create_backup(&tenant).unwrap();

        let evicted = RetentionPolicy::default()
            .prune_expired(&engine, &tenant)
            .unwrap();
        assert_eq!(evicted, 0);
        assert_eq!(engine.list_backups(&tenant).unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_scheduler_ticks_and_rotates() {
        let engine = Arc::new(engine("t1"));
        let tenant = TenantId::new("t1");
        let config = SchedulerConfig::default();

        let handle = RetentionScheduler::start(Arc::clone(&engine), tenant.clone(), config);

        // Let the task register its timer before the clock moves
        tokio::task::yield_now().await;

        for _ in 0..4 {
            tokio::time::advance(config.interval).await;
            // Let the timer task run its cycle
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
        }

        let entries = engine.list_backups(&tenant).unwrap();
        assert_eq!(entries.len(), 3);

        handle.stop();
    }

    #[tokio::test]
    async fn test_flush_snapshots_immediately() {
        let engine = Arc::new(engine("t1"));
        let tenant = TenantId::new("t1");

        let handle =
            RetentionScheduler::start(Arc::clone(&engine), tenant.clone(), SchedulerConfig::default());

        let entry = handle.flush().unwrap();
        assert_eq!(entry.tenant_id, tenant);
        assert_eq!(engine.list_backups(&tenant).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stop_cancels_the_task() {
        let engine = Arc::new(engine("t1"));
        let handle = RetentionScheduler::start(
            Arc::clone(&engine),
            TenantId::new("t1"),
            SchedulerConfig::default(),
        );

        assert!(handle.is_running());
        handle.stop();
        tokio::task::yield_now().await;
        // No further snapshots can be produced once the handle is gone
        assert!(engine.list_backups(&TenantId::new("t1")).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_tick_is_absorbed_and_retried() {
        // No owner registered: every tick fails with OwnerNotFound
        let engine = Arc::new(local_engine(MemoryRecordStore::new()));
        let tenant = TenantId::new("ghost");
        let config = SchedulerConfig::default();

        let handle = RetentionScheduler::start(Arc::clone(&engine), tenant.clone(), config);

        tokio::task::yield_now().await;
        tokio::time::advance(config.interval).await;
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }

        // Still alive and still trying
        assert!(handle.is_running());
        assert!(engine.list_backups(&tenant).unwrap().is_empty());
        handle.stop();
    }
}
