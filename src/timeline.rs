use std::time::Duration;

use crate::body::BodyId;

/// Work deferred to a later frame.
#[derive(Clone, Debug, PartialEq)]
pub enum Deferred {
    /// Revert a freshly spawned body from `Gathering` to `Normal`.
    EndGathering(BodyId),
    /// Remove the listed bodies, if still present.
    Despawn(Vec<BodyId>),
    /// Spawn a new batch of glyphs around the focal point.
    Gather(Vec<char>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeferredTask {
    pub due: Duration,
    pub action: Deferred,
}

/// Deferred tasks checked against the frame clock.
///
/// Tasks due at the same time run in the order they were scheduled. Tasks that
/// name a removed body are dropped with [`Timeline::forget`] instead of firing.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    tasks: Vec<DeferredTask>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Duration, action: Deferred) {
        let at = self.tasks.partition_point(|task| task.due <= due);
        self.tasks.insert(at, DeferredTask { due, action });
    }

    /// Removes and returns every task due at or before `now`.
    pub fn take_due(&mut self, now: Duration) -> Vec<Deferred> {
        let split = self.tasks.partition_point(|task| task.due <= now);
        self.tasks.drain(..split).map(|task| task.action).collect()
    }

    /// Drops anything still pending for `id`.
    pub fn forget(&mut self, id: BodyId) {
        self.tasks.retain_mut(|task| match &mut task.action {
            Deferred::EndGathering(target) => *target != id,
            Deferred::Despawn(ids) => {
                ids.retain(|&other| other != id);
                !ids.is_empty()
            }
            Deferred::Gather(_) => true,
        });
    }

    /// Drops batches still waiting to spawn, so only the latest request lands.
    pub fn cancel_gathers(&mut self) {
        self.tasks.retain(|task| !matches!(task.action, Deferred::Gather(_)));
    }

    pub fn pending(&self) -> &[DeferredTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn tasks_come_out_in_due_then_insertion_order() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(300), Deferred::EndGathering(BodyId(3)));
        timeline.schedule(ms(100), Deferred::EndGathering(BodyId(1)));
        timeline.schedule(ms(300), Deferred::Gather(vec!['あ']));
        timeline.schedule(ms(200), Deferred::EndGathering(BodyId(2)));

        assert!(timeline.take_due(ms(50)).is_empty());
        assert_eq!(timeline.take_due(ms(200)), vec![
            Deferred::EndGathering(BodyId(1)),
            Deferred::EndGathering(BodyId(2)),
        ]);
        assert_eq!(timeline.take_due(ms(300)), vec![
            Deferred::EndGathering(BodyId(3)),
            Deferred::Gather(vec!['あ']),
        ]);
        assert!(timeline.is_empty());
    }

    #[test]
    fn forgetting_a_body_drops_its_tasks() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(100), Deferred::EndGathering(BodyId(1)));
        timeline.schedule(ms(100), Deferred::EndGathering(BodyId(2)));
        timeline.schedule(ms(200), Deferred::Despawn(vec![BodyId(1)]));
        timeline.schedule(ms(200), Deferred::Despawn(vec![BodyId(1), BodyId(2)]));

        timeline.forget(BodyId(1));
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.take_due(ms(1000)), vec![
            Deferred::EndGathering(BodyId(2)),
            Deferred::Despawn(vec![BodyId(2)]),
        ]);
    }

    #[test]
    fn only_the_latest_gather_survives() {
        let mut timeline = Timeline::new();
        timeline.schedule(ms(100), Deferred::Gather(vec!['あ']));
        timeline.schedule(ms(100), Deferred::Despawn(vec![BodyId(1)]));
        timeline.cancel_gathers();
        timeline.schedule(ms(150), Deferred::Gather(vec!['い']));

        assert_eq!(timeline.take_due(ms(200)), vec![
            Deferred::Despawn(vec![BodyId(1)]),
            Deferred::Gather(vec!['い']),
        ]);
    }
}
