//! Keep-awake scheduler.
//!
//! One timer per sub-device. When a timer fires it posts a BACKGROUND
//! `KeepAwakeTick`, so the tick only runs once the user has gone quiet.

use crate::error::Error;
use crate::jitter::{jittered, JitterSource};
use crate::queue::{ActionQueue, Command, SubDevice};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ScheduledTimer {
    pub interval_ms: u32,
    pub jitter_ms: u32,
    pub next_fire_ms: u64,
    pub enabled: bool,
}

impl ScheduledTimer {
    fn arm(&mut self, now_ms: u64, jitter: &mut impl JitterSource) {
        let wait = jittered(self.interval_ms, self.jitter_ms, 0, jitter);
        self.next_fire_ms = now_ms.saturating_add(u64::from(wait));
    }

    fn is_due(&self, now_ms: u64) -> bool {
        self.enabled && now_ms >= self.next_fire_ms
    }
}

#[derive(Debug, Default)]
pub struct KeepAwakeScheduler {
    mouse: ScheduledTimer,
    keyboard: ScheduledTimer,
}

impl KeepAwakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn timer(&self, device: SubDevice) -> Option<&ScheduledTimer> {
        match device {
            SubDevice::Mouse => Some(&self.mouse),
            SubDevice::Keyboard => Some(&self.keyboard),
            SubDevice::Telephony => None,
        }
    }

    fn timer_mut(&mut self, device: SubDevice) -> Option<&mut ScheduledTimer> {
        match device {
            SubDevice::Mouse => Some(&mut self.mouse),
            SubDevice::Keyboard => Some(&mut self.keyboard),
            SubDevice::Telephony => None,
        }
    }

    /// Enable the timer for `device`; the first tick comes one jittered
    /// interval from `now_ms`. The telephony sub-device has no timer.
    pub fn start(
        &mut self,
        device: SubDevice,
        interval_ms: u32,
        jitter_ms: u32,
        now_ms: u64,
        jitter: &mut impl JitterSource,
    ) {
        if let Some(timer) = self.timer_mut(device) {
            timer.interval_ms = interval_ms;
            timer.jitter_ms = jitter_ms;
            timer.enabled = true;
            timer.arm(now_ms, jitter);
            debug!("keep-awake started, interval {=u32} ms", interval_ms);
        }
    }

    pub fn stop(&mut self, device: SubDevice) {
        if let Some(timer) = self.timer_mut(device) {
            timer.enabled = false;
        }
    }

    pub fn is_enabled(&self, device: SubDevice) -> bool {
        self.timer(device).is_some_and(|t| t.enabled)
    }

    pub fn next_fire_ms(&self, device: SubDevice) -> Option<u64> {
        self.timer(device)
            .filter(|t| t.enabled)
            .map(|t| t.next_fire_ms)
    }

    /// Fire due timers. A tick is only queued if none is already waiting
    /// for that device. Returns how many ticks were queued.
    pub fn poll(
        &mut self,
        now_ms: u64,
        jitter: &mut impl JitterSource,
        queue: &mut ActionQueue,
    ) -> usize {
        let mut queued = 0;
        for device in [SubDevice::Mouse, SubDevice::Keyboard] {
            let Some(timer) = self.timer_mut(device) else {
                continue;
            };
            if !timer.is_due(now_ms) {
                continue;
            }
            timer.arm(now_ms, jitter);
            if queue.has_background_for(device) {
                trace!("keep-awake tick already queued");
                continue;
            }
            match queue.push(Command::KeepAwakeTick(device)) {
                Ok(()) => queued += 1,
                Err(Error::QueueFull) => trace!("background queue full, skipping tick"),
                Err(_) => {}
            }
        }
        queued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jitter::{NoJitter, RngJitter};
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn fires_after_interval_and_rearms() {
        let mut sched = KeepAwakeScheduler::new();
        let mut queue = ActionQueue::new();
        sched.start(SubDevice::Mouse, 1000, 0, 0, &mut NoJitter);

        assert_eq!(sched.poll(999, &mut NoJitter, &mut queue), 0);
        assert_eq!(sched.poll(1000, &mut NoJitter, &mut queue), 1);
        assert_eq!(
            queue.front_background(),
            Some(&Command::KeepAwakeTick(SubDevice::Mouse))
        );
        assert_eq!(sched.next_fire_ms(SubDevice::Mouse), Some(2000));
    }

    #[test]
    fn does_not_stack_ticks() {
        let mut sched = KeepAwakeScheduler::new();
        let mut queue = ActionQueue::new();
        sched.start(SubDevice::Keyboard, 10, 0, 0, &mut NoJitter);
        sched.poll(10, &mut NoJitter, &mut queue);
        sched.poll(20, &mut NoJitter, &mut queue);
        sched.poll(30, &mut NoJitter, &mut queue);
        assert_eq!(queue.background_len(), 1);
    }

    #[test]
    fn stopped_timer_never_fires() {
        let mut sched = KeepAwakeScheduler::new();
        let mut queue = ActionQueue::new();
        sched.start(SubDevice::Mouse, 10, 0, 0, &mut NoJitter);
        sched.stop(SubDevice::Mouse);
        assert!(!sched.is_enabled(SubDevice::Mouse));
        assert_eq!(sched.poll(1_000, &mut NoJitter, &mut queue), 0);
    }

    #[test]
    fn jitter_can_shrink_interval_to_zero_but_not_below() {
        let mut sched = KeepAwakeScheduler::new();
        let mut rng = RngJitter(SmallRng::seed_from_u64(5));
        for _ in 0..200 {
            sched.start(SubDevice::Mouse, 10, 50, 100, &mut rng);
            let next = sched.next_fire_ms(SubDevice::Mouse).unwrap();
            assert!((100..=160).contains(&next));
        }
    }

    #[test]
    fn telephony_has_no_timer() {
        let mut sched = KeepAwakeScheduler::new();
        sched.start(SubDevice::Telephony, 10, 0, 0, &mut NoJitter);
        assert!(!sched.is_enabled(SubDevice::Telephony));
    }
}
