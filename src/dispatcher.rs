//! Action dispatcher.
//!
//! Runs once per tick. Each sub-device has at most one activity, a short
//! script of timed steps (the release half of a tap, the next key of a
//! typed string, ...). A tick first advances due activities, then admits
//! REALTIME commands in order, then BACKGROUND commands if the realtime
//! side has been quiet since the previous tick.
//!
//! Typing and keep-awake activities yield to any new realtime command for
//! the same sub-device: they are cancelled and their outstanding release
//! is sent first. Taps, clicks and mute pulses always run to completion;
//! the next command waits at the head of the queue until they finish.

use heapless::Vec;

use crate::config::{
    DeviceConfig, KeepAwakeKey, CLICK_HOLD_MS, KEEP_AWAKE_STEP_MS, KEY_TAP_HOLD_MS,
    MAX_FAILURES_PER_TICK, TELEPHONY_PULSE_MS,
};
use crate::encoder::{KeyEvent, ReportEncoder};
use crate::error::{Error, Result};
use crate::hid::consumer::ConsumerUsage;
use crate::hid::keyboard::ModifierMask;
use crate::hid::mouse::MouseButton;
use crate::hid::telephony::{HostLeds, TelephonyUsage};
use crate::jitter::JitterSource;
use crate::layout::{translate_char, KeyStroke, KeyboardLayout};
use crate::queue::{ActionQueue, ButtonAction, Command, MutePath, SubDevice, SUB_DEVICE_COUNT};
use crate::telephony::{HostSignal, TelephonyChange, TelephonyMachine, TelephonyState};
use crate::transport::{HidLink, TransportGate};
use crate::typing::TypingSequence;

/// A command that failed during a tick. `device` is `None` for transport
/// drops that cannot be tied to a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Failure {
    pub device: Option<SubDevice>,
    pub error: Error,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub reports_sent: usize,
    pub failures: Vec<Failure, MAX_FAILURES_PER_TICK>,
}

impl TickOutcome {
    fn fail(&mut self, device: Option<SubDevice>, error: Error) {
        warn!("command failed: {}", error);
        // Only the first few failures of a tick are kept.
        let _ = self.failures.push(Failure { device, error });
    }
}

/// What kind of script is running on a sub-device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActivityKind {
    Typing,
    KeepAwake,
    KeyTap,
    Click,
    MutePulse,
}

impl ActivityKind {
    pub fn is_cancellable(self) -> bool {
        matches!(self, ActivityKind::Typing | ActivityKind::KeepAwake)
    }
}

#[derive(Clone, Debug)]
enum Activity {
    Typing(TypingSequence),
    /// +1 px was sent; -1 px is pending.
    KeepAwakeMouse,
    /// Pressed; release pending.
    KeepAwakeKey(KeyStroke),
    KeyTap(KeyStroke),
    Click(MouseButton),
    MutePulse(MutePath, KeyStroke),
}

impl Activity {
    fn kind(&self) -> ActivityKind {
        match self {
            Activity::Typing(_) => ActivityKind::Typing,
            Activity::KeepAwakeMouse | Activity::KeepAwakeKey(_) => ActivityKind::KeepAwake,
            Activity::KeyTap(_) => ActivityKind::KeyTap,
            Activity::Click(_) => ActivityKind::Click,
            Activity::MutePulse(..) => ActivityKind::MutePulse,
        }
    }

    /// Reports needed to flush this activity on cancellation.
    fn flush_cost(&self) -> usize {
        match self {
            Activity::Typing(seq) => usize::from(seq.pending_release().is_some()),
            Activity::KeepAwakeMouse | Activity::KeepAwakeKey(_) => 1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    activity: Option<Activity>,
    due_ms: u64,
}

pub struct Dispatcher {
    queue: ActionQueue,
    encoder: ReportEncoder,
    telephony: TelephonyMachine,
    slots: [Slot; SUB_DEVICE_COUNT],
    config: DeviceConfig,
    head_retries: u8,
    was_connected: bool,
}

impl Dispatcher {
    pub fn new(config: DeviceConfig) -> Self {
        Self {
            queue: ActionQueue::new(),
            encoder: ReportEncoder::new(),
            telephony: TelephonyMachine::new(config.hook_debounce_ms),
            slots: Default::default(),
            config,
            head_retries: 0,
            was_connected: false,
        }
    }

    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    pub fn set_layout(&mut self, layout: KeyboardLayout) {
        self.config.layout = layout;
    }

    pub fn set_keyboard_keep_awake(&mut self, action: KeepAwakeKey) {
        self.config.keyboard_keep_awake = action;
    }

    pub fn queue(&self) -> &ActionQueue {
        &self.queue
    }

    pub fn queue_mut(&mut self) -> &mut ActionQueue {
        &mut self.queue
    }

    pub fn encoder(&self) -> &ReportEncoder {
        &self.encoder
    }

    pub fn telephony(&self) -> TelephonyState {
        self.telephony.state()
    }

    pub fn activity(&self, device: SubDevice) -> Option<ActivityKind> {
        self.slots[device.index()].activity.as_ref().map(Activity::kind)
    }

    /// No script running and nothing held down.
    pub fn is_idle(&self, device: SubDevice) -> bool {
        if self.slots[device.index()].activity.is_some() {
            return false;
        }
        match device {
            SubDevice::Keyboard => self.encoder.keyboard_idle(),
            SubDevice::Mouse => self.encoder.mouse_idle(),
            SubDevice::Telephony => true,
        }
    }

    pub fn apply_host_leds(&mut self, leds: HostLeds) -> TelephonyChange {
        self.telephony.apply_host_leds(leds)
    }

    /// Queue a command.
    ///
    /// A release-all runs at once when nothing for its sub-device is queued
    /// ahead of it and the gate has room. Otherwise it takes its place in
    /// the realtime queue, so an earlier press can never land after it.
    /// Either way the sub-device's queued background commands are dropped.
    pub fn submit<L: HidLink>(
        &mut self,
        command: Command,
        gate: &mut TransportGate<L>,
    ) -> Result<()> {
        if !command.is_release_all() {
            return self.queue.push(command);
        }
        if !gate.is_connected() {
            return Err(Error::NotConnected);
        }
        let device = command.sub_device();
        self.discard_background(device);
        if self.queue.has_realtime_for(device) || gate.room() < self.release_all_cost(device) {
            trace!("release-all queued behind earlier commands");
            return self.queue.push(command);
        }
        self.release_all(device, gate)?;
        Ok(())
    }

    fn discard_background(&mut self, device: SubDevice) {
        let dropped = self.queue.discard_background_for(device);
        if dropped > 0 {
            debug!("release-all dropped {=usize} background commands", dropped);
        }
    }

    /// Reports a release-all on `device` sends right now.
    fn release_all_cost(&self, device: SubDevice) -> usize {
        match &self.slots[device.index()].activity {
            Some(activity) if activity.kind().is_cancellable() => 1 + activity.flush_cost(),
            _ => 1,
        }
    }

    /// Stop whatever runs on `device` and send one report with nothing
    /// held. A cancellable activity is flushed first so a keep-awake nudge
    /// still nets out to zero; taps and clicks are cut short. The caller
    /// makes sure the gate has room for [`Self::release_all_cost`].
    fn release_all<L: HidLink>(
        &mut self,
        device: SubDevice,
        gate: &mut TransportGate<L>,
    ) -> Result<usize> {
        let cancellable = self
            .activity(device)
            .is_some_and(ActivityKind::is_cancellable);
        let flushed = if cancellable { self.cancel(device, gate)? } else { 0 };
        self.slots[device.index()].activity = None;
        self.discard_background(device);
        let report = match device {
            SubDevice::Keyboard => self.encoder.release_all_keys(),
            _ => self.encoder.release_all_buttons(),
        };
        gate.send(&report)?;
        Ok(flushed + 1)
    }

    pub fn tick<L: HidLink, J: JitterSource>(
        &mut self,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();
        let realtime_arrived = self.queue.take_realtime_arrived();
        let connected = gate.is_connected();

        if connected {
            if let Err(e) = gate.poll() {
                outcome.fail(None, e.into());
            }
        } else if self.was_connected {
            self.abort_all();
            gate.flush();
        }
        self.was_connected = connected;

        for device in [SubDevice::Keyboard, SubDevice::Mouse, SubDevice::Telephony] {
            self.advance_if_due(device, now_ms, gate, jitter, &mut outcome);
        }

        self.admit_realtime(now_ms, gate, jitter, &mut outcome);

        if self.queue.realtime_len() == 0 && !realtime_arrived {
            self.admit_background(now_ms, gate, jitter, &mut outcome);
        }

        outcome
    }

    /// Drop every activity and held key or button.
    fn abort_all(&mut self) {
        warn!("host disconnected, aborting activities");
        for slot in self.slots.iter_mut() {
            slot.activity = None;
        }
        self.encoder.release_all_keys();
        self.encoder.release_all_buttons();
        self.encoder.apply_telephony(TelephonyUsage::PhoneMute, false);
        self.encoder.apply_consumer(ConsumerUsage::Mute, false);
    }

    fn advance_if_due<L: HidLink, J: JitterSource>(
        &mut self,
        device: SubDevice,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
        outcome: &mut TickOutcome,
    ) {
        let slot = &self.slots[device.index()];
        if slot.activity.is_none() || now_ms < slot.due_ms {
            return;
        }
        if gate.room() < 2 {
            trace!("gate full, activity step deferred");
            return;
        }
        match self.step(device, now_ms, gate, jitter) {
            Ok(sent) => outcome.reports_sent += sent,
            Err(e) => {
                self.slots[device.index()].activity = None;
                outcome.fail(Some(device), e);
            }
        }
    }

    /// Run the next step of the device's activity.
    fn step<L: HidLink, J: JitterSource>(
        &mut self,
        device: SubDevice,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
    ) -> Result<usize> {
        let index = device.index();
        let Some(activity) = self.slots[index].activity.take() else {
            return Ok(0);
        };
        match activity {
            Activity::Typing(mut seq) => {
                let Some(timed) = seq.next_event(jitter) else {
                    return Ok(0);
                };
                gate.send(&self.encoder.apply_key(timed.event))?;
                if !seq.is_finished() {
                    self.slots[index] = Slot {
                        activity: Some(Activity::Typing(seq)),
                        due_ms: now_ms + u64::from(timed.delay_ms),
                    };
                }
                Ok(1)
            }
            Activity::KeepAwakeMouse => {
                gate.send(&self.encoder.apply_mouse_delta(-1, 0, 0, 0))?;
                Ok(1)
            }
            Activity::KeepAwakeKey(stroke) | Activity::KeyTap(stroke) => {
                gate.send(&self.encoder.apply_key(KeyEvent::release(stroke)))?;
                Ok(1)
            }
            Activity::Click(button) => {
                gate.send(&self.encoder.apply_button(button, false))?;
                Ok(1)
            }
            Activity::MutePulse(path, stroke) => self.mute_edge(path, stroke, false, gate),
        }
    }

    /// Cancel a typing or keep-awake script, sending its pending release.
    fn cancel<L: HidLink>(&mut self, device: SubDevice, gate: &mut TransportGate<L>) -> Result<usize> {
        let Some(activity) = self.slots[device.index()].activity.take() else {
            return Ok(0);
        };
        debug!("cancelling {} on {}", activity.kind(), device);
        let report = match activity {
            Activity::Typing(seq) => match seq.pending_release() {
                Some(stroke) => self.encoder.apply_key(KeyEvent::release(stroke)),
                None => return Ok(0),
            },
            Activity::KeepAwakeMouse => self.encoder.apply_mouse_delta(-1, 0, 0, 0),
            Activity::KeepAwakeKey(stroke) => self.encoder.apply_key(KeyEvent::release(stroke)),
            _ => return Ok(0),
        };
        gate.send(&report)?;
        Ok(1)
    }

    fn admit_realtime<L: HidLink, J: JitterSource>(
        &mut self,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
        outcome: &mut TickOutcome,
    ) {
        while let Some(head) = self.queue.front_realtime() {
            let device = head.sub_device();

            if gate.is_connected() {
                let mut needed = report_cost(head);
                if let Some(activity) = &self.slots[device.index()].activity {
                    if activity.kind().is_cancellable() {
                        needed += activity.flush_cost();
                    } else if !head.is_release_all() {
                        break;
                    }
                }
                if gate.room() < needed {
                    self.head_retries += 1;
                    if self.head_retries <= self.config.busy_retry_limit {
                        trace!("gate full, head waits");
                        break;
                    }
                    self.head_retries = 0;
                    self.queue.pop_realtime();
                    outcome.fail(Some(device), Error::Busy);
                    continue;
                }
            }

            self.head_retries = 0;
            let Some(command) = self.queue.pop_realtime() else {
                break;
            };
            let result = match self.cancel_if_running(device, gate) {
                Ok(flushed) => self
                    .execute(command, now_ms, gate, jitter)
                    .map(|sent| sent + flushed),
                Err(e) => Err(e),
            };
            match result {
                Ok(sent) => outcome.reports_sent += sent,
                Err(e) => outcome.fail(Some(device), e),
            }
        }
    }

    fn cancel_if_running<L: HidLink>(
        &mut self,
        device: SubDevice,
        gate: &mut TransportGate<L>,
    ) -> Result<usize> {
        if !gate.is_connected() {
            return Ok(0);
        }
        self.cancel(device, gate)
    }

    /// Background commands wait for a quiet sub-device; ones that cannot
    /// run yet keep their place relative to each other.
    fn admit_background<L: HidLink, J: JitterSource>(
        &mut self,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
        outcome: &mut TickOutcome,
    ) {
        for _ in 0..self.queue.background_len() {
            let Some(command) = self.queue.pop_background() else {
                break;
            };
            let device = command.sub_device();
            let connected = gate.is_connected();
            if connected && (!self.is_idle(device) || gate.room() < report_cost(&command)) {
                // Goes back behind the others; capacity was just freed.
                let _ = self.queue.push(command);
                continue;
            }
            match self.execute(command, now_ms, gate, jitter) {
                Ok(sent) => outcome.reports_sent += sent,
                Err(e) => outcome.fail(Some(device), e),
            }
        }
    }

    fn start(&mut self, device: SubDevice, activity: Activity, due_ms: u64) {
        self.slots[device.index()] = Slot {
            activity: Some(activity),
            due_ms,
        };
    }

    /// Run an admitted command. Returns the number of reports queued.
    fn execute<L: HidLink, J: JitterSource>(
        &mut self,
        command: Command,
        now_ms: u64,
        gate: &mut TransportGate<L>,
        jitter: &mut J,
    ) -> Result<usize> {
        if !gate.is_connected() {
            return Err(Error::NotConnected);
        }
        let device = command.sub_device();
        let report = match command {
            Command::MouseMove { dx, dy } => self.encoder.apply_mouse_delta(dx, dy, 0, 0),
            Command::MouseScroll { wheel, pan } => self.encoder.apply_mouse_delta(0, 0, wheel, pan),
            Command::MouseButton(button, action) => match action {
                ButtonAction::Press => self.encoder.apply_button(button, true),
                ButtonAction::Release => self.encoder.apply_button(button, false),
                ButtonAction::Click => {
                    self.start(device, Activity::Click(button), now_ms + u64::from(CLICK_HOLD_MS));
                    self.encoder.apply_button(button, true)
                }
            },
            Command::MouseReleaseAll | Command::KeyReleaseAll => {
                return self.release_all(device, gate);
            }
            Command::KeyPress(stroke) => self.encoder.apply_key(KeyEvent::press(stroke)),
            Command::KeyRelease(stroke) => self.encoder.apply_key(KeyEvent::release(stroke)),
            Command::KeyTap(stroke) => {
                self.start(device, Activity::KeyTap(stroke), now_ms + u64::from(KEY_TAP_HOLD_MS));
                self.encoder.apply_key(KeyEvent::press(stroke))
            }
            Command::TypeText(seq) => {
                debug!("typing {=usize} bytes", seq.text().len());
                self.start(device, Activity::Typing(seq), now_ms);
                return self.step(device, now_ms, gate, jitter);
            }
            Command::Mute(path) => {
                let signal = self.telephony.mute();
                return self.signal(signal, path, device, now_ms, gate);
            }
            Command::Unmute(path) => {
                let signal = self.telephony.unmute();
                return self.signal(signal, path, device, now_ms, gate);
            }
            Command::ToggleMute(path) => {
                let signal = self.telephony.toggle_mute();
                return self.signal(signal, path, device, now_ms, gate);
            }
            Command::HookSwitch => {
                let signal = self.telephony.hook_switch(now_ms);
                return self.signal(signal, MutePath::Telephony, device, now_ms, gate);
            }
            Command::AnswerCall => {
                let signal = self.telephony.answer_call();
                return self.signal(signal, MutePath::Telephony, device, now_ms, gate);
            }
            Command::HangUp => {
                let signal = self.telephony.hang_up();
                return self.signal(signal, MutePath::Telephony, device, now_ms, gate);
            }
            Command::IncomingCall => {
                self.telephony.incoming_call();
                return Ok(0);
            }
            Command::KeepAwakeTick(SubDevice::Mouse) => {
                self.start(device, Activity::KeepAwakeMouse, now_ms + u64::from(KEEP_AWAKE_STEP_MS));
                self.encoder.apply_mouse_delta(1, 0, 0, 0)
            }
            Command::KeepAwakeTick(SubDevice::Keyboard) => {
                let stroke = match self.config.keyboard_keep_awake {
                    KeepAwakeKey::Modifier(mask) => KeyStroke::new(0, mask),
                    KeepAwakeKey::Key(stroke) => stroke,
                };
                self.start(
                    device,
                    Activity::KeepAwakeKey(stroke),
                    now_ms + u64::from(KEY_TAP_HOLD_MS),
                );
                self.encoder.apply_key(KeyEvent::press(stroke))
            }
            Command::KeepAwakeTick(SubDevice::Telephony) => return Ok(0),
        };
        gate.send(&report)?;
        Ok(1)
    }

    fn signal<L: HidLink>(
        &mut self,
        signal: HostSignal,
        path: MutePath,
        device: SubDevice,
        now_ms: u64,
        gate: &mut TransportGate<L>,
    ) -> Result<usize> {
        match signal {
            HostSignal::None => Ok(0),
            HostSignal::Hook(off_hook) => {
                gate.send(&self.encoder.apply_telephony(TelephonyUsage::HookSwitch, off_hook))?;
                Ok(1)
            }
            HostSignal::MutePulse => {
                let stroke = self.shortcut_stroke()?;
                let sent = self.mute_edge(path, stroke, true, gate)?;
                self.start(
                    device,
                    Activity::MutePulse(path, stroke),
                    now_ms + u64::from(TELEPHONY_PULSE_MS),
                );
                Ok(sent)
            }
        }
    }

    /// Ctrl+Shift+M in the active layout.
    fn shortcut_stroke(&self) -> Result<KeyStroke> {
        Ok(translate_char(self.config.layout, 'm')?
            .with_modifiers(ModifierMask::LEFT_CTRL | ModifierMask::LEFT_SHIFT))
    }

    /// Press or release the mute control on `path`.
    fn mute_edge<L: HidLink>(
        &mut self,
        path: MutePath,
        stroke: KeyStroke,
        pressed: bool,
        gate: &mut TransportGate<L>,
    ) -> Result<usize> {
        let mut sent = 0;
        if matches!(path, MutePath::Telephony | MutePath::Both) {
            gate.send(&self.encoder.apply_telephony(TelephonyUsage::PhoneMute, pressed))?;
            sent += 1;
        }
        if matches!(path, MutePath::Consumer | MutePath::Both) {
            gate.send(&self.encoder.apply_consumer(ConsumerUsage::Mute, pressed))?;
            sent += 1;
        }
        if path == MutePath::Shortcut {
            let event = if pressed {
                KeyEvent::press(stroke)
            } else {
                KeyEvent::release(stroke)
            };
            gate.send(&self.encoder.apply_key(event))?;
            sent += 1;
        }
        Ok(sent)
    }
}

/// Upper bound on the reports a command queues when admitted.
fn report_cost(command: &Command) -> usize {
    match command {
        Command::IncomingCall => 0,
        Command::Mute(MutePath::Both)
        | Command::Unmute(MutePath::Both)
        | Command::ToggleMute(MutePath::Both) => 2,
        _ => 1,
    }
}
