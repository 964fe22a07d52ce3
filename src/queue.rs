//! Commands and the two-class action queue.
//!
//! REALTIME commands come from user triggers and are served in strict
//! arrival order. BACKGROUND commands (keep-awake ticks) only run when the
//! realtime class has gone quiet; see [`crate::dispatcher`].

use heapless::Deque;

use crate::config::{BACKGROUND_QUEUE_CAPACITY, REALTIME_QUEUE_CAPACITY};
use crate::error::{Error, Result};
use crate::hid::mouse::MouseButton;
use crate::layout::KeyStroke;
use crate::typing::TypingSequence;

/// Which collection a command drives. Consumer control rides with the
/// telephony sub-device since both only carry mute pulses here.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SubDevice {
    Keyboard,
    Mouse,
    Telephony,
}

impl SubDevice {
    pub(crate) const fn index(self) -> usize {
        match self {
            SubDevice::Keyboard => 0,
            SubDevice::Mouse => 1,
            SubDevice::Telephony => 2,
        }
    }
}

pub(crate) const SUB_DEVICE_COUNT: usize = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    Realtime,
    Background,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ButtonAction {
    Press,
    Release,
    /// Press, hold for `CLICK_HOLD_MS`, release.
    Click,
}

/// Which usage page carries the mute pulse.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MutePath {
    /// Telephony page 0x0B, Phone Mute 0x2F.
    #[default]
    Telephony,
    /// Consumer page 0x0C, Mute 0xE2.
    Consumer,
    /// Both pages in the same pulse.
    Both,
    /// Ctrl+Shift+M on the keyboard, for apps that ignore both pages.
    Shortcut,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    MouseMove { dx: i8, dy: i8 },
    MouseScroll { wheel: i8, pan: i8 },
    MouseButton(MouseButton, ButtonAction),
    MouseReleaseAll,
    KeyPress(KeyStroke),
    KeyRelease(KeyStroke),
    KeyTap(KeyStroke),
    KeyReleaseAll,
    TypeText(TypingSequence),
    Mute(MutePath),
    Unmute(MutePath),
    ToggleMute(MutePath),
    HookSwitch,
    AnswerCall,
    HangUp,
    IncomingCall,
    KeepAwakeTick(SubDevice),
}

impl Command {
    pub fn sub_device(&self) -> SubDevice {
        match self {
            Command::MouseMove { .. }
            | Command::MouseScroll { .. }
            | Command::MouseButton(..)
            | Command::MouseReleaseAll => SubDevice::Mouse,
            Command::KeyPress(_)
            | Command::KeyRelease(_)
            | Command::KeyTap(_)
            | Command::KeyReleaseAll
            | Command::TypeText(_) => SubDevice::Keyboard,
            Command::Mute(path) | Command::Unmute(path) | Command::ToggleMute(path) => {
                match path {
                    MutePath::Shortcut => SubDevice::Keyboard,
                    _ => SubDevice::Telephony,
                }
            }
            Command::HookSwitch
            | Command::AnswerCall
            | Command::HangUp
            | Command::IncomingCall => SubDevice::Telephony,
            Command::KeepAwakeTick(device) => *device,
        }
    }

    pub fn is_release_all(&self) -> bool {
        matches!(self, Command::KeyReleaseAll | Command::MouseReleaseAll)
    }

    pub fn priority(&self) -> Priority {
        match self {
            Command::KeepAwakeTick(_) => Priority::Background,
            _ => Priority::Realtime,
        }
    }
}

/// Fixed-capacity FIFO per priority class.
#[derive(Default)]
pub struct ActionQueue {
    realtime: Deque<Command, REALTIME_QUEUE_CAPACITY>,
    background: Deque<Command, BACKGROUND_QUEUE_CAPACITY>,
    realtime_arrived: bool,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, command: Command) -> Result<()> {
        match command.priority() {
            Priority::Realtime => {
                self.realtime
                    .push_back(command)
                    .map_err(|_| Error::QueueFull)?;
                self.realtime_arrived = true;
            }
            Priority::Background => {
                self.background
                    .push_back(command)
                    .map_err(|_| Error::QueueFull)?;
            }
        }
        Ok(())
    }

    /// Whether a realtime command arrived since the last call; clears the
    /// flag.
    pub fn take_realtime_arrived(&mut self) -> bool {
        core::mem::replace(&mut self.realtime_arrived, false)
    }

    pub fn front_realtime(&self) -> Option<&Command> {
        self.realtime.front()
    }

    pub fn pop_realtime(&mut self) -> Option<Command> {
        self.realtime.pop_front()
    }

    pub fn front_background(&self) -> Option<&Command> {
        self.background.front()
    }

    pub fn pop_background(&mut self) -> Option<Command> {
        self.background.pop_front()
    }

    pub fn realtime_len(&self) -> usize {
        self.realtime.len()
    }

    pub fn background_len(&self) -> usize {
        self.background.len()
    }

    pub fn has_realtime_for(&self, device: SubDevice) -> bool {
        self.realtime.iter().any(|c| c.sub_device() == device)
    }

    pub fn has_background_for(&self, device: SubDevice) -> bool {
        self.background.iter().any(|c| c.sub_device() == device)
    }

    /// Drop queued background commands targeting `device`, keeping the
    /// order of the rest. Returns how many were dropped.
    pub fn discard_background_for(&mut self, device: SubDevice) -> usize {
        let mut dropped = 0;
        for _ in 0..self.background.len() {
            let Some(command) = self.background.pop_front() else {
                break;
            };
            if command.sub_device() == device {
                dropped += 1;
            } else {
                // Re-queue into the slot just freed.
                let _ = self.background.push_back(command);
            }
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.realtime.clear();
        self.background.clear();
        self.realtime_arrived = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::{usage, ModifierMask};

    fn tap() -> Command {
        Command::KeyTap(KeyStroke::new(usage::A, ModifierMask::NONE))
    }

    #[test]
    fn commands_route_to_sub_devices() {
        assert_eq!(tap().sub_device(), SubDevice::Keyboard);
        assert_eq!(
            Command::MouseMove { dx: 1, dy: 0 }.sub_device(),
            SubDevice::Mouse
        );
        assert_eq!(
            Command::Mute(MutePath::Consumer).sub_device(),
            SubDevice::Telephony
        );
        assert_eq!(
            Command::ToggleMute(MutePath::Shortcut).sub_device(),
            SubDevice::Keyboard
        );
        assert_eq!(
            Command::KeepAwakeTick(SubDevice::Mouse).priority(),
            Priority::Background
        );
        assert_eq!(Command::HookSwitch.priority(), Priority::Realtime);
        assert!(Command::MouseReleaseAll.is_release_all());
        assert!(!tap().is_release_all());
    }

    #[test]
    fn realtime_lookup_by_device() {
        let mut queue = ActionQueue::new();
        queue.push(Command::MouseMove { dx: 1, dy: 1 }).unwrap();
        queue.push(Command::KeepAwakeTick(SubDevice::Keyboard)).unwrap();
        assert!(queue.has_realtime_for(SubDevice::Mouse));
        assert!(!queue.has_realtime_for(SubDevice::Keyboard));
    }

    #[test]
    fn realtime_queue_is_fifo_and_bounded() {
        let mut queue = ActionQueue::new();
        for _ in 0..REALTIME_QUEUE_CAPACITY {
            queue.push(tap()).unwrap();
        }
        assert_eq!(queue.push(Command::HookSwitch), Err(Error::QueueFull));
        assert_eq!(queue.pop_realtime(), Some(tap()));
        queue.push(Command::HookSwitch).unwrap();
        assert_eq!(queue.realtime_len(), REALTIME_QUEUE_CAPACITY);
    }

    #[test]
    fn realtime_arrival_flag_is_taken_once() {
        let mut queue = ActionQueue::new();
        queue.push(Command::KeepAwakeTick(SubDevice::Mouse)).unwrap();
        assert!(!queue.take_realtime_arrived());
        queue.push(tap()).unwrap();
        assert!(queue.take_realtime_arrived());
        assert!(!queue.take_realtime_arrived());
    }

    #[test]
    fn discard_background_keeps_other_devices() {
        let mut queue = ActionQueue::new();
        queue.push(Command::KeepAwakeTick(SubDevice::Keyboard)).unwrap();
        queue.push(Command::KeepAwakeTick(SubDevice::Mouse)).unwrap();
        assert_eq!(queue.discard_background_for(SubDevice::Keyboard), 1);
        assert!(!queue.has_background_for(SubDevice::Keyboard));
        assert_eq!(
            queue.pop_background(),
            Some(Command::KeepAwakeTick(SubDevice::Mouse))
        );
    }
}
