//! Transport gate: the single owner of the shared interrupt IN endpoint.
//!
//! Reports from every sub-device funnel through one FIFO. At most one
//! transfer is in flight; the next one starts when the link signals
//! completion. Nothing here blocks.

use heapless::{Deque, Vec};

use crate::config::{MAX_REPORT_LEN, TRANSPORT_QUEUE_CAPACITY};
use crate::error::{LinkError, TransportError};
use crate::hid::HidReport;

/// The physical report-send primitive.
///
/// `start_write` begins a transfer and returns immediately; the owner calls
/// [`TransportGate::on_transfer_complete`] once the host has taken it.
pub trait HidLink {
    fn is_connected(&self) -> bool;
    fn start_write(&mut self, packet: &[u8]) -> Result<(), LinkError>;
}

type Packet = Vec<u8, MAX_REPORT_LEN>;

pub struct TransportGate<L> {
    link: L,
    pending: Deque<Packet, TRANSPORT_QUEUE_CAPACITY>,
    in_flight: bool,
    busy_attempts: u8,
    busy_retry_limit: u8,
}

impl<L: HidLink> TransportGate<L> {
    pub fn new(link: L, busy_retry_limit: u8) -> Self {
        Self {
            link,
            pending: Deque::new(),
            in_flight: false,
            busy_attempts: 0,
            busy_retry_limit,
        }
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// Free slots in the pending FIFO.
    pub fn room(&self) -> usize {
        self.pending.capacity() - self.pending.len()
    }

    /// Reports waiting behind the in-flight transfer.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Queue a report. Never blocks.
    pub fn send(&mut self, report: &HidReport) -> Result<(), TransportError> {
        if !self.link.is_connected() {
            self.flush();
            return Err(TransportError::NotConnected);
        }
        self.pending
            .push_back(report.to_packet())
            .map_err(|_| TransportError::Busy)?;
        trace!("queued report id {=u8}", report.report_id());
        if !self.in_flight {
            // A busy link here is retried from `poll`.
            let _ = self.start_next();
        }
        Ok(())
    }

    /// The in-flight transfer finished; start the next one if any.
    pub fn on_transfer_complete(&mut self) -> Result<(), TransportError> {
        self.in_flight = false;
        self.start_next()
    }

    /// Retry a head report that could not start earlier.
    pub fn poll(&mut self) -> Result<(), TransportError> {
        if self.in_flight {
            return Ok(());
        }
        self.start_next()
    }

    /// Drop everything not yet handed to the link.
    pub fn flush(&mut self) {
        if !self.pending.is_empty() {
            warn!("dropping {=usize} pending reports", self.pending.len());
        }
        self.pending.clear();
        self.in_flight = false;
        self.busy_attempts = 0;
    }

    fn start_next(&mut self) -> Result<(), TransportError> {
        let Some(packet) = self.pending.front() else {
            return Ok(());
        };
        match self.link.start_write(packet) {
            Ok(()) => {
                self.pending.pop_front();
                self.in_flight = true;
                self.busy_attempts = 0;
                Ok(())
            }
            Err(LinkError::Busy) => {
                self.busy_attempts = self.busy_attempts.saturating_add(1);
                if self.busy_attempts > self.busy_retry_limit {
                    warn!("link busy past retry limit, dropping report");
                    self.pending.pop_front();
                    self.busy_attempts = 0;
                    return Err(TransportError::Busy);
                }
                Ok(())
            }
            Err(LinkError::NotConnected) => {
                self.flush();
                Err(TransportError::NotConnected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hid::keyboard::KeyboardReport;
    use crate::hid::mouse::MouseReport;

    #[derive(Default)]
    struct FakeLink {
        connected: bool,
        busy: bool,
        written: std::vec::Vec<std::vec::Vec<u8>>,
    }

    impl HidLink for FakeLink {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn start_write(&mut self, packet: &[u8]) -> Result<(), LinkError> {
            if !self.connected {
                return Err(LinkError::NotConnected);
            }
            if self.busy {
                return Err(LinkError::Busy);
            }
            self.written.push(packet.to_vec());
            Ok(())
        }
    }

    fn connected() -> FakeLink {
        FakeLink {
            connected: true,
            ..Default::default()
        }
    }

    fn mouse(x: i8) -> HidReport {
        HidReport::Mouse(MouseReport {
            x,
            ..MouseReport::empty()
        })
    }

    #[test]
    fn one_transfer_in_flight() {
        let mut gate = TransportGate::new(connected(), 3);
        gate.send(&mouse(1)).unwrap();
        gate.send(&mouse(2)).unwrap();
        assert_eq!(gate.link().written.len(), 1);
        assert_eq!(gate.pending(), 1);

        gate.on_transfer_complete().unwrap();
        assert_eq!(gate.link().written.len(), 2);
        assert_eq!(gate.link().written[1], [2, 0, 2, 0, 0, 0]);
    }

    #[test]
    fn fifo_order_across_sub_devices() {
        let mut gate = TransportGate::new(connected(), 3);
        gate.send(&HidReport::Keyboard(KeyboardReport::empty()))
            .unwrap();
        gate.send(&mouse(5)).unwrap();
        gate.on_transfer_complete().unwrap();
        let ids: std::vec::Vec<u8> = gate.link().written.iter().map(|p| p[0]).collect();
        assert_eq!(ids, [1, 2]);
    }

    #[test]
    fn disconnected_drops_and_flushes() {
        let mut gate = TransportGate::new(FakeLink::default(), 3);
        assert_eq!(gate.send(&mouse(1)), Err(TransportError::NotConnected));
        assert_eq!(gate.pending(), 0);
        assert!(gate.link().written.is_empty());
    }

    #[test]
    fn full_queue_is_busy() {
        let mut gate = TransportGate::new(connected(), 3);
        gate.send(&mouse(0)).unwrap();
        for i in 0..TRANSPORT_QUEUE_CAPACITY {
            gate.send(&mouse(i as i8)).unwrap();
        }
        assert_eq!(gate.room(), 0);
        assert_eq!(gate.send(&mouse(9)), Err(TransportError::Busy));
    }

    #[test]
    fn busy_link_retries_then_escalates() {
        let mut link = connected();
        link.busy = true;
        let mut gate = TransportGate::new(link, 2);
        // First attempt happens inside send.
        gate.send(&mouse(1)).unwrap();
        assert_eq!(gate.poll(), Ok(()));
        assert_eq!(gate.poll(), Err(TransportError::Busy));
        assert_eq!(gate.pending(), 0);
    }

    #[test]
    fn busy_link_recovers_before_limit() {
        let mut link = connected();
        link.busy = true;
        let mut gate = TransportGate::new(link, 3);
        gate.send(&mouse(1)).unwrap();
        gate.link_mut().busy = false;
        gate.poll().unwrap();
        assert!(gate.in_flight());
        assert_eq!(gate.link().written.len(), 1);
    }
}
