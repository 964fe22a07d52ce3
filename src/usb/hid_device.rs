//! USB HID composite interface and the link the device core writes through.
//!
//! Initialises the Embassy USB stack on the nRF52840 hardware USB
//! peripheral and exposes one HID reader/writer pair.

use core::sync::atomic::{AtomicBool, Ordering};

use defmt::{info, warn};
use embassy_nrf::usb::vbus_detect::HardwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{self, bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{
    Config as HidConfig, HidReader, HidReaderWriter, HidWriter, ReportId, RequestHandler, State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config, UsbDevice};
use hid_composite::config::{self, MAX_REPORT_LEN, REPORT_ID_TELEPHONY};
use hid_composite::hid::COMPOSITE_REPORT_DESCRIPTOR;
use hid_composite::{HidLink, LinkError};
use static_cell::StaticCell;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    CLOCK_POWER => embassy_nrf::usb::vbus_detect::InterruptHandler;
});

pub type UsbDriver = Driver<'static, peripherals::USBD, HardwareVbusDetect>;

/// Largest OUT report (report ID + LED byte), with headroom.
const OUT_REPORT_LEN: usize = 8;
/// Endpoint buffer for IN reports.
const IN_REPORT_LEN: usize = 16;

pub type CompositeReader = HidReader<'static, UsbDriver, OUT_REPORT_LEN>;
pub type CompositeWriter = HidWriter<'static, UsbDriver, IN_REPORT_LEN>;

/// One IN packet, report ID first.
pub type Packet = heapless::Vec<u8, MAX_REPORT_LEN>;
/// One OUT report as the host sent it.
pub type OutputReport = heapless::Vec<u8, OUT_REPORT_LEN>;

static HID_STATE: StaticCell<State> = StaticCell::new();
static USB_CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_MSOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
static USB_CTRL_BUF: StaticCell<[u8; 128]> = StaticCell::new();
static USB_STATE_HANDLER: StaticCell<UsbStateHandler> = StaticCell::new();
static CONTROL_OUTPUT_HANDLER: StaticCell<HostOutputHandler> = StaticCell::new();

/// Configured and not suspended.
static HOST_READY: AtomicBool = AtomicBool::new(false);
/// The packet handed to the writer task; at most one at a time.
static OUTBOX: Signal<CriticalSectionRawMutex, Packet> = Signal::new();
static WRITE_DONE: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static HOST_OUTPUT: Channel<CriticalSectionRawMutex, OutputReport, 4> = Channel::new();

/// Tracks enumeration and bus suspend.
struct UsbStateHandler {
    configured: bool,
    suspended: bool,
}

impl UsbStateHandler {
    fn publish(&self) {
        HOST_READY.store(self.configured && !self.suspended, Ordering::Release);
    }
}

impl embassy_usb::Handler for UsbStateHandler {
    fn reset(&mut self) {
        self.configured = false;
        self.publish();
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        self.configured = configured;
        self.publish();
    }

    fn suspended(&mut self, suspended: bool) {
        info!("USB suspended: {}", suspended);
        self.suspended = suspended;
        self.publish();
    }
}

/// Forwards telephony LED reports to the dispatch task. Used both for the
/// OUT endpoint and for SET_REPORT on the control pipe.
struct HostOutputHandler;

impl RequestHandler for HostOutputHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        if let ReportId::Out(REPORT_ID_TELEPHONY) = id {
            let mut report = OutputReport::new();
            if report.extend_from_slice(data).is_ok() && HOST_OUTPUT.try_send(report).is_err() {
                warn!("host output report dropped");
            }
        }
        OutResponse::Accepted
    }
}

/// The device core's view of the interrupt IN endpoint.
pub struct UsbLink;

impl HidLink for UsbLink {
    fn is_connected(&self) -> bool {
        HOST_READY.load(Ordering::Acquire)
    }

    fn start_write(&mut self, packet: &[u8]) -> Result<(), LinkError> {
        if !self.is_connected() {
            return Err(LinkError::NotConnected);
        }
        if OUTBOX.signaled() {
            return Err(LinkError::Busy);
        }
        let mut out = Packet::new();
        out.extend_from_slice(packet).map_err(|_| LinkError::Busy)?;
        OUTBOX.signal(out);
        Ok(())
    }
}

/// Signalled by the writer task after each transfer.
pub fn write_done() -> &'static Signal<CriticalSectionRawMutex, ()> {
    &WRITE_DONE
}

/// OUT reports from the host, oldest first.
pub fn host_output() -> &'static Channel<CriticalSectionRawMutex, OutputReport, 4> {
    &HOST_OUTPUT
}

/// Build result containing the USB device runner and the HID endpoints.
pub struct UsbHidDevice {
    pub device: UsbDevice<'static, UsbDriver>,
    pub reader: CompositeReader,
    pub writer: CompositeWriter,
}

/// Initialise the USB stack and create the composite HID interface.
///
/// Must be called exactly once. All static buffers are consumed here.
pub fn init(usbd: peripherals::USBD) -> UsbHidDevice {
    let driver = Driver::new(usbd, Irqs, HardwareVbusDetect::new(Irqs));

    let mut usb_config = Config::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100; // mA
    usb_config.max_packet_size_0 = 64;

    let config_desc = USB_CONFIG_DESC.init([0u8; 256]);
    let bos_desc = USB_BOS_DESC.init([0u8; 256]);
    let msos_desc = USB_MSOS_DESC.init([0u8; 256]);
    let ctrl_buf = USB_CTRL_BUF.init([0u8; 128]);

    let mut builder = Builder::new(
        driver,
        usb_config,
        config_desc,
        bos_desc,
        msos_desc,
        ctrl_buf,
    );

    let state_handler = USB_STATE_HANDLER.init(UsbStateHandler {
        configured: false,
        suspended: false,
    });
    builder.handler(state_handler);

    let hid_state = HID_STATE.init(State::new());
    let hid_config = HidConfig {
        report_descriptor: &COMPOSITE_REPORT_DESCRIPTOR,
        request_handler: Some(CONTROL_OUTPUT_HANDLER.init(HostOutputHandler)),
        poll_ms: config::USB_HID_POLL_MS,
        max_packet_size: IN_REPORT_LEN as u16,
    };
    let (reader, writer) =
        HidReaderWriter::<_, OUT_REPORT_LEN, IN_REPORT_LEN>::new(&mut builder, hid_state, hid_config)
            .split();

    let device = builder.build();

    info!(
        "USB HID composite device initialised ({=usize}-byte descriptor)",
        COMPOSITE_REPORT_DESCRIPTOR.len()
    );

    UsbHidDevice {
        device,
        reader,
        writer,
    }
}

/// Run the USB device stack - must be spawned as a dedicated Embassy task.
pub async fn run_usb_device(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    info!("USB device task started");
    device.run().await
}

/// Write each packet the core hands over, then report the transfer done.
pub async fn hid_writer_task(mut writer: CompositeWriter) -> ! {
    info!("HID writer task started");
    loop {
        let packet = OUTBOX.wait().await;
        if let Err(_e) = writer.write(&packet).await {
            warn!("USB HID write failed");
        }
        WRITE_DONE.signal(());
    }
}

/// Service the OUT endpoint.
pub async fn hid_reader_task(reader: CompositeReader) -> ! {
    info!("HID reader task started");
    let mut handler = HostOutputHandler;
    reader.run(true, &mut handler).await
}
