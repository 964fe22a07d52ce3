//! hid-composite firmware for the nRF52840.
//!
//! Task layout:
//!
//! - `usb_task`: runs the USB device state machine
//! - `writer_task` / `reader_task`: service the HID IN and OUT endpoints
//! - `button_task` (x3): debounced triggers into the device core
//! - `dispatch_task`: the 1 ms tick that drives the device core
//! - `display_task`: redraws the OLED status view
//!
//! The device core lives in a blocking mutex; only `dispatch_task` and
//! `display_task` lock it, and never across an await point.

#![no_std]
#![no_main]

mod ui;
mod usb;

use core::cell::RefCell;

use defmt::{info, unwrap, warn};
use embassy_executor::Spawner;
use embassy_nrf::gpio::{AnyPin, Pin};
use embassy_nrf::rng::Rng;
use embassy_nrf::twim::{self, Twim};
use embassy_nrf::{bind_interrupts, peripherals, rng};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Instant, Ticker};
use hid_composite::config::{
    BUTTON_KEEP_AWAKE_INTERVAL_MS, BUTTON_KEEP_AWAKE_JITTER_MS, DISPLAY_REFRESH_MS,
    TICK_PERIOD_MS,
};
use hid_composite::{CompositeDevice, DeviceConfig, MutePath, Result, RngJitter};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use {defmt_rtt as _, panic_probe as _};

use crate::ui::ButtonEvent;
use crate::usb::hid_device::{self, CompositeReader, CompositeWriter, UsbLink};

bind_interrupts!(struct Irqs {
    RNG => rng::InterruptHandler<peripherals::RNG>;
    SPIM0_SPIS0_TWIM0_TWIS0_SPI0_TWI0 => twim::InterruptHandler<peripherals::TWISPI0>;
});

type Core = CompositeDevice<UsbLink, RngJitter<SmallRng>>;
type OledDisplay = ui::display::Display<Twim<'static, peripherals::TWISPI0>>;

static CORE: Mutex<CriticalSectionRawMutex, RefCell<Option<Core>>> =
    Mutex::new(RefCell::new(None));
static BUTTONS: Channel<CriticalSectionRawMutex, ButtonEvent, 4> = Channel::new();

/// Run `f` on the device core, if it has been installed.
fn with_core<R>(f: impl FnOnce(&mut Core) -> R) -> Option<R> {
    CORE.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_nrf::init(Default::default());
    info!("hid-composite starting");

    let mut seed = [0u8; 8];
    Rng::new(p.RNG, Irqs).blocking_fill_bytes(&mut seed);
    let jitter = RngJitter(SmallRng::seed_from_u64(u64::from_le_bytes(seed)));

    let core = CompositeDevice::new(UsbLink, jitter, DeviceConfig::default());
    CORE.lock(|cell| cell.replace(Some(core)));

    let usb = hid_device::init(p.USBD);
    unwrap!(spawner.spawn(usb_task(usb.device)));
    unwrap!(spawner.spawn(writer_task(usb.writer)));
    unwrap!(spawner.spawn(reader_task(usb.reader)));

    unwrap!(spawner.spawn(button_task(p.P0_11.degrade(), ButtonEvent::Mute)));
    unwrap!(spawner.spawn(button_task(p.P0_12.degrade(), ButtonEvent::Hook)));
    unwrap!(spawner.spawn(button_task(p.P0_24.degrade(), ButtonEvent::KeepAwake)));

    let i2c = Twim::new(p.TWISPI0, Irqs, p.P0_26, p.P0_27, twim::Config::default());
    let display = ui::display::init(i2c);
    unwrap!(spawner.spawn(display_task(display)));

    unwrap!(spawner.spawn(dispatch_task()));
}

#[embassy_executor::task]
async fn usb_task(device: embassy_usb::UsbDevice<'static, hid_device::UsbDriver>) -> ! {
    hid_device::run_usb_device(device).await
}

#[embassy_executor::task]
async fn writer_task(writer: CompositeWriter) -> ! {
    hid_device::hid_writer_task(writer).await
}

#[embassy_executor::task]
async fn reader_task(reader: CompositeReader) -> ! {
    hid_device::hid_reader_task(reader).await
}

#[embassy_executor::task(pool_size = 3)]
async fn button_task(pin: AnyPin, event: ButtonEvent) -> ! {
    ui::buttons::button_task(pin, event, BUTTONS.sender()).await
}

fn handle_button(core: &mut Core, event: ButtonEvent) -> Result<()> {
    match event {
        ButtonEvent::Mute => core.toggle_mute(MutePath::Telephony),
        ButtonEvent::Hook => core.hook_switch(),
        ButtonEvent::KeepAwake => {
            if core.status().mouse_keep_awake {
                core.stop_mouse_keep_awake();
            } else {
                core.start_mouse_keep_awake(
                    BUTTON_KEEP_AWAKE_INTERVAL_MS,
                    BUTTON_KEEP_AWAKE_JITTER_MS,
                );
            }
            Ok(())
        }
    }
}

/// Drive the device core: completions and host output first, then
/// triggers, then one dispatch tick.
#[embassy_executor::task]
async fn dispatch_task() -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(TICK_PERIOD_MS));
    let buttons = BUTTONS.receiver();
    loop {
        ticker.next().await;
        let now = Instant::now().as_millis();
        with_core(|core| {
            if hid_device::write_done().try_take().is_some() {
                if let Err(e) = core.transfer_complete() {
                    warn!("transfer: {}", e);
                }
            }
            while let Ok(report) = hid_device::host_output().try_receive() {
                if let Some(change) = core.host_output_report(&report) {
                    if !change.is_empty() {
                        info!("host telephony state: {}", change.after);
                    }
                }
            }
            while let Ok(event) = buttons.try_receive() {
                if let Err(e) = handle_button(core, event) {
                    warn!("button {}: {}", event, e);
                }
            }
            let outcome = core.tick(now);
            for failure in outcome.failures.iter() {
                warn!("dropped: {}", failure);
            }
        });
    }
}

#[embassy_executor::task]
async fn display_task(mut display: OledDisplay) -> ! {
    let mut ticker = Ticker::every(Duration::from_millis(DISPLAY_REFRESH_MS));
    let mut shown = None;
    loop {
        ticker.next().await;
        let Some(snapshot) = with_core(|core| (core.status(), core.layout())) else {
            continue;
        };
        if shown != Some(snapshot) {
            ui::display::draw_status(&mut display, &snapshot.0, snapshot.1);
            shown = Some(snapshot);
        }
    }
}
