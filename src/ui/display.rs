//! SSD1306 OLED display wrapper.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::Text;
use hid_composite::{DeviceStatus, KeyboardLayout};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::I2CDisplayInterface;
use ssd1306::Ssd1306;

/// Type alias for the concrete display driver.
pub type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

/// Initialise the SSD1306 display and clear the screen.
pub fn init<I2C>(i2c: I2C) -> Display<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    let interface = I2CDisplayInterface::new(i2c);
    let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
        .into_buffered_graphics_mode();
    let _ = display.init();
    display.clear_buffer();
    let _ = display.flush();
    display
}

fn text_style() -> embedded_graphics::mono_font::MonoTextStyle<'static, BinaryColor> {
    MonoTextStyleBuilder::new()
        .font(&FONT_6X10)
        .text_color(BinaryColor::On)
        .build()
}

fn call_line(status: &DeviceStatus) -> &'static str {
    match (status.in_call, status.ringing, status.on_hold) {
        (true, _, true) => "Call: on hold",
        (true, _, false) => "Call: active",
        (false, true, _) => "Call: ringing",
        _ => "Call: idle",
    }
}

fn layout_name(layout: KeyboardLayout) -> &'static str {
    match layout {
        KeyboardLayout::QwertyUs => "US",
        KeyboardLayout::AzertyFr => "FR",
        KeyboardLayout::QwertzDe => "DE",
    }
}

/// Render the status screen.
pub fn draw_status<I2C>(display: &mut Display<I2C>, status: &DeviceStatus, layout: KeyboardLayout)
where
    I2C: embedded_hal::i2c::I2c,
{
    display.clear_buffer();

    let header = if status.connected { "USB: host" } else { "USB: waiting" };
    let _ = Text::new(header, Point::new(0, 10), text_style()).draw(display);
    let _ = Text::new(layout_name(layout), Point::new(110, 10), text_style()).draw(display);

    let _ = Text::new(call_line(status), Point::new(0, 24), text_style()).draw(display);

    let mute = if status.muted { "Mic: MUTED" } else { "Mic: live" };
    let _ = Text::new(mute, Point::new(0, 38), text_style()).draw(display);

    let activity = match (status.typing, status.mouse_keep_awake || status.keyboard_keep_awake) {
        (true, _) => "Typing...",
        (false, true) => "Keep-awake on",
        (false, false) => "",
    };
    let _ = Text::new(activity, Point::new(0, 52), text_style()).draw(display);

    let _ = display.flush();
}
