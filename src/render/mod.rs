//! X11 popup windows
//!
//! One override-redirect window per slot. Each window draws into a backing
//! pixmap that is also its background, so the X server repaints exposed
//! areas on its own and no expose handling is needed.

pub mod ewmh;

use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use crate::config::{Alignment, Style};
use crate::server::backend::{RenderSurface, TextLine};
use crate::server::icons::Icon;
use crate::server::popup::{Position, SlotId};
use crate::server::text;
use ewmh::Atoms;

/// Longest string a single ImageText16 request accepts
const MAX_TEXT_CHARS: usize = 255;

/// X resources backing one slot
#[derive(Debug, Clone, Copy)]
struct PopupWindow {
    window: Window,
    pixmap: Pixmap,
    gc: Gcontext,
}

/// Font metrics needed for layout
#[derive(Debug, Clone, Copy)]
struct FontInfo {
    font: Font,
    ascent: i16,
    descent: i16,
}

/// Render surface drawing popups as X11 windows
pub struct X11Popups {
    conn: Arc<RustConnection>,
    windows: Vec<PopupWindow>,
    font: FontInfo,
    depth: u8,
    byte_order: ImageOrder,
    width: u16,
    height: u16,
}

impl X11Popups {
    /// Create `style.max_windows` unmapped popup windows
    pub fn new(conn: Arc<RustConnection>, screen_num: usize, atoms: &Atoms, style: &Style) -> Result<Self> {
        let screen = conn
            .setup()
            .roots
            .get(screen_num)
            .context("Invalid screen number")?
            .clone();
        let byte_order = conn.setup().image_byte_order;
        if screen.root_depth != 24 && screen.root_depth != 32 {
            bail!("Unsupported root depth {}", screen.root_depth);
        }

        let font = open_font(&conn, &style.font, style.fontsize)?;
        let width = u16::try_from(style.width).context("Popup width out of range")?;
        let height = u16::try_from(style.height).context("Popup height out of range")?;
        let border_width = u16::try_from(style.border_width).context("Border width out of range")?;
        let opacity = (f64::from(style.opacity) * f64::from(u32::MAX)) as u32;

        let mut windows = Vec::with_capacity(style.max_windows);
        for _ in 0..style.max_windows {
            let window = conn.generate_id()?;
            let pixmap = conn.generate_id()?;
            let gc = conn.generate_id()?;

            conn.create_window(
                screen.root_depth,
                window,
                screen.root,
                style.x as i16,
                style.y as i16,
                width,
                height,
                border_width,
                WindowClass::INPUT_OUTPUT,
                0,
                &CreateWindowAux::new()
                    .background_pixel(style.background[1])
                    .border_pixel(style.border[1])
                    .override_redirect(1)
                    .event_mask(EventMask::BUTTON_PRESS),
            )?;
            conn.create_pixmap(screen.root_depth, pixmap, window, width, height)?;
            conn.create_gc(
                gc,
                pixmap,
                &CreateGCAux::new().font(font.font).graphics_exposures(0),
            )?;
            conn.change_window_attributes(window, &ChangeWindowAttributesAux::new().background_pixmap(pixmap))?;

            conn.change_property8(
                PropMode::REPLACE,
                window,
                AtomEnum::WM_NAME,
                AtomEnum::STRING,
                b"area-notify",
            )?;
            conn.change_property32(
                PropMode::REPLACE,
                window,
                atoms.net_wm_window_type,
                AtomEnum::ATOM,
                &[atoms._net_wm_window_type_notification],
            )?;
            if style.opacity < 1.0 {
                conn.change_property32(
                    PropMode::REPLACE,
                    window,
                    atoms.net_wm_window_opacity,
                    AtomEnum::CARDINAL,
                    &[opacity],
                )?;
            }

            windows.push(PopupWindow { window, pixmap, gc });
        }
        conn.flush()?;

        info!("Created {} popup windows ({}x{})", windows.len(), width, height);

        Ok(Self {
            conn,
            windows,
            font,
            depth: screen.root_depth,
            byte_order,
            width,
            height,
        })
    }

    /// Window id → slot, for routing pointer events
    pub fn window_slots(&self) -> HashMap<Window, SlotId> {
        self.windows
            .iter()
            .enumerate()
            .map(|(slot, popup)| (popup.window, slot))
            .collect()
    }

    fn popup(&self, slot: SlotId) -> Result<PopupWindow> {
        self.windows
            .get(slot)
            .copied()
            .with_context(|| format!("No popup window for slot {}", slot))
    }
}

impl RenderSurface for X11Popups {
    fn line_height(&self) -> u32 {
        (self.font.ascent + self.font.descent).max(1) as u32
    }

    fn clear(&mut self, slot: SlotId, background: u32) -> Result<()> {
        let popup = self.popup(slot)?;
        self.conn
            .change_gc(popup.gc, &ChangeGCAux::new().foreground(background))?;
        self.conn.poly_fill_rectangle(
            popup.pixmap,
            popup.gc,
            &[Rectangle {
                x: 0,
                y: 0,
                width: self.width,
                height: self.height,
            }],
        )?;
        Ok(())
    }

    fn draw_image(&mut self, slot: SlotId, icon: &Icon, background: u32, x: i32, y: i32) -> Result<()> {
        let popup = self.popup(slot)?;
        let data = blend_icon(icon, background, self.byte_order);
        self.conn.put_image(
            ImageFormat::Z_PIXMAP,
            popup.pixmap,
            popup.gc,
            icon.width as u16,
            icon.height as u16,
            x as i16,
            y as i16,
            0,
            self.depth,
            &data,
        )?;
        Ok(())
    }

    fn draw_text(&mut self, slot: SlotId, line: &TextLine<'_>) -> Result<()> {
        let popup = self.popup(slot)?;
        let plain = text::strip_markup(line.text);
        let chars = to_char2b(&plain);
        if chars.is_empty() {
            return Ok(());
        }

        let x = match line.alignment {
            Alignment::Left => line.left,
            alignment => {
                let extents = self.conn.query_text_extents(self.font.font, &chars)?.reply()?;
                aligned_x(alignment, line.left, line.right, extents.overall_width)
            }
        };

        self.conn.change_gc(
            popup.gc,
            &ChangeGCAux::new()
                .foreground(line.foreground)
                .background(line.background),
        )?;
        self.conn.image_text16(
            popup.pixmap,
            popup.gc,
            x as i16,
            (line.y + i32::from(self.font.ascent)) as i16,
            &chars,
        )?;
        Ok(())
    }

    fn set_border(&mut self, slot: SlotId, color: u32) -> Result<()> {
        let popup = self.popup(slot)?;
        self.conn.change_window_attributes(
            popup.window,
            &ChangeWindowAttributesAux::new().border_pixel(color),
        )?;
        Ok(())
    }

    fn place(&mut self, slot: SlotId, position: Position) -> Result<()> {
        let popup = self.popup(slot)?;
        self.conn.configure_window(
            popup.window,
            &ConfigureWindowAux::new()
                .x(position.x)
                .y(position.y)
                .stack_mode(StackMode::ABOVE),
        )?;
        self.conn.flush()?;
        Ok(())
    }

    fn unhide(&mut self, slot: SlotId) -> Result<()> {
        let popup = self.popup(slot)?;
        self.conn.map_window(popup.window)?;
        self.conn.configure_window(
            popup.window,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        // Repaint from the freshly drawn background pixmap
        self.conn.clear_area(false, popup.window, 0, 0, 0, 0)?;
        self.conn.flush()?;
        Ok(())
    }

    fn hide(&mut self, slot: SlotId) -> Result<()> {
        let popup = self.popup(slot)?;
        self.conn.unmap_window(popup.window)?;
        self.conn.flush()?;
        Ok(())
    }
}

impl Drop for X11Popups {
    fn drop(&mut self) {
        for popup in &self.windows {
            let _ = self.conn.free_gc(popup.gc);
            let _ = self.conn.free_pixmap(popup.pixmap);
            let _ = self.conn.destroy_window(popup.window);
        }
        let _ = self.conn.close_font(self.font.font);
        let _ = self.conn.flush();
        debug!("Destroyed popup windows");
    }
}

/// XLFD pattern for a core font family at a pixel size
fn font_pattern(family: &str, size: u16) -> String {
    format!("-*-{}-medium-r-*--{}-*-*-*-*-*-iso10646-1", family, size)
}

fn open_font(conn: &RustConnection, family: &str, size: u16) -> Result<FontInfo> {
    let font = conn.generate_id()?;
    let pattern = font_pattern(family, size);

    let opened = conn.open_font(font, pattern.as_bytes())?.check();
    if let Err(e) = opened {
        warn!("Could not open font {:?} ({}); using fixed", pattern, e);
        conn.open_font(font, b"fixed")?
            .check()
            .context("Failed to open fallback font \"fixed\"")?;
    }

    let info = conn.query_font(font)?.reply().context("Failed to query font")?;
    debug!("Font ascent {} descent {}", info.font_ascent, info.font_descent);

    Ok(FontInfo {
        font,
        ascent: info.font_ascent,
        descent: info.font_descent,
    })
}

/// Encode text for a 16-bit core font; characters outside the BMP become '?'
fn to_char2b(text: &str) -> Vec<Char2b> {
    text.chars()
        .take(MAX_TEXT_CHARS)
        .map(|c| {
            let code = u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?'));
            let [byte1, byte2] = code.to_be_bytes();
            Char2b { byte1, byte2 }
        })
        .collect()
}

/// Left edge of a line of `width` pixels aligned within `left..right`
fn aligned_x(alignment: Alignment, left: i32, right: i32, width: i32) -> i32 {
    match alignment {
        Alignment::Left => left,
        Alignment::Center => left + (right - left - width) / 2,
        Alignment::Right => right - width,
    }
    .max(left)
}

/// Composite an RGBA icon over a solid background as 32-bit ZPixmap data
fn blend_icon(icon: &Icon, background: u32, byte_order: ImageOrder) -> Vec<u8> {
    let bg = [(background >> 16) & 0xff, (background >> 8) & 0xff, background & 0xff];
    let mut data = Vec::with_capacity(icon.rgba.len());

    for px in icon.rgba.chunks_exact(4) {
        let alpha = u32::from(px[3]);
        let mix = |channel: usize| -> u32 {
            (u32::from(px[channel]) * alpha + bg[channel] * (255 - alpha) + 127) / 255
        };
        let pixel = mix(0) << 16 | mix(1) << 8 | mix(2);
        if byte_order == ImageOrder::LSB_FIRST {
            data.extend_from_slice(&pixel.to_le_bytes());
        } else {
            data.extend_from_slice(&pixel.to_be_bytes());
        }
    }
    data
}
