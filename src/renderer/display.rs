use anyhow::{anyhow, Context, Result};
use crossbeam_channel::Sender;
use crossterm::{
    cursor,
    style::{Attribute, Print, SetAttribute},
    terminal::{self, Clear, ClearType, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
    QueueableCommand,
};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::thread::JoinHandle;

use super::cell::CellData;
use super::processor::FrameProcessor;
use super::quantizer::GrayQuantizer;
use crate::core::format::FrameGeometry;
use crate::core::navigator::Presenter;
use crate::utils::logger;

#[derive(Copy, Clone, Debug, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// 24-bit gray half blocks
    Gray,
    /// Gray ramp of the 256-color palette
    #[value(name = "ansi256")]
    Ansi256,
    /// Brightness mapped to characters, no color
    Ascii,
}

// Darkest to brightest.
const ASCII_RAMP: &[u8] = b" .:-=+*#%@";

/// Where the cell grid sits on screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placement {
    pub cols: usize,
    pub rows: usize,
    pub offset_x: u16,
    pub offset_y: u16,
}

impl Placement {
    pub fn centered(cols: usize, rows: usize, term_cols: u16, term_rows: u16) -> Self {
        Self {
            cols,
            rows,
            offset_x: term_cols.saturating_sub(cols as u16) / 2,
            offset_y: term_rows.saturating_sub(rows as u16) / 2,
        }
    }
}

/// Terminal presenter: raw mode, alternate screen, diffing half-block renderer.
///
/// Escape sequences are built here and written by a dedicated thread.
pub struct DisplayManager {
    tx: Option<Sender<Vec<u8>>>,
    writer: Option<JoinHandle<()>>,
    mode: DisplayMode,
    cells: Vec<CellData>,
    last_cells: Vec<CellData>,
    placement: Option<Placement>,
    render_buffer: Vec<u8>,
}

impl DisplayManager {
    pub fn new(mode: DisplayMode) -> Result<Self> {
        // Sends block when full: a stepped frame must never be dropped.
        let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(2);

        let writer = std::thread::Builder::new()
            .name("terminal-writer".to_string())
            .spawn(move || {
                let mut out = BufWriter::with_capacity(1024 * 1024, std::io::stdout());
                while let Ok(data) = rx.recv() {
                    if let Err(e) = out.write_all(&data).and_then(|_| out.flush()) {
                        logger::error(&format!("Terminal write failed: {}", e));
                        break;
                    }
                }
            })
            .context("Failed to spawn terminal writer thread")?;

        let mut dm = Self {
            tx: Some(tx),
            writer: Some(writer),
            mode,
            cells: Vec::new(),
            last_cells: Vec::new(),
            placement: None,
            render_buffer: Vec::with_capacity(256 * 1024),
        };

        dm.initialize_terminal()?;
        Ok(dm)
    }

    fn initialize_terminal(&mut self) -> Result<()> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;

        let mut buffer = Vec::new();
        buffer
            .queue(EnterAlternateScreen)?
            .queue(cursor::Hide)?
            .queue(Print("\x1b[?7l"))? // no line wrap
            .queue(Clear(ClearType::All))?;
        self.send(buffer)
    }

    fn send(&self, data: Vec<u8>) -> Result<()> {
        let tx = self.tx.as_ref().context("Terminal writer already shut down")?;
        tx.send(data)
            .map_err(|_| anyhow!("Terminal writer thread has exited"))
    }

    /// Terminal size with the bottom row reserved for the caption.
    fn viewport() -> Result<(u16, u16)> {
        let (cols, rows) = terminal::size().context("Failed to query terminal size")?;
        Ok((cols.max(1), rows.saturating_sub(1).max(1)))
    }

    fn render(&mut self, frame: &[u8], geometry: &FrameGeometry) -> Result<()> {
        let start = std::time::Instant::now();
        let (cols, rows) = Self::viewport()?;

        let processor = FrameProcessor::fit(*geometry, cols, rows);
        processor.process_frame_into(frame, &mut self.cells);
        let placement = Placement::centered(processor.cols(), processor.rows(), cols, rows);

        self.render_buffer.clear();
        self.render_buffer.extend_from_slice(b"\x1b[?2026h"); // synchronized update

        let force_redraw =
            self.placement != Some(placement) || self.last_cells.len() != self.cells.len();
        if force_redraw {
            self.render_buffer.extend_from_slice(b"\x1b[2J");
            self.last_cells = vec![CellData::default(); self.cells.len()];
            self.placement = Some(placement);
        }

        encode_cells(
            &mut self.render_buffer,
            self.mode,
            &self.cells,
            &mut self.last_cells,
            placement,
            force_redraw,
        );
        self.render_buffer.extend_from_slice(b"\x1b[?2026l");

        self.send(self.render_buffer.clone())?;

        logger::debug(&format!(
            "Rendered {}x{} cells ({} bytes) in {}us",
            placement.cols,
            placement.rows,
            self.render_buffer.len(),
            start.elapsed().as_micros()
        ));
        Ok(())
    }

    fn write_caption(&mut self, caption: &str) -> Result<()> {
        let (cols, rows) = terminal::size().context("Failed to query terminal size")?;
        let title: String = caption
            .chars()
            .map(|c| if c.is_control() { '?' } else { c })
            .collect();
        let text = status_line(caption, cols as usize);

        let mut buffer = Vec::new();
        buffer
            .queue(SetTitle(&title))?
            .queue(cursor::MoveTo(0, rows.saturating_sub(1)))?
            .queue(Clear(ClearType::CurrentLine))?
            .queue(SetAttribute(Attribute::Reverse))?
            .queue(Print(&text))?
            .queue(SetAttribute(Attribute::Reset))?;
        self.send(buffer)
    }
}

impl Presenter for DisplayManager {
    fn present(&mut self, frame: &[u8], geometry: &FrameGeometry) {
        if let Err(e) = self.render(frame, geometry) {
            logger::error(&format!("Render error: {:#}", e));
        }
    }

    fn set_caption(&mut self, caption: &str) {
        if let Err(e) = self.write_caption(caption) {
            logger::error(&format!("Caption error: {:#}", e));
        }
    }
}

impl Drop for DisplayManager {
    fn drop(&mut self) {
        let mut buffer = Vec::new();
        let _ = buffer
            .queue(Print("\x1b[?7h"))
            .and_then(|b| b.queue(cursor::Show))
            .and_then(|b| b.queue(LeaveAlternateScreen));
        let _ = self.send(buffer);

        // Closing the channel lets the writer drain and exit.
        self.tx = None;
        if let Some(writer) = self.writer.take() {
            let _ = writer.join();
        }
        let _ = terminal::disable_raw_mode();
    }
}

/// Caption text for the status row, at most `cols` columns wide.
///
/// Only printable ASCII is kept (one column per char); anything else becomes `?`.
pub fn status_line(caption: &str, cols: usize) -> String {
    caption
        .chars()
        .map(|c| if c.is_ascii_graphic() || c == ' ' { c } else { '?' })
        .take(cols)
        .collect()
}

/// Appends escape sequences for every cell that differs from `last_cells`
/// (or every cell when `force_redraw`), then updates `last_cells`.
pub fn encode_cells(
    buffer: &mut Vec<u8>,
    mode: DisplayMode,
    cells: &[CellData],
    last_cells: &mut [CellData],
    placement: Placement,
    force_redraw: bool,
) {
    let cols = placement.cols.max(1);
    let mut last_fg: Option<u8> = None;
    let mut last_bg: Option<u8> = None;
    // Where the terminal cursor is after the previous write, if known.
    let mut cursor: Option<(u16, u16)> = None;

    for (i, (cell, last)) in cells.iter().zip(last_cells.iter_mut()).enumerate() {
        if !force_redraw && cell == last {
            cursor = None;
            continue;
        }

        let x = (i % cols) as u16 + placement.offset_x;
        let y = (i / cols) as u16 + placement.offset_y;
        if cursor != Some((x, y)) {
            buffer.extend_from_slice(b"\x1b[");
            push_decimal(buffer, y + 1);
            buffer.push(b';');
            push_decimal(buffer, x + 1);
            buffer.push(b'H');
        }

        match mode {
            DisplayMode::Gray | DisplayMode::Ansi256 => {
                let (fg, bg) = match mode {
                    DisplayMode::Ansi256 => (
                        GrayQuantizer::quantize(cell.top),
                        GrayQuantizer::quantize(cell.bottom),
                    ),
                    _ => (cell.top, cell.bottom),
                };
                if last_fg != Some(fg) {
                    push_color(buffer, mode, b"38", fg);
                    last_fg = Some(fg);
                }
                if last_bg != Some(bg) {
                    push_color(buffer, mode, b"48", bg);
                    last_bg = Some(bg);
                }
                let mut utf8 = [0u8; 4];
                buffer.extend_from_slice(CellData::GLYPH.encode_utf8(&mut utf8).as_bytes());
            }
            DisplayMode::Ascii => {
                let level = cell.brightness() as usize * (ASCII_RAMP.len() - 1) / 255;
                buffer.push(ASCII_RAMP[level]);
            }
        }

        *last = *cell;
        cursor = Some((x + 1, y));
    }

    buffer.extend_from_slice(b"\x1b[0m");
}

fn push_color(buffer: &mut Vec<u8>, mode: DisplayMode, layer: &[u8], value: u8) {
    buffer.extend_from_slice(b"\x1b[");
    buffer.extend_from_slice(layer);
    match mode {
        DisplayMode::Ansi256 => {
            buffer.extend_from_slice(b";5;");
            push_decimal(buffer, value as u16);
        }
        _ => {
            buffer.extend_from_slice(b";2;");
            for n in 0..3 {
                if n > 0 {
                    buffer.push(b';');
                }
                push_decimal(buffer, value as u16);
            }
        }
    }
    buffer.push(b'm');
}

// Allocation-free integer formatting.
#[inline(always)]
fn push_decimal(buffer: &mut Vec<u8>, mut n: u16) {
    let mut digits = [0u8; 5];
    let mut start = digits.len();
    loop {
        start -= 1;
        digits[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    buffer.extend_from_slice(&digits[start..]);
}
