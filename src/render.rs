use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use rand::Rng;
use unicode_width::UnicodeWidthStr;

use crate::components::{Dir, Pos, Tile};
use crate::game::{Outcome, Session, STEP_LIMIT, SUPPLY_COUNT};
use crate::input::DPad;
use crate::level::Map;

/// Cells farther than this (Manhattan) from the player stay dark.
pub const FOG_RADIUS: usize = 4;
/// Terminal columns per tile.
pub const CELL_W: usize = 2;
const PAD_GAP: u16 = 2;

const VIGNETTE_INNER: f32 = FOG_RADIUS as f32 * 0.4;
const VIGNETTE_OUTER: f32 = FOG_RADIUS as f32 * 1.1;
const VIGNETTE_MAX: f32 = 0.55;

const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

const UNEXPLORED: Color = rgb(0x05, 0x07, 0x0a);
const WALL: Color = rgb(0x1e, 0x2a, 0x33);
const WALL_EDGE: Color = rgb(0x24, 0x37, 0x44);
const FLOOR: Color = rgb(0x0f, 0x18, 0x1f);
const FLOOR_INNER: Color = rgb(0x0c, 0x14, 0x1a);
const EXIT_ACTIVE: Color = rgb(0x1d, 0xb9, 0x54);
const EXIT_LOCKED: Color = rgb(0x33, 0x33, 0x33);
const SUPPLY: Color = rgb(0x39, 0xff, 0x14);
const GUARD: Color = rgb(0xe7, 0x4c, 0x3c);
const GUARD_BODY: Color = rgb(0xc0, 0x39, 0x2b);
const PLAYER: Color = rgb(0xff, 0xd6, 0x57);
const PLAYER_BODY: Color = rgb(0xf1, 0xc4, 0x0f);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Glyph {
    Unexplored,
    Wall,
    Floor,
    Exit,
    Supply,
    Guard,
    Player,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cell {
    pub glyph: Glyph,
    pub fg: Color,
    pub bg: Color,
}

impl Cell {
    const fn new(glyph: Glyph, fg: Color, bg: Color) -> Self {
        Self { glyph, fg, bg }
    }
}

/// Everything the renderer reads, borrowed from the session.
pub struct Scene<'a> {
    pub map: &'a Map,
    pub player: Pos,
    pub supplies: &'a [Pos],
    pub guards: &'a [Pos],
    pub exit_unlocked: bool,
}

impl<'a> Scene<'a> {
    pub fn of<R: Rng>(session: &'a Session<R>) -> Self {
        Self {
            map: session.map(),
            player: session.player(),
            supplies: session.supplies(),
            guards: session.guards(),
            exit_unlocked: session.exit_unlocked(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    pub width: usize,
    pub height: usize,
    cells: Vec<Cell>,
}

impl Frame {
    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.y * self.width + pos.x]
    }

    fn set(&mut self, pos: Pos, cell: Cell) {
        self.cells[pos.y * self.width + pos.x] = cell;
    }
}

pub fn is_visible(player: Pos, pos: Pos) -> bool {
    player.manhattan(pos) <= FOG_RADIUS
}

/// Darkening applied at `pos`: zero near the player, ramping up toward the
/// edge of the lit area.
pub fn vignette(player: Pos, pos: Pos) -> f32 {
    let dx = player.x.abs_diff(pos.x) as f32;
    let dy = player.y.abs_diff(pos.y) as f32;
    let d = (dx * dx + dy * dy).sqrt();
    if d <= VIGNETTE_INNER {
        0.0
    } else if d >= VIGNETTE_OUTER {
        VIGNETTE_MAX
    } else {
        VIGNETTE_MAX * (d - VIGNETTE_INNER) / (VIGNETTE_OUTER - VIGNETTE_INNER)
    }
}

fn shade(color: Color, alpha: f32) -> Color {
    match color {
        Color::Rgb { r, g, b } => {
            let keep = 1.0 - alpha;
            rgb(
                (r as f32 * keep).round() as u8,
                (g as f32 * keep).round() as u8,
                (b as f32 * keep).round() as u8,
            )
        }
        other => other,
    }
}

/// Builds the picture for the current state. Pure: reads the scene only.
pub fn compose(scene: &Scene) -> Frame {
    let map = scene.map;
    let mut frame = Frame {
        width: map.width(),
        height: map.height(),
        cells: Vec::with_capacity(map.width() * map.height()),
    };

    for y in 0..map.height() {
        for x in 0..map.width() {
            let pos = Pos::new(x, y);
            let cell = if !is_visible(scene.player, pos) {
                Cell::new(Glyph::Unexplored, UNEXPLORED, UNEXPLORED)
            } else {
                match map.grid().get(pos) {
                    Tile::Wall => Cell::new(Glyph::Wall, WALL_EDGE, WALL),
                    Tile::Floor => Cell::new(Glyph::Floor, FLOOR_INNER, FLOOR),
                    Tile::Exit => {
                        let color = if scene.exit_unlocked {
                            EXIT_ACTIVE
                        } else {
                            EXIT_LOCKED
                        };
                        Cell::new(Glyph::Exit, color, FLOOR)
                    }
                }
            };
            frame.cells.push(cell);
        }
    }

    for supply in scene.supplies {
        if is_visible(scene.player, *supply) {
            frame.set(*supply, Cell::new(Glyph::Supply, SUPPLY, FLOOR));
        }
    }
    for guard in scene.guards {
        if is_visible(scene.player, *guard) {
            frame.set(*guard, Cell::new(Glyph::Guard, GUARD, GUARD_BODY));
        }
    }
    frame.set(scene.player, Cell::new(Glyph::Player, PLAYER, PLAYER_BODY));

    for y in 0..frame.height {
        for x in 0..frame.width {
            let pos = Pos::new(x, y);
            let alpha = vignette(scene.player, pos);
            if alpha > 0.0 {
                let cell = frame.get(pos);
                frame.set(
                    pos,
                    Cell::new(cell.glyph, shade(cell.fg, alpha), shade(cell.bg, alpha)),
                );
            }
        }
    }
    frame
}

fn hud_segments<R: Rng>(session: &Session<R>) -> [(String, Color); 4] {
    let steps_color = if session.steps() > STEP_LIMIT {
        Color::Red
    } else {
        Color::Grey
    };
    let (exit_label, exit_color) = if session.exit_unlocked() {
        ("unlocked", Color::Green)
    } else {
        ("locked", Color::DarkGrey)
    };
    [
        (
            format!("Supplies {}/{}", session.collected(), SUPPLY_COUNT),
            Color::Green,
        ),
        (format!("  Steps {}", session.steps()), steps_color),
        (format!("  Exit {}", exit_label), exit_color),
        (
            "  (arrows/WASD move, r reset, p pad, q quit)".to_string(),
            Color::White,
        ),
    ]
}

fn headline(outcome: Outcome) -> Option<&'static str> {
    match outcome {
        Outcome::InProgress => None,
        Outcome::Caught => Some("Captured by guards."),
        Outcome::Escaped => Some("Extraction successful."),
        Outcome::Exhausted => Some("You ran out of time."),
    }
}

fn overlay_lines<R: Rng>(session: &Session<R>) -> Option<[String; 3]> {
    let headline = headline(session.outcome())?;
    Some([
        headline.to_string(),
        format!(
            "Supplies collected: {} / {}",
            session.collected(),
            SUPPLY_COUNT
        ),
        "r: play again   q: quit".to_string(),
    ])
}

/// Diffing terminal painter. Only cells that changed since the last frame
/// are written.
pub struct Renderer {
    last: Vec<Cell>,
    last_hud: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
    pad_origin: Option<(u16, u16)>,
    overlay_shown: bool,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            last: vec![Cell::new(Glyph::Unexplored, Color::Reset, Color::Reset); width * height],
            last_hud: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
            pad_origin: None,
            overlay_shown: false,
        }
    }

    /// Forces a full repaint on the next call, e.g. after a resize.
    pub fn invalidate(&mut self) {
        self.needs_full = true;
    }

    /// Where the pad was last drawn; `None` while it is hidden.
    pub fn pad_origin(&self) -> Option<(u16, u16)> {
        self.pad_origin
    }

    pub fn render<W: Write, R: Rng>(
        &mut self,
        out: &mut W,
        session: &Session<R>,
        pad_visible: bool,
    ) -> io::Result<()> {
        let map = session.map();
        let overlay = overlay_lines(session);
        let show_pad = pad_visible && overlay.is_none();

        let map_w = (map.width() * CELL_W) as u16;
        let pad_w = if show_pad { PAD_GAP + DPad::WIDTH } else { 0 };
        let needed_w = map_w + pad_w;
        let needed_h = (map.height() + 2) as u16;

        let (term_w, term_h) = terminal::size()?;
        if term_w < needed_w || term_h < needed_h {
            out.queue(MoveTo(0, 0))?;
            out.queue(Clear(ClearType::All))?;
            let msg = format!(
                "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
                needed_w, needed_h, term_w, term_h
            );
            out.queue(Print(msg))?;
            out.flush()?;
            self.pad_origin = None;
            self.needs_full = true;
            return Ok(());
        }

        let origin_x = (term_w - needed_w) / 2;
        let origin_y = (term_h - needed_h) / 2 + 1;
        let pad_origin = show_pad.then(|| {
            (
                origin_x + map_w + PAD_GAP,
                origin_y + map.height() as u16 - DPad::HEIGHT,
            )
        });
        if origin_x != self.origin_x
            || origin_y != self.origin_y
            || pad_origin != self.pad_origin
            || overlay.is_some() != self.overlay_shown
        {
            self.origin_x = origin_x;
            self.origin_y = origin_y;
            self.pad_origin = pad_origin;
            self.overlay_shown = overlay.is_some();
            self.needs_full = true;
        }
        if self.needs_full {
            out.queue(Clear(ClearType::All))?;
        }

        let hud: String = hud_segments(session)
            .iter()
            .map(|(text, _)| text.as_str())
            .collect();
        if self.needs_full || hud != self.last_hud {
            out.queue(MoveTo(self.origin_x, self.origin_y - 1))?;
            out.queue(Clear(ClearType::CurrentLine))?;
            for (text, color) in hud_segments(session) {
                out.queue(SetForegroundColor(color))?;
                out.queue(Print(text))?;
            }
            out.queue(ResetColor)?;
            self.last_hud = hud;
        }

        let frame = compose(&Scene::of(session));
        for y in 0..frame.height {
            for x in 0..frame.width {
                let cell = frame.get(Pos::new(x, y));
                let idx = y * frame.width + x;
                if self.needs_full || cell != self.last[idx] {
                    self.last[idx] = cell;
                    self.draw_cell(out, x, y, cell)?;
                }
            }
        }

        if let Some(origin) = self.pad_origin {
            if self.needs_full {
                draw_pad(out, origin)?;
            }
        }
        if let Some(lines) = overlay {
            self.draw_overlay(out, &lines, map.width(), map.height())?;
        }
        self.needs_full = false;

        out.flush()?;
        Ok(())
    }

    fn draw_cell<W: Write>(&self, out: &mut W, x: usize, y: usize, cell: Cell) -> io::Result<()> {
        let text = match cell.glyph {
            Glyph::Unexplored => "  ",
            Glyph::Wall => "▄▄",
            Glyph::Floor => "  ",
            Glyph::Exit => "▓▓",
            Glyph::Supply => "◆ ",
            Glyph::Guard => "☗ ",
            Glyph::Player => "@ ",
        };
        let x_pos = self.origin_x + (x * CELL_W) as u16;
        let y_pos = self.origin_y + y as u16;
        out.queue(MoveTo(x_pos, y_pos))?;
        out.queue(SetForegroundColor(cell.fg))?;
        out.queue(SetBackgroundColor(cell.bg))?;
        out.queue(Print(text))?;
        let w = UnicodeWidthStr::width(text);
        if w < CELL_W {
            for _ in 0..(CELL_W - w) {
                out.queue(Print(' '))?;
            }
        }
        out.queue(ResetColor)?;
        Ok(())
    }

    fn draw_overlay<W: Write>(
        &self,
        out: &mut W,
        lines: &[String; 3],
        width: usize,
        height: usize,
    ) -> io::Result<()> {
        let map_w = width * CELL_W;
        let box_w = lines
            .iter()
            .map(|line| UnicodeWidthStr::width(line.as_str()))
            .max()
            .unwrap_or(0)
            + 4;
        let box_w = box_w.min(map_w);
        let left = self.origin_x + ((map_w - box_w) / 2) as u16;
        let top = self.origin_y + (height / 2).saturating_sub(2) as u16;

        out.queue(SetBackgroundColor(Color::Black))?;
        for row in 0..lines.len() + 2 {
            out.queue(MoveTo(left, top + row as u16))?;
            out.queue(Print(" ".repeat(box_w)))?;
        }
        for (i, line) in lines.iter().enumerate() {
            let w = UnicodeWidthStr::width(line.as_str()).min(box_w);
            let color = if i == 0 { Color::White } else { Color::Grey };
            out.queue(MoveTo(
                left + ((box_w - w) / 2) as u16,
                top + 1 + i as u16,
            ))?;
            out.queue(SetForegroundColor(color))?;
            out.queue(Print(line))?;
        }
        out.queue(ResetColor)?;
        Ok(())
    }
}

fn draw_pad<W: Write>(out: &mut W, origin: (u16, u16)) -> io::Result<()> {
    for (dir, x, y) in DPad::buttons(origin) {
        let label = match dir {
            Dir::Up => "▲ ",
            Dir::Down => "▼ ",
            Dir::Left => "◀ ",
            Dir::Right => "▶ ",
        };
        out.queue(MoveTo(x, y))?;
        out.queue(SetForegroundColor(Color::White))?;
        out.queue(SetBackgroundColor(Color::DarkGrey))?;
        out.queue(Print(label))?;
    }
    out.queue(ResetColor)?;
    Ok(())
}
