use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::components::Dir;

/// Drags shorter than this on both axes are taps, not swipes.
pub const SWIPE_DEADZONE: f32 = 20.0;
/// Nominal size of one terminal cell in pointer units.
const CELL_UNITS_X: f32 = 8.0;
const CELL_UNITS_Y: f32 = 16.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Move(Dir),
    Reset,
    TogglePad,
    Quit,
}

/// Arrow keys and WASD move; `r` resets, `p` toggles the pad, `q`/Esc/Ctrl-C
/// quit. Anything else is ignored.
pub fn command_for_key(key: KeyEvent) -> Option<Command> {
    if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(Command::Quit),
            _ => None,
        };
    }
    let command = match key.code {
        KeyCode::Up | KeyCode::Char('w') | KeyCode::Char('W') => Command::Move(Dir::Up),
        KeyCode::Down | KeyCode::Char('s') | KeyCode::Char('S') => Command::Move(Dir::Down),
        KeyCode::Left | KeyCode::Char('a') | KeyCode::Char('A') => Command::Move(Dir::Left),
        KeyCode::Right | KeyCode::Char('d') | KeyCode::Char('D') => Command::Move(Dir::Right),
        KeyCode::Char('r') | KeyCode::Char('R') => Command::Reset,
        KeyCode::Char('p') | KeyCode::Char('P') => Command::TogglePad,
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Direction of a drag by `(dx, dy)`; the larger axis wins and ties go
/// horizontal.
pub fn swipe_direction(dx: f32, dy: f32) -> Option<Dir> {
    if dx.abs() < SWIPE_DEADZONE && dy.abs() < SWIPE_DEADZONE {
        return None;
    }
    let dir = if dx.abs() >= dy.abs() {
        if dx > 0.0 {
            Dir::Right
        } else {
            Dir::Left
        }
    } else if dy > 0.0 {
        Dir::Down
    } else {
        Dir::Up
    };
    Some(dir)
}

pub fn cell_to_units(column: u16, row: u16) -> (f32, f32) {
    (column as f32 * CELL_UNITS_X, row as f32 * CELL_UNITS_Y)
}

#[derive(Clone, Copy, Debug, Default)]
pub struct SwipeTracker {
    origin: Option<(f32, f32)>,
}

impl SwipeTracker {
    pub fn press(&mut self, x: f32, y: f32) {
        self.origin = Some((x, y));
    }

    pub fn release(&mut self, x: f32, y: f32) -> Option<Dir> {
        let (sx, sy) = self.origin.take()?;
        swipe_direction(x - sx, y - sy)
    }

    pub fn cancel(&mut self) {
        self.origin = None;
    }
}

/// On-screen direction pad: a plus of four two-column buttons.
#[derive(Clone, Copy, Debug)]
pub struct DPad {
    visible: bool,
}

impl DPad {
    pub const WIDTH: u16 = 6;
    pub const HEIGHT: u16 = 3;
    pub const BUTTON_W: u16 = 2;

    pub fn new(visible: bool) -> Self {
        Self { visible }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn toggle(&mut self) {
        self.visible = !self.visible;
    }

    /// Top-left cell of each button for a pad drawn at `origin`.
    pub fn buttons(origin: (u16, u16)) -> [(Dir, u16, u16); 4] {
        let (x, y) = origin;
        [
            (Dir::Up, x + 2, y),
            (Dir::Left, x, y + 1),
            (Dir::Right, x + 4, y + 1),
            (Dir::Down, x + 2, y + 2),
        ]
    }

    pub fn hit(origin: (u16, u16), column: u16, row: u16) -> Option<Dir> {
        Self::buttons(origin)
            .into_iter()
            .find(|(_, bx, by)| row == *by && column >= *bx && column < bx + Self::BUTTON_W)
            .map(|(dir, _, _)| dir)
    }
}

/// Folds keyboard, drag and pad input into commands.
#[derive(Debug)]
pub struct InputAdapter {
    swipe: SwipeTracker,
    pad: DPad,
}

impl InputAdapter {
    pub fn new(pad_visible: bool) -> Self {
        Self {
            swipe: SwipeTracker::default(),
            pad: DPad::new(pad_visible),
        }
    }

    pub fn pad(&self) -> &DPad {
        &self.pad
    }

    pub fn toggle_pad(&mut self) {
        self.pad.toggle();
    }

    /// `pad_origin` is where the pad is currently drawn, if it is drawn.
    pub fn translate(&mut self, event: &Event, pad_origin: Option<(u16, u16)>) -> Option<Command> {
        match event {
            Event::Key(key) => command_for_key(*key),
            Event::Mouse(mouse) => self.translate_mouse(mouse, pad_origin),
            _ => None,
        }
    }

    fn translate_mouse(&mut self, mouse: &MouseEvent, pad_origin: Option<(u16, u16)>) -> Option<Command> {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(dir) = pad_origin.and_then(|o| DPad::hit(o, mouse.column, mouse.row)) {
                    self.swipe.cancel();
                    return Some(Command::Move(dir));
                }
                let (x, y) = cell_to_units(mouse.column, mouse.row);
                self.swipe.press(x, y);
                None
            }
            MouseEventKind::Up(MouseButton::Left) => {
                let (x, y) = cell_to_units(mouse.column, mouse.row);
                self.swipe.release(x, y).map(Command::Move)
            }
            _ => None,
        }
    }
}
