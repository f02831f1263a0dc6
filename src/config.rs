//! Runtime settings read from the environment.
use std::env;
use std::path::PathBuf;

const DEFAULT_RENDER_FPS: u64 = 60;

/// Host settings. Gameplay constants are fixed and live in `game`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on loop iterations per second.
    pub render_fps: u64,
    /// Seed for placement and guard choices; entropy when unset.
    pub seed: Option<u64>,
    /// Forces the on-screen pad on or off.
    pub dpad: Option<bool>,
    /// Where `tunnels.log` goes; the platform cache dir when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            render_fps: DEFAULT_RENDER_FPS,
            seed: None,
            dpad: None,
            log_dir: None,
        }
    }
}

impl Config {
    /// Environment variables:
    /// - `TUNNELS_FPS` - frame rate cap (default: 60)
    /// - `TUNNELS_SEED` - `u64` seed for reproducible runs
    /// - `TUNNELS_DPAD` - `1`/`0` (also `true`/`false`, `on`/`off`)
    /// - `TUNNELS_LOG_DIR` - log directory
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(fps) = read_env::<u64>("TUNNELS_FPS").filter(|fps| *fps > 0) {
            config.render_fps = fps;
        }
        config.seed = read_env("TUNNELS_SEED");
        config.dpad = env::var("TUNNELS_DPAD").ok().and_then(|v| parse_flag(&v));
        config.log_dir = env::var_os("TUNNELS_LOG_DIR").map(PathBuf::from);

        config
    }

    /// A terminal is a fine pointer, so the pad starts hidden unless asked for.
    pub fn pad_visible(&self) -> bool {
        self.dpad.unwrap_or(false)
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.trim().parse().ok()
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}
