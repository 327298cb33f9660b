use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// First index of the 24-step grayscale ramp in the extended terminal palette.
const GRAY_RAMP_BASE: u8 = 232;

/// The eight basic ANSI colors, in palette-index order.
const BASIC_TABLE: [[u8; 3]; 8] = [
    [0, 0, 0],       // black
    [255, 0, 0],     // red
    [0, 255, 0],     // green
    [255, 255, 0],   // yellow
    [0, 0, 255],     // blue
    [255, 0, 255],   // magenta
    [0, 255, 255],   // cyan
    [255, 255, 255], // white
];

/// How cells are colored during transcoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Grayscale glyphs only, no paint handles.
    Mono,
    /// 256-color terminal palette (6x6x6 cube plus grayscale ramp).
    Extended,
    /// The eight basic ANSI colors.
    Basic,
}

impl ColorMode {
    /// The quantization policy backing this mode, if any.
    pub fn policy(self) -> Option<PalettePolicy> {
        match self {
            ColorMode::Mono => None,
            ColorMode::Extended => Some(PalettePolicy::Extended),
            ColorMode::Basic => Some(PalettePolicy::Basic),
        }
    }
}

impl FromStr for ColorMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value {
            "mono" => Ok(ColorMode::Mono),
            "extended" => Ok(ColorMode::Extended),
            "basic" => Ok(ColorMode::Basic),
            _ => Err(ConfigError::InvalidValue {
                key: "render.color".to_string(),
                value: value.to_string(),
            }),
        }
    }
}

/// Palette layout used when quantizing RGB samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalettePolicy {
    /// 256-level layout: gray inputs map onto the 232-255 ramp, everything
    /// else onto the 6x6x6 color cube starting at index 16.
    Extended,
    /// Nearest Euclidean match against the eight basic ANSI colors.
    Basic,
}

/// Key identifying a foreground/background palette pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaintKey {
    pub fg: u8,
    pub bg: Option<u8>,
}

/// Opaque handle to an allocated paint. Handles index a bounded pool, so the
/// same key always resolves to the same handle for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaintHandle(u16);

/// Lazily grown map from palette keys to paint handles.
///
/// Entries are never evicted below the capacity; once the pool is full, new
/// keys reuse handles starting from the least recently allocated slot rather
/// than failing mid-frame.
#[derive(Debug)]
pub struct PaintCache {
    handles: HashMap<PaintKey, PaintHandle>,
    specs: Vec<PaintKey>,
    capacity: usize,
    reuse_cursor: usize,
    reuse_warned: bool,
}

impl PaintCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            handles: HashMap::new(),
            specs: Vec::new(),
            capacity: capacity.max(1),
            reuse_cursor: 0,
            reuse_warned: false,
        }
    }

    /// Convenience constructor for the single-threaded shared form consumed by
    /// the quantizer (writer) and the renderer (reader).
    pub fn shared(capacity: usize) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::with_capacity(capacity)))
    }

    /// Look up or allocate the handle for `key`. Idempotent.
    pub fn handle_for(&mut self, key: PaintKey) -> PaintHandle {
        if let Some(&handle) = self.handles.get(&key) {
            return handle;
        }

        if self.specs.len() < self.capacity {
            let handle = PaintHandle(self.specs.len() as u16);
            self.specs.push(key);
            self.handles.insert(key, handle);
            return handle;
        }

        // Pool exhausted: reuse the least recently allocated handle.
        if !self.reuse_warned {
            warn!(
                "paint pool exhausted at {} entries; new colors reuse existing paints",
                self.capacity
            );
            self.reuse_warned = true;
        }
        let handle = PaintHandle(self.reuse_cursor as u16);
        self.reuse_cursor = (self.reuse_cursor + 1) % self.capacity;
        self.handles.insert(key, handle);
        handle
    }

    /// Resolve a handle back to its foreground/background pair.
    pub fn spec(&self, handle: PaintHandle) -> Option<PaintKey> {
        self.specs.get(handle.0 as usize).copied()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// Maps RGB samples to discrete palette keys and owns the paint cache.
#[derive(Clone)]
pub struct ColorQuantizer {
    policy: PalettePolicy,
    cache: Rc<RefCell<PaintCache>>,
}

impl ColorQuantizer {
    pub fn new(policy: PalettePolicy, cache: Rc<RefCell<PaintCache>>) -> Self {
        Self { policy, cache }
    }

    pub fn policy(&self) -> PalettePolicy {
        self.policy
    }

    /// Quantize an RGB triple to a palette key. Deterministic and pure.
    pub fn quantize(&self, r: u8, g: u8, b: u8) -> u8 {
        match self.policy {
            PalettePolicy::Extended => {
                if r == g && g == b {
                    gray_index(r)
                } else {
                    cube_index(r, g, b)
                }
            }
            PalettePolicy::Basic => nearest_basic(r, g, b),
        }
    }

    /// Look up or lazily allocate the paint handle for a palette pair.
    pub fn paint_handle_for(&mut self, fg: u8, bg: Option<u8>) -> PaintHandle {
        self.cache.borrow_mut().handle_for(PaintKey { fg, bg })
    }
}

/// Gray input onto the 24-step ramp: 0 -> 232, 255 -> 255.
fn gray_index(level: u8) -> u8 {
    GRAY_RAMP_BASE + ((level as f32 / 255.0) * 23.0).round() as u8
}

/// Each channel onto a 6-level cube axis, combined as 16 + 36R + 6G + B.
fn cube_index(r: u8, g: u8, b: u8) -> u8 {
    let axis = |channel: u8| ((channel as f32 / 255.0) * 5.0).round() as u8;
    16 + 36 * axis(r) + 6 * axis(g) + axis(b)
}

fn nearest_basic(r: u8, g: u8, b: u8) -> u8 {
    let distance = |entry: &[u8; 3]| -> i32 {
        let dr = entry[0] as i32 - r as i32;
        let dg = entry[1] as i32 - g as i32;
        let db = entry[2] as i32 - b as i32;
        dr * dr + dg * dg + db * db
    };

    BASIC_TABLE
        .iter()
        .enumerate()
        .min_by_key(|(_, entry)| distance(entry))
        .map(|(index, _)| index as u8)
        .unwrap_or(0)
}
