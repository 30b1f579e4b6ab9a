/// Largest side, in pixels, of any canvas sent to the fill service.
pub const MAX_CANVAS_DIMENSION: u32 = 1024;

/// A named target aspect ratio (width / height).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AspectRatio {
    name: &'static str,
    value: f64,
}

pub const ASPECT_RATIOS: [AspectRatio; 5] = [
    AspectRatio { name: "1:1", value: 1.0 },
    AspectRatio { name: "4:3", value: 4.0 / 3.0 },
    AspectRatio { name: "16:9", value: 16.0 / 9.0 },
    AspectRatio { name: "3:4", value: 3.0 / 4.0 },
    AspectRatio { name: "9:16", value: 9.0 / 16.0 },
];

impl AspectRatio {
    /// Returns `None` unless `value` is finite and strictly positive.
    pub fn new(name: &'static str, value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            Some(Self { name, value })
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Catalog lookup by label, e.g. `"16:9"`.
    pub fn by_name(name: &str) -> Option<Self> {
        ASPECT_RATIOS.iter().copied().find(|r| r.name == name)
    }

    /// Label usable inside a file name (`16:9` -> `16-9`).
    pub fn file_label(&self) -> String {
        self.name.replace(':', "-")
    }
}

impl Default for AspectRatio {
    fn default() -> Self {
        ASPECT_RATIOS[0]
    }
}
