use thiserror::Error;

/// Telegram's upper bound for uploaded files.
pub const DEFAULT_SIZE_CEILING: u64 = 2 * 1024 * 1024 * 1024;

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Renders a byte count in the largest unit that keeps the value >= 1,
/// with one decimal place: `1536 -> "1.5 KB"`, `0 -> "0.0 B"`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    for unit in &UNITS[..UNITS.len() - 1] {
        if value < 1024.0 {
            return format!("{value:.1} {unit}");
        }
        value /= 1024.0;
    }
    format!("{value:.1} {}", UNITS[UNITS.len() - 1])
}

#[derive(Debug, Error)]
#[error("declared size {declared} exceeds ceiling {ceiling}")]
pub struct SizeError {
    pub declared: u64,
    pub ceiling: u64,
}

impl SizeError {
    pub fn user_message(&self) -> String {
        format!(
            "❌ Файл слишком большой ({}). Максимальный размер: {}.",
            format_size(self.declared),
            format_size(self.ceiling)
        )
    }
}

/// Pre-flight check of the size declared by the platform, run before any
/// network transfer. A size equal to the ceiling passes; only strictly
/// greater fails.
#[derive(Debug, Clone, Copy)]
pub struct SizeLimit {
    ceiling: u64,
}

impl SizeLimit {
    pub fn new(ceiling: u64) -> Self {
        Self { ceiling }
    }

    pub fn ceiling(&self) -> u64 {
        self.ceiling
    }

    pub fn check(&self, declared: u64) -> Result<(), SizeError> {
        if declared > self.ceiling {
            return Err(SizeError {
                declared,
                ceiling: self.ceiling,
            });
        }
        Ok(())
    }
}

impl Default for SizeLimit {
    fn default() -> Self {
        Self::new(DEFAULT_SIZE_CEILING)
    }
}
