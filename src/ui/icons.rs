//! Shared UI icons.
//!
//! Each icon carries a plain-text fallback for terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[!]");

// Artifacts
pub static IMAGE: Emoji<'_, '_> = Emoji("🖼️  ", "[IMG]");
pub static TRASH: Emoji<'_, '_> = Emoji("🗑️  ", "-");
pub static EVICT: Emoji<'_, '_> = Emoji("♻️  ", "[EVICT]");
