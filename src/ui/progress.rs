use crate::orchestrator::{SessionEvent, SessionStatus};
use crate::ui::icons::{CHECK, CROSS, EVICT, IMAGE, SPARKLE};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use productviz_common::Artifact;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Terminal progress for a single generation, driven by session events.
///
/// The bar mirrors the orchestrator's simulated progress. It only renders;
/// all state lives in the orchestrator.
pub struct GenerationUI {
    bar: ProgressBar,
    verbose: bool,
}

impl GenerationUI {
    /// Create the bar with `label` as its initial message.
    pub fn new(label: &str, verbose: bool) -> Self {
        let bar_style = ProgressStyle::default_bar()
            .template("{spinner} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░");

        let bar = ProgressBar::new(100);
        bar.set_style(bar_style);
        bar.set_message(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar, verbose }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        self.bar.println(msg.as_ref());
    }

    /// Apply one session event to the bar.
    pub fn handle(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Progress { percent } => {
                self.bar.set_position(percent.round().clamp(0.0, 100.0) as u64);
            }
            SessionEvent::StatusChanged { status, error } => match status {
                SessionStatus::Loading => self.bar.reset(),
                SessionStatus::Error => {
                    if let Some(message) = error {
                        self.bar.set_message(style(message).red().to_string());
                    }
                }
                SessionStatus::Success | SessionStatus::Idle => {}
            },
            SessionEvent::ArtifactEvicted { artifact_id } => {
                if self.verbose {
                    self.print_line(format!(
                        "    {} {}",
                        EVICT,
                        style(format!("Evicted oldest artifact {}", short_id(artifact_id))).dim()
                    ));
                }
            }
            SessionEvent::ArtifactCommitted { .. } | SessionEvent::ArtifactRemoved { .. } => {}
        }
    }

    /// Consume events until the channel closes or the task is aborted.
    pub fn follow(self: Arc<Self>, mut rx: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => self.handle(&event),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn finish_success(&self, artifact: &Artifact) {
        self.bar.set_position(100);
        self.bar.finish_with_message(format!(
            "{} Generated {}",
            CHECK,
            style(short_id(&artifact.id)).cyan()
        ));
    }

    pub fn finish_error(&self, message: &str) {
        self.bar
            .abandon_with_message(format!("{} {}", CROSS, style(message).red()));
    }

    /// Remove the bar without leaving a line behind.
    pub fn clear(&self) {
        self.bar.finish_and_clear();
    }
}

/// First 8 characters of an artifact id, for compact display.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Truncate `text` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// One-line history entry: id, kind, timestamp and prompt.
pub fn format_artifact_line(index: usize, artifact: &Artifact) -> String {
    let marker = if index == 0 { SPARKLE } else { IMAGE };
    format!(
        "{}{} {} {} {}",
        marker,
        style(short_id(&artifact.id)).cyan(),
        style(format!("{:<8}", artifact.kind.as_str())).yellow(),
        style(artifact.created_at.format("%Y-%m-%d %H:%M:%S")).dim(),
        truncate(&artifact.prompt, 60)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use productviz_common::{ArtifactKind, ImagePayload};

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("0123456789abcdef"), "01234567");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
        assert_eq!(truncate("ñandú feliz", 4).chars().count(), 4);
    }

    #[test]
    fn test_format_artifact_line_contains_fields() {
        console::set_colors_enabled(false);
        let artifact = Artifact::new(
            ImagePayload::new("image/png", "AA=="),
            "Make it gold plated",
            ArtifactKind::Edit,
        );
        let line = format_artifact_line(1, &artifact);
        assert!(line.contains(short_id(&artifact.id)));
        assert!(line.contains("edit"));
        assert!(line.contains("Make it gold plated"));
    }

    #[test]
    fn test_handle_progress_sets_position() {
        let ui = GenerationUI::new("Generating", false);
        ui.handle(&SessionEvent::Progress { percent: 42.4 });
        assert_eq!(ui.bar.position(), 42);
        ui.handle(&SessionEvent::StatusChanged {
            status: SessionStatus::Loading,
            error: None,
        });
        assert_eq!(ui.bar.position(), 0);
        ui.clear();
    }
}
