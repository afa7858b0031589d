//! Engine - evaluates segments concurrently and assembles the prompt.
//!
//! Each segment runs on its own blocking task because probes may touch the
//! filesystem or walk `PATH`. All tasks share one deadline; a segment that has
//! not finished by then is treated as disabled. Output order always follows
//! configuration order.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, warn};

use crate::segments::{Segment, SegmentType};
use crate::template::Renderer;

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentOutcome {
    pub kind: SegmentType,
    pub enabled: bool,
    pub elapsed: Duration,
    /// Rendered text; empty when disabled or when rendering failed.
    pub text: String,
    pub error: Option<String>,
}

impl SegmentOutcome {
    fn disabled(kind: SegmentType, elapsed: Duration, error: Option<String>) -> Self {
        Self {
            kind,
            enabled: false,
            elapsed,
            text: String::new(),
            error,
        }
    }
}

pub struct Engine {
    segments: Vec<Box<dyn Segment>>,
    renderer: Arc<Renderer>,
    deadline: Duration,
}

impl Engine {
    pub fn new(segments: Vec<Box<dyn Segment>>, renderer: Arc<Renderer>, deadline: Duration) -> Self {
        Self {
            segments,
            renderer,
            deadline,
        }
    }

    /// Evaluate every segment, returning outcomes in configuration order.
    pub async fn evaluate(self) -> Vec<SegmentOutcome> {
        let deadline = tokio::time::Instant::now() + self.deadline;

        let tasks = self.segments.into_iter().map(|segment| {
            let kind = segment.kind();
            let renderer = Arc::clone(&self.renderer);
            let start = Instant::now();
            let handle = tokio::task::spawn_blocking(move || run_segment(segment, &renderer));

            async move {
                match tokio::time::timeout_at(deadline, handle).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(e)) => {
                        warn!("Segment {} panicked: {}", kind, e);
                        SegmentOutcome::disabled(kind, start.elapsed(), Some(e.to_string()))
                    }
                    Err(_) => {
                        warn!("Segment {} missed the deadline", kind);
                        SegmentOutcome::disabled(
                            kind,
                            start.elapsed(),
                            Some("deadline exceeded".to_string()),
                        )
                    }
                }
            }
        });

        join_all(tasks).await
    }

    /// The prompt: every rendered fragment, concatenated.
    pub async fn render(self) -> String {
        self.evaluate()
            .await
            .into_iter()
            .map(|outcome| outcome.text)
            .collect()
    }

    /// Human-readable report of every segment for the `debug` command.
    pub async fn print_debug(self, start: Instant, version: &str) -> String {
        let outcomes = self.evaluate().await;

        let mut out = String::new();
        let _ = writeln!(out, "Version: {version}");
        let _ = writeln!(out, "\nSegments:\n");
        for outcome in &outcomes {
            let _ = write!(
                out,
                "{}({}) - {:.2?}",
                outcome.kind, outcome.enabled, outcome.elapsed
            );
            if outcome.enabled {
                let _ = write!(out, " - {:?}", outcome.text);
            }
            if let Some(error) = &outcome.error {
                let _ = write!(out, " - error: {error}");
            }
            out.push('\n');
        }
        let _ = writeln!(out, "\nRun duration: {:.2?}", start.elapsed());
        out
    }
}

fn run_segment(mut segment: Box<dyn Segment>, renderer: &Renderer) -> SegmentOutcome {
    let kind = segment.kind();
    let start = Instant::now();

    if !segment.enabled() {
        debug!("Segment {} disabled in {:?}", kind, start.elapsed());
        return SegmentOutcome::disabled(kind, start.elapsed(), None);
    }

    match renderer.render(segment.template(), &segment.data()) {
        Ok(text) => {
            debug!("Segment {} rendered in {:?}", kind, start.elapsed());
            SegmentOutcome {
                kind,
                enabled: true,
                elapsed: start.elapsed(),
                text,
                error: None,
            }
        }
        Err(e) => {
            warn!("Segment {} failed to render: {}", kind, e);
            SegmentOutcome {
                kind,
                enabled: true,
                elapsed: start.elapsed(),
                text: String::new(),
                error: Some(e.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde_json::{Value, json};

    use super::*;
    use crate::runtime::mock::MockEnvironment;
    use crate::template::Context;

    /// A segment with scripted behaviour.
    struct Fake {
        kind: SegmentType,
        enabled: bool,
        delay: Duration,
        template: &'static str,
    }

    impl Fake {
        fn new(template: &'static str) -> Self {
            Self {
                kind: SegmentType::Text,
                enabled: true,
                delay: Duration::ZERO,
                template,
            }
        }
    }

    impl Segment for Fake {
        fn kind(&self) -> SegmentType {
            self.kind
        }

        fn enabled(&mut self) -> bool {
            std::thread::sleep(self.delay);
            self.enabled
        }

        fn template(&self) -> &str {
            self.template
        }

        fn data(&self) -> Value {
            json!({"Name": "x"})
        }
    }

    fn renderer() -> Arc<Renderer> {
        let env = MockEnvironment::new("zsh", "/home/me");
        Arc::new(Renderer::new(Context::new(&env, HashMap::new(), HashMap::new())))
    }

    fn engine(segments: Vec<Fake>, deadline: Duration) -> Engine {
        let segments = segments
            .into_iter()
            .map(|s| Box::new(s) as Box<dyn Segment>)
            .collect();
        Engine::new(segments, renderer(), deadline)
    }

    #[tokio::test]
    async fn test_output_follows_configuration_order() {
        let mut slow = Fake::new("a");
        slow.delay = Duration::from_millis(50);
        let segments = vec![slow, Fake::new("b"), Fake::new("[{{ .Name }}]")];

        let prompt = engine(segments, Duration::from_secs(5)).render().await;
        assert_eq!(prompt, "ab[x]");
    }

    #[tokio::test]
    async fn test_disabled_segments_are_skipped() {
        let mut off = Fake::new("off");
        off.enabled = false;
        let prompt = engine(vec![Fake::new("on"), off], Duration::from_secs(5))
            .render()
            .await;
        assert_eq!(prompt, "on");
    }

    #[tokio::test]
    async fn test_slow_segment_misses_deadline() {
        let mut slow = Fake::new("slow");
        slow.delay = Duration::from_millis(500);
        let outcomes = engine(vec![slow, Fake::new("fast")], Duration::from_millis(50))
            .evaluate()
            .await;

        assert!(!outcomes[0].enabled);
        assert_eq!(outcomes[0].error.as_deref(), Some("deadline exceeded"));
        assert_eq!(outcomes[1].text, "fast");
    }

    #[tokio::test]
    async fn test_render_error_leaves_segment_empty() {
        let segments = vec![Fake::new("{{ .Missing }}"), Fake::new("ok")];
        let outcomes = engine(segments, Duration::from_secs(5)).evaluate().await;

        assert!(outcomes[0].enabled);
        assert_eq!(outcomes[0].text, "");
        assert!(outcomes[0].error.is_some());
        assert_eq!(outcomes[1].text, "ok");
    }

    #[tokio::test]
    async fn test_print_debug() {
        let mut off = Fake::new("off");
        off.enabled = false;
        let report = engine(vec![Fake::new("on"), off], Duration::from_secs(5))
            .print_debug(Instant::now(), "0.1.0")
            .await;

        assert!(report.starts_with("Version: 0.1.0"));
        assert!(report.contains("text(true)"));
        assert!(report.contains("\"on\""));
        assert!(report.contains("text(false)"));
        assert!(report.contains("Run duration:"));
    }
}
