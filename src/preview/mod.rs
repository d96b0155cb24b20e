// src/preview/mod.rs
//! Selection-driven live preview: the downstream consumer of extracted
//! insights. The user picks insight ids plus a platform, framework and funnel
//! stage; a debounced actor turns the settled request into one call to a
//! [`ContentGenerator`].

pub mod live;

use async_trait::async_trait;
use metrics::describe_counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

pub use live::{LivePreview, EVENT_BUFFER};

/// Everything a preview depends on. Any field change restarts the debounce.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewRequest {
    pub selected_ids: BTreeSet<String>,
    pub platform: String,
    pub framework: String,
    pub funnel_stage: String,
}

impl PreviewRequest {
    pub fn new(
        ids: impl IntoIterator<Item = impl Into<String>>,
        platform: impl Into<String>,
        framework: impl Into<String>,
        funnel_stage: impl Into<String>,
    ) -> Self {
        Self {
            selected_ids: ids.into_iter().map(Into::into).collect(),
            platform: platform.into(),
            framework: framework.into(),
            funnel_stage: funnel_stage.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewContent {
    pub body: String,
}

/// Downstream generation boundary (typically a model call). Implementations
/// should stop early once `cancel` fires; their result is discarded either way.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        request: PreviewRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<PreviewContent>;
}

/// Observable preview state, tagged with the request revision it refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Idle,
    Debouncing { revision: u64 },
    Generating { revision: u64 },
    Delivered { revision: u64 },
    Cancelled { revision: u64 },
    Failed { revision: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewEvent {
    Delivered { revision: u64, content: PreviewContent },
    Failed { revision: u64, error: String },
    Cancelled { revision: u64 },
}

impl PreviewEvent {
    pub fn revision(&self) -> u64 {
        match self {
            PreviewEvent::Delivered { revision, .. }
            | PreviewEvent::Failed { revision, .. }
            | PreviewEvent::Cancelled { revision } => *revision,
        }
    }
}

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("preview_requests_total", "Preview request changes received.");
        describe_counter!(
            "preview_cancelled_total",
            "In-flight preview generations cancelled by a newer request."
        );
    });
}
