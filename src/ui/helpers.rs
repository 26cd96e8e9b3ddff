//! Helper functions for UI operations.

use crate::app::{App, AppEvent};
use crate::util::catch_task_panic;
use chrono::{DateTime, Local, Utc};
use ratatui::layout::Rect;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Article download plus model call.
const SUMMARY_TIMEOUT: Duration = Duration::from_secs(45);

/// Start translating visible titles that have no cached translation yet.
///
/// The cache caps in-flight requests, so spawning one task per title is fine;
/// each reports back through `AppEvent::TitleTranslated`.
pub(super) fn spawn_translations(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let titles = app.untranslated_titles();
    let Some(translation) = app.translation.as_mut() else {
        return;
    };

    for title in titles {
        translation.pending.insert(Arc::clone(&title));
        let cache = Arc::clone(&translation.cache);
        let language = Arc::clone(&translation.target_language);
        let tx = event_tx.clone();

        app.tasks.spawn(async move {
            let outcome = catch_task_panic(async {
                let translated = cache.translate(&title, &language).await;
                (*translated != *title).then_some(translated)
            })
            .await;

            let event = match outcome {
                Ok(translated) => AppEvent::TitleTranslated {
                    original: title,
                    translated,
                },
                Err(error) => {
                    // Clear the pending marker even though the task died.
                    if let Err(e) = tx
                        .send(AppEvent::TitleTranslated {
                            original: title,
                            translated: None,
                        })
                        .await
                    {
                        tracing::debug!(error = %e, "UI gone, dropping translation result");
                    }
                    AppEvent::TaskPanicked {
                        task: "translate",
                        error,
                    }
                }
            };
            if let Err(e) = tx.send(event).await {
                tracing::debug!(error = %e, "UI gone, dropping translation result");
            }
        });
    }
}

/// Start the queued article summary, if any.
///
/// The result comes back as `AppEvent::SummaryReady`; a panic or timeout
/// still reports a failure so the popup never stays on "Loading".
pub(super) fn spawn_summary(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(summaries) = app.summaries.as_mut() else {
        return;
    };
    let Some(url) = summaries.queued.take() else {
        return;
    };
    if !summaries.pending.insert(Arc::clone(&url)) {
        return;
    }

    let summarizer = Arc::clone(&summaries.summarizer);
    let language = Arc::clone(&summaries.target_language);
    let tx = event_tx.clone();

    app.tasks.spawn(async move {
        let outcome = catch_task_panic(async {
            tokio::time::timeout(SUMMARY_TIMEOUT, summarizer.summarize(&url, &language)).await
        })
        .await;

        let result = match outcome {
            Ok(Ok(Ok(summary))) => Ok(summary),
            Ok(Ok(Err(e))) => Err(e.to_string()),
            Ok(Err(_)) => Err("Summary timed out".to_string()),
            Err(error) => {
                if let Err(e) = tx
                    .send(AppEvent::TaskPanicked {
                        task: "summarize",
                        error,
                    })
                    .await
                {
                    tracing::debug!(error = %e, "UI gone, dropping panic report");
                }
                Err("Summary failed".to_string())
            }
        };
        if let Err(e) = tx.send(AppEvent::SummaryReady { url, result }).await {
            tracing::debug!(error = %e, "UI gone, dropping summary");
        }
    });
}

/// List date column: `HH:MM` for today, `Mon DD, HH:MM` otherwise, in local time.
pub(super) fn format_entry_time(published: DateTime<Utc>, now: DateTime<Local>) -> String {
    let local = published.with_timezone(&Local);
    if local.date_naive() == now.date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%b %d, %H:%M").to_string()
    }
}

/// Centered rectangle of at most `width` x `height` inside `area`.
pub(super) fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width - width) / 2;
    let y = area.y + (area.height - height) / 2;
    Rect::new(x, y, width, height)
}
