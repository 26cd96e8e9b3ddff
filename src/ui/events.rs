//! Application event handling.
//!
//! Processes completion events from tasks the UI spawned.

use crate::app::{App, AppEvent};

pub(super) fn handle_app_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::TitleTranslated {
            original,
            translated,
        } => {
            if let Some(translation) = app.translation.as_mut() {
                translation.pending.remove(&original);
                if translated.is_none() {
                    translation.failed.insert(original);
                }
            }
            app.needs_redraw = true;
        }
        AppEvent::SummaryReady { url, result } => app.finish_summary(url, result),
        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.set_status(format!("Internal error in {} task", task));
        }
    }
}

/// Drop finished tasks from the join set.
pub(super) fn reap_tasks(app: &mut App) {
    while let Some(result) = app.tasks.try_join_next() {
        if let Err(e) = result {
            if e.is_panic() {
                tracing::error!(error = %e, "UI task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{Summaries, Translation};
    use crate::keybindings::KeybindingRegistry;
    use crate::refresh::SnapshotStore;
    use crate::theme::ThemeVariant;
    use crate::translate::{
        SummarizeError, Summarizer, TranslateError, TranslationCache, Translator,
    };
    use futures::future::BoxFuture;
    use futures::FutureExt;
    use std::sync::Arc;

    struct Echo;

    impl Translator for Echo {
        fn translate<'a>(
            &'a self,
            text: &'a str,
            _target_language: &'a str,
        ) -> BoxFuture<'a, Result<String, TranslateError>> {
            async move { Ok(text.to_string()) }.boxed()
        }
    }

    impl Summarizer for Echo {
        fn summarize<'a>(
            &'a self,
            url: &'a str,
            _target_language: &'a str,
        ) -> BoxFuture<'a, Result<String, SummarizeError>> {
            async move { Ok(url.to_string()) }.boxed()
        }
    }

    fn app() -> App {
        let cache = Arc::new(TranslationCache::new(Arc::new(Echo)));
        App::new(
            Vec::new(),
            SnapshotStore::new(),
            KeybindingRegistry::new(),
            ThemeVariant::Dark.palette(),
        )
        .with_translation(Translation::new(cache, "Korean"))
    }

    #[test]
    fn test_translated_title_clears_pending() {
        let mut app = app();
        let title: Arc<str> = Arc::from("Hello");
        app.translation
            .as_mut()
            .unwrap()
            .pending
            .insert(Arc::clone(&title));
        app.needs_redraw = false;

        handle_app_event(
            &mut app,
            AppEvent::TitleTranslated {
                original: Arc::clone(&title),
                translated: Some(Arc::from("안녕")),
            },
        );
        let translation = app.translation.as_ref().unwrap();
        assert!(translation.pending.is_empty());
        assert!(translation.failed.is_empty());
        assert!(app.needs_redraw);
    }

    #[test]
    fn test_failed_translation_is_not_retried_until_next_snapshot() {
        let mut app = app();
        let title: Arc<str> = Arc::from("Hello");
        handle_app_event(
            &mut app,
            AppEvent::TitleTranslated {
                original: Arc::clone(&title),
                translated: None,
            },
        );
        assert!(app.translation.as_ref().unwrap().failed.contains(&title));
    }

    #[test]
    fn test_summary_result_is_cached_and_shown() {
        let mut app = app();
        app.summaries = Some(Summaries::new(Arc::new(Echo), "Korean"));
        let url: Arc<str> = Arc::from("https://example.com/post");
        app.summaries
            .as_mut()
            .unwrap()
            .pending
            .insert(Arc::clone(&url));

        handle_app_event(
            &mut app,
            AppEvent::SummaryReady {
                url: Arc::clone(&url),
                result: Ok("- point".to_string()),
            },
        );
        let summaries = app.summaries.as_ref().unwrap();
        assert!(summaries.pending.is_empty());
        assert_eq!(summaries.done.get(&url).map(|s| &**s), Some("- point"));

        // A later request for the same article is answered from memory.
        app.request_summary(Arc::clone(&url));
        assert!(app.summaries.as_ref().unwrap().queued.is_none());
    }

    #[test]
    fn test_failed_summary_not_cached() {
        let mut app = app();
        app.summaries = Some(Summaries::new(Arc::new(Echo), "Korean"));
        let url: Arc<str> = Arc::from("https://example.com/post");

        handle_app_event(
            &mut app,
            AppEvent::SummaryReady {
                url: Arc::clone(&url),
                result: Err("timed out".to_string()),
            },
        );
        assert!(app.summaries.as_ref().unwrap().done.is_empty());
        app.request_summary(Arc::clone(&url));
        let queued = app.summaries.as_ref().and_then(|s| s.queued.clone());
        assert_eq!(queued, Some(url));
    }

    #[test]
    fn test_task_panic_sets_status() {
        let mut app = app();
        handle_app_event(
            &mut app,
            AppEvent::TaskPanicked {
                task: "translate",
                error: "boom".to_string(),
            },
        );
        let status = app.status_message.as_ref().map(|(m, _)| m.to_string());
        assert_eq!(status.as_deref(), Some("Internal error in translate task"));
    }
}
