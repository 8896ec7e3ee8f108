use super::*;

use crate::layout::MoveDirection;
use crate::provider::{MutationAction, MutationTarget, ProviderError};

impl App {
    pub fn update(&mut self, message: Message) -> Result<()> {
        match message {
            Message::Key(key) => self.handle_key(key)?,
            Message::Paste(text) => self.handle_paste(&text),
            Message::Resize(width, height) => {
                self.viewport = (width, height);
                self.rederive();
            }
            Message::Tick => self.on_tick(),
            Message::Quit => self.should_quit = true,
            Message::ToggleView => self.toggle_view(),
            Message::ToggleSidebar => {
                self.config.show_sidebar = !self.config.show_sidebar;
                self.persist_config();
                self.rederive();
            }
            Message::NavigateLeft => self.focus_column(MoveDirection::Left),
            Message::NavigateRight => self.focus_column(MoveDirection::Right),
            Message::SelectUp => self.move_selection(-1),
            Message::SelectDown => self.move_selection(1),
            Message::SelectTop => self.select_edge(false),
            Message::SelectBottom => self.select_edge(true),
            Message::PageUp => self.page_selection(false),
            Message::PageDown => self.page_selection(true),
            Message::MoveColumnLeft => self.move_focused_column(MoveDirection::Left),
            Message::MoveColumnRight => self.move_focused_column(MoveDirection::Right),
            Message::StartSearch => self.filter.begin_edit(),
            Message::CommitSearch => self.filter.commit(),
            Message::CancelSearch => {
                self.filter.cancel();
                self.rederive();
            }
            Message::ClearSearch => {
                if !self.filter.query.is_empty() {
                    self.filter.query.clear();
                    self.rederive();
                }
            }
            Message::OpenSettings => {
                let lists = self.store.categories();
                self.overlay = Overlay::Settings(SettingsOverlayState::new(&self.config, lists));
                self.reconcile_overlay();
                self.queue_category_listing();
            }
            Message::CommitSettings => self.commit_settings(),
            Message::OpenEdit => {
                if let Some(item) = self.focused_item().cloned() {
                    self.overlay = Overlay::Edit(EditOverlayState::new(item));
                }
            }
            Message::CommitEdit => self.commit_edit(),
            Message::CloseOverlay => self.overlay = Overlay::None,
            Message::Complete => {
                if let Some(item) = self.focused_item() {
                    let plan = MutationPlan {
                        target: MutationTarget {
                            external_ref: item.external_ref.clone(),
                            category: item.category.clone(),
                        },
                        actions: vec![MutationAction::Complete],
                    };
                    self.queue_mutation(plan);
                }
            }
            Message::Refresh => {
                self.set_notice("Refreshing…", false);
                self.request_refresh();
            }
            Message::RefreshFinished { token, result } => self.finish_refresh(token, result),
            Message::MutationFinished { token, result } => {
                self.pending_tasks = self.pending_tasks.saturating_sub(1);
                match result {
                    Ok(summary) => {
                        info!(token, "{}", summary);
                        self.set_notice(summary, false);
                        self.request_refresh();
                    }
                    Err(err) => {
                        warn!(token, "mutation failed: {}", err);
                        self.set_notice(err.to_string(), true);
                    }
                }
            }
            Message::CategoriesListed { token, result } => match result {
                Ok(lists) => {
                    if let Overlay::Settings(state) = &mut self.overlay {
                        state.merge_lists(lists);
                    }
                    self.reconcile_overlay();
                }
                Err(err) => warn!(token, "listing categories failed: {}", err),
            },
            Message::CommandFinished { token, result } => {
                self.pending_tasks = self.pending_tasks.saturating_sub(1);
                match result {
                    Ok(output) => {
                        info!(token, "custom command finished");
                        let summary = output.unwrap_or_else(|| "Command finished".to_string());
                        self.set_notice(summary, false);
                        self.request_refresh();
                    }
                    Err(err) => {
                        warn!(token, "custom command failed: {}", err);
                        self.set_notice(err.to_string(), true);
                    }
                }
            }
        }
        Ok(())
    }

    fn finish_refresh(&mut self, token: u64, result: Result<Vec<Item>, ProviderError>) {
        let (completion, follow_up) = self.refresh.complete(token);
        if let Some(job) = follow_up {
            self.pending_jobs.push(job);
        }
        if completion == RefreshCompletion::Discard {
            return;
        }

        let focus = self.capture_focus();
        match result {
            Ok(items) => {
                info!(count = items.len(), "reminders refreshed");
                self.store.replace_all(items);
                self.banner = None;
            }
            Err(err) => {
                warn!("refresh failed: {}", err);
                self.banner = Some(err.to_string());
            }
        }
        self.rederive_with(focus);
    }

    fn on_tick(&mut self) {
        if self
            .notice
            .as_ref()
            .is_some_and(|notice| Instant::now() >= notice.expires_at)
        {
            self.notice = None;
        }

        self.now = Utc::now();
        if self.config.days_ahead > 0 {
            self.rederive();
        }

        let interval = self.config.auto_refresh_secs;
        if interval > 0
            && self.banner.is_none()
            && !self.refresh.is_busy()
            && self.last_auto_refresh.elapsed() >= Duration::from_secs(interval)
        {
            info!("auto refresh");
            self.request_refresh();
        }
    }
}
