use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};

use crate::config::AppConfig;
use crate::membership::{ApplyOutcome, MembershipScreen, PrefEvent};
use crate::prefs::PreferenceStore;

/// How long a status message stays on the info line
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Membership,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App {
    pub screen: Screen,
    pub popup: Popup,

    pub config: AppConfig,
    pub membership: MembershipScreen,

    /// Where preferences live, shown in the membership box
    pub storage_location: String,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    // Storage completions from the membership screen
    pref_events: UnboundedReceiver<PrefEvent>,
}

impl App {
    pub fn new(config: AppConfig, store: PreferenceStore) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let storage_location = store.describe();

        Self {
            screen: Screen::Home,
            popup: Popup::None,
            config,
            membership: MembershipScreen::new(store, tx),
            storage_location,
            status_message: None,
            status_message_time: None,
            pref_events: rx,
        }
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    pub fn show_screen(&mut self, screen: Screen) {
        if self.screen == screen {
            return;
        }
        if self.membership.is_active() {
            self.membership.leave();
        }
        self.screen = screen;
        if screen == Screen::Membership {
            self.membership.enter();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        // Handle popups first
        if self.popup != Popup::None {
            if matches!(
                key.code,
                KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q') | KeyCode::Enter
            ) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::Membership => self.handle_membership_key(key),
        }
        Ok(())
    }

    fn handle_home_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Char('m') => {
                self.show_screen(Screen::Membership)
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    fn handle_membership_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Esc => self.show_screen(Screen::Home),
            KeyCode::Enter => {
                if self.membership.submit() {
                    self.set_status("Saving...");
                }
            }
            KeyCode::Backspace => self.membership.backspace(),
            KeyCode::Char(c) => self.membership.push_char(c),
            _ => {}
        }
    }

    /// Apply finished storage work and expire old status messages
    pub fn tick(&mut self) {
        while let Ok(event) = self.pref_events.try_recv() {
            self.apply_pref_event(event);
        }

        if let Some(time) = self.status_message_time {
            if time.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    fn apply_pref_event(&mut self, event: PrefEvent) {
        match self.membership.apply(event) {
            ApplyOutcome::Saved(name) if name.is_empty() => self.set_status("Name cleared"),
            ApplyOutcome::Saved(name) => self.set_status(format!("Saved name: {}", name)),
            ApplyOutcome::Failed(e) => self.set_status(format!("Error: {}", e)),
            ApplyOutcome::Loaded | ApplyOutcome::Stale => {}
        }
    }

    pub fn can_quit_with(&self, key: &KeyEvent) -> bool {
        key.code == KeyCode::Char('q') && self.popup == Popup::None && self.screen == Screen::Home
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prefs::{MemoryBackend, USER_NAME_KEY};
    use crossterm::event::KeyModifiers;
    use std::sync::Arc;

    fn app_with(backend: Arc<MemoryBackend>) -> App {
        App::new(AppConfig::default(), PreferenceStore::new(backend))
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE)).unwrap();
    }

    fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    /// Let spawned storage tasks finish and apply their results
    async fn settle(app: &mut App) {
        for _ in 0..100 {
            tokio::task::yield_now().await;
            app.tick();
            if !app.membership.is_loading() && !app.membership.is_saving() {
                return;
            }
        }
        panic!("storage work did not settle");
    }

    #[tokio::test]
    async fn test_membership_round_trip_through_keys() {
        let backend = Arc::new(MemoryBackend::new());
        let mut app = app_with(backend.clone());

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.screen, Screen::Membership);
        settle(&mut app).await;
        assert_eq!(app.membership.displayed_name(), None);

        type_text(&mut app, "Alex");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(app.membership.displayed_name(), Some("Alex"));
        assert_eq!(app.status_message.as_deref(), Some("Saved name: Alex"));

        let store = PreferenceStore::new(backend);
        assert_eq!(store.load(USER_NAME_KEY).await.unwrap(), "Alex");
    }

    #[tokio::test]
    async fn test_reentering_reloads_saved_name() {
        let backend = Arc::new(MemoryBackend::new());
        let mut app = app_with(backend.clone());

        app.show_screen(Screen::Membership);
        settle(&mut app).await;
        type_text(&mut app, "Sam");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.screen, Screen::Home);
        assert!(!app.membership.is_active());

        press(&mut app, KeyCode::Char('m'));
        settle(&mut app).await;
        assert_eq!(app.membership.displayed_name(), Some("Sam"));
        assert_eq!(app.membership.input(), "Sam");
    }

    #[tokio::test]
    async fn test_leaving_before_load_completes_discards_result() {
        let backend = Arc::new(MemoryBackend::new());
        PreferenceStore::new(backend.clone()).save(USER_NAME_KEY, "Alex").await.unwrap();
        let mut app = app_with(backend);

        app.show_screen(Screen::Membership);
        app.show_screen(Screen::Home);
        for _ in 0..10 {
            tokio::task::yield_now().await;
            app.tick();
        }

        assert_eq!(app.membership.displayed_name(), None);
        assert!(app.status_message.is_none());
    }

    #[tokio::test]
    async fn test_save_failure_reports_error() {
        let backend = Arc::new(MemoryBackend::new());
        let mut app = app_with(backend.clone());

        app.show_screen(Screen::Membership);
        settle(&mut app).await;
        backend.set_available(false);

        type_text(&mut app, "Alex");
        press(&mut app, KeyCode::Enter);
        settle(&mut app).await;

        assert_eq!(app.membership.displayed_name(), None);
        assert!(app.status_message.as_deref().unwrap_or("").starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_typing_q_on_membership_does_not_quit() {
        let mut app = app_with(Arc::new(MemoryBackend::new()));
        let q = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        assert!(app.can_quit_with(&q));

        app.show_screen(Screen::Membership);
        assert!(!app.can_quit_with(&q));
        app.handle_key(q).unwrap();
        assert_eq!(app.membership.input(), "q");
    }

    #[test]
    fn test_help_popup_toggles() {
        let mut app = app_with(Arc::new(MemoryBackend::new()));

        press(&mut app, KeyCode::Char('?'));
        assert_eq!(app.popup, Popup::Help);
        // Keys go to the popup, not the screen
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.screen, Screen::Home);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.popup, Popup::None);
    }
}
