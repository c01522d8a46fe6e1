//! Application core: event loop, session lifecycle, screen management and
//! action dispatch.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Tabs},
};
use secrecy::SecretString;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tui_input::Input;

use netpulse_config::Config;
use netpulse_core::{
    AlertStore, ConnectionState, Monitor, MonitorConfig, SessionState, Subscription, ViewModel,
};

use crate::action::{Action, Notification, NotificationLevel};
use crate::auth;
use crate::component::Component;
use crate::event::{Event, EventReader};
use crate::screen::ScreenId;
use crate::screens::create_screens;
use crate::screens::login::LoginScreen;
use crate::theme;
use crate::tui::Tui;
use crate::widgets::text_input;

const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

/// Top-level application state and event loop.
pub struct App {
    active_screen: ScreenId,
    screens: HashMap<ScreenId, Box<dyn Component>>,
    /// Overlay shown while the session needs credentials.
    login: LoginScreen,
    running: bool,
    help_visible: bool,
    search_active: bool,
    search: Input,
    action_tx: mpsc::UnboundedSender<Action>,
    action_rx: mpsc::UnboundedReceiver<Action>,

    config: Config,
    profile: String,
    /// Backend settings without a token; each session adds its own.
    base: MonitorConfig,
    /// Token to check on startup, if any.
    startup_token: Option<SecretString>,
    /// A token passed on the command line is never written to or removed
    /// from storage.
    token_from_flag: bool,
    session: SessionState,
    email: Option<String>,

    monitor: Option<Monitor>,
    subscription: Option<Subscription>,
    bridge_cancel: CancellationToken,
    connection: ConnectionState,
    unacknowledged: usize,
    notification: Option<(Notification, Instant)>,
}

impl App {
    pub fn new(
        config: Config,
        profile: String,
        base: MonitorConfig,
        token: Option<SecretString>,
        token_from_flag: bool,
    ) -> Self {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let email = config.profile(&profile).and_then(|p| p.email.clone());
        let login = LoginScreen::new(base.base_url.as_str(), email.clone());

        Self {
            active_screen: ScreenId::Dashboard,
            screens: create_screens().into_iter().collect(),
            login,
            running: true,
            help_visible: false,
            search_active: false,
            search: Input::default(),
            action_tx,
            action_rx,
            config,
            profile,
            base,
            startup_token: token,
            token_from_flag,
            session: SessionState::Anonymous,
            email,
            monitor: None,
            subscription: None,
            bridge_cancel: CancellationToken::new(),
            connection: ConnectionState::default(),
            unacknowledged: 0,
            notification: None,
        }
    }

    fn focus_active_screen(&mut self) {
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            screen.set_focused(true);
        }
    }

    /// Run the main event loop until the user quits.
    pub async fn run(&mut self) -> Result<()> {
        let mut tui = Tui::enter()?;
        self.focus_active_screen();

        match self.startup_token.take() {
            Some(token) => auth::spawn_restore(
                self.base.clone(),
                token,
                self.email.clone(),
                self.action_tx.clone(),
            ),
            None => info!("no stored session, showing login"),
        }

        let mut events = EventReader::spawn(
            Duration::from_millis(250), // 4 Hz tick
            Duration::from_millis(33),  // ~30 FPS render
        );

        info!("TUI event loop started");

        while self.running {
            let Some(event) = events.next().await else {
                break;
            };

            match event {
                Event::Key(key) => {
                    if let Some(action) = self.handle_key_event(key)? {
                        self.action_tx.send(action)?;
                    }
                }
                Event::Tick => self.action_tx.send(Action::Tick)?,
                Event::Render => self.action_tx.send(Action::Render)?,
            }

            while let Ok(action) = self.action_rx.try_recv() {
                self.process_action(&action)?;

                if let Action::Render = action {
                    tui.draw(|frame| self.render(frame))?;
                }
            }
        }

        self.stop_monitor();
        drop(events);
        info!("TUI event loop ended");
        Ok(())
    }

    /// Map a key event to an action. Global keys are handled here;
    /// screen-specific keys go to the active screen.
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
            return Ok(Some(Action::Quit));
        }

        // The login overlay captures everything else until authenticated.
        if !self.session.is_authenticated() {
            return self.login.handle_key_event(key);
        }

        if self.search_active {
            return Ok(match key.code {
                KeyCode::Esc => Some(Action::CloseSearch),
                KeyCode::Enter => Some(Action::SearchSubmit),
                _ if text_input::edit(&mut self.search, key) => {
                    Some(Action::SearchInput(self.search.value().to_owned()))
                }
                _ => None,
            });
        }

        if self.help_visible {
            return Ok(match key.code {
                KeyCode::Esc | KeyCode::Char('?') => Some(Action::ToggleHelp),
                _ => None,
            });
        }

        match (key.modifiers, key.code) {
            (KeyModifiers::NONE, KeyCode::Char('q')) => return Ok(Some(Action::Quit)),
            (_, KeyCode::Char('?')) => return Ok(Some(Action::ToggleHelp)),
            (KeyModifiers::NONE, KeyCode::Char('/')) => return Ok(Some(Action::OpenSearch)),
            (_, KeyCode::Char('L')) => return Ok(Some(Action::Logout)),

            (KeyModifiers::NONE, KeyCode::Char(c @ '1'..='5')) => {
                if let Some(screen) = ScreenId::from_hotkey(c) {
                    return Ok(Some(Action::SwitchScreen(screen)));
                }
            }

            (KeyModifiers::NONE, KeyCode::Tab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.next())));
            }
            (_, KeyCode::BackTab) => {
                return Ok(Some(Action::SwitchScreen(self.active_screen.prev())));
            }

            (KeyModifiers::NONE, KeyCode::Esc) => return Ok(Some(Action::GoBack)),

            _ => {}
        }

        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            return screen.handle_key_event(key);
        }
        Ok(None)
    }

    /// Process a single action: update app state and propagate to
    /// components.
    fn process_action(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::Quit => self.running = false,

            Action::Render => {}

            Action::SwitchScreen(target) => {
                if *target != self.active_screen {
                    debug!("switching screen: {:?} → {:?}", self.active_screen, target);
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(false);
                    }
                    self.active_screen = *target;
                    if let Some(screen) = self.screens.get_mut(&self.active_screen) {
                        screen.set_focused(true);
                    }
                }
            }

            Action::GoBack => self.forward_to_active(action)?,

            Action::ToggleHelp => self.help_visible = !self.help_visible,

            Action::OpenSearch => {
                self.search_active = true;
                self.search.reset();
            }
            Action::CloseSearch => {
                self.search_active = false;
                self.search.reset();
                self.forward_to_active(&Action::SearchInput(String::new()))?;
            }
            // The filter stays applied after Enter.
            Action::SearchSubmit => self.search_active = false,
            Action::SearchInput(_) => self.forward_to_active(action)?,

            Action::Tick => {
                if self
                    .notification
                    .as_ref()
                    .is_some_and(|(_, created)| created.elapsed() > NOTIFICATION_TTL)
                {
                    self.notification = None;
                }
                if self.session.is_authenticated() {
                    self.forward_to_active(action)?;
                } else {
                    self.login.update(action)?;
                }
            }

            Action::ViewUpdated(_) | Action::AlertsUpdated(_) | Action::ConnectionChanged(_) => {
                match action {
                    Action::AlertsUpdated(store) => {
                        self.unacknowledged = store.unacknowledged_count();
                    }
                    Action::ConnectionChanged(state) => self.connection = state.clone(),
                    _ => {}
                }
                for screen in self.screens.values_mut() {
                    if let Some(follow_up) = screen.update(action)? {
                        self.action_tx.send(follow_up)?;
                    }
                }
            }

            Action::SessionChanged(state) => {
                self.session = *state;
                self.login.update(action)?;
            }

            Action::SubmitLogin(form) => {
                auth::spawn_login(self.base.clone(), form.clone(), self.action_tx.clone());
            }

            Action::Authenticated {
                token,
                email,
                fresh,
            } => {
                self.session = SessionState::Authenticated;
                self.login.update(action)?;
                if email.is_some() {
                    self.email.clone_from(email);
                }
                if *fresh {
                    self.persist_token(token);
                }
                self.start_monitor(token.clone());
                if let Some(email) = &self.email {
                    self.notify(NotificationLevel::Success, format!("Signed in as {email}"));
                }
            }

            Action::AuthFailed {
                state, rejected, ..
            } => {
                self.session = *state;
                self.login.update(action)?;
                if *rejected {
                    self.forget_token();
                }
            }

            Action::SessionExpired(reason) => {
                warn!(reason = %reason, "session expired");
                self.stop_monitor();
                self.forget_token();
                self.session = SessionState::Expired;
                self.login.update(action)?;
            }

            Action::Logout => {
                if let Some(monitor) = &self.monitor {
                    auth::spawn_logout(monitor);
                }
                self.stop_monitor();
                // An explicit logout drops the token wherever it came from.
                self.token_from_flag = false;
                self.forget_token();
                self.session = SessionState::Anonymous;
                self.help_visible = false;
                self.search_active = false;
                self.login.update(action)?;
                self.reset_screens()?;
                self.notify(NotificationLevel::Info, "Signed out");
            }

            Action::AcknowledgeAlert(id) => {
                if self.monitor.as_ref().is_some_and(|m| m.acknowledge(id)) {
                    self.notify(NotificationLevel::Success, "Alert acknowledged");
                }
            }

        }
        Ok(())
    }

    fn forward_to_active(&mut self, action: &Action) -> Result<()> {
        if let Some(screen) = self.screens.get_mut(&self.active_screen) {
            if let Some(follow_up) = screen.update(action)? {
                self.action_tx.send(follow_up)?;
            }
        }
        Ok(())
    }

    fn notify(&mut self, level: NotificationLevel, message: impl Into<String>) {
        self.notification = Some((Notification::new(level, message), Instant::now()));
    }

    // ── Session plumbing ────────────────────────────────────────────

    fn start_monitor(&mut self, token: SecretString) {
        self.stop_monitor();
        let monitor = match Monitor::new(self.base.clone().with_token(token)) {
            Ok(monitor) => monitor,
            Err(e) => {
                warn!(error = %e, "failed to build monitor");
                self.notify(NotificationLevel::Error, e.to_string());
                return;
            }
        };

        let subscription = monitor.connect();
        self.bridge_cancel = CancellationToken::new();
        let cancel = self.bridge_cancel.clone();
        let tx = self.action_tx.clone();
        let bridged = monitor.clone();
        tokio::spawn(async move {
            crate::data_bridge::spawn_data_bridge(bridged, tx, cancel).await;
        });

        self.monitor = Some(monitor);
        self.subscription = Some(subscription);
    }

    fn stop_monitor(&mut self) {
        self.bridge_cancel.cancel();
        if let Some(subscription) = self.subscription.take() {
            subscription.disconnect();
        }
        self.monitor = None;
        self.connection = ConnectionState::default();
    }

    fn persist_token(&mut self, token: &SecretString) {
        if self.token_from_flag {
            return;
        }
        let storage = netpulse_config::store_token(&mut self.config, &self.profile, token);
        if let Some(email) = &self.email {
            self.config.profile_mut(&self.profile).email = Some(email.clone());
        }
        match netpulse_config::save_config(&self.config) {
            Ok(path) => debug!(?storage, path = %path.display(), "session saved"),
            Err(e) => {
                warn!(error = %e, "failed to save session");
                self.notify(NotificationLevel::Warning, format!("Session not saved: {e}"));
            }
        }
    }

    fn forget_token(&mut self) {
        if self.token_from_flag {
            return;
        }
        if netpulse_config::clear_token(&mut self.config, &self.profile) {
            if let Err(e) = netpulse_config::save_config(&self.config) {
                warn!(error = %e, "failed to save config after clearing token");
            }
        }
    }

    /// Drop data from the previous session so the next one starts clean.
    fn reset_screens(&mut self) -> Result<()> {
        let cleared = [
            Action::ViewUpdated(std::sync::Arc::new(ViewModel::default())),
            Action::AlertsUpdated(std::sync::Arc::new(AlertStore::new())),
            Action::SearchInput(String::new()),
        ];
        for action in &cleared {
            for screen in self.screens.values_mut() {
                screen.update(action)?;
            }
        }
        self.unacknowledged = 0;
        Ok(())
    }

    // ── Rendering ───────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let banner = self.banner_text();

        let layout = Layout::vertical([
            Constraint::Length(u16::from(banner.is_some())),
            Constraint::Min(1),    // Screen content
            Constraint::Length(1), // Tab bar
            Constraint::Length(1), // Status bar
        ])
        .split(area);

        if let Some(text) = banner {
            frame.render_widget(
                Paragraph::new(format!(" ⚠ {text}")).style(
                    Style::default()
                        .fg(theme::TEXT)
                        .bg(theme::BG_BANNER)
                        .add_modifier(Modifier::BOLD),
                ),
                layout[0],
            );
        }

        if let Some(screen) = self.screens.get(&self.active_screen) {
            screen.render(frame, layout[1]);
        }
        self.render_tab_bar(frame, layout[2]);
        self.render_status_bar(frame, layout[3]);

        if !self.session.is_authenticated() {
            self.login.render(frame, area);
        }

        if let Some((notification, _)) = &self.notification {
            Self::render_notification(frame, area, notification);
        }

        if self.help_visible {
            Self::render_help_overlay(frame, area);
        }
    }

    /// Disconnected banner text, shown only for a live session.
    fn banner_text(&self) -> Option<String> {
        if !self.session.is_authenticated() || self.connection.is_connected {
            return None;
        }
        self.connection
            .last_error
            .as_ref()
            .map(|e| format!("Disconnected: {e}. Retrying…"))
    }

    fn render_tab_bar(&self, frame: &mut Frame, area: Rect) {
        let titles: Vec<Line> = ScreenId::ALL
            .iter()
            .map(|&id| {
                let style = if id == self.active_screen {
                    theme::tab_active()
                } else {
                    theme::tab_inactive()
                };
                let mut spans = vec![Span::styled(
                    format!(" {} {} ", id.hotkey(), id.label()),
                    style,
                )];
                if id == ScreenId::Alerts && self.unacknowledged > 0 {
                    spans.push(Span::styled(
                        format!("({}) ", self.unacknowledged),
                        Style::default()
                            .fg(theme::FLARE_PINK)
                            .add_modifier(Modifier::BOLD),
                    ));
                }
                Line::from(spans)
            })
            .collect();

        let tabs = Tabs::new(titles)
            .divider(Span::styled(" ", theme::key_hint()))
            .select(self.active_screen.index());
        frame.render_widget(tabs, area);
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        if self.search_active {
            text_input::render_field(frame, area, " /", &self.search, false, true);
            return;
        }

        let indicator = match self.session {
            SessionState::Authenticated if self.connection.is_connected => {
                Span::styled("● live", theme::link_up())
            }
            SessionState::Authenticated if self.connection.last_error.is_some() => {
                Span::styled("○ disconnected", theme::link_down())
            }
            SessionState::Authenticated | SessionState::Authenticating => {
                Span::styled("◐ connecting", theme::link_pending())
            }
            SessionState::Anonymous | SessionState::Expired => {
                Span::styled("○ signed out", theme::muted())
            }
        };

        let who = self
            .email
            .as_deref()
            .filter(|_| self.session.is_authenticated())
            .map_or_else(String::new, |e| format!(" │ {e}"));

        let line = Line::from(vec![
            Span::raw(" "),
            indicator,
            Span::styled(who, theme::table_row()),
            Span::styled(
                " │ ? help  / search  L logout  q quit",
                theme::key_hint(),
            ),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_help_overlay(frame: &mut Frame, area: Rect) {
        let help_width = 56u16.min(area.width.saturating_sub(4));
        let help_height = 20u16.min(area.height.saturating_sub(4));
        let x = area.width.saturating_sub(help_width) / 2;
        let y = area.height.saturating_sub(help_height) / 2;
        let help_area = Rect::new(area.x + x, area.y + y, help_width, help_height);

        frame.render_widget(Clear, help_area);
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_PANEL)),
            help_area,
        );

        let block = Block::default()
            .title(" Keyboard Shortcuts ")
            .title_style(theme::title_style())
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(theme::border_focused());
        let inner = block.inner(help_area);
        frame.render_widget(block, help_area);

        let entry = |key: &'static str, what: &'static str| {
            Line::from(vec![
                Span::styled(format!("  {key:<10}"), theme::key_hint_key()),
                Span::styled(what, theme::key_hint()),
            ])
        };
        let heading =
            |text: &'static str| Line::from(Span::styled(text, Style::default().fg(theme::PULSE_TEAL)));

        let help_text = vec![
            Line::from(""),
            heading("  Navigation"),
            entry("1-5", "Jump to screen"),
            entry("Tab", "Next screen"),
            entry("j/k ↑/↓", "Move up/down"),
            entry("g/G", "Top / bottom"),
            entry("Ctrl+d/u", "Page down / up"),
            entry("Enter", "Details"),
            entry("Esc", "Back / close"),
            Line::from(""),
            heading("  Actions"),
            entry("/", "Search"),
            entry("f", "Cycle severity (anomalies)"),
            entry("a", "Acknowledge alert"),
            entry("h", "Hide acknowledged alerts"),
            entry("L", "Sign out"),
            entry("q", "Quit"),
            Line::from(""),
            Line::from(Span::styled("  Esc or ? to close", theme::key_hint())),
        ];
        frame.render_widget(Paragraph::new(help_text), inner);
    }

    fn render_notification(frame: &mut Frame, area: Rect, notif: &Notification) {
        let msg_len = u16::try_from(notif.message.chars().count()).unwrap_or(u16::MAX);
        let width = msg_len.saturating_add(6).clamp(20, 60).min(area.width);
        let height = 3u16;

        let x = area.width.saturating_sub(width + 1);
        let y = area.height.saturating_sub(height + 2); // above status bar
        let toast_area = Rect::new(area.x + x, area.y + y, width, height.min(area.height));

        let (border_color, icon) = match notif.level {
            NotificationLevel::Success => (theme::OK_GREEN, "✓"),
            NotificationLevel::Error => (theme::ALERT_RED, "✗"),
            NotificationLevel::Warning => (theme::AMBER, "!"),
            NotificationLevel::Info => (theme::PULSE_TEAL, "·"),
        };

        frame.render_widget(Clear, toast_area);
        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(border_color))
            .style(Style::default().bg(theme::BG_PANEL));
        let inner = block.inner(toast_area);
        frame.render_widget(block, toast_area);

        let line = Line::from(vec![
            Span::styled(format!(" {icon} "), Style::default().fg(border_color)),
            Span::styled(notif.message.as_str(), Style::default().fg(theme::TEXT)),
        ]);
        frame.render_widget(Paragraph::new(line), inner);
    }
}
