//! Login overlay shown whenever the session needs credentials.
//!
//! The form is validated locally before anything is sent; a valid form
//! leaves as [`Action::SubmitLogin`] and the app runs the request.

use color_eyre::eyre::Result;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap};
use secrecy::SecretString;
use throbber_widgets_tui::{Throbber, ThrobberState};
use tui_input::Input;

use netpulse_core::{Field, LoginForm, SessionState, ValidationErrors};

use crate::action::Action;
use crate::component::Component;
use crate::theme;
use crate::widgets::text_input;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Email,
    Password,
}

pub struct LoginScreen {
    api_url: String,
    email: Input,
    password: Input,
    focus: Focus,
    session: SessionState,
    errors: Option<ValidationErrors>,
    server_error: Option<String>,
    throbber: ThrobberState,
}

impl LoginScreen {
    pub fn new(api_url: impl Into<String>, email: Option<String>) -> Self {
        let focus = if email.is_some() {
            Focus::Password
        } else {
            Focus::Email
        };
        Self {
            api_url: api_url.into(),
            email: Input::new(email.unwrap_or_default()),
            password: Input::default(),
            focus,
            session: SessionState::Anonymous,
            errors: None,
            server_error: None,
            throbber: ThrobberState::default(),
        }
    }

    fn busy(&self) -> bool {
        self.session == SessionState::Authenticating
    }

    fn submit(&mut self) -> Option<Action> {
        let form = LoginForm {
            email: self.email.value().trim().to_owned(),
            password: SecretString::from(self.password.value().to_owned()),
        };
        self.server_error = None;
        match form.validate() {
            Ok(()) => {
                self.errors = None;
                Some(Action::SubmitLogin(form))
            }
            Err(errors) => {
                if errors.for_field(Field::Password).next().is_some() {
                    self.focus = Focus::Password;
                }
                self.errors = Some(errors);
                None
            }
        }
    }

    fn field_errors(&self, field: Field) -> Vec<Line<'static>> {
        self.errors
            .iter()
            .flat_map(|errs| errs.for_field(field))
            .map(|e| {
                Line::styled(
                    format!("    {}", e.message),
                    Style::default().fg(theme::ALERT_RED),
                )
            })
            .collect()
    }

    fn centered_panel(&self, frame: &mut Frame, area: Rect) -> Rect {
        let panel_w = 60u16.min(area.width.saturating_sub(4));
        let panel_h = 16u16.min(area.height.saturating_sub(2));
        let x = area.width.saturating_sub(panel_w) / 2;
        let y = area.height.saturating_sub(panel_h) / 2;
        let panel = Rect::new(area.x + x, area.y + y, panel_w, panel_h);

        frame.render_widget(Clear, panel);
        frame.render_widget(
            Block::default().style(Style::default().bg(theme::BG_PANEL)),
            panel,
        );

        let heading = if self.session == SessionState::Expired {
            "Session expired"
        } else {
            "Sign in to NetPulse"
        };
        let block = Block::default()
            .title(Line::from(vec![
                Span::raw(" "),
                Span::styled(
                    heading,
                    Style::default()
                        .fg(theme::PULSE_TEAL)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(" "),
            ]))
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(theme::SIGNAL_VIOLET));

        let inner = block.inner(panel);
        frame.render_widget(block, panel);
        inner
    }
}

impl Component for LoginScreen {
    fn handle_key_event(&mut self, key: KeyEvent) -> Result<Option<Action>> {
        if self.busy() {
            return Ok(None);
        }
        match key.code {
            KeyCode::Tab | KeyCode::BackTab | KeyCode::Up | KeyCode::Down => {
                self.focus = match self.focus {
                    Focus::Email => Focus::Password,
                    Focus::Password => Focus::Email,
                };
                Ok(None)
            }
            KeyCode::Enter if self.focus == Focus::Email => {
                self.focus = Focus::Password;
                Ok(None)
            }
            KeyCode::Enter => Ok(self.submit()),
            _ => {
                let input = match self.focus {
                    Focus::Email => &mut self.email,
                    Focus::Password => &mut self.password,
                };
                if text_input::edit(input, key) {
                    self.errors = None;
                }
                Ok(None)
            }
        }
    }

    fn update(&mut self, action: &Action) -> Result<Option<Action>> {
        match action {
            Action::SessionChanged(state) => self.session = *state,
            Action::AuthFailed { state, message, .. } => {
                self.session = *state;
                self.server_error = Some(message.clone());
                self.password.reset();
                self.focus = Focus::Password;
            }
            Action::SessionExpired(reason) => {
                self.session = SessionState::Expired;
                self.server_error = Some(reason.clone());
                self.password.reset();
                self.focus = Focus::Password;
            }
            Action::Authenticated { email, .. } => {
                self.session = SessionState::Authenticated;
                if let Some(email) = email {
                    self.email = Input::new(email.clone());
                }
                self.password.reset();
                self.errors = None;
                self.server_error = None;
            }
            Action::Logout => {
                self.session = SessionState::Anonymous;
                self.focus = Focus::Password;
            }
            Action::Tick if self.busy() => self.throbber.calc_next(),
            _ => {}
        }
        Ok(None)
    }

    fn render(&self, frame: &mut Frame, area: Rect) {
        let inner = self.centered_panel(frame, area);

        let email_errors = self.field_errors(Field::Email);
        let password_errors = self.field_errors(Field::Password);
        let layout = Layout::vertical([
            Constraint::Length(2), // server line
            Constraint::Length(1), // email
            Constraint::Length(u16::try_from(email_errors.len()).unwrap_or(1)),
            Constraint::Length(1), // spacer
            Constraint::Length(1), // password
            Constraint::Length(u16::try_from(password_errors.len()).unwrap_or(1)),
            Constraint::Length(1), // spacer
            Constraint::Min(2),    // status
            Constraint::Length(1), // hints
        ])
        .split(inner);

        frame.render_widget(
            Paragraph::new(Line::from(vec![
                Span::styled("  Server ", theme::key_hint()),
                Span::styled(self.api_url.clone(), theme::table_row()),
            ])),
            layout[0],
        );

        let editable = !self.busy();
        let field_area = |r: Rect| Rect {
            x: r.x + 2,
            width: r.width.saturating_sub(4),
            ..r
        };
        text_input::render_field(
            frame,
            field_area(layout[1]),
            "Email   ",
            &self.email,
            false,
            editable && self.focus == Focus::Email,
        );
        frame.render_widget(Paragraph::new(email_errors), layout[2]);
        text_input::render_field(
            frame,
            field_area(layout[4]),
            "Password",
            &self.password,
            true,
            editable && self.focus == Focus::Password,
        );
        frame.render_widget(Paragraph::new(password_errors), layout[5]);

        if self.busy() {
            let throbber = Throbber::default()
                .label("  Signing in…")
                .style(Style::default().fg(theme::PULSE_TEAL))
                .throbber_style(Style::default().fg(theme::SIGNAL_VIOLET));
            frame.render_stateful_widget(throbber, layout[7], &mut self.throbber.clone());
        } else {
            let form_errors = self.field_errors(Field::Form);
            let mut status: Vec<Line> = form_errors;
            if let Some(err) = &self.server_error {
                status.push(Line::styled(
                    format!("  {err}"),
                    Style::default().fg(theme::ALERT_RED),
                ));
            }
            frame.render_widget(
                Paragraph::new(status).wrap(Wrap { trim: false }),
                layout[7],
            );
        }

        let hints = Line::from(vec![
            Span::styled("  Tab ", theme::key_hint_key()),
            Span::styled("switch field  ", theme::key_hint()),
            Span::styled("Enter ", theme::key_hint_key()),
            Span::styled("sign in  ", theme::key_hint()),
            Span::styled("Ctrl+C ", theme::key_hint_key()),
            Span::styled("quit", theme::key_hint()),
        ]);
        frame.render_widget(Paragraph::new(hints), layout[8]);
    }
}
