use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::application::Application;
use crate::command::{Action, Command};
use crate::notify::{Toast, Toaster};
use crate::subscription::Subscription;
use crate::subscription::http::{QueryClient, QueryConfig, QueryKey};
use crate::subscription::terminal::TerminalEvents;
use crate::subscription::time::Timer;

use super::post_detail::DetailMessage;
use super::posts::{PostsMessage, PostsView};
use super::{BlogApi, BlogContext};

/// Period of the cache sweep and toast expiry.
const HOUSEKEEPING_INTERVAL_MS: u64 = 1000;

const HELP: &str =
    "←/→ page  ↑/↓ move  enter open  d delete  u update  r refresh  x dismiss  q quit";

/// Startup configuration of [`BlogApp`].
#[derive(Debug, Clone)]
pub struct AppFlags {
    pub api: BlogApi,
    pub config: QueryConfig,
}

#[derive(Debug)]
pub enum Message {
    Terminal(Event),
    TerminalError(String),
    Posts(PostsMessage),
    Toast(Option<Toast>),
    Housekeeping,
}

pub struct BlogApp {
    ctx: BlogContext,
    toaster: Toaster,
    toast: Option<Toast>,
    posts: PostsView,
}

impl BlogApp {
    #[must_use]
    pub const fn context(&self) -> &BlogContext {
        &self.ctx
    }

    #[must_use]
    pub const fn posts(&self) -> &PostsView {
        &self.posts
    }

    #[must_use]
    pub const fn toast(&self) -> Option<&Toast> {
        self.toast.as_ref()
    }

    fn on_posts(&mut self, msg: PostsMessage) -> Command<Message> {
        self.posts.update(msg).map(Message::Posts)
    }

    fn on_key(&mut self, key: KeyEvent) -> Command<Message> {
        if key.kind != KeyEventKind::Press {
            return Command::none();
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => Command::effect(Action::Quit),
            KeyCode::Left | KeyCode::Char('h') => self.on_posts(PostsMessage::PreviousPage),
            KeyCode::Right | KeyCode::Char('l') => self.on_posts(PostsMessage::NextPage),
            KeyCode::Up | KeyCode::Char('k') => self.on_posts(PostsMessage::CursorUp),
            KeyCode::Down | KeyCode::Char('j') => self.on_posts(PostsMessage::CursorDown),
            KeyCode::Enter => self.on_posts(PostsMessage::Select),
            KeyCode::Char('d') => self.on_posts(PostsMessage::Detail(DetailMessage::Delete)),
            KeyCode::Char('u') => self.on_posts(PostsMessage::Detail(DetailMessage::Update)),
            KeyCode::Char('r') => Command::batch([
                self.ctx.client.invalidate(&QueryKey::new("posts")),
                self.ctx.client.invalidate(&QueryKey::new("comments")),
            ]),
            KeyCode::Char('x') => {
                self.toaster.close_all();
                Command::none()
            }
            _ => Command::none(),
        }
    }

    fn render_toast(frame: &mut Frame<'_>, toast: &Toast) {
        let area = frame.area();
        let width = area.width.min(48);
        let popup = Rect {
            x: area.x + area.width - width,
            y: area.y,
            width,
            height: area.height.min(4),
        };

        let body = Paragraph::new(toast.title.as_str())
            .wrap(Wrap { trim: true })
            .style(Style::default().fg(Color::Red))
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Error")
                    .title_bottom(Line::from("x to dismiss").right_aligned()),
            );
        frame.render_widget(Clear, popup);
        frame.render_widget(body, popup);
    }
}

impl Application for BlogApp {
    type Message = Message;
    type Flags = AppFlags;

    fn new(flags: AppFlags) -> (Self, Command<Message>) {
        let toaster = Toaster::new();
        let client = QueryClient::with_config(toaster.error_handler(flags.config));
        let ctx = BlogContext::new(client, flags.api);
        let (posts, cmd) = PostsView::new(ctx.clone());

        tracing::info!(api = ctx.api.base_url(), "blog reader started");
        let app = Self {
            ctx,
            toaster,
            toast: None,
            posts,
        };
        (app, cmd.map(Message::Posts))
    }

    fn update(&mut self, msg: Message) -> Command<Message> {
        match msg {
            Message::Terminal(Event::Key(key)) => self.on_key(key),
            Message::Terminal(Event::FocusGained) => self.ctx.client.window_focused(),
            Message::Terminal(_) => Command::none(),
            Message::TerminalError(error) => {
                tracing::error!(%error, "terminal input failed");
                Command::effect(Action::Quit)
            }
            Message::Posts(msg) => self.on_posts(msg),
            Message::Toast(toast) => {
                self.toast = toast;
                Command::none()
            }
            Message::Housekeeping => {
                let evicted = self.ctx.client.garbage_collect();
                if evicted > 0 {
                    tracing::debug!(evicted, "swept query cache");
                }
                self.toaster.expire();
                Command::none()
            }
        }
    }

    fn view(&self, frame: &mut Frame<'_>) {
        let [header, body] =
            Layout::vertical([Constraint::Length(1), Constraint::Min(0)]).areas(frame.area());

        frame.render_widget(
            Paragraph::new(Line::from(vec!["blogem ".bold(), HELP.dark_gray()])),
            header,
        );
        self.posts.render(frame, body);

        if let Some(toast) = &self.toast {
            Self::render_toast(frame, toast);
        }
    }

    fn subscriptions(&self) -> Vec<Subscription<Message>> {
        let mut subs = vec![
            Subscription::new(TerminalEvents::new()).map(|result| match result {
                Ok(event) => Message::Terminal(event),
                Err(e) => Message::TerminalError(e.to_string()),
            }),
            Subscription::new(Timer::new(HOUSEKEEPING_INTERVAL_MS)).map(|_| Message::Housekeeping),
            Subscription::new(self.toaster.source()).map(Message::Toast),
        ];
        subs.extend(
            self.posts
                .subscriptions()
                .into_iter()
                .map(|sub| sub.map(Message::Posts)),
        );
        subs
    }
}
