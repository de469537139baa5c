//! The detail pane for the selected post.
//!
//! Shows the post with its comments and offers two mutations, delete and
//! update title. Both mutation controls start over whenever a different post
//! is shown.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
};

use crate::command::Command;
use crate::subscription::Subscription;
use crate::subscription::http::{
    Mutation, MutationResult, MutationState, MutationTracker, Query, QueryResult, QueryState,
};

use super::{BlogContext, Comment, Post, comments_key};

#[derive(Debug, Clone)]
pub enum DetailMessage {
    Comments(QueryResult<Vec<Comment>>),
    Delete,
    Deleted(MutationResult<()>),
    Update,
    Updated(MutationResult<Post>),
}

/// Status texts of one mutation control.
struct StatusText {
    pending: &'static str,
    error: &'static str,
    success: &'static str,
}

const DELETE_STATUS: StatusText = StatusText {
    pending: "Deleting the post...",
    error: "Error deleting the post",
    success: "Post has been deleted",
};

const UPDATE_STATUS: StatusText = StatusText {
    pending: "Updating the post...",
    error: "Error updating the post",
    success: "Post has been updated",
};

pub struct DetailView {
    ctx: BlogContext,
    post: Post,
    comments: QueryState<Vec<Comment>>,
    delete: MutationTracker<()>,
    update: MutationTracker<Post>,
    /// Set once the pane has shown a second post.
    switched: bool,
}

impl DetailView {
    #[must_use]
    pub fn new(ctx: BlogContext, post: Post) -> Self {
        Self {
            ctx,
            post,
            comments: QueryState::Loading,
            delete: MutationTracker::new(),
            update: MutationTracker::new(),
            switched: false,
        }
    }

    /// Switches to `post`.
    ///
    /// A different post id resets both mutations and the comment list before
    /// anything of the new post is rendered.
    pub fn show(&mut self, post: Post) {
        if post.id != self.post.id {
            tracing::debug!(from = self.post.id, to = post.id, "showing another post");
            self.delete.reset();
            self.update.reset();
            self.comments = QueryState::Loading;
            self.switched = true;
        }
        self.post = post;
    }

    #[must_use]
    pub const fn post(&self) -> &Post {
        &self.post
    }

    #[must_use]
    pub const fn comments(&self) -> &QueryState<Vec<Comment>> {
        &self.comments
    }

    #[must_use]
    pub const fn delete_state(&self) -> &MutationState<()> {
        self.delete.state()
    }

    #[must_use]
    pub const fn update_state(&self) -> &MutationState<Post> {
        self.update.state()
    }

    /// The mutation controls are only on screen once comments have loaded.
    const fn controls_visible(&self) -> bool {
        self.comments.is_success()
    }

    #[must_use]
    pub const fn can_delete(&self) -> bool {
        self.controls_visible() && !self.delete.is_pending()
    }

    #[must_use]
    pub const fn can_update(&self) -> bool {
        self.controls_visible() && !self.update.is_pending()
    }

    pub fn update(&mut self, msg: DetailMessage) -> Command<DetailMessage> {
        match msg {
            DetailMessage::Comments(result) => {
                if result.key == comments_key(self.post.id) {
                    self.comments = result.state;
                } else {
                    tracing::debug!(key = %result.key, "dropping comments of another post");
                }
                Command::none()
            }
            DetailMessage::Delete => {
                if !self.controls_visible() {
                    return Command::none();
                }
                let Some(ticket) = self.delete.begin() else {
                    return Command::none();
                };

                tracing::info!(post_id = self.post.id, "deleting post");
                let api = self.ctx.api.clone();
                Mutation::mutate(
                    ticket,
                    self.post.id,
                    move |id| Box::pin(async move { api.delete_post(id).await }),
                    &self.ctx.client,
                )
                .map(DetailMessage::Deleted)
            }
            DetailMessage::Deleted(result) => {
                if !self.delete.settle(result.ticket, result.outcome) {
                    tracing::debug!("discarding delete result of a previous post");
                }
                Command::none()
            }
            DetailMessage::Update => {
                if !self.controls_visible() {
                    return Command::none();
                }
                let Some(ticket) = self.update.begin() else {
                    return Command::none();
                };

                tracing::info!(post_id = self.post.id, "updating post title");
                let api = self.ctx.api.clone();
                Mutation::mutate(
                    ticket,
                    self.post.id,
                    move |id| Box::pin(async move { api.update_post(id).await }),
                    &self.ctx.client,
                )
                .map(DetailMessage::Updated)
            }
            DetailMessage::Updated(result) => {
                if !self.update.settle(result.ticket, result.outcome) {
                    tracing::debug!("discarding update result of a previous post");
                }
                Command::none()
            }
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription<DetailMessage>> {
        let api = self.ctx.api.clone();
        let post_id = self.post.id;

        let mut query = Query::new(
            comments_key(post_id),
            move || {
                let api = api.clone();
                Box::pin(async move { api.fetch_comments(post_id).await })
            },
            self.ctx.client.clone(),
        );
        if self.switched {
            query = query.on_key_change();
        }

        vec![Subscription::new(query).map(DetailMessage::Comments)]
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let lines = match &self.comments {
            QueryState::Loading => vec![Line::from("Loading...")],
            QueryState::Error(error) => vec![
                Line::from("Oops, something went wrong").bold(),
                Line::from(error.to_string()),
            ],
            QueryState::Success { data, .. } => self.post_lines(data),
        };

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(Block::default().borders(Borders::TOP).title("Post"));
        frame.render_widget(paragraph, area);
    }

    fn post_lines(&self, comments: &[Comment]) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                self.post.title.clone(),
                Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            )),
            control("[d] Delete", self.can_delete()),
        ];
        lines.extend(status_line(self.delete.state(), &DELETE_STATUS));
        lines.push(control("[u] Update title", self.can_update()));
        lines.extend(status_line(self.update.state(), &UPDATE_STATUS));

        lines.push(Line::default());
        lines.push(Line::from(self.post.body.clone()));
        lines.push(Line::default());
        lines.push(Line::from("Comments").bold());
        lines.extend(
            comments
                .iter()
                .map(|comment| Line::from(format!("{}: {}", comment.email, comment.body))),
        );
        lines
    }
}

fn control(label: &'static str, enabled: bool) -> Line<'static> {
    let style = if enabled {
        Style::default().add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Line::from(Span::styled(label, style))
}

fn status_line<T>(state: &MutationState<T>, text: &StatusText) -> Option<Line<'static>> {
    let (message, color) = match state {
        MutationState::Idle => return None,
        MutationState::Pending => (text.pending, Color::Magenta),
        MutationState::Error(_) => (text.error, Color::Red),
        MutationState::Success(_) => (text.success, Color::Green),
    };
    Some(Line::from(Span::styled(message, Style::default().fg(color))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::testing::{color_of, comment, offline_context, post, render, serve};
    use crate::subscription::http::{MutationTracker, QueryClient, QueryConfig, QueryError};
    use futures::StreamExt;
    use futures::stream::BoxStream;
    use std::sync::atomic::Ordering;
    use std::time::Duration;
    use tokio::time::timeout;

    fn loaded(post_id: u32) -> DetailView {
        let mut view = DetailView::new(offline_context(), post(post_id));
        view.update(DetailMessage::Comments(QueryResult {
            key: comments_key(post_id),
            state: QueryState::Success {
                data: vec![comment(1, post_id), comment(2, post_id)],
                is_stale: false,
            },
        }));
        view
    }

    fn screen(view: &DetailView) -> String {
        render(60, 16, |frame| view.render(frame, frame.area()))
    }

    #[test]
    fn test_loading_shows_only_loading() {
        let view = DetailView::new(offline_context(), post(1));
        let text = screen(&view);
        assert!(text.contains("Loading..."));
        assert!(!text.contains("title 1"));
        assert!(!text.contains("Delete"));
    }

    #[test]
    fn test_error_hides_post_and_controls() {
        let mut view = DetailView::new(offline_context(), post(1));
        view.update(DetailMessage::Comments(QueryResult {
            key: comments_key(1),
            state: QueryState::Error(QueryError::UnexpectedStatus(500)),
        }));

        let text = screen(&view);
        assert!(text.contains("Oops, something went wrong"));
        assert!(text.contains("Unexpected status: 500"));
        assert!(!text.contains("title 1"));
        assert!(!text.contains("Update title"));
        assert!(!view.can_delete());
    }

    #[test]
    fn test_success_renders_post_and_comments() {
        let view = loaded(1);
        let text = screen(&view);

        assert!(text.contains("title 1"));
        assert!(text.contains("[d] Delete"));
        assert!(text.contains("[u] Update title"));
        assert!(text.contains("body 1"));
        assert!(text.contains("user1@example.com: comment 1"));
        assert!(text.contains("user2@example.com: comment 2"));
        assert_eq!(
            color_of(60, 16, "title 1", |frame| view.render(frame, frame.area())),
            Some(Color::Blue)
        );
    }

    #[test]
    fn test_comments_for_other_post_are_ignored() {
        let mut view = loaded(1);
        view.update(DetailMessage::Comments(QueryResult {
            key: comments_key(2),
            state: QueryState::Loading,
        }));
        assert!(view.comments().is_success());
    }

    #[tokio::test]
    async fn test_delete_lifecycle_and_status_lines() {
        let mut view = loaded(1);
        assert!(view.can_delete());

        let cmd = view.update(DetailMessage::Delete);
        assert!(!cmd.is_none());
        assert!(view.delete_state().is_pending());
        assert!(!view.can_delete());
        assert!(view.can_update(), "update stays enabled");
        assert!(screen(&view).contains("Deleting the post..."));
        assert_eq!(
            color_of(60, 16, "Deleting", |frame| view.render(frame, frame.area())),
            Some(Color::Magenta)
        );

        assert!(view.update(DetailMessage::Delete).is_none(), "no second delete");
    }

    #[tokio::test]
    async fn test_settled_mutations_show_outcome() {
        let mut view = loaded(1);

        // A fresh tracker issues the same first-generation ticket.
        let _delete = view.update(DetailMessage::Delete);
        let _update = view.update(DetailMessage::Update);
        let mut twin_delete = MutationTracker::<()>::new();
        let mut twin_update = MutationTracker::<Post>::new();
        let delete_ticket = twin_delete.begin().expect("starts");
        let update_ticket = twin_update.begin().expect("starts");

        view.update(DetailMessage::Deleted(MutationResult {
            ticket: delete_ticket,
            outcome: Ok(()),
        }));
        view.update(DetailMessage::Updated(MutationResult {
            ticket: update_ticket,
            outcome: Err(QueryError::UnexpectedStatus(404)),
        }));

        let text = screen(&view);
        assert!(text.contains("Post has been deleted"));
        assert!(text.contains("Error updating the post"));
        assert_eq!(
            color_of(60, 16, "has been deleted", |f| view.render(f, f.area())),
            Some(Color::Green)
        );
        assert_eq!(
            color_of(60, 16, "Error updating", |frame| view.render(frame, frame.area())),
            Some(Color::Red)
        );
    }

    #[tokio::test]
    async fn test_switching_post_resets_mutations() {
        let mut view = loaded(1);
        let _cmd = view.update(DetailMessage::Delete);
        let late_ticket = MutationTracker::<()>::new().begin().expect("starts");

        view.show(post(2));
        assert!(view.delete_state().is_idle());
        assert!(view.update_state().is_idle());
        assert!(view.comments().is_loading());
        assert_eq!(view.post().id, 2);

        view.update(DetailMessage::Deleted(MutationResult {
            ticket: late_ticket,
            outcome: Ok(()),
        }));
        assert!(view.delete_state().is_idle(), "late result of post 1 is dropped");
    }

    #[tokio::test]
    async fn test_same_post_keeps_mutation_state() {
        let mut view = loaded(1);
        let _cmd = view.update(DetailMessage::Update);

        view.show(post(1));
        assert!(view.update_state().is_pending());
        assert!(view.comments().is_success());
    }

    #[test]
    fn test_controls_need_loaded_comments() {
        let mut view = DetailView::new(offline_context(), post(1));
        assert!(view.update(DetailMessage::Delete).is_none());
        assert!(view.delete_state().is_idle());
    }

    #[test]
    fn test_subscribes_to_comments_of_post() {
        let view = loaded(3);
        let subs = view.subscriptions();
        assert_eq!(subs.len(), 1);

        let mut other = loaded(4);
        other.show(post(3));
        assert_eq!(other.subscriptions()[0].id(), subs[0].id());
    }

    async fn next_comments(
        stream: &mut BoxStream<'static, DetailMessage>,
    ) -> Option<QueryState<Vec<Comment>>> {
        match timeout(Duration::from_millis(500), stream.next()).await {
            Ok(Some(DetailMessage::Comments(result))) => Some(result.state),
            Ok(other) => panic!("expected comments, got {other:?}"),
            Err(_) => None,
        }
    }

    #[tokio::test]
    async fn test_switched_post_refetches_stale_comments() {
        let client = QueryClient::with_config(QueryConfig::default().without_refetch());
        let (ctx, hits) = serve(client).await;
        ctx.client.set_query_data(comments_key(2), vec![comment(9, 2)]);

        let mut view = DetailView::new(ctx.clone(), post(1));
        view.show(post(2));
        let mut stream = (view.subscriptions().remove(0).spawn)();

        assert_eq!(
            next_comments(&mut stream).await,
            Some(QueryState::Success {
                data: vec![comment(9, 2)],
                is_stale: true
            })
        );
        assert_eq!(
            next_comments(&mut stream).await,
            Some(QueryState::Success {
                data: vec![comment(1, 2), comment(2, 2)],
                is_stale: false
            })
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_post_keeps_stale_comments_without_refetch_on_mount() {
        let client = QueryClient::with_config(QueryConfig::default().without_refetch());
        let (ctx, hits) = serve(client).await;
        ctx.client.set_query_data(comments_key(2), vec![comment(9, 2)]);

        let view = DetailView::new(ctx.clone(), post(2));
        let mut stream = (view.subscriptions().remove(0).spawn)();

        assert!(next_comments(&mut stream).await.is_some_and(|state| state.is_stale()));
        assert_eq!(next_comments(&mut stream).await, None);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
