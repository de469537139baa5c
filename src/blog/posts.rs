//! The paginated post list.
//!
//! Owns the page counter, the cursor and the selected post, and renders the
//! detail pane for the selection below the list.

use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};

use crate::command::Command;
use crate::subscription::Subscription;
use crate::subscription::http::{Query, QueryKey, QueryResult, QueryState};

use super::api::POSTS_PER_PAGE;
use super::post_detail::{DetailMessage, DetailView};
use super::{BlogContext, Post, posts_key};

/// Last page of the list.
pub const MAX_POST_PAGE: u32 = 10;

/// Stale time of list pages and of the next-page prefetch.
pub const PAGE_STALE_TIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub enum PostsMessage {
    Page(QueryResult<Vec<Post>>),
    PreviousPage,
    NextPage,
    CursorUp,
    CursorDown,
    Select,
    Detail(DetailMessage),
}

pub struct PostsView {
    ctx: BlogContext,
    page: u32,
    posts: QueryState<Vec<Post>>,
    cursor: usize,
    selected: Option<Post>,
    detail: Option<DetailView>,
    /// Set once the list has moved away from its first page.
    paged: bool,
}

impl PostsView {
    /// Starts on page 1 and prefetches page 2.
    pub fn new(ctx: BlogContext) -> (Self, Command<PostsMessage>) {
        let view = Self {
            ctx,
            page: 1,
            posts: QueryState::Loading,
            cursor: 0,
            selected: None,
            detail: None,
            paged: false,
        };
        let cmd = view.prefetch_next();
        (view, cmd)
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub fn page_key(&self) -> QueryKey {
        posts_key(self.page)
    }

    #[must_use]
    pub const fn posts(&self) -> &QueryState<Vec<Post>> {
        &self.posts
    }

    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    #[must_use]
    pub const fn selected(&self) -> Option<&Post> {
        self.selected.as_ref()
    }

    #[must_use]
    pub const fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    #[must_use]
    pub const fn can_go_previous(&self) -> bool {
        self.page > 1
    }

    #[must_use]
    pub const fn can_go_next(&self) -> bool {
        self.page < MAX_POST_PAGE
    }

    fn prefetch_next(&self) -> Command<PostsMessage> {
        if !self.can_go_next() {
            return Command::none();
        }

        let next = self.page + 1;
        let api = self.ctx.api.clone();
        self.ctx.client.prefetch_query(
            posts_key(next),
            move || Box::pin(async move { api.fetch_posts(next).await }),
            PAGE_STALE_TIME,
        )
    }

    fn go_to(&mut self, page: u32) -> Command<PostsMessage> {
        tracing::debug!(from = self.page, to = page, "changing page");
        self.page = page;
        self.paged = true;
        self.cursor = 0;
        self.prefetch_next()
    }

    fn visible_posts(&self) -> &[Post] {
        self.posts.data().map(Vec::as_slice).unwrap_or_default()
    }

    pub fn update(&mut self, msg: PostsMessage) -> Command<PostsMessage> {
        match msg {
            PostsMessage::Page(result) => {
                if result.key != self.page_key() {
                    tracing::debug!(key = %result.key, "dropping result of another page");
                    return Command::none();
                }
                let previous = std::mem::replace(&mut self.posts, QueryState::Loading);
                self.posts = result.state.or_previous(previous);
                self.cursor = self.cursor.min(self.visible_posts().len().saturating_sub(1));
                Command::none()
            }
            PostsMessage::PreviousPage if self.can_go_previous() => self.go_to(self.page - 1),
            PostsMessage::NextPage if self.can_go_next() => self.go_to(self.page + 1),
            PostsMessage::PreviousPage | PostsMessage::NextPage => Command::none(),
            PostsMessage::CursorUp => {
                self.cursor = self.cursor.saturating_sub(1);
                Command::none()
            }
            PostsMessage::CursorDown => {
                let last = self.visible_posts().len().saturating_sub(1);
                self.cursor = (self.cursor + 1).min(last);
                Command::none()
            }
            PostsMessage::Select => {
                let Some(post) = self.visible_posts().get(self.cursor).cloned() else {
                    return Command::none();
                };

                tracing::debug!(post_id = post.id, "selected post");
                self.selected = Some(post.clone());
                if let Some(detail) = &mut self.detail {
                    detail.show(post);
                } else {
                    self.detail = Some(DetailView::new(self.ctx.clone(), post));
                }
                Command::none()
            }
            PostsMessage::Detail(msg) => match &mut self.detail {
                Some(detail) => detail.update(msg).map(PostsMessage::Detail),
                None => Command::none(),
            },
        }
    }

    pub fn subscriptions(&self) -> Vec<Subscription<PostsMessage>> {
        let api = self.ctx.api.clone();
        let page = self.page;

        let mut query = Query::new(
            posts_key(page),
            move || {
                let api = api.clone();
                Box::pin(async move { api.fetch_posts(page).await })
            },
            self.ctx.client.clone(),
        )
        .stale_time(PAGE_STALE_TIME);
        if self.paged {
            query = query.on_key_change();
        }

        let mut subs = vec![Subscription::new(query).map(PostsMessage::Page)];

        if let Some(detail) = &self.detail {
            subs.extend(
                detail
                    .subscriptions()
                    .into_iter()
                    .map(|sub| sub.map(PostsMessage::Detail)),
            );
        }
        subs
    }

    pub fn render(&self, frame: &mut Frame<'_>, area: Rect) {
        let list_height = u16::try_from(POSTS_PER_PAGE).unwrap_or(u16::MAX).saturating_add(2);
        let [list_area, pager_area, detail_area] = Layout::vertical([
            Constraint::Length(list_height),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(area);

        self.render_list(frame, list_area);
        frame.render_widget(Paragraph::new(self.pager_line()), pager_area);

        if let Some(detail) = &self.detail {
            detail.render(frame, detail_area);
        }
    }

    fn render_list(&self, frame: &mut Frame<'_>, area: Rect) {
        match &self.posts {
            QueryState::Loading => {
                let loading = Paragraph::new("Loading...")
                    .block(Block::default().borders(Borders::ALL).title("Posts"));
                frame.render_widget(loading, area);
            }
            QueryState::Error(error) => {
                let lines = vec![
                    Line::from("Oops, something went wrong").bold(),
                    Line::from(error.to_string()),
                ];
                let failed = Paragraph::new(lines)
                    .block(Block::default().borders(Borders::ALL).title("Posts"));
                frame.render_widget(failed, area);
            }
            QueryState::Success { data, is_stale } => {
                let title = if *is_stale {
                    "Posts (stale)"
                } else {
                    "Posts"
                };
                let selected_id = self.selected.as_ref().map(|post| post.id);
                let items: Vec<ListItem> = data
                    .iter()
                    .map(|post| {
                        let marker = if Some(post.id) == selected_id { "* " } else { "  " };
                        ListItem::new(format!("{marker}{}", post.title))
                    })
                    .collect();

                let list = List::new(items)
                    .block(Block::default().borders(Borders::ALL).title(title))
                    .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
                let mut state = ListState::default().with_selected(Some(self.cursor));
                frame.render_stateful_widget(list, area, &mut state);
            }
        }
    }

    fn pager_line(&self) -> Line<'static> {
        let button = |label: &'static str, enabled: bool| {
            if enabled {
                Span::raw(label)
            } else {
                Span::styled(label, Style::default().fg(Color::DarkGray))
            }
        };

        Line::from(vec![
            button("[←] Previous page", self.can_go_previous()),
            Span::raw(format!("   Page {}   ", self.page)),
            button("[→] Next page", self.can_go_next()),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::testing::{color_of, offline_context, page, post, render, serve};
    use crate::command::tests::drain;
    use crate::subscription::http::{QueryClient, QueryConfig, QueryError};
    use futures::StreamExt;
    use futures::stream::BoxStream;
    use std::sync::atomic::Ordering;
    use tokio::time::timeout;

    fn loaded(page: u32, data: Vec<Post>) -> PostsMessage {
        PostsMessage::Page(QueryResult {
            key: posts_key(page),
            state: QueryState::Success {
                data,
                is_stale: false,
            },
        })
    }

    fn view() -> PostsView {
        let (view, _prefetch) = PostsView::new(offline_context());
        view
    }

    fn screen(view: &PostsView) -> String {
        render(60, 30, |frame| view.render(frame, frame.area()))
    }

    #[test]
    fn test_starts_on_first_page_loading() {
        let view = view();
        assert_eq!(view.page(), 1);
        assert!(view.posts().is_loading());
        assert!(!view.can_go_previous());
        assert!(view.can_go_next());
        assert!(screen(&view).contains("Loading..."));
    }

    #[test]
    fn test_new_prefetches_second_page() {
        let (_view, cmd) = PostsView::new(offline_context());
        assert!(!cmd.is_none());
    }

    #[test]
    fn test_paging_is_bounded() {
        let mut view = view();
        assert!(view.update(PostsMessage::PreviousPage).is_none());
        assert_eq!(view.page(), 1);

        for _ in 1..MAX_POST_PAGE {
            let _prefetch = view.update(PostsMessage::NextPage);
        }
        assert_eq!(view.page(), MAX_POST_PAGE);
        assert!(!view.can_go_next());
        assert!(
            view.update(PostsMessage::NextPage).is_none(),
            "last page neither advances nor prefetches"
        );
        assert_eq!(view.page(), MAX_POST_PAGE);
    }

    async fn next_page_state(
        stream: &mut BoxStream<'static, PostsMessage>,
    ) -> QueryState<Vec<Post>> {
        match timeout(Duration::from_secs(2), stream.next()).await {
            Ok(Some(PostsMessage::Page(result))) => result.state,
            other => panic!("expected a page result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_page_change_prefetches_following_page_in_background() {
        let (ctx, hits) = serve(QueryClient::new()).await;
        let (mut view, first_prefetch) = PostsView::new(ctx.clone());
        assert!(drain(first_prefetch).await.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(ctx.client.get_query_data::<Vec<Post>>(&posts_key(2)), Some(page(2)));

        view.update(loaded(1, page(1)));
        let prefetch = view.update(PostsMessage::NextPage);
        assert_eq!(view.page(), 2);
        let shown = view.posts().clone();

        assert!(drain(prefetch).await.is_empty(), "prefetch yields no message");
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(ctx.client.get_query_data::<Vec<Post>>(&posts_key(3)), Some(page(3)));
        assert_eq!(view.posts(), &shown);
        assert_eq!(view.posts().data(), Some(&page(1)));
        assert_eq!(view.page(), 2);
    }

    #[tokio::test]
    async fn test_stale_page_is_refetched_after_page_change() {
        let client = QueryClient::with_config(QueryConfig::default().without_refetch());
        let (ctx, hits) = serve(client).await;
        let (mut view, first_prefetch) = PostsView::new(ctx.clone());
        drain(first_prefetch).await;

        tokio::time::pause();
        tokio::time::advance(PAGE_STALE_TIME + Duration::from_secs(1)).await;
        tokio::time::resume();

        drain(view.update(PostsMessage::NextPage)).await;
        assert_eq!(hits.load(Ordering::SeqCst), 2, "pages 2 and 3");

        let page_query = view.subscriptions().remove(0);
        let mut stream = (page_query.spawn)();

        assert_eq!(
            next_page_state(&mut stream).await,
            QueryState::Success {
                data: page(2),
                is_stale: true
            }
        );
        assert_eq!(
            next_page_state(&mut stream).await,
            QueryState::Success {
                data: page(2),
                is_stale: false
            }
        );
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_previous_page_is_kept_while_next_loads() {
        let mut view = view();
        view.update(loaded(1, page(1)));
        let _prefetch = view.update(PostsMessage::NextPage);

        view.update(PostsMessage::Page(QueryResult {
            key: posts_key(2),
            state: QueryState::Loading,
        }));
        assert_eq!(view.posts().data(), Some(&page(1)));

        view.update(loaded(2, page(2)));
        assert_eq!(view.posts().data(), Some(&page(2)));
    }

    #[test]
    fn test_results_for_other_pages_are_ignored() {
        let mut view = view();
        view.update(loaded(1, page(1)));
        let _prefetch = view.update(PostsMessage::NextPage);

        view.update(loaded(1, vec![post(99)]));
        assert_eq!(view.posts().data(), Some(&page(1)));
    }

    #[test]
    fn test_error_replaces_previous_data() {
        let mut view = view();
        view.update(loaded(1, page(1)));
        view.update(PostsMessage::Page(QueryResult {
            key: posts_key(1),
            state: QueryState::Error(QueryError::NetworkError("refused".into())),
        }));

        let text = screen(&view);
        assert!(text.contains("Oops, something went wrong"));
        assert!(text.contains("Network error: refused"));
        assert!(!text.contains("title 1"));
    }

    #[test]
    fn test_cursor_and_selection() {
        let mut view = view();
        view.update(loaded(1, page(1)));

        view.update(PostsMessage::CursorUp);
        assert_eq!(view.cursor(), 0);
        view.update(PostsMessage::CursorDown);
        view.update(PostsMessage::CursorDown);
        assert_eq!(view.cursor(), 2);

        view.update(PostsMessage::Select);
        assert_eq!(view.selected().map(|p| p.id), Some(3));
        assert_eq!(view.detail().map(|d| d.post().id), Some(3));
        assert_eq!(view.subscriptions().len(), 2, "list and comments");

        for _ in 0..20 {
            view.update(PostsMessage::CursorDown);
        }
        assert_eq!(view.cursor(), 9);
        view.update(PostsMessage::Select);
        assert_eq!(view.detail().map(|d| d.post().id), Some(10));
    }

    #[test]
    fn test_select_without_data_does_nothing() {
        let mut view = view();
        view.update(PostsMessage::Select);
        assert!(view.selected().is_none());
        assert!(view.detail().is_none());
        assert_eq!(view.subscriptions().len(), 1);
    }

    #[test]
    fn test_render_list_and_pager() {
        let mut view = view();
        view.update(loaded(1, page(1)));
        view.update(PostsMessage::Select);

        let text = screen(&view);
        assert!(text.contains("* title 1"));
        assert!(text.contains("title 10"));
        assert!(text.contains("Page 1"));
        assert!(text.contains("Loading..."), "detail pane waits for comments");
        assert_eq!(
            color_of(60, 30, "[←] Previous page", |f| view.render(f, f.area())),
            Some(Color::DarkGray)
        );
    }

    #[test]
    fn test_detail_messages_are_forwarded() {
        let mut view = view();
        view.update(loaded(1, page(1)));
        view.update(PostsMessage::Select);

        view.update(PostsMessage::Detail(DetailMessage::Comments(QueryResult {
            key: crate::blog::comments_key(1),
            state: QueryState::Success {
                data: vec![],
                is_stale: false,
            },
        })));
        assert!(view.detail().is_some_and(|d| d.comments().is_success()));
    }
}
