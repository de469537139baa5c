use ratatui::Frame;

use crate::{command::Command, subscription::Subscription};

/// A terminal application following the Elm Architecture.
///
/// The runtime owns the value, feeds it messages one at a time through
/// [`update`](Application::update), redraws it with
/// [`view`](Application::view) and, after every update, re-reads
/// [`subscriptions`](Application::subscriptions) to start and stop sources.
///
/// # Example
///
/// ```
/// use ratatui::Frame;
/// use blogem::{application::Application, command::Command, subscription::Subscription};
///
/// #[derive(Debug, Clone)]
/// enum Message {
///     NextPage,
///     PreviousPage,
/// }
///
/// struct Pager {
///     page: u32,
/// }
///
/// impl Application for Pager {
///     type Message = Message;
///     type Flags = u32; // first page
///
///     fn new(page: u32) -> (Self, Command<Message>) {
///         (Pager { page }, Command::none())
///     }
///
///     fn update(&mut self, msg: Message) -> Command<Message> {
///         match msg {
///             Message::NextPage => self.page += 1,
///             Message::PreviousPage => self.page = self.page.saturating_sub(1).max(1),
///         }
///         Command::none()
///     }
///
///     fn view(&self, frame: &mut Frame<'_>) {
///         // Render UI here
///     }
///
///     fn subscriptions(&self) -> Vec<Subscription<Message>> {
///         vec![]
///     }
/// }
/// ```
pub trait Application: Sized {
    /// Everything that can happen to the application.
    ///
    /// Messages come from subscriptions (keys, timers, query results) and
    /// from the commands returned by `new` and `update`.
    type Message: Send + 'static;

    /// Startup configuration passed to [`new`](Application::new).
    type Flags: Send;

    /// Builds the initial state and the command to run at startup.
    ///
    /// # Examples
    ///
    /// ```
    /// # use blogem::{application::Application, command::Command};
    /// # use ratatui::Frame;
    /// # use blogem::subscription::Subscription;
    /// # struct MyApp { ready: bool }
    /// # enum Message { Ready }
    /// # impl Application for MyApp {
    /// #     type Message = Message;
    /// #     type Flags = ();
    /// fn new(_flags: ()) -> (Self, Command<Message>) {
    ///     let cmd = Command::perform(async { /* warm up */ }, |()| Message::Ready);
    ///     (MyApp { ready: false }, cmd)
    /// }
    /// #     fn update(&mut self, msg: Message) -> Command<Message> { Command::none() }
    /// #     fn view(&self, frame: &mut Frame<'_>) {}
    /// #     fn subscriptions(&self) -> Vec<Subscription<Message>> { vec![] }
    /// # }
    /// ```
    fn new(flags: Self::Flags) -> (Self, Command<Self::Message>);

    /// Applies a message to the state.
    ///
    /// Every state change happens here. Side effects are returned as a
    /// command instead of being performed inline.
    ///
    /// # Examples
    ///
    /// ```
    /// # use blogem::{application::Application, command::{Command, Action}};
    /// # use ratatui::Frame;
    /// # use blogem::subscription::Subscription;
    /// # struct MyApp;
    /// # enum Message { Refresh, Quit }
    /// # impl Application for MyApp {
    /// #     type Message = Message;
    /// #     type Flags = ();
    /// #     fn new(_: ()) -> (Self, Command<Message>) { (MyApp, Command::none()) }
    /// fn update(&mut self, msg: Message) -> Command<Message> {
    ///     match msg {
    ///         Message::Refresh => Command::task(async { /* invalidate */ }),
    ///         Message::Quit => Command::effect(Action::Quit),
    ///     }
    /// }
    /// #     fn view(&self, frame: &mut Frame<'_>) {}
    /// #     fn subscriptions(&self) -> Vec<Subscription<Message>> { vec![] }
    /// # }
    /// ```
    fn update(&mut self, msg: Self::Message) -> Command<Self::Message>;

    /// Renders the current state.
    ///
    /// Must only read from `self`.
    fn view(&self, frame: &mut Frame<'_>);

    /// The sources the application wants to hear from right now.
    ///
    /// Called after startup and after every update. Sources are diffed by
    /// id, so returning the same list again costs nothing.
    ///
    /// # Examples
    ///
    /// ```
    /// # use blogem::{application::Application, command::Command, subscription::Subscription};
    /// # use ratatui::Frame;
    /// # struct MyApp;
    /// # enum Message { Tick, Input }
    /// # impl Application for MyApp {
    /// #     type Message = Message;
    /// #     type Flags = ();
    /// #     fn new(_: ()) -> (Self, Command<Message>) { (MyApp, Command::none()) }
    /// #     fn update(&mut self, msg: Message) -> Command<Message> { Command::none() }
    /// #     fn view(&self, frame: &mut Frame<'_>) {}
    /// fn subscriptions(&self) -> Vec<Subscription<Message>> {
    ///     use blogem::subscription::terminal::TerminalEvents;
    ///     use blogem::subscription::time::Timer;
    ///
    ///     vec![
    ///         Subscription::new(Timer::new(1000)).map(|_| Message::Tick),
    ///         Subscription::new(TerminalEvents::new()).map(|_| Message::Input),
    ///     ]
    /// }
    /// # }
    /// ```
    fn subscriptions(&self) -> Vec<Subscription<Self::Message>>;
}
