use futures::{
    FutureExt, StreamExt,
    stream::{self, BoxStream, select_all},
};

/// An action emitted by a running command.
///
/// The runtime forwards `Message` actions to [`Application::update`](crate::application::Application::update)
/// and stops the event loop on `Quit`.
#[derive(Debug)]
pub enum Action<Msg> {
    /// Deliver a message to the application.
    Message(Msg),

    /// Stop the event loop.
    Quit,
}

impl<Msg> Action<Msg> {
    fn map<B>(self, f: impl Fn(Msg) -> B) -> Action<B> {
        match self {
            Self::Message(msg) => Action::Message(f(msg)),
            Self::Quit => Action::Quit,
        }
    }
}

/// A deferred side effect returned from `new` and `update`.
///
/// Fetches, prefetches, cache invalidations and mutations are all expressed as
/// commands. The runtime spawns each command on its own task and feeds every
/// action it yields back into the message loop.
///
/// # Examples
///
/// ```
/// use blogem::command::Command;
///
/// enum Message {
///     Loaded(u32),
/// }
///
/// let cmd = Command::perform(async { 7 }, Message::Loaded);
/// ```
pub struct Command<Msg: Send + 'static> {
    pub(crate) stream: Option<BoxStream<'static, Action<Msg>>>,
}

impl<Msg: Send + 'static> Command<Msg> {
    /// A command that does nothing.
    #[must_use]
    pub fn none() -> Self {
        Self { stream: None }
    }

    /// Run a future and turn its output into a message.
    pub fn perform<A>(
        future: impl Future<Output = A> + Send + 'static,
        f: impl FnOnce(A) -> Msg + Send + 'static,
    ) -> Self {
        Self::future(future.map(f))
    }

    /// Run a future that already yields a message.
    pub fn future(future: impl Future<Output = Msg> + Send + 'static) -> Self {
        Self {
            stream: Some(future.into_stream().map(Action::Message).boxed()),
        }
    }

    /// Run a future purely for its side effect. No message is produced.
    pub fn task(future: impl Future<Output = ()> + Send + 'static) -> Self {
        Self {
            stream: Some(
                future
                    .into_stream()
                    .filter_map(|()| async { None })
                    .boxed(),
            ),
        }
    }

    /// Emit a single action immediately.
    ///
    /// ```
    /// use blogem::command::{Action, Command};
    ///
    /// let quit: Command<()> = Command::effect(Action::Quit);
    /// ```
    pub fn effect(action: Action<Msg>) -> Self {
        Self {
            stream: Some(stream::once(async move { action }).boxed()),
        }
    }

    /// Re-enter `update` with `msg`.
    pub fn message(msg: Msg) -> Self {
        Self::effect(Action::Message(msg))
    }

    /// Run several commands concurrently. `Command::none()` entries are skipped
    /// and the arrival order of their messages is unspecified.
    pub fn batch(commands: impl IntoIterator<Item = Self>) -> Self {
        let streams: Vec<_> = commands.into_iter().filter_map(|cmd| cmd.stream).collect();

        if streams.is_empty() {
            Self::none()
        } else {
            Self {
                stream: Some(select_all(streams).boxed()),
            }
        }
    }

    /// Lift a command into a parent message type.
    ///
    /// Views return commands over their own message enum and the application
    /// maps them into its top-level one.
    pub fn map<B: Send + 'static>(self, f: impl Fn(Msg) -> B + Send + 'static) -> Command<B> {
        Command {
            stream: self
                .stream
                .map(|stream| stream.map(move |action| action.map(&f)).boxed()),
        }
    }

    /// Returns `true` if running this command has no effect.
    #[must_use]
    pub const fn is_none(&self) -> bool {
        self.stream.is_none()
    }
}
