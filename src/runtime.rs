use std::ops::ControlFlow;
use std::time::Duration;

use color_eyre::eyre::Result;
use futures::stream::StreamExt;
use ratatui::{Terminal, prelude::Backend};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};

use crate::{
    application::Application,
    command::{Action, Command},
    subscription::SubscriptionManager,
};

/// Drives an [`Application`]: runs its commands and subscriptions, delivers
/// their messages to `update` one at a time and redraws after each batch.
pub struct Runtime<A: Application> {
    app: A,
    tx: mpsc::UnboundedSender<Action<A::Message>>,
    rx: mpsc::UnboundedReceiver<Action<A::Message>>,
    subscriptions: SubscriptionManager<A::Message>,
}

impl<A: Application> Runtime<A> {
    /// Creates the application from `flags` and starts its initial command.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(flags: A::Flags) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (app, cmd) = A::new(flags);
        let subscriptions = SubscriptionManager::new(tx.clone());

        let runtime = Self {
            app,
            tx,
            rx,
            subscriptions,
        };
        runtime.spawn(cmd);
        runtime
    }

    fn spawn(&self, cmd: Command<A::Message>) {
        let Some(mut stream) = cmd.stream else {
            return;
        };

        let tx = self.tx.clone();
        tokio::spawn(async move {
            while let Some(action) = stream.next().await {
                if tx.send(action).is_err() {
                    break;
                }
            }
        });
    }

    fn handle(&mut self, action: Action<A::Message>) -> ControlFlow<()> {
        match action {
            Action::Message(msg) => {
                let cmd = self.app.update(msg);
                self.spawn(cmd);
                ControlFlow::Continue(())
            }
            Action::Quit => ControlFlow::Break(()),
        }
    }

    /// Runs the event loop until a command emits [`Action::Quit`].
    ///
    /// The screen is redrawn after every batch of messages, at most
    /// `frame_rate` times per second. All subscriptions are cancelled before
    /// this returns.
    ///
    /// # Errors
    ///
    /// Returns an error if drawing to the terminal fails.
    pub async fn run<B: Backend>(
        mut self,
        terminal: &mut Terminal<B>,
        frame_rate: u32,
    ) -> Result<()> {
        let frame_duration = Duration::from_secs(1) / frame_rate.max(1);
        self.subscriptions.update(self.app.subscriptions());
        tracing::debug!(frame_rate, "event loop started");

        let outcome = self.event_loop(terminal, frame_duration).await;

        self.subscriptions.shutdown().await;
        tracing::debug!("event loop stopped");
        outcome
    }

    async fn event_loop<B: Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
        frame_duration: Duration,
    ) -> Result<()> {
        loop {
            terminal.draw(|frame| self.app.view(frame))?;
            let drawn_at = Instant::now();

            // The runtime holds a sender, so the channel never closes.
            let Some(action) = self.rx.recv().await else {
                return Ok(());
            };
            if self.handle(action).is_break() {
                return Ok(());
            }
            while let Ok(action) = self.rx.try_recv() {
                if self.handle(action).is_break() {
                    return Ok(());
                }
            }

            self.subscriptions.update(self.app.subscriptions());
            sleep_until(drawn_at + frame_duration).await;
        }
    }
}
