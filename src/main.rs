use blogem::{blog::BlogApp, config::Args, logging, runtime::Runtime};
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use crossterm::{
    event::{DisableFocusChange, EnableFocusChange},
    execute,
};

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();
    logging::init(args.log_file.as_deref()).wrap_err("failed to open log file")?;
    let flags = args.flags().wrap_err("invalid cache configuration")?;

    let mut terminal = ratatui::init();
    if let Err(error) = execute!(std::io::stdout(), EnableFocusChange) {
        tracing::warn!(%error, "terminal does not report focus changes");
    }

    let result = Runtime::<BlogApp>::new(flags)
        .run(&mut terminal, args.frame_rate)
        .await;

    let _ = execute!(std::io::stdout(), DisableFocusChange);
    ratatui::restore();

    if let Err(ref error) = result {
        tracing::error!(%error, "exited with error");
    }
    result
}
