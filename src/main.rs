use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use parley::api::ApiServer;
use parley::console::ConsoleRenderer;
use parley::streaming::{run_interaction_loop, spawn_recognizer};
use parley::voice::{
    AudioCapture, AudioPlayback, UtteranceSegmenter, list_devices, listen_for_utterance,
};
use parley::{Config, Pipeline, Render, RenderFrame, Session, TurnError, Utterance};

/// Parley - talk to an AI assistant by voice or text
#[derive(Parser)]
#[command(name = "parley", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web API (default)
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
    /// Text chat in the terminal, one line per turn
    Chat {
        /// Output device name (defaults to system default)
        #[arg(long)]
        output_device: Option<String>,

        /// Don't play reply audio
        #[arg(long)]
        no_playback: bool,
    },
    /// Push-to-talk: press Enter, speak, hear the reply
    Listen(AudioArgs),
    /// Continuous listening; every recognized utterance becomes a turn
    Live(AudioArgs),
    /// List audio input and output devices
    Devices,
}

#[derive(Args)]
struct AudioArgs {
    /// Input device name (defaults to system default)
    #[arg(long)]
    input_device: Option<String>,

    /// Output device name (defaults to system default)
    #[arg(long)]
    output_device: Option<String>,

    /// Don't play reply audio
    #[arg(long)]
    no_playback: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "warn,parley=info",
        1 => "info,parley=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    // Secrets are checked before anything else happens
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(config, port).await,
        Command::Chat {
            output_device,
            no_playback,
        } => chat(&config, output_device.as_deref(), no_playback).await,
        Command::Listen(args) => listen(&config, &args).await,
        Command::Live(args) => live(&config, &args).await,
        Command::Devices => devices(),
    }
}

async fn serve(config: Config, port: Option<u16>) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(&config)?;
    let port = port.unwrap_or(config.server.port);

    tracing::info!(port, "starting parley web server");

    ApiServer::builder(Arc::new(pipeline))
        .port(port)
        .static_dir(config.server.static_dir)
        .build()
        .run()
        .await?;

    Ok(())
}

#[allow(clippy::future_not_send)]
async fn chat(
    config: &Config,
    output_device: Option<&str>,
    no_playback: bool,
) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let mut session = Session::new();
    let mut renderer = ConsoleRenderer::stdout(open_playback(output_device, no_playback));

    println!("Ask a question (Ctrl-D to quit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("> ").await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let Some(utterance) = Utterance::new(line) else {
            continue;
        };
        // Failures are rendered; the session carries on
        let _ = pipeline.respond(&mut session, utterance, &mut renderer).await;
    }

    session.teardown();
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn listen(config: &Config, args: &AudioArgs) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let format = pipeline.audio_format();
    let timeout = Duration::from_secs(config.stt.listen_timeout_secs);

    let mut session = Session::new();
    let mut renderer = ConsoleRenderer::stdout(open_playback(
        args.output_device.as_deref(),
        args.no_playback,
    ));
    let mut segmenter = UtteranceSegmenter::new(format);

    let (frames_tx, mut frames_rx) = mpsc::unbounded_channel();
    let mut capture = AudioCapture::new(args.input_device.as_deref(), format)?;
    capture.start(frames_tx)?;

    println!("Press Enter to speak (Ctrl-D to quit)\n");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while lines.next_line().await?.is_some() {
        // Discard audio captured while idle
        while frames_rx.try_recv().is_ok() {}

        println!("Listening...");
        match listen_for_utterance(&mut frames_rx, &mut segmenter, timeout).await {
            Ok(audio) => {
                let _ = pipeline.listen(&mut session, &audio, &mut renderer).await;
            }
            Err(e) => {
                tracing::debug!(error = %e, "no utterance captured");
                let message = TurnError::from(e).user_message();
                renderer.render(&RenderFrame {
                    turns: session.log().all(),
                    error: Some(message.as_str()),
                    audio: None,
                });
            }
        }
    }

    capture.stop();
    session.teardown();
    Ok(())
}

#[allow(clippy::future_not_send)]
async fn live(config: &Config, args: &AudioArgs) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    let format = pipeline.audio_format();

    let mut session = Session::new();
    let mut renderer = ConsoleRenderer::stdout(open_playback(
        args.output_device.as_deref(),
        args.no_playback,
    ));

    let (frames_tx, frames_rx) = mpsc::unbounded_channel();
    let mut capture = AudioCapture::new(args.input_device.as_deref(), format)?;
    capture.start(frames_tx)?;

    let recognizer = spawn_recognizer(
        frames_rx,
        pipeline.transcriber(),
        session.queue(),
        UtteranceSegmenter::new(format),
    );

    // Set up shutdown signal
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(()).await;
        }
    });

    println!("Listening continuously (Ctrl-C to quit)\n");

    run_interaction_loop(
        &pipeline,
        &mut session,
        &mut renderer,
        &recognizer,
        &mut shutdown_rx,
    )
    .await;

    // Closing the frame channel ends the recognizer
    capture.stop();
    drop(capture);
    if let Err(e) = recognizer.await {
        tracing::warn!(error = %e, "recognizer task failed");
    }

    session.teardown();
    Ok(())
}

fn devices() -> anyhow::Result<()> {
    let devices = list_devices()?;

    println!("Input devices:");
    for name in &devices.inputs {
        println!("  {name}");
    }
    println!("\nOutput devices:");
    for name in &devices.outputs {
        println!("  {name}");
    }

    Ok(())
}

fn open_playback(device: Option<&str>, disabled: bool) -> Option<AudioPlayback> {
    if disabled {
        return None;
    }

    match AudioPlayback::new(device) {
        Ok(playback) => Some(playback),
        Err(e) => {
            tracing::warn!(error = %e, "audio output unavailable, replies will not be played");
            None
        }
    }
}

async fn prompt(text: &str) -> anyhow::Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(text.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
