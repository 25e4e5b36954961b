use std::path::Path;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use embedomatic_cli::render::{self, Action};
use embedomatic_cli::{Cli, Command, QueryOptions, Shell, build_session, upload};
use embedomatic_rag::session::DEFAULT_RESULT_COUNT;
use embedomatic_rag::{Environment, RagSession};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Logs go to stderr so answers on stdout stay clean.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let env = Environment::load().context("startup configuration check failed")?;
    let mut session =
        build_session(&env, &cli.options).await.context("failed to initialise the pipeline")?;

    let ok = match cli.command {
        Command::Ingest { file } => ingest(&mut session, &file).await,
        Command::Ask { query, query_options } => {
            prepare(&mut session, &query_options).await
                && match session.ask(&query, query_options.k.into()).await {
                    Ok(outcome) => report(render::outcome(&outcome)),
                    Err(e) => fail(render::error(Action::Search, &e)),
                }
        }
        Command::Search { query, query_options } => {
            prepare(&mut session, &query_options).await
                && match session.search(&query, query_options.k.into()).await {
                    Ok(results) => report(render::results(&results)),
                    Err(e) => fail(render::error(Action::Search, &e)),
                }
        }
        Command::Shell { file } => {
            let mut shell = Shell::new(session, DEFAULT_RESULT_COUNT);
            match file {
                Some(path) => println!("{}", shell.load(&path).await),
                None => attach(shell.session_mut()).await,
            }
            shell.run().await?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

async fn ingest(session: &mut RagSession, path: &Path) -> bool {
    match upload(session, path).await {
        Ok(handle) => report(render::ingested(&path.display().to_string(), handle)),
        Err(e) => fail(render::error(Action::Ingest, &e)),
    }
}

/// Ingest `--file` if given, otherwise pick up the stored collection.
async fn prepare(session: &mut RagSession, options: &QueryOptions) -> bool {
    match &options.file {
        Some(path) => ingest(session, path).await,
        None => {
            attach(session).await;
            true
        }
    }
}

async fn attach(session: &mut RagSession) {
    if let Err(e) = session.attach().await {
        eprintln!("{}", render::error(Action::Search, &e));
    }
}

fn report(message: String) -> bool {
    println!("{message}");
    true
}

fn fail(message: String) -> bool {
    eprintln!("{message}");
    false
}
