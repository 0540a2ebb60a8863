use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;
use siphon_fetch::{
    AttachmentReader, ContentFetcher, DEFAULT_USER_AGENT, FetchConfig, FetchMode, ReqwestTransport,
};
use tokio::io::AsyncWriteExt;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "siphon", version)]
#[command(about = "Fetch a URL's final status, content type and body", long_about = None)]
struct Cli {
    /// URL to fetch
    url: String,

    /// Only resolve the final status code and content type
    #[arg(short, long)]
    metadata_only: bool,

    /// Write the body to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Value of the User-Agent header
    #[arg(long, value_name = "UA", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Connection timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    connect_timeout: u64,

    /// Report redirects instead of following them
    #[arg(long)]
    no_redirects: bool,

    /// Disable the cookie engine
    #[arg(long)]
    no_cookies: bool,
}

impl Cli {
    fn config(&self) -> FetchConfig {
        FetchConfig::default()
            .user_agent(self.user_agent.clone())
            .connect_timeout(Duration::from_secs(self.connect_timeout))
            .follow_redirects(!self.no_redirects)
            .cookies(!self.no_cookies)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let fetcher = ContentFetcher::new(&cli.url, ReqwestTransport::new()).with_config(cli.config());

    if cli.metadata_only {
        let content = fetcher.start(FetchMode::MetadataOnly, None)?;
        let status = content.status.await;
        let content_type = content.content_type.await;
        if status == 0 {
            bail!("no response from {}", cli.url);
        }
        println!("{status} {content_type}");
        return Ok(());
    }

    let content = fetcher.start(FetchMode::FullBody, None)?;
    let mut reader = content
        .stream
        .and_then(|stream| stream.create_reader())
        .context("fetch has no readable body stream")?;

    tokio::select! {
        copied = drain(&mut reader, cli.output.as_deref()) => {
            let copied = copied?;
            tracing::debug!(url = %cli.url, bytes = copied, "body drained");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!(url = %cli.url, "interrupted");
        }
    }
    drop(reader);
    let state = fetcher.shutdown().await;

    let status = content.status.await;
    let content_type = content.content_type.await;
    tracing::debug!(url = %cli.url, %state, status, "fetch finished");
    if status == 0 {
        bail!("no response from {}", cli.url);
    }
    eprintln!("{status} {content_type}");
    Ok(())
}

/// Copy the body to `output`, or to stdout when no file is given.
async fn drain(reader: &mut AttachmentReader, output: Option<&Path>) -> Result<u64> {
    match output {
        Some(path) => {
            let mut file = tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            let copied = tokio::io::copy(reader, &mut file).await?;
            file.flush().await?;
            Ok(copied)
        }
        None => {
            let mut stdout = tokio::io::stdout();
            let copied = tokio::io::copy(reader, &mut stdout).await?;
            stdout.flush().await?;
            Ok(copied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_library() {
        let cli = Cli::try_parse_from(["siphon", "http://example.com/"]).unwrap();
        let config = cli.config();

        assert!(!cli.metadata_only);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
        assert!(config.follow_redirects);
        assert!(config.cookies);
    }

    #[test]
    fn test_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "siphon",
            "--metadata-only",
            "--user-agent",
            "probe/1.0",
            "--connect-timeout",
            "5",
            "--no-redirects",
            "--no-cookies",
            "-o",
            "out.bin",
            "http://example.com/",
        ])
        .unwrap();
        let config = cli.config();

        assert!(cli.metadata_only);
        assert_eq!(cli.output.as_deref(), Some(Path::new("out.bin")));
        assert_eq!(config.user_agent, "probe/1.0");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert!(!config.follow_redirects);
        assert!(!config.cookies);
    }

    #[test]
    fn test_url_is_required() {
        assert!(Cli::try_parse_from(["siphon"]).is_err());
    }
}
