use colored::Colorize;
use log::debug;

use super::args::{Args, Command};
use super::views::{AnalysisView, Completion, CompletionReceiver, FaqView, InsightView};
use crate::{
    api::{types::InsightSegment, BackendClient, SymbolSearch},
    core::{
        formatter::{write_companies, write_statement, write_swot},
        Config, StonkieError, StreamPurpose,
    },
    stream::{FrameFormat, StreamConsumer, StreamHandle},
};
use std::io::{self, Write};

pub async fn run(args: Args) -> Result<(), StonkieError> {
    let _ = dotenv::dotenv();

    let mut config = Config::load()?;
    if let Some(backend_url) = args.backend_url {
        config.update_backend_url(backend_url);
    }

    debug!(
        "[SETTINGS] backend: {}, idle_timeout: {:?}, formats: {:?}",
        config.backend_url,
        config.idle_timeout(),
        config.streams
    );

    let client = BackendClient::from_config(&config)?;
    let mut stdout = io::stdout();

    match args.command {
        Command::Analyze {
            ticker,
            question,
            format,
        } => {
            let question = question.join(" ");
            if question.trim().is_empty() {
                return Err(StonkieError::ConfigError(
                    "Question must not be empty".to_string(),
                ));
            }
            analyze(&client, &config, ticker, question, format).await
        }
        Command::Faq { ticker } => faq(&client, &config, ticker).await,
        Command::Insights {
            ticker,
            segment,
            event_source,
        } => insights(&client, &config, ticker, segment, event_source).await,
        Command::Statement { ticker, report } => {
            let statement = client.financial_statement(&ticker, report).await?;
            write_statement(&mut stdout, report, &statement)
        }
        Command::Swot { ticker } => {
            let swot = client.swot(&ticker).await?;
            write_swot(&mut stdout, &swot)
        }
        Command::Trending => {
            let companies = client.most_viewed().await?;
            write_companies(&mut stdout, &companies)?;
            stdout.flush()?;
            Ok(())
        }
        Command::Search { query } => {
            let companies = SymbolSearch::from_config(&config)?
                .search(&query.join(" "))
                .await?;
            if companies.is_empty() {
                eprintln!("{}", "No matching companies".dimmed());
            }
            write_companies(&mut stdout, &companies)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

async fn analyze(
    client: &BackendClient,
    config: &Config,
    ticker: String,
    question: String,
    format: Option<FrameFormat>,
) -> Result<(), StonkieError> {
    let mut stream_config = config.stream_config(StreamPurpose::Analysis);
    if let Some(format) = format {
        stream_config.format = format;
    }
    debug!("[Analyze] {ticker}: {question} ({:?})", stream_config.format);

    let (completion, outcome) = Completion::new();
    let view = AnalysisView::new(io::stdout(), &question, completion);
    let client = client.clone();
    let handle = StreamConsumer::new(stream_config).start_with(
        async move { client.open_analysis(&ticker, &question).await },
        view,
    );
    follow(handle, outcome).await
}

async fn faq(client: &BackendClient, config: &Config, ticker: String) -> Result<(), StonkieError> {
    let (completion, outcome) = Completion::new();
    let client = client.clone();
    let handle = StreamConsumer::new(config.stream_config(StreamPurpose::Faq)).start_with(
        async move { client.open_faq(&ticker).await },
        FaqView::new(io::stdout(), completion),
    );
    follow(handle, outcome).await
}

async fn insights(
    client: &BackendClient,
    config: &Config,
    ticker: String,
    segment: InsightSegment,
    event_source: bool,
) -> Result<(), StonkieError> {
    let (completion, outcome) = Completion::new();
    let view = InsightView::new(io::stdout(), completion);
    let client = client.clone();
    let handle = if event_source {
        // Events arrive re-encoded as `data:` lines.
        let stream_config = config
            .stream_config(StreamPurpose::Insights)
            .with_format(FrameFormat::Sse);
        StreamConsumer::new(stream_config).start_with(
            async move { client.open_revenue_insight_events(&ticker, segment).await },
            view,
        )
    } else {
        StreamConsumer::new(config.stream_config(StreamPurpose::Insights)).start_with(
            async move { client.open_revenue_insights(&ticker, segment).await },
            view,
        )
    };
    follow(handle, outcome).await
}

/// Waits for a stream to end, cancelling it on Ctrl-C.
async fn follow(mut handle: StreamHandle, outcome: CompletionReceiver) -> Result<(), StonkieError> {
    let interrupted = tokio::select! {
        result = handle.wait() => {
            result?;
            false
        }
        _ = tokio::signal::ctrl_c() => true,
    };

    if interrupted {
        handle.cancel();
        eprintln!("\n{}", "Cancelled".yellow());
        return Ok(());
    }

    match outcome.await {
        Ok(Err(message)) => Err(StonkieError::StreamFailed(message)),
        _ => Ok(()),
    }
}
