use crate::cli::{OutputFormat, RunArgs};
use crate::config::Config;
use crate::document::{DocumentSource, LocalText, TextCapability};
use crate::engine::Engine;
use crate::graph::TaskGraph;
use crate::output::{render_markdown, render_partial_markdown, write_report, EvaluationReport};
use anyhow::bail;
use std::io::IsTerminal;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    info!("Loading config from {:?}", args.config);
    let mut config = Config::load_or_default(&args.config)?;

    // Apply CLI overrides
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(report_dir) = &args.report_dir {
        config.report_dir = report_dir.clone();
    }
    if let Some(ids) = &args.criteria {
        config.retain_criteria(ids)?;
    }

    config.validate()?;
    let engine = Engine::from_config(&config)?;

    if args.dry_run {
        info!("DRY RUN - no provider calls will be made");
        print_execution_plan(&config, &engine.plan()?)?;
        return Ok(());
    }

    let source = match (&args.file, &args.text) {
        (Some(path), _) => DocumentSource::File(path.clone()),
        (None, Some(text)) => DocumentSource::Text(text.clone()),
        (None, None) if !std::io::stdin().is_terminal() => DocumentSource::Stdin,
        (None, None) => bail!("No document given: pass --file, --text, or pipe text on stdin"),
    };

    let ingest = LocalText {
        pdftotext: config.pdftotext.clone(),
        max_bytes: config.max_document_bytes,
        timeout: Duration::from_secs(config.timeout_sec),
    };
    let document = ingest.extract(&source).await?;
    let digest = document.digest();
    info!("Loaded document {} ({} bytes)", digest, document.len());

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            ctrl_c.cancel();
        }
    });

    let start = Instant::now();
    let result = match engine.run_with_cancel(document, cancel).await {
        Ok(result) => result,
        Err(e) => {
            if let Some(partial) = e.partial_result() {
                match args.format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(partial)?),
                    OutputFormat::Markdown => print!("{}", render_partial_markdown(partial)),
                }
            }
            return Err(e.into());
        }
    };
    let duration = start.elapsed();

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Markdown => print!("{}", render_markdown(&result)),
    }

    let avg_score = result.avg_score;
    if !args.no_report {
        let report = EvaluationReport::new(digest, duration, result);
        let path = write_report(&config.report_dir, &report)?;
        info!("Report written to {:?}", path);
    }

    info!(
        "Completed in {:.1}s: average score {:.2}",
        duration.as_secs_f64(),
        avg_score
    );

    if let Some(min_score) = args.min_score {
        if avg_score < min_score {
            error!(
                "Exiting with error: average score {:.2} is below {:.2}",
                avg_score, min_score
            );
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_execution_plan(config: &Config, graph: &TaskGraph) -> anyhow::Result<()> {
    println!("\n=== Execution Plan ===\n");
    println!("Provider: {}", config.provider);
    println!("Concurrency: {}", config.concurrency);
    println!("Report dir: {:?}", config.report_dir);

    println!("\nCriteria to run:");
    for criterion in config.enabled_criteria() {
        println!(
            "  - {} ({}) -> {}",
            criterion.id,
            criterion.name,
            config.provider_for(criterion)
        );
    }
    println!("Summary -> {}", config.summary_provider());

    println!("\nGraph levels:");
    for (depth, level) in graph.topological_levels()?.iter().enumerate() {
        let names: Vec<&str> = level
            .iter()
            .map(|id| graph.node(*id).name.as_str())
            .collect();
        println!("  {}: {}", depth, names.join(", "));
    }
    println!();
    Ok(())
}
