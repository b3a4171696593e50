use std::path::PathBuf;

use clap::{ArgAction, Parser};
use color_eyre::eyre;

use rag_domain::Namespace;
use rag_service::Components;

#[derive(Debug, Parser)]
#[command(
	version = rag_cli::VERSION,
	rename_all = "kebab",
	styles = rag_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// Namespace the files are written to.
	#[arg(long, short = 'n', value_name = "NS")]
	pub namespace: String,
	#[arg(value_name = "FILES")]
	pub files: Vec<PathBuf>,
	/// Chunk id to remove from the namespace before ingesting. Repeat for several ids.
	#[arg(long, value_name = "ID", action = ArgAction::Append)]
	pub delete: Vec<String>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	if args.files.is_empty() && args.delete.is_empty() {
		return Err(eyre::eyre!("Nothing to do. Pass files to ingest or --delete ids."));
	}

	let config = rag_config::load(&args.config)?;

	rag_cli::init_tracing(&config.service.log_level);

	let namespace = Namespace::new(&args.namespace)?;
	let components = Components::from_config(&config).await?;
	let ingestor = components.ingestor();

	if !args.delete.is_empty() {
		ingestor.delete(&args.delete, &namespace).await?;
	}

	let total = args.files.len();
	let mut failed = 0;

	for (filename, outcome) in ingestor.ingest_paths(&args.files, &namespace).await {
		match outcome {
			Ok(report) => tracing::info!(
				namespace = %namespace,
				source = %filename,
				chunks = report.chunks,
				written = report.written,
				skipped = report.skipped,
				"Ingested file."
			),
			Err(_) => failed += 1,
		}
	}

	if failed > 0 {
		return Err(eyre::eyre!("{failed} of {total} files failed to ingest."));
	}

	Ok(())
}
