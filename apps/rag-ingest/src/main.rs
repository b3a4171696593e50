use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = rag_ingest::Args::parse();

	rag_ingest::run(args).await
}
