use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = trove_api::Args::parse();

	trove_api::run(args).await
}
