use anyhow::Context;
use certchain::{Chain, ChainKeys, OutputDir};
use log::info;

mod args;

fn main() -> anyhow::Result<()> {
	// RUST_LOG=debug shows every issuance step
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
	let opts = args::options().run();

	let keys = ChainKeys::load(&opts.keys).context("loading identity keys")?;
	let chain =
		Chain::build(&keys, &opts.chain_options()).context("issuing the certificate chain")?;

	let mut out = OutputDir::new(&opts.output).context("preparing the output directory")?;
	chain
		.write_to(&mut out)
		.context("writing the certificates")?;
	info!("wrote {} certificates", out.written().len());

	Ok(())
}
