//! Command Line argument parsing
#![allow(missing_docs)]

use std::path::PathBuf;

use bpaf::Bpaf;
use certchain::{ChainOptions, LeafKeyUsage, SerialPolicy};

#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version)]
/// Build root, intermediate, client and server certificates from existing Ed25519 keys
pub struct Options {
	/// Directory holding privatekey.pem, interPrivateKey.pem, clientPrivateKey.pem and serverPrivateKey.pem
	#[bpaf(short, long, argument("DIR"), fallback("keys".into()))]
	pub keys: PathBuf,
	/// Directory the certificates are written to
	#[bpaf(short, long, argument("DIR"), fallback(".".into()))]
	pub output: PathBuf,
	/// Give every certificate a random serial instead of 1028
	#[bpaf(long)]
	pub unique_serials: bool,
	/// Restrict client and server key usage to digitalSignature
	#[bpaf(long)]
	pub strict_leaf_usage: bool,
}

impl Options {
	pub fn chain_options(&self) -> ChainOptions {
		ChainOptions {
			serials: if self.unique_serials {
				SerialPolicy::Random
			} else {
				SerialPolicy::Fixed
			},
			leaf_key_usage: if self.strict_leaf_usage {
				LeafKeyUsage::Strict
			} else {
				LeafKeyUsage::Compatible
			},
		}
	}
}
