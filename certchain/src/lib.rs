#![warn(missing_docs)]
//! This library wraps [rcgen] to build a fixed three level certificate
//! chain out of existing Ed25519 keys: a self-signed root CA, an
//! intermediate CA signed by the root, and client and server leaf
//! certificates signed by the intermediate.
//!
//! ```no_run
//! # fn main() -> certchain::Result<()> {
//! use std::path::Path;
//! use certchain::{Chain, ChainKeys, ChainOptions, OutputDir};
//!
//! let keys = ChainKeys::load(Path::new("keys"))?;
//! let chain = Chain::build(&keys, &ChainOptions::default())?;
//! chain.write_to(&mut OutputDir::new(".")?)?;
//! # Ok(())
//! # }
//! ```

mod cert;
mod encode;
mod error;
mod key;
mod profile;

pub use cert::{issue_root, issue_subordinate, CertificateRecord, Chain};
pub use encode::{decode, encode, OutputDir};
pub use error::Error;
pub use key::{key_path, load_key_pair, ChainKeys, IdentityKey};
pub use profile::{
	years_after, ChainOptions, Identity, IdentityProfile, LeafKeyUsage, SerialPolicy,
	SubjectName, DEFAULT_SERIAL,
};

/// A specialized `Result` type.
pub type Result<T> = std::result::Result<T, Error>;
