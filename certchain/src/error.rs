use std::{io, path::PathBuf};

use crate::profile::Identity;

/// Everything that can go wrong while building and writing the chain.
///
/// Every variant names the stage that failed so the binary can report it
/// without extra context.
#[allow(missing_docs)]
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The key file is missing, unreadable or not well-formed PKCS#8.
	#[error("failed to load key {}: {reason}", .path.display())]
	KeyLoad { path: PathBuf, reason: String },
	/// The key is PKCS#8 but for an algorithm other than Ed25519.
	#[error("key {} uses {algorithm}, only Ed25519 keys are supported", .path.display())]
	KeyFormat { path: PathBuf, algorithm: String },
	/// rcgen refused to sign or serialize the certificate.
	#[error("failed to sign the {identity} certificate")]
	Signing {
		identity: Identity,
		#[source]
		source: rcgen::Error,
	},
	/// The designated issuer is not allowed to sign certificates.
	#[error("{issuer} is not a CA and cannot issue the {subject} certificate")]
	InvalidIssuer { issuer: Identity, subject: Identity },
	/// A hardcoded profile value could not be turned into certificate parameters.
	#[error("invalid {identity} profile")]
	Profile {
		identity: Identity,
		#[source]
		source: rcgen::Error,
	},
	/// PEM or DER encoding and decoding.
	#[error("certificate encoding error: {0}")]
	Encoding(String),
	/// A freshly issued certificate does not verify against its issuer.
	#[error("the {identity} certificate does not verify against its issuer: {reason}")]
	Verification { identity: Identity, reason: String },
	/// Persisting an output file failed.
	#[error("failed to write {}", .path.display())]
	Write {
		path: PathBuf,
		#[source]
		source: io::Error,
	},
}
