//! Loading the pre-generated identity keys.

use std::{
	fs,
	path::{Path, PathBuf},
};

use log::debug;
use rcgen::KeyPair;
use x509_parser::der_parser::parse_der;

use crate::{profile::Identity, Error, Result};

/// PEM tag of an unencrypted PKCS#8 private key.
const PKCS8_TAG: &str = "PRIVATE KEY";

/// id-Ed25519 from RFC 8410.
const ED25519_OID: &str = "1.3.101.112";

/// An Ed25519 key pair belonging to one identity of the chain.
///
/// Only constructed through [load_key_pair] or [IdentityKey::from_key_pair],
/// both of which reject other algorithms.
#[derive(Debug)]
pub struct IdentityKey {
	key_pair: KeyPair,
}

impl IdentityKey {
	/// Wrap an already decoded key, checking its algorithm.
	pub fn from_key_pair(key_pair: KeyPair, origin: &Path) -> Result<Self> {
		if key_pair.algorithm() != &rcgen::PKCS_ED25519 {
			return Err(Error::KeyFormat {
				path: origin.to_path_buf(),
				algorithm: format!("{:?}", key_pair.algorithm()),
			});
		}
		Ok(Self { key_pair })
	}
	/// Return `&KeyPair` for signing.
	pub fn key_pair(&self) -> &KeyPair {
		&self.key_pair
	}
	/// The raw 32 byte Ed25519 public key.
	pub fn public_key_raw(&self) -> &[u8] {
		self.key_pair.public_key_raw()
	}
	/// The DER SubjectPublicKeyInfo.
	pub fn public_key_der(&self) -> Vec<u8> {
		self.key_pair.public_key_der()
	}
}

/// Read a PEM wrapped PKCS#8 Ed25519 private key from `path`.
pub fn load_key_pair(path: &Path) -> Result<IdentityKey> {
	let load_err = |reason: String| Error::KeyLoad {
		path: path.to_path_buf(),
		reason,
	};

	let text = fs::read_to_string(path).map_err(|e| load_err(e.to_string()))?;
	let block = pem::parse(&text).map_err(|e| load_err(format!("not a PEM file: {e}")))?;
	if block.tag() != PKCS8_TAG {
		return Err(load_err(format!(
			"expected a {PKCS8_TAG} block, found {}",
			block.tag()
		)));
	}
	if let Some(algorithm) = pkcs8_algorithm(block.contents()) {
		if algorithm != ED25519_OID {
			return Err(Error::KeyFormat {
				path: path.to_path_buf(),
				algorithm,
			});
		}
	}
	let key_pair = KeyPair::try_from(block.contents())
		.map_err(|e| load_err(format!("malformed PKCS#8 key: {e}")))?;

	let key = IdentityKey::from_key_pair(key_pair, path)?;
	debug!("loaded Ed25519 key from {}", path.display());
	Ok(key)
}

/// Dotted OID of the `privateKeyAlgorithm` in a PKCS#8 `PrivateKeyInfo`.
///
/// `None` when the DER does not have the PrivateKeyInfo shape.
fn pkcs8_algorithm(der: &[u8]) -> Option<String> {
	let (_, info) = parse_der(der).ok()?;
	let [version, algorithm, private_key, ..] = info.as_sequence().ok()?.as_slice() else {
		return None;
	};
	version.as_u32().ok()?;
	private_key.as_slice().ok()?;
	let oid = algorithm.as_sequence().ok()?.first()?.as_oid().ok()?;
	Some(oid.to_id_string())
}

/// The four keys of the chain.
#[allow(missing_docs)]
#[derive(Debug)]
pub struct ChainKeys {
	pub root: IdentityKey,
	pub intermediate: IdentityKey,
	pub client: IdentityKey,
	pub server: IdentityKey,
}

impl ChainKeys {
	/// Load every identity's key from `dir`, root first. The first failure aborts.
	pub fn load(dir: &Path) -> Result<Self> {
		Ok(Self {
			root: load_key_pair(&key_path(dir, Identity::Root))?,
			intermediate: load_key_pair(&key_path(dir, Identity::Intermediate))?,
			client: load_key_pair(&key_path(dir, Identity::Client))?,
			server: load_key_pair(&key_path(dir, Identity::Server))?,
		})
	}
	/// The key of `identity`.
	pub fn get(&self, identity: Identity) -> &IdentityKey {
		match identity {
			Identity::Root => &self.root,
			Identity::Intermediate => &self.intermediate,
			Identity::Client => &self.client,
			Identity::Server => &self.server,
		}
	}
}

/// Location of `identity`'s key inside `dir`.
pub fn key_path(dir: &Path, identity: Identity) -> PathBuf {
	dir.join(identity.key_file())
}
