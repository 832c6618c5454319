#![allow(dead_code)]

use assert_fs::prelude::*;
use assert_fs::TempDir;
use certchain::Identity;
use rcgen::KeyPair;

/// Write a fresh Ed25519 PKCS#8 key for every identity into `dir/keys`.
pub fn write_keys(dir: &TempDir) -> anyhow::Result<()> {
	let keys = dir.child("keys");
	keys.create_dir_all()?;
	for identity in Identity::ALL {
		let key_pair = KeyPair::generate_for(&rcgen::PKCS_ED25519)?;
		keys.child(identity.key_file())
			.write_str(&key_pair.serialize_pem())?;
	}
	Ok(())
}
