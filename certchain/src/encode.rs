//! PEM encoding of issued certificates and the directory they are written to.

use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};

use log::{info, warn};
use pem::{EncodeConfig, LineEnding, Pem};
use pki_types::CertificateDer;

use crate::{
	cert::{parse_der, Chain, CertificateRecord},
	Error, Result,
};

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const ENCODE_CONFIG: EncodeConfig = EncodeConfig::new().set_line_ending(LineEnding::LF);

/// Wrap the record's DER in a single `CERTIFICATE` PEM block.
pub fn encode(record: &CertificateRecord) -> String {
	pem::encode_config(
		&Pem::new(CERTIFICATE_TAG, record.der().to_vec()),
		ENCODE_CONFIG,
	)
}

/// Decode text holding exactly one `CERTIFICATE` block into its DER.
///
/// The DER must itself parse as one certificate.
pub fn decode(text: &str) -> Result<CertificateDer<'static>> {
	let mut blocks = pem::parse_many(text)
		.map_err(|e| Error::Encoding(format!("invalid PEM: {e}")))?;
	if blocks.len() != 1 {
		return Err(Error::Encoding(format!(
			"expected exactly one PEM block, found {}",
			blocks.len()
		)));
	}
	let block = blocks.remove(0);
	if block.tag() != CERTIFICATE_TAG {
		return Err(Error::Encoding(format!(
			"expected a {CERTIFICATE_TAG} block, found {}",
			block.tag()
		)));
	}
	let der = block.into_contents();
	parse_der(&der)?;
	Ok(CertificateDer::from(der))
}

/// Output directory that remembers what it wrote so a failed run can be
/// rolled back.
#[derive(Debug)]
pub struct OutputDir {
	dir: PathBuf,
	written: Vec<PathBuf>,
}

impl OutputDir {
	/// Use `dir`, creating it if needed.
	pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
		let dir = dir.into();
		fs::create_dir_all(&dir).map_err(|source| Error::Write {
			path: dir.clone(),
			source,
		})?;
		Ok(Self {
			dir,
			written: Vec::new(),
		})
	}
	/// Return `&Path` of the directory.
	pub fn path(&self) -> &Path {
		&self.dir
	}
	/// Files written so far.
	pub fn written(&self) -> &[PathBuf] {
		&self.written
	}
	/// Persist `contents` as `name` inside the directory.
	pub fn write(&mut self, name: &str, contents: &[u8]) -> Result<PathBuf> {
		let path = self.dir.join(name);
		let write_err = |source| Error::Write {
			path: path.clone(),
			source,
		};
		let mut out = File::create(&path).map_err(write_err)?;
		self.written.push(path.clone());
		out.write_all(contents).map_err(write_err)?;
		Ok(path)
	}
	/// Remove every file written so far.
	pub fn discard(&mut self) {
		for path in self.written.drain(..) {
			match fs::remove_file(&path) {
				Ok(()) => info!("removed partial output {}", path.display()),
				Err(e) => warn!("could not remove {}: {e}", path.display()),
			}
		}
	}
}

impl Chain {
	/// Write all four certificates into `out` under their fixed names.
	///
	/// If any write fails the files already written are removed again.
	pub fn write_to(&self, out: &mut OutputDir) -> Result<()> {
		for record in self.records() {
			let name = record.identity().output_file();
			if let Err(e) = out.write(name, record.pem().as_bytes()) {
				out.discard();
				return Err(e);
			}
			info!("wrote {}", out.path().join(name).display());
		}
		Ok(())
	}
}
