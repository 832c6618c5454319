//! Issuing the root, intermediate and leaf certificates.

use std::fmt;

use log::{debug, info};
use pki_types::CertificateDer;
use rcgen::Certificate;
use time::OffsetDateTime;
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{
	encode,
	key::{ChainKeys, IdentityKey},
	profile::{ChainOptions, Identity, IdentityProfile},
	Error, Result,
};

/// One signed certificate of the chain.
pub struct CertificateRecord {
	profile: &'static IdentityProfile,
	issuer: Identity,
	cert: Certificate,
}

impl fmt::Debug for CertificateRecord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("CertificateRecord")
			.field("identity", &self.identity())
			.field("issuer", &self.issuer)
			.field("der_len", &self.der().len())
			.finish()
	}
}

impl CertificateRecord {
	/// Which level of the chain this is.
	pub fn identity(&self) -> Identity {
		self.profile.identity
	}
	/// Identity that signed this certificate. The root names itself.
	pub fn issuer(&self) -> Identity {
		self.issuer
	}
	/// Profile the certificate was built from.
	pub fn profile(&self) -> &'static IdentityProfile {
		self.profile
	}
	/// DER encoded certificate.
	pub fn der(&self) -> &CertificateDer<'static> {
		self.cert.der()
	}
	/// PEM encoded certificate.
	pub fn pem(&self) -> String {
		encode::encode(self)
	}
	/// Parse the DER back into its fields.
	pub fn parsed(&self) -> Result<X509Certificate<'_>> {
		parse_der(self.der())
	}
	/// Raw subject public key embedded in the certificate.
	pub fn subject_public_key(&self) -> Result<Vec<u8>> {
		Ok(self.parsed()?.public_key().subject_public_key.data.to_vec())
	}
	/// Signature bytes over the TBS certificate.
	pub fn signature(&self) -> Result<Vec<u8>> {
		Ok(self.parsed()?.signature_value.data.to_vec())
	}
	/// DER of the subject name.
	pub fn subject_name_der(&self) -> Result<Vec<u8>> {
		Ok(self.parsed()?.subject().as_raw().to_vec())
	}
	/// DER of the issuer name.
	pub fn issuer_name_der(&self) -> Result<Vec<u8>> {
		Ok(self.parsed()?.issuer().as_raw().to_vec())
	}
	/// Check that `issuer` signed this certificate and that the names line up.
	pub fn verify_issued_by(&self, issuer: &CertificateRecord) -> Result<()> {
		let verify_err = |reason: String| Error::Verification {
			identity: self.identity(),
			reason,
		};
		let cert = self.parsed()?;
		let issuer_cert = issuer.parsed()?;

		if cert.issuer().as_raw() != issuer_cert.subject().as_raw() {
			return Err(verify_err(format!(
				"issuer name {} does not match {} subject {}",
				cert.issuer(),
				issuer.identity(),
				issuer_cert.subject()
			)));
		}
		cert.verify_signature(Some(issuer_cert.public_key()))
			.map_err(|e| verify_err(e.to_string()))
	}
}

/// Parse a single DER certificate, rejecting trailing bytes.
pub(crate) fn parse_der<'a>(der: &'a [u8]) -> Result<X509Certificate<'a>> {
	let (rest, cert) = X509Certificate::from_der(der)
		.map_err(|e| Error::Encoding(format!("malformed certificate: {e}")))?;
	if !rest.is_empty() {
		return Err(Error::Encoding(format!(
			"{} trailing bytes after certificate",
			rest.len()
		)));
	}
	Ok(cert)
}

/// Issue the self-signed root certificate.
pub fn issue_root(
	root_key: &IdentityKey,
	root_profile: &'static IdentityProfile,
	options: &ChainOptions,
) -> Result<CertificateRecord> {
	let identity = root_profile.identity;
	// Self-signed means the root is its own issuer.
	if !root_profile.is_ca {
		return Err(Error::InvalidIssuer {
			issuer: identity,
			subject: identity,
		});
	}

	let params = root_profile.to_params(OffsetDateTime::now_utc(), options)?;
	let cert = params
		.self_signed(root_key.key_pair())
		.map_err(|source| Error::Signing { identity, source })?;
	debug!("self-signed {identity} certificate");

	Ok(CertificateRecord {
		profile: root_profile,
		issuer: identity,
		cert,
	})
}

/// Issue a certificate for `subject_key` signed by `issuer_key`.
///
/// `issuer` is the record previously issued for the owner of `issuer_key`;
/// its profile must be a CA.
pub fn issue_subordinate(
	issuer: &CertificateRecord,
	issuer_key: &IdentityKey,
	subject_key: &IdentityKey,
	subject_profile: &'static IdentityProfile,
	options: &ChainOptions,
) -> Result<CertificateRecord> {
	let identity = subject_profile.identity;
	if !issuer.profile().is_ca {
		return Err(Error::InvalidIssuer {
			issuer: issuer.identity(),
			subject: identity,
		});
	}

	let mut params = subject_profile.to_params(OffsetDateTime::now_utc(), options)?;
	params.use_authority_key_identifier_extension = true;
	let cert = params
		.signed_by(subject_key.key_pair(), &issuer.cert, issuer_key.key_pair())
		.map_err(|source| Error::Signing { identity, source })?;
	debug!("{} signed the {identity} certificate", issuer.identity());

	Ok(CertificateRecord {
		profile: subject_profile,
		issuer: issuer.identity(),
		cert,
	})
}

/// The complete root, intermediate, client and server chain.
#[allow(missing_docs)]
#[derive(Debug)]
pub struct Chain {
	pub root: CertificateRecord,
	pub intermediate: CertificateRecord,
	pub client: CertificateRecord,
	pub server: CertificateRecord,
}

impl Chain {
	/// Issue all four certificates in dependency order, stopping at the first error.
	///
	/// Each subordinate is checked against its issuer right after signing.
	pub fn build(keys: &ChainKeys, options: &ChainOptions) -> Result<Self> {
		let root = issue_root(&keys.root, Identity::Root.profile(), options)?;
		root.verify_issued_by(&root)?;

		let intermediate = issue_subordinate(
			&root,
			&keys.root,
			&keys.intermediate,
			Identity::Intermediate.profile(),
			options,
		)?;
		intermediate.verify_issued_by(&root)?;

		let client = issue_subordinate(
			&intermediate,
			&keys.intermediate,
			&keys.client,
			Identity::Client.profile(),
			options,
		)?;
		client.verify_issued_by(&intermediate)?;

		let server = issue_subordinate(
			&intermediate,
			&keys.intermediate,
			&keys.server,
			Identity::Server.profile(),
			options,
		)?;
		server.verify_issued_by(&intermediate)?;

		info!("issued root, intermediate, client and server certificates");
		Ok(Self {
			root,
			intermediate,
			client,
			server,
		})
	}
	/// All records in issuance order.
	pub fn records(&self) -> [&CertificateRecord; 4] {
		[&self.root, &self.intermediate, &self.client, &self.server]
	}
}

#[cfg(test)]
mod tests {
	use std::path::Path;

	use rcgen::KeyPair;
	use time::Month;
	use x509_parser::extensions::GeneralName;

	use super::*;
	use crate::profile::{years_after, LeafKeyUsage, SerialPolicy};

	fn ed25519_key() -> IdentityKey {
		let key_pair = KeyPair::generate_for(&rcgen::PKCS_ED25519).unwrap();
		IdentityKey::from_key_pair(key_pair, Path::new("generated")).unwrap()
	}

	fn chain_keys() -> ChainKeys {
		ChainKeys {
			root: ed25519_key(),
			intermediate: ed25519_key(),
			client: ed25519_key(),
			server: ed25519_key(),
		}
	}

	fn serial(cert: &X509Certificate<'_>) -> Vec<u8> {
		let raw = cert.raw_serial();
		let start = raw.iter().position(|b| *b != 0).unwrap_or(raw.len());
		raw[start..].to_vec()
	}

	#[test]
	fn root_is_self_signed() -> anyhow::Result<()> {
		let key = ed25519_key();
		let root = issue_root(&key, Identity::Root.profile(), &ChainOptions::default())?;

		assert_eq!(root.identity(), Identity::Root);
		assert_eq!(root.issuer(), Identity::Root);
		assert_eq!(root.issuer_name_der()?, root.subject_name_der()?);
		assert_eq!(root.subject_public_key()?, key.public_key_raw());
		root.verify_issued_by(&root)?;

		let cert = root.parsed()?;
		assert!(cert.is_ca());
		assert_eq!(
			cert.subject()
				.iter_common_name()
				.next()
				.and_then(|cn| cn.as_str().ok()),
			Some("exampleCA")
		);
		Ok(())
	}

	#[test]
	fn intermediate_signed_by_root() -> anyhow::Result<()> {
		let keys = chain_keys();
		let options = ChainOptions::default();
		let root = issue_root(&keys.root, Identity::Root.profile(), &options)?;
		let intermediate = issue_subordinate(
			&root,
			&keys.root,
			&keys.intermediate,
			Identity::Intermediate.profile(),
			&options,
		)?;

		assert_eq!(intermediate.issuer(), Identity::Root);
		assert_eq!(intermediate.issuer_name_der()?, root.subject_name_der()?);
		assert_eq!(
			intermediate.subject_public_key()?,
			keys.intermediate.public_key_raw()
		);
		intermediate.verify_issued_by(&root)?;
		// Not self-signed.
		assert!(intermediate.verify_issued_by(&intermediate).is_err());

		let cert = intermediate.parsed()?;
		assert!(cert.is_ca());
		assert!(cert.subject_alternative_name()?.is_none());
		Ok(())
	}

	#[test]
	fn leaf_cannot_issue() -> anyhow::Result<()> {
		let keys = chain_keys();
		let options = ChainOptions::default();
		let chain = Chain::build(&keys, &options)?;

		let err = issue_subordinate(
			&chain.client,
			&keys.client,
			&keys.server,
			Identity::Server.profile(),
			&options,
		)
		.unwrap_err();
		match err {
			Error::InvalidIssuer { issuer, subject } => {
				assert_eq!(issuer, Identity::Client);
				assert_eq!(subject, Identity::Server);
			},
			other => panic!("unexpected error {other:?}"),
		}
		Ok(())
	}

	#[test]
	fn non_ca_root_profile_rejected() {
		let key = ed25519_key();
		let err = issue_root(&key, Identity::Server.profile(), &ChainOptions::default())
			.unwrap_err();
		assert!(matches!(err, Error::InvalidIssuer { .. }), "{err:?}");
	}

	#[test]
	fn wrong_issuer_key_fails_verification() -> anyhow::Result<()> {
		let keys = chain_keys();
		let options = ChainOptions::default();
		let root = issue_root(&keys.root, Identity::Root.profile(), &options)?;
		// Signed with the client key while claiming the root as issuer.
		let intermediate = issue_subordinate(
			&root,
			&keys.client,
			&keys.intermediate,
			Identity::Intermediate.profile(),
			&options,
		)?;
		let err = intermediate.verify_issued_by(&root).unwrap_err();
		assert!(matches!(err, Error::Verification { .. }), "{err:?}");
		Ok(())
	}

	#[test]
	fn chain_links() -> anyhow::Result<()> {
		let keys = chain_keys();
		let chain = Chain::build(&keys, &ChainOptions::default())?;

		chain.client.verify_issued_by(&chain.intermediate)?;
		chain.server.verify_issued_by(&chain.intermediate)?;
		assert!(chain.client.verify_issued_by(&chain.root).is_err());

		let identities: Vec<Identity> = chain.records().iter().map(|r| r.identity()).collect();
		assert_eq!(identities, Identity::ALL.to_vec());

		for record in chain.records() {
			let cert = record.parsed()?;
			assert_eq!(cert.is_ca(), record.profile().is_ca);
			assert_eq!(serial(&cert), vec![0x04, 0x04]);

			let eku = cert.extended_key_usage()?.expect("eku present").value;
			assert!(eku.client_auth);
			assert!(eku.server_auth);

			let ku = cert.key_usage()?.expect("key usage present").value;
			assert!(ku.key_cert_sign());
			assert!(ku.crl_sign());

			let dns: Vec<&str> = cert
				.subject_alternative_name()?
				.map(|san| {
					san.value
						.general_names
						.iter()
						.filter_map(|name| match name {
							GeneralName::DNSName(dns) => Some(*dns),
							_ => None,
						})
						.collect()
				})
				.unwrap_or_default();
			assert_eq!(dns, record.profile().dns_names.to_vec());
		}
		Ok(())
	}

	#[test]
	fn leaves_have_explicit_basic_constraints() -> anyhow::Result<()> {
		let chain = Chain::build(&chain_keys(), &ChainOptions::default())?;
		for leaf in [&chain.client, &chain.server] {
			let cert = leaf.parsed()?;
			let bc = cert.basic_constraints()?.expect("basic constraints");
			assert!(!bc.value.ca);
		}
		Ok(())
	}

	#[test]
	fn validity_windows() -> anyhow::Result<()> {
		let chain = Chain::build(&chain_keys(), &ChainOptions::default())?;
		let now = OffsetDateTime::now_utc().unix_timestamp();
		for record in chain.records() {
			let cert = record.parsed()?;
			let not_before = cert.validity().not_before.to_datetime();
			let not_after = cert.validity().not_after.to_datetime();

			assert!((not_before.unix_timestamp() - now).abs() < 60);
			assert!(not_after > not_before);
			let years = record.profile().validity_years;
			assert_eq!(not_after.year() - not_before.year(), i32::from(years));
			assert_eq!(not_after.time(), not_before.time());
			assert_eq!(Some(not_after), years_after(not_before, years));
			if (not_before.month(), not_before.day()) != (Month::February, 29) {
				assert_eq!(not_after.month(), not_before.month());
				assert_eq!(not_after.day(), not_before.day());
			}
		}
		Ok(())
	}

	#[test]
	fn debug_output_names_the_certificate() -> anyhow::Result<()> {
		let chain = Chain::build(&chain_keys(), &ChainOptions::default())?;
		let text = format!("{:?}", chain.client);
		assert!(text.starts_with("CertificateRecord"), "{text}");
		assert!(text.contains("identity: Client"), "{text}");
		assert!(text.contains("issuer: Intermediate"), "{text}");
		assert!(text.contains(&format!("der_len: {}", chain.client.der().len())));
		assert!(format!("{chain:?}").contains("identity: Server"));
		Ok(())
	}

	#[test]
	fn options_change_serials_and_leaf_usage() -> anyhow::Result<()> {
		let options = ChainOptions {
			serials: SerialPolicy::Random,
			leaf_key_usage: LeafKeyUsage::Strict,
		};
		let chain = Chain::build(&chain_keys(), &options)?;

		let mut serials = Vec::new();
		for record in chain.records() {
			let cert = record.parsed()?;
			serials.push(serial(&cert));

			let ku = cert.key_usage()?.expect("key usage present").value;
			if record.profile().is_ca {
				assert!(ku.key_cert_sign());
			} else {
				assert!(ku.digital_signature());
				assert!(!ku.key_cert_sign());
				assert!(!ku.crl_sign());
			}
		}
		serials.sort();
		serials.dedup();
		assert_eq!(serials.len(), 4);
		Ok(())
	}
}
