//! The fixed identity profiles of the chain and the options that tweak them.

use std::fmt;

use rand::Rng;
use rcgen::{
	BasicConstraints, CertificateParams, DistinguishedName, DnType, DnValue,
	ExtendedKeyUsagePurpose, IsCa, KeyUsagePurpose, SanType, SerialNumber,
};
use time::{Duration, OffsetDateTime};

use crate::Error;

/// Serial number every certificate carries unless [SerialPolicy::Random] is picked.
pub const DEFAULT_SERIAL: u64 = 1028;

/// The four identities of the chain, in issuance order.
#[allow(missing_docs)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Identity {
	Root,
	Intermediate,
	Client,
	Server,
}

impl Identity {
	/// All identities, root first.
	pub const ALL: [Identity; 4] = [
		Identity::Root,
		Identity::Intermediate,
		Identity::Client,
		Identity::Server,
	];

	/// File name of the private key inside the key directory.
	pub fn key_file(self) -> &'static str {
		match self {
			Identity::Root => "privatekey.pem",
			Identity::Intermediate => "interPrivateKey.pem",
			Identity::Client => "clientPrivateKey.pem",
			Identity::Server => "serverPrivateKey.pem",
		}
	}

	/// File name of the certificate inside the output directory.
	pub fn output_file(self) -> &'static str {
		match self {
			Identity::Root => "root.pem",
			Identity::Intermediate => "intermediate.pem",
			Identity::Client => "client.pem",
			Identity::Server => "server.pem",
		}
	}

	/// The hardcoded profile of this identity.
	pub fn profile(self) -> &'static IdentityProfile {
		match self {
			Identity::Root => &ROOT,
			Identity::Intermediate => &INTERMEDIATE,
			Identity::Client => &CLIENT,
			Identity::Server => &SERVER,
		}
	}
}

impl fmt::Display for Identity {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Identity::Root => write!(f, "root"),
			Identity::Intermediate => write!(f, "intermediate"),
			Identity::Client => write!(f, "client"),
			Identity::Server => write!(f, "server"),
		}
	}
}

/// Subject distinguished name components. Empty components are left out
/// of the encoded name.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectName {
	pub common_name: &'static str,
	pub organization: &'static str,
	pub country: &'static str,
	pub province: &'static str,
	pub locality: &'static str,
}

impl SubjectName {
	/// Build the rcgen name in the usual C, ST, L, O, CN order.
	pub fn to_distinguished_name(&self) -> Result<DistinguishedName, rcgen::Error> {
		let mut dn = DistinguishedName::new();
		if !self.country.is_empty() {
			dn.push(
				DnType::CountryName,
				DnValue::PrintableString(self.country.try_into()?),
			);
		}
		let components = [
			(DnType::StateOrProvinceName, self.province),
			(DnType::LocalityName, self.locality),
			(DnType::OrganizationName, self.organization),
			(DnType::CommonName, self.common_name),
		];
		for (ty, value) in components {
			if !value.is_empty() {
				dn.push(ty, value);
			}
		}
		Ok(dn)
	}
}

/// Everything that goes into one level of the chain apart from keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityProfile {
	/// Which level of the chain this profile describes.
	pub identity: Identity,
	/// Subject name of the certificate.
	pub subject: SubjectName,
	/// Calendar years between not-before and not-after.
	pub validity_years: u8,
	/// Whether the certificate may sign other certificates.
	pub is_ca: bool,
	/// DNS subject alternative names.
	pub dns_names: &'static [&'static str],
}

static ROOT: IdentityProfile = IdentityProfile {
	identity: Identity::Root,
	subject: SubjectName {
		common_name: "exampleCA",
		organization: "Company, INC.",
		country: "US",
		province: "",
		locality: "San Francisco",
	},
	validity_years: 10,
	is_ca: true,
	dns_names: &["localhost"],
};

static INTERMEDIATE: IdentityProfile = IdentityProfile {
	identity: Identity::Intermediate,
	subject: SubjectName {
		common_name: "",
		organization: "Intermediate",
		country: "US",
		province: "",
		locality: "Los Angelos",
	},
	validity_years: 3,
	is_ca: true,
	dns_names: &[],
};

static CLIENT: IdentityProfile = IdentityProfile {
	identity: Identity::Client,
	subject: SubjectName {
		common_name: "localhost",
		organization: "client",
		country: "Uk",
		province: "",
		locality: "London",
	},
	validity_years: 1,
	is_ca: false,
	dns_names: &["localhost"],
};

static SERVER: IdentityProfile = IdentityProfile {
	identity: Identity::Server,
	subject: SubjectName {
		common_name: "localhost",
		organization: "server",
		country: "US",
		province: "",
		locality: "Los Angelos",
	},
	validity_years: 1,
	is_ca: false,
	dns_names: &["localhost"],
};

/// How serial numbers are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerialPolicy {
	/// Every certificate gets [DEFAULT_SERIAL].
	#[default]
	Fixed,
	/// Every certificate gets a random positive 63 bit serial.
	Random,
}

impl SerialPolicy {
	fn serial(self) -> SerialNumber {
		match self {
			SerialPolicy::Fixed => SerialNumber::from(DEFAULT_SERIAL),
			SerialPolicy::Random => {
				SerialNumber::from(rand::thread_rng().gen_range(1..=i64::MAX as u64))
			},
		}
	}
}

/// Key usage bits put on the client and server certificates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeafKeyUsage {
	/// keyCertSign and cRLSign, exactly like the CA levels.
	#[default]
	Compatible,
	/// digitalSignature only.
	Strict,
}

/// Knobs applied on top of the hardcoded profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChainOptions {
	/// Serial number assignment.
	pub serials: SerialPolicy,
	/// Key usage on leaf certificates.
	pub leaf_key_usage: LeafKeyUsage,
}

impl IdentityProfile {
	/// Turn the profile into rcgen parameters valid from `not_before`.
	pub fn to_params(
		&self,
		not_before: OffsetDateTime,
		options: &ChainOptions,
	) -> crate::Result<CertificateParams> {
		let identity = self.identity;
		let profile_err = |source: rcgen::Error| Error::Profile { identity, source };

		let mut params = CertificateParams::default();
		params.distinguished_name = self
			.subject
			.to_distinguished_name()
			.map_err(profile_err)?;
		params.subject_alt_names = self
			.dns_names
			.iter()
			.map(|name| Ok(SanType::DnsName((*name).try_into()?)))
			.collect::<Result<_, rcgen::Error>>()
			.map_err(profile_err)?;
		params.not_before = not_before;
		params.not_after = years_after(not_before, self.validity_years)
			.ok_or_else(|| profile_err(rcgen::Error::Time))?;
		params.serial_number = Some(options.serials.serial());
		params.is_ca = if self.is_ca {
			IsCa::Ca(BasicConstraints::Unconstrained)
		} else {
			IsCa::ExplicitNoCa
		};
		params.key_usages = if self.is_ca || options.leaf_key_usage == LeafKeyUsage::Compatible {
			vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign]
		} else {
			vec![KeyUsagePurpose::DigitalSignature]
		};
		params.extended_key_usages = vec![
			ExtendedKeyUsagePurpose::ClientAuth,
			ExtendedKeyUsagePurpose::ServerAuth,
		];
		Ok(params)
	}
}

/// Add calendar years. Feb 29 landing in a common year rolls over to Mar 1.
pub fn years_after(start: OffsetDateTime, years: u8) -> Option<OffsetDateTime> {
	let year = start.year() + i32::from(years);
	match start.replace_year(year) {
		Ok(end) => Some(end),
		Err(_) => start
			.replace_day(28)
			.ok()?
			.replace_year(year)
			.ok()?
			.checked_add(Duration::days(1)),
	}
}
