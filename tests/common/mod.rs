//! Certificate fixtures generated at test time

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use check_cert::certificate::parse_chain;
use check_cert::Certificate;
use rcgen::{
    date_time_ymd, BasicConstraints, CertificateParams, DistinguishedName, DnType, IsCa,
    KeyPair,
};

/// A generated certificate and the key that signs its children
pub struct Issued {
    pub cert: rcgen::Certificate,
    pub key: KeyPair,
}

pub type Ymd = (i32, u8, u8);

fn params(cn: &str, sans: &[&str], not_before: Ymd, not_after: Ymd, serial: u64) -> CertificateParams {
    let sans: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
    let mut params = CertificateParams::new(sans).expect("valid SANs");
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, cn);
    params.distinguished_name = dn;
    params.not_before = date_time_ymd(not_before.0, not_before.1, not_before.2);
    params.not_after = date_time_ymd(not_after.0, not_after.1, not_after.2);
    params.serial_number = Some(serial.into());
    params
}

pub fn root(cn: &str, not_after: Ymd) -> Issued {
    let key = KeyPair::generate().expect("key generation");
    let mut params = params(cn, &[], (2020, 1, 1), not_after, 1);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params.self_signed(&key).expect("self-signed root");
    Issued { cert, key }
}

pub fn intermediate(cn: &str, issuer: &Issued, not_after: Ymd) -> Issued {
    let key = KeyPair::generate().expect("key generation");
    let mut params = params(cn, &[], (2020, 1, 1), not_after, 2);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    let cert = params
        .signed_by(&key, &issuer.cert, &issuer.key)
        .expect("signed intermediate");
    Issued { cert, key }
}

pub fn leaf(cn: &str, sans: &[&str], issuer: &Issued, not_after: Ymd) -> Issued {
    let key = KeyPair::generate().expect("key generation");
    let params = params(cn, sans, (2024, 1, 1), not_after, 3);
    let cert = params
        .signed_by(&key, &issuer.cert, &issuer.key)
        .expect("signed leaf");
    Issued { cert, key }
}

pub fn self_signed_leaf(cn: &str, sans: &[&str], not_after: Ymd) -> Issued {
    let key = KeyPair::generate().expect("key generation");
    let params = params(cn, sans, (2024, 1, 1), not_after, 4);
    let cert = params.self_signed(&key).expect("self-signed leaf");
    Issued { cert, key }
}

/// Leaf, intermediate and root for `www.example.com`.
///
/// The leaf is valid 2024-01-01 through 2025-04-01 unless built otherwise;
/// the issuers outlive it.
pub struct StandardChain {
    pub leaf: Issued,
    pub intermediate: Issued,
    pub root: Issued,
}

impl StandardChain {
    pub fn new() -> Self {
        Self::with_leaf_sans(&["www.example.com", "example.com"])
    }

    pub fn with_leaf_sans(sans: &[&str]) -> Self {
        Self::build(sans, (2025, 4, 1))
    }

    /// Same shape with the leaf expiring on `leaf_not_after`
    pub fn build(sans: &[&str], leaf_not_after: Ymd) -> Self {
        let root = root("Example Root CA", (2099, 1, 1));
        let intermediate = intermediate("Example Intermediate CA", &root, (2098, 1, 1));
        let leaf = leaf("www.example.com", sans, &intermediate, leaf_not_after);
        Self {
            leaf,
            intermediate,
            root,
        }
    }

    pub fn presented(&self) -> Vec<&Issued> {
        vec![&self.leaf, &self.intermediate, &self.root]
    }

    pub fn certificates(&self) -> Vec<Certificate> {
        parse(&self.presented())
    }

    pub fn pem(&self) -> String {
        pem_bundle(&self.presented())
    }
}

pub fn parse(certs: &[&Issued]) -> Vec<Certificate> {
    let ders: Vec<Vec<u8>> = certs.iter().map(|c| c.cert.der().to_vec()).collect();
    parse_chain(&ders).expect("generated certificates parse")
}

pub fn pem_bundle(certs: &[&Issued]) -> String {
    certs.iter().map(|c| c.cert.pem()).collect::<Vec<_>>().join("")
}

pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}
