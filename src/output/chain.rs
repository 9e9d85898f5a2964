//! Plain-text certificate chain summary for the DETAILED INFO section

use crate::certificate::chain::positions;
use crate::models::Certificate;
use chrono::{DateTime, Utc};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

fn expiry_note(cert: &Certificate, now: DateTime<Utc>) -> String {
    let days = cert.days_remaining(now);
    if cert.is_expired(now) {
        format!("expired {}d ago", days.unsigned_abs())
    } else {
        format!("expires in {}d", days)
    }
}

fn sans_line(cert: &Certificate) -> String {
    let entries: Vec<String> = cert
        .dns_names
        .iter()
        .cloned()
        .chain(cert.ip_addresses.iter().map(|ip| ip.to_string()))
        .collect();
    if entries.is_empty() {
        "none".to_string()
    } else {
        entries.join(", ")
    }
}

/// One block per certificate, leaf first as presented
pub fn format_chain_summary(chain: &[Certificate], now: DateTime<Utc>) -> String {
    let total = chain.len();
    positions(chain)
        .into_iter()
        .zip(chain)
        .enumerate()
        .map(|(i, (position, cert))| {
            let mut block = format!("Certificate {} of {} ({}):\n", i + 1, total, position);
            block.push_str(&format!("  Name: {}\n", cert.subject));
            block.push_str(&format!("  SANs entries: {}\n", sans_line(cert)));
            block.push_str(&format!("  Issuer: {}\n", cert.issuer));
            block.push_str(&format!("  Serial: {}\n", cert.serial_hex()));
            block.push_str(&format!(
                "  Issued On: {}\n",
                cert.not_before.format(TIMESTAMP_FORMAT)
            ));
            block.push_str(&format!(
                "  Expiration: {} ({})\n",
                cert.not_after.format(TIMESTAMP_FORMAT),
                expiry_note(cert, now)
            ));
            block.push_str(&format!(
                "  Signature Algorithm: {}",
                cert.signature_algorithm_name()
            ));
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
