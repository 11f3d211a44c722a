//! Bonding sender invocations for both deployment shapes.
//!
//! In the per-path shape each enabled path gets its own `ristsender` reading
//! a dedicated loopback feed. In the single shape one `ristsender` reads the
//! shared ingress port and emits one weighted output per enabled path.

use std::collections::BTreeSet;

use ristbond_core::config::ResolvedSender;
use ristbond_core::{Config, Error, Result, Role, SenderMode};

use crate::spec::{Identity, ProcessSpec};

/// Which shape the configuration asks for.
pub fn sender_shape(config: &Config) -> SenderMode {
    config.rist.mode
}

/// Bonding egress URL for one resolved path.
pub fn rist_output_url(sender: &ResolvedSender) -> String {
    let mut url = format!(
        "rist://{}:{}?cname={}&buffer={}&bandwidth={}&weight={}&reorder-buffer={}&rtt-min={}&rtt-max={}",
        sender.virt_ip,
        sender.virt_port,
        sender.cname,
        sender.buffer_ms,
        sender.bandwidth_kbps,
        sender.weight,
        sender.reorder_buffer_ms,
        sender.rtt_min_ms,
        sender.rtt_max_ms,
    );
    if let Some(ref enc) = sender.encryption {
        url.push_str(&format!("&aes-type={}&secret={}", enc.aes_type, enc.secret));
    }
    url
}

fn loopback_input(port: u16) -> String {
    format!("udp://127.0.0.1:{port}")
}

/// Invocation for path `index` in the per-path shape.
///
/// A disabled path yields `Ok(None)`: absence means "ensure not running".
pub fn synthesize_path_invocation(config: &Config, index: usize) -> Result<Option<ProcessSpec>> {
    let len = config.rist.senders.len();
    let sender = config
        .resolved_sender(index)
        .ok_or(Error::BadIndex { index, len })?;
    if !sender.enabled {
        return Ok(None);
    }
    let feed = sender.feed_port.ok_or_else(|| {
        Error::InvalidConfig(format!("sender {index} has no usable feed port"))
    })?;

    let mut spec = ProcessSpec::new(Role::Sender(index), config.tools.ristsender());
    spec.arg("-i").arg(loopback_input(feed));
    spec.arg("-o").arg(rist_output_url(&sender));
    spec.identity(Identity::from_ids(sender.run_uid, sender.run_gid));
    Ok(Some(spec))
}

/// Invocation for the single-shape bonding process.
///
/// Enabled paths are emitted in index order, skipping any listed in
/// `excluded`. Fails with [`Error::NoEnabledSenders`] when nothing is left.
pub fn synthesize_bond_invocation(
    config: &Config,
    excluded: &BTreeSet<usize>,
) -> Result<ProcessSpec> {
    let outputs: Vec<String> = (0..config.rist.senders.len())
        .filter(|i| !excluded.contains(i))
        .filter_map(|i| config.resolved_sender(i))
        .filter(|s| s.enabled)
        .map(|s| rist_output_url(&s))
        .collect();
    if outputs.is_empty() {
        return Err(Error::NoEnabledSenders);
    }

    let mut spec = ProcessSpec::new(Role::Bond, config.tools.ristsender());
    spec.arg("-i").arg(loopback_input(config.tee.ingress_port()));
    for url in outputs {
        spec.arg("-o").arg(url);
    }
    spec.identity(Identity::from_ids(config.rist.run_uid, config.rist.run_gid));
    Ok(spec)
}

/// Every sender invocation the configured shape calls for.
pub fn synthesize_sender_invocations(config: &Config) -> Result<Vec<ProcessSpec>> {
    match sender_shape(config) {
        SenderMode::PerPath => {
            let mut specs = Vec::new();
            for index in 0..config.rist.senders.len() {
                if let Some(spec) = synthesize_path_invocation(config, index)? {
                    specs.push(spec);
                }
            }
            Ok(specs)
        }
        SenderMode::Single => Ok(vec![synthesize_bond_invocation(config, &BTreeSet::new())?]),
    }
}
