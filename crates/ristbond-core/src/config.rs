//! Appliance configuration types.
//!
//! The top-level [`Config`] struct is deserialized from YAML and describes the
//! desired pipeline: encode parameters, ingest source, loopback fan-out, relay
//! server, and the ordered list of bonded paths. Every section defaults
//! sensibly so an empty document is valid.

use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ValidationError};
use crate::Error;

/// Accepted range for a path's scheduling weight.
pub const WEIGHT_RANGE: RangeInclusive<i64> = 0..=1000;
/// Accepted range for the bonding buffer, in milliseconds.
pub const BUFFER_MS_RANGE: RangeInclusive<u32> = 50..=30_000;
/// Accepted range for a path's bandwidth ceiling, in kbps.
pub const BANDWIDTH_KBPS_RANGE: RangeInclusive<u32> = 100..=1_000_000;
/// Accepted range for the reorder buffer, in milliseconds.
pub const REORDER_MS_RANGE: RangeInclusive<u32> = 0..=10_000;
/// Accepted range for RTT bounds, in milliseconds.
pub const RTT_MS_RANGE: RangeInclusive<u32> = 1..=10_000;

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root appliance configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ui: UiConfig,
    pub logging: LoggingConfig,
    pub supervisor: SupervisorConfig,
    pub tools: ToolsConfig,
    pub video: VideoConfig,
    pub audio: AudioConfig,
    pub ingest: IngestConfig,
    pub tee: TeeConfig,
    pub mediamtx: RelayConfig,
    pub stream: StreamConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub rist: RistConfig,
}

impl Config {
    /// Deserialize a `Config` from YAML text.
    ///
    /// An empty (or comment-only) document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let value: serde_yaml::Value =
            serde_yaml::from_str(text).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_yaml::from_value(value).map_err(|e| Error::Config(format!("config parse error: {e}")))
    }

    /// Serialize back to YAML, keeping field order.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| Error::Internal(format!("serialize config: {e}")))
    }

    /// Validate and hand back the config, or every problem found.
    pub fn validated(self) -> Result<Self> {
        let problems = self.validate();
        if problems.is_empty() {
            Ok(self)
        } else {
            Err(Error::Validation(problems))
        }
    }

    /// Return every out-of-range or conflicting field.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut problems = Vec::new();

        if let Err(e) = self.ingest.kind() {
            problems.push(ValidationError::new("ingest.source", e.to_string()));
        }

        self.video.validate(&mut problems);
        self.audio.validate(&mut problems);
        self.validate_ports(&mut problems);
        self.rist.validate(&mut problems);

        if let Err(e) = self.ui.host_port() {
            problems.push(ValidationError::new("ui.listen", e.to_string()));
        }

        problems
    }

    fn validate_ports(&self, problems: &mut Vec<ValidationError>) {
        let ports = &self.tee.udp_ports;
        if ports.is_empty() {
            problems.push(ValidationError::new("tee.udp_ports", "must not be empty"));
        }

        let mut seen = HashSet::new();
        for port in ports {
            if *port == 0 {
                problems.push(ValidationError::new("tee.udp_ports", "port 0 is not allowed"));
            } else if !seen.insert(*port) {
                problems.push(ValidationError::new(
                    "tee.udp_ports",
                    format!("port {port} is listed more than once"),
                ));
            }
        }

        if let Some(ingress) = self.tee.ingress_port {
            if !ports.contains(&ingress) {
                problems.push(ValidationError::new(
                    "tee.ingress_port",
                    format!("port {ingress} is not one of tee.udp_ports"),
                ));
            }
        }

        if self.tee.pkt_size == 0 {
            problems.push(ValidationError::new("tee.pkt_size", "must be greater than 0"));
        }

        if self.rist.mode != SenderMode::PerPath {
            return;
        }

        let mut feeds = HashSet::new();
        for index in 0..self.rist.senders.len() {
            let Some(feed) = self.feed_port(index) else {
                problems.push(ValidationError::new(
                    format!("rist.senders[{index}].feed_port"),
                    "derived feed port overflows the port range",
                ));
                continue;
            };
            if seen.contains(&feed) {
                problems.push(ValidationError::new(
                    format!("rist.senders[{index}].feed_port"),
                    format!("port {feed} collides with tee.udp_ports"),
                ));
            }
            if !feeds.insert(feed) {
                problems.push(ValidationError::new(
                    format!("rist.senders[{index}].feed_port"),
                    format!("port {feed} is shared with another sender"),
                ));
            }
        }
    }

    /// Local loopback port that path `index` reads from in the per-path shape.
    pub fn feed_port(&self, index: usize) -> Option<u16> {
        let sender = self.rist.senders.get(index)?;
        if let Some(port) = sender.feed_port {
            return Some(port);
        }
        let offset = u16::try_from(index).ok()?;
        self.tee.feed_base_port.checked_add(offset)
    }

    /// Resolve path `index` against the global bonding defaults.
    pub fn resolved_sender(&self, index: usize) -> Option<ResolvedSender> {
        let s = self.rist.senders.get(index)?;
        let r = &self.rist;
        let rtt_min_ms = s.rtt_min_ms.unwrap_or(r.rtt_min_ms);
        let secret = r.encryption.secret.trim();
        let encryption = (r.encryption.enabled
            && matches!(r.encryption.aes_type, 128 | 256)
            && !secret.is_empty())
        .then(|| Encryption {
            aes_type: r.encryption.aes_type,
            secret: secret.to_string(),
        });

        Some(ResolvedSender {
            index,
            cname: s.cname.clone().unwrap_or_else(|| format!("m{index}")),
            enabled: s.enabled,
            weight: s.weight,
            virt_ip: s
                .virt_ip
                .clone()
                .unwrap_or_else(|| format!("10.255.0.{}", index + 1)),
            virt_port: s.port.unwrap_or_else(|| default_virt_port(index)),
            feed_port: self.feed_port(index),
            buffer_ms: s.buffer_ms.unwrap_or(r.buffer_ms),
            bandwidth_kbps: s.bandwidth_kbps.unwrap_or(r.bandwidth_kbps),
            reorder_buffer_ms: r.reorder_buffer_ms,
            rtt_min_ms,
            rtt_max_ms: s.rtt_max_ms.or(r.rtt_max_ms).unwrap_or(rtt_min_ms),
            encryption,
            run_uid: s.run_uid.unwrap_or(r.run_uid),
            run_gid: s.run_gid.unwrap_or(r.run_gid),
        })
    }

    /// Resolve the HLS preview URL shown next to the pipeline status.
    ///
    /// An explicit `preview_url` wins; otherwise the relay's public host is
    /// used, falling back to the host the operator reached us on.
    pub fn preview_url(&self, request_host: Option<&str>) -> String {
        if let Some(url) = self.preview_url.as_deref().map(str::trim) {
            if !url.is_empty() {
                return url.to_string();
            }
        }

        let configured = self
            .mediamtx
            .public_host
            .as_deref()
            .map(str::trim)
            .filter(|h| !h.is_empty());
        let host = match configured {
            Some(h) => h.to_string(),
            None => request_host
                .map(strip_port)
                .filter(|h| !h.is_empty())
                .unwrap_or("localhost")
                .to_string(),
        };
        let name = match self.stream.name.trim() {
            "" => "obs",
            n => n,
        };
        format!("http://{host}:{}/{name}/index.m3u8", self.mediamtx.http_port)
    }
}

fn default_virt_port(index: usize) -> u16 {
    u16::try_from(9000 + index + 1).unwrap_or(u16::MAX)
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        return rest.split(']').next().unwrap_or_default();
    }
    host.split(':').next().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Control-plane listen settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// `host:port`, or a bare port bound on all interfaces.
    pub listen: String,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8081".into(),
        }
    }
}

impl UiConfig {
    /// Split `listen` into host and port.
    pub fn host_port(&self) -> Result<(String, u16)> {
        let listen = self.listen.trim();
        let (host, port) = match listen.rsplit_once(':') {
            Some((h, p)) => (h.trim_start_matches('[').trim_end_matches(']'), p),
            None => ("0.0.0.0", listen),
        };
        let port = port
            .parse::<u16>()
            .map_err(|e| Error::Config(format!("invalid listen port '{port}': {e}")))?;
        Ok((host.to_string(), port))
    }
}

/// Where per-process logs are written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub log_dir: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/data/logs"),
        }
    }
}

/// Process supervision knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Seconds between the graceful stop signal and a forced kill.
    pub grace_secs: u64,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self { grace_secs: 5 }
    }
}

/// Paths to external programs. Unset entries are looked up in `PATH`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
    pub ristsender_path: Option<PathBuf>,
    pub mediamtx_path: Option<PathBuf>,
}

impl ToolsConfig {
    pub fn ffmpeg(&self) -> PathBuf {
        self.ffmpeg_path.clone().unwrap_or_else(|| "ffmpeg".into())
    }

    pub fn ristsender(&self) -> PathBuf {
        self.ristsender_path
            .clone()
            .unwrap_or_else(|| "ristsender".into())
    }

    pub fn mediamtx(&self) -> PathBuf {
        self.mediamtx_path
            .clone()
            .unwrap_or_else(|| "/usr/local/bin/mediamtx".into())
    }
}

/// Video encode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Frame size as `WxH`.
    pub size: String,
    pub fps: u32,
    pub codec: String,
    pub preset: String,
    pub tune: Option<String>,
    pub pix_fmt: String,
    pub bitrate_kbps: u32,
    pub maxrate_kbps: Option<u32>,
    pub bufsize_kbps: Option<u32>,
    /// Explicit GOP length in frames; derived from `gop_seconds` when unset.
    pub gop: Option<u32>,
    pub gop_seconds: u32,
    /// Wall-clock cadence of forced keyframes.
    pub force_keyint_sec: u32,
    pub x264_params: String,
    /// Insert access unit delimiters (ignored when a relay copy is published).
    pub insert_aud: bool,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            size: "1280x720".into(),
            fps: 30,
            codec: "libx264".into(),
            preset: "veryfast".into(),
            tune: Some("zerolatency".into()),
            pix_fmt: "yuv420p".into(),
            bitrate_kbps: 4000,
            maxrate_kbps: None,
            bufsize_kbps: None,
            gop: None,
            gop_seconds: 2,
            force_keyint_sec: 1,
            x264_params: "scenecut=0:open_gop=0:repeat-headers=1".into(),
            insert_aud: true,
        }
    }
}

impl VideoConfig {
    pub fn maxrate_kbps(&self) -> u32 {
        self.maxrate_kbps.unwrap_or(self.bitrate_kbps)
    }

    pub fn bufsize_kbps(&self) -> u32 {
        self.bufsize_kbps
            .unwrap_or_else(|| self.bitrate_kbps.saturating_mul(2))
    }

    /// Keyframe interval in frames.
    pub fn gop_frames(&self) -> u32 {
        self.gop
            .unwrap_or_else(|| self.fps.saturating_mul(self.gop_seconds))
    }

    fn validate(&self, problems: &mut Vec<ValidationError>) {
        if !(1..=240).contains(&self.fps) {
            problems.push(ValidationError::new("video.fps", "must be within 1..=240"));
        }
        if self.bitrate_kbps == 0 {
            problems.push(ValidationError::new("video.bitrate_kbps", "must be greater than 0"));
        }
        if self.gop_frames() == 0 {
            problems.push(ValidationError::new("video.gop", "keyframe interval must be at least 1 frame"));
        }
        if self.force_keyint_sec == 0 {
            problems.push(ValidationError::new("video.force_keyint_sec", "must be at least 1"));
        }
        let valid_size = self
            .size
            .split_once('x')
            .map(|(w, h)| w.parse::<u32>().is_ok() && h.parse::<u32>().is_ok())
            .unwrap_or(false);
        if !valid_size {
            problems.push(ValidationError::new(
                "video.size",
                format!("'{}' is not of the form WIDTHxHEIGHT", self.size),
            ));
        }
    }
}

/// Audio encode parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub enable: bool,
    pub codec: String,
    pub bitrate_kbps: u32,
    pub sample_rate: u32,
    pub channels: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            enable: true,
            codec: "aac".into(),
            bitrate_kbps: 128,
            sample_rate: 48_000,
            channels: 2,
        }
    }
}

impl AudioConfig {
    fn validate(&self, problems: &mut Vec<ValidationError>) {
        if !self.enable {
            return;
        }
        if !(1..=8).contains(&self.channels) {
            problems.push(ValidationError::new("audio.channels", "must be within 1..=8"));
        }
        if self.sample_rate == 0 {
            problems.push(ValidationError::new("audio.sample_rate", "must be greater than 0"));
        }
    }
}

/// Where the encoder takes its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    /// Generated test pattern and tone.
    TestSignal,
    /// A local V4L2 capture device.
    Capture,
    /// A stream pulled from an RTMP URL.
    Pull,
}

impl FromStr for IngestKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "test" => Ok(IngestKind::TestSignal),
            "uvc" => Ok(IngestKind::Capture),
            "rtmp_pull" => Ok(IngestKind::Pull),
            other => Err(Error::UnsupportedIngestKind(other.to_string())),
        }
    }
}

/// Ingest source selection.
///
/// `source` stays a free-form string so an unknown kind reaches validation
/// and synthesis as [`Error::UnsupportedIngestKind`] rather than failing the
/// whole document parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub source: String,
    pub uvc_device: String,
    pub rtmp_pull_url: String,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source: "test".into(),
            uvc_device: "/dev/video0".into(),
            rtmp_pull_url: "rtmp://127.0.0.1/live/stream".into(),
        }
    }
}

impl IngestConfig {
    pub fn kind(&self) -> Result<IngestKind> {
        self.source.parse()
    }
}

/// Loopback fan-out from the encoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeeConfig {
    /// Loopback UDP ports that always receive a copy of the mux output.
    pub udp_ports: Vec<u16>,
    pub mpegts_flags: String,
    pub pkt_size: u32,
    /// Port the single-shape sender reads; defaults to the first `udp_ports` entry.
    pub ingress_port: Option<u16>,
    /// First per-path feed port in the per-path shape.
    pub feed_base_port: u16,
}

impl Default for TeeConfig {
    fn default() -> Self {
        Self {
            udp_ports: vec![10000, 10001, 10002, 10003, 10010],
            mpegts_flags: "+resend_headers+pat_pmt_at_frames".into(),
            pkt_size: 1316,
            ingress_port: None,
            feed_base_port: 11000,
        }
    }
}

impl TeeConfig {
    pub fn ingress_port(&self) -> u16 {
        self.ingress_port
            .or_else(|| self.udp_ports.first().copied())
            .unwrap_or(10000)
    }
}

/// Media relay server and its RTMP copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub enable: bool,
    pub config_path: PathBuf,
    pub publish_rtmp_copy: bool,
    pub publish_rtmp_url: String,
    pub public_host: Option<String>,
    pub http_port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enable: true,
            config_path: PathBuf::from("/app/mediamtx.yml"),
            publish_rtmp_copy: true,
            publish_rtmp_url: "rtmp://127.0.0.1/live/stream".into(),
            public_host: None,
            http_port: 8888,
        }
    }
}

impl RelayConfig {
    /// Whether the encoder should publish an RTMP copy.
    pub fn wants_rtmp_copy(&self) -> bool {
        self.publish_rtmp_copy && !self.publish_rtmp_url.trim().is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub name: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self { name: "obs".into() }
    }
}

/// How bonded paths map onto sender processes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderMode {
    /// One sender process per enabled path, each on its own feed port.
    #[default]
    PerPath,
    /// One sender process with an output per enabled path.
    Single,
}

/// Bonding-layer settings shared by every path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RistConfig {
    pub mode: SenderMode,
    pub buffer_ms: u32,
    pub bandwidth_kbps: u32,
    pub reorder_buffer_ms: u32,
    pub rtt_min_ms: u32,
    pub rtt_max_ms: Option<u32>,
    pub encryption: EncryptionConfig,
    pub run_uid: u32,
    pub run_gid: u32,
    pub senders: Vec<SenderSpec>,
}

impl Default for RistConfig {
    fn default() -> Self {
        Self {
            mode: SenderMode::PerPath,
            buffer_ms: 800,
            bandwidth_kbps: 12_000,
            reorder_buffer_ms: 120,
            rtt_min_ms: 80,
            rtt_max_ms: None,
            encryption: EncryptionConfig::default(),
            run_uid: 0,
            run_gid: 0,
            senders: Vec::new(),
        }
    }
}

impl RistConfig {
    fn validate(&self, problems: &mut Vec<ValidationError>) {
        check_range(problems, "rist.buffer_ms", self.buffer_ms, &BUFFER_MS_RANGE);
        check_range(problems, "rist.bandwidth_kbps", self.bandwidth_kbps, &BANDWIDTH_KBPS_RANGE);
        check_range(problems, "rist.reorder_buffer_ms", self.reorder_buffer_ms, &REORDER_MS_RANGE);
        check_range(problems, "rist.rtt_min_ms", self.rtt_min_ms, &RTT_MS_RANGE);
        if let Some(max) = self.rtt_max_ms {
            check_range(problems, "rist.rtt_max_ms", max, &RTT_MS_RANGE);
            if max < self.rtt_min_ms {
                problems.push(ValidationError::new("rist.rtt_max_ms", "must not be below rtt_min_ms"));
            }
        }

        let enc = &self.encryption;
        if enc.enabled {
            if enc.aes_type != 128 && enc.aes_type != 256 {
                problems.push(ValidationError::new("rist.encryption.type", "must be 128 or 256"));
            }
            if enc.secret.trim().is_empty() {
                problems.push(ValidationError::new(
                    "rist.encryption.secret",
                    "must be set when encryption is enabled",
                ));
            }
        }

        let mut destinations: BTreeMap<(String, u16), usize> = BTreeMap::new();
        for (i, s) in self.senders.iter().enumerate() {
            let field = |name: &str| format!("rist.senders[{i}].{name}");

            if !WEIGHT_RANGE.contains(&i64::from(s.weight)) {
                problems.push(ValidationError::new(field("weight"), "must be within 0..=1000"));
            }
            if let Some(v) = s.buffer_ms {
                check_range(problems, &field("buffer_ms"), v, &BUFFER_MS_RANGE);
            }
            if let Some(v) = s.bandwidth_kbps {
                check_range(problems, &field("bandwidth_kbps"), v, &BANDWIDTH_KBPS_RANGE);
            }
            if let Some(v) = s.rtt_min_ms {
                check_range(problems, &field("rtt_min_ms"), v, &RTT_MS_RANGE);
            }
            if let Some(v) = s.rtt_max_ms {
                check_range(problems, &field("rtt_max_ms"), v, &RTT_MS_RANGE);
            }
            if let Some(ref ip) = s.virt_ip {
                if ip.parse::<Ipv4Addr>().is_err() {
                    problems.push(ValidationError::new(
                        field("virt_ip"),
                        format!("'{ip}' is not an IPv4 address"),
                    ));
                }
            }
            if s.port == Some(0) {
                problems.push(ValidationError::new(field("port"), "port 0 is not allowed"));
            }

            let ip = s
                .virt_ip
                .clone()
                .unwrap_or_else(|| format!("10.255.0.{}", i + 1));
            let port = s.port.unwrap_or_else(|| default_virt_port(i));
            if let Some(other) = destinations.insert((ip.clone(), port), i) {
                problems.push(ValidationError::new(
                    field("port"),
                    format!("destination {ip}:{port} is already used by sender {other}"),
                ));
            }
        }
    }
}

fn check_range(
    problems: &mut Vec<ValidationError>,
    field: &str,
    value: u32,
    range: &RangeInclusive<u32>,
) {
    if !range.contains(&value) {
        problems.push(ValidationError::new(
            field,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        ));
    }
}

/// Optional AES encryption of every path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    pub enabled: bool,
    #[serde(rename = "type")]
    pub aes_type: u16,
    pub secret: String,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            aes_type: 128,
            secret: String::new(),
        }
    }
}

/// One bonded path as written in the configuration.
///
/// Unset fields fall back to the global [`RistConfig`] values or to the
/// index-derived defaults (`m{i}`, `10.255.0.{i+1}`, `9000+i+1`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cname: Option<String>,
    pub enabled: bool,
    pub weight: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virt_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bandwidth_kbps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_min_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rtt_max_ms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_uid: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_gid: Option<u32>,
}

impl Default for SenderSpec {
    fn default() -> Self {
        Self {
            cname: None,
            enabled: true,
            weight: 5,
            virt_ip: None,
            port: None,
            feed_port: None,
            buffer_ms: None,
            bandwidth_kbps: None,
            rtt_min_ms: None,
            rtt_max_ms: None,
            run_uid: None,
            run_gid: None,
        }
    }
}

/// Encryption parameters applied to a path's output URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encryption {
    pub aes_type: u16,
    pub secret: String,
}

/// A path with every default applied, ready for command synthesis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSender {
    pub index: usize,
    pub cname: String,
    pub enabled: bool,
    pub weight: u32,
    pub virt_ip: String,
    pub virt_port: u16,
    pub feed_port: Option<u16>,
    pub buffer_ms: u32,
    pub bandwidth_kbps: u32,
    pub reorder_buffer_ms: u32,
    pub rtt_min_ms: u32,
    pub rtt_max_ms: u32,
    pub encryption: Option<Encryption>,
    pub run_uid: u32,
    pub run_gid: u32,
}
