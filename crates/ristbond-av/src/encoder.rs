//! Encoder invocation: one encode, fanned out to every sink via the tee muxer.

use std::fmt;

use ristbond_core::config::IngestKind;
use ristbond_core::{Config, Result, Role, SenderMode};

use crate::spec::ProcessSpec;

/// Bitstream filter that inserts access unit delimiters into H.264.
const AUD_BSF: &str = "h264_metadata=aud=insert";

/// How a sink receives the stream's codec headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStrategy {
    /// Headers repeated in-band ahead of keyframes, for late-joining readers.
    InBand,
    /// Headers carried once out-of-band in the container's global header.
    Global,
}

/// One output branch of the tee muxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeeSink {
    pub format: &'static str,
    pub options: Vec<(String, String)>,
    pub url: String,
    pub headers: HeaderStrategy,
}

impl fmt::Display for TeeSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[f={}", self.format)?;
        for (key, value) in &self.options {
            write!(f, ":{key}={value}")?;
        }
        write!(f, "]{}", self.url)
    }
}

/// Build the encoder/multiplexer invocation for `config`.
///
/// Fails with [`ristbond_core::Error::UnsupportedIngestKind`] when
/// `ingest.source` is not a known kind.
pub fn synthesize_encoder_invocation(config: &Config) -> Result<ProcessSpec> {
    let kind = config.ingest.kind()?;
    let video = &config.video;
    let audio = &config.audio;
    let relay_copy = config.mediamtx.wants_rtmp_copy();

    let mut spec = ProcessSpec::new(Role::Encoder, config.tools.ffmpeg());
    spec.env("AV_LOG_FORCE_NOCOLOR", "1");
    spec.args(["-hide_banner", "-nostats"]);

    // Ingest
    match kind {
        IngestKind::TestSignal => {
            spec.args(["-re", "-f", "lavfi", "-i"]);
            spec.arg(format!(
                "testsrc2=size={}:rate={},format=yuv420p",
                video.size, video.fps
            ));
            if audio.enable {
                spec.args(["-f", "lavfi", "-i"]);
                spec.arg(format!("sine=frequency=1000:sample_rate={}", audio.sample_rate));
            }
        }
        IngestKind::Capture => {
            spec.args(["-f", "v4l2", "-framerate"]);
            spec.arg(video.fps.to_string());
            spec.arg("-video_size").arg(video.size.as_str());
            spec.arg("-i").arg(config.ingest.uvc_device.as_str());
        }
        IngestKind::Pull => {
            spec.arg("-i").arg(config.ingest.rtmp_pull_url.as_str());
        }
    }

    // Stream selection
    spec.args(["-map", "0:v:0"]);
    let audio_input = match (audio.enable, kind) {
        (false, _) | (true, IngestKind::Capture) => None,
        (true, IngestKind::TestSignal) => Some("1:a:0"),
        (true, IngestKind::Pull) => Some("0:a:0?"),
    };
    if let Some(selector) = audio_input {
        spec.arg("-map").arg(selector);
    }

    // Video encode
    let gop = video.gop_frames().to_string();
    spec.arg("-c:v").arg(video.codec.as_str());
    spec.arg("-preset").arg(video.preset.as_str());
    if let Some(tune) = video.tune.as_deref().filter(|t| !t.is_empty()) {
        spec.arg("-tune").arg(tune);
    }
    spec.arg("-g").arg(gop.as_str());
    spec.arg("-keyint_min").arg(gop.as_str());
    if !video.x264_params.is_empty() {
        spec.arg("-x264-params").arg(video.x264_params.as_str());
    }
    spec.arg("-force_key_frames").arg(format!(
        "expr:gte(t,n_forced*{})",
        video.force_keyint_sec
    ));
    spec.arg("-b:v").arg(format!("{}k", video.bitrate_kbps));
    spec.arg("-maxrate").arg(format!("{}k", video.maxrate_kbps()));
    spec.arg("-bufsize").arg(format!("{}k", video.bufsize_kbps()));
    spec.arg("-pix_fmt").arg(video.pix_fmt.as_str());
    if relay_copy {
        spec.args(["-flags", "+global_header"]);
    }

    // Audio encode
    if audio_input.is_some() {
        spec.arg("-c:a").arg(audio.codec.as_str());
        spec.arg("-b:a").arg(format!("{}k", audio.bitrate_kbps));
        spec.arg("-ar").arg(audio.sample_rate.to_string());
        spec.arg("-ac").arg(audio.channels.to_string());
    } else {
        spec.arg("-an");
    }

    // AUD insertion conflicts with the FLV copy's global headers.
    if video.insert_aud && !relay_copy {
        spec.args(["-bsf:v", AUD_BSF]);
    }

    // Low-latency muxing, then the fan-out.
    spec.args(["-flush_packets", "1", "-muxdelay", "0", "-muxpreload", "0"]);
    let sinks = tee_sinks(config)
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("|");
    spec.args(["-f", "tee"]).arg(sinks);

    Ok(spec)
}

/// Loopback UDP ports the encoder writes to, in output order.
///
/// In the per-path shape every configured path's feed port is included,
/// enabled or not, so toggling a path never changes the encoder topology.
pub fn loopback_ports(config: &Config) -> Vec<u16> {
    let mut ports = config.tee.udp_ports.clone();
    if config.rist.mode == SenderMode::PerPath {
        ports.extend((0..config.rist.senders.len()).filter_map(|i| config.feed_port(i)));
    }
    ports
}

/// Every output branch of the tee muxer, loopback sinks first.
pub fn tee_sinks(config: &Config) -> Vec<TeeSink> {
    let relay_copy = config.mediamtx.wants_rtmp_copy();
    let flags = config.tee.mpegts_flags.trim();
    let flags = flags.strip_prefix("mpegts_flags=").unwrap_or(flags);

    let mut sinks: Vec<TeeSink> = loopback_ports(config)
        .into_iter()
        .map(|port| {
            let mut options = vec![("mpegts_flags".to_string(), flags.to_string())];
            if relay_copy {
                // Codec headers went global; put them back in-band for this sink.
                options.push(("bsfs/v".to_string(), "dump_extra".to_string()));
            }
            TeeSink {
                format: "mpegts",
                options,
                url: format!("udp://127.0.0.1:{port}?pkt_size={}", config.tee.pkt_size),
                headers: HeaderStrategy::InBand,
            }
        })
        .collect();

    if relay_copy {
        sinks.push(TeeSink {
            format: "flv",
            options: vec![
                ("flvflags".to_string(), "no_duration_filesize".to_string()),
                ("onfail".to_string(), "ignore".to_string()),
            ],
            url: config.mediamtx.publish_rtmp_url.trim().to_string(),
            headers: HeaderStrategy::Global,
        });
    }

    sinks
}
