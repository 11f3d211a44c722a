//! Media relay server invocation.

use ristbond_core::{Config, Role};

use crate::spec::ProcessSpec;

/// Build the relay invocation, or `None` when the relay is disabled.
///
/// The relay reads its own listen/publish settings from the file at
/// `mediamtx.config_path`; it runs from that file's directory.
pub fn synthesize_relay_invocation(config: &Config) -> Option<ProcessSpec> {
    let relay = &config.mediamtx;
    if !relay.enable {
        return None;
    }

    let mut spec = ProcessSpec::new(Role::Relay, config.tools.mediamtx());
    spec.arg(relay.config_path.to_string_lossy());
    if let Some(dir) = relay.config_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        spec.working_dir(dir);
    }
    Some(spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn enabled_relay() {
        let cfg = Config::default();
        let spec = synthesize_relay_invocation(&cfg).unwrap();
        assert_eq!(spec.name, "mediamtx");
        assert_eq!(spec.program, Path::new("/usr/local/bin/mediamtx"));
        assert_eq!(spec.args, ["/app/mediamtx.yml"]);
        assert_eq!(spec.working_dir.as_deref(), Some(Path::new("/app")));
    }

    #[test]
    fn disabled_relay_has_no_spec() {
        let mut cfg = Config::default();
        cfg.mediamtx.enable = false;
        assert!(synthesize_relay_invocation(&cfg).is_none());
    }

    #[test]
    fn bare_file_name_has_no_working_dir() {
        let mut cfg = Config::default();
        cfg.mediamtx.config_path = "mediamtx.yml".into();
        let spec = synthesize_relay_invocation(&cfg).unwrap();
        assert!(spec.working_dir.is_none());
    }
}
