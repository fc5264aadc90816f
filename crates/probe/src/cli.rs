use clap::Parser;
use driftwatch_core::Mode;

/// Connectivity probe for the drift monitoring backend.
///
/// Checks `/health`, the KPI endpoint of each requested mode, the errors
/// endpoint and the business units, one line per check.
#[derive(Parser, Debug)]
#[command(name = "drift-probe", about = "Probe the drift monitoring backend")]
pub struct ProbeArgs {
    /// Backend base URL (overrides the configured DRIFT_API_BASE)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Modes whose KPI endpoint is checked, comma separated (e.g. 1,mode2)
    #[arg(long, env = "DRIFT_PROBE_MODES", value_delimiter = ',', default_value = "1,2,3,4")]
    pub modes: Vec<Mode>,

    /// Retries per request (overrides the configured DRIFT_MAX_RETRIES)
    #[arg(long)]
    pub retries: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modes_default_to_all() {
        let args = ProbeArgs::try_parse_from(["drift-probe"]).unwrap();
        assert_eq!(args.modes, Mode::ALL.to_vec());
        assert!(args.base_url.is_none());
    }

    #[test]
    fn modes_accept_mixed_spellings() {
        let args = ProbeArgs::try_parse_from([
            "drift-probe",
            "--modes",
            "1,mode3",
            "--retries",
            "0",
            "--base-url",
            "http://drift:5000/api",
        ])
        .unwrap();
        assert_eq!(args.modes, vec![Mode::Mode1, Mode::Mode3]);
        assert_eq!(args.retries, Some(0));
        assert_eq!(args.base_url.as_deref(), Some("http://drift:5000/api"));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert!(ProbeArgs::try_parse_from(["drift-probe", "--modes", "7"]).is_err());
    }
}
