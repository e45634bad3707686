use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Per-stage instrumentation switches.
///
/// Every stage shares the same registry; these flags only decide which
/// observations this stage records. `port` is used by whichever stage
/// starts the registry first (6611 when unset or 0).
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq, JsonSchema)]
pub struct InstrumentationConfig {
    /// Count requests in `requests_total`.
    #[serde(default)]
    pub counter: bool,
    /// Observe request latency in `request_duration_seconds`.
    #[serde(default)]
    pub latency: bool,
    /// Port of the `/metrics` exposition endpoint.
    #[serde(default)]
    pub port: Option<u16>,
}
