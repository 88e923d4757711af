//! Report presentation settings.

use serde::{Deserialize, Serialize};

/// Settings consumed by report front-ends.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// HTTP URL pattern for linking commits; `{commit}` receives the sha1.
    pub commit_url: Option<String>,

    /// Render rate results as frame times instead of rates.
    pub frametime: bool,
}
