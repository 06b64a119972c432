use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WORK_DIR: &str = "rustle-cluster";

/// Operational flags for one run, independent of the cluster definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeArgs {
    pub work_dir: PathBuf,
    /// Keep going after a failed step, task or module
    pub ignore_err: bool,
    pub verbose: bool,
    /// Free-form `key=value` arguments passed through to units
    pub args: BTreeMap<String, String>,
    #[serde(with = "serde_duration")]
    pub connect_timeout: Duration,
}

impl Default for RuntimeArgs {
    fn default() -> Self {
        let work_dir = std::env::current_dir()
            .or_else(|_| dirs::home_dir().ok_or(()))
            .unwrap_or_else(|_| std::env::temp_dir())
            .join(DEFAULT_WORK_DIR);

        Self {
            work_dir,
            ignore_err: false,
            verbose: false,
            args: BTreeMap::new(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl RuntimeArgs {
    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args.get(key).map(String::as_str)
    }

    /// Control sockets for ssh masters live under the work dir
    pub fn control_dir(&self) -> PathBuf {
        self.work_dir.join("ssh")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.work_dir.join("results")
    }
}

mod serde_duration {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
