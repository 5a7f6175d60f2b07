use crate::evm::*;

use std::path::{Path, PathBuf};

use ballot_box::{Document, Roster, PLACEHOLDER_POSITION_COUNT};
use serde::{Deserialize, Serialize};
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;

pub const DEFAULT_DATA_DIRECTORY: &str = "data";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElectionConfig {
    #[serde(rename = "electionName")]
    pub election_name: Option<String>,
    #[serde(rename = "dataDirectory")]
    pub data_directory: Option<String>,
    #[serde(rename = "adminPassword")]
    pub admin_password: Option<String>,
    #[serde(rename = "specialVotePassword")]
    pub special_vote_password: Option<String>,
    #[serde(rename = "placeholderPositions")]
    pub placeholder_positions: Option<usize>,
    #[serde(rename = "initialCandidates")]
    pub initial_candidates: Option<JSMap<String, JSValue>>,
}

impl ElectionConfig {
    pub fn election_name(&self) -> &str {
        self.election_name.as_deref().unwrap_or("School Elections")
    }

    pub fn placeholder_positions(&self) -> usize {
        self.placeholder_positions
            .unwrap_or(PLACEHOLDER_POSITION_COUNT)
    }

    /// The roster used when the candidates document does not exist yet.
    pub fn initial_roster(&self) -> Roster {
        self.initial_candidates
            .as_ref()
            .map(Roster::from_json)
            .unwrap_or_default()
    }

    /// The data directory, relative to the directory of the configuration
    /// file if there is one.
    pub fn data_directory(&self, config_path: Option<&str>) -> PathBuf {
        let dir = self
            .data_directory
            .as_deref()
            .unwrap_or(DEFAULT_DATA_DIRECTORY);
        let p = Path::new(dir);
        match config_path.and_then(|cp| Path::new(cp).parent()) {
            Some(root) if p.is_relative() => root.join(p),
            _ => p.to_path_buf(),
        }
    }
}

pub fn read_config(path: &str) -> EvmResult<ElectionConfig> {
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let config: ElectionConfig =
        serde_json::from_str(&contents).context(ParsingConfigSnafu { path })?;
    debug!("read_config: {:?}", config);
    Ok(config)
}
