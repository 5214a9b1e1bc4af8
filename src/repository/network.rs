//! DataONE network a member node belongs to.

use serde::{Deserialize, Serialize};

const PRODUCTION_CN: &str = "https://cn.dataone.org/cn";
const DEVELOPMENT_CN: &str = "https://cn-stage-2.test.dataone.org/cn";

const PRODUCTION_SEARCH: &str = "https://search.dataone.org";
const DEVELOPMENT_SEARCH: &str = "https://dev.nceas.ucsb.edu";

/// Member node used for development publishing.
pub const DEVELOPMENT_MEMBER_NODE: &str = "https://dev.nceas.ucsb.edu/knb/d1/mn/v2";

const DEVELOPMENT_MN_HOST: &str = "dev.nceas.ucsb.edu";
const DATAONE_DOMAIN: &str = "dataone.org";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Production,
    Development,
}

impl Network {
    /// Infers the network from a member node URL. The development member
    /// node and any `*.test.dataone.org` host are development; everything
    /// else is production.
    pub fn for_node(node_url: &str) -> Self {
        match host_of(node_url) {
            Some(host) if host == DEVELOPMENT_MN_HOST || host.ends_with(".test.dataone.org") => {
                Network::Development
            }
            _ => Network::Production,
        }
    }

    pub fn coordinating_node(&self) -> &'static str {
        match self {
            Network::Production => PRODUCTION_CN,
            Network::Development => DEVELOPMENT_CN,
        }
    }

    /// URI under which the coordinating node resolves `pid`.
    pub fn resolve_uri(&self, pid: &str) -> String {
        format!(
            "{}/v2/resolve/{}",
            self.coordinating_node(),
            urlencoding::encode(pid)
        )
    }

    /// Public landing page of a package, keyed by its resource map pid.
    pub fn landing_page(&self, resource_map_pid: &str) -> String {
        let search = match self {
            Network::Production => PRODUCTION_SEARCH,
            Network::Development => DEVELOPMENT_SEARCH,
        };
        format!("{}/#view/{}", search, resource_map_pid)
    }

    /// Whether `url` points into this network.
    pub fn hosts_url(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        let in_domain = host == DATAONE_DOMAIN || host.ends_with(".dataone.org");
        match self {
            Network::Production => in_domain,
            Network::Development => in_domain || host == DEVELOPMENT_MN_HOST,
        }
    }
}

fn host_of(url: &str) -> Option<String> {
    url::Url::parse(url.trim())
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_ascii_lowercase))
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Production => write!(f, "production"),
            Network::Development => write!(f, "development"),
        }
    }
}

impl std::str::FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Ok(Network::Production),
            "development" | "dev" => Ok(Network::Development),
            other => Err(format!("Unknown DataONE network: {}", other)),
        }
    }
}
