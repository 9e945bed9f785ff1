use serde::{Deserialize, Serialize};

// Feature tags derived from plan fields. Secrets carry a `filters` list and
// are only created when it intersects the derived set.

/// Mandatory feature present on every derived plan.
pub const DEFAULT_FEATURE: &str = "default";
/// Enables secrets filtered for GitHub as the source-control manager.
pub const GITHUB_FEATURE: &str = "scm_github";
/// Enables secrets filtered for GitLab as the source-control manager.
pub const GITLAB_FEATURE: &str = "scm_gitlab";
/// Enables OAuth secret creation.
pub const AUTH_FEATURE: &str = "auth";
/// Enables AWS ECR registry integration.
pub const ECR_FEATURE: &str = "ecr";
/// DNS01 secrets for Google Cloud DNS when TLS is enabled.
pub const GCP_DNS_FEATURE: &str = "gcp_dns01";
/// DNS01 secrets for DigitalOcean when TLS is enabled.
pub const DO_DNS_FEATURE: &str = "do_dns01";
/// DNS01 secrets for Amazon Route53 when TLS is enabled.
pub const ROUTE53_DNS_FEATURE: &str = "route53_dns01";
/// DNS01 secrets for Cloudflare when TLS is enabled.
pub const CLOUDFLARE_DNS_FEATURE: &str = "cloudflare_dns01";

// dns_service values accepted in the plan file.
pub const CLOUD_DNS: &str = "clouddns";
pub const DIGITAL_OCEAN: &str = "digitalocean";
pub const ROUTE53: &str = "route53";
pub const CLOUDFLARE: &str = "cloudflare";

// scm values accepted in the plan file.
pub const GITHUB_SCM: &str = "github";
pub const GITLAB_SCM: &str = "gitlab";

/// The declarative configuration for one bootstrap run. Parsed from one or
/// more YAML plan files, merged per `merge::merge_plans`, then annotated with
/// derived features before the pipeline consumes it read-only.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub secrets: Vec<SecretSpec>,
    #[serde(default)]
    pub root_domain: String,
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub customers_url: String,
    #[serde(default)]
    pub customers_secret: String,
    #[serde(default)]
    pub scm: String,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub gitlab: GitlabConfig,
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub tls_config: TlsConfig,
    #[serde(default)]
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub enable_oauth: bool,
    #[serde(default)]
    pub s3: S3Config,
    #[serde(default)]
    pub slack: SlackConfig,
    #[serde(default)]
    pub ingress: String,
    #[serde(default)]
    pub scale_to_zero: bool,
    #[serde(default)]
    pub enable_ecr: bool,
    #[serde(default)]
    pub ecr_config: EcrConfig,
    #[serde(default)]
    pub network_policies: bool,
    #[serde(default)]
    pub openfaas_cloud_version: String,
    #[serde(default)]
    pub build_branch: String,
    #[serde(default)]
    pub enable_ingress_operator: bool,
}

impl Plan {
    pub fn from_yaml(content: &str) -> Result<Self, String> {
        serde_yaml::from_str(content).map_err(|e| format!("parsing plan YAML: {}", e))
    }

    pub fn to_yaml(&self) -> Result<String, String> {
        serde_yaml::to_string(self).map_err(|e| format!("serializing plan: {}", e))
    }
}

/// A named bundle of key material to create in-cluster. `name` is the merge
/// key across plan files.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SecretSpec {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "type")]
    pub secret_type: String,
    #[serde(default)]
    pub filters: Vec<String>,
    #[serde(default)]
    pub literals: Vec<LiteralEntry>,
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

/// A literal key=value entry. An empty value means "generate one".
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct LiteralEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// A file-sourced entry. `value_command`, when set, can (re)generate the
/// file at `value_from` if it is missing.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value_from: String,
    #[serde(default)]
    pub value_command: String,
}

impl FileEntry {
    /// Expands a leading `~` in `value_from` to the home directory held in
    /// the HOME environment variable.
    pub fn expand_value_from(&self) -> String {
        expand_home(&self.value_from)
    }
}

pub fn expand_home(path: &str) -> String {
    if let Some(rest) = path.strip_prefix('~') {
        let home = std::env::var("HOME").unwrap_or_default();
        return format!("{}{}", home, rest);
    }
    path.to_string()
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GithubConfig {
    #[serde(default)]
    pub app_id: String,
    #[serde(default, rename = "private_key_filename")]
    pub private_key_file: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct GitlabConfig {
    #[serde(default)]
    pub gitlab_instance: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TlsConfig {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub dns_service: String,
    #[serde(default)]
    pub project_id: String,
    #[serde(default)]
    pub issuer_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub access_key_id: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct OAuthConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub oauth_provider_base_url: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(default)]
    pub s3_url: String,
    #[serde(default)]
    pub s3_region: String,
    #[serde(default)]
    pub s3_tls: bool,
    #[serde(default)]
    pub s3_bucket: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct EcrConfig {
    #[serde(default)]
    pub ecr_region: String,
}
