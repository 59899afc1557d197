use serde::{Deserialize, Serialize};
use tenant_directory_sdk::MAX_DOMAIN_LENGTH;

/// Configuration for the tenant directory module.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TenantDirectoryConfig {
    /// Insert the fresh identity into the cache right after a committed
    /// mutation instead of waiting for the next miss.
    pub prewarm_on_mutation: bool,
    pub max_domain_length: usize,
    /// Admin hosts served without a tenant binding.
    pub central_domains: Vec<String>,
    /// Scheme used in links sent to tenants (`https` in production).
    pub scheme: String,
}

impl Default for TenantDirectoryConfig {
    fn default() -> Self {
        Self {
            prewarm_on_mutation: true,
            max_domain_length: MAX_DOMAIN_LENGTH,
            central_domains: Vec::new(),
            scheme: "https".to_owned(),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: TenantDirectoryConfig =
            serde_json::from_str(r#"{"central_domains":["admin.example"]}"#).unwrap();
        assert!(cfg.prewarm_on_mutation);
        assert_eq!(cfg.max_domain_length, 253);
        assert_eq!(cfg.scheme, "https");
        assert_eq!(cfg.central_domains, vec!["admin.example".to_owned()]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let res = serde_json::from_str::<TenantDirectoryConfig>(r#"{"ttl":"5m"}"#);
        assert!(res.is_err());
    }
}
