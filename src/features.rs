use crate::plan::{self, Plan};

/// Derives the feature set from the merged plan. Must run exactly once per
/// plan: a plan that already carries features is rejected rather than
/// double-tagged.
///
/// SCM resolution always has to succeed, and DNS-provider resolution has to
/// succeed whenever TLS is enabled; either failing aborts the run before any
/// cluster mutation.
pub fn derive_features(mut plan: Plan) -> Result<Plan, String> {
    if !plan.features.is_empty() {
        return Err(format!(
            "plan already carries features {:?}, derivation must run exactly once",
            plan.features
        ));
    }

    plan.features.push(plan::DEFAULT_FEATURE.into());

    if plan.enable_ecr {
        plan.features.push(plan::ECR_FEATURE.into());
    }

    let scm_feature = match plan.scm.as_str() {
        plan::GITHUB_SCM => plan::GITHUB_FEATURE,
        plan::GITLAB_SCM => plan::GITLAB_FEATURE,
        other => {
            return Err(format!("unsupported git repository manager: {:?}", other));
        }
    };
    plan.features.push(scm_feature.into());

    if plan.tls {
        let dns_feature = match plan.tls_config.dns_service.as_str() {
            plan::DIGITAL_OCEAN => plan::DO_DNS_FEATURE,
            plan::CLOUD_DNS => plan::GCP_DNS_FEATURE,
            plan::ROUTE53 => plan::ROUTE53_DNS_FEATURE,
            plan::CLOUDFLARE => plan::CLOUDFLARE_DNS_FEATURE,
            other => {
                return Err(format!("unavailable DNS service provider: {:?}", other));
            }
        };
        plan.features.push(dns_feature.into());
    }

    if plan.enable_oauth {
        plan.features.push(plan::AUTH_FEATURE.into());
    }

    Ok(plan)
}

/// True when any derived feature appears in the secret's filter list.
pub fn feature_enabled(features: &[String], filters: &[String]) -> bool {
    features.iter().any(|f| filters.contains(f))
}
