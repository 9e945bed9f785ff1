use crate::exec::ExecTask;
use crate::logging::Logger;
use crate::plan::Plan;
use crate::render;
use minijinja::context;
use std::path::Path;

const INGRESS_TEMPLATES: &[(&str, &str)] = &[
    ("ingress-wildcard.yml", "generated-ingress-wildcard.yml"),
    ("ingress-auth.yml", "generated-ingress-auth.yml"),
];

/// Renders the ingress records for the platform and applies each with
/// `kubectl apply`. Template sources live under `<templates>/k8s/`.
pub fn apply(
    log: &Logger,
    plan: &Plan,
    templates_dir: &Path,
    staging_dir: &Path,
) -> Result<(), String> {
    for (source, staged_name) in INGRESS_TEMPLATES {
        let ctx = context! {
            root_domain => plan.root_domain,
            tls => plan.tls,
            issuer_type => plan.tls_config.issuer_type,
        };
        let content = render::render_file(&templates_dir.join("k8s").join(source), ctx)?;
        let staged = render::stage(staging_dir, staged_name, &content)?;

        log.info("applying ingress", &[("manifest", staged_name)]);
        ExecTask::new("kubectl", &["apply", "-f", &staged.to_string_lossy()])
            .execute_checked(log)?;
    }
    Ok(())
}
