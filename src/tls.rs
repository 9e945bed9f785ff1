use crate::exec::ExecTask;
use crate::logging::Logger;
use crate::plan::Plan;
use crate::render;
use minijinja::context;
use std::path::Path;

/// Renders every issuer/certificate template under `<templates>/k8s/tls/`
/// with the plan's TLS configuration and applies each with `kubectl apply`.
pub fn apply(
    log: &Logger,
    plan: &Plan,
    templates_dir: &Path,
    staging_dir: &Path,
) -> Result<(), String> {
    let tls_dir = templates_dir.join("k8s").join("tls");
    for name in list_templates(&tls_dir)? {
        let ctx = context! {
            root_domain => plan.root_domain,
            email => plan.tls_config.email,
            dns_service => plan.tls_config.dns_service,
            project_id => plan.tls_config.project_id,
            issuer_type => plan.tls_config.issuer_type,
            region => plan.tls_config.region,
            access_key_id => plan.tls_config.access_key_id,
        };
        let content = render::render_file(&tls_dir.join(&name), ctx)?;
        let staged = render::stage(staging_dir, &format!("generated-tls-{}", name), &content)?;

        log.info("applying tls manifest", &[("manifest", name.as_str())]);
        ExecTask::new("kubectl", &["apply", "-f", &staged.to_string_lossy()])
            .execute_checked(log)?;
    }
    Ok(())
}

fn list_templates(dir: &Path) -> Result<Vec<String>, String> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| format!("reading tls templates directory {:?}: {}", dir, e))?;
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    // read_dir order is platform-dependent; apply in a stable order.
    names.sort();
    Ok(names)
}
