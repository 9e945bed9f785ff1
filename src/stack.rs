use crate::logging::Logger;
use crate::plan::Plan;
use crate::render;
use minijinja::context;
use std::path::Path;

/// Renders the platform stack configuration set into the staging directory.
/// These files are consumed by the component deployment step, so a failure
/// here is fatal to the run.
pub fn apply(
    log: &Logger,
    plan: &Plan,
    templates_dir: &Path,
    staging_dir: &Path,
) -> Result<(), String> {
    let scheme = if plan.tls { "https" } else { "http" };

    generate(log, templates_dir, staging_dir, "gateway_config", context! {
        registry => plan.registry,
        root_domain => plan.root_domain,
        customers_url => plan.customers_url,
        scheme => scheme,
        s3_url => plan.s3.s3_url,
        s3_region => plan.s3.s3_region,
        s3_tls => plan.s3.s3_tls,
        s3_bucket => plan.s3.s3_bucket,
    })?;

    generate(log, templates_dir, staging_dir, "github", context! {
        app_id => plan.github.app_id,
        private_key_filename => plan.github.private_key_file,
    })?;

    generate(log, templates_dir, staging_dir, "slack", context! {
        url => plan.slack.url,
    })?;

    if plan.scm == crate::plan::GITLAB_SCM {
        generate(log, templates_dir, staging_dir, "gitlab", context! {
            gitlab_instance => plan.gitlab.gitlab_instance,
        })?;
    }

    generate(log, templates_dir, staging_dir, "dashboard_config", context! {
        root_domain => plan.root_domain,
        scheme => scheme,
    })?;

    if plan.enable_oauth {
        generate(log, templates_dir, staging_dir, "edge-auth-dep", context! {
            root_domain => plan.root_domain,
            client_id => plan.oauth.client_id,
            customers_url => plan.customers_url,
            scheme => scheme,
            oauth_provider => plan.scm,
            oauth_provider_base_url => plan.oauth.oauth_provider_base_url,
        })?;
    }

    generate(log, templates_dir, staging_dir, "stack", context! {
        github => plan.scm == crate::plan::GITHUB_SCM,
        build_branch => plan.build_branch,
    })?;

    Ok(())
}

fn generate(
    log: &Logger,
    templates_dir: &Path,
    staging_dir: &Path,
    name: &str,
    ctx: minijinja::Value,
) -> Result<(), String> {
    let content = render::render_file(&templates_dir.join(format!("{}.yml", name)), ctx)?;
    render::stage(staging_dir, &format!("generated-{}.yml", name), &content)?;
    log.info("staged stack config", &[("config", name)]);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{Level, Logger};
    use std::fs;

    fn quiet_logger() -> Logger {
        Logger::new(Box::new(std::io::sink()), false, Level::Error)
    }

    fn write_templates(dir: &Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join("gateway_config.yml"),
            "registry: {{ registry }}\ngateway_url: {{ scheme }}://gateway.{{ root_domain }}\ns3_bucket: {{ s3_bucket }}\n",
        )
        .unwrap();
        fs::write(dir.join("github.yml"), "app_id: {{ app_id }}\n").unwrap();
        fs::write(dir.join("slack.yml"), "slack_url: {{ url }}\n").unwrap();
        fs::write(
            dir.join("gitlab.yml"),
            "instance: {{ gitlab_instance }}\n",
        )
        .unwrap();
        fs::write(
            dir.join("dashboard_config.yml"),
            "public_url: {{ scheme }}://system.{{ root_domain }}\n",
        )
        .unwrap();
        fs::write(
            dir.join("edge-auth-dep.yml"),
            "client_id: {{ client_id }}\nprovider: {{ oauth_provider }}\n",
        )
        .unwrap();
        fs::write(dir.join("stack.yml"), "{% if github %}github: true{% endif %}\n").unwrap();
    }

    fn base_plan() -> Plan {
        let mut plan = Plan::default();
        plan.registry = "docker.io/acme/".into();
        plan.root_domain = "example.com".into();
        plan.scm = "github".into();
        plan.s3.s3_bucket = "pipeline".into();
        plan
    }

    #[test]
    fn test_stack_configs_staged() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let staging = dir.path().join("tmp");
        write_templates(&templates);

        apply(&quiet_logger(), &base_plan(), &templates, &staging).unwrap();

        let gw = fs::read_to_string(staging.join("generated-gateway_config.yml")).unwrap();
        assert!(gw.contains("registry: docker.io/acme/"));
        assert!(gw.contains("gateway_url: http://gateway.example.com"));
        assert!(gw.contains("s3_bucket: pipeline"));

        let stack = fs::read_to_string(staging.join("generated-stack.yml")).unwrap();
        assert!(stack.contains("github: true"));

        assert!(!staging.join("generated-gitlab.yml").exists());
        assert!(!staging.join("generated-edge-auth-dep.yml").exists());
    }

    #[test]
    fn test_tls_switches_scheme() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let staging = dir.path().join("tmp");
        write_templates(&templates);

        let mut plan = base_plan();
        plan.tls = true;
        apply(&quiet_logger(), &plan, &templates, &staging).unwrap();

        let gw = fs::read_to_string(staging.join("generated-gateway_config.yml")).unwrap();
        assert!(gw.contains("https://gateway.example.com"));
    }

    #[test]
    fn test_gitlab_config_only_for_gitlab_scm() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let staging = dir.path().join("tmp");
        write_templates(&templates);

        let mut plan = base_plan();
        plan.scm = "gitlab".into();
        plan.gitlab.gitlab_instance = "https://gitlab.example.com/".into();
        apply(&quiet_logger(), &plan, &templates, &staging).unwrap();

        let gitlab = fs::read_to_string(staging.join("generated-gitlab.yml")).unwrap();
        assert!(gitlab.contains("https://gitlab.example.com/"));
    }

    #[test]
    fn test_oauth_config_only_when_enabled() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let staging = dir.path().join("tmp");
        write_templates(&templates);

        let mut plan = base_plan();
        plan.enable_oauth = true;
        plan.oauth.client_id = "abc123".into();
        apply(&quiet_logger(), &plan, &templates, &staging).unwrap();

        let auth = fs::read_to_string(staging.join("generated-edge-auth-dep.yml")).unwrap();
        assert!(auth.contains("client_id: abc123"));
        assert!(auth.contains("provider: github"));
    }

    #[test]
    fn test_missing_template_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let templates = dir.path().join("templates");
        let staging = dir.path().join("tmp");
        fs::create_dir_all(&templates).unwrap();

        let err = apply(&quiet_logger(), &base_plan(), &templates, &staging).unwrap_err();
        assert!(err.contains("gateway_config"));
    }
}
