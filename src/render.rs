use std::fs;
use std::path::{Path, PathBuf};

/// Renders a template file with the given context. Undefined values render
/// as empty rather than failing, so optional plan fields can be left out of
/// a template's context.
pub fn render_file(template_path: &Path, ctx: minijinja::Value) -> Result<String, String> {
    let data = fs::read_to_string(template_path)
        .map_err(|e| format!("reading template {:?}: {}", template_path, e))?;
    let mut env = minijinja::Environment::new();
    env.set_undefined_behavior(minijinja::UndefinedBehavior::Lenient);
    env.render_str(&data, ctx)
        .map_err(|e| format!("rendering template {:?}: {}", template_path, e))
}

/// Writes rendered content into the staging directory and returns the
/// staged path. The directory is created on first use.
pub fn stage(staging_dir: &Path, file_name: &str, content: &str) -> Result<PathBuf, String> {
    fs::create_dir_all(staging_dir)
        .map_err(|e| format!("creating staging directory {:?}: {}", staging_dir, e))?;
    let path = staging_dir.join(file_name);
    fs::write(&path, content).map_err(|e| format!("writing {:?}: {}", path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn test_render_substitutes_context() {
        let dir = tempfile::TempDir::new().unwrap();
        let tpl = dir.path().join("gw.yml");
        fs::write(&tpl, "root_domain: {{ root_domain }}\n").unwrap();

        let out = render_file(&tpl, context! { root_domain => "example.com" }).unwrap();
        assert_eq!(out, "root_domain: example.com\n");
    }

    #[test]
    fn test_render_conditional_block() {
        let dir = tempfile::TempDir::new().unwrap();
        let tpl = dir.path().join("ing.yml");
        fs::write(&tpl, "{% if tls %}issuer: {{ issuer_type }}{% endif %}").unwrap();

        let with_tls = render_file(&tpl, context! { tls => true, issuer_type => "prod" }).unwrap();
        assert_eq!(with_tls, "issuer: prod");

        let without = render_file(&tpl, context! { tls => false }).unwrap();
        assert_eq!(without, "");
    }

    #[test]
    fn test_render_missing_value_is_lenient() {
        let dir = tempfile::TempDir::new().unwrap();
        let tpl = dir.path().join("t.yml");
        fs::write(&tpl, "value: {{ not_in_context }}").unwrap();

        let out = render_file(&tpl, context! {}).unwrap();
        assert_eq!(out.trim(), "value:");
    }

    #[test]
    fn test_render_missing_template_is_error() {
        let err = render_file(Path::new("/nonexistent/t.yml"), context! {}).unwrap_err();
        assert!(err.contains("reading template"));
    }

    #[test]
    fn test_render_invalid_template_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let tpl = dir.path().join("bad.yml");
        fs::write(&tpl, "{% invalid %}").unwrap();
        assert!(render_file(&tpl, context! {}).is_err());
    }

    #[test]
    fn test_stage_creates_directory_and_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let staging = dir.path().join("tmp");
        let path = stage(&staging, "generated-gateway_config.yml", "a: b\n").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "a: b\n");
    }
}
