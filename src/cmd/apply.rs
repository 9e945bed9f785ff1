use crate::exec::ExecTask;
use crate::features;
use crate::logging::Logger;
use crate::merge;
use crate::plan::{Plan, GITLAB_SCM};
use crate::poll::{poll_ready, PollConfig};
use crate::secrets;
use crate::validate;
use crate::{ingress, stack, tls};
use base64::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

/// Version-check invocations every run requires before touching the cluster.
const REQUIRED_TOOLS: &[&str] = &[
    "kubectl version --client",
    "openssl version",
    "helm version -c",
    "faas-cli version",
];

/// Platform component version used when the plan leaves it unset.
const DEFAULT_PLATFORM_VERSION: &str = "master";

/// Sentinel printed by the cert-manager readiness script when the webhook
/// deployment reports available.
const CERT_MANAGER_READY_MARKER: &str = "True";

#[derive(Debug, Default, Clone, Copy)]
pub struct InstallPreferences {
    pub skip_minio: bool,
    pub skip_sealedsecrets: bool,
    pub skip_create_secrets: bool,
}

/// Filesystem layout for one run: install scripts, manifest templates, and
/// the scratch directory for generated files. Threaded through every step
/// explicitly so nothing depends on process-wide mutable state.
#[derive(Debug, Clone)]
pub struct Paths {
    pub scripts: PathBuf,
    pub templates: PathBuf,
    pub staging: PathBuf,
}

impl Paths {
    fn script(&self, name: &str) -> String {
        self.scripts.join(name).to_string_lossy().to_string()
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Severity {
    /// Failure aborts the whole run.
    Fatal,
    /// Failure is logged and the pipeline continues.
    Soft,
}

/// Loads, merges and derives the plan, validates the environment, then runs
/// the timed installation pipeline.
pub fn run(
    log: &Logger,
    files: &[String],
    prefs: InstallPreferences,
    print_plan: bool,
    readiness: PollConfig,
    paths: Paths,
) -> Result<(), String> {
    if files.is_empty() {
        return Err("provide one or more --file arguments".into());
    }
    readiness.validate()?;

    log.info("loading plans", &[("count", &format!("{}", files.len()))]);
    let mut plans = Vec::with_capacity(files.len());
    for file in files {
        let content = std::fs::read_to_string(file)
            .map_err(|e| format!("loading --file {}: {}", file, e))?;
        let plan =
            Plan::from_yaml(&content).map_err(|e| format!("unmarshal of --file {}: {}", file, e))?;
        log.info("plan loaded", &[("file", file)]);
        plans.push(plan);
    }

    let merged = merge::merge_plans(plans)?;
    let plan = features::derive_features(merged)?;

    if print_plan {
        println!("{}", plan.to_yaml()?);
        return Ok(());
    }

    validate::validate_tools(REQUIRED_TOOLS, log)?;

    if !prefs.skip_create_secrets {
        validate::validate_plan(&plan)?;
    }

    if let Err(e) = validate::validate_registry_auth(&plan) {
        log.warn(
            "registry credentials check failed, ensure the file was created with docker login",
            &[("error", &e)],
        );
    }

    let start = Instant::now();
    let result = process(log, plan, &prefs, &readiness, &paths);
    let elapsed = start.elapsed().as_secs_f64();

    match result {
        Ok(()) => {
            log.info(&format!("plan completed in {:.1} seconds", elapsed), &[]);
            Ok(())
        }
        Err(e) => Err(format!("plan failed after {:.1} seconds: {}", elapsed, e)),
    }
}

/// The ordered pipeline. Every step goes through `run_step` so the
/// fatal/soft policy is decided here, not inside the step bodies.
fn process(
    log: &Logger,
    mut plan: Plan,
    prefs: &InstallPreferences,
    readiness: &PollConfig,
    paths: &Paths,
) -> Result<(), String> {
    if plan.openfaas_cloud_version.is_empty() {
        plan.openfaas_cloud_version = DEFAULT_PLATFORM_VERSION.into();
        log.info(
            "no openfaas_cloud_version set in plan",
            &[("using", DEFAULT_PLATFORM_VERSION)],
        );
    }

    std::fs::create_dir_all(&paths.staging)
        .map_err(|e| format!("creating staging directory {:?}: {}", paths.staging, e))?;

    run_step(log, "create namespaces", Severity::Fatal, || {
        run_script(log, paths, "create-namespaces.sh", vec![])
    })?;

    run_step(log, "update helm repositories", Severity::Fatal, || {
        ExecTask::new(
            "helm",
            &["repo", "add", "stable", "https://charts.helm.sh/stable"],
        )
        .execute_checked(log)?;
        ExecTask::new("helm", &["repo", "update"]).execute_checked(log)?;
        Ok(())
    })?;

    run_step(log, "install ingress controller", Severity::Fatal, || {
        run_script(log, paths, "install-nginx.sh", ingress_controller_env(&plan))
    })?;

    if !prefs.skip_create_secrets {
        run_step(log, "create secrets", Severity::Fatal, || {
            create_secrets(log, &plan);
            Ok(())
        })?;
    }

    run_step(
        log,
        "patch function service account",
        Severity::Soft,
        || run_script(log, paths, "patch-fn-serviceaccount.sh", vec![]),
    )?;

    if !prefs.skip_minio {
        run_step(log, "install object storage", Severity::Fatal, || {
            install_minio(log, paths)
        })?;
    }

    if plan.tls {
        run_step(log, "install cert-manager", Severity::Fatal, || {
            run_script(log, paths, "install-cert-manager.sh", vec![])
        })?;
    }

    run_step(
        log,
        "create functions auth secrets",
        Severity::Soft,
        || run_script(log, paths, "create-functions-auth.sh", vec![]),
    )?;

    run_step(log, "install compute platform", Severity::Fatal, || {
        run_script(log, paths, "install-openfaas.sh", platform_env(&plan))
    })?;

    if plan.tls {
        // Best-effort wait; the pipeline proceeds even if the budget runs
        // out and later manifest application may race the webhook.
        poll_ready(log, "cert-manager", readiness, || {
            cert_manager_ready(log, paths)
        });
    }

    run_step(log, "apply ingress manifests", Severity::Soft, || {
        ingress::apply(log, &plan, &paths.templates, &paths.staging)
    })?;

    if plan.tls {
        run_step(log, "apply tls manifests", Severity::Soft, || {
            tls::apply(log, &plan, &paths.templates, &paths.staging)
        })?;
    }

    run_step(log, "render stack configuration", Severity::Fatal, || {
        stack::apply(log, &plan, &paths.templates, &paths.staging)
    })?;

    if !prefs.skip_sealedsecrets {
        run_step(log, "install sealed secrets", Severity::Fatal, || {
            run_script(log, paths, "install-sealedsecrets.sh", vec![])
        })?;
        run_step(
            log,
            "export sealed secrets certificate",
            Severity::Fatal,
            || export_sealed_secrets_cert(log, paths),
        )?;
    }

    run_step(log, "clone platform components", Severity::Fatal, || {
        run_script(
            log,
            paths,
            "clone-cloud-components.sh",
            vec![("TAG".into(), plan.openfaas_cloud_version.clone())],
        )
    })?;

    run_step(log, "deploy platform components", Severity::Fatal, || {
        run_script(log, paths, "deploy-cloud-components.sh", deploy_env(&plan))
    })?;

    Ok(())
}

fn run_step<F>(log: &Logger, name: &str, severity: Severity, step: F) -> Result<(), String>
where
    F: FnOnce() -> Result<(), String>,
{
    log.info("starting step", &[("step", name)]);
    match step() {
        Ok(()) => {
            log.info("step complete", &[("step", name)]);
            Ok(())
        }
        Err(e) if severity == Severity::Soft => {
            log.warn("step failed, continuing", &[("step", name), ("error", &e)]);
            Ok(())
        }
        Err(e) => Err(format!("step {:?}: {}", name, e)),
    }
}

fn run_script(
    log: &Logger,
    paths: &Paths,
    script: &str,
    env: Vec<(String, String)>,
) -> Result<(), String> {
    ExecTask {
        command: paths.script(script),
        env,
        ..ExecTask::default()
    }
    .execute_checked(log)
    .map(|_| ())
}

/// Host-mode ingress pins the controller to the node network; every other
/// mode installs with chart defaults.
fn ingress_controller_env(plan: &Plan) -> Vec<(String, String)> {
    if plan.ingress == "host" {
        vec![(
            "ADDITIONAL_SET".into(),
            ",controller.hostNetwork=true,controller.daemonset.useHostPort=true,dnsPolicy=ClusterFirstWithHostNet,controller.kind=DaemonSet".into(),
        )]
    } else {
        vec![]
    }
}

fn platform_env(plan: &Plan) -> Vec<(String, String)> {
    vec![
        (
            "FAAS_IDLER_DRY_RUN".into(),
            (!plan.scale_to_zero).to_string(),
        ),
        (
            "INSTALL_INGRESS_OPERATOR".into(),
            plan.enable_ingress_operator.to_string(),
        ),
    ]
}

/// Deploy toggles as a present-only map: a disabled flag is absent, never
/// an empty string.
fn deploy_env(plan: &Plan) -> Vec<(String, String)> {
    let mut env = Vec::new();
    if plan.enable_oauth {
        env.push(("ENABLE_OAUTH".into(), "true".into()));
    }
    if plan.scm == GITLAB_SCM {
        env.push(("GITLAB".into(), "true".into()));
    }
    if plan.network_policies {
        env.push(("ENABLE_NETWORK_POLICIES".into(), "true".into()));
    }
    if plan.enable_ecr {
        env.push(("ENABLE_AWS_ECR".into(), "true".into()));
        if !plan.ecr_config.ecr_region.is_empty() {
            env.push(("AWS_ECR_REGION".into(), plan.ecr_config.ecr_region.clone()));
        }
    }
    env
}

/// Creates every secret whose filters intersect the derived features. A
/// single secret failing is logged and skipped so the rest still land.
fn create_secrets(log: &Logger, plan: &Plan) {
    for secret in &plan.secrets {
        if !features::feature_enabled(&plan.features, &secret.filters) {
            continue;
        }
        log.info("creating secret", &[("secret", &secret.name)]);
        let task = match secrets::build_secret_command(secret, log) {
            Ok(task) => task,
            Err(e) => {
                log.warn("skipping secret", &[("secret", &secret.name), ("error", &e)]);
                continue;
            }
        };
        match task.execute(log) {
            Ok(res) if !res.success() => {
                log.warn(
                    "secret creation failed",
                    &[
                        ("secret", &secret.name),
                        ("exit-code", &format!("{}", res.exit_code)),
                    ],
                );
            }
            Ok(_) => {}
            Err(e) => {
                log.warn("secret creation failed", &[("secret", &secret.name), ("error", &e)]);
            }
        }
    }
}

/// The object-storage install needs the generated access keys from the
/// cluster; empty credentials mean secret creation has not run and the
/// install cannot proceed.
fn install_minio(log: &Logger, paths: &Paths) -> Result<(), String> {
    let access_key = fetch_storage_credential(log, "s3-access-key")?;
    let secret_key = fetch_storage_credential(log, "s3-secret-key")?;
    if access_key.is_empty() || secret_key.is_empty() {
        return Err(
            "generated storage credentials are empty, create secrets before installing object storage"
                .into(),
        );
    }
    run_script(
        log,
        paths,
        "install-minio.sh",
        vec![
            ("MINIO_ACCESS_KEY".into(), access_key),
            ("MINIO_SECRET_KEY".into(), secret_key),
        ],
    )
}

fn fetch_storage_credential(log: &Logger, name: &str) -> Result<String, String> {
    let jsonpath = format!("jsonpath={{.data.{}}}", name);
    let res = ExecTask::new(
        "kubectl",
        &["get", "secret", "-n", "openfaas", name, "-o", &jsonpath],
    )
    .execute_checked(log)
    .map_err(|e| format!("fetching storage credential {:?}: {}", name, e))?;

    let decoded = BASE64_STANDARD
        .decode(res.stdout.trim().as_bytes())
        .map_err(|e| format!("decoding storage credential {:?}: {}", name, e))?;
    String::from_utf8(decoded)
        .map_err(|e| format!("storage credential {:?} is not valid UTF-8: {}", name, e))
}

fn cert_manager_ready(log: &Logger, paths: &Paths) -> bool {
    match (ExecTask {
        command: paths.script("get-cert-manager.sh"),
        ..ExecTask::default()
    })
    .execute(log)
    {
        Ok(res) => res.stdout.trim() == CERT_MANAGER_READY_MARKER,
        Err(_) => false,
    }
}

fn export_sealed_secrets_cert(log: &Logger, paths: &Paths) -> Result<(), String> {
    let res = ExecTask {
        command: paths.script("export-sealed-secret-pubcert.sh"),
        ..ExecTask::default()
    }
    .execute_checked(log)?;

    let target = paths.staging.join("pubcert.pem");
    std::fs::write(&target, res.stdout)
        .map_err(|e| format!("writing public certificate {:?}: {}", target, e))?;
    log.info(
        "sealed secrets certificate exported",
        &[("path", &target.to_string_lossy())],
    );
    Ok(())
}
