use crate::exec::ExecTask;
use crate::logging::Logger;
use crate::plan::SecretSpec;
use rand::rngs::OsRng;
use rand::seq::SliceRandom;

/// Generated secret scheme: 25 characters, exactly 10 digits, no symbols,
/// mixed-case letters for the remainder.
pub const SECRET_LENGTH: usize = 25;
pub const SECRET_DIGITS: usize = 10;
pub const SECRET_SYMBOLS: usize = 0;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";

/// Produces a random password from the OS entropy source following the
/// scheme above.
pub fn generate_password() -> String {
    let mut rng = OsRng;
    let mut chars: Vec<u8> = Vec::with_capacity(SECRET_LENGTH);
    for _ in 0..SECRET_DIGITS {
        chars.push(*DIGITS.choose(&mut rng).unwrap_or(&b'0'));
    }
    for _ in 0..(SECRET_LENGTH - SECRET_DIGITS) {
        chars.push(*LETTERS.choose(&mut rng).unwrap_or(&b'a'));
    }
    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

/// Builds the `kubectl create secret generic` invocation for one spec.
///
/// Literal entries with an empty value get a generated password. File
/// entries that declare a value_command run it first when the source path is
/// missing; that command failing stops this secret's creation.
pub fn build_secret_command(spec: &SecretSpec, log: &Logger) -> Result<ExecTask, String> {
    let mut args: Vec<String> = vec![
        "create".into(),
        "secret".into(),
        "generic".into(),
        "-n".into(),
        spec.namespace.clone(),
        spec.name.clone(),
    ];

    if !spec.secret_type.is_empty() {
        args.push(format!("--type={}", spec.secret_type));
    }

    for literal in &spec.literals {
        let value = if literal.value.is_empty() {
            generate_password()
        } else {
            literal.value.clone()
        };
        args.push(format!("--from-literal={}={}", literal.name, value));
    }

    for file in &spec.files {
        let path = file.expand_value_from();
        if !file.value_command.is_empty() && !std::path::Path::new(&path).exists() {
            log.info(
                "generating secret file",
                &[("secret", &spec.name), ("path", &path)],
            );
            ExecTask::shell(&file.value_command)
                .execute_checked(log)
                .map_err(|e| {
                    format!("generating file {:?} for secret {:?}: {}", path, spec.name, e)
                })?;
        }
        args.push(format!("--from-file={}={}", file.name, path));
    }

    Ok(ExecTask {
        command: "kubectl".into(),
        args,
        ..ExecTask::default()
    })
}
