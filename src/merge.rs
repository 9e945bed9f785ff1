use crate::plan::{FileEntry, LiteralEntry, Plan, SecretSpec};

/// Deep-merge with override semantics: a later non-empty/non-zero value
/// replaces an earlier one, an empty/zero value never overwrites. The rule is
/// defined once on the primitives; struct impls are plain field lists.
pub trait Merge {
    fn merge_from(&mut self, other: Self);
}

impl Merge for String {
    fn merge_from(&mut self, other: Self) {
        if !other.is_empty() {
            *self = other;
        }
    }
}

impl Merge for bool {
    fn merge_from(&mut self, other: Self) {
        if other {
            *self = true;
        }
    }
}

impl Merge for Vec<String> {
    fn merge_from(&mut self, other: Self) {
        if !other.is_empty() {
            *self = other;
        }
    }
}

macro_rules! merge_struct {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        impl Merge for $ty {
            fn merge_from(&mut self, other: Self) {
                $( self.$field.merge_from(other.$field); )*
            }
        }
    };
}

merge_struct!(crate::plan::GithubConfig { app_id, private_key_file });
merge_struct!(crate::plan::GitlabConfig { gitlab_instance });
merge_struct!(crate::plan::TlsConfig {
    email,
    dns_service,
    project_id,
    issuer_type,
    region,
    access_key_id,
});
merge_struct!(crate::plan::OAuthConfig { client_id, oauth_provider_base_url });
merge_struct!(crate::plan::S3Config { s3_url, s3_region, s3_tls, s3_bucket });
merge_struct!(crate::plan::SlackConfig { url });
merge_struct!(crate::plan::EcrConfig { ecr_region });
merge_struct!(LiteralEntry { name, value });
merge_struct!(FileEntry { name, value_from, value_command });

impl Merge for SecretSpec {
    fn merge_from(&mut self, other: Self) {
        self.name.merge_from(other.name);
        self.namespace.merge_from(other.namespace);
        self.secret_type.merge_from(other.secret_type);
        self.filters.merge_from(other.filters);
        merge_keyed(&mut self.literals, other.literals, |l| &l.name);
        merge_keyed(&mut self.files, other.files, |f| &f.name);
    }
}

impl Merge for Plan {
    fn merge_from(&mut self, other: Self) {
        self.features.merge_from(other.features);
        self.root_domain.merge_from(other.root_domain);
        self.registry.merge_from(other.registry);
        self.customers_url.merge_from(other.customers_url);
        self.customers_secret.merge_from(other.customers_secret);
        self.scm.merge_from(other.scm);
        self.github.merge_from(other.github);
        self.gitlab.merge_from(other.gitlab);
        self.tls.merge_from(other.tls);
        self.tls_config.merge_from(other.tls_config);
        self.oauth.merge_from(other.oauth);
        self.enable_oauth.merge_from(other.enable_oauth);
        self.s3.merge_from(other.s3);
        self.slack.merge_from(other.slack);
        self.ingress.merge_from(other.ingress);
        self.scale_to_zero.merge_from(other.scale_to_zero);
        self.enable_ecr.merge_from(other.enable_ecr);
        self.ecr_config.merge_from(other.ecr_config);
        self.network_policies.merge_from(other.network_policies);
        self.openfaas_cloud_version
            .merge_from(other.openfaas_cloud_version);
        self.build_branch.merge_from(other.build_branch);
        self.enable_ingress_operator
            .merge_from(other.enable_ingress_operator);
        // Secrets reconcile by name rather than replace wholesale.
        merge_keyed(&mut self.secrets, other.secrets, |s| &s.name);
    }
}

/// Reconciles two keyed lists: the first occurrence of a key establishes the
/// entry, later occurrences deep-merge into it. Entry order is order of
/// first appearance.
fn merge_keyed<T: Merge>(existing: &mut Vec<T>, incoming: Vec<T>, key: fn(&T) -> &String) {
    for item in incoming {
        match existing.iter_mut().find(|e| key(e) == key(&item)) {
            Some(entry) => entry.merge_from(item),
            None => existing.push(item),
        }
    }
}

/// Combines the given plans into one, in argument order.
pub fn merge_plans(plans: Vec<Plan>) -> Result<Plan, String> {
    if plans.is_empty() {
        return Err("at least one plan is required".into());
    }
    let mut iter = plans.into_iter();
    let mut master = iter.next().unwrap_or_default();
    for plan in iter {
        master.merge_from(plan);
    }
    Ok(master)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_empty_is_error() {
        let err = merge_plans(vec![]).unwrap_err();
        assert_eq!(err, "at least one plan is required");
    }

    #[test]
    fn test_merge_single_plan_passthrough() {
        let mut plan = Plan::default();
        plan.openfaas_cloud_version = "master".into();
        let out = merge_plans(vec![plan]).unwrap();
        assert_eq!(out.openfaas_cloud_version, "master");
    }

    #[test]
    fn test_merge_fills_from_both() {
        let mut plan1 = Plan::default();
        plan1.openfaas_cloud_version = "master".into();
        let mut plan2 = Plan::default();
        plan2.customers_url = "https://127.0.0.1:8443/customers".into();

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.openfaas_cloud_version, "master");
        assert_eq!(out.customers_url, "https://127.0.0.1:8443/customers");
    }

    #[test]
    fn test_merge_later_value_wins() {
        let mut plan1 = Plan::default();
        plan1.openfaas_cloud_version = "0.12.0".into();
        let mut plan2 = Plan::default();
        plan2.openfaas_cloud_version = "0.11.0".into();

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.openfaas_cloud_version, "0.11.0");
    }

    #[test]
    fn test_merge_empty_does_not_overwrite() {
        let mut plan1 = Plan::default();
        plan1.root_domain = "example.com".into();
        let plan2 = Plan::default();

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.root_domain, "example.com");
    }

    #[test]
    fn test_merge_nested_struct_fields() {
        let mut plan1 = Plan::default();
        plan1.tls_config.email = "first@example.com".into();
        plan1.tls_config.dns_service = "route53".into();
        let mut plan2 = Plan::default();
        plan2.tls_config.email = "second@example.com".into();

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.tls_config.email, "second@example.com");
        assert_eq!(out.tls_config.dns_service, "route53");
    }

    #[test]
    fn test_merge_bool_true_wins() {
        let plan1 = Plan::default();
        let mut plan2 = Plan::default();
        plan2.enable_oauth = true;

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert!(out.enable_oauth);
    }

    fn named_secret(name: &str) -> SecretSpec {
        SecretSpec {
            name: name.into(),
            ..SecretSpec::default()
        }
    }

    #[test]
    fn test_merge_secrets_distinct_names() {
        let mut plan1 = Plan::default();
        plan1.secrets = vec![named_secret("one")];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![named_secret("two")];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets.len(), 2);
        assert_eq!(out.secrets[0].name, "one");
        assert_eq!(out.secrets[1].name, "two");
    }

    #[test]
    fn test_merge_secrets_same_name_collapse() {
        let mut s1 = named_secret("one");
        s1.namespace = "a".into();
        let mut s2 = named_secret("one");
        s2.namespace = "b".into();

        let mut plan1 = Plan::default();
        plan1.secrets = vec![s1];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![s2];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets.len(), 1);
        assert_eq!(out.secrets[0].namespace, "b");
    }

    #[test]
    fn test_merge_secrets_literal_value_filled_in() {
        let mut s1 = named_secret("one");
        s1.literals = vec![LiteralEntry {
            name: "basic-auth-password".into(),
            value: String::new(),
        }];
        let mut s2 = named_secret("one");
        s2.literals = vec![LiteralEntry {
            name: "basic-auth-password".into(),
            value: "test1234".into(),
        }];

        let mut plan1 = Plan::default();
        plan1.secrets = vec![s1];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![s2];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets.len(), 1);
        assert_eq!(out.secrets[0].literals.len(), 1);
        assert_eq!(out.secrets[0].literals[0].value, "test1234");
    }

    #[test]
    fn test_merge_secrets_empty_literal_keeps_earlier_value() {
        let mut s1 = named_secret("one");
        s1.literals = vec![LiteralEntry {
            name: "basic-auth-password".into(),
            value: "kept".into(),
        }];
        let mut s2 = named_secret("one");
        s2.literals = vec![LiteralEntry {
            name: "basic-auth-password".into(),
            value: String::new(),
        }];

        let mut plan1 = Plan::default();
        plan1.secrets = vec![s1];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![s2];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets[0].literals[0].value, "kept");
    }

    #[test]
    fn test_merge_secrets_extends_literals_by_name() {
        let mut s1 = named_secret("one");
        s1.literals = vec![LiteralEntry {
            name: "user".into(),
            value: "admin".into(),
        }];
        let mut s2 = named_secret("one");
        s2.literals = vec![LiteralEntry {
            name: "password".into(),
            value: "s3cr3t".into(),
        }];

        let mut plan1 = Plan::default();
        plan1.secrets = vec![s1];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![s2];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets[0].literals.len(), 2);
        assert_eq!(out.secrets[0].literals[0].value, "admin");
        assert_eq!(out.secrets[0].literals[1].value, "s3cr3t");
    }

    #[test]
    fn test_merge_secrets_files_by_name() {
        let mut s1 = named_secret("registry-secret");
        s1.files = vec![FileEntry {
            name: "config.json".into(),
            value_from: "~/.docker/config.json".into(),
            value_command: String::new(),
        }];
        let mut s2 = named_secret("registry-secret");
        s2.files = vec![FileEntry {
            name: "config.json".into(),
            value_from: "/etc/docker/config.json".into(),
            value_command: String::new(),
        }];

        let mut plan1 = Plan::default();
        plan1.secrets = vec![s1];
        let mut plan2 = Plan::default();
        plan2.secrets = vec![s2];

        let out = merge_plans(vec![plan1, plan2]).unwrap();
        assert_eq!(out.secrets[0].files.len(), 1);
        assert_eq!(out.secrets[0].files[0].value_from, "/etc/docker/config.json");
    }

    #[test]
    fn test_merge_three_plans_in_order() {
        let mut plan1 = Plan::default();
        plan1.root_domain = "first.example.com".into();
        let mut plan2 = Plan::default();
        plan2.root_domain = "second.example.com".into();
        plan2.registry = "docker.io/acme/".into();
        let mut plan3 = Plan::default();
        plan3.root_domain = "third.example.com".into();

        let out = merge_plans(vec![plan1, plan2, plan3]).unwrap();
        assert_eq!(out.root_domain, "third.example.com");
        assert_eq!(out.registry, "docker.io/acme/");
    }
}
