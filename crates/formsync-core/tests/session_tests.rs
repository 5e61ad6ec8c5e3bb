use formsync_changes::ChangeKind;
use formsync_core::{is_protected, FieldBinding, FormValue, ReferenceGroup, SyncConfig, SyncSession};
use formsync_test_utils::{live, path, placement, policy, policy_schemas, secret};
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn user_edit_survives_form_change_elsewhere() {
    let mut session = SyncSession::builder().build();
    let first = session.apply_form_update(&[policy("p", "low")]).unwrap();

    let typed = first.yaml.replace("remediationAction: inform", "remediationAction: enforce");
    let edit = session.apply_user_edit(&typed);
    assert_eq!(edit.changes.len(), 1);
    assert_eq!(edit.changes[0].diff_path.to_string(), "Policy.0.spec.remediationAction");

    let second = session.apply_form_update(&[policy("p", "high")]).unwrap();
    assert!(second.yaml.contains("severity: high"));
    assert!(second.yaml.contains("remediationAction: enforce"));
    assert_eq!(second.user_edits.len(), 1);
    let paths: Vec<String> = second.changes.iter().map(|c| c.diff_path.to_string()).collect();
    assert!(paths.contains(&"Policy.0.spec.severity".to_string()));
    assert!(paths.contains(&"Policy.0.spec.remediationAction".to_string()));
}

#[test]
fn user_edit_wins_over_form_change_at_same_path() {
    let mut session = SyncSession::builder().build();
    let first = session.apply_form_update(&[policy("p", "low")]).unwrap();
    session.apply_user_edit(&first.yaml.replace("severity: low", "severity: medium"));

    let second = session.apply_form_update(&[policy("p", "high")]).unwrap();
    assert!(second.yaml.contains("severity: medium"));
    assert_eq!(second.user_edits[0].prior_value, Some(json!("high")));
}

#[test]
fn edit_caught_up_by_form_is_settled() {
    let mut session = SyncSession::builder().build();
    let first = session.apply_form_update(&[policy("p", "low")]).unwrap();
    session.apply_user_edit(&first.yaml.replace("severity: low", "severity: high"));

    let second = session.apply_form_update(&[policy("p", "high")]).unwrap();
    assert!(second.user_edits.is_empty());
    assert!(session.pending_edits().is_empty());
}

#[test]
fn form_added_resource_reported_as_new() {
    let mut session = SyncSession::builder().build();
    session.apply_form_update(&[policy("p", "low")]).unwrap();
    let out = session
        .apply_form_update(&[policy("p", "low"), placement("pl")])
        .unwrap();
    assert!(out.yaml.contains("---\n"));
    assert!(out.changes.iter().any(|c| c.kind == ChangeKind::New));
}

#[test]
fn identity_fields_of_live_resources_are_protected() {
    let mut session = SyncSession::builder().build();
    let out = session.apply_form_update(&[live(policy("p", "low"), "abc-123")]).unwrap();
    assert!(is_protected(&out.protected_ranges, 4));

    let renamed = session.apply_user_edit(&out.yaml.replace("  name: p\n", "  name: q\n"));
    assert!(renamed.changes.is_empty());

    let retuned = session.apply_user_edit(&out.yaml.replace("severity: low", "severity: high"));
    assert_eq!(retuned.changes.len(), 1);
}

#[test]
fn readonly_buffer_yields_no_changes() {
    let mut session = SyncSession::builder()
        .with_config(SyncConfig::default().with_readonly(true))
        .build();
    let out = session.apply_form_update(&[policy("p", "low")]).unwrap();
    let edit = session.apply_user_edit(&out.yaml.replace("severity: low", "severity: high"));
    assert!(edit.changes.is_empty());
    assert_eq!(edit.resources, vec![policy("p", "low")]);
    assert!(session.change_stack().is_none());
}

#[test]
fn immutable_paths_are_protected() {
    let mut session = SyncSession::builder()
        .with_immutables(["Policy.spec.disabled"])
        .build();
    let out = session.apply_form_update(&[policy("p", "low")]).unwrap();
    let edit = session.apply_user_edit(&out.yaml.replace("disabled: false", "disabled: true"));
    assert!(edit.changes.is_empty());
    assert!(!edit.protected_ranges.is_empty());
}

#[test]
fn filtered_subtree_hidden_and_restored() {
    let mut resource = policy("p", "low");
    resource["metadata"]["annotations"] = json!({"note": "generated"});
    let mut session = SyncSession::builder()
        .with_filters(["Policy.metadata.annotations"])
        .build();
    let out = session.apply_form_update(&[resource]).unwrap();
    assert!(!out.yaml.contains("annotations"));

    let edit = session.apply_user_edit(&out.yaml);
    assert_eq!(edit.resources[0]["metadata"]["annotations"]["note"], "generated");
    assert!(edit.changes.is_empty());
}

#[test]
fn dependency_namespace_message() {
    let mut resource = policy("p", "low");
    resource["spec"]["dependencies"] = json!([{"kind": "IamPolicy", "name": "iam", "namespace": "ns"}]);
    let mut session = SyncSession::builder().with_schema(policy_schemas()).build();
    let out = session.apply_form_update(&[resource]).unwrap();
    let messages: Vec<&str> = out.errors.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(
        &"Dependencies on ConfigurationPolicies, IamPolicies, and CertificatePolicies cannot contain a namespace"
    ));
}

#[test]
fn invalid_name_blocks_on_its_line() {
    let text = "apiVersion: policy.open-cluster-management.io/v1\n\
                kind: Policy\n\
                metadata:\n  name: -test\n  namespace: policies\n\
                spec:\n  disabled: false\n";
    let mut session = SyncSession::builder().with_schema(policy_schemas()).build();
    let edit = session.apply_user_edit(text);
    let error = edit
        .errors
        .iter()
        .find(|e| e.message.contains("must start/end alphanumerically"))
        .unwrap();
    assert_eq!(error.line(), 4);
    assert!(error.is_blocking());
    assert!(!edit.is_clean());
    assert!(session.change_stack().is_none());
}

#[test]
fn missing_required_resource_reported() {
    let mut session = SyncSession::builder().with_schema(policy_schemas()).build();
    let out = session.apply_form_update(&[placement("pl")]).unwrap();
    assert!(out.errors.iter().any(|e| e.message == "Requires 1 Policy"));
}

#[test]
fn renamed_live_resource_keeps_its_name() {
    let mut session = SyncSession::builder().build();
    let form = [live(policy("p", "low"), "abc-123")];
    let out = session.apply_form_update(&form).unwrap();

    let edit = session.apply_user_edit(&out.yaml.replace("  name: p\n", "  name: q\n"));
    assert!(edit.changes.is_empty());
    assert_eq!(edit.resources[0]["metadata"]["name"], "p");
    assert_eq!(session.change_stack().unwrap().custom[0]["metadata"]["name"], "p");

    let again = session.apply_form_update(&form).unwrap();
    assert!(again.yaml.contains("  name: p\n"));
    assert!(!again.yaml.contains("name: q"));
}

#[test]
fn deleting_immutable_line_is_ignored() {
    let mut session = SyncSession::builder()
        .with_immutables(["Policy.spec.disabled"])
        .build();
    let out = session.apply_form_update(&[policy("p", "low")]).unwrap();
    assert!(is_protected(&out.protected_ranges, 7));

    let edit = session.apply_user_edit(&out.yaml.replace("  disabled: false\n", ""));
    assert!(edit.changes.iter().all(|c| c.kind != ChangeKind::Delete));
    assert!(edit.changes.is_empty());
    assert_eq!(edit.resources[0]["spec"]["disabled"], false);
    assert_eq!(session.change_stack().unwrap().custom[0]["spec"]["disabled"], false);
}

#[test]
fn syntax_error_keeps_hidden_values() {
    let mut session = SyncSession::builder()
        .with_secrets(["Secret.stringData.token"])
        .build();
    let out = session.apply_form_update(&[secret("creds", "tok-abcdefgh12")]).unwrap();
    let cache = session.redaction_cache().clone();
    assert!(!cache.is_empty());

    let broken = session.apply_user_edit(&format!("{}  bad: [\n", out.yaml));
    assert!(!broken.syntax_errors.is_empty());
    assert_eq!(session.redaction_cache(), &cache);

    let fixed = session.apply_user_edit(&out.yaml.replace("user: admin", "user: root"));
    assert_eq!(fixed.resources[0]["stringData"]["token"], "tok-abcdefgh12");
    assert_eq!(fixed.resources[0]["stringData"]["user"], "root");
}

#[test]
fn template_name_errors_reported_by_form_update() {
    let mut resource = policy("p", "low");
    resource["metadata"]["name"] = json!({"x": "y"});
    let mut session = SyncSession::builder().build();
    let out = session.apply_form_update(&[resource.clone()]).unwrap();
    assert!(out
        .errors
        .iter()
        .any(|e| e.message.starts_with("Invalid template name syntax") && e.line() == 4));

    let mut session = SyncSession::builder().build();
    let out = session.apply_form_update(&[live(resource, "abc-123")]).unwrap();
    assert!(out.errors.iter().all(|e| !e.message.starts_with("Invalid template name syntax")));
}

#[test]
fn bound_fields_read_back_after_clean_edit() {
    let severity: FieldBinding = "Policy[0].spec.severity".parse().unwrap();
    let action = FieldBinding::new(path("Policy.0.spec.remediationAction")).required();
    let mut session = SyncSession::builder().with_bindings([severity, action]).build();
    let out = session.apply_form_update(&[policy("p", "low")]).unwrap();

    let edit = session.apply_user_edit(&out.yaml.replace("severity: low", "severity: high"));
    assert_eq!(
        edit.form_values,
        vec![
            FormValue { path: path("Policy.0.spec.severity"), value: json!("high") },
            FormValue { path: path("Policy.0.spec.remediationAction"), value: json!("inform") },
        ]
    );
    assert!(edit.binding_errors.is_empty());

    let edit = session.apply_user_edit(&out.yaml.replace("  remediationAction: inform\n", ""));
    assert_eq!(edit.binding_errors.len(), 1);
    assert!(edit.is_clean());
    assert_eq!(edit.form_values.len(), 1);
}

#[test]
fn renamed_policy_carried_to_its_binding() {
    let binding = json!({
        "apiVersion": "policy.open-cluster-management.io/v1",
        "kind": "PlacementBinding",
        "metadata": {"name": "b", "namespace": "policies"},
        "subjects": [{"apiGroup": "policy.open-cluster-management.io", "kind": "Policy", "name": "p"}]
    });
    let mut session = SyncSession::builder()
        .with_references([ReferenceGroup::new(&["Policy.metadata.name", "PlacementBinding.subjects.*.name"])])
        .build();
    let form = [policy("p", "low"), binding];
    let out = session.apply_form_update(&form).unwrap();
    assert_eq!(session.references().len(), 1);

    let edit = session.apply_user_edit(&out.yaml.replacen("  name: p\n", "  name: p2\n", 1));
    assert_eq!(edit.resources[1]["subjects"][0]["name"], "p2");
    let paths: Vec<String> = edit.changes.iter().map(|c| c.diff_path.to_string()).collect();
    assert!(paths.contains(&"Policy.0.metadata.name".to_string()));
    assert!(paths.contains(&"PlacementBinding.0.subjects.0.name".to_string()));

    let again = session.apply_form_update(&form).unwrap();
    assert_eq!(again.yaml.matches("name: p2").count(), 2);
}
