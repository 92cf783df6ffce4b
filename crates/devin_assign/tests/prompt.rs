mod support;

use devin_assign::{
    build_session_prompt, AssignError, BuildSessionOptions, FixtureRecords, RecordKind, RecordRef,
};
use pretty_assertions::assert_eq;

fn record(kind: RecordKind, id: &str, reference_num: &str) -> RecordRef {
    RecordRef {
        id: id.to_string(),
        kind,
        reference_num: reference_num.to_string(),
    }
}

fn options(custom_instructions: Option<&str>) -> BuildSessionOptions {
    BuildSessionOptions {
        custom_instructions: custom_instructions.map(str::to_string),
        repository: "acme/storefront".to_string(),
        base_branch: None,
    }
}

#[tokio::test]
async fn feature_prompt_follows_template() {
    let records = FixtureRecords::new().with_feature(support::feature());
    let prompt = build_session_prompt(
        &records,
        &record(RecordKind::Feature, "f1", "SHOP-12"),
        &options(Some("Run the tests.")),
    )
    .await
    .expect("prompt");

    assert_eq!(prompt.title, "SHOP-12: Saved carts");
    assert_eq!(
        prompt.prompt,
        concat!(
            "You are being assigned the Aha! feature SHOP-12: Saved carts.\n\n",
            "Review the context and begin executing the work. Share progress updates and include the reference number in relevant branches or pull requests.\n\n",
            "### Repository\n\n",
            "- Work in the repository acme/storefront.\n",
            "- Base your work from the main branch unless instructed otherwise.\n",
            "- Include SHOP-12 in branch names and pull request titles.\n",
            "- Keep commit history and PRs synced to acme/storefront.\n\n",
            "### Description\n\n",
            "Let shoppers save carts.\n\n",
            "### Requirements\n",
            "- **SHOP-12-1**: Save cart\n",
            "- **SHOP-12-2**: No name provided\n\n",
            "### Todos\n",
            "- **Add table**\n\nKeyed by user.\n\n",
            "- **Wire API**\n\n\n\n",
            "**Aha! Reference:** [SHOP-12](https://acme.aha.io/features/SHOP-12)\n",
            "\n### Additional Instructions\n\nRun the tests.\n",
        )
    );

    assert_eq!(prompt.attachments.len(), 1);
    assert_eq!(prompt.attachments[0].file_name, "flow.png");
}

#[tokio::test]
async fn requirement_prompt_includes_parent_feature() {
    let records = FixtureRecords::new().with_requirement(support::requirement());
    let prompt = build_session_prompt(
        &records,
        &record(RecordKind::Requirement, "r1", "SHOP-12-1"),
        &BuildSessionOptions {
            base_branch: Some("develop".to_string()),
            ..options(None)
        },
    )
    .await
    .expect("prompt");

    assert_eq!(prompt.title, "SHOP-12-1: Save cart");
    assert!(prompt
        .prompt
        .starts_with("You are being assigned the Aha! requirement SHOP-12-1: Save cart.\n\n"));
    assert!(prompt
        .prompt
        .contains("- Base your work from the develop branch unless instructed otherwise.\n"));
    assert!(prompt.prompt.ends_with(concat!(
        "### Description\n\n",
        "No description provided.\n\n",
        "## Feature SHOP-12\n\n",
        "Parent context.\n\n",
        "\n\n",
        "**Aha! Reference:** [SHOP-12-1](https://acme.aha.io/requirements/SHOP-12-1)\n",
    )));
    assert!(!prompt.prompt.contains("Additional Instructions"));

    let names = prompt
        .attachments
        .iter()
        .map(|attachment| attachment.file_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["mock.png", "flow.png"]);
}

#[tokio::test]
async fn empty_base_branch_drops_the_branch_line() {
    let records = FixtureRecords::new().with_feature(support::feature());
    let prompt = build_session_prompt(
        &records,
        &record(RecordKind::Feature, "f1", "SHOP-12"),
        &BuildSessionOptions {
            base_branch: Some(String::new()),
            ..options(None)
        },
    )
    .await
    .expect("prompt");

    assert!(!prompt.prompt.contains("Base your work"));
}

#[tokio::test]
async fn missing_records_fail_with_load_errors() {
    let records = FixtureRecords::new();

    let error = build_session_prompt(
        &records,
        &record(RecordKind::Feature, "nope", "X-1"),
        &options(None),
    )
    .await
    .expect_err("missing feature");
    assert!(matches!(error, AssignError::RecordNotFound { kind: "feature" }));
    assert_eq!(error.to_string(), "Failed to load feature details");

    let error = build_session_prompt(
        &records,
        &record(RecordKind::Requirement, "nope", "X-1-1"),
        &options(None),
    )
    .await
    .expect_err("missing requirement");
    assert_eq!(error.to_string(), "Failed to load requirement details");
}
