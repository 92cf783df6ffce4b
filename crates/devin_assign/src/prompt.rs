//! Session title and prompt assembly for a record.

use devin_api::{dedupe_attachments, AttachmentRecord};

use crate::error::AssignError;
use crate::records::{
    FeatureDetails, Note, RecordKind, RecordQuery, RecordRef, RequirementDetails, Task,
};
use crate::settings::DEFAULT_BASE_BRANCH;

const GOAL: &str = "Review the context and begin executing the work. Share progress updates and include the reference number in relevant branches or pull requests.";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSessionOptions {
    pub custom_instructions: Option<String>,
    pub repository: String,
    /// `None` means `main`; an empty string drops the base-branch line.
    pub base_branch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrompt {
    pub title: String,
    pub prompt: String,
    pub attachments: Vec<AttachmentRecord>,
}

struct Described {
    context: String,
    title: String,
    reference_num: String,
    attachments: Vec<AttachmentRecord>,
}

pub async fn build_session_prompt<Q>(
    query: &Q,
    record: &RecordRef,
    options: &BuildSessionOptions,
) -> Result<SessionPrompt, AssignError>
where
    Q: RecordQuery + ?Sized,
{
    let described = match record.kind {
        RecordKind::Feature => {
            let feature = query
                .feature(&record.id)
                .await?
                .ok_or(AssignError::RecordNotFound { kind: "feature" })?;
            describe_feature(feature)
        }
        RecordKind::Requirement => {
            let requirement = query
                .requirement(&record.id)
                .await?
                .ok_or(AssignError::RecordNotFound { kind: "requirement" })?;
            describe_requirement(requirement)
        }
    };

    let header = format!(
        "You are being assigned the Aha! {} {}: {}.",
        record.kind.as_str().to_lowercase(),
        described.reference_num,
        described.title
    );

    let repository = options.repository.as_str();
    let base_branch = options.base_branch.as_deref().unwrap_or(DEFAULT_BASE_BRANCH);
    let mut repository_lines = vec![format!("Work in the repository {repository}.")];
    if !base_branch.is_empty() {
        repository_lines.push(format!(
            "Base your work from the {base_branch} branch unless instructed otherwise."
        ));
    }
    repository_lines.push(format!(
        "Include {} in branch names and pull request titles.",
        described.reference_num
    ));
    repository_lines.push(format!("Keep commit history and PRs synced to {repository}."));
    let repository_section = format!(
        "### Repository\n\n{}",
        repository_lines
            .iter()
            .map(|line| format!("- {line}"))
            .collect::<Vec<_>>()
            .join("\n")
    );

    let mut prompt = format!(
        "{header}\n\n{GOAL}\n\n{repository_section}\n\n{}",
        described.context
    );
    if let Some(instructions) = options
        .custom_instructions
        .as_deref()
        .filter(|instructions| !instructions.is_empty())
    {
        prompt.push_str(&format!("\n### Additional Instructions\n\n{instructions}\n"));
    }

    Ok(SessionPrompt {
        title: format!("{}: {}", described.reference_num, described.title),
        prompt,
        attachments: described.attachments,
    })
}

fn describe_feature(feature: FeatureDetails) -> Described {
    let requirements_block = if feature.requirements.is_empty() {
        String::new()
    } else {
        let lines = feature
            .requirements
            .iter()
            .map(|requirement| {
                format!(
                    "- **{}**: {}",
                    requirement.reference_num,
                    non_empty(requirement.name.as_deref()).unwrap_or("No name provided")
                )
            })
            .collect::<Vec<_>>()
            .join("\n");
        format!("### Requirements\n{lines}")
    };

    let context = format!(
        "### Description\n\n{}\n\n{requirements_block}\n\n{}\n\n**Aha! Reference:** [{}]({})\n",
        markdown_or(feature.description.as_ref(), "No description provided."),
        todos_block(&feature.tasks),
        feature.reference_num,
        feature.path
    );

    let attachments = dedupe_attachments(
        feature
            .description
            .map(|note| note.attachments)
            .unwrap_or_default(),
    );

    Described {
        context,
        title: feature.name,
        reference_num: feature.reference_num,
        attachments,
    }
}

fn describe_requirement(requirement: RequirementDetails) -> Described {
    let parent = requirement.feature.as_ref();
    let parent_heading = match parent {
        Some(feature) => format!("## Feature {}", feature.reference_num),
        None => "## Feature".to_owned(),
    };

    let context = format!(
        "### Description\n\n{}\n\n{parent_heading}\n\n{}\n\n{}\n\n**Aha! Reference:** [{}]({})\n",
        markdown_or(requirement.description.as_ref(), "No description provided."),
        markdown_or(
            parent.and_then(|feature| feature.description.as_ref()),
            "No feature description provided."
        ),
        todos_block(&requirement.tasks),
        requirement.reference_num,
        requirement.path
    );

    let mut attachments = requirement
        .description
        .map(|note| note.attachments)
        .unwrap_or_default();
    if let Some(note) = requirement.feature.and_then(|feature| feature.description) {
        attachments.extend(note.attachments);
    }

    Described {
        context,
        title: requirement.name,
        reference_num: requirement.reference_num,
        attachments: dedupe_attachments(attachments),
    }
}

fn todos_block(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return String::new();
    }
    let items = tasks
        .iter()
        .map(|task| format!("- **{}**\n\n{}", task.name, task.body.as_deref().unwrap_or("")))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("### Todos\n{items}")
}

fn markdown_or<'a>(note: Option<&'a Note>, fallback: &'a str) -> &'a str {
    non_empty(note.and_then(|note| note.markdown_body.as_deref())).unwrap_or(fallback)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.is_empty())
}
