use field_bridge::{Bridge, FieldChannel, Trigger};
use serde_json::Value;

use crate::error::AssignError;
use crate::events::create_devin_session;
use crate::prompt::{build_session_prompt, BuildSessionOptions};
use crate::records::{RecordQuery, RecordRef};
use crate::session::{CreateSessionArgs, SessionRecord};
use crate::settings::ExtensionSettings;
use crate::EXTENSION_NAME;

/// Sink for user-visible command progress lines.
pub trait CommandOutput {
    fn line(&mut self, text: &str);
}

impl CommandOutput for Vec<String> {
    fn line(&mut self, text: &str) {
        self.push(text.to_owned());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignOutcome {
    NotAssignable,
    AlreadyAssigned(SessionRecord),
    MissingRepository,
    Created(SessionRecord),
    Failed(String),
}

/// Assigns `record` to a new Devin session unless it already has one.
///
/// Every outcome, including failures, is reported through `output`.
pub async fn assign_record<Q, C, T>(
    record: &Value,
    settings: &ExtensionSettings,
    query: &Q,
    bridge: &Bridge<C, T>,
    output: &mut dyn CommandOutput,
) -> AssignOutcome
where
    Q: RecordQuery + ?Sized,
    C: FieldChannel,
    T: Trigger,
{
    let Some(record) = RecordRef::from_value(record) else {
        output.line("Error: Please run this command on a Feature or Requirement");
        return AssignOutcome::NotAssignable;
    };

    match run_assign(&record, settings, query, bridge, output).await {
        Ok(outcome) => outcome,
        Err(error) => {
            let message = error.message();
            tracing::error!(record = %record.reference_num, message = %message, "assign failed");
            output.line(&format!("Error: {message}"));
            AssignOutcome::Failed(message)
        }
    }
}

async fn run_assign<Q, C, T>(
    record: &RecordRef,
    settings: &ExtensionSettings,
    query: &Q,
    bridge: &Bridge<C, T>,
    output: &mut dyn CommandOutput,
) -> Result<AssignOutcome, AssignError>
where
    Q: RecordQuery + ?Sized,
    C: FieldChannel,
    T: Trigger,
{
    if let Some(existing) = query.session(record).await? {
        output.line(&format!(
            "Already assigned to {EXTENSION_NAME}: {}",
            existing.display_link()
        ));
        return Ok(AssignOutcome::AlreadyAssigned(existing));
    }

    let Some(repository) = settings.repository() else {
        output.line("Error: Please configure the repository setting (e.g., owner/repo)");
        return Ok(AssignOutcome::MissingRepository);
    };
    let base_branch = settings.base_branch().to_owned();

    output.line("Building context...");
    let options = BuildSessionOptions {
        custom_instructions: settings.custom_instructions().map(str::to_owned),
        repository: repository.to_owned(),
        base_branch: Some(base_branch.clone()),
    };
    let session_prompt = build_session_prompt(query, record, &options).await?;

    output.line(&format!("Requesting {EXTENSION_NAME} session..."));
    let args = CreateSessionArgs {
        record_reference: Some(record.reference_num.clone()),
        record_type: Some(record.kind),
        title: session_prompt.title,
        prompt: session_prompt.prompt,
        repository: Some(repository.to_owned()),
        base_branch: Some(base_branch),
        tags: settings.tags(),
        playbook_id: settings.playbook_id().map(str::to_owned),
        attachments: session_prompt.attachments,
    };
    let session = create_devin_session(bridge, &args).await?;

    query.store_session(record, &session).await?;
    output.line(&format!(
        "✓ {EXTENSION_NAME} session created: {}",
        session.display_link()
    ));
    Ok(AssignOutcome::Created(session))
}
