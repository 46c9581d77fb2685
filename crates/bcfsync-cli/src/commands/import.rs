use crate::config::LoadedConfig;
use crate::support::{directory_file, exit_with_error, print_json};
use bcfsync_import::{
    ImportOptions, ImportReport, ImportRequest, MarkupExtractor, TopicSync, TrackerMaterializer,
};
use serde_json::json;

pub struct Args {
    pub archive: String,
    pub project: String,
    pub actor: String,
    pub invite_unknown: bool,
    pub invite_roles: Vec<String>,
    pub add_non_members: bool,
    pub member_roles: Vec<String>,
    pub anonymize_invalid: bool,
    pub json: bool,
}

#[derive(Debug, thiserror::Error)]
#[error("{flag} needs at least one role (pass {role_flag} or set import.invite_role_ids)")]
struct MissingRoles {
    flag: &'static str,
    role_flag: &'static str,
}

/// Flags win over config; role lists fall back to `import.invite_role_ids`.
fn import_options(config: &LoadedConfig, args: &Args) -> Result<ImportOptions, MissingRoles> {
    let roles_or_default = |roles: &[String]| -> Vec<String> {
        if roles.is_empty() {
            config.config.import.invite_role_ids.clone()
        } else {
            roles.to_vec()
        }
    };

    let mut options = ImportOptions::default();
    if args.invite_unknown {
        let roles = roles_or_default(&args.invite_roles);
        if roles.is_empty() {
            return Err(MissingRoles {
                flag: "--invite-unknown",
                role_flag: "--invite-role",
            });
        }
        options = options.invite_unknown(roles);
    }
    if args.add_non_members {
        let roles = roles_or_default(&args.member_roles);
        if roles.is_empty() {
            return Err(MissingRoles {
                flag: "--add-non-members",
                role_flag: "--member-role",
            });
        }
        options = options.add_non_members(roles);
    }
    if args.anonymize_invalid {
        options = options.anonymize_invalid();
    }
    Ok(options)
}

pub fn run(config: &LoadedConfig, args: Args) {
    let options = import_options(config, &args).unwrap_or_else(|e| exit_with_error(&e));
    let request = ImportRequest::new(args.project.as_str(), args.actor.as_str()).with_options(options);

    let directory = directory_file(config);
    let license = config.config.license;
    let materializer = TrackerMaterializer::new(config.issues_path());
    let mut sync = TopicSync::new(&MarkupExtractor, &directory, &license, &materializer);

    let report = sync
        .import_path(&args.archive, &request)
        .unwrap_or_else(|failure| exit_with_error(&failure));

    if args.json {
        print_json(&json!({
            "action": "import",
            "issuesPath": materializer.issues_path().display().to_string(),
            "succeeded": report.succeeded(),
            "failed": report.failed(),
            "report": report,
        }));
    } else {
        print_report(&report);
    }
}

fn print_report(report: &ImportReport) {
    println!(
        "bcfsync import {}\n  Project: {}\n  Topics: {}  Succeeded: {}  Failed: {}",
        report.archive,
        report.project_id,
        report.outcomes.len(),
        report.succeeded(),
        report.failed()
    );
    for user in &report.invited {
        println!("  invited {} ({})", user.mail, user.id);
    }
    for user in &report.enrolled {
        println!("  added to project: {} ({})", user.mail, user.id);
    }
    for outcome in &report.outcomes {
        if outcome.is_success() {
            let verb = if outcome.created { "created" } else { "updated" };
            println!("  - {} {verb} {}", outcome.issue.id, outcome.issue.title);
        } else {
            println!("  - {} not saved: {}", outcome.entry, outcome.issue.title);
            for error in &outcome.errors {
                println!("      {error}");
            }
        }
    }
}
