use crate::config::LoadedConfig;
use crate::support::{directory_file, exit_import_failure, join_or_dash, print_json};
use bcfsync_directory::DirectoryUser;
use bcfsync_import::{ImportError, MarkupExtractor, ParticipantReconciler, TopicArchive};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::io::{Read, Seek};
use std::sync::Arc;

struct Preview {
    topics: usize,
    all_people: Arc<BTreeSet<String>>,
    all_mails: Arc<BTreeSet<String>>,
    known_users: Arc<[DirectoryUser]>,
    unknown_mails: Arc<BTreeSet<String>>,
    members: Arc<[DirectoryUser]>,
    non_members: Arc<[DirectoryUser]>,
    invalid_people: Arc<BTreeSet<String>>,
}

fn collect<R: Read + Seek>(
    reconciler: &mut ParticipantReconciler<'_, R>,
) -> Result<Preview, ImportError> {
    Ok(Preview {
        topics: reconciler.listing()?.len(),
        all_people: reconciler.all_people()?,
        all_mails: reconciler.all_mails()?,
        known_users: reconciler.known_users()?,
        unknown_mails: reconciler.unknown_mails()?,
        members: reconciler.members()?,
        non_members: reconciler.non_members()?,
        invalid_people: reconciler.invalid_people()?,
    })
}

fn user_rows(users: &[DirectoryUser]) -> Vec<Value> {
    users
        .iter()
        .map(|user| {
            json!({
                "id": user.id,
                "mail": user.mail,
                "name": user.name(),
            })
        })
        .collect()
}

fn user_mails(users: &[DirectoryUser]) -> Vec<String> {
    users.iter().map(|user| user.mail.clone()).collect()
}

pub fn run(config: &LoadedConfig, archive: String, project: String, json_output: bool) {
    let directory = directory_file(config);
    let opened = TopicArchive::open(&archive)
        .unwrap_or_else(|e| exit_import_failure(&archive, e.into()));
    let mut reconciler =
        ParticipantReconciler::new(opened, project.as_str(), &MarkupExtractor, &directory);
    let preview = collect(&mut reconciler).unwrap_or_else(|e| exit_import_failure(&archive, e));

    if json_output {
        print_json(&json!({
            "action": "preview",
            "archive": archive,
            "projectId": project,
            "topics": preview.topics,
            "allPeople": &*preview.all_people,
            "allMails": &*preview.all_mails,
            "knownUsers": user_rows(&preview.known_users),
            "unknownMails": &*preview.unknown_mails,
            "members": user_rows(&preview.members),
            "nonMembers": user_rows(&preview.non_members),
            "invalidPeople": &*preview.invalid_people,
        }));
        return;
    }

    println!("bcfsync preview {archive}\n  Project: {project}\n  Topics: {}", preview.topics);
    println!("  People: {}", join_or_dash(preview.all_people.iter()));
    println!("  Mails: {}", join_or_dash(preview.all_mails.iter()));
    println!("  Known users: {}", join_or_dash(&user_mails(&preview.known_users)));
    println!("  Unknown mails: {}", join_or_dash(preview.unknown_mails.iter()));
    println!("  Members: {}", join_or_dash(&user_mails(&preview.members)));
    println!("  Non-members: {}", join_or_dash(&user_mails(&preview.non_members)));
    println!("  Invalid people: {}", join_or_dash(preview.invalid_people.iter()));
}
