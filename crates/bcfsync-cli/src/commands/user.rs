use crate::cli::UserCommands;
use crate::config::LoadedConfig;
use crate::support::{directory_file, exit_with_error, print_json};
use bcfsync_directory::{DirectoryError, DirectoryUser, UserStatus};
use serde_json::json;

pub fn run(config: &LoadedConfig, command: UserCommands) {
    match command {
        UserCommands::Add {
            mail,
            admin,
            project,
            roles,
            json,
        } => run_add(config, mail, admin, project, roles, json),
    }
}

fn run_add(
    config: &LoadedConfig,
    mail: String,
    admin: bool,
    project: Option<String>,
    roles: Vec<String>,
    json_output: bool,
) {
    let roles = if roles.is_empty() {
        config.config.import.invite_role_ids.clone()
    } else {
        roles
    };
    let directory = directory_file(config);

    let user = directory
        .mutate(|directory| -> Result<DirectoryUser, DirectoryError> {
            let id = directory.provision_user(&mail)?.id.clone();
            if let Some(project) = &project {
                directory.add_membership(&id, project, &roles)?;
            }
            let user = directory
                .users
                .get_mut(&id)
                .ok_or_else(|| DirectoryError::UserNotFound(id.clone()))?;
            user.admin = admin;
            user.status = UserStatus::Active;
            Ok(user.clone())
        })
        .unwrap_or_else(|e| exit_with_error(&e));

    if json_output {
        print_json(&json!({
            "action": "user.add",
            "directoryPath": directory.path().display().to_string(),
            "user": user,
        }));
    } else {
        println!(
            "bcfsync user add\n  Added: {} <{}>{}\n  Path: {}",
            user.id,
            user.mail,
            if user.admin { " [admin]" } else { "" },
            directory.path().display()
        );
        for membership in &user.memberships {
            println!(
                "  member of {} as {}",
                membership.project_id,
                membership.role_ids.join(", ")
            );
        }
    }
}
