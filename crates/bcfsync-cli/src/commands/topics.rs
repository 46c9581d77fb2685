use crate::config::LoadedConfig;
use crate::support::{directory_file, exit_import_failure, print_json};
use bcfsync_import::{MarkupExtractor, ParticipantReconciler, TopicArchive};
use serde_json::json;

pub fn run(config: &LoadedConfig, archive: String, json_output: bool) {
    let directory = directory_file(config);
    let opened = TopicArchive::open(&archive)
        .unwrap_or_else(|e| exit_import_failure(&archive, e.into()));
    let mut reconciler = ParticipantReconciler::new(opened, "", &MarkupExtractor, &directory);
    let listing = reconciler
        .listing()
        .unwrap_or_else(|e| exit_import_failure(&archive, e));

    if json_output {
        print_json(&json!({
            "action": "topics",
            "archive": archive,
            "count": listing.len(),
            "items": &listing[..],
        }));
        return;
    }

    println!("bcfsync topics {archive}\n  Count: {}", listing.len());
    for summary in listing.iter() {
        let record = &summary.record;
        println!(
            "  - {} [{}] {}",
            record.uuid,
            record.status.as_deref().unwrap_or("-"),
            record.title
        );
        println!(
            "      people: {}  comments: {}  viewpoints: {}",
            record.people.len(),
            record.comments_count,
            record.viewpoint_count
        );
    }
}
