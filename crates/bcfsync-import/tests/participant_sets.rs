use bcfsync_directory::{DirectoryUser, Membership, is_mail_address, mail_key};
use bcfsync_import::{
    TopicRecord, TopicSummary, collect_mails, collect_people, invalid_people, partition_members,
    unknown_mails,
};
use proptest::prelude::*;
use std::collections::BTreeSet;
use uuid::Uuid;

fn token() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-cA-C]{1,2}@[xX]\\.org",
        "[A-Z][a-z]{0,4}( [A-Z][a-z]{0,3})?",
    ]
}

fn summaries() -> impl Strategy<Value = Vec<TopicSummary>> {
    prop::collection::vec(prop::collection::vec(token(), 0..5), 0..6).prop_map(|topics| {
        topics
            .into_iter()
            .enumerate()
            .map(|(index, tokens)| {
                let mut record = TopicRecord::new(Uuid::nil(), format!("topic {index}"));
                for token in tokens {
                    if !record.people.contains(&token) {
                        record.people.push(token);
                    }
                }
                record.mail_addresses = record
                    .people
                    .iter()
                    .filter(|token| is_mail_address(token))
                    .cloned()
                    .collect();
                TopicSummary {
                    entry: format!("{index}/markup.bcf"),
                    record,
                }
            })
            .collect()
    })
}

/// Directory users for the mails picked by `mask`, spelled upper-case so
/// matching has to ignore case.
fn directory_users(all_mails: &BTreeSet<String>, mask: &[bool], project: &str) -> Vec<DirectoryUser> {
    all_mails
        .iter()
        .zip(mask.iter().cycle())
        .enumerate()
        .filter(|(_, (_, known))| **known)
        .map(|(index, (mail, _))| {
            let mut user = DirectoryUser::invited(format!("u-{index}"), &mail.to_uppercase());
            if index % 2 == 0 {
                user.memberships.push(Membership {
                    project_id: project.to_string(),
                    role_ids: vec!["member".to_string()],
                });
            }
            user
        })
        .collect()
}

fn keys<'a>(mails: impl IntoIterator<Item = &'a String>) -> BTreeSet<String> {
    mails.into_iter().map(|mail| mail_key(mail)).collect()
}

proptest! {
    #[test]
    fn people_cover_mails_and_invalid_people_are_the_rest(summaries in summaries()) {
        let people = collect_people(&summaries);
        let mails = collect_mails(&summaries);
        let invalid = invalid_people(&people, &mails);
        let mail_keys = keys(&mails);

        prop_assert!(mails.is_subset(&people));
        prop_assert!(invalid.is_disjoint(&mails));
        for person in &people {
            prop_assert_ne!(invalid.contains(person), mail_keys.contains(&mail_key(person)));
        }
    }

    #[test]
    fn known_and_unknown_partition_all_mails(
        summaries in summaries(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mails = collect_mails(&summaries);
        let known = directory_users(&mails, &mask, "site");
        let unknown = unknown_mails(&mails, &known);

        let known_keys: BTreeSet<String> = known.iter().map(DirectoryUser::mail_key).collect();
        let unknown_keys = keys(&unknown);
        prop_assert!(known_keys.is_disjoint(&unknown_keys));
        let union: BTreeSet<String> = known_keys.union(&unknown_keys).cloned().collect();
        prop_assert_eq!(union, keys(&mails));
    }

    #[test]
    fn members_and_non_members_partition_known_users(
        summaries in summaries(),
        mask in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mails = collect_mails(&summaries);
        let known = directory_users(&mails, &mask, "site");
        let (members, non_members) = partition_members(&known, "site");

        prop_assert_eq!(members.len() + non_members.len(), known.len());
        prop_assert!(members.iter().all(|user| user.is_member_of("site")));
        prop_assert!(non_members.iter().all(|user| !user.is_member_of("site")));
        let ids: BTreeSet<&str> = members.iter().chain(&non_members).map(|u| u.id.as_str()).collect();
        prop_assert_eq!(ids.len(), known.len());
    }
}

#[test]
fn mails_are_case_insensitively_unique() {
    let mut record = TopicRecord::new(Uuid::nil(), "t");
    record.people = vec!["Foo@Bar.com".to_string(), "foo@bar.com".to_string()];
    record.mail_addresses = record.people.clone();
    let summaries = [TopicSummary {
        entry: "t/markup.bcf".to_string(),
        record,
    }];

    assert_eq!(collect_people(&summaries).len(), 2);
    assert_eq!(
        collect_mails(&summaries),
        BTreeSet::from(["Foo@Bar.com".to_string()])
    );
}
