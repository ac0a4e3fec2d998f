use inkwell_common::outcome::UpdateOutcome;
use inkwell_common::types::PrincipalId;
use inkwell_core::store::VersionedStore;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Attempt {
    Current(String),
    Stale { offset: i64, content: String },
}

fn attempt() -> impl Strategy<Value = Attempt> {
    let content = "[a-z][a-z ]{0,15}";
    prop_oneof![
        content.prop_map(Attempt::Current),
        (prop_oneof![-3i64..=-1, 1i64..=3], content)
            .prop_map(|(offset, content)| Attempt::Stale { offset, content }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn version_tracks_accepted_edits_only(attempts in prop::collection::vec(attempt(), 1..40)) {
        let store = VersionedStore::in_memory();
        let editor = PrincipalId::new("editor");
        let doc = store.create("Prop", "seed", &editor).unwrap();

        let mut version = 1;
        let mut content = "seed".to_string();
        let mut accepted = Vec::new();

        for attempt in attempts {
            match attempt {
                Attempt::Current(next) => {
                    let outcome = store.update(doc.id, version, &next, &editor).unwrap();
                    prop_assert!(outcome.is_accepted());
                    version += 1;
                    content = next.clone();
                    accepted.push(next);
                }
                Attempt::Stale { offset, content: draft } => {
                    let outcome = store.update(doc.id, version + offset, &draft, &editor).unwrap();
                    match outcome {
                        UpdateOutcome::Conflict { current, attempted_content } => {
                            prop_assert_eq!(attempted_content, draft);
                            prop_assert_eq!(current.version, version);
                        }
                        UpdateOutcome::Accepted { .. } => prop_assert!(false, "stale version accepted"),
                    }
                }
            }

            let current = store.read(doc.id).unwrap();
            prop_assert_eq!(current.version, version);
            prop_assert_eq!(&current.content, &content);
        }

        prop_assert_eq!(version, 1 + accepted.len() as i64);
        let history: Vec<_> =
            store.audit().history(doc.id).unwrap().into_iter().map(|r| r.content).collect();
        prop_assert_eq!(history, accepted);
        prop_assert!(store.audit().verify(doc.id).unwrap().is_intact());
    }
}
