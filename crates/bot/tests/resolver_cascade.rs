#![forbid(unsafe_code)]

mod support;

use gtd_bot::embed::{DirtyField, init_task};
use gtd_bot::{GtdError, ProjectQuery, RemoteError, Resolver, TaskQuery};
use gtd_bot::{Attributes, ChannelQuery};
use gtd_core::{Entity, EntityKind, Task};
use support::*;

#[test]
fn minting_a_task_under_a_project_anchors_and_renames_it() {
    let mut store = seeded_store();
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_topic(9, "Buy milk", 501);

    let task = Resolver::new(&mut store, &platform)
        .resolve_task(&TaskQuery {
            name: Some("Buy milk".to_string()),
            project_id: Some(3),
            context_id: Some(9),
            completed: false,
            ..TaskQuery::default()
        })
        .expect("anchor lookup should mint the task");

    assert_eq!(task.id, 501);
    assert_eq!(task.name, "Buy milk #L7-P3-C9-T501");
    assert_eq!(store.get_task(501).expect("get"), Some(task));
    assert_eq!(
        platform.renames(),
        vec![(501, "Buy milk #L7-P3-C9-T501".to_string())]
    );
    assert_eq!(platform.topic_titles(9), vec!["Buy milk #L7-P3-C9-T501"]);
}

#[test]
fn init_reports_id_then_name_dirty() {
    let store = seeded_store();
    let project = store.get_project(3).expect("get").expect("seeded project");
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_topic(9, "Buy milk", 501);

    let draft = Task {
        id: 0,
        name: "Buy milk".to_string(),
        project_id: Some(3),
        context_id: 9,
        completed: false,
    };
    let initialized = init_task(&platform, draft.clone(), Some(&project))
        .expect("anchor exists")
        .expect("non-empty task");
    assert_eq!(
        initialized.dirty.iter().copied().collect::<Vec<_>>(),
        vec![DirtyField::Id, DirtyField::Name]
    );
    assert!(platform.renames().is_empty(), "init itself never pushes");

    let known = init_task(&platform, initialized.entity.clone(), Some(&project))
        .expect("known id")
        .expect("non-empty task");
    assert!(known.dirty.is_empty());

    let blank = Task {
        name: "   ".to_string(),
        ..draft
    };
    assert!(init_task(&platform, blank, None).expect("no lookup").is_none());
}

#[test]
fn embedded_code_resolves_from_the_store_without_remote_calls() {
    let mut store = seeded_store();
    let stored = seed_task(&mut store, 501, "Buy milk #L7-P3-C9-T501", Some(3));
    let platform = FakePlatform::new();

    let entity = Resolver::new(&mut store, &platform)
        .resolve_topic("@Errands", 9, "Buy milk #L7-P3-C9-T501")
        .expect("embedded code should resolve");

    assert_eq!(entity, Entity::Task(stored));
    assert!(platform.calls().is_empty(), "calls: {:?}", platform.calls());
}

#[test]
fn truncate_leaves_remote_alone_and_resolution_keeps_the_project_segment() {
    let mut store = seeded_store();
    seed_task(&mut store, 501, "Buy milk #L7-P3-C9-T501", Some(3));
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_topic(9, "Buy milk #L7-P3-C9-T501", 501);

    store.truncate_all().expect("truncate");
    assert!(platform.calls().is_empty());
    assert_eq!(platform.topic_titles(9), vec!["Buy milk #L7-P3-C9-T501"]);

    let entity = Resolver::new(&mut store, &platform)
        .resolve_topic("@Errands", 9, "Buy milk #L7-P3-C9-T501")
        .expect("embedded code after truncate");

    let Entity::Task(task) = entity else {
        panic!("expected a task");
    };
    assert_eq!(task.id, 501);
    assert_eq!(task.name, "Buy milk #L7-P3-C9-T501");
    assert_eq!(task.project_id, None);
    assert!(platform.renames().is_empty(), "renames: {:?}", platform.renames());
    assert!(!platform.calls().iter().any(Call::is_write));
    assert_eq!(platform.topic_titles(9), vec!["Buy milk #L7-P3-C9-T501"]);

    // Once the project is cached again the link comes back without a rename.
    store
        .upsert_project_list(&gtd_core::ProjectList {
            id: 7,
            name: "Projects.Home".to_string(),
        })
        .expect("list");
    store
        .upsert_project(&gtd_core::Project {
            id: 3,
            name: "Groceries #L7-P3".to_string(),
            project_list_id: 7,
            completed: false,
        })
        .expect("project");
    let relinked = Resolver::new(&mut store, &platform)
        .resolve_topic("@Errands", 9, "Buy milk #L7-P3-C9-T501")
        .expect("embedded code with the project cached");
    assert_eq!(
        store.get_task(relinked.id()).expect("get").and_then(|row| row.project_id),
        Some(3)
    );
    assert!(platform.renames().is_empty());
}

#[test]
fn zero_task_code_is_not_an_id() {
    let mut store = seeded_store();
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_topic(9, "Buy milk #C9-T0", 501);

    let entity = Resolver::new(&mut store, &platform)
        .resolve_topic("@Errands", 9, "Buy milk #C9-T0")
        .expect("anchor lookup replaces the zero code");

    assert_eq!(entity.id(), 501);
    assert!(store.get_task(0).expect("get").is_none());
    assert_eq!(
        platform.renames(),
        vec![(501, "Buy milk #C9-T501".to_string())]
    );
}

#[test]
fn trusted_attributes_short_circuit_the_cascade() {
    let mut store = seeded_store();
    let mut direct = seeded_store();
    // A remote anchor that would disagree with the caller's id.
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_topic(9, "Call mom", 777);

    let query = TaskQuery {
        id: Some(600),
        name: Some("Call mom".to_string()),
        project_id: None,
        context_id: Some(9),
        completed: false,
    };
    let resolved = Resolver::new(&mut store, &platform)
        .resolve(Attributes::Task(query))
        .expect("trusted task");
    let upserted = seed_task(&mut direct, 600, "Call mom", None);

    assert_eq!(resolved, Entity::Task(upserted.clone()));
    assert_eq!(store.get_task(600).expect("get"), Some(upserted));
    assert!(platform.calls().is_empty());
}

#[test]
fn channel_lookup_falls_back_to_the_platform() {
    let mut store = seeded_store();
    let platform = FakePlatform::new().with_channel(12, "@Phone");
    let mut resolver = Resolver::new(&mut store, &platform);

    let context = resolver
        .resolve_context(&ChannelQuery::named("@Phone"))
        .expect("remote id lookup");
    assert_eq!(context.id, 12);

    let err = resolver
        .resolve_context(&ChannelQuery::named("@Ghost"))
        .expect_err("unknown remote channel");
    assert!(
        matches!(err, GtdError::Remote(RemoteError::Api { .. })),
        "remote failures abort the cascade: {err:?}"
    );

    drop(resolver);
    assert_eq!(
        store.get_context(12).expect("get").map(|row| row.name),
        Some("@Phone".to_string())
    );
    assert_eq!(
        platform.calls(),
        vec![
            Call::ResolveChannelId("@Phone".to_string()),
            Call::ResolveChannelId("@Ghost".to_string()),
        ]
    );
}

#[test]
fn no_applicable_strategy_is_unable_to_find() {
    let mut store = seeded_store();
    let platform = FakePlatform::new();

    let err = Resolver::new(&mut store, &platform)
        .resolve_task(&TaskQuery {
            name: Some("Buy milk".to_string()),
            ..TaskQuery::default()
        })
        .expect_err("no context, no code");
    assert!(matches!(
        err,
        GtdError::UnableToFind {
            kind: EntityKind::Task,
            ..
        }
    ));
    assert!(err.to_string().starts_with("Unable to find task"));
    assert!(platform.calls().is_empty());
}

#[test]
fn empty_topic_is_a_missing_anchor() {
    let mut store = seeded_store();
    let platform = FakePlatform::new()
        .with_channel(9, "@Errands")
        .with_orphan_topic(9, "Lost thought");

    let err = Resolver::new(&mut store, &platform)
        .resolve_task(&TaskQuery {
            name: Some("Lost thought".to_string()),
            context_id: Some(9),
            ..TaskQuery::default()
        })
        .expect_err("no first message");
    assert!(
        matches!(err, GtdError::MissingAnchor { channel_id: 9, ref topic } if topic == "Lost thought")
    );
    assert_eq!(store.count(EntityKind::Task).expect("count"), 0);
}

#[test]
fn drifted_project_title_heals_once() {
    let mut store = seeded_store();
    let platform = FakePlatform::new()
        .with_channel(7, "Projects.Home")
        .with_topic(7, "Groceries #L8-P3", 3);

    let first = Resolver::new(&mut store, &platform)
        .resolve_topic("Projects.Home", 7, "Groceries #L8-P3")
        .expect("embedded code");
    assert_eq!(first.name(), "Groceries #L7-P3");
    assert_eq!(platform.renames(), vec![(3, "Groceries #L7-P3".to_string())]);

    platform.clear_calls();
    let second = Resolver::new(&mut store, &platform)
        .resolve_project(&ProjectQuery {
            name: Some("Groceries #L7-P3".to_string()),
            project_list_id: Some(7),
            ..ProjectQuery::default()
        })
        .expect("canonical title");
    assert_eq!(second.name, "Groceries #L7-P3");
    assert!(platform.renames().is_empty());
}
