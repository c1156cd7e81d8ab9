mod support;

use std::fs;

use mdtask::task::{Status, Task};
use mdtask::Error;
use support::TestWorkspace;

fn task_with(title: &str, tags: &[&str]) -> Task {
    let mut task = Task::new(title);
    task.set_tags(tags.iter().copied());
    task
}

fn tags(values: &[&str]) -> Vec<String> {
    values.iter().map(|tag| tag.to_string()).collect()
}

#[test]
fn search_matches_title_case_insensitively() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    repo.create(&mut task_with("Bug Fix", &["mdtask"])).unwrap();
    repo.create(&mut task_with("Feature", &["mdtask"])).unwrap();

    let found = repo.search("bug").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "Bug Fix");
}

#[test]
fn search_covers_description_content_and_tags() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    let mut described = task_with("one", &["mdtask"]);
    described.description = "Needle in description".to_string();
    repo.create(&mut described).unwrap();
    let mut bodied = task_with("two", &["mdtask"]);
    bodied.content = "a NEEDLE in the body".to_string();
    repo.create(&mut bodied).unwrap();
    repo.create(&mut task_with("three", &["mdtask", "area/needle"]))
        .unwrap();
    repo.create(&mut task_with("four", &["mdtask"])).unwrap();

    let titles: Vec<String> = repo
        .search("needle")
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
}

#[test]
fn tag_search_and_or_modes() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    repo.create(&mut task_with("T1", &["mdtask", "project/a", "type/bug"]))
        .unwrap();
    repo.create(&mut task_with("T2", &["mdtask", "project/a", "type/feature"]))
        .unwrap();
    repo.create(&mut task_with("T3", &["mdtask", "project/b", "type/bug"]))
        .unwrap();

    let and = repo
        .search_by_tags(&tags(&["project/a", "type/bug"]), &[], false)
        .unwrap();
    assert_eq!(and.len(), 1);
    assert_eq!(and[0].title, "T1");

    let or = repo
        .search_by_tags(&tags(&["project/a", "type/bug"]), &[], true)
        .unwrap();
    assert_eq!(or.len(), 3);

    let excluded = repo
        .search_by_tags(&tags(&["type/bug"]), &tags(&["PROJECT/B"]), false)
        .unwrap();
    assert_eq!(excluded.len(), 1);
    assert_eq!(excluded[0].title, "T1");
}

#[test]
fn tag_search_skips_archived_tasks() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    repo.create(&mut task_with("live", &["mdtask", "x"])).unwrap();
    repo.create(&mut task_with("gone", &["mdtask", "x", "mdtask/archived"]))
        .unwrap();

    let found = repo.search_by_tags(&tags(&["x"]), &[], false).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].title, "live");

    let everything = repo.search_by_tags(&[], &[], false).unwrap();
    assert_eq!(everything.len(), 1);
}

#[test]
fn create_collision_appends_suffix_to_file_and_id() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    let mut first = task_with("first", &["mdtask"]);
    first.id = "task/20240101120000".to_string();
    let mut second = task_with("second", &["mdtask"]);
    second.id = "task/20240101120000".to_string();

    let first_path = repo.create(&mut first).unwrap();
    let second_path = repo.create(&mut second).unwrap();

    assert_eq!(first_path, ws.tasks_dir().join("20240101120000.md"));
    assert_eq!(second_path, ws.tasks_dir().join("20240101120000_1.md"));
    assert_eq!(second.id, "task/20240101120000_1");

    let (loaded, path) = repo.find_by_id_with_path("task/20240101120000_1").unwrap();
    assert_eq!(loaded.title, "second");
    assert_eq!(path, second_path);
}

#[test]
fn create_fails_once_every_suffix_is_taken() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    ws.write_file("tasks/20240101120000.md", "taken\n");
    for suffix in 1..100 {
        ws.write_file(&format!("tasks/20240101120000_{suffix}.md"), "taken\n");
    }

    let mut task = task_with("crowded", &["mdtask"]);
    task.id = "task/20240101120000".to_string();
    let err = repo.create(&mut task).unwrap_err();

    assert!(matches!(err, Error::OperationFailed(_)), "got {err:?}");
    assert_eq!(task.id, "task/20240101120000");
    assert_eq!(fs::read_dir(ws.tasks_dir()).unwrap().count(), 100);
    assert!(!ws.tasks_dir().join("20240101120000_100.md").exists());
}

#[test]
fn generated_ids_are_distinct() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    let mut ids = Vec::new();
    for title in ["a", "b", "c"] {
        let mut task = task_with(title, &["mdtask"]);
        repo.create(&mut task).unwrap();
        ids.push(task.id);
    }
    assert_eq!(
        ids,
        vec![
            "task/20240101120000",
            "task/20240101120001",
            "task/20240101120002"
        ]
    );
}

#[test]
fn status_and_active_filters() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    repo.create(&mut task_with("todo", &["mdtask", "mdtask/status/TODO"]))
        .unwrap();
    repo.create(&mut task_with("wip", &["mdtask", "mdtask/status/WIP"]))
        .unwrap();
    repo.create(&mut task_with(
        "old wip",
        &["mdtask", "mdtask/status/WIP", "mdtask/archived"],
    ))
    .unwrap();

    assert_eq!(repo.find_by_status(Status::Wip).unwrap().len(), 2);
    assert_eq!(repo.find_by_status(Status::Done).unwrap().len(), 0);

    let active: Vec<String> = repo
        .find_active()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(active, vec!["todo", "wip"]);
}

#[test]
fn multiple_roots_are_all_scanned_and_first_receives_new_tasks() {
    let ws = TestWorkspace::new();
    let other = ws.path().join("shared");
    fs::create_dir_all(&other).unwrap();
    ws.write_file(
        "shared/imported.md",
        "---\nid: task/20230101000000\ntags:\n  - mdtask\ntitle: imported\n---\n",
    );

    let repo = mdtask::repository::TaskRepository::new(vec![ws.tasks_dir(), other.clone()]);
    let path = repo.create(&mut task_with("local", &[])).unwrap();
    assert_eq!(path.parent(), Some(ws.tasks_dir().as_path()));

    let titles: Vec<String> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|task| task.title)
        .collect();
    assert_eq!(titles, vec!["local", "imported"]);
    assert_eq!(
        repo.find_by_id("task/20230101000000").unwrap().title,
        "imported"
    );
}

#[test]
fn hand_written_notes_are_ignored() {
    let ws = TestWorkspace::new();
    ws.write_file("tasks/note.md", "# Meeting notes\n\nno front matter\n");
    ws.write_file(
        "tasks/other.md",
        "---\ntitle: someone else's file\ntags: [journal]\n---\n",
    );
    ws.write_file("tasks/readme.txt", "---\ntags: [mdtask]\n---\n");

    assert!(ws.repository().find_all().unwrap().is_empty());
}

#[test]
fn update_rewrites_file_and_stamps_updated() {
    let ws = TestWorkspace::new();
    let repo = ws.repository();
    let mut task = task_with("draft", &["mdtask"]);
    let path = repo.create(&mut task).unwrap();

    let created = task.created;
    task.title = "final".to_string();
    task.set_status(Status::Done);
    repo.update(&mut task).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("title: final"));
    assert!(text.contains("mdtask/status/DONE"));
    assert!(!text.contains("mdtask/status/TODO"));

    let loaded = repo.find_by_id(&task.id).unwrap();
    assert_eq!(loaded.created, created);
    assert!(loaded.updated >= created);
}
