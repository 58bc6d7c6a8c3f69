use chrono::NaiveDate;
use roadmaps::db::{Database, VersionConflict};
use roadmaps::models::*;
use roadmaps::repository::RoadmapRepository;
use speculate2::speculate;
use uuid::Uuid;

fn range() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
    )
    .unwrap()
}

fn new_roadmap(db: &Database, name: &str, manager: Uuid) -> Roadmap {
    let roadmap = Roadmap::create(
        db.next_roadmap_key().expect("Failed to allocate key"),
        &UpsertRoadmapInput {
            name: name.to_string(),
            description: None,
            date_range: range(),
            visibility: Visibility::Private,
            manager_ids: vec![manager],
        },
    )
    .expect("Failed to create roadmap");
    db.save_roadmap(&roadmap, None).expect("Failed to save roadmap");
    roadmap
}

fn activity(name: &str, parent_id: Option<Uuid>) -> UpsertActivityInput {
    UpsertActivityInput {
        parent_id,
        name: name.to_string(),
        description: None,
        color: None,
        date_range: range(),
    }
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let manager = Uuid::new_v4();
    }

    describe "save_roadmap" {
        it "inserts new roadmaps at version 1" {
            let roadmap = new_roadmap(&db, "Platform", manager);

            let loaded = db.get_roadmap(roadmap.id()).expect("Query failed").expect("Roadmap missing");
            assert_eq!(loaded.version, 1);
            assert_eq!(loaded.roadmap, roadmap);
        }

        it "round-trips the whole item tree" {
            let mut roadmap = new_roadmap(&db, "Platform", manager);
            let parent = roadmap.create_activity(activity("Auth", None), manager).unwrap();
            roadmap.create_activity(activity("SSO", Some(parent.id())), manager).unwrap();
            roadmap.create_milestone(UpsertMilestoneInput {
                parent_id: Some(parent.id()),
                name: "Launch".to_string(),
                description: Some("Public launch".to_string()),
                color: Some("#ff0000".to_string()),
                date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            }, manager).unwrap();

            db.save_roadmap(&roadmap, Some(1)).expect("Failed to save");

            let loaded = db.get_roadmap(roadmap.id()).expect("Query failed").expect("Roadmap missing");
            assert_eq!(loaded.roadmap, roadmap);
            assert_eq!(loaded.roadmap.item_count(), 3);
            assert_eq!(loaded.roadmap.children(Some(parent.id())).len(), 2);
        }

        it "increments the version on each save" {
            let mut roadmap = new_roadmap(&db, "Platform", manager);

            roadmap.create_activity(activity("A", None), manager).unwrap();
            assert_eq!(db.save_roadmap(&roadmap, Some(1)).unwrap(), 2);

            roadmap.create_activity(activity("B", None), manager).unwrap();
            assert_eq!(db.save_roadmap(&roadmap, Some(2)).unwrap(), 3);
        }

        it "rejects a save from a stale version" {
            let roadmap = new_roadmap(&db, "Platform", manager);

            let mut first = db.get_roadmap(roadmap.id()).unwrap().unwrap();
            let mut second = db.get_roadmap(roadmap.id()).unwrap().unwrap();

            first.roadmap.create_activity(activity("First", None), manager).unwrap();
            db.save_roadmap(&first.roadmap, Some(first.version)).expect("First save failed");

            second.roadmap.create_activity(activity("Second", None), manager).unwrap();
            let err = db.save_roadmap(&second.roadmap, Some(second.version)).unwrap_err();
            let conflict = err.downcast_ref::<VersionConflict>().expect("Expected a version conflict");
            assert_eq!(conflict.roadmap_id, roadmap.id());
            assert_eq!(conflict.expected_version, 1);

            let stored = db.get_roadmap(roadmap.id()).unwrap().unwrap();
            assert_eq!(stored.version, 2);
            assert_eq!(stored.roadmap.root_activities()[0].name(), "First");
        }

        it "rejects a duplicate insert" {
            let roadmap = new_roadmap(&db, "Platform", manager);
            assert!(db.save_roadmap(&roadmap, None).is_err());
        }
    }

    describe "get_roadmap" {
        it "returns None for a non-existent roadmap" {
            assert!(db.get_roadmap(Uuid::new_v4()).expect("Query failed").is_none());
        }

        it "finds a roadmap by key" {
            new_roadmap(&db, "First", manager);
            let second = new_roadmap(&db, "Second", manager);

            let found = db.get_roadmap_by_key(second.key()).expect("Query failed").expect("Missing");
            assert_eq!(found.roadmap.id(), second.id());
            assert!(db.get_roadmap_by_key(99).expect("Query failed").is_none());
        }
    }

    describe "next_roadmap_key" {
        it "starts at 1 and follows the highest key" {
            assert_eq!(db.next_roadmap_key().unwrap(), 1);
            new_roadmap(&db, "First", manager);
            new_roadmap(&db, "Second", manager);
            assert_eq!(db.next_roadmap_key().unwrap(), 3);
        }
    }

    describe "list_roadmaps" {
        it "returns empty list when no roadmaps exist" {
            assert!(db.list_roadmaps().expect("Query failed").is_empty());
        }

        it "returns all roadmaps ordered by key" {
            new_roadmap(&db, "Zebra", manager);
            new_roadmap(&db, "Alpha", manager);

            let roadmaps = db.list_roadmaps().expect("Query failed");
            let names: Vec<_> = roadmaps.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["Zebra", "Alpha"]);
            assert_eq!(roadmaps[0].key, 1);
            assert_eq!(roadmaps[0].version, 1);
        }

        it "reflects renames after save" {
            let mut roadmap = new_roadmap(&db, "Draft", manager);
            roadmap.update(&UpsertRoadmapInput {
                name: "Final".to_string(),
                description: None,
                date_range: range(),
                visibility: Visibility::Public,
                manager_ids: vec![manager],
            }, manager).unwrap();
            db.save_roadmap(&roadmap, Some(1)).unwrap();

            let summary = &db.list_roadmaps().unwrap()[0];
            assert_eq!(summary.name, "Final");
            assert_eq!(summary.visibility, Visibility::Public);
            assert_eq!(summary.version, 2);
        }
    }

    describe "list_managed_roadmaps" {
        it "returns only roadmaps the employee manages" {
            let other = Uuid::new_v4();
            new_roadmap(&db, "Mine", manager);
            new_roadmap(&db, "Theirs", other);

            let mine = db.list_managed_roadmaps(manager).expect("Query failed");
            assert_eq!(mine.len(), 1);
            assert_eq!(mine[0].name, "Mine");
        }

        it "tracks manager changes" {
            let other = Uuid::new_v4();
            let mut roadmap = new_roadmap(&db, "Shared", manager);
            roadmap.add_manager(other, manager).unwrap();
            db.save_roadmap(&roadmap, Some(1)).unwrap();
            assert_eq!(db.list_managed_roadmaps(other).unwrap().len(), 1);

            roadmap.remove_manager(other, manager).unwrap();
            db.save_roadmap(&roadmap, Some(2)).unwrap();
            assert!(db.list_managed_roadmaps(other).unwrap().is_empty());
        }
    }

    describe "delete_roadmap" {
        it "deletes the roadmap and its manager rows" {
            let roadmap = new_roadmap(&db, "Doomed", manager);

            assert!(db.delete_roadmap(roadmap.id()).expect("Delete failed"));
            assert!(db.get_roadmap(roadmap.id()).unwrap().is_none());
            assert!(db.list_managed_roadmaps(manager).unwrap().is_empty());
        }

        it "returns false for a non-existent roadmap" {
            assert!(!db.delete_roadmap(Uuid::new_v4()).expect("Delete failed"));
        }
    }

    describe "repository" {
        it "loads and saves through the trait" {
            let repo: &dyn RoadmapRepository<Error = anyhow::Error> = &db;
            let roadmap = Roadmap::create(repo.next_key().unwrap(), &UpsertRoadmapInput {
                name: "Via trait".to_string(),
                description: None,
                date_range: range(),
                visibility: Visibility::Private,
                manager_ids: vec![manager],
            }).unwrap();

            assert_eq!(repo.save(&roadmap, None).unwrap(), 1);
            let loaded = repo.load(roadmap.id()).unwrap().unwrap();
            assert_eq!(loaded.roadmap.name(), "Via trait");
        }
    }

    describe "integer columns" {
        it "fails to read a version that does not fit instead of wrapping it" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("roadmaps.db");
            let db = Database::open(path.clone()).expect("Failed to open");
            db.migrate().expect("Failed to migrate");
            let roadmap = new_roadmap(&db, "Corrupted", manager);

            let raw = rusqlite::Connection::open(&path).expect("Failed to open raw connection");
            raw.execute(
                "UPDATE roadmaps SET version = -1, key = 5000000000 WHERE id = ?",
                [roadmap.id().to_string()],
            )
            .expect("Failed to corrupt row");

            assert!(db.get_roadmap(roadmap.id()).is_err());
            assert!(db.list_roadmaps().is_err());
        }

        it "rejects an expected version beyond the column range" {
            let roadmap = new_roadmap(&db, "Platform", manager);
            let err = db.save_roadmap(&roadmap, Some(u64::MAX)).unwrap_err();
            assert!(err.downcast_ref::<VersionConflict>().is_none());
            assert_eq!(db.get_roadmap(roadmap.id()).unwrap().unwrap().version, 1);
        }
    }

    describe "file database" {
        it "persists across connections" {
            let dir = tempfile::tempdir().expect("Failed to create temp dir");
            let path = dir.path().join("nested").join("roadmaps.db");

            let id = {
                let db = Database::open(path.clone()).expect("Failed to open");
                db.migrate().expect("Failed to migrate");
                let mut roadmap = new_roadmap(&db, "On disk", manager);
                roadmap.create_activity(activity("Persisted", None), manager).unwrap();
                db.save_roadmap(&roadmap, Some(1)).unwrap();
                roadmap.id()
            };

            let reopened = Database::open(path).expect("Failed to reopen");
            reopened.migrate().expect("Migrations should be idempotent");
            let loaded = reopened.get_roadmap(id).unwrap().unwrap();
            assert_eq!(loaded.version, 2);
            assert_eq!(loaded.roadmap.root_activities()[0].name(), "Persisted");
        }
    }
}
