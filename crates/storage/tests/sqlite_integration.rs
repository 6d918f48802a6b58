use chrono::Duration;
use placement_core::grading::grade_section;
use placement_core::model::{
    BandScore, BlueprintDraft, BlueprintId, GrammarQuestion, NewAttempt, Question, Section,
    SectionType, SubmittedAnswer, UserId, VocabularyQuestion,
};
use placement_core::time::fixed_now;
use storage::repository::{
    AttemptRepository, BlueprintRepository, PageRequest, Storage, StorageError,
};
use storage::sqlite::SqliteRepository;

fn draft(version: &str) -> BlueprintDraft {
    BlueprintDraft {
        title: "English placement".into(),
        description: Some("Adult learners".into()),
        version: version.into(),
        sections: vec![
            Section::new(
                SectionType::Grammar,
                vec![Question::Grammar(GrammarQuestion {
                    id: "g1".into(),
                    question: "She ___ to school.".into(),
                    correct_answer: "goes".into(),
                    options: vec!["go".into(), "goes".into()],
                })],
                50,
            ),
            Section::new(
                SectionType::Vocabulary,
                vec![Question::Vocabulary(VocabularyQuestion {
                    id: "v1".into(),
                    word: Some("rapid".into()),
                    question: "Synonym?".into(),
                    correct_answer: "fast".into(),
                    options: Vec::new(),
                })],
                50,
            )
            .with_time_limit(300),
        ],
        band_scores: vec![
            BandScore::new(1, 0.0, 49.0, "Beginner - start with basics"),
            BandScore::new(2, 50.0, 100.0, "Intermediate - keep going"),
        ],
    }
}

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

#[tokio::test]
async fn blueprint_roundtrip_and_single_activation() {
    let repo = connect("memdb_blueprints").await;

    let first = repo.insert_new_blueprint(&draft("1.0.0"), fixed_now()).await.unwrap();
    let second = repo.insert_new_blueprint(&draft("2.0.0"), fixed_now()).await.unwrap();
    assert!(repo.active_blueprint().await.unwrap().is_none());

    let stored = repo.get_blueprint(first).await.unwrap().expect("stored");
    assert_eq!(stored.to_draft(), draft("1.0.0"));
    assert!(!stored.is_active());

    repo.activate_blueprint(first).await.unwrap();
    repo.activate_blueprint(second).await.unwrap();
    let active = repo.active_blueprint().await.unwrap().expect("active");
    assert_eq!(active.id(), second);
    assert_eq!(active.version(), "2.0.0");

    let listed = repo.list_blueprints(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed.iter().filter(|b| b.is_active()).count(), 1);

    let err = repo.activate_blueprint(BlueprintId::new(404)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
    assert_eq!(repo.active_blueprint().await.unwrap().unwrap().id(), second);
}

#[tokio::test]
async fn attempts_persist_progress_and_completion() {
    let repo = connect("memdb_attempts").await;
    let id = repo.insert_new_blueprint(&draft("1.0.0"), fixed_now()).await.unwrap();
    let bp = repo.get_blueprint(id).await.unwrap().unwrap();

    let new = NewAttempt::begin(UserId::new(5), &bp, fixed_now()).unwrap();
    let opened = repo.open_or_create_attempt(new.clone()).await.unwrap();
    assert!(opened.created);
    let again = repo.open_or_create_attempt(new).await.unwrap();
    assert!(!again.created);
    assert_eq!(again.attempt.id(), opened.attempt.id());

    let mut attempt = opened.attempt;
    let grammar = bp.section(SectionType::Grammar).unwrap();
    let graded = grade_section(
        grammar,
        &[SubmittedAnswer::new("g1", " Goes ", 12)],
        fixed_now() + Duration::minutes(1),
    );
    let next = attempt.record_section(&bp, graded).unwrap();
    assert_eq!(next, Some(SectionType::Vocabulary));
    let rev = repo.update_attempt(&attempt).await.unwrap();
    attempt.set_revision(rev);

    let stored = repo.get_attempt(attempt.id()).await.unwrap().unwrap();
    assert_eq!(stored.current_section(), Some(SectionType::Vocabulary));
    assert_eq!(stored.section_results().len(), 1);
    assert_eq!(stored.answers().len(), 1);
    assert!(stored.answers()[0].is_correct);

    attempt.complete(&bp, fixed_now() + Duration::minutes(5)).unwrap();
    repo.update_attempt(&attempt).await.unwrap();

    let done = repo.get_attempt(attempt.id()).await.unwrap().unwrap();
    assert!(done.is_completed());
    assert_eq!(done.current_section(), None);
    let outcome = done.outcome().expect("outcome");
    assert_eq!(outcome.total_score, 100.0);
    assert_eq!(outcome.band, 2);
    assert_eq!(outcome.level, "Intermediate");

    // A finished attempt can no longer be written, even with a current revision.
    let err = repo.update_attempt(&done).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    // Completion frees the slot for a fresh attempt.
    let new = NewAttempt::begin(UserId::new(5), &bp, fixed_now() + Duration::hours(1)).unwrap();
    let fresh = repo.open_or_create_attempt(new).await.unwrap();
    assert!(fresh.created);
    assert_ne!(fresh.attempt.id(), attempt.id());
}

#[tokio::test]
async fn stale_attempt_write_conflicts() {
    let repo = connect("memdb_stale").await;
    let id = repo.insert_new_blueprint(&draft("1.0.0"), fixed_now()).await.unwrap();
    let bp = repo.get_blueprint(id).await.unwrap().unwrap();
    let new = NewAttempt::begin(UserId::new(9), &bp, fixed_now()).unwrap();
    let attempt = repo.open_or_create_attempt(new).await.unwrap().attempt;

    let copy = attempt.clone();
    repo.update_attempt(&attempt).await.unwrap();
    let err = repo.update_attempt(&copy).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));
}

#[tokio::test]
async fn attempt_listing_is_paged_newest_first() {
    let storage = Storage::sqlite("sqlite:file:memdb_paging?mode=memory&cache=shared")
        .await
        .expect("storage");
    let mut blueprint_ids = Vec::new();
    for n in 0..3 {
        let id = storage
            .blueprints
            .insert_new_blueprint(&draft(&format!("{n}.0.0")), fixed_now())
            .await
            .unwrap();
        blueprint_ids.push(id);
    }

    for (offset, id) in blueprint_ids.iter().enumerate() {
        let bp = storage.blueprints.get_blueprint(*id).await.unwrap().unwrap();
        let started = fixed_now() + Duration::minutes(i64::try_from(offset).unwrap());
        for user in [1, 2] {
            let new = NewAttempt::begin(UserId::new(user), &bp, started).unwrap();
            storage.attempts.open_or_create_attempt(new).await.unwrap();
        }
    }

    let page = storage
        .attempts
        .list_attempts_for_user(UserId::new(1), PageRequest::new(Some(1), Some(2)))
        .await
        .unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.items.len(), 2);
    assert!(page.items[0].started_at() > page.items[1].started_at());
    assert!(page.items.iter().all(|a| a.user_id() == UserId::new(1)));

    let last = storage
        .attempts
        .list_attempts_for_user(UserId::new(1), PageRequest::new(Some(2), Some(2)))
        .await
        .unwrap();
    assert_eq!(last.items.len(), 1);
    assert_eq!(last.page, 2);

    let all = storage.attempts.list_attempts(PageRequest::default()).await.unwrap();
    assert_eq!(all.total, 6);
    assert_eq!(all.items.len(), 6);
}

#[tokio::test]
async fn partial_unique_indexes_reject_second_rows() {
    let repo = connect("memdb_indexes").await;
    let first = repo.insert_new_blueprint(&draft("1.0.0"), fixed_now()).await.unwrap();
    let second = repo.insert_new_blueprint(&draft("2.0.0"), fixed_now()).await.unwrap();
    repo.activate_blueprint(first).await.unwrap();

    let err = sqlx::query("UPDATE blueprints SET is_active = 1 WHERE id = ?1")
        .bind(i64::try_from(second.value()).unwrap())
        .execute(repo.pool())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"), "{err}");
    assert_eq!(repo.active_blueprint().await.unwrap().unwrap().id(), first);

    let bp = repo.get_blueprint(first).await.unwrap().unwrap();
    let new = NewAttempt::begin(UserId::new(3), &bp, fixed_now()).unwrap();
    let open = repo.open_or_create_attempt(new).await.unwrap().attempt;

    let err = sqlx::query(
        r"
        INSERT INTO attempts (
            user_id, blueprint_id, blueprint_version, started_at,
            answers_json, section_results_json
        )
        VALUES (?1, ?2, '1.0.0', ?3, '[]', '[]')
        ",
    )
    .bind(3_i64)
    .bind(i64::try_from(first.value()).unwrap())
    .bind(fixed_now())
    .execute(repo.pool())
    .await
    .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"), "{err}");

    let page = repo
        .list_attempts_for_user(UserId::new(3), PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id(), open.id());
}
