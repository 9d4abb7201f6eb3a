use reviewware::config::ReviewSettings;
use reviewware::models::review::UserId;
use reviewware::submission::{BadRequest, ReviewPayload, Submission, SubmissionError};

mod mocks;
use mocks::calendar_mock::{event_target, setup_test_env, Event};

fn payload(type_tag: &str, pk: &str, rating: &str, content: &str) -> ReviewPayload {
    ReviewPayload {
        type_tag: Some(type_tag.into()),
        primary_key: Some(pk.into()),
        rating: Some(rating.into()),
        title: Some("A night out".into()),
        content: Some(content.into()),
        next: Some("/events/1".into()),
    }
}

fn strict_settings() -> ReviewSettings {
    ReviewSettings {
        banned_words: vec!["heck".into()],
        ..ReviewSettings::default()
    }
}

#[tokio::test]
async fn test_valid_submission_is_saved() {
    let env = setup_test_env(vec![Event::new(1, "Gig")], ReviewSettings::default()).await;

    let outcome = env
        .submitter
        .submit(payload("calendar.event", "1", "4", "Loud."), Some(UserId("ann".into())))
        .await
        .unwrap();

    let Submission::Created { review, next } = outcome else {
        panic!("expected the review to be created");
    };
    assert_eq!(next.as_deref(), Some("/events/1"));
    assert_eq!(review.rating, 4);
    assert_eq!(review.user_id, Some(UserId("ann".into())));
    assert_eq!(review.target, event_target(1));

    let stored = env.store.for_target(&event_target(1)).fetch().await.unwrap();
    assert_eq!(stored, vec![review]);
}

#[tokio::test]
async fn test_banned_word_rejected_then_allowed() {
    let env = setup_test_env(vec![Event::new(1, "Gig")], strict_settings()).await;
    let outcome = env
        .submitter
        .submit(payload("calendar.event", "1", "2", "What the heck"), None)
        .await
        .unwrap();

    let Submission::Rejected { form, template_names } = outcome else {
        panic!("expected a rejection");
    };
    assert_eq!(
        form.field_errors("content"),
        ["The word \"h--k\" is not allowed here.".to_string()]
    );
    assert_eq!(template_names[0], "reviews/calendar_event_preview.html");
    assert_eq!(env.store.count_for_target(&event_target(1)).await.unwrap(), 0);

    let lenient = setup_test_env(
        vec![Event::new(1, "Gig")],
        ReviewSettings {
            allow_profanities: true,
            ..strict_settings()
        },
    )
    .await;
    let outcome = lenient
        .submitter
        .submit(payload("calendar.event", "1", "2", "What the heck"), None)
        .await
        .unwrap();
    assert!(matches!(outcome, Submission::Created { .. }));
}

#[tokio::test]
async fn test_bad_requests() {
    let env = setup_test_env(vec![Event::new(1, "Gig")], ReviewSettings::default()).await;
    let bad = |outcome: Result<Submission, SubmissionError>| match outcome {
        Err(SubmissionError::BadRequest(why)) => why,
        other => panic!("expected a bad request, got {other:?}"),
    };

    let missing = ReviewPayload {
        type_tag: None,
        ..payload("calendar.event", "1", "3", "ok")
    };
    assert_eq!(bad(env.submitter.submit(missing, None).await), BadRequest::MissingTarget);

    assert_eq!(
        bad(env.submitter.submit(payload("calendar", "1", "3", "ok"), None).await),
        BadRequest::InvalidType("calendar".into())
    );
    assert!(matches!(
        bad(env.submitter.submit(payload("shop.product", "1", "3", "ok"), None).await),
        BadRequest::UnknownType(_)
    ));
    assert!(matches!(
        bad(env.submitter.submit(payload("calendar.event", "99", "3", "ok"), None).await),
        BadRequest::ObjectNotFound { .. }
    ));
    assert_eq!(env.db.count_reviews_for_target(&event_target(1)).await.unwrap(), 0);
}

#[tokio::test]
async fn test_concurrent_submissions_all_persist_newest_first() {
    let env = setup_test_env(vec![Event::new(1, "Gig")], ReviewSettings::default()).await;

    let submissions = (1..=5).map(|rating| {
        let submitter = env.submitter.clone();
        async move {
            submitter
                .submit(payload("calendar.event", "1", &rating.to_string(), "Fine."), None)
                .await
                .unwrap()
        }
    });
    let outcomes = futures::future::join_all(submissions).await;
    assert!(outcomes.iter().all(|o| matches!(o, Submission::Created { .. })));

    let reviews = env.store.for_target(&event_target(1)).fetch().await.unwrap();
    assert_eq!(reviews.len(), 5);
    assert!(reviews
        .windows(2)
        .all(|pair| pair[0].created_at() >= pair[1].created_at()));
}

#[tokio::test]
async fn test_blank_form_binds_only_resolvable_targets() {
    let env = setup_test_env(vec![Event::new(1, "Gig")], ReviewSettings::default()).await;

    let bound = env
        .submitter
        .blank_form(&payload("calendar.event", "1", "", ""))
        .await
        .unwrap();
    assert_eq!(bound.target(), Some(&event_target(1)));
    assert!(!bound.is_bound());

    let unbound = env.submitter.blank_form(&ReviewPayload::default()).await.unwrap();
    assert!(unbound.target().is_none());
}
