mod common;

use std::sync::Arc;

use anyhow::Result;
use common::{principal, Harness, StaleReadStore};
use storyloom_runtime::{
    JoinPolicy, MemoryStoryStore, PartType, SessionRepository, StoryError, StoryStore,
};

#[tokio::test]
async fn creator_sees_seed_part() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");

    let id = h.repository().create_session(&ada, "A door appears").await?;
    let view = h.repository().get_session(&id, Some(&ada)).await.expect("creator can read");

    assert_eq!(view.parts.len(), 1);
    assert_eq!(view.parts[0].content, "A door appears");
    assert_eq!(view.parts[0].part_type, PartType::Text);
    assert_eq!(view.parts[0].author_name, "Ada");
    assert!(view.is_creator);
    assert_eq!(view.participants, vec![ada.id]);
    assert!(!view.is_complete);
    Ok(())
}

#[tokio::test]
async fn blank_topic_is_rejected() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let result = h.repository().create_session(&principal("Ada"), "   ").await;
    assert!(matches!(result, Err(StoryError::InvalidInput(_))));
    assert_eq!(h.store.session_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn failed_seed_insert_leaves_no_session() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    h.store.fail_part_inserts(true);

    let result = h.repository().create_session(&ada, "A door appears").await;
    assert!(matches!(result, Err(StoryError::Persistence(_))));
    assert_eq!(h.store.session_count().await, 0);
    assert!(h.repository().list_sessions_for(&ada).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn appends_are_monotonic() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    for n in 0..4 {
        let content = format!("part {}", n);
        assert!(h.repository().append_story_part(&id, &ada, &content, PartType::Text, None).await);
    }
    assert!(
        h.repository()
            .append_story_part(&id, &ada, "a picture", PartType::Image, Some("https://images.test/a.png"))
            .await
    );

    let view = h.repository().get_session(&id, Some(&ada)).await.expect("readable");
    assert_eq!(view.parts.len(), 6);
    assert!(view.parts.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    assert_eq!(view.parts[5].image_url.as_deref(), Some("https://images.test/a.png"));
    Ok(())
}

#[tokio::test]
async fn invalid_parts_are_not_written() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    assert!(!h.repository().append_story_part(&id, &ada, "  ", PartType::Text, None).await);
    assert!(!h.repository().append_story_part(&id, &ada, "pic", PartType::Image, None).await);
    assert!(!h.repository().append_story_part(&id, &ada, "pic", PartType::Image, Some("javascript:alert(1)")).await);
    assert!(!h.repository().append_story_part("missing", &ada, "text", PartType::Text, None).await);

    h.store.fail_part_inserts(true);
    assert!(!h.repository().append_story_part(&id, &ada, "text", PartType::Text, None).await);
    h.store.fail_part_inserts(false);

    let view = h.repository().get_session(&id, Some(&ada)).await.expect("readable");
    assert_eq!(view.parts.len(), 1);
    Ok(())
}

#[tokio::test]
async fn repeated_views_join_exactly_once() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    let first = h.repository().get_session(&id, Some(&bo)).await.expect("auto join");
    assert!(!first.is_creator);
    let second = h.repository().get_session(&id, Some(&bo)).await.expect("participant");

    assert_eq!(second.participants.iter().filter(|p| **p == bo.id).count(), 1);
    assert_eq!(second.participants, vec![ada.id, bo.id]);
    assert!(h.repository().append_story_part(&id, &bo, "Bo writes", PartType::Text, None).await);

    let listed = h.repository().list_sessions_for(&bo).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].participant_count, 2);
    Ok(())
}

#[tokio::test]
async fn concurrent_first_views_join_once() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    let (a, b, c) = tokio::join!(
        h.repository().get_session(&id, Some(&bo)),
        h.repository().get_session(&id, Some(&bo)),
        h.repository().get_session(&id, Some(&bo)),
    );
    for view in [a, b, c] {
        let view = view.expect("auto join");
        assert_eq!(view.participants.iter().filter(|p| **p == bo.id).count(), 1);
    }

    let stored = h.store.find_session(&id).await?.expect("stored");
    assert_eq!(stored.participants, vec![ada.id, bo.id]);
    Ok(())
}

#[tokio::test]
async fn members_only_hides_session_from_strangers() -> Result<()> {
    let h = Harness::new(JoinPolicy::MembersOnly);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    assert!(h.repository().get_session(&id, Some(&bo)).await.is_none());
    assert!(h.repository().get_session(&id, None).await.is_none());
    assert!(!h.repository().append_story_part(&id, &bo, "Bo writes", PartType::Text, None).await);

    let denied = h.repository().load_view(&id, Some(&bo)).await;
    let missing = h.repository().load_view("nope", Some(&bo)).await;
    assert!(denied.as_ref().is_err_and(StoryError::is_concealed));
    assert!(missing.as_ref().is_err_and(StoryError::is_concealed));

    let view = h.repository().get_session(&id, Some(&ada)).await.expect("creator");
    assert_eq!(view.participants, vec![ada.id]);
    Ok(())
}

#[tokio::test]
async fn failed_join_still_returns_session() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    h.store.fail_participant_updates(true);
    let view = h.repository().get_session(&id, Some(&bo)).await.expect("readable despite failed join");
    assert!(view.participants.contains(&bo.id));
    assert_eq!(view.parts.len(), 1);

    h.store.fail_participant_updates(false);
    let persisted = h.repository().get_session(&id, Some(&ada)).await.expect("creator");
    assert_eq!(persisted.participants, vec![ada.id]);
    Ok(())
}

#[tokio::test]
async fn completed_session_is_public_and_frozen() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;
    assert!(h.repository().append_story_part(&id, &ada, "It creaks open.", PartType::Text, None).await);
    let before = h.repository().get_session(&id, Some(&ada)).await.expect("creator");

    assert!(!h.repository().complete_session(&id, &bo).await);
    assert!(h.repository().complete_session(&id, &ada).await);
    assert!(h.repository().complete_session(&id, &ada).await);

    let anonymous = h.repository().get_session(&id, None).await.expect("public once complete");
    assert!(anonymous.is_complete);
    assert_eq!(anonymous.parts, before.parts);
    assert_eq!(anonymous.current_user, None);

    assert!(!h.repository().append_story_part(&id, &ada, "Too late", PartType::Text, None).await);

    let stranger_view = h.repository().get_session(&id, Some(&bo)).await.expect("public");
    assert!(!stranger_view.participants.contains(&bo.id));

    let gallery = h.repository().list_completed_sessions().await?;
    assert_eq!(gallery.len(), 1);
    assert_eq!(gallery[0].parts.len(), 2);
    assert_eq!(gallery[0].cover_image, None);
    Ok(())
}

#[tokio::test]
async fn append_after_concurrent_completion_is_refused() -> Result<()> {
    let store = MemoryStoryStore::new();
    let repository = SessionRepository::new(Arc::new(StaleReadStore(store.clone())), JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let id = repository.create_session(&ada, "A door appears").await?;

    // The write check sees an open session, the completion has already landed.
    assert!(store.mark_complete(&id, ada.id).await?);
    let result = repository
        .try_append_story_part(&id, &ada, "Too late", PartType::Text, None)
        .await;

    assert!(result.as_ref().is_err_and(StoryError::is_concealed));
    assert_eq!(store.list_parts(&id).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn completion_failures_are_reported_by_kind() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");
    let id = h.repository().create_session(&ada, "A door appears").await?;

    let missing = h.repository().try_complete_session("missing", &ada).await;
    assert!(missing.as_ref().is_err_and(StoryError::is_concealed));
    let not_owner = h.repository().try_complete_session(&id, &bo).await;
    assert!(matches!(not_owner, Err(StoryError::Access(_))));

    h.store.fail_completions(true);
    let failed = h.repository().try_complete_session(&id, &ada).await;
    assert!(matches!(failed, Err(StoryError::Persistence(_))));
    assert!(!h.repository().complete_session(&id, &ada).await);

    h.store.fail_completions(false);
    h.repository().try_complete_session(&id, &ada).await?;
    h.repository().try_complete_session(&id, &ada).await?;
    Ok(())
}

#[tokio::test]
async fn session_lists_are_scoped_and_newest_first() -> Result<()> {
    let h = Harness::new(JoinPolicy::AutoJoin);
    let ada = principal("Ada");
    let bo = principal("Bo");

    let first = h.repository().create_session(&ada, "First").await?;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = h.repository().create_session(&ada, "Second").await?;
    let _other = h.repository().create_session(&bo, "Bo's story").await?;

    let listed: Vec<_> = h.repository().list_sessions_for(&ada).await?.into_iter().map(|s| s.id).collect();
    assert_eq!(listed, vec![second, first]);
    assert!(h.repository().list_completed_sessions().await?.is_empty());
    Ok(())
}
