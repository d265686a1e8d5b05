mod common;

use blog_admin::{
    AppError,
    models::{Comment, Review},
    moderation::{
        self, CommentState, ModerationConfig, ModerationLevel, ReviewAction, SubmitterHistory,
    },
};
use chrono::{Duration, TimeZone, Utc};
use common::{ADMIN_ID, AUTHOR_ID, admin, author};

fn pending_comment() -> Comment {
    Comment::new(
        1,
        10,
        AUTHOR_ID,
        "first!".to_string(),
        Utc::now(),
        CommentState::Pending,
    )
}

// --- ModerationConfig ---

#[test]
fn config_defaults_to_open() {
    let config = ModerationConfig::default();
    assert_eq!(config.get(), ModerationLevel::Open);
    assert_eq!(config.level_value(), 0);
}

#[test]
fn set_level_accepts_the_three_levels() {
    let mut config = ModerationConfig::default();
    for value in 0..=2 {
        config.set(value).unwrap();
        assert_eq!(i64::from(config.level_value()), value);
    }

    config.set(1).unwrap();
    assert_eq!(config.level_value(), 1);
    assert_eq!(config.get(), ModerationLevel::Moderated);
}

#[test]
fn set_level_rejects_out_of_range() {
    let mut config = ModerationConfig::default();
    for value in [3, -1, 42] {
        match config.set(value) {
            Err(AppError::InvalidLevel(rejected)) => assert_eq!(rejected, value),
            other => panic!("expected InvalidLevel for {}, got {:?}", value, other),
        }
    }
    assert_eq!(config.get(), ModerationLevel::Open);
}

#[test]
fn to_response_lists_labels() {
    let response = ModerationConfig::new(ModerationLevel::TrustedAuto).to_response();
    assert_eq!(response.moderation_level, 2);
    assert_eq!(
        response.label,
        "Publish automatically if the user has already been approved"
    );
    assert_eq!(response.choices.len(), 3);
    assert_eq!(response.choices[0].label, "Publish without moderation");
}

// --- initial state ---

#[test]
fn open_level_always_allows() {
    for history in [SubmitterHistory::new(0), SubmitterHistory::new(5)] {
        let state = moderation::initial_state(ModerationLevel::Open, &history);
        assert_eq!(state, CommentState::Allowed(None));
    }
}

#[test]
fn moderated_level_always_holds() {
    for history in [SubmitterHistory::new(0), SubmitterHistory::new(5)] {
        let state = moderation::initial_state(ModerationLevel::Moderated, &history);
        assert_eq!(state, CommentState::Pending);
    }
}

#[test]
fn trusted_auto_depends_on_history() {
    let level = ModerationLevel::TrustedAuto;
    let trusted = moderation::initial_state(level, &SubmitterHistory::new(1));
    assert_eq!(trusted, CommentState::Allowed(None));

    let unknown = moderation::initial_state(level, &SubmitterHistory::new(0));
    assert_eq!(unknown, CommentState::Pending);
}

#[test]
fn initial_state_never_sets_a_reviewer() {
    for level in ModerationLevel::ALL {
        for count in [0, 1] {
            let visibility = moderation::compute_initial_comment_state(
                &ModerationConfig::new(level),
                &author(),
                &SubmitterHistory::new(count),
            );
            assert_eq!(visibility.allowed_by, None);
            assert_eq!(visibility.allowed_at, None);
        }
    }
}

#[test]
fn compute_initial_comment_state_reflects_level() {
    let history = SubmitterHistory::default();
    let open = moderation::compute_initial_comment_state(
        &ModerationConfig::new(ModerationLevel::Open),
        &author(),
        &history,
    );
    assert!(open.allowed);

    let moderated = moderation::compute_initial_comment_state(
        &ModerationConfig::new(ModerationLevel::Moderated),
        &author(),
        &history,
    );
    assert!(!moderated.allowed);
}

// --- review ---

#[test]
fn allow_records_reviewer_and_time() {
    let t1 = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let state = moderation::review(&pending_comment(), ReviewAction::Allow, &admin(), t1);

    let visibility = state.visibility();
    assert!(visibility.allowed);
    assert_eq!(visibility.allowed_by, Some(ADMIN_ID));
    assert_eq!(visibility.allowed_at, Some(t1));
}

#[test]
fn disallow_clears_reviewer() {
    let t1 = Utc::now();
    let mut comment = pending_comment();
    comment.apply(moderation::review(&comment, ReviewAction::Allow, &admin(), t1));
    assert!(comment.is_approved());

    comment.apply(moderation::review(&comment, ReviewAction::Disallow, &admin(), t1));
    let visibility = comment.visibility();
    assert!(!visibility.allowed);
    assert_eq!(visibility.allowed_by, None);
    assert_eq!(visibility.allowed_at, None);
    assert!(comment.review().is_none());
}

#[test]
fn repeated_reviews_are_idempotent() {
    let t1 = Utc::now();
    let t2 = t1 + Duration::minutes(5);
    let mut comment = pending_comment();

    comment.apply(moderation::review(&comment, ReviewAction::Allow, &admin(), t1));
    comment.apply(moderation::review(&comment, ReviewAction::Allow, &admin(), t2));
    assert!(comment.allowed());
    assert_eq!(
        comment.review(),
        Some(Review {
            allowed_by: ADMIN_ID,
            allowed_at: t2
        })
    );

    comment.apply(moderation::review(&comment, ReviewAction::Disallow, &admin(), t1));
    let once = comment.visibility();
    comment.apply(moderation::review(&comment, ReviewAction::Disallow, &admin(), t2));
    assert_eq!(comment.visibility(), once);
}

#[test]
fn only_exact_allow_literal_allows() {
    assert_eq!(ReviewAction::from_literal("allow"), ReviewAction::Allow);
    assert_eq!(ReviewAction::from_literal("disallow"), ReviewAction::Disallow);
    for literal in ["Allow", "ALLOW", "allow ", "", "anything-else"] {
        assert_eq!(ReviewAction::from_literal(literal), ReviewAction::Disallow, "{:?}", literal);
    }
}

#[test]
fn allow_then_unknown_action_scenario() {
    let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
    let reviewer = admin();
    let mut comment = pending_comment();

    comment.apply(moderation::review(
        &comment,
        ReviewAction::from_literal("allow"),
        &reviewer,
        t1,
    ));
    let visibility = comment.visibility();
    assert!(visibility.allowed);
    assert_eq!(visibility.allowed_by, Some(reviewer.id));
    assert_eq!(visibility.allowed_at, Some(t1));

    comment.apply(moderation::review(
        &comment,
        ReviewAction::from_literal("anything-else"),
        &reviewer,
        t1 + Duration::seconds(1),
    ));
    let visibility = comment.visibility();
    assert!(!visibility.allowed);
    assert_eq!(visibility.allowed_by, None);
    assert_eq!(visibility.allowed_at, None);
}
