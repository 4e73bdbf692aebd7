use super::*;

use crate::selection::{EditorPhase, Point};

fn scene(number: i64) -> Scene {
    Scene {
        scene_number: number,
        title: format!("Scene {number}"),
        narrative_script: format!("beat {number}"),
        visual_prompt: format!("visual {number}"),
        camera_shot: "Wide Shot".into(),
    }
}

fn session_with_scenes(count: i64) -> StoryboardSession {
    let mut session = StoryboardSession::default();
    session.replace_storyboard(StoryboardData {
        title: "Lone Astronaut".into(),
        art_style: "dusty 35mm".into(),
        scenes: (1..=count).map(scene).collect(),
    });
    session
}

fn url(n: usize) -> String {
    format!("data:image/png;base64,img{n}")
}

#[test]
fn deleting_scene_rekeys_later_images() {
    let mut session = session_with_scenes(5);
    for index in [0usize, 1, 2, 4] {
        session.mark_image_ready(index, index as i64 + 1, url(index));
    }

    assert!(session.delete_scene(2));

    assert_eq!(session.scene_count(), 4);
    assert_eq!(session.image(0).map(|i| i.image_url.clone()), Some(url(0)));
    assert_eq!(session.image(1).map(|i| i.image_url.clone()), Some(url(1)));
    assert_eq!(session.image(2), None);
    assert_eq!(session.image(3).map(|i| i.image_url.clone()), Some(url(4)));
    assert_eq!(session.image(4), None);
    assert_eq!(session.images().len(), 3);
    assert!(session.images().keys().all(|k| *k < session.scene_count()));
}

#[test]
fn deleting_every_position_keeps_alignment() {
    for k in 0..4usize {
        let mut session = session_with_scenes(4);
        for index in 0..4usize {
            session.mark_image_ready(index, index as i64 + 1, url(index));
        }
        session.delete_scene(k);
        for j in 0..4usize {
            match j.cmp(&k) {
                Ordering::Less => {
                    assert_eq!(session.image(j).map(|i| i.image_url.clone()), Some(url(j)))
                }
                Ordering::Greater => assert_eq!(
                    session.image(j - 1).map(|i| i.image_url.clone()),
                    Some(url(j))
                ),
                Ordering::Equal => {}
            }
        }
        assert_eq!(session.image(3), None);
    }
}

#[test]
fn deleting_out_of_range_is_a_no_op() {
    let mut session = session_with_scenes(2);
    session.mark_image_ready(1, 2, url(1));
    assert!(!session.delete_scene(2));
    assert_eq!(session.scene_count(), 2);
    assert!(session.image(1).is_some());

    let mut empty = StoryboardSession::default();
    assert!(!empty.delete_scene(0));
}

#[test]
fn deleting_edited_scene_resets_editor() {
    let mut session = session_with_scenes(3);
    session.selector_mut().toggle_editing(1);
    session.delete_scene(1);
    assert_eq!(session.selector().phase(), EditorPhase::Idle);

    session.selector_mut().toggle_editing(1);
    session.delete_scene(0);
    assert_eq!(session.selector().editing_index(), Some(0));
}

#[test]
fn reference_insertion_is_idempotent() {
    let mut session = StoryboardSession::default();
    assert!(session.add_reference_image("data:image/png;base64,AAA"));
    let once = session.reference_images().len();
    assert!(!session.add_reference_image("data:image/png;base64,AAA"));
    assert_eq!(session.reference_images().len(), once);
}

#[test]
fn removing_reference_by_index() {
    let mut session = StoryboardSession::default();
    session.add_reference_image("a");
    session.add_reference_image("b");
    assert_eq!(session.remove_reference_image(0), Some("a".to_string()));
    assert_eq!(session.remove_reference_image(5), None);
    assert_eq!(session.reference_images(), ["b".to_string()]);
}

#[test]
fn promoting_generated_image_adds_once() {
    let mut session = session_with_scenes(1);
    session.add_reference_image("data:image/png;base64,ref1");
    session.add_reference_image("data:image/png;base64,ref2");
    session.mark_image_ready(0, 1, url(0));

    assert!(session.promote_generated_image(&url(0)));
    assert_eq!(session.reference_images().len(), 3);
    assert!(!session.promote_generated_image(&url(0)));
    assert_eq!(session.reference_images().len(), 3);
    assert!(!session.promote_generated_image(""));
}

#[test]
fn update_scene_field_touches_only_that_field() {
    let mut session = session_with_scenes(2);
    assert!(session.update_scene_field(1, SceneField::VisualPrompt, "a red sky"));
    let edited = session.scene(1).expect("scene");
    assert_eq!(edited.visual_prompt, "a red sky");
    assert_eq!(edited.title, "Scene 2");
    assert_eq!(session.scene(0), Some(&scene(1)));
    assert!(!session.update_scene_field(9, SceneField::Title, "x"));
}

#[test]
fn art_style_needs_a_storyboard() {
    let mut empty = StoryboardSession::default();
    assert!(!empty.set_art_style("watercolor"));
    assert!(empty.storyboard().is_none());

    let mut session = session_with_scenes(2);
    assert!(session.set_art_style("charcoal, high contrast"));
    let storyboard = session.storyboard().expect("storyboard");
    assert_eq!(storyboard.art_style, "charcoal, high contrast");
    assert_eq!(storyboard.scenes.len(), 2);
}

#[test]
fn new_script_clears_storyboard_and_images_but_keeps_references() {
    let mut session = session_with_scenes(2);
    session.mark_image_ready(0, 1, url(0));
    session.add_reference_image("ref");

    session.begin_new_script();

    assert!(session.storyboard().is_none());
    assert!(session.images().is_empty());
    assert_eq!(session.reference_images(), ["ref".to_string()]);
}

#[test]
fn append_scenes_requires_storyboard() {
    let mut empty = StoryboardSession::default();
    assert!(!empty.append_scenes(vec![scene(1)]));

    let mut session = session_with_scenes(3);
    session.mark_image_ready(2, 3, url(2));
    assert!(session.append_scenes(vec![scene(4), scene(5)]));
    assert_eq!(session.scene_count(), 5);
    assert_eq!(session.image(2).map(|i| i.image_url.clone()), Some(url(2)));
}

#[test]
fn image_transitions_distinguish_failed_from_absent() {
    let mut session = session_with_scenes(3);
    session.mark_image_loading(2, 3);
    assert!(session.image(2).expect("loading").is_loading);

    session.mark_image_failed(2, 3);
    let failed = session.image(2).expect("failed");
    assert!(!failed.is_loading);
    assert_eq!(failed.image_url, "");
    assert_eq!(failed.error.as_deref(), Some("Failed to generate"));
    assert!(session.image(1).is_none());
    assert!(!session.has_any_images());
}

#[test]
fn replace_payload_keeps_scene_number() {
    let mut session = session_with_scenes(2);
    session.mark_image_ready(1, 7, url(1));
    session.replace_image_payload(1, url(9));
    let image = session.image(1).expect("image");
    assert_eq!(image.scene_number, 7);
    assert_eq!(image.image_url, url(9));
    assert!(session.has_any_images());
}

#[test]
fn replacing_storyboard_resets_editor() {
    let mut session = session_with_scenes(2);
    session.selector_mut().toggle_editing(0);
    session
        .selector_mut()
        .pointer_down(0, Point::new(1.0, 1.0));
    session.replace_storyboard(StoryboardData {
        title: "New".into(),
        art_style: String::new(),
        scenes: vec![],
    });
    assert_eq!(session.selector().phase(), EditorPhase::Idle);
}

#[test]
fn language_toggles_between_locales() {
    let mut session = StoryboardSession::new(Language::En, ImageResolution::TwoK);
    assert_eq!(session.toggle_language(), Language::Zh);
    assert_eq!(session.toggle_language(), Language::En);
    assert_eq!(session.resolution(), ImageResolution::TwoK);
}

#[test]
fn ticket_follows_its_scene_across_deletion() {
    let mut session = session_with_scenes(4);
    let later = session.issue_ticket(3, RequestKind::Image);
    let edit = session.issue_ticket(2, RequestKind::Edit);

    assert!(session.delete_scene(0));

    assert_eq!(session.redeem_ticket(later), Some(2));
    assert_eq!(session.redeem_ticket(edit), Some(1));
    assert_eq!(session.redeem_ticket(later), None);
}

#[test]
fn ticket_is_dropped_with_its_scene_or_storyboard() {
    let mut session = session_with_scenes(3);
    let deleted = session.issue_ticket(1, RequestKind::Image);
    let kept = session.issue_ticket(0, RequestKind::Image);
    session.delete_scene(1);
    assert_eq!(session.redeem_ticket(deleted), None);

    session.replace_storyboard(StoryboardData {
        title: "Other".into(),
        art_style: String::new(),
        scenes: vec![scene(1)],
    });
    assert_eq!(session.redeem_ticket(kept), None);

    let pending = session.issue_ticket(0, RequestKind::Edit);
    session.begin_new_script();
    assert_eq!(session.redeem_ticket(pending), None);
}

#[test]
fn newer_ticket_supersedes_same_kind_only() {
    let mut session = session_with_scenes(1);
    let first = session.issue_ticket(0, RequestKind::Image);
    let edit = session.issue_ticket(0, RequestKind::Edit);
    let second = session.issue_ticket(0, RequestKind::Image);

    assert_eq!(session.redeem_ticket(first), None);
    assert_eq!(session.redeem_ticket(edit), Some(0));
    assert_eq!(session.redeem_ticket(second), Some(0));
}
