mod common;

use anyhow::Result;

use common::{document, harness, harness_with, registrant, sender, FakeSource, FakeStorage};
use debo::catalog::EditableField;
use debo::commands::Command;
use debo::conversation::{Engine, Input, Keyboard, Sender, Step, Transition};
use debo::dialogue::DialogueState;
use debo::registrant::{Column, ColumnMap, Registrant, LOCATION_NOT_SHARED};
use debo::upload::share_link;

fn text(value: &str) -> Input {
    Input::Text(value.to_string())
}

fn keys(transition: &Transition) -> Vec<&'static str> {
    transition.replies.iter().map(|r| r.key).collect()
}

/// Feed inputs one after the other, returning every transition
async fn run(engine: &Engine, sender: &Sender, inputs: Vec<Input>) -> Vec<Transition> {
    let mut state = DialogueState::Idle;
    let mut transitions = Vec::new();
    for input in inputs {
        let transition = engine.handle(sender, state.clone(), input).await;
        state = transition.state().cloned().unwrap_or_default();
        transitions.push(transition);
    }
    transitions
}

fn cell(row: &[String], column: Column) -> String {
    ColumnMap::standard().cell(row, column).to_string()
}

#[tokio::test]
async fn test_full_registration_with_skips() -> Result<()> {
    let h = harness(&[]);
    let user = sender(1001);

    let transitions = run(
        &h.engine,
        &user,
        vec![
            Input::Command(Command::Register),
            text("Abebe Kebede"),
            text("Civil Engineer"),
            text("+251911123456"),
            text("Skip / አሳልፍ"),
            text("Addis Ababa, Bole, 03"),
            text("Skip እለፍ⏭️"),
            text("Skip እለፍ⏭️"),
        ],
    )
    .await;

    assert_eq!(keys(&transitions[0]), vec!["register-prompt-full-name"]);
    assert_eq!(keys(&transitions[3]), vec!["register-prompt-location"]);
    assert_eq!(transitions[3].replies[0].keyboard, Keyboard::ShareLocation);
    assert_eq!(transitions[5].replies[0].keyboard, Keyboard::SkipDone);

    let last = transitions.last().unwrap();
    assert_eq!(last.step, Step::End);
    assert_eq!(keys(last), vec!["registration-complete"]);
    assert_eq!(last.replies[0].keyboard, Keyboard::MainMenu);

    let rows = h.store.snapshot().await;
    assert_eq!(rows.len(), 1);
    let row = &rows[0];
    assert_eq!(cell(row, Column::UserId), "1001");
    assert_eq!(cell(row, Column::Username), "user1001");
    assert_eq!(cell(row, Column::FullName), "Abebe Kebede");
    assert_eq!(cell(row, Column::Profession), "Civil Engineer");
    assert_eq!(cell(row, Column::Phone), "+251911123456");
    assert_eq!(cell(row, Column::Location), LOCATION_NOT_SHARED);
    assert_eq!(cell(row, Column::RegionCityWoreda), "Addis Ababa, Bole, 03");
    assert_eq!(cell(row, Column::Testimonials), "");
    assert_eq!(cell(row, Column::EducationalDocs), "");
    assert_eq!(h.store.write_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_finished_registration_reads_back_as_submitted() -> Result<()> {
    let source = FakeSource {
        failing: ["blurry".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let h = harness_with(&[], source, FakeStorage::default());
    let user = sender(21);

    let transitions = run(
        &h.engine,
        &user,
        vec![
            Input::Command(Command::Register),
            text("Hana Tesfaye"),
            text("Nurse"),
            text("+251922334455"),
            Input::Location {
                latitude: 9.03,
                longitude: 38.74,
            },
            text("Adama, 04"),
            Input::File(document("reference")),
            Input::File(document("blurry")),
            Input::File(document("award")),
            text("Done ጨርሻያለው✅ "),
            Input::File(document("degree")),
            Input::File(document("license")),
            text("done"),
        ],
    )
    .await;
    assert_eq!(keys(transitions.last().unwrap()), vec!["registration-complete"]);

    let (_, stored) = h.engine.registry().find_by_user_id(21).await.unwrap();
    let expected = Registrant {
        user_id: 21,
        username: "user21".to_string(),
        full_name: "Hana Tesfaye".to_string(),
        profession: "Nurse".to_string(),
        phone: "+251922334455".to_string(),
        location: "9.03, 38.74".to_string(),
        region_city_woreda: "Adama, 04".to_string(),
        comment: String::new(),
        testimonial_links: vec![share_link("drive1"), share_link("drive2")],
        education_links: vec![share_link("drive3"), share_link("drive4")],
    };
    assert_eq!(stored, expected);
    Ok(())
}

#[tokio::test]
async fn test_shared_location_is_stored_as_coordinates() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::Location,
        draft: Default::default(),
    };

    let transition = h
        .engine
        .handle(
            &sender(5),
            state,
            Input::Location {
                latitude: 9.03,
                longitude: 38.74,
            },
        )
        .await;

    match transition.state() {
        Some(DialogueState::Registering { field, draft }) => {
            assert_eq!(*field, EditableField::RegionCityWoreda);
            assert_eq!(draft.location, "9.03, 38.74");
        }
        other => panic!("unexpected state {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn test_invalid_phone_is_asked_again() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::Phone,
        draft: Default::default(),
    };

    let transition = h.engine.handle(&sender(5), state.clone(), text("12345")).await;
    assert_eq!(keys(&transition), vec!["invalid-phone"]);
    assert_eq!(transition.state(), Some(&state));

    let transition = h.engine.handle(&sender(5), state, text("0911 000 000")).await;
    assert!(matches!(
        transition.state(),
        Some(DialogueState::Registering {
            field: EditableField::Location,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_links_follow_successful_uploads_in_order() -> Result<()> {
    let source = FakeSource {
        failing: ["broken".to_string()].into_iter().collect(),
        ..Default::default()
    };
    let h = harness_with(&[], source, FakeStorage::default());
    let user = sender(9);
    let mut state = DialogueState::Registering {
        field: EditableField::Testimonials,
        draft: Default::default(),
    };

    let mut reply_keys = Vec::new();
    for file in ["first", "broken", "second"] {
        let transition = h.engine.handle(&user, state, Input::File(document(file))).await;
        reply_keys.extend(keys(&transition));
        state = transition.state().cloned().unwrap();
    }
    assert_eq!(reply_keys, vec!["file-received", "upload-failed", "file-received"]);

    match &state {
        DialogueState::Registering { field, draft } => {
            assert_eq!(*field, EditableField::Testimonials);
            assert_eq!(draft.testimonial_links, vec![share_link("drive1"), share_link("drive2")]);
        }
        other => panic!("unexpected state {other:?}"),
    }

    let stored = h.storage.stored.lock().unwrap().clone();
    assert_eq!(stored[0], ("testimonial-folder".to_string(), "first.pdf".to_string()));
    Ok(())
}

#[tokio::test]
async fn test_done_without_files_notifies_and_moves_on() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::Testimonials,
        draft: Default::default(),
    };

    let transition = h.engine.handle(&sender(3), state, text("Done ጨርሻያለው✅ ")).await;
    assert_eq!(keys(&transition), vec!["no-files-uploaded", "register-prompt-education"]);
    assert!(matches!(
        transition.state(),
        Some(DialogueState::Registering {
            field: EditableField::EducationalDocs,
            ..
        })
    ));
    Ok(())
}

#[tokio::test]
async fn test_other_text_in_file_loop_reprompts() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::EducationalDocs,
        draft: Default::default(),
    };

    let transition = h.engine.handle(&sender(3), state.clone(), text("hello")).await;
    assert_eq!(keys(&transition), vec!["upload-or-use-buttons"]);
    assert_eq!(transition.state(), Some(&state));
    Ok(())
}

#[tokio::test]
async fn test_failed_save_ends_the_session() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::EducationalDocs,
        draft: Default::default(),
    };
    h.store.set_unavailable(true);

    let transition = h.engine.handle(&sender(3), state, text("skip")).await;
    assert_eq!(transition.step, Step::End);
    assert_eq!(keys(&transition), vec!["registration-failed"]);
    assert_eq!(h.store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_second_registration_is_refused_without_writes() -> Result<()> {
    let h = harness(&[registrant(42, "Sara Tesfaye")]);

    let transition = h
        .engine
        .handle(&sender(42), DialogueState::Idle, Input::Command(Command::Register))
        .await;

    assert_eq!(transition.step, Step::End);
    assert_eq!(keys(&transition), vec!["already-registered"]);
    assert_eq!(h.store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_commands_during_a_conversation() -> Result<()> {
    let h = harness(&[]);
    let state = DialogueState::Registering {
        field: EditableField::Profession,
        draft: Default::default(),
    };

    let transition = h
        .engine
        .handle(&sender(3), state.clone(), Input::Command(Command::Profile))
        .await;
    assert_eq!(keys(&transition), vec!["finish-or-cancel"]);
    assert_eq!(transition.state(), Some(&state));

    let transition = h.engine.handle(&sender(3), state, Input::Command(Command::Cancel)).await;
    assert_eq!(transition.step, Step::End);
    assert_eq!(keys(&transition), vec!["cancelled"]);
    Ok(())
}

#[tokio::test]
async fn test_edit_phone_writes_one_cell() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede"), registrant(8, "Sara Tesfaye")]);
    let before = h.store.snapshot().await;

    let transitions = run(
        &h.engine,
        &sender(8),
        vec![
            Input::Command(Command::EditProfile),
            Input::Callback("edit_phone".to_string()),
            text("0911000000"),
        ],
    )
    .await;

    assert_eq!(transitions[0].replies[0].keyboard, Keyboard::EditMenu);
    assert_eq!(keys(&transitions[1]), vec!["edit-prompt-phone"]);
    assert_eq!(keys(&transitions[2]), vec!["field-updated"]);
    assert_eq!(transitions[2].step, Step::End);

    let after = h.store.snapshot().await;
    assert_eq!(after[0], before[0]);
    let phone = ColumnMap::standard().position(Column::Phone).unwrap();
    for (i, (old, new)) in before[1].iter().zip(after[1].iter()).enumerate() {
        if i == phone {
            assert_eq!(new, "0911000000");
        } else {
            assert_eq!(old, new);
        }
    }
    assert_eq!(h.store.write_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_edit_requires_registration() -> Result<()> {
    let h = harness(&[]);
    let transition = h
        .engine
        .handle(&sender(1), DialogueState::Idle, Input::Command(Command::EditProfile))
        .await;
    assert_eq!(transition.step, Step::End);
    assert_eq!(keys(&transition), vec!["not-registered"]);
    Ok(())
}

#[tokio::test]
async fn test_edit_files_without_uploads_keeps_value() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);

    let transitions = run(
        &h.engine,
        &sender(7),
        vec![
            Input::Command(Command::EditProfile),
            Input::Callback("edit_testimonials".to_string()),
            text("Done ጨርሻያለው✅ "),
        ],
    )
    .await;

    assert_eq!(keys(&transitions[2]), vec!["files-unchanged"]);
    assert_eq!(h.store.write_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_edit_files_skip_clears_links() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);

    let transitions = run(
        &h.engine,
        &sender(7),
        vec![
            Input::Command(Command::EditProfile),
            Input::Callback("edit_testimonials".to_string()),
            text("Skip እለፍ⏭️"),
        ],
    )
    .await;

    assert_eq!(keys(&transitions[2]), vec!["files-updated"]);
    assert_eq!(h.store.write_count(), 1);
    let rows = h.store.snapshot().await;
    assert_eq!(cell(&rows[0], Column::Testimonials), "");
    assert_eq!(cell(&rows[0], Column::FullName), "Abebe Kebede");
    Ok(())
}

#[tokio::test]
async fn test_edit_files_replaces_links() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);

    let transitions = run(
        &h.engine,
        &sender(7),
        vec![
            Input::Command(Command::EditProfile),
            Input::Callback("edit_education".to_string()),
            Input::File(document("diploma")),
            Input::File(document("transcript")),
            text("done"),
        ],
    )
    .await;

    assert_eq!(keys(transitions.last().unwrap()), vec!["files-updated"]);
    let rows = h.store.snapshot().await;
    assert_eq!(
        cell(&rows[0], Column::EducationalDocs),
        format!("{}, {}", share_link("drive1"), share_link("drive2"))
    );
    assert_eq!(cell(&rows[0], Column::Testimonials), share_link("old1"));

    let stored = h.storage.stored.lock().unwrap().clone();
    assert!(stored.iter().all(|(folder, _)| folder == "education-folder"));
    Ok(())
}

#[tokio::test]
async fn test_edit_cancel_button() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);
    let transitions = run(
        &h.engine,
        &sender(7),
        vec![
            Input::Command(Command::EditProfile),
            text("what now?"),
            Input::Callback("edit_cancel".to_string()),
        ],
    )
    .await;

    assert_eq!(keys(&transitions[1]), vec!["edit-choose-field"]);
    assert_eq!(keys(&transitions[2]), vec!["edit-cancelled"]);
    assert_eq!(transitions[2].step, Step::End);
    Ok(())
}

#[tokio::test]
async fn test_delete_confirmed_and_declined() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede"), registrant(8, "Sara Tesfaye")]);

    let declined = run(
        &h.engine,
        &sender(7),
        vec![Input::Command(Command::DeleteProfile), text("No አይ❌")],
    )
    .await;
    assert_eq!(declined[0].replies[0].keyboard, Keyboard::YesNo);
    assert_eq!(keys(&declined[1]), vec!["delete-cancelled"]);
    assert_eq!(h.store.snapshot().await.len(), 2);

    let confirmed = run(
        &h.engine,
        &sender(7),
        vec![Input::Command(Command::DeleteProfile), text("Yes አዎ✅")],
    )
    .await;
    assert_eq!(keys(&confirmed[1]), vec!["profile-deleted"]);

    let rows = h.store.snapshot().await;
    assert_eq!(rows.len(), 1);
    assert_eq!(cell(&rows[0], Column::UserId), "8");
    Ok(())
}

#[tokio::test]
async fn test_comment_is_saved() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);
    let transitions = run(
        &h.engine,
        &sender(7),
        vec![Input::Command(Command::Comment), text("  Available on weekends  ")],
    )
    .await;

    assert_eq!(keys(&transitions[1]), vec!["comment-saved"]);
    let rows = h.store.snapshot().await;
    assert_eq!(cell(&rows[0], Column::Comment), "Available on weekends");
    Ok(())
}

#[tokio::test]
async fn test_profile_summary() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);
    let transition = h
        .engine
        .handle(&sender(7), DialogueState::Idle, Input::Command(Command::Profile))
        .await;

    assert_eq!(keys(&transition), vec!["profile-summary"]);
    let args = &transition.replies[0].args;
    assert!(args.contains(&("name", "Abebe Kebede".into())));
    assert!(args.contains(&("testimonials", "1".into())));
    assert!(args.contains(&("education", "0".into())));
    Ok(())
}

#[tokio::test]
async fn test_profile_reports_outage() -> Result<()> {
    let h = harness(&[registrant(7, "Abebe Kebede")]);
    h.store.set_unavailable(true);
    let transition = h
        .engine
        .handle(&sender(7), DialogueState::Idle, Input::Command(Command::Profile))
        .await;
    assert_eq!(keys(&transition), vec!["service-unavailable"]);
    Ok(())
}

#[tokio::test]
async fn test_idle_text_points_to_menu() -> Result<()> {
    let h = harness(&[]);
    let transition = h.engine.handle(&sender(1), DialogueState::Idle, text("hello")).await;
    assert_eq!(keys(&transition), vec!["use-menu"]);
    assert_eq!(transition.step, Step::End);
    Ok(())
}
