use crux_core::testing::AppTester;
use shared::{
    AcquisitionPhase, App, CruxApp, Effect, Event, GeolocationError, GeolocationOutput, Model,
    PermissionState, PermissionStatus, PositionFix, Screen, StartConfig, Variant,
};

fn granted() -> Box<shared::GeolocationResult> {
    Box::new(Ok(GeolocationOutput::PermissionStatus(
        PermissionStatus::WhileInUse,
    )))
}

#[test]
fn extended_flow_reaches_subscription() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    // 1. Startup checks the service switch first.
    let update = app.update(
        Event::Started(StartConfig::new(Variant::Extended).with_maps_api_key("test-key")),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::CheckingService);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

    // While pending, the extended variant shows a loading screen.
    let vm = App::default().view(&model);
    assert_eq!(vm.screen, Screen::Loading);

    // 2. Service enabled -> permission request goes out.
    let update = app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::RequestingPermission);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));

    // 3. Permission granted -> one-shot fetch goes out.
    let update = app.update(Event::PermissionResolved(granted()), &mut model);
    assert_eq!(model.phase, AcquisitionPhase::FetchingFix);
    assert_eq!(model.permission, PermissionState::Granted);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));

    // 4. Fix received -> watch is established.
    let fix = PositionFix::new(-0.721393, 37.147384, Some(5.0), 1);
    let update = app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(fix)))),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::Subscribed);
    assert_eq!(model.fix, Some(fix));
    assert!(
        update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))),
        "the position watch should be requested after the initial fix"
    );

    let vm = App::default().view(&model);
    let Screen::Position {
        latitude_text,
        longitude_text,
        accuracy_text,
        map_markup,
        ..
    } = vm.screen
    else {
        panic!("expected position screen");
    };
    assert_eq!(latitude_text, "Latitude: -0.72139300");
    assert_eq!(longitude_text, "Longitude: 37.14738400");
    assert_eq!(accuracy_text.as_deref(), Some("Accuracy: \u{b1}5m"));
    assert!(map_markup.unwrap().contains("center=-0.721393,37.14738"));
}

#[test]
fn watch_update_replaces_previous_fix() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(Event::PermissionResolved(granted()), &mut model);
    app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(PositionFix::new(
            -0.721393, 37.147384, Some(5.0), 1,
        ))))),
        &mut model,
    );

    let newer = PositionFix::new(-0.721500, 37.148000, Some(8.0), 2);
    let update = app.update(
        Event::WatchFix(Box::new(Ok(GeolocationOutput::Position(newer)))),
        &mut model,
    );
    assert_eq!(model.fix, Some(newer));
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));
}

#[test]
fn disabled_service_resolves_to_denied() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    let update = app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(false)))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Alert(_))));

    let alert = model.active_alert.clone().expect("alert should be raised");
    assert_eq!(
        alert.message,
        "Location services are disabled. Please enable them in your device settings."
    );
    assert_eq!(alert.dismiss_label, "OK");

    let vm = App::default().view(&model);
    assert!(matches!(vm.screen, Screen::LocationRequired { .. }));
}

#[test]
fn denied_permission_blocks_coordinate_ui() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    let update = app.update(
        Event::PermissionResolved(Box::new(Ok(GeolocationOutput::PermissionStatus(
            PermissionStatus::Denied,
        )))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert_eq!(model.permission, PermissionState::Denied);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Alert(_))));

    let vm = App::default().view(&model);
    assert_eq!(
        vm.screen,
        Screen::LocationRequired {
            message: "Please enable precise location to use this app".into()
        }
    );
}

#[test]
fn fetch_error_surfaces_message_verbatim() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(Event::PermissionResolved(granted()), &mut model);
    let update = app.update(
        Event::FixResolved(Box::new(Err(GeolocationError::platform("GPS hardware fault")))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Failed);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Alert(_))));
    let alert = model.active_alert.clone().expect("alert should be raised");
    assert_eq!(alert.message, "GPS hardware fault");
}

#[test]
fn missing_fix_resolves_to_fix_unavailable() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(Event::PermissionResolved(granted()), &mut model);
    let update = app.update(
        Event::FixResolved(Box::new(Err(GeolocationError::PositionUnavailable))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Alert(_))));
    let alert = model.active_alert.clone().expect("alert should be raised");
    assert_eq!(alert.message, "Your current position could not be determined.");
}

#[test]
fn out_of_range_fix_resolves_to_fix_unavailable() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(Event::PermissionResolved(granted()), &mut model);
    let update = app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(PositionFix::new(
            120.0, 37.147384, None, 1,
        ))))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert_eq!(model.fix, None);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Alert(_))));
}

#[test]
fn invalid_watch_update_keeps_the_last_good_fix() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let good = PositionFix::new(-0.721393, 37.147384, Some(5.0), 1);
    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(Event::PermissionResolved(granted()), &mut model);
    app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(good)))),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::Subscribed);

    // A bad tick is dropped without disturbing the subscription.
    let update = app.update(
        Event::WatchFix(Box::new(Ok(GeolocationOutput::Position(PositionFix::new(
            f64::NAN,
            37.147384,
            None,
            2,
        ))))),
        &mut model,
    );
    assert_eq!(model.fix, Some(good));
    assert_eq!(model.phase, AcquisitionPhase::Subscribed);
    assert!(update.effects.is_empty());

    // So is a failed one.
    let update = app.update(
        Event::WatchFix(Box::new(Err(GeolocationError::Timeout))),
        &mut model,
    );
    assert_eq!(model.fix, Some(good));
    assert!(model.active_alert.is_none());
    assert!(update.effects.is_empty());
}

#[test]
fn baseline_skips_the_service_check() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::Started(StartConfig::new(Variant::Baseline)), &mut model);

    // Straight to the permission request, no service probe.
    assert_eq!(model.phase, AcquisitionPhase::RequestingPermission);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))));

    // The baseline renders the blocking screen while unresolved.
    let vm = App::default().view(&model);
    assert!(matches!(vm.screen, Screen::LocationRequired { .. }));
}

#[test]
fn baseline_does_not_subscribe_after_fix() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Baseline)), &mut model);
    app.update(Event::PermissionResolved(granted()), &mut model);
    let update = app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(PositionFix::new(
            -0.721393, 37.147384, None, 1,
        ))))),
        &mut model,
    );

    assert_eq!(model.phase, AcquisitionPhase::Acquired);
    assert!(
        !update.effects.iter().any(|e| matches!(e, Effect::Geolocation(_))),
        "the baseline variant never starts a watch"
    );
}

#[test]
fn stale_results_are_dropped() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(false)))),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::Denied);

    // A fix arriving after denial must not resurrect the flow.
    let update = app.update(
        Event::FixResolved(Box::new(Ok(GeolocationOutput::Position(PositionFix::new(
            1.0, 2.0, None, 1,
        ))))),
        &mut model,
    );
    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert_eq!(model.fix, None);
    assert!(update.effects.is_empty());
}

#[test]
fn dismissing_the_alert_keeps_the_blocking_state() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    app.update(Event::Started(StartConfig::new(Variant::Extended)), &mut model);
    app.update(
        Event::ServiceChecked(Box::new(Ok(GeolocationOutput::ServiceEnabled(true)))),
        &mut model,
    );
    app.update(
        Event::PermissionResolved(Box::new(Ok(GeolocationOutput::PermissionStatus(
            PermissionStatus::DeniedForever,
        )))),
        &mut model,
    );
    assert!(model.active_alert.is_some());

    let update = app.update(Event::AlertDismissed, &mut model);
    assert!(model.active_alert.is_none());
    assert_eq!(model.phase, AcquisitionPhase::Denied);
    assert!(update.effects.iter().any(|e| matches!(e, Effect::Render(_))));

    let vm = App::default().view(&model);
    assert!(matches!(vm.screen, Screen::LocationRequired { .. }));
    assert!(vm.alert.is_none());
}
