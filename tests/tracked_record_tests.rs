use chrono::Utc;
use serde_json::json;
use tracked_model::{
    DbError, FieldUpdates, ForeignKey, PersistConfig, PersistSession, RowStore, SaveOutcome,
    StoredJson, Tracked, Value, tracked_model,
};

mod options {
    use chrono::{DateTime, Utc};
    use tracked_model::{StoredJson, tracked_model};

    tracked_model! {
        /// Key/value configuration row.
        pub struct Option table = "sentry_option" {
            #[model(unique)]
            key: String,
            value: StoredJson<serde_json::Value>,
            last_updated: DateTime<Utc>,
        }
        repr = [key, value];
    }
}

tracked_model! {
    pub struct Organization table = "sentry_organization" {
        #[model(unique)]
        slug: String,
    }
    repr = [pk, slug];
}

tracked_model! {
    pub struct AuthProvider table = "sentry_authprovider" {
        #[model(unique)]
        organization: ForeignKey<Organization>,
        provider: String,
        sync_time: Option<i64>,
    }
    repr = [organization_id, provider];
    audit = [sync_time];
}

tracked_model! {
    pub struct Reading table = "readings" {
        sensor: String,
        level: f64,
    }
}

fn quota_is_positive(quota: &Quota) -> tracked_model::Result<()> {
    if *quota.limit() < 0 {
        return Err(DbError::ValidationError(format!(
            "quota '{}' must not be negative",
            quota.name()
        )));
    }
    Ok(())
}

tracked_model! {
    pub struct Quota {
        name: String,
        limit: i64,
    }
    validate = quota_is_positive;
}

fn option(key: &str, value: serde_json::Value) -> Tracked<options::Option> {
    Tracked::new(options::Option::new(key.to_string(), StoredJson(value), Utc::now()))
}

#[tokio::test]
async fn option_value_change_is_tracked_across_saves() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!("bar"));

    assert!(!option.has_changed("value")?);
    assert_eq!(option.old_value("value")?, None);

    assert_eq!(option.save(&session).await?, SaveOutcome::Created);
    assert_eq!(option.id(), Some(1));
    assert!(!option.has_changed("value")?);
    assert_eq!(option.old_value("value")?, Some(Value::Json(json!("bar"))));

    option.set_value(StoredJson(json!("baz")));
    assert!(option.has_changed("value")?);
    assert!(!option.has_changed("key")?);
    assert_eq!(option.old_value("value")?, Some(Value::Json(json!("bar"))));
    assert_eq!(option.changed_fields(), vec!["value"]);

    assert_eq!(option.save(&session).await?, SaveOutcome::Updated);
    assert!(!option.has_changed("value")?);
    assert_eq!(option.old_value("value")?, Some(Value::Json(json!("baz"))));
    assert!(option.changed_fields().is_empty());
    Ok(())
}

#[tokio::test]
async fn unknown_field_is_rejected_even_before_first_save() {
    let option = option("foo", json!(1));
    assert!(matches!(
        option.has_changed("valeu"),
        Err(DbError::UnknownField(field, model)) if field == "valeu" && model == "Option"
    ));
    assert!(matches!(option.old_value("valeu"), Err(DbError::UnknownField(_, _))));
}

#[tokio::test]
async fn loaded_record_starts_clean() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("mail.from", json!({"address": "root@localhost"}));
    option.save(&session).await?;

    let loaded = session
        .load::<options::Option>(1)
        .await?
        .expect("row should exist");
    assert_eq!(loaded.record(), option.record());
    assert!(loaded.changed_fields().is_empty());
    assert_eq!(
        loaded.old_value("key")?,
        Some(Value::Text("mail.from".to_string()))
    );

    assert!(session.load::<options::Option>(42).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn foreign_key_is_tracked_by_scalar_key() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut acme = Tracked::new(Organization::new("acme".to_string()));
    let mut globex = Tracked::new(Organization::new("globex".to_string()));
    acme.save(&session).await?;
    globex.save(&session).await?;

    let mut provider = Tracked::new(AuthProvider::new(
        ForeignKey::to(acme.record()),
        "saml2".to_string(),
        None,
    ));
    provider.save(&session).await?;
    assert_eq!(
        provider.old_value("organization_id")?,
        Some(Value::Integer(1))
    );

    // Re-pointing at the same row is not a change.
    let reloaded = session
        .load::<Organization>(1)
        .await?
        .expect("organization should exist");
    provider.organization_mut().set_related(reloaded.record());
    assert!(!provider.has_changed("organization")?);
    assert!(!provider.has_changed("organization_id")?);

    provider.organization_mut().set_related(globex.record());
    assert!(provider.has_changed("organization")?);
    assert_eq!(
        provider.old_value("organization")?,
        Some(Value::Integer(1))
    );

    provider.save(&session).await?;
    assert_eq!(provider.organization().key(), Some(2));
    assert!(!provider.has_changed("organization")?);
    Ok(())
}

#[tokio::test]
async fn failed_save_leaves_snapshot_untouched() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut first = option("foo", json!(1));
    let mut second = option("bar", json!(2));
    first.save(&session).await?;
    second.save(&session).await?;

    second.set_key("foo".to_string());
    let err = second.save(&session).await.unwrap_err();
    assert!(matches!(err, DbError::ConstraintViolation(_)));
    assert!(second.has_changed("key")?);
    assert_eq!(second.old_value("key")?, Some(Value::Text("bar".into())));

    let mut duplicate = option("foo", json!(3));
    assert!(duplicate.save(&session).await.is_err());
    assert_eq!(duplicate.id(), None);
    assert!(duplicate.snapshot().is_unsaved());
    Ok(())
}

#[tokio::test]
async fn save_reinserts_row_deleted_behind_the_record() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!(1));
    option.save(&session).await?;
    session.store().delete("sentry_option", 1).await?;

    assert_eq!(option.save(&session).await?, SaveOutcome::Created);
    assert_eq!(option.id(), Some(1));
    assert!(session.load::<options::Option>(1).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn update_writes_only_this_row_and_refreshes() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut first = option("foo", json!("a"));
    let mut second = option("bar", json!("b"));
    first.save(&session).await?;
    second.save(&session).await?;

    let affected = first
        .update(&session, FieldUpdates::new().set("value", json!("z")))
        .await?;
    assert_eq!(affected, 1);
    assert_eq!(first.value(), &StoredJson(json!("z")));
    assert!(!first.has_changed("value")?);

    let untouched = session
        .load::<options::Option>(2)
        .await?
        .expect("second row should exist");
    assert_eq!(untouched.value(), &StoredJson(json!("b")));
    Ok(())
}

#[tokio::test]
async fn update_of_missing_row_reports_zero_and_keeps_snapshot() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!("a"));
    option.save(&session).await?;
    session.store().delete("sentry_option", 1).await?;

    let affected = option
        .update(&session, FieldUpdates::new().set("value", json!("b")))
        .await?;
    assert_eq!(affected, 0);
    assert_eq!(option.value(), &StoredJson(json!("b")));
    assert!(option.has_changed("value")?);
    Ok(())
}

#[tokio::test]
async fn update_rejects_bad_requests() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!("a"));

    let err = option
        .update(&session, FieldUpdates::new().set("value", json!("b")))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotPersisted(_)));

    option.save(&session).await?;
    let err = option
        .update(&session, FieldUpdates::new().set("colour", "red"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::UnknownField(_, _)));

    let err = option
        .update(&session, FieldUpdates::new().set("id", 9_i64))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ValidationError(_)));
    assert_eq!(option.id(), Some(1));
    Ok(())
}

#[tokio::test]
async fn update_validation_follows_session_config() -> anyhow::Result<()> {
    let lenient = PersistSession::memory();
    let mut quota = Tracked::new(Quota::new("seats".to_string(), 5));
    quota.save(&lenient).await?;
    let affected = quota
        .update(&lenient, FieldUpdates::new().set("limit", -1_i64))
        .await?;
    assert_eq!(affected, 1);

    let strict = PersistSession::open(PersistConfig::new("quotas").validate_updates(true))?;
    let mut quota = Tracked::new(Quota::new("seats".to_string(), 5));
    quota.save(&strict).await?;
    let err = quota
        .update(&strict, FieldUpdates::new().set("limit", -1_i64))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::ValidationError(_)));
    assert_eq!(*quota.limit(), 5);

    let stored = strict.load::<Quota>(1).await?.expect("quota should exist");
    assert_eq!(*stored.limit(), 5);
    Ok(())
}

#[tokio::test]
async fn delete_returns_record_to_unsaved() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!(1));
    option.save(&session).await?;

    assert_eq!(option.delete(&session).await?, 1);
    assert_eq!(option.id(), None);
    assert!(option.snapshot().is_unsaved());
    assert!(!option.has_changed("value")?);
    assert_eq!(option.delete(&session).await?, 0);

    assert_eq!(option.save(&session).await?, SaveOutcome::Created);
    assert_eq!(option.id(), Some(2));
    Ok(())
}

#[test]
fn clone_takes_its_own_baseline() {
    tokio_test::block_on(async {
        let session = PersistSession::memory();
        let mut original = option("foo", json!("a"));
        original.save(&session).await.unwrap();
        original.set_value(StoredJson(json!("b")));

        let copy = original.clone();
        assert!(original.has_changed("value").unwrap());
        assert!(!copy.has_changed("value").unwrap());
        assert_eq!(
            copy.old_value("value").unwrap(),
            Some(Value::Json(json!("b")))
        );
    });
}

#[tokio::test]
async fn repr_and_dict_forms() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut option = option("foo", json!("bar"));
    option.save(&session).await?;

    let repr = option.sane_repr();
    assert!(repr.starts_with("<Option at 0x"));
    assert!(repr.ends_with(r#": id=1, key="foo", value="bar">"#));
    assert_eq!(format!("{:?}", option), repr);

    let dict = option.sane_dict();
    assert_eq!(dict.len(), 3);
    assert_eq!(dict["option.id"], "1");
    assert_eq!(dict["option.key"], "foo");
    assert_eq!(dict["option.value"], "bar");

    let provider = Tracked::new(AuthProvider::new(ForeignKey::unset(), "github".into(), None));
    let repr = provider.sane_repr();
    assert!(repr.ends_with(r#": id=None, organization_id=None, provider="github">"#));
    let dict = provider.sane_dict();
    assert_eq!(dict["authprovider.id"], "None");
    assert_eq!(dict["authprovider.sync_time"], "None");
    assert_eq!(dict.len(), 4);
    Ok(())
}

#[tokio::test]
async fn pk_in_repr_names_the_identifier() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut acme = Tracked::new(Organization::new("acme".to_string()));
    assert!(acme.sane_repr().ends_with(r#": pk=None, slug="acme">"#));

    acme.save(&session).await?;
    assert!(acme.sane_repr().ends_with(r#": pk=1, slug="acme">"#));
    assert_eq!(acme.old_value("pk")?, Some(Value::Integer(1)));
    assert!(!acme.has_changed("pk")?);

    let dict = acme.sane_dict();
    assert_eq!(dict["organization.pk"], "1");
    assert_eq!(dict.len(), 2);
    Ok(())
}

#[tokio::test]
async fn float_changes_are_compared_exactly() -> anyhow::Result<()> {
    let session = PersistSession::memory();
    let mut reading = Tracked::new(Reading::new("boiler".to_string(), f64::INFINITY));
    reading.save(&session).await?;
    assert!(!reading.has_changed("level")?);

    reading.set_level(f64::NEG_INFINITY);
    assert!(reading.has_changed("level")?);

    reading.set_level(f64::NAN);
    assert!(reading.has_changed("level")?);
    reading.save(&session).await?;
    assert!(!reading.has_changed("level")?);
    assert!(reading.changed_fields().is_empty());

    reading.set_level(1e-20);
    reading.save(&session).await?;
    reading.set_level(3e-20);
    assert!(reading.has_changed("level")?);
    assert_eq!(reading.old_value("level")?, Some(Value::Float(1e-20)));
    assert_eq!(reading.changed_fields(), vec!["level"]);
    Ok(())
}
