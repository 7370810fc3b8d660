use sqlbind::connection::RecordingHandle;
use sqlbind::{
    BindError, Binder, BinderConfig, Db, DefinitionSource, Mapper, Op, PlaceholderStyle, Value,
};
use std::sync::Arc;

fn binder() -> Binder {
    let mut binder = Binder::new();
    binder.add_source(
        DefinitionSource::new("", "User", "user")
            .select(
                "FindByName",
                "name",
                "select * from {{.table}} where name = {{arg .name}}",
            )
            .select(
                "Search",
                "name, ids",
                "select * from {{.table}} where 1 = 1 \
                 {{- if .name }} and name = {{arg .name}}{{ end -}} \
                 {{- if .ids }} and id {{in .ids}}{{ else }} and active = {{arg true}}{{ end }}",
            )
            .select(
                "Shadow",
                "table",
                "select * from {{.table}} where t = {{arg .table}}",
            )
            .select("Shout", "name", "select {{upper .name}} from {{.table}}"),
    );
    binder
}

#[test]
fn test_dry_render() {
    let mut binder = binder();
    let query = binder
        .render("User", "FindByName", vec!["bar".into()])
        .unwrap();
    assert_eq!(query.sql, "select * from user where name = ?");
    assert_eq!(query.binds, vec![Value::from("bar")]);
}

#[test]
fn test_conditionals() {
    let mut binder = binder();

    let query = binder
        .render("User", "Search", vec!["bar".into(), Value::from(vec![1i64, 2])])
        .unwrap();
    assert_eq!(query.sql, "select * from user where 1 = 1 and name = ? and id in (?,?)");
    assert_eq!(
        query.binds,
        vec![Value::from("bar"), Value::Integer(1), Value::Integer(2)]
    );

    let query = binder
        .render("User", "Search", vec!["".into(), Value::List(vec![])])
        .unwrap();
    assert_eq!(query.sql, "select * from user where 1 = 1 and active = ?");
    assert_eq!(query.binds, vec![Value::Boolean(true)]);
}

#[test]
fn test_table_overrides_argument_of_the_same_name() {
    let mut binder = binder();
    let query = binder
        .render("User", "Shadow", vec!["orders".into()])
        .unwrap();
    assert_eq!(query.sql, "select * from user where t = ?");
    assert_eq!(query.binds, vec![Value::from("user")]);
}

#[test]
fn test_numbered_placeholders() {
    let mut binder = Binder::with_config(BinderConfig::new().placeholder(PlaceholderStyle::Numbered));
    binder.add_source(
        DefinitionSource::new("", "User", "user")
            .select("Between", "lo, hi", "select * from user where age between {{arg .lo}} and {{arg .hi}}"),
    );
    let query = binder
        .render("User", "Between", vec![18.into(), 30.into()])
        .unwrap();
    assert_eq!(query.sql, "select * from user where age between $1 and $2");
}

#[test]
fn test_custom_function() {
    let mut binder = binder();

    // Unknown until registered: parsed as a variable path that cannot resolve.
    assert!(binder.render("User", "Shout", vec!["bar".into()]).is_err());

    binder.add_function("upper", |_ctx, value| match value {
        Value::Text(s) => Ok(s.to_uppercase()),
        other => Err(BindError::TemplateExecution(format!(
            "upper: expected text, got {}",
            other.type_name()
        ))),
    });
    let query = binder.render("User", "Shout", vec!["bar".into()]).unwrap();
    assert_eq!(query.sql, "select BAR from user");
    assert!(query.binds.is_empty());

    assert!(matches!(
        binder.render("User", "Shout", vec![1.into()]),
        Err(BindError::TemplateExecution(_))
    ));
}

#[test]
fn test_render_errors() {
    let mut binder = binder();
    assert!(matches!(
        binder.render("Order", "FindByName", vec!["bar".into()]),
        Err(BindError::UnmappedType(_))
    ));
    assert!(matches!(
        binder.render("User", "FindById", vec![1.into()]),
        Err(BindError::UnmappedOperation { .. })
    ));
    assert!(matches!(
        binder.render("User", "FindByName", vec![]),
        Err(BindError::ArityMismatch { declared: 0, defined: 1, .. })
    ));
    assert!(matches!(
        binder.render("User", "Search", vec!["".into(), Value::Integer(3)]),
        Err(BindError::TemplateExecution(_))
    ));
}

#[derive(Mapper)]
#[sqlbind(type_name = "User")]
struct UserDao {
    db: Db,
    find_by_name: Op<(String,), Vec<String>>,
}

#[tokio::test]
async fn test_replaced_function_applies_to_later_bindings() {
    let mut binder = binder();
    let handle = Arc::new(RecordingHandle::new());

    let mut before = UserDao::with_handle(handle.clone());
    binder.map(&mut before).unwrap();

    binder.add_function("arg", |ctx, value| {
        let placeholder = ctx.bind(value.clone());
        Ok(format!("/* bound */ {placeholder}"))
    });
    let mut after = UserDao::with_handle(handle.clone());
    binder.map(&mut after).unwrap();

    before.find_by_name.call(("bar".to_string(),)).await.unwrap();
    after.find_by_name.call(("bar".to_string(),)).await.unwrap();

    let calls = handle.calls().unwrap();
    assert_eq!(calls[0].sql, "select * from user where name = ?");
    assert_eq!(calls[1].sql, "select * from user where name = /* bound */ ?");
    assert_eq!(calls[1].binds, vec![Value::from("bar")]);
}
